// Scaffolding dynamic servers from the command line

use anyhow::Result;
use mcphub_core::generator::{GeneratedServer, GeneratorSpec, ServerGenerator};
use std::path::Path;

pub fn generate(
    name: &str,
    description: Option<String>,
    tools: &[String],
    out_dir: &Path,
    force: bool,
) -> Result<GeneratedServer> {
    let mut spec = GeneratorSpec::new(name);
    spec.description = description.unwrap_or_default();
    for tool in tools {
        spec.tools.push(GeneratorSpec::parse_tool_shorthand(tool)?);
    }
    ServerGenerator::generate(&spec, out_dir, force)
}

pub fn print_generated(generated: &GeneratedServer) {
    println!("Generated server '{}' in {}", generated.name, generated.directory.display());
    for file in &generated.files {
        println!("  {}", file.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcphub_core::manifest::ServerManifest;
    use tempfile::TempDir;

    #[test]
    fn test_generate_with_shorthand_tools() {
        let temp_dir = TempDir::new().unwrap();
        let out = temp_dir.path().join("sys");
        let generated = generate(
            "sys",
            Some("System helpers".to_string()),
            &["uptime=uptime".to_string(), "disk=df -h".to_string()],
            &out,
            false,
        )
        .unwrap();

        let manifest = ServerManifest::load(&generated.manifest_path).unwrap();
        assert_eq!(manifest.server.description, "System helpers");
        assert_eq!(manifest.tool("disk").unwrap().args, vec!["-h"]);
        assert!(out.join("README.md").exists());
    }

    #[test]
    fn test_generate_rejects_bad_tool_spec() {
        let temp_dir = TempDir::new().unwrap();
        let err = generate("sys", None, &["no-equals".to_string()], temp_dir.path(), false)
            .unwrap_err();
        assert!(err.to_string().contains("name=command"));
    }
}
