// World context - time, system, environment and weather snapshots for agents

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{Datelike, Local, Utc};
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Environment variables that may be exposed; everything else stays private
pub const ENV_WHITELIST: &[&str] = &["SHELL", "LANG", "TERM", "USER", "HOME", "TZ", "EDITOR"];

pub const DEFAULT_WEATHER_URL: &str = "https://wttr.in/?format=j1";

/// One section of the world context
#[async_trait]
pub trait ContextProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn collect(&self) -> Result<Value>;
}

pub struct TimeProvider;

#[async_trait]
impl ContextProvider for TimeProvider {
    fn name(&self) -> &str {
        "time"
    }

    async fn collect(&self) -> Result<Value> {
        let utc = Utc::now();
        let local = utc.with_timezone(&Local);
        Ok(json!({
            "utc": utc.to_rfc3339(),
            "local": local.to_rfc3339(),
            "unix": utc.timestamp(),
            "weekday": local.format("%A").to_string(),
            "iso_week": local.iso_week().week(),
            "utc_offset": local.offset().to_string(),
        }))
    }
}

pub struct SystemProvider;

impl SystemProvider {
    fn hostname() -> Option<String> {
        std::env::var("HOSTNAME")
            .or_else(|_| std::env::var("COMPUTERNAME"))
            .ok()
            .or_else(|| {
                std::fs::read_to_string("/etc/hostname")
                    .ok()
                    .map(|s| s.trim().to_string())
            })
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
impl ContextProvider for SystemProvider {
    fn name(&self) -> &str {
        "system"
    }

    async fn collect(&self) -> Result<Value> {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .ok();
        Ok(json!({
            "os": std::env::consts::OS,
            "family": std::env::consts::FAMILY,
            "arch": std::env::consts::ARCH,
            "hostname": Self::hostname(),
            "cwd": cwd,
            "cpus": cpus,
        }))
    }
}

pub struct EnvironmentProvider;

#[async_trait]
impl ContextProvider for EnvironmentProvider {
    fn name(&self) -> &str {
        "environment"
    }

    async fn collect(&self) -> Result<Value> {
        let vars: Map<String, Value> = ENV_WHITELIST
            .iter()
            .filter_map(|key| {
                std::env::var(key)
                    .ok()
                    .map(|v| (key.to_string(), Value::String(v)))
            })
            .collect();
        Ok(Value::Object(vars))
    }
}

/// Fetches a JSON weather report; wttr.in `j1` payloads are condensed
pub struct WeatherProvider {
    url: String,
    client: reqwest::Client,
}

impl WeatherProvider {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build weather HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    fn summarize(report: Value) -> Value {
        let Some(current) = report
            .get("current_condition")
            .and_then(|c| c.get(0))
        else {
            return report;
        };
        let area = report
            .pointer("/nearest_area/0/areaName/0/value")
            .cloned()
            .unwrap_or(Value::Null);
        json!({
            "location": area,
            "temperature_c": current.get("temp_C"),
            "feels_like_c": current.get("FeelsLikeC"),
            "humidity": current.get("humidity"),
            "description": current.pointer("/weatherDesc/0/value"),
            "wind_kmph": current.get("windspeedKmph"),
        })
    }
}

#[async_trait]
impl ContextProvider for WeatherProvider {
    fn name(&self) -> &str {
        "weather"
    }

    async fn collect(&self) -> Result<Value> {
        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Weather request failed")?
            .error_for_status()
            .context("Weather service returned an error")?;
        let report: Value = response
            .json()
            .await
            .context("Weather response was not JSON")?;
        Ok(Self::summarize(report))
    }
}

/// Aggregates providers into one JSON snapshot
pub struct WorldContext {
    providers: Vec<Box<dyn ContextProvider>>,
}

impl WorldContext {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Time, system and environment, plus weather when a URL is given
    pub fn with_defaults(weather_url: Option<&str>, timeout: Duration) -> Result<Self> {
        let mut context = Self::new()
            .with_provider(TimeProvider)
            .with_provider(SystemProvider)
            .with_provider(EnvironmentProvider);
        if let Some(url) = weather_url {
            context = context.with_provider(WeatherProvider::new(url, timeout)?);
        }
        Ok(context)
    }

    pub fn with_provider(mut self, provider: impl ContextProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn sections(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Collect the named sections, or every section when `sections` is empty
    pub async fn collect(&self, sections: &[String]) -> Value {
        let requested: Vec<&str> = if sections.is_empty() {
            self.sections()
        } else {
            sections.iter().map(String::as_str).collect()
        };

        let mut result = Map::new();
        for name in requested {
            let value = match self.providers.iter().find(|p| p.name() == name) {
                Some(provider) => match provider.collect().await {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(section = name, error = %e, "Context provider failed");
                        json!({ "error": format!("{:#}", e) })
                    }
                },
                None => json!({ "error": format!("unknown section '{}'", name) }),
            };
            result.insert(name.to_string(), value);
        }
        Value::Object(result)
    }
}

impl Default for WorldContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FailingProvider;

    #[async_trait]
    impl ContextProvider for FailingProvider {
        fn name(&self) -> &str {
            "broken"
        }

        async fn collect(&self) -> Result<Value> {
            anyhow::bail!("sensor offline")
        }
    }

    #[tokio::test]
    async fn test_time_section() {
        let value = TimeProvider.collect().await.unwrap();
        assert!(value["unix"].as_i64().unwrap() > 0);
        assert!(value["utc"].as_str().unwrap().contains('T'));
        assert!(value["iso_week"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_system_section() {
        let value = SystemProvider.collect().await.unwrap();
        assert_eq!(value["os"], std::env::consts::OS);
        assert!(value["cpus"].as_u64().unwrap() >= 1);
    }

    #[tokio::test]
    async fn test_environment_is_whitelisted() {
        let value = EnvironmentProvider.collect().await.unwrap();
        for key in value.as_object().unwrap().keys() {
            assert!(ENV_WHITELIST.contains(&key.as_str()));
        }
    }

    #[tokio::test]
    async fn test_failing_section_does_not_fail_collect() {
        let context = WorldContext::new()
            .with_provider(TimeProvider)
            .with_provider(FailingProvider);

        let value = context.collect(&[]).await;
        assert!(value["time"]["unix"].is_i64());
        assert!(value["broken"]["error"]
            .as_str()
            .unwrap()
            .contains("sensor offline"));
    }

    #[tokio::test]
    async fn test_requested_sections_only() {
        let context = WorldContext::new()
            .with_provider(TimeProvider)
            .with_provider(SystemProvider);

        let value = context
            .collect(&["system".to_string(), "moon".to_string()])
            .await;
        let object = value.as_object().unwrap();
        assert!(object.contains_key("system"));
        assert!(!object.contains_key("time"));
        assert!(value["moon"]["error"].as_str().unwrap().contains("unknown"));
    }

    #[tokio::test]
    async fn test_weather_summarizes_wttr_payload() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current_condition": [{
                    "temp_C": "18",
                    "FeelsLikeC": "17",
                    "humidity": "60",
                    "windspeedKmph": "9",
                    "weatherDesc": [{"value": "Partly cloudy"}]
                }],
                "nearest_area": [{"areaName": [{"value": "Lisbon"}]}]
            })))
            .mount(&mock_server)
            .await;

        let provider = WeatherProvider::new(
            format!("{}/?format=j1", mock_server.uri()),
            Duration::from_secs(5),
        )
        .unwrap();
        let value = provider.collect().await.unwrap();
        assert_eq!(value["location"], "Lisbon");
        assert_eq!(value["temperature_c"], "18");
        assert_eq!(value["description"], "Partly cloudy");
    }

    #[tokio::test]
    async fn test_weather_error_status_becomes_section_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let context = WorldContext::with_defaults(Some(&mock_server.uri()), Duration::from_secs(5))
            .unwrap();
        let value = context.collect(&["weather".to_string()]).await;
        assert!(value["weather"]["error"].is_string());
    }
}
