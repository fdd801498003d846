//! Configuration types for the Jira client.

use std::fmt;
use std::time::Duration;
use url::Url;

/// Credentials sent with every request.
#[derive(Clone)]
pub enum JiraAuth {
    /// Jira Cloud: account email plus API token.
    Basic { email: String, api_token: String },
    /// Jira Server / Data Center personal access token.
    Bearer(String),
}

impl fmt::Debug for JiraAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { email, .. } => f
                .debug_struct("Basic")
                .field("email", email)
                .field("api_token", &"***")
                .finish(),
            Self::Bearer(_) => f.debug_tuple("Bearer").field(&"***").finish(),
        }
    }
}

/// Configuration for the Jira client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the Jira instance, always ending in `/`.
    pub base_url: Url,
    pub auth: JiraAuth,
    /// Request timeout.
    pub timeout: Duration,
    pub retry_config: RetryConfig,
}

impl ClientConfig {
    pub fn new(base_url: Url, auth: JiraAuth) -> Self {
        Self {
            base_url,
            auth,
            timeout: Duration::from_secs(30),
            retry_config: RetryConfig::default(),
        }
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries.
    pub max_retries: u32,
    /// Initial backoff duration.
    pub initial_backoff: Duration,
    /// Maximum backoff duration, also caps `Retry-After`.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub backoff_multiplier: f64,
    /// HTTP status codes to retry on.
    pub retry_on_status_codes: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            retry_on_status_codes: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetryConfig {
    /// Create a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Calculate backoff duration for a given attempt.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_ms = self.initial_backoff.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32);
        let backoff = Duration::from_millis(backoff_ms as u64);
        std::cmp::min(backoff, self.max_backoff)
    }

    /// Delay before the next attempt, preferring the server's `Retry-After`.
    pub fn delay(&self, attempt: u32, retry_after_secs: Option<u64>) -> Duration {
        match retry_after_secs {
            Some(secs) => std::cmp::min(Duration::from_secs(secs), self.max_backoff),
            None => self.backoff_for_attempt(attempt),
        }
    }

    pub fn should_retry_status(&self, status: u16) -> bool {
        self.retry_on_status_codes.contains(&status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        let config = RetryConfig::default();

        assert_eq!(config.backoff_for_attempt(0), Duration::from_millis(250));
        assert_eq!(config.backoff_for_attempt(1), Duration::from_millis(500));
        assert_eq!(config.backoff_for_attempt(2), Duration::from_millis(1000));
    }

    #[test]
    fn test_backoff_capped_at_max() {
        let config = RetryConfig {
            max_backoff: Duration::from_millis(500),
            ..Default::default()
        };

        assert_eq!(config.backoff_for_attempt(10), Duration::from_millis(500));
        assert_eq!(config.delay(0, Some(120)), Duration::from_millis(500));
    }

    #[test]
    fn test_retry_after_preferred() {
        let config = RetryConfig::default();
        assert_eq!(config.delay(0, Some(2)), Duration::from_secs(2));
        assert_eq!(config.delay(1, None), Duration::from_millis(500));
    }

    #[test]
    fn test_should_retry_status() {
        let config = RetryConfig::default();

        assert!(config.should_retry_status(429));
        assert!(config.should_retry_status(503));
        assert!(!config.should_retry_status(400));
        assert!(!config.should_retry_status(404));
    }

    #[test]
    fn test_auth_debug_hides_secrets() {
        let auth = JiraAuth::Basic {
            email: "dev@example.com".to_string(),
            api_token: "secret-token".to_string(),
        };
        let debug = format!("{:?}", auth);
        assert!(debug.contains("dev@example.com"));
        assert!(!debug.contains("secret-token"));

        let debug = format!("{:?}", JiraAuth::Bearer("pat-value".to_string()));
        assert!(!debug.contains("pat-value"));
    }

    #[test]
    fn test_client_config_defaults() {
        let url = Url::parse("https://example.atlassian.net/").unwrap();
        let config = ClientConfig::new(url, JiraAuth::Bearer("t".to_string()));

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_config.max_retries, 3);
    }
}
