//! Orchestrator configuration.

use std::time::Duration;

use webtask_agent::LlmSettings;
use webtask_browser::LocatorPolicy;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP bind address.
    pub http_addr: String,

    /// Wall-clock budget for one agent attempt (seconds).
    pub agent_timeout_secs: u64,

    pub agent_max_steps: u32,

    pub agent_max_actions: u32,

    /// Appearance wait before each click (milliseconds).
    pub locate_wait_ms: u64,

    /// Consecutive failures of one reference before the step is abandoned.
    pub max_locate_failures: u32,

    pub headless: bool,

    /// Keep the browser window open until process shutdown.
    pub keep_browser_open: bool,

    /// Agent program spawned per attempt.
    pub agent_command: String,

    pub llm: LlmSettings,

    /// Bearer tokens as `(user, token)` pairs.
    pub api_tokens: Vec<(String, String)>,
}

impl Config {
    pub fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_secs)
    }

    pub fn locator_policy(&self) -> LocatorPolicy {
        LocatorPolicy {
            wait_timeout: Duration::from_millis(self.locate_wait_ms),
            max_consecutive_failures: self.max_locate_failures.max(1),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8000".to_string(),
            agent_timeout_secs: 300,
            agent_max_steps: 25,
            agent_max_actions: 4,
            locate_wait_ms: 5000,
            max_locate_failures: 3,
            headless: false,
            keep_browser_open: true,
            agent_command: "browser-agent".to_string(),
            llm: LlmSettings::default(),
            api_tokens: Vec::new(),
        }
    }
}

/// Parse `user:token,user:token`. Malformed entries are skipped.
pub fn parse_api_tokens(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (user, token) = pair.split_once(':')?;
            let (user, token) = (user.trim(), token.trim());
            if user.is_empty() || token.is_empty() {
                return None;
            }
            Some((user.to_string(), token.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.agent_timeout(), Duration::from_secs(300));
        assert_eq!(config.agent_max_steps, 25);
        assert_eq!(config.agent_max_actions, 4);
        assert!(config.keep_browser_open);

        let policy = config.locator_policy();
        assert_eq!(policy.wait_timeout, Duration::from_secs(5));
        assert_eq!(policy.max_consecutive_failures, 3);
    }

    #[test]
    fn test_parse_api_tokens() {
        let tokens = parse_api_tokens("alice:abc, bob:def,broken,:x,carol:");
        assert_eq!(
            tokens,
            vec![
                ("alice".to_string(), "abc".to_string()),
                ("bob".to_string(), "def".to_string()),
            ]
        );
        assert!(parse_api_tokens("").is_empty());
    }
}
