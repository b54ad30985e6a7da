//! Session configuration

use std::time::Duration;

use chat_core::RevealStrategy;

/// Default chat submission path
pub const DEFAULT_CHAT_PATH: &str = "/chatgpt";
/// Default route the session renders for
pub const DEFAULT_ROUTE: &str = "/ai";
/// Delay between typed steps
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_millis(5);
/// Shortest delay the typing ticker runs at
pub const MIN_TYPING_INTERVAL: Duration = Duration::from_millis(1);
/// Delay before the observational connection status check
pub const DEFAULT_LIVENESS_DELAY: Duration = Duration::from_secs(5);

/// Tunables for a [`StreamSession`](crate::StreamSession)
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Path questions are posted to
    pub chat_path: String,
    /// Route the session renders for; selects the reveal strategy
    pub route: String,
    /// Delay between typed steps
    pub typing_interval: Duration,
    /// Delay before the connection status is logged a second time
    pub liveness_delay: Duration,
    /// How long submission error notices stay visible
    pub notice_ttl: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            route: DEFAULT_ROUTE.to_string(),
            typing_interval: DEFAULT_TYPING_INTERVAL,
            liveness_delay: DEFAULT_LIVENESS_DELAY,
            notice_ttl: chat_core::transcript::DEFAULT_NOTICE_TTL,
        }
    }
}

impl SessionConfig {
    pub fn strategy(&self) -> RevealStrategy {
        RevealStrategy::for_path(&self.route)
    }

    /// Typing delay clamped to [`MIN_TYPING_INTERVAL`]
    pub fn typing_period(&self) -> Duration {
        self.typing_interval.max(MIN_TYPING_INTERVAL)
    }

    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = route.into();
        self
    }

    pub fn with_typing_interval(mut self, interval: Duration) -> Self {
        self.typing_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.chat_path, "/chatgpt");
        assert_eq!(config.strategy(), RevealStrategy::Typewriter);
        assert_eq!(config.typing_interval, Duration::from_millis(5));
    }

    #[test]
    fn test_route_selects_strategy() {
        let config = SessionConfig::default().with_route("/aidb");
        assert_eq!(config.strategy(), RevealStrategy::Chunked);
    }

    #[test]
    fn test_zero_typing_interval_is_clamped() {
        let config = SessionConfig::default().with_typing_interval(Duration::ZERO);
        assert_eq!(config.typing_period(), MIN_TYPING_INTERVAL);

        let config = SessionConfig::default().with_typing_interval(Duration::from_millis(20));
        assert_eq!(config.typing_period(), Duration::from_millis(20));
    }
}
