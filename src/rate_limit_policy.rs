use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::info;

/// Longest window accepted from a server or from configuration
pub const MAX_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

static POLICY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*;\s*w\s*=\s*(\d+)\s*").expect("policy pattern is valid")
});

/// Requests allowed per window, as advertised by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    pub request_limit: u32,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
    pub learned: bool,
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::new(1, Duration::from_secs(1))
    }
}

impl RateLimitPolicy {
    /// An unlearned policy with the given defaults
    pub fn new(request_limit: u32, window: Duration) -> Self {
        Self {
            request_limit: request_limit.max(1),
            window,
            learned: false,
        }
    }

    /// Apply a policy header value if nothing has been learned yet.
    ///
    /// Returns true when the policy changed. Malformed values are ignored.
    pub fn capture(&mut self, header_value: &str) -> bool {
        if self.learned {
            return false;
        }

        let Some((limit, window_secs)) = parse_policy_header(header_value) else {
            return false;
        };

        self.request_limit = limit;
        self.window = Duration::from_secs(window_secs);
        self.learned = true;

        info!(
            request_limit = self.request_limit,
            window = ?self.window,
            "Learned rate limit policy"
        );
        true
    }
}

/// Parse `<limit>;w=<window-seconds>` into `(limit, window_seconds)`.
///
/// Anything after the window parameter is ignored. A zero limit or a window
/// longer than [`MAX_WINDOW`] is rejected.
pub fn parse_policy_header(value: &str) -> Option<(u32, u64)> {
    let captures = POLICY_PATTERN.captures(value)?;
    let limit: u32 = captures.get(1)?.as_str().parse().ok()?;
    let window_secs: u64 = captures.get(2)?.as_str().parse().ok()?;

    if limit == 0 || window_secs > MAX_WINDOW.as_secs() {
        return None;
    }

    Some((limit, window_secs))
}
