use std::future::Future;
use std::time::Duration;

use super::ToolCallResult;
use crate::config::AgentConfig;

/// How many times a tool call is attempted and how long to pause between
/// attempts. The pause grows linearly with the attempt number.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&AgentConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(agent: &AgentConfig) -> Self {
        Self {
            max_attempts: agent.max_tool_retries(),
            backoff: Duration::from_millis(agent.retry_backoff_ms()),
        }
    }

    /// Runs `attempt` until it succeeds or the attempts run out. Returns the
    /// last result together with the number of attempts made.
    pub async fn run<F, Fut>(&self, label: &str, mut attempt: F) -> (ToolCallResult, usize)
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = ToolCallResult>,
    {
        let max = self.max_attempts.max(1);
        let mut n = 1;
        loop {
            let result = attempt(n).await;
            if result.success || n >= max {
                if !result.success {
                    tracing::warn!(call = label, attempts = n, "tool call failed on every attempt");
                }
                return (result, n);
            }
            tracing::warn!(
                call = label,
                attempt = n,
                max_attempts = max,
                error = result.error.as_deref().unwrap_or(""),
                "tool call attempt failed, retrying"
            );
            if !self.backoff.is_zero() {
                tokio::time::sleep(self.backoff * n as u32).await;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn policy(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            backoff: Duration::ZERO,
        }
    }

    #[tokio::test]
    async fn stops_at_first_success() {
        let calls = AtomicUsize::new(0);
        let (result, attempts) = policy(3)
            .run("s.t", |n| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 2 {
                        ToolCallResult::ok(Some("done".into()))
                    } else {
                        ToolCallResult::failure("flaky")
                    }
                }
            })
            .await;
        assert!(result.success);
        assert_eq!(attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn returns_last_failure_after_exhausting_attempts() {
        let (result, attempts) = policy(2)
            .run("s.t", |n| async move { ToolCallResult::failure(format!("attempt {n}")) })
            .await;
        assert!(!result.success);
        assert_eq!(attempts, 2);
        assert_eq!(result.error.as_deref(), Some("attempt 2"));
    }

    #[tokio::test]
    async fn zero_attempts_still_runs_once() {
        let (_, attempts) = policy(0)
            .run("s.t", |_| async { ToolCallResult::failure("x") })
            .await;
        assert_eq!(attempts, 1);
    }
}
