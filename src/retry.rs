//! 重试/退避策略
//!
//! 所有 API 读操作共用同一个策略对象，参数为
//! (最大尝试次数, 基础延迟, 退避倍率, 可重试判定)。

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ClientError, ClientResult};

#[cfg(test)]
use std::cell::RefCell;

/// 异步定时器抽象
///
/// 浏览器中由 `gloo-timers` 实现；测试中记录延迟而不真正等待。
#[async_trait::async_trait(?Send)]
pub trait Timer {
    async fn sleep(&self, duration: Duration);
}

/// 可序列化的策略参数，用于配置文件
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetrySettings {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    /// 每次重试延迟的倍率，1.0 即固定延迟
    pub multiplier: f64,
}

impl From<RetrySettings> for RetryPolicy {
    fn from(s: RetrySettings) -> Self {
        RetryPolicy {
            max_attempts: s.max_attempts.max(1),
            base_delay: Duration::from_millis(s.base_delay_ms),
            multiplier: s.multiplier.max(1.0),
            retry_on: default_retry_on,
        }
    }
}

fn default_retry_on(err: &ClientError) -> bool {
    err.is_transient()
}

/// 单次重试等待的上限
pub const MAX_DELAY: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    multiplier: f64,
    retry_on: fn(&ClientError) -> bool,
}

impl RetryPolicy {
    /// 固定延迟：`max_attempts` 次尝试之间等待相同时间
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay: delay,
            multiplier: 1.0,
            retry_on: default_retry_on,
        }
    }

    /// 指数退避：第 n 次重试等待 `base * multiplier^(n-1)`
    pub fn exponential(max_attempts: u32, base_delay: Duration, multiplier: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            multiplier: multiplier.max(1.0),
            retry_on: default_retry_on,
        }
    }

    /// 不重试
    pub fn none() -> Self {
        Self::fixed(1, Duration::ZERO)
    }

    pub fn with_predicate(mut self, retry_on: fn(&ClientError) -> bool) -> Self {
        self.retry_on = retry_on;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `retry` 次重试（从 1 开始）之前的等待时间，不超过 [`MAX_DELAY`]
    pub fn delay_for(&self, retry: u32) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        let exp = i32::try_from(retry.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exp);
        // 溢出或非有限值时直接取上限
        Duration::try_from_secs_f64(secs)
            .map(|d| d.min(MAX_DELAY))
            .unwrap_or(MAX_DELAY)
    }

    /// 执行操作，对可重试错误按策略等待后重试
    ///
    /// 最终失败时返回最后一次的错误，并附加 `op` 追踪。
    pub async fn run<T, F, Fut, Tm>(&self, timer: &Tm, op: &str, mut f: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
        Tm: Timer + ?Sized,
    {
        let mut attempt = 1;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt < self.max_attempts && (self.retry_on)(&err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        op,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying: {}",
                        err
                    );
                    timer.sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err.in_op(op)),
            }
        }
    }
}

// =========================================================
// 测试工具: RecordingTimer
// =========================================================

#[cfg(test)]
#[derive(Default)]
pub struct RecordingTimer {
    pub delays: RefCell<Vec<Duration>>,
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl Timer for RecordingTimer {
    async fn sleep(&self, duration: Duration) {
        self.delays.borrow_mut().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientErrorKind;
    use std::cell::Cell;

    async fn flaky(calls: &Cell<u32>, fail_times: u32, err: ClientError) -> ClientResult<u32> {
        calls.set(calls.get() + 1);
        if calls.get() <= fail_times {
            Err(err)
        } else {
            Ok(calls.get())
        }
    }

    #[tokio::test]
    async fn test_fixed_retries_timeouts_then_succeeds() {
        let timer = RecordingTimer::default();
        let calls = Cell::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(1000));

        let result = policy
            .run(&timer, "test", || flaky(&calls, 2, ClientError::timeout()))
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(
            *timer.delays.borrow(),
            vec![Duration::from_millis(1000), Duration::from_millis(1000)]
        );
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let timer = RecordingTimer::default();
        let calls = Cell::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10));

        let err = policy
            .run(&timer, "distribusi.list", || {
                flaky(&calls, 10, ClientError::timeout())
            })
            .await
            .unwrap_err();

        assert_eq!(calls.get(), 3);
        assert_eq!(err.kind(), ClientErrorKind::Timeout);
        assert_eq!(err.spans(), ["distribusi.list"]);
    }

    #[tokio::test]
    async fn test_non_transient_errors_surface_immediately() {
        let timer = RecordingTimer::default();
        let calls = Cell::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10));

        let err = policy
            .run(&timer, "test", || {
                flaky(&calls, 10, ClientError::from_response(500, "{}"))
            })
            .await
            .unwrap_err();

        assert_eq!(calls.get(), 1);
        assert_eq!(err.kind(), ClientErrorKind::Server);
        assert!(timer.delays.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_exponential_backoff_delays() {
        let timer = RecordingTimer::default();
        let calls = Cell::new(0);
        let policy = RetryPolicy::exponential(3, Duration::from_millis(1000), 1.5);

        let _ = policy
            .run(&timer, "test", || flaky(&calls, 10, ClientError::timeout()))
            .await;

        assert_eq!(calls.get(), 3);
        assert_eq!(
            *timer.delays.borrow(),
            vec![Duration::from_millis(1000), Duration::from_millis(1500)]
        );
    }

    #[test]
    fn test_settings_conversion_clamps() {
        let policy: RetryPolicy = RetrySettings {
            max_attempts: 0,
            base_delay_ms: 200,
            multiplier: 0.5,
        }
        .into();
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay_for(3), Duration::from_millis(200));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = RetryPolicy::exponential(5, Duration::from_secs(1), 1e200);
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), MAX_DELAY);
        assert_eq!(policy.delay_for(u32::MAX), MAX_DELAY);

        let policy: RetryPolicy = RetrySettings {
            max_attempts: 3,
            base_delay_ms: u64::MAX,
            multiplier: f64::INFINITY,
        }
        .into();
        assert_eq!(policy.delay_for(2), MAX_DELAY);
    }

    #[tokio::test]
    async fn test_custom_predicate_retries_server_errors() {
        let timer = RecordingTimer::default();
        let calls = Cell::new(0);
        let policy = RetryPolicy::fixed(3, Duration::from_millis(10))
            .with_predicate(|err| err.kind() == ClientErrorKind::Server);

        let result = policy
            .run(&timer, "test", || {
                flaky(&calls, 1, ClientError::from_response(503, "{}"))
            })
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(timer.delays.borrow().len(), 1);
    }
}
