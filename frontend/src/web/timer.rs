//! 定时器封装模块

use std::time::Duration;

use gloo_timers::future::TimeoutFuture;
use platdist::Timer;

/// 等待指定时间，超出 `u32` 毫秒的部分截断
pub async fn sleep(duration: Duration) {
    let millis = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
    TimeoutFuture::new(millis).await;
}

/// 基于 `setTimeout` 的重试定时器
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserTimer;

#[async_trait::async_trait(?Send)]
impl Timer for BrowserTimer {
    async fn sleep(&self, duration: Duration) {
        sleep(duration).await;
    }
}
