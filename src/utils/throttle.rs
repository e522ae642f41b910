use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// 请求节流器
///
/// 保证经由同一个节流器发出的任意两次请求之间至少间隔 `min_interval`。
/// 等待期间持有锁，因此并发调用方会被依次放行，而不是同时醒来。
#[derive(Debug)]
pub struct RequestThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn from_millis(millis: u64) -> Self {
        Self::new(Duration::from_millis(millis))
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// 等待到允许发出下一次请求，并把当前时刻登记为最近一次请求时间
    pub async fn wait(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(previous) = *last_request {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_request_is_not_delayed() {
        let throttle = RequestThrottle::from_millis(3000);
        let start = Instant::now();

        throttle.wait().await;

        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_consecutive_requests_are_spaced() {
        let throttle = RequestThrottle::from_millis(3000);
        let start = Instant::now();

        throttle.wait().await;
        throttle.wait().await;
        throttle.wait().await;

        assert!(start.elapsed() >= Duration::from_millis(6000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_callers_share_one_timer() {
        let throttle = Arc::new(RequestThrottle::from_millis(1000));
        let start = Instant::now();

        let waits = (0..4).map(|_| {
            let throttle = Arc::clone(&throttle);
            async move { throttle.wait().await }
        });
        futures::future::join_all(waits).await;

        assert!(start.elapsed() >= Duration::from_millis(3000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_never_sleeps() {
        let throttle = RequestThrottle::new(Duration::ZERO);
        let start = Instant::now();

        for _ in 0..10 {
            throttle.wait().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
