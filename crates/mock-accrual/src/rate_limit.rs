//! 固定窗口限流器
//!
//! 窗口内请求数超过上限时拒绝，并给出距窗口结束的剩余秒数作为 Retry-After。

use std::time::{Duration, Instant};

use parking_lot::Mutex;

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

/// 固定窗口限流器
#[derive(Debug)]
pub struct FixedWindowLimiter {
    max_requests: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                count: 0,
            }),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    /// 计入一次请求
    ///
    /// 超限时返回 Err(重试等待时间)，等待时间向上取整到秒且至少 1 秒
    pub fn check(&self) -> Result<(), Duration> {
        let now = Instant::now();
        let mut window = self.state.lock();

        if now.duration_since(window.started) >= self.window {
            window.started = now;
            window.count = 0;
        }

        if window.count >= self.max_requests {
            let remaining = self.window.saturating_sub(now.duration_since(window.started));
            let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
            return Err(Duration::from_secs(secs.max(1)));
        }

        window.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_after_limit() {
        let limiter = FixedWindowLimiter::new(2, Duration::from_secs(60));

        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_ok());

        let retry_after = limiter.check().unwrap_err();
        assert!(retry_after >= Duration::from_secs(1));
        assert!(retry_after <= Duration::from_secs(60));
    }

    #[test]
    fn test_window_resets() {
        let limiter = FixedWindowLimiter::new(1, Duration::from_millis(20));

        assert!(limiter.check().is_ok());
        assert!(limiter.check().is_err());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.check().is_ok());
    }
}
