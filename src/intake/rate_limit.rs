use std::time::{Duration, Instant};

use dashmap::DashMap;

/// 超过该条目数时先清理过期窗口
const PURGE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    reset_at: Instant,
}

/// 进程内的按客户端地址计数的固定窗口限流器
///
/// 窗口从该地址的第一次请求开始计时，重启后清零，不跨实例共享。
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    windows: DashMap<String, Window>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            windows: DashMap::new(),
        }
    }

    /// 窗口长度（秒），用于 `Retry-After`
    pub fn window_secs(&self) -> u64 {
        self.window.as_secs()
    }

    /// 记录一次请求，返回窗口内剩余次数；超出上限返回 `None`
    pub fn check(&self, client: &str) -> Option<u32> {
        self.check_at(client, Instant::now())
    }

    fn check_at(&self, client: &str, now: Instant) -> Option<u32> {
        if self.windows.len() > PURGE_THRESHOLD {
            self.windows.retain(|_, w| w.reset_at > now);
        }

        let mut entry = self.windows.entry(client.to_string()).or_insert(Window {
            count: 0,
            reset_at: now + self.window,
        });
        let window = entry.value_mut();

        if now > window.reset_at {
            *window = Window {
                count: 0,
                reset_at: now + self.window,
            };
        }
        if window.count >= self.max_requests {
            return None;
        }
        window.count += 1;
        Some(self.max_requests - window.count)
    }
}
