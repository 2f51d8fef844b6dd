use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use serde_json::Value;

/// 重新验证策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revalidate {
    /// 缓存指定时长，过期后重新读取
    After(Duration),
    /// 不缓存，每次都读取存储
    Never,
    /// 永久缓存，直到按标签失效
    Static,
}

impl Revalidate {
    /// 以秒表示的策略，`0` 表示不缓存
    pub const fn seconds(secs: u64) -> Self {
        if secs == 0 {
            Self::Never
        } else {
            Self::After(Duration::from_secs(secs))
        }
    }
}

impl Default for Revalidate {
    fn default() -> Self {
        Self::seconds(60)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Arc<Value>,
    expires_at: Option<Instant>,
    tags: Vec<String>,
}

impl Entry {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// 跨请求共享的查询结果缓存
///
/// 条目带有失效标签；容量满时先清理过期条目，仍然满则放弃写入。
#[derive(Debug)]
pub struct FetchCache {
    entries: DashMap<String, Entry>,
    capacity: usize,
}

impl FetchCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            capacity,
        }
    }

    /// 读取未过期的条目
    pub fn get(&self, key: &str) -> Option<Arc<Value>> {
        let now = Instant::now();
        let entry = self.entries.get(key)?;
        entry.is_fresh(now).then(|| entry.value.clone())
    }

    /// 按策略写入条目，[`Revalidate::Never`] 不写入
    pub fn insert(&self, key: String, value: Arc<Value>, policy: Revalidate, tags: &[&str]) {
        let now = Instant::now();
        let expires_at = match policy {
            Revalidate::Never => return,
            Revalidate::Static => None,
            Revalidate::After(ttl) => Some(now + ttl),
        };

        if self.capacity == 0 {
            return;
        }
        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.entries.retain(|_, entry| entry.is_fresh(now));
            if self.entries.len() >= self.capacity {
                tracing::warn!(capacity = self.capacity, "fetch cache full, entry skipped");
                return;
            }
        }

        self.entries.insert(
            key,
            Entry {
                value,
                expires_at,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        );
    }

    /// 删除所有带有该标签的条目，返回删除数量
    pub fn invalidate_tag(&self, tag: &str) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
