use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{CmsError, FetchCache, Query, QueryExecutor, QueryParams, Revalidate};

/// 带重新验证策略与失效标签的查询入口
///
/// 执行失败时只记录一条日志并原样返回错误，不做任何兜底。
pub struct ContentFetcher<E> {
    executor: E,
    cache: FetchCache,
}

impl<E: QueryExecutor> ContentFetcher<E> {
    pub fn new(executor: E, cache_capacity: usize) -> Self {
        Self {
            executor,
            cache: FetchCache::new(cache_capacity),
        }
    }

    pub fn cache(&self) -> &FetchCache {
        &self.cache
    }

    /// 执行查询并反序列化为 `T`
    pub async fn fetch<T: DeserializeOwned>(
        &self,
        query: &Query,
        params: &QueryParams,
        policy: Revalidate,
        tags: &[&str],
    ) -> Result<T, CmsError> {
        let value = self.fetch_value(query, params, policy, tags).await?;
        T::deserialize(value.as_ref()).map_err(|e| {
            tracing::error!(query = query.name, error = %e, "content decode failed");
            CmsError::Decode(e)
        })
    }

    async fn fetch_value(
        &self,
        query: &Query,
        params: &QueryParams,
        policy: Revalidate,
        tags: &[&str],
    ) -> Result<Arc<Value>, CmsError> {
        let key = cache_key(query, params);
        if policy != Revalidate::Never {
            if let Some(hit) = self.cache.get(&key) {
                tracing::debug!(query = query.name, "fetch cache hit");
                return Ok(hit);
            }
        }

        let value = match self.executor.execute(query, params).await {
            Ok(value) => Arc::new(value),
            Err(e) => {
                tracing::error!(query = query.name, error = %e, "content fetch failed");
                return Err(e);
            }
        };
        self.cache.insert(key, value.clone(), policy, tags);
        Ok(value)
    }
}

/// 缓存键：查询名加上按名称排序的参数
pub fn cache_key(query: &Query, params: &QueryParams) -> String {
    if params.is_empty() {
        return query.name.to_string();
    }
    let params = serde_json::to_string(params).unwrap_or_default();
    format!("{}?{}", query.name, params)
}
