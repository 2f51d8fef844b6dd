//! 内容存储访问层
//!
//! [`SanityClient`] 执行 GROQ 查询，[`ContentFetcher`] 在其上叠加重新验证策略与标签缓存。

mod cache;
mod client;
mod fetch;
pub mod queries;

use std::{collections::BTreeMap, future::Future};

use serde_json::Value;

pub use self::{
    cache::{FetchCache, Revalidate},
    client::SanityClient,
    fetch::{ContentFetcher, cache_key},
    queries::Query,
};

/// 命名查询参数，按名称排序以获得稳定的缓存键
pub type QueryParams = BTreeMap<String, Value>;

/// 失效标签：文章
pub const TAG_POST: &str = "post";
/// 失效标签：分类
pub const TAG_CATEGORY: &str = "category";

/// 内容存储错误
#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("content store responded {status}: {message}")]
    Status { status: u16, message: String },

    #[error(transparent)]
    Decode(#[from] serde_json::Error),

    /// 同一请求内以不同类型读取同一条记忆化结果
    #[error("memoized value has unexpected type: {0}")]
    MemoType(&'static str),
}

/// 执行一条命名查询，返回原始 JSON 结果
pub trait QueryExecutor: Send + Sync {
    fn execute(
        &self,
        query: &Query,
        params: &QueryParams,
    ) -> impl Future<Output = Result<Value, CmsError>> + Send;
}

/// 构造查询参数
///
/// ```ignore
/// let params = params([("slug", json!("squat"))]);
/// ```
pub fn params<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> QueryParams {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
