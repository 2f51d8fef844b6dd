use axum::http::{HeaderMap, HeaderValue};
use reqwest::header;
use serde::Deserialize;
use serde_json::Value;

use super::{CmsError, Query, QueryExecutor, QueryParams};
use crate::config::CmsConfig;

/// SanityClient 通过 HTTP 查询 API 执行 GROQ 查询
///
/// 内部的 [`reqwest::Client`] 共享连接池，克隆开销很小。
#[derive(Clone)]
pub struct SanityClient {
    client: reqwest::Client,
    endpoint: String,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

impl SanityClient {
    /// 根据配置创建客户端
    ///
    /// 所有请求都带有 `config.timeout` 的传输超时。
    pub fn new(config: &CmsConfig) -> Result<Self, CmsError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .default_headers({
                let mut header = HeaderMap::new();
                header.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
                header
            })
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: config.query_endpoint(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// 将查询文本与参数编码为查询字符串对，参数名加 `$` 前缀，值为 JSON
fn query_pairs(query: &Query, params: &QueryParams) -> Vec<(String, String)> {
    let mut pairs = Vec::with_capacity(params.len() + 1);
    pairs.push(("query".to_string(), query.text.to_string()));
    for (name, value) in params {
        pairs.push((format!("${name}"), value.to_string()));
    }
    pairs
}

impl QueryExecutor for SanityClient {
    async fn execute(&self, query: &Query, params: &QueryParams) -> Result<Value, CmsError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&query_pairs(query, params))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = text.chars().take(200).collect();
            return Err(CmsError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let body: QueryResponse = serde_json::from_slice(&resp.bytes().await?)?;
        Ok(body.result)
    }
}
