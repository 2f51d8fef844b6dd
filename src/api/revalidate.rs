use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use serde::Deserialize;
use serde_json::{Value, json};
use subtle::ConstantTimeEq;

use crate::{
    cms::{TAG_CATEGORY, TAG_POST},
    config::{Config, ConfigError},
    error::{Error, Result},
    intake::MALFORMED_REQUEST,
    state::{AppState, Fetcher},
};

const SECRET_HEADER: &str = "x-revalidate-secret";

/// 配置缓存失效路由：`POST /revalidate`
pub fn setup_route() -> Router<AppState> {
    Router::new().route("/revalidate", post(revalidate))
}

/// 请求体可以直接给出标签，也可以是内容存储 webhook 的文档（按 `_type` 推断）
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RevalidateRequest {
    tags: Vec<String>,
    #[serde(rename = "_type")]
    kind: Option<String>,
}

impl RevalidateRequest {
    fn into_tags(self) -> Vec<String> {
        if !self.tags.is_empty() {
            return self.tags;
        }
        match self.kind.as_deref() {
            Some("post") => vec![TAG_POST.to_string()],
            Some("category") => vec![TAG_CATEGORY.to_string(), TAG_POST.to_string()],
            Some("author") => vec![TAG_POST.to_string()],
            _ => Vec::new(),
        }
    }
}

fn authorize(config: &Config, headers: &HeaderMap) -> Result<()> {
    let secret = config
        .revalidate_secret
        .as_deref()
        .ok_or(ConfigError::Missing("REVALIDATE_SECRET"))?;
    let provided = headers
        .get(SECRET_HEADER)
        .map(|v| v.as_bytes())
        .unwrap_or_default();

    if bool::from(provided.ct_eq(secret.as_bytes())) {
        Ok(())
    } else {
        Err(Error::Unauthorized)
    }
}

/// 按标签清除缓存条目，返回每个标签清除的数量
async fn revalidate(
    State(config): State<Arc<Config>>,
    State(fetcher): State<Fetcher>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>> {
    authorize(&config, &headers)?;

    let request: RevalidateRequest =
        serde_json::from_slice(&body).map_err(|_| Error::Validation(MALFORMED_REQUEST))?;
    let tags = request.into_tags();
    if tags.is_empty() {
        return Err(Error::Validation("tags が指定されていません。"));
    }

    let mut purged = serde_json::Map::new();
    for tag in tags {
        let count = fetcher.cache().invalidate_tag(&tag);
        tracing::info!(%tag, count, "cache tag invalidated");
        purged.insert(tag, json!(count));
    }

    Ok(Json(json!({ "revalidated": true, "purged": purged })))
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn config(secret: Option<&str>) -> Config {
        let mut pairs = vec![("SANITY_PROJECT_ID", "abc123")];
        if let Some(secret) = secret {
            pairs.push(("REVALIDATE_SECRET", secret));
        }
        Config::from_pairs(pairs).expect("配置应有效")
    }

    #[test]
    fn test_authorize() {
        let mut headers = HeaderMap::new();
        headers.insert(SECRET_HEADER, HeaderValue::from_static("s3cret"));

        assert!(authorize(&config(Some("s3cret")), &headers).is_ok());
        assert!(matches!(
            authorize(&config(Some("other")), &headers),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            authorize(&config(Some("s3cret")), &HeaderMap::new()),
            Err(Error::Unauthorized)
        ));
        assert!(matches!(
            authorize(&config(None), &headers),
            Err(Error::Config(ConfigError::Missing("REVALIDATE_SECRET")))
        ));
    }

    #[test]
    fn test_tags_from_document_type() {
        let request = RevalidateRequest {
            kind: Some("category".into()),
            ..Default::default()
        };
        assert_eq!(request.into_tags(), vec!["category", "post"]);

        let request = RevalidateRequest {
            tags: vec!["post".into()],
            kind: Some("category".into()),
        };
        assert_eq!(request.into_tags(), vec!["post"]);

        assert!(RevalidateRequest::default().into_tags().is_empty());
    }
}
