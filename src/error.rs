use std::io;

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::{cms::CmsError, config::ConfigError, intake::AuthError};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Not Found")]
    NotFound,

    /// 表单输入不合法，消息直接返回给用户
    #[error("{0}")]
    Validation(&'static str),

    #[error("rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error(transparent)]
    Upstream(#[from] CmsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Xml(#[from] quick_xml::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

const INTERNAL_ERROR: &str = "サーバーエラーが発生しました。";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "ページが見つかりません。" })),
            )
                .into_response(),
            Error::Validation(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            Error::RateLimited { retry_after } => {
                let mut resp = (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({
                        "error": "送信回数の上限に達しました。しばらく時間をおいてから再度お試しください。"
                    })),
                )
                    .into_response();
                let headers = resp.headers_mut();
                headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
                resp
            }
            Error::Upstream(e) => {
                tracing::error!(%e, "content store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({
                        "error": "データの取得に失敗しました。時間をおいて再度お試しください。",
                        "retry": true,
                    })),
                )
                    .into_response()
            }
            Error::Config(e) => {
                tracing::error!(%e, "configuration error");
                let mut body = json!({
                    "error": "サーバ設定エラーです。環境変数を確認してください。",
                });
                // 只暴露缺失的变量名
                if let ConfigError::Missing(_) = e {
                    body["detail"] = json!(e.to_string());
                }
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "送信に失敗しました。時間をおいて再度お試しください。" })),
                )
                    .into_response()
            }
            Error::Auth(e) => {
                tracing::error!(%e, "auth service error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "登録に失敗しました。時間をおいて再度お試しください。" })),
                )
                    .into_response()
            }
            Error::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "Unauthorized" })),
            )
                .into_response(),
            Error::Xml(e) => {
                tracing::error!(%e, "xml write error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": INTERNAL_ERROR })),
                )
                    .into_response()
            }
            Error::Io(e) => {
                tracing::error!(%e, "file io error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": INTERNAL_ERROR })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;
    use serde_json::Value;

    use super::*;

    async fn body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("读取数据失败");
        serde_json::from_slice(&bytes).expect("反序列化失败")
    }

    #[tokio::test]
    async fn test_rate_limited_headers() {
        let resp = Error::RateLimited { retry_after: 3600 }.into_response();
        assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(resp.headers()[header::RETRY_AFTER], "3600");
        assert_eq!(resp.headers()["x-ratelimit-remaining"], "0");
    }

    #[tokio::test]
    async fn test_config_error_exposes_name_only() {
        let resp = Error::Config(ConfigError::Missing("DATABASE_URL")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body(resp).await["detail"], "Missing env: DATABASE_URL");

        let resp = Error::Config(ConfigError::SiteFile("secret".into())).into_response();
        assert!(body(resp).await.get("detail").is_none());
    }

    #[tokio::test]
    async fn test_upstream_has_retry_hint() {
        let resp = Error::Upstream(CmsError::Status {
            status: 502,
            message: "bad".into(),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body(resp).await;
        assert_eq!(json["retry"], true);
        assert!(!json["error"].as_str().unwrap_or_default().contains("bad"));
    }
}
