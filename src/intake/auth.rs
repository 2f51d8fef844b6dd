use std::{future::Future, time::Duration};

use reqwest::{
    Client,
    header::{self, HeaderMap, HeaderValue},
};
use serde_json::{Value, json};

use crate::{config::IntakeConfig, error::Result};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),

    #[error("auth service rejected sign-up ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("auth key is not a valid header value")]
    InvalidKey,
}

/// 账号创建结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    Created { user_id: Option<String> },
    /// 账号已存在，对外与成功同等对待
    AlreadyExists,
}

/// 认证服务
pub trait AuthService: Send + Sync {
    fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<SignUpOutcome>> + Send;
}

/// Supabase GoTrue 客户端
///
/// 配置了 service role key 时走管理接口直接创建已确认的账号，
/// 否则退回到使用匿名 key 的公开注册接口。
#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    client: Client,
    config: IntakeConfig,
}

impl SupabaseAuth {
    pub fn new(config: IntakeConfig) -> std::result::Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self { client, config })
    }

    async fn post(&self, url: String, key: &str, body: Value) -> Result<SignUpOutcome> {
        let bearer = HeaderValue::from_str(&format!("Bearer {key}"))
            .map_err(|_| AuthError::InvalidKey)?;
        let apikey = HeaderValue::from_str(key).map_err(|_| AuthError::InvalidKey)?;

        let resp = self
            .client
            .post(url)
            .header("apikey", apikey)
            .header(header::AUTHORIZATION, bearer)
            .json(&body)
            .send()
            .await
            .map_err(AuthError::from)?;

        let status = resp.status();
        let payload: Value = resp.json().await.unwrap_or(Value::Null);
        if status.is_success() {
            return Ok(SignUpOutcome::Created {
                user_id: user_id(&payload),
            });
        }
        classify_failure(status.as_u16(), &payload).map_err(Into::into)
    }
}

impl AuthService for SupabaseAuth {
    async fn create_user(&self, email: &str, password: &str) -> Result<SignUpOutcome> {
        let base = self.config.supabase_url()?.trim_end_matches('/');

        match self.config.service_role_key.as_deref() {
            Some(service_key) => {
                self.post(
                    format!("{base}/auth/v1/admin/users"),
                    service_key,
                    json!({ "email": email, "password": password, "email_confirm": true }),
                )
                .await
            }
            None => {
                let anon_key = self.config.anon_key()?;
                self.post(
                    format!("{base}/auth/v1/signup"),
                    anon_key,
                    json!({ "email": email, "password": password }),
                )
                .await
            }
        }
    }
}

/// 管理接口直接返回用户对象，公开注册接口可能包在 `user` 字段里
fn user_id(payload: &Value) -> Option<String> {
    payload
        .get("user")
        .unwrap_or(payload)
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// 失败响应中 "已存在" 类的错误视为成功
fn classify_failure(status: u16, payload: &Value) -> std::result::Result<SignUpOutcome, AuthError> {
    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|k| payload.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    let code = payload
        .get("error_code")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let lower = message.to_lowercase();
    let exists = ["already", "exists", "registered"]
        .iter()
        .any(|needle| lower.contains(needle))
        || code.contains("exists");

    if exists {
        Ok(SignUpOutcome::AlreadyExists)
    } else {
        Err(AuthError::Rejected { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_existing_account_is_success() {
        let cases = [
            json!({ "msg": "A user with this email address has already been registered" }),
            json!({ "code": 422, "error_code": "email_exists", "msg": "" }),
            json!({ "message": "User already registered" }),
        ];
        for payload in cases {
            assert_eq!(
                classify_failure(422, &payload).expect("应视为已存在"),
                SignUpOutcome::AlreadyExists
            );
        }
    }

    #[test]
    fn test_other_failures_are_errors() {
        let err = classify_failure(400, &json!({ "msg": "Password is too weak" })).unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 400, .. }));
    }

    #[test]
    fn test_user_id_shapes() {
        assert_eq!(user_id(&json!({ "id": "u1" })).as_deref(), Some("u1"));
        assert_eq!(user_id(&json!({ "user": { "id": "u2" } })).as_deref(), Some("u2"));
        assert_eq!(user_id(&Value::Null), None);
    }

    #[tokio::test]
    async fn test_missing_keys_report_variable_name() {
        let auth = SupabaseAuth::new(IntakeConfig {
            supabase_url: Some("http://127.0.0.1:9".into()),
            ..Default::default()
        })
        .expect("构建客户端失败");

        let err = auth.create_user("a@b.co", "password1").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing env: SUPABASE_ANON_KEY");
        assert!(matches!(err, Error::Config(_)));

        let auth = SupabaseAuth::new(IntakeConfig::default()).expect("构建客户端失败");
        let err = auth.create_user("a@b.co", "password1").await.unwrap_err();
        assert_eq!(err.to_string(), "Missing env: SUPABASE_URL");
    }
}
