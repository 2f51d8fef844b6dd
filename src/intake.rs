//! 联系表单与预注册
//!
//! 两个入口都只接收原始请求体，自行解析，解析失败统一返回 400。

mod auth;
mod contact;
mod rate_limit;
mod registration;

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

pub use self::{
    auth::{AuthError, AuthService, SignUpOutcome, SupabaseAuth},
    contact::{
        ClientInfo, ContactOutcome, ContactService, ContactStore, ContactType, DeviceInfo,
        NewContact,
    },
    rate_limit::RateLimiter,
    registration::Registration,
};

/// 请求体无法解析
pub(crate) const MALFORMED_REQUEST: &str = "不正なリクエストです。";

/// 只拦截明显错误的地址
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL.is_match(email)
}

/// 按 JSON 的真值规则判断字段是否被填写
pub(crate) fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::Array(_) | Value::Object(_)) => true,
    }
}
