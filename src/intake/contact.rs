use std::future::Future;

use axum::http::{HeaderMap, header};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{MALFORMED_REQUEST, RateLimiter, is_truthy, is_valid_email};
use crate::error::{Error, Result};

/// 客户端地址截断长度
const IP_MAX: usize = 45;
const MESSAGE_MIN_CHARS: usize = 10;

/// 联系种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactType {
    Inquiry,
    AccountDeletion,
    Sales,
}

impl ContactType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "inquiry" => Some(Self::Inquiry),
            "account_deletion" => Some(Self::AccountDeletion),
            "sales" => Some(Self::Sales),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inquiry => "inquiry",
            Self::AccountDeletion => "account_deletion",
            Self::Sales => "sales",
        }
    }

    /// 未填写主题时使用的默认主题
    pub fn default_subject(self) -> &'static str {
        match self {
            Self::AccountDeletion => "アカウント削除依頼",
            Self::Sales => "営業・提携のご相談",
            Self::Inquiry => "お問い合わせ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub user_agent: String,
    pub ip: Option<String>,
}

/// 待写入的联系记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContact {
    pub email: String,
    pub name: Option<String>,
    pub subject: String,
    pub message: String,
    pub contact_type: ContactType,
    pub platform: &'static str,
    pub device_info: DeviceInfo,
}

/// 联系记录的持久化
pub trait ContactStore: Send + Sync {
    fn insert(&self, contact: &NewContact) -> impl Future<Output = Result<()>> + Send;
}

/// 请求来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// `X-Forwarded-For` 的第一跳，缺失时为 `unknown`
    pub ip: String,
    pub user_agent: String,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let ip = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or("unknown")
            .to_string();
        let user_agent = headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .unwrap_or("unknown")
            .to_string();
        Self { ip, user_agent }
    }

    fn device_info(&self) -> DeviceInfo {
        DeviceInfo {
            user_agent: self.user_agent.clone(),
            ip: (self.ip != "unknown").then(|| self.ip.chars().take(IP_MAX).collect()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ContactForm {
    email: Option<String>,
    name: Option<String>,
    subject: Option<String>,
    message: Option<String>,
    contact_type: Option<String>,
    /// 蜜罐字段，正常用户看不到
    website: Option<Value>,
}

/// 联系表单的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    /// 已写入，附带窗口内剩余次数
    Accepted { remaining: u32 },
    /// 命中蜜罐，静默丢弃
    Dropped,
}

/// 去除首尾空白，截断到 `max` 个字符并删除尖括号
fn sanitize(input: Option<&str>, max: usize) -> String {
    input
        .unwrap_or_default()
        .trim()
        .chars()
        .take(max)
        .filter(|c| !matches!(c, '<' | '>'))
        .collect()
}

/// 联系表单：限流、校验、蜜罐过滤，然后写入存储
pub struct ContactService<S> {
    store: S,
    limiter: RateLimiter,
}

impl<S: ContactStore> ContactService<S> {
    pub fn new(store: S, limiter: RateLimiter) -> Self {
        Self { store, limiter }
    }

    pub async fn submit(&self, client: &ClientInfo, body: &[u8]) -> Result<ContactOutcome> {
        let remaining = self.limiter.check(&client.ip).ok_or(Error::RateLimited {
            retry_after: self.limiter.window_secs(),
        })?;

        let form: ContactForm =
            serde_json::from_slice(body).map_err(|_| Error::Validation(MALFORMED_REQUEST))?;
        let contact = validate(form, client)?;

        let Some(contact) = contact else {
            tracing::info!(ip = %client.ip, "contact honeypot triggered");
            return Ok(ContactOutcome::Dropped);
        };

        self.store.insert(&contact).await?;
        Ok(ContactOutcome::Accepted { remaining })
    }
}

/// 校验表单；蜜罐被填写时返回 `None`
fn validate(form: ContactForm, client: &ClientInfo) -> Result<Option<NewContact>> {
    let email = sanitize(form.email.as_deref(), 254);
    let name = sanitize(form.name.as_deref(), 100);
    let subject = sanitize(form.subject.as_deref(), 200);
    let message = sanitize(form.message.as_deref(), 5000);
    let contact_type = form
        .contact_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or("inquiry")
        .trim();

    if email.is_empty() {
        return Err(Error::Validation("メールアドレスを入力してください。"));
    }
    if !is_valid_email(&email) {
        return Err(Error::Validation("メールアドレスの形式が正しくありません。"));
    }
    if message.is_empty() {
        return Err(Error::Validation("お問い合わせ内容を入力してください。"));
    }
    if message.chars().count() < MESSAGE_MIN_CHARS {
        return Err(Error::Validation(
            "お問い合わせ内容は10文字以上で入力してください。",
        ));
    }
    let contact_type =
        ContactType::parse(contact_type).ok_or(Error::Validation("お問い合わせ種別が不正です。"))?;

    if is_truthy(form.website.as_ref()) {
        return Ok(None);
    }

    Ok(Some(NewContact {
        email,
        name: (!name.is_empty()).then_some(name),
        subject: if subject.is_empty() {
            contact_type.default_subject().to_string()
        } else {
            subject
        },
        message,
        contact_type,
        platform: "web",
        device_info: client.device_info(),
    }))
}
