use serde::Deserialize;

use super::{AuthService, MALFORMED_REQUEST, SignUpOutcome, is_valid_email};
use crate::error::{Error, Result};

const PASSWORD_MIN_CHARS: usize = 8;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RegistrationForm {
    email: Option<String>,
    password: Option<String>,
}

/// 应用上线前的预注册
pub struct Registration<A> {
    auth: A,
}

impl<A: AuthService> Registration<A> {
    pub fn new(auth: A) -> Self {
        Self { auth }
    }

    pub async fn register(&self, body: &[u8]) -> Result<SignUpOutcome> {
        let form: RegistrationForm =
            serde_json::from_slice(body).map_err(|_| Error::Validation(MALFORMED_REQUEST))?;

        let email = form.email.unwrap_or_default().trim().to_lowercase();
        let password = form.password.unwrap_or_default();

        if email.is_empty() || password.is_empty() {
            return Err(Error::Validation(
                "メールアドレスとパスワードを入力してください。",
            ));
        }
        if !is_valid_email(&email) {
            return Err(Error::Validation("メールアドレスの形式が正しくありません。"));
        }
        if password.chars().count() < PASSWORD_MIN_CHARS {
            return Err(Error::Validation("パスワードは8文字以上にしてください。"));
        }

        let outcome = self.auth.create_user(&email, &password).await?;
        if outcome == SignUpOutcome::AlreadyExists {
            tracing::info!("pre-registration for existing account");
        }
        Ok(outcome)
    }
}
