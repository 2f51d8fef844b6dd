use sqlx::types::Json;

use super::Db;
use crate::{
    config::ConfigError,
    error::Result,
    intake::{ContactStore, NewContact},
};

/// `support_contacts` 表的 [`ContactStore`] 实现
///
/// 未配置 `DATABASE_URL` 时每次写入都返回配置错误。
#[derive(Debug, Clone)]
pub struct PgContactStore {
    pool: Option<Db>,
}

impl PgContactStore {
    pub fn new(pool: Option<Db>) -> Self {
        Self { pool }
    }
}

impl ContactStore for PgContactStore {
    async fn insert(&self, contact: &NewContact) -> Result<()> {
        let pool = self
            .pool
            .as_ref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        sqlx::query(
            r#"
            INSERT INTO support_contacts
                (email, name, subject, message, contact_type, platform, device_info)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&contact.email)
        .bind(&contact.name)
        .bind(&contact.subject)
        .bind(&contact.message)
        .bind(contact.contact_type.as_str())
        .bind(contact.platform)
        .bind(Json(&contact.device_info))
        .execute(pool)
        .await?;

        tracing::info!(contact_type = contact.contact_type.as_str(), "contact stored");
        Ok(())
    }
}
