use std::{sync::Arc, time::Duration};

use axum::extract::FromRef;

use crate::{
    cms::{ContentFetcher, SanityClient},
    config::Config,
    error::Result,
    intake::{ContactService, RateLimiter, Registration, SupabaseAuth},
    storage::{PgContactStore, new_db_pool},
};

/// 每个客户端地址在一个窗口内允许的联系表单提交次数
const CONTACT_MAX_REQUESTS: u32 = 3;
const CONTACT_WINDOW: Duration = Duration::from_secs(60 * 60);

pub type Fetcher = Arc<ContentFetcher<SanityClient>>;

/// 应用程序上下文
///
/// [`AppState`] 汇集内容读取入口、配置以及联系表单和预注册服务，
/// 处理函数通过 [`FromRef`] 只取自己需要的部分。
#[derive(Clone, FromRef)]
pub struct AppState {
    fetcher: Fetcher,
    config: Arc<Config>,
    contacts: Arc<ContactService<PgContactStore>>,
    registration: Arc<Registration<SupabaseAuth>>,
}

impl AppState {
    /// 根据配置创建所有客户端
    ///
    /// 数据库连接池延迟建立，未配置 `DATABASE_URL` 时联系表单在请求阶段报告配置错误。
    pub fn new(config: Config) -> Result<Self> {
        let client = SanityClient::new(&config.cms)?;
        let fetcher = Arc::new(ContentFetcher::new(client, config.cms.cache_capacity));

        let pool = config
            .intake
            .database_url
            .as_deref()
            .map(new_db_pool)
            .transpose()?;
        if pool.is_none() {
            tracing::warn!("DATABASE_URL not set, contact submissions will fail");
        }
        let contacts = ContactService::new(
            PgContactStore::new(pool),
            RateLimiter::new(CONTACT_MAX_REQUESTS, CONTACT_WINDOW),
        );

        let registration = Registration::new(SupabaseAuth::new(config.intake.clone())?);

        Ok(Self {
            fetcher,
            config: Arc::new(config),
            contacts: Arc::new(contacts),
            registration: Arc::new(registration),
        })
    }

    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn contacts(&self) -> &Arc<ContactService<PgContactStore>> {
        &self.contacts
    }
}
