use std::{collections::HashMap, env, str::FromStr, time::Duration};

use serde::Deserialize;

/// 配置错误
///
/// 只携带变量名，绝不携带变量值，可以安全地返回给客户端。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 必需的环境变量缺失
    #[error("Missing env: {0}")]
    Missing(&'static str),

    /// 环境变量存在但无法解析
    #[error("Invalid env: {0}")]
    Invalid(&'static str),

    /// 站点配置文件读取或解析失败
    #[error("invalid site config: {0}")]
    SiteFile(String),
}

const DEFAULT_SITE_URL: &str = "http://localhost:3000";

/// 应用配置
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP 监听地址
    pub listen: String,
    pub site: SiteConfig,
    pub cms: CmsConfig,
    pub intake: IntakeConfig,
    /// 缓存失效 webhook 的共享密钥
    pub revalidate_secret: Option<String>,
    /// 启动时预热的最新文章数量，0 表示不预热
    pub warm_limit: usize,
}

/// 站点元信息，可由 TOML 文件覆盖
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub title: String,
    pub description: String,
    pub feed_description: String,
    pub language: String,
    pub locale: String,
    /// 站点根地址，不带末尾斜杠
    pub url: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "gachitore".to_string(),
            title: "gachitore | ガチトレメディア".to_string(),
            description: "本気で鍛えたいあなたへ。トレーニング・フィットネスに関する最新情報をお届けするメディアサイト".to_string(),
            feed_description: "最新の記事をRSSで配信します。".to_string(),
            language: "ja".to_string(),
            locale: "ja_JP".to_string(),
            url: DEFAULT_SITE_URL.to_string(),
        }
    }
}

/// 内容存储（Sanity）连接配置
#[derive(Debug, Clone)]
pub struct CmsConfig {
    pub project_id: String,
    pub dataset: String,
    pub api_version: String,
    pub use_cdn: bool,
    /// 覆盖 API 主机，测试时指向本地假服务
    pub api_host: Option<String>,
    pub timeout: Duration,
    pub cache_capacity: usize,
}

impl CmsConfig {
    /// GROQ 查询端点
    ///
    /// ```ignore
    /// // https://abc.apicdn.sanity.io/v2025-01-13/data/query/production
    /// let endpoint = config.query_endpoint();
    /// ```
    pub fn query_endpoint(&self) -> String {
        let host = match &self.api_host {
            Some(host) => host.trim_end_matches('/').to_string(),
            None => {
                let api = if self.use_cdn { "apicdn" } else { "api" };
                format!("https://{}.{}.sanity.io", self.project_id, api)
            }
        };
        let version = self.api_version.trim_start_matches('v');
        format!("{host}/v{version}/data/query/{}", self.dataset)
    }
}

/// 联系表单与预注册依赖的外部服务配置
///
/// 所有字段在启动时都是可选的，缺失时在请求阶段报告 [`ConfigError::Missing`]。
#[derive(Debug, Clone, Default)]
pub struct IntakeConfig {
    pub database_url: Option<String>,
    pub supabase_url: Option<String>,
    pub service_role_key: Option<String>,
    pub anon_key: Option<String>,
}

impl IntakeConfig {
    pub fn supabase_url(&self) -> Result<&str, ConfigError> {
        self.supabase_url
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_URL"))
    }

    pub fn anon_key(&self) -> Result<&str, ConfigError> {
        self.anon_key
            .as_deref()
            .ok_or(ConfigError::Missing("SUPABASE_ANON_KEY"))
    }
}

/// TOML 站点配置文件，所有字段可选
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SiteFile {
    name: Option<String>,
    title: Option<String>,
    description: Option<String>,
    feed_description: Option<String>,
    language: Option<String>,
    locale: Option<String>,
    url: Option<String>,
}

impl Config {
    /// 从进程环境变量读取配置
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 从任意查找函数读取配置
    ///
    /// 空白值视为未设置。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut site = SiteConfig::default();
        if let Some(path) = get("GACHITORE_SITE_CONFIG") {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::SiteFile(format!("{path}: {e}")))?;
            apply_site_file(&mut site, &content)?;
        }
        if let Some(url) = get("SITE_URL") {
            site.url = url;
        }
        site.url = normalize_site_url(&site.url);

        let cms = CmsConfig {
            project_id: get("SANITY_PROJECT_ID").ok_or(ConfigError::Missing("SANITY_PROJECT_ID"))?,
            dataset: get("SANITY_DATASET").unwrap_or_else(|| "production".to_string()),
            api_version: get("SANITY_API_VERSION").unwrap_or_else(|| "2025-01-13".to_string()),
            use_cdn: parsed(&get, "SANITY_USE_CDN", true)?,
            api_host: get("SANITY_API_HOST"),
            timeout: Duration::from_secs(parsed(&get, "SANITY_TIMEOUT_SECS", 10)?),
            cache_capacity: parsed(&get, "SANITY_CACHE_CAPACITY", 1024)?,
        };

        let intake = IntakeConfig {
            database_url: get("DATABASE_URL"),
            supabase_url: get("SUPABASE_URL").or_else(|| get("NEXT_PUBLIC_SUPABASE_URL")),
            service_role_key: get("SUPABASE_SERVICE_ROLE_KEY"),
            anon_key: get("SUPABASE_ANON_KEY").or_else(|| get("SUPABASE_PUBLISHABLE_KEY")),
        };

        Ok(Self {
            listen: get("GACHITORE_LISTEN").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            site,
            cms,
            intake,
            revalidate_secret: get("REVALIDATE_SECRET"),
            warm_limit: parsed(&get, "STATIC_PARAMS_LIMIT", 200)?,
        })
    }

    /// 由键值对构造配置，便于测试
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Result<Self, ConfigError> {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self::from_lookup(|name| map.get(name).cloned())
    }
}

fn parsed<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid(name)),
        None => Ok(default),
    }
}

fn apply_site_file(site: &mut SiteConfig, content: &str) -> Result<(), ConfigError> {
    let file: SiteFile =
        toml::from_str(content).map_err(|e| ConfigError::SiteFile(e.message().to_string()))?;

    let fields = [
        (file.name, &mut site.name),
        (file.title, &mut site.title),
        (file.description, &mut site.description),
        (file.feed_description, &mut site.feed_description),
        (file.language, &mut site.language),
        (file.locale, &mut site.locale),
        (file.url, &mut site.url),
    ];
    for (value, slot) in fields {
        if let Some(value) = value {
            *slot = value;
        }
    }
    Ok(())
}

/// 去掉末尾斜杠，空值回退到本地地址
pub fn normalize_site_url(url: &str) -> String {
    let trimmed = url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        DEFAULT_SITE_URL.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_missing_project_id_reports_name_only() {
        let err = Config::from_pairs([("SANITY_DATASET", "staging")]).unwrap_err();
        assert_eq!(err.to_string(), "Missing env: SANITY_PROJECT_ID");
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_pairs([("SANITY_PROJECT_ID", "abc123")]).expect("配置应有效");

        assert_eq!(config.cms.dataset, "production");
        assert_eq!(config.cms.api_version, "2025-01-13");
        assert!(config.cms.use_cdn);
        assert_eq!(config.cms.timeout, Duration::from_secs(10));
        assert_eq!(config.site.url, "http://localhost:3000");
        assert_eq!(config.warm_limit, 200);
        assert!(config.intake.database_url.is_none());
        assert!(config.revalidate_secret.is_none());
    }

    #[test]
    fn test_query_endpoint() {
        let mut config = Config::from_pairs([
            ("SANITY_PROJECT_ID", "abc123"),
            ("SANITY_USE_CDN", "false"),
        ])
        .expect("配置应有效");
        assert_eq!(
            config.cms.query_endpoint(),
            "https://abc123.api.sanity.io/v2025-01-13/data/query/production"
        );

        config.cms.use_cdn = true;
        assert!(config.cms.query_endpoint().starts_with("https://abc123.apicdn.sanity.io/"));

        config.cms.api_host = Some("http://127.0.0.1:9999/".to_string());
        assert_eq!(
            config.cms.query_endpoint(),
            "http://127.0.0.1:9999/v2025-01-13/data/query/production"
        );
    }

    #[test]
    fn test_invalid_number_reports_name() {
        let err = Config::from_pairs([
            ("SANITY_PROJECT_ID", "abc123"),
            ("SANITY_TIMEOUT_SECS", "soon"),
        ])
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid env: SANITY_TIMEOUT_SECS");
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_pairs([
            ("SANITY_PROJECT_ID", "abc123"),
            ("DATABASE_URL", "   "),
            ("SUPABASE_ANON_KEY", ""),
            ("SUPABASE_PUBLISHABLE_KEY", "pk"),
        ])
        .expect("配置应有效");
        assert!(config.intake.database_url.is_none());
        assert_eq!(config.intake.anon_key().expect("应回退到 publishable key"), "pk");
        assert_eq!(
            config.intake.supabase_url().unwrap_err().to_string(),
            "Missing env: SUPABASE_URL"
        );
    }

    #[test]
    fn test_site_file_then_env_url() {
        let mut file = tempfile::NamedTempFile::new().expect("创建临时文件失败");
        writeln!(
            file,
            r#"
            name = "other"
            description = "説明"
            url = "https://from-file.example/"
            "#
        )
        .expect("写入失败");
        let path = file.path().to_string_lossy().to_string();

        let config = Config::from_pairs([
            ("SANITY_PROJECT_ID", "abc123"),
            ("GACHITORE_SITE_CONFIG", path.as_str()),
        ])
        .expect("配置应有效");
        assert_eq!(config.site.name, "other");
        assert_eq!(config.site.description, "説明");
        assert_eq!(config.site.url, "https://from-file.example");
        assert_eq!(config.site.language, "ja");

        let config = Config::from_pairs([
            ("SANITY_PROJECT_ID", "abc123"),
            ("GACHITORE_SITE_CONFIG", path.as_str()),
            ("SITE_URL", "https://gachitore.example///"),
        ])
        .expect("配置应有效");
        assert_eq!(config.site.url, "https://gachitore.example");
    }
}
