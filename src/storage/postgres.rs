use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

/// 数据库连接池类型
pub type Db = sqlx::PgPool;

/// 根据连接 URL 创建数据库连接池
///
/// 连接池配置：
///
/// - 最大空闲时间 60 秒
/// - 最大生存时间 1500 秒（约 25 分钟）
/// - 最大连接数 10
/// - 获取连接超时 2 秒
/// - 获取前测试连接
///
/// 连接在第一次使用时才建立，数据库不可用时服务仍可启动。
pub fn new_db_pool(conn_url: &str) -> Result<Db, sqlx::Error> {
    PgPoolOptions::new()
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(1500))
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(2))
        .test_before_acquire(true)
        .connect_lazy(conn_url)
}

/// 执行 SQL 文件中的迁移语句
///
/// 将文件内容按 `;` 分割，每条 SQL 单独执行
pub async fn migrate(db: &Db, file: &str) -> crate::error::Result<()> {
    let content = tokio::fs::read_to_string(file).await?;

    for sql in content.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(sql).execute(db).await?;
    }
    Ok(())
}
