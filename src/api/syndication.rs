use std::sync::Arc;

use axum::{
    Router,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::Utc;

use super::PageLoader;
use crate::{
    config::Config,
    error::Result,
    state::AppState,
    syndication::{render_robots, render_rss, render_sitemap},
};

const FEED_CACHE_CONTROL: &str = "public, s-maxage=3600, stale-while-revalidate=3600";

/// 配置订阅源、站点地图与 robots.txt 路由
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/rss.xml", get(rss))
        .route("/sitemap.xml", get(sitemap))
        .route("/robots.txt", get(robots))
}

async fn rss(State(config): State<Arc<Config>>, loader: PageLoader) -> Result<Response> {
    let posts = loader.rss_posts().await?;
    let xml = render_rss(&config.site, &posts, Utc::now())?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/rss+xml; charset=utf-8"),
            (header::CACHE_CONTROL, FEED_CACHE_CONTROL),
        ],
        xml,
    )
        .into_response())
}

async fn sitemap(State(config): State<Arc<Config>>, loader: PageLoader) -> Result<Response> {
    let (categories, posts) = tokio::try_join!(loader.category_slugs(), loader.all_post_slugs())?;
    let xml = render_sitemap(&config.site, &categories, &posts, Utc::now())?;

    Ok(([(header::CONTENT_TYPE, "application/xml; charset=utf-8")], xml).into_response())
}

async fn robots(State(config): State<Arc<Config>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_robots(&config.site),
    )
}
