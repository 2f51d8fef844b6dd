use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use axum_extra::extract::Query;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::PageLoader;
use crate::{
    config::{Config, SiteConfig},
    content::{Author, Category, HomePage, Post, SiteSettings, format_date_ja},
    error::{Error, Result},
    render::{TocEntry, extract_toc, render_blocks},
    seo::{
        Crumb, PageMeta, absolute_url, article_json_ld, breadcrumb_json_ld, canonical_url,
        post_breadcrumb,
    },
    state::AppState,
};

const POSTS_PER_PAGE: u64 = 12;

/// 配置页面数据路由。
///
/// - `GET /home`：首页聚合数据
/// - `GET /site`：站点信息与分类导航
/// - `GET /posts?page=N`：文章分页
/// - `GET /posts/{slug}`：文章详情，含渲染后的正文
/// - `GET /categories`、`GET /categories/{slug}`：分类
/// - `GET /authors`：作者
/// - `GET /search?q=`：全文检索
pub fn setup_route() -> Router<AppState> {
    Router::new()
        .route("/home", get(home))
        .route("/site", get(site))
        .route("/posts", get(posts_list))
        .route("/posts/{slug}", get(post_detail))
        .route("/categories", get(categories))
        .route("/categories/{slug}", get(category_detail))
        .route("/authors", get(authors))
        .route("/search", get(search))
}

#[derive(Debug, Serialize)]
struct HomeData {
    settings: Option<SiteSettings>,
    #[serde(flatten)]
    home: HomePage,
    meta: PageMeta,
}

async fn home(State(config): State<Arc<Config>>, loader: PageLoader) -> Result<Json<HomeData>> {
    let (settings, home) = tokio::try_join!(loader.site_settings(), loader.home_page())?;

    Ok(Json(HomeData {
        settings,
        home,
        meta: PageMeta::page(&config.site, None, None, "/"),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SiteData {
    name: String,
    title: String,
    description: String,
    url: String,
    settings: Option<SiteSettings>,
    categories_nav: Vec<Category>,
}

async fn site(State(config): State<Arc<Config>>, loader: PageLoader) -> Result<Json<SiteData>> {
    let (settings, categories_nav) =
        tokio::try_join!(loader.site_settings(), loader.categories_nav())?;
    let SiteConfig {
        name,
        title,
        description,
        url,
        ..
    } = config.site.clone();

    Ok(Json(SiteData {
        name,
        title,
        description,
        url,
        settings,
        categories_nav,
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageParams {
    page: Option<String>,
}

/// 页码从 1 开始，无法解析时视为第一页
fn current_page(raw: Option<&str>) -> u64 {
    raw.and_then(|p| p.trim().parse::<u64>().ok())
        .unwrap_or(1)
        .max(1)
}

fn total_pages(total: u64) -> u64 {
    total.div_ceil(POSTS_PER_PAGE)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostsList {
    posts: Vec<Post>,
    total: u64,
    page: u64,
    total_pages: u64,
    categories_nav: Vec<Category>,
    meta: PageMeta,
    item_list: Value,
}

async fn posts_list(
    State(config): State<Arc<Config>>,
    Query(params): Query<PageParams>,
    loader: PageLoader,
) -> Result<Json<PostsList>> {
    let page = current_page(params.page.as_deref());
    let start = (page - 1).saturating_mul(POSTS_PER_PAGE);
    let end = start.saturating_add(POSTS_PER_PAGE);

    let (posts_page, categories_nav) =
        tokio::try_join!(loader.posts_page(start, end), loader.categories_nav())?;

    let title = if page > 1 {
        format!("記事一覧（{page}ページ目）")
    } else {
        "記事一覧".to_string()
    };
    let mut meta = PageMeta::page(
        &config.site,
        Some(&title),
        Some("トレーニング・フィットネスに関する記事一覧"),
        "/posts",
    );
    if page > 1 {
        meta.canonical = canonical_url(&config.site.url, "/posts", Some(&format!("page={page}")));
        meta.open_graph.url = meta.canonical.clone();
    }

    let item_list = item_list_json_ld(&config.site, &posts_page.posts, start);

    Ok(Json(PostsList {
        total: posts_page.total,
        page,
        total_pages: total_pages(posts_page.total),
        posts: posts_page.posts,
        categories_nav,
        meta,
        item_list,
    }))
}

fn item_list_json_ld(site: &SiteConfig, posts: &[Post], offset: u64) -> Value {
    let elements: Vec<Value> = posts
        .iter()
        .zip(offset + 1..)
        .map(|(post, position)| {
            json!({
                "@type": "ListItem",
                "position": position,
                "url": absolute_url(&site.url, &post.path()),
            })
        })
        .collect();

    json!({
        "@context": "https://schema.org",
        "@type": "ItemList",
        "itemListOrder": "https://schema.org/ItemListOrderDescending",
        "numberOfItems": posts.len(),
        "itemListElement": elements,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PostPage {
    post: Post,
    published_label: Option<String>,
    body_html: String,
    toc: Vec<TocEntry>,
    categories_nav: Vec<Category>,
    meta: PageMeta,
    breadcrumb: Vec<Crumb>,
    json_ld: [Value; 2],
}

/// 根据 slug 获取文章详情。
///
/// 文章不存在返回 [`Error::NotFound`]。
async fn post_detail(
    Path(slug): Path<String>,
    State(config): State<Arc<Config>>,
    loader: PageLoader,
) -> Result<Json<PostPage>> {
    let (post, categories_nav) =
        tokio::try_join!(loader.post_by_slug(&slug), loader.categories_nav())?;
    let post = post.ok_or(Error::NotFound)?;

    let site = &config.site;
    Ok(Json(PostPage {
        published_label: post.published_at.as_ref().map(format_date_ja),
        body_html: render_blocks(&post.body),
        toc: extract_toc(&post.body),
        categories_nav,
        meta: PageMeta::post(site, &post),
        breadcrumb: post_breadcrumb(&post),
        json_ld: [breadcrumb_json_ld(site, &post), article_json_ld(site, &post)],
        post,
    }))
}

#[derive(Debug, Serialize)]
struct CategoriesData {
    categories: Vec<Category>,
    meta: PageMeta,
}

async fn categories(
    State(config): State<Arc<Config>>,
    loader: PageLoader,
) -> Result<Json<CategoriesData>> {
    Ok(Json(CategoriesData {
        categories: loader.categories().await?,
        meta: PageMeta::page(
            &config.site,
            Some("カテゴリー一覧"),
            Some("トレーニング・フィットネスに関する記事カテゴリー一覧です。"),
            "/categories",
        ),
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryPage {
    category: Category,
    posts: Vec<Post>,
    categories_nav: Vec<Category>,
    meta: PageMeta,
}

async fn category_detail(
    Path(slug): Path<String>,
    State(config): State<Arc<Config>>,
    loader: PageLoader,
) -> Result<Json<CategoryPage>> {
    let (category, posts, categories_nav) = tokio::try_join!(
        loader.category_by_slug(&slug),
        loader.posts_by_category(&slug),
        loader.categories_nav(),
    )?;
    let category = category.ok_or(Error::NotFound)?;

    let title = format!("{}の記事一覧", category.title);
    let fallback = format!("{}に関する記事一覧", category.title);
    let description = category
        .description
        .as_deref()
        .filter(|d| !d.is_empty())
        .unwrap_or(&fallback);
    let meta = PageMeta::page(&config.site, Some(&title), Some(description), &category.path());

    Ok(Json(CategoryPage {
        category,
        posts,
        categories_nav,
        meta,
    }))
}

async fn authors(loader: PageLoader) -> Result<Json<Vec<Author>>> {
    loader.authors().await.map(Json).map_err(Into::into)
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Debug, Serialize)]
struct SearchData {
    query: String,
    posts: Vec<Post>,
    meta: PageMeta,
}

/// 全文检索，关键字为空时不访问内容存储
async fn search(
    State(config): State<Arc<Config>>,
    Query(params): Query<SearchParams>,
    loader: PageLoader,
) -> Result<Json<SearchData>> {
    let query = params.q.unwrap_or_default().trim().to_string();
    let posts = loader.search_posts(&query).await?;

    let meta = if query.is_empty() {
        PageMeta::page(
            &config.site,
            Some("検索"),
            Some("サイト内の記事を検索できます。"),
            "/search",
        )
    } else {
        let mut meta = PageMeta::page(
            &config.site,
            Some(&format!("「{query}」の検索結果")),
            Some(&format!("「{query}」の検索結果ページです。")),
            "/search",
        );
        meta.canonical = search_canonical(&config.site.url, &query);
        meta.open_graph.url = meta.canonical.clone();
        meta
    };

    Ok(Json(SearchData { query, posts, meta }))
}

fn search_canonical(site_url: &str, query: &str) -> String {
    let base = absolute_url(site_url, "/search");
    reqwest::Url::parse_with_params(&base, &[("q", query)])
        .map(String::from)
        .unwrap_or(base)
}
