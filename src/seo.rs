use serde::Serialize;
use serde_json::{Value, json};

use crate::{config::SiteConfig, content::Post};

/// 社交分享图尺寸
const OG_IMAGE_WIDTH: u32 = 1200;
const OG_IMAGE_HEIGHT: u32 = 630;

/// 面包屑标签的最大字符数
const BREADCRUMB_LABEL_MAX: usize = 30;

/// 拼接站点根地址与路径
///
/// ```ignore
/// assert_eq!(absolute_url("https://example.com", "posts"), "https://example.com/posts");
/// ```
pub fn absolute_url(site_url: &str, path: &str) -> String {
    if path.starts_with('/') {
        format!("{site_url}{path}")
    } else {
        format!("{site_url}/{path}")
    }
}

/// 规范地址，可附带查询串
pub fn canonical_url(site_url: &str, path: &str, query: Option<&str>) -> String {
    let url = absolute_url(site_url, path);
    match query.map(|q| q.trim_start_matches('?')).filter(|q| !q.is_empty()) {
        Some(q) => format!("{url}?{q}"),
        None => url,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenGraph {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub url: String,
    pub site_name: String,
    pub locale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_time: Option<String>,
}

/// 页面元信息
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub title: String,
    pub description: String,
    pub canonical: String,
    pub open_graph: OpenGraph,
}

impl PageMeta {
    /// 列表类页面
    pub fn page(site: &SiteConfig, title: Option<&str>, description: Option<&str>, path: &str) -> Self {
        let url = absolute_url(&site.url, path);
        Self {
            title: title
                .map(|t| format!("{t} | {}", site.name))
                .unwrap_or_else(|| site.title.clone()),
            description: description
                .filter(|d| !d.is_empty())
                .unwrap_or(site.description.as_str())
                .to_string(),
            canonical: url.clone(),
            open_graph: OpenGraph {
                kind: "website",
                url,
                site_name: site.name.clone(),
                locale: site.locale.clone(),
                image: None,
                published_time: None,
            },
        }
    }

    /// 文章页面，描述缺失时由标题生成
    pub fn post(site: &SiteConfig, post: &Post) -> Self {
        let url = absolute_url(&site.url, &post.path());
        let description = post
            .excerpt
            .clone()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| format!("{}に関する記事", post.title));

        Self {
            title: post.title.clone(),
            description,
            canonical: url.clone(),
            open_graph: OpenGraph {
                kind: "article",
                url,
                site_name: site.name.clone(),
                locale: site.locale.clone(),
                image: og_image(post),
                published_time: post.published_at.map(|d| d.to_rfc3339()),
            },
        }
    }
}

fn og_image(post: &Post) -> Option<String> {
    post.main_image
        .as_ref()?
        .asset
        .as_ref()
        .map(|a| a.sized_url(Some(OG_IMAGE_WIDTH), Some(OG_IMAGE_HEIGHT)))
}

/// 面包屑项，末项没有链接
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
}

fn short_label(title: &str) -> String {
    if title.chars().count() > BREADCRUMB_LABEL_MAX {
        let head: String = title.chars().take(BREADCRUMB_LABEL_MAX).collect();
        format!("{head}...")
    } else {
        title.to_string()
    }
}

/// 文章页面包屑：文章列表、首个分类、文章标题
pub fn post_breadcrumb(post: &Post) -> Vec<Crumb> {
    let mut crumbs = vec![Crumb {
        label: "ARTICLES".to_string(),
        href: Some("/posts".to_string()),
    }];
    if let Some(category) = post.categories.first() {
        crumbs.push(Crumb {
            label: category.title.to_uppercase(),
            href: Some(category.path()),
        });
    }
    crumbs.push(Crumb {
        label: short_label(&post.title),
        href: None,
    });
    crumbs
}

/// schema.org BreadcrumbList，首项固定为首页
pub fn breadcrumb_json_ld(site: &SiteConfig, post: &Post) -> Value {
    let mut items = vec![
        ("HOME".to_string(), absolute_url(&site.url, "/")),
        ("ARTICLES".to_string(), absolute_url(&site.url, "/posts")),
    ];
    if let Some(category) = post.categories.first() {
        items.push((category.title.clone(), absolute_url(&site.url, &category.path())));
    }
    items.push((post.title.clone(), absolute_url(&site.url, &post.path())));

    let elements: Vec<Value> = items
        .into_iter()
        .enumerate()
        .map(|(i, (name, item))| {
            json!({
                "@type": "ListItem",
                "position": i + 1,
                "name": name,
                "item": item,
            })
        })
        .collect();

    json!({
        "@context": "https://schema.org",
        "@type": "BreadcrumbList",
        "itemListElement": elements,
    })
}

/// schema.org Article，缺失的可选字段不输出
pub fn article_json_ld(site: &SiteConfig, post: &Post) -> Value {
    let mut article = json!({
        "@context": "https://schema.org",
        "@type": "Article",
        "headline": post.title,
        "mainEntityOfPage": absolute_url(&site.url, &post.path()),
        "publisher": {
            "@type": "Organization",
            "name": site.name,
            "url": absolute_url(&site.url, "/"),
        },
        "inLanguage": "ja-JP",
    });

    let optional = [
        ("description", post.excerpt.clone().filter(|e| !e.is_empty()).map(Value::from)),
        ("datePublished", post.published_at.map(|d| Value::from(d.to_rfc3339()))),
        ("dateModified", post.updated_at.map(|d| Value::from(d.to_rfc3339()))),
        (
            "author",
            post.author
                .as_ref()
                .filter(|a| !a.name.is_empty())
                .map(|a| json!([{ "@type": "Person", "name": a.name }])),
        ),
        ("image", og_image(post).map(|url| json!([url]))),
    ];
    for (name, value) in optional {
        if let Some(value) = value {
            article[name] = value;
        }
    }
    article
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::content::{Author, Category, ImageAsset, ImageRef};

    fn site() -> SiteConfig {
        SiteConfig {
            url: "https://gachitore.example".into(),
            ..Default::default()
        }
    }

    fn post() -> Post {
        Post {
            id: "p1".into(),
            title: "スクワット完全ガイド".into(),
            slug: "squat".into(),
            published_at: Some(Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap()),
            categories: vec![Category {
                title: "Legs".into(),
                slug: "legs".into(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_absolute_and_canonical() {
        assert_eq!(absolute_url("https://a.example", "/posts"), "https://a.example/posts");
        assert_eq!(absolute_url("https://a.example", "posts"), "https://a.example/posts");
        assert_eq!(
            canonical_url("https://a.example", "/posts", Some("?page=2")),
            "https://a.example/posts?page=2"
        );
        assert_eq!(canonical_url("https://a.example", "/posts", Some("")), "https://a.example/posts");
    }

    #[test]
    fn test_post_meta_defaults_description() {
        let meta = PageMeta::post(&site(), &post());
        assert_eq!(meta.description, "スクワット完全ガイドに関する記事");
        assert_eq!(meta.canonical, "https://gachitore.example/posts/squat");
        assert_eq!(meta.open_graph.kind, "article");
        assert_eq!(meta.open_graph.locale, "ja_JP");
        assert!(meta.open_graph.image.is_none());
    }

    #[test]
    fn test_page_meta_title() {
        let meta = PageMeta::page(&site(), Some("記事一覧"), None, "/posts");
        assert_eq!(meta.title, "記事一覧 | gachitore");
        assert_eq!(meta.description, site().description);

        let meta = PageMeta::page(&site(), None, None, "/");
        assert_eq!(meta.title, site().title);
    }

    #[test]
    fn test_breadcrumb() {
        let mut post = post();
        post.title = "あ".repeat(31);
        let crumbs = post_breadcrumb(&post);
        assert_eq!(crumbs.len(), 3);
        assert_eq!(crumbs[1].label, "LEGS");
        assert_eq!(crumbs[2].label, format!("{}...", "あ".repeat(30)));

        let ld = breadcrumb_json_ld(&site(), &post);
        let items = ld["itemListElement"].as_array().expect("应为数组");
        assert_eq!(items.len(), 4);
        assert_eq!(items[3]["position"], 4);
        assert_eq!(items[2]["item"], "https://gachitore.example/categories/legs");
    }

    #[test]
    fn test_article_json_ld_omits_missing() {
        let ld = article_json_ld(&site(), &post());
        assert_eq!(ld["@type"], "Article");
        assert_eq!(ld["datePublished"], "2025-01-13T00:00:00+00:00");
        assert!(ld.get("description").is_none());
        assert!(ld.get("author").is_none());

        let mut post = post();
        post.author = Some(Author {
            name: "山田".into(),
            ..Default::default()
        });
        post.main_image = Some(ImageRef {
            asset: Some(ImageAsset {
                url: "https://cdn.sanity.io/a.jpg".into(),
                ..Default::default()
            }),
            ..Default::default()
        });
        let ld = article_json_ld(&site(), &post);
        assert_eq!(ld["author"][0]["name"], "山田");
        assert_eq!(
            ld["image"][0],
            "https://cdn.sanity.io/a.jpg?w=1200&h=630&fit=crop&auto=format"
        );
    }
}
