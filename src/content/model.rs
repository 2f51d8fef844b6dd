use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{ContentBlock, block::deserialize_body};

/// GROQ 对缺失字段返回 `null`，统一视为默认值
pub(crate) fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// 引用列表：整体为 `null` 视为空，失效引用解出的 `null` 元素及无法解析的元素跳过
pub(crate) fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter(|v| !v.is_null())
        .filter_map(|v| match serde_json::from_value(v) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::debug!(%e, "malformed list element skipped");
                None
            }
        })
        .collect())
}

/// 文章
///
/// 列表查询只投影部分字段，其余字段保持默认值。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    #[serde(rename = "_id", default, deserialize_with = "null_default")]
    pub id: String,
    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub slug: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub featured: bool,
    #[serde(default)]
    pub main_image: Option<ImageRef>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub categories: Vec<Category>,
    /// 正文按原顺序保存，由渲染器输出 HTML
    #[serde(default, deserialize_with = "deserialize_body", skip_serializing)]
    pub body: Vec<ContentBlock>,
    #[serde(default, deserialize_with = "lenient_seq", skip_serializing_if = "Vec::is_empty")]
    pub related_posts: Vec<Post>,
}

impl Post {
    /// 路径 `/posts/{slug}`
    pub fn path(&self) -> String {
        format!("/posts/{}", self.slug)
    }
}

/// 分类
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_default")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_count: Option<u64>,
}

impl Category {
    pub fn path(&self) -> String {
        format!("/categories/{}", self.slug)
    }
}

/// 首页中带有最新文章的分类
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CategoryWithPosts {
    #[serde(flatten)]
    pub category: Category,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub posts: Vec<Post>,
}

/// 作者
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_default")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_count: Option<u64>,
}

/// 图片引用，只读
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageRef {
    #[serde(default)]
    pub asset: Option<ImageAsset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
}

impl ImageRef {
    pub fn url(&self) -> Option<&str> {
        self.asset.as_ref().map(|a| a.url.as_str())
    }

    pub fn lqip(&self) -> Option<&str> {
        self.asset.as_ref()?.metadata.as_ref()?.lqip.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageAsset {
    #[serde(rename = "_id", default, deserialize_with = "null_default")]
    pub id: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ImageMetadata>,
}

impl ImageAsset {
    /// 带尺寸与自动格式参数的图片地址
    ///
    /// ```ignore
    /// // https://cdn.sanity.io/images/p/d/abc.jpg?w=1200&auto=format
    /// let url = asset.sized_url(Some(1200), None);
    /// ```
    pub fn sized_url(&self, width: Option<u32>, height: Option<u32>) -> String {
        let mut url = self.url.clone();
        let mut sep = if url.contains('?') { '&' } else { '?' };
        if let Some(w) = width {
            url.push_str(&format!("{sep}w={w}"));
            sep = '&';
        }
        if let Some(h) = height {
            url.push_str(&format!("{sep}h={h}&fit=crop"));
            sep = '&';
        }
        url.push_str(&format!("{sep}auto=format"));
        url
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ImageMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lqip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<Dimensions>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

/// 站点设置
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<ImageRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub og_image: Option<ImageRef>,
}

/// 分页文章列表
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PostsPage {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub posts: Vec<Post>,
    #[serde(default, deserialize_with = "null_default")]
    pub total: u64,
}

/// 首页聚合数据
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HomePage {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub featured: Vec<Post>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub latest: Vec<Post>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub categories: Vec<CategoryWithPosts>,
}

/// slug 列表项，站点地图额外使用时间字段
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlugRef {
    #[serde(default, deserialize_with = "null_default")]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(rename = "_updatedAt", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_post_tolerates_nulls() {
        let post: Post = serde_json::from_value(json!({
            "_id": "p1",
            "title": "スクワット入門",
            "slug": "squat",
            "publishedAt": "2025-01-13T00:00:00.000Z",
            "excerpt": null,
            "featured": null,
            "mainImage": null,
            "author": null,
            "categories": null,
            "body": null,
            "relatedPosts": null
        }))
        .expect("反序列化失败");

        assert_eq!(post.slug, "squat");
        assert!(!post.featured);
        assert!(post.categories.is_empty());
        assert!(post.body.is_empty());
        assert_eq!(post.path(), "/posts/squat");
        assert_eq!(
            post.published_at.map(|d| d.to_rfc3339()),
            Some("2025-01-13T00:00:00+00:00".to_string())
        );
    }

    #[test]
    fn test_dangling_references_are_skipped() {
        let posts: Vec<Post> = serde_json::from_value(json!([{
            "_id": "p1",
            "slug": "squat",
            "categories": [null, { "_id": "c1", "title": "脚", "slug": "legs" }, 42],
            "relatedPosts": [null, { "_id": "p2", "slug": "deadlift" }]
        }]))
        .expect("反序列化失败");

        let post = &posts[0];
        assert_eq!(post.categories.len(), 1);
        assert_eq!(post.categories[0].slug, "legs");
        assert_eq!(post.related_posts.len(), 1);
        assert_eq!(post.related_posts[0].slug, "deadlift");

        let home: HomePage = serde_json::from_value(json!({
            "featured": [null],
            "latest": [{ "slug": "a" }, null],
            "categories": [null, { "slug": "legs", "posts": [null] }]
        }))
        .expect("反序列化失败");
        assert!(home.featured.is_empty());
        assert_eq!(home.latest.len(), 1);
        assert_eq!(home.categories[0].category.slug, "legs");
        assert!(home.categories[0].posts.is_empty());
    }

    #[test]
    fn test_post_serialization_skips_body() {
        let post = Post {
            slug: "a".into(),
            ..Default::default()
        };
        let value = serde_json::to_value(&post).expect("序列化失败");
        assert!(value.get("body").is_none());
        assert!(value.get("relatedPosts").is_none());
        assert_eq!(value["_id"], "");
        assert_eq!(value["publishedAt"], json!(null));
    }

    #[test]
    fn test_sized_url() {
        let asset = ImageAsset {
            id: "image-1".into(),
            url: "https://cdn.sanity.io/images/p/d/abc.jpg".into(),
            metadata: None,
        };
        assert_eq!(
            asset.sized_url(Some(1200), None),
            "https://cdn.sanity.io/images/p/d/abc.jpg?w=1200&auto=format"
        );
        assert_eq!(
            asset.sized_url(Some(1200), Some(630)),
            "https://cdn.sanity.io/images/p/d/abc.jpg?w=1200&h=630&fit=crop&auto=format"
        );

        let asset = ImageAsset {
            url: "https://cdn.example/a.png?dl=1".into(),
            ..asset
        };
        assert_eq!(asset.sized_url(None, None), "https://cdn.example/a.png?dl=1&auto=format");
    }

    #[test]
    fn test_category_with_posts_flatten() {
        let category: CategoryWithPosts = serde_json::from_value(json!({
            "_id": "c1",
            "title": "筋トレ",
            "slug": "training",
            "description": null,
            "postCount": 2,
            "posts": [{ "_id": "p1", "title": "a", "slug": "a" }]
        }))
        .expect("反序列化失败");

        assert_eq!(category.category.slug, "training");
        assert_eq!(category.category.post_count, Some(2));
        assert_eq!(category.posts.len(), 1);
    }
}
