use std::{
    any::{Any, type_name},
    collections::HashMap,
    convert::Infallible,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::OnceCell;

use crate::{
    cms::{
        CmsError, ContentFetcher, Query, QueryExecutor, QueryParams, Revalidate, TAG_CATEGORY,
        TAG_POST, params, queries,
    },
    content::{Author, Category, HomePage, Post, PostsPage, SiteSettings, SlugRef},
};

/// 订阅源与站点地图的重新验证间隔
const FEED_REVALIDATE: Revalidate = Revalidate::After(Duration::from_secs(3600));

type Memo = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

/// 页面数据访问入口
///
/// 每个入站请求创建一个 [`Loader`]，同一请求内相同的读取只执行一次，并发调用共享同一次执行。
/// 记忆化不会跨请求，跨请求复用由 [`ContentFetcher`] 的缓存负责。
///
/// "不存在" 以 `None` 或空列表表示，而不是错误。
pub struct Loader<E> {
    fetcher: Arc<ContentFetcher<E>>,
    memo: Mutex<HashMap<String, Memo>>,
}

impl<E: QueryExecutor> Loader<E> {
    pub fn new(fetcher: Arc<ContentFetcher<E>>) -> Self {
        Self {
            fetcher,
            memo: Mutex::new(HashMap::new()),
        }
    }

    async fn memoize<T, F>(&self, key: String, load: F) -> Result<T, CmsError>
    where
        T: Clone + Send + Sync + 'static,
        F: Future<Output = Result<T, CmsError>>,
    {
        let cell = {
            let mut memo = self.memo.lock().unwrap_or_else(PoisonError::into_inner);
            memo.entry(format!("{}:{key}", type_name::<T>()))
                .or_default()
                .clone()
        };

        let value = cell
            .get_or_try_init(|| async {
                let value = load.await?;
                Ok::<_, CmsError>(Arc::new(value) as Arc<dyn Any + Send + Sync>)
            })
            .await?;

        value
            .downcast_ref::<T>()
            .cloned()
            .ok_or(CmsError::MemoType(type_name::<T>()))
    }

    async fn load<T>(
        &self,
        query: &Query,
        params: QueryParams,
        policy: Revalidate,
        tags: &[&str],
    ) -> Result<T, CmsError>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        let key = crate::cms::cache_key(query, &params);
        self.memoize(key, self.fetcher.fetch(query, &params, policy, tags))
            .await
    }

    pub async fn site_settings(&self) -> Result<Option<SiteSettings>, CmsError> {
        self.load(&queries::SITE_SETTINGS, params([]), Revalidate::default(), &[])
            .await
    }

    pub async fn post_by_slug(&self, slug: &str) -> Result<Option<Post>, CmsError> {
        self.load(
            &queries::POST,
            params([("slug", json!(slug))]),
            Revalidate::default(),
            &[TAG_POST],
        )
        .await
    }

    pub async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, CmsError> {
        self.load(
            &queries::CATEGORY,
            params([("slug", json!(slug))]),
            Revalidate::default(),
            &[TAG_CATEGORY],
        )
        .await
    }

    pub async fn categories_nav(&self) -> Result<Vec<Category>, CmsError> {
        let nav: Option<Vec<Category>> = self
            .load(
                &queries::CATEGORIES_NAV,
                params([]),
                Revalidate::default(),
                &[TAG_CATEGORY],
            )
            .await?;
        Ok(nav.unwrap_or_default())
    }

    /// 文章分页，`start..end` 为半开区间
    pub async fn posts_page(&self, start: u64, end: u64) -> Result<PostsPage, CmsError> {
        let page: Option<PostsPage> = self
            .load(
                &queries::POSTS_PAGINATED,
                params([("start", json!(start)), ("end", json!(end))]),
                Revalidate::default(),
                &[TAG_POST],
            )
            .await?;
        Ok(page.unwrap_or_default())
    }

    /// 最新文章的 slug，永久缓存直到 `post` 标签失效
    pub async fn recent_post_slugs(&self, limit: usize) -> Result<Vec<SlugRef>, CmsError> {
        let slugs: Option<Vec<SlugRef>> = self
            .load(
                &queries::POST_SLUGS_LIMITED,
                params([("limit", json!(limit))]),
                Revalidate::Static,
                &[TAG_POST],
            )
            .await?;
        Ok(slugs.unwrap_or_default())
    }

    /// 全部分类 slug，永久缓存直到 `category` 标签失效
    pub async fn category_slugs(&self) -> Result<Vec<SlugRef>, CmsError> {
        let slugs: Option<Vec<SlugRef>> = self
            .load(
                &queries::CATEGORY_SLUGS,
                params([]),
                Revalidate::Static,
                &[TAG_CATEGORY],
            )
            .await?;
        Ok(slugs.unwrap_or_default())
    }

    /// 站点地图使用的全部文章 slug
    pub async fn all_post_slugs(&self) -> Result<Vec<SlugRef>, CmsError> {
        let slugs: Option<Vec<SlugRef>> = self
            .load(&queries::POST_SLUGS, params([]), FEED_REVALIDATE, &[TAG_POST])
            .await?;
        Ok(slugs.unwrap_or_default())
    }

    /// 订阅源使用的最新 50 篇文章
    pub async fn rss_posts(&self) -> Result<Vec<Post>, CmsError> {
        let posts: Option<Vec<Post>> = self
            .load(&queries::RSS_POSTS, params([]), FEED_REVALIDATE, &[TAG_POST])
            .await?;
        Ok(posts.unwrap_or_default())
    }

    pub async fn categories(&self) -> Result<Vec<Category>, CmsError> {
        let categories: Option<Vec<Category>> = self
            .load(
                &queries::CATEGORIES,
                params([]),
                Revalidate::default(),
                &[TAG_CATEGORY, TAG_POST],
            )
            .await?;
        Ok(categories.unwrap_or_default())
    }

    pub async fn posts_by_category(&self, category_slug: &str) -> Result<Vec<Post>, CmsError> {
        let posts: Option<Vec<Post>> = self
            .load(
                &queries::POSTS_BY_CATEGORY,
                params([("categorySlug", json!(category_slug))]),
                Revalidate::default(),
                &[TAG_POST, TAG_CATEGORY],
            )
            .await?;
        Ok(posts.unwrap_or_default())
    }

    pub async fn authors(&self) -> Result<Vec<Author>, CmsError> {
        let authors: Option<Vec<Author>> = self
            .load(&queries::AUTHORS, params([]), Revalidate::default(), &[TAG_POST])
            .await?;
        Ok(authors.unwrap_or_default())
    }

    /// 全文检索，不缓存；空白关键字直接返回空列表
    pub async fn search_posts(&self, keyword: &str) -> Result<Vec<Post>, CmsError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Vec::new());
        }
        let posts: Option<Vec<Post>> = self
            .load(
                &queries::SEARCH_POSTS,
                params([("query", json!(keyword))]),
                Revalidate::Never,
                &[],
            )
            .await?;
        Ok(posts.unwrap_or_default())
    }

    pub async fn home_page(&self) -> Result<HomePage, CmsError> {
        let home: Option<HomePage> = self
            .load(
                &queries::HOME_PAGE,
                params([]),
                Revalidate::default(),
                &[TAG_POST, TAG_CATEGORY],
            )
            .await?;
        Ok(home.unwrap_or_default())
    }
}

impl<S, E> FromRequestParts<S> for Loader<E>
where
    S: Send + Sync,
    E: QueryExecutor + 'static,
    Arc<ContentFetcher<E>>: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(Loader::new(Arc::<ContentFetcher<E>>::from_ref(state)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cms::tests::FakeExecutor;

    fn loader(executor: Arc<FakeExecutor>) -> Loader<Arc<FakeExecutor>> {
        Loader::new(Arc::new(ContentFetcher::new(executor, 64)))
    }

    #[tokio::test]
    async fn test_memoized_within_request() {
        let executor = Arc::new(FakeExecutor::with([(
            "SEARCH_POSTS",
            json!([{ "_id": "p1", "title": "ベンチ", "slug": "bench" }]),
        )]));
        let loader = loader(executor.clone());

        let (a, b) = tokio::try_join!(loader.search_posts("ベンチ"), loader.search_posts("ベンチ"))
            .expect("查询失败");
        assert_eq!(a, b);
        assert_eq!(a[0].slug, "bench");
        assert_eq!(executor.calls(), 1, "同一请求内并发调用应只执行一次");

        loader.search_posts("スクワット").await.expect("查询失败");
        assert_eq!(executor.calls(), 2, "参数不同不共享");
    }

    #[tokio::test]
    async fn test_not_memoized_across_requests() {
        let executor = Arc::new(FakeExecutor::with([("SEARCH_POSTS", json!([]))]));
        let fetcher = Arc::new(ContentFetcher::new(executor.clone(), 64));

        Loader::new(fetcher.clone()).search_posts("a").await.expect("查询失败");
        Loader::new(fetcher).search_posts("a").await.expect("查询失败");
        assert_eq!(executor.calls(), 2, "不缓存的查询在新请求中应重新执行");
    }

    #[tokio::test]
    async fn test_not_found_is_none() {
        let executor = Arc::new(FakeExecutor::default());
        let loader = loader(executor);

        assert!(loader.post_by_slug("missing").await.expect("查询失败").is_none());
        assert!(loader.category_by_slug("missing").await.expect("查询失败").is_none());
        assert!(loader.categories().await.expect("查询失败").is_empty());
        assert_eq!(loader.posts_page(0, 12).await.expect("查询失败").total, 0);
    }

    #[tokio::test]
    async fn test_blank_search_skips_store() {
        let executor = Arc::new(FakeExecutor::default());
        let loader = loader(executor.clone());

        assert!(loader.search_posts("   ").await.expect("查询失败").is_empty());
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_failure_propagates() {
        let executor = Arc::new(FakeExecutor {
            fail: true,
            ..Default::default()
        });
        let loader = loader(executor);
        assert!(matches!(
            loader.home_page().await,
            Err(CmsError::Status { status: 500, .. })
        ));
    }
}
