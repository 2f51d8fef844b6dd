use std::sync::Arc;

use crate::{
    cms::{ContentFetcher, QueryExecutor},
    loader::Loader,
};

/// 启动时预取分类 slug 与最新 `limit` 篇文章详情
///
/// 失败只记录日志，不影响启动。返回成功预取的文章数。
pub async fn warm_cache<E: QueryExecutor>(fetcher: Arc<ContentFetcher<E>>, limit: usize) -> usize {
    if limit == 0 {
        return 0;
    }

    let loader = Loader::new(fetcher.clone());
    let slugs = match tokio::try_join!(loader.category_slugs(), loader.recent_post_slugs(limit)) {
        Ok((categories, posts)) => {
            tracing::info!(categories = categories.len(), posts = posts.len(), "warming cache");
            posts
        }
        Err(e) => {
            tracing::warn!(%e, "cache warm-up skipped");
            return 0;
        }
    };

    let mut warmed = 0;
    for slug in slugs.iter().filter(|s| !s.slug.is_empty()) {
        match Loader::new(fetcher.clone()).post_by_slug(&slug.slug).await {
            Ok(_) => warmed += 1,
            Err(e) => tracing::warn!(slug = %slug.slug, %e, "post warm-up failed"),
        }
    }
    tracing::info!(warmed, "cache warm-up finished");
    warmed
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::cms::{Revalidate, params, queries, tests::FakeExecutor};

    #[tokio::test]
    async fn test_warms_recent_posts() {
        let executor = Arc::new(FakeExecutor::with([
            ("CATEGORY_SLUGS", json!([{ "slug": "legs" }])),
            ("POST_SLUGS_LIMITED", json!([{ "slug": "squat" }, { "slug": "" }])),
            ("POST", json!({ "_id": "p1", "title": "スクワット", "slug": "squat" })),
        ]));
        let fetcher = Arc::new(ContentFetcher::new(executor.clone(), 64));

        assert_eq!(warm_cache(fetcher.clone(), 10).await, 1);
        assert_eq!(executor.calls(), 3);

        let _: serde_json::Value = fetcher
            .fetch(
                &queries::POST,
                &params([("slug", json!("squat"))]),
                Revalidate::default(),
                &["post"],
            )
            .await
            .expect("查询失败");
        assert_eq!(executor.calls(), 3, "预取后的文章应命中缓存");
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let executor = Arc::new(FakeExecutor {
            fail: true,
            ..Default::default()
        });
        let fetcher = Arc::new(ContentFetcher::new(executor, 64));
        assert_eq!(warm_cache(fetcher, 10).await, 0);
    }

    #[tokio::test]
    async fn test_zero_limit_disables() {
        let executor = Arc::new(FakeExecutor::default());
        let fetcher = Arc::new(ContentFetcher::new(executor.clone(), 64));
        assert_eq!(warm_cache(fetcher, 0).await, 0);
        assert_eq!(executor.calls(), 0);
    }
}
