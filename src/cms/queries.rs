//! GROQ 查询目录
//!
//! 每个查询的文本都是静态的，参数只通过 `$name` 绑定传入，绝不拼接。

/// 命名查询
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Query {
    /// 查询名，用于缓存键和日志
    pub name: &'static str,
    /// GROQ 文本
    pub text: &'static str,
}

macro_rules! image_fragment {
    () => {
        "asset->{ _id, url, metadata { lqip, dimensions } }, alt, caption"
    };
}

macro_rules! define_query {
    ($ident:ident, $($text:expr),+ $(,)?) => {
        pub const $ident: Query = Query {
            name: stringify!($ident),
            text: concat!($($text),+),
        };
    };
}

define_query!(
    SITE_SETTINGS,
    r#"*[_type == "siteSettings"][0] { title, description, logo { "#,
    image_fragment!(),
    r#" }, ogImage { "#,
    image_fragment!(),
    " } }",
);

define_query!(
    POSTS,
    r#"*[_type == "post"] | order(publishedAt desc) { _id, title, "slug": slug.current, publishedAt, excerpt, featured, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current, image { "#,
    image_fragment!(),
    r#" } }, categories[]->{ title, "slug": slug.current } }"#,
);

define_query!(
    POSTS_PAGINATED,
    r#"{ "posts": *[_type == "post"] | order(publishedAt desc)[$start...$end] { _id, title, "slug": slug.current, publishedAt, excerpt, featured, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current }, categories[]->{ title, "slug": slug.current } }, "total": count(*[_type == "post"]) }"#,
);

define_query!(
    FEATURED_POSTS,
    r#"*[_type == "post" && featured == true] | order(publishedAt desc)[0...3] { _id, title, "slug": slug.current, publishedAt, excerpt, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current, image { "#,
    image_fragment!(),
    r#" } }, categories[]->{ title, "slug": slug.current } }"#,
);

define_query!(
    LATEST_POSTS,
    r#"*[_type == "post"] | order(publishedAt desc)[0...6] { _id, title, "slug": slug.current, publishedAt, excerpt, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current, image { "#,
    image_fragment!(),
    r#" } }, categories[]->{ title, "slug": slug.current } }"#,
);

define_query!(
    RSS_POSTS,
    r#"*[_type == "post" && defined(slug.current)] | order(publishedAt desc)[0...50] { _id, title, "slug": slug.current, publishedAt, _updatedAt, excerpt }"#,
);

define_query!(
    POST,
    r#"*[_type == "post" && slug.current == $slug][0] { _id, _updatedAt, title, "slug": slug.current, publishedAt, excerpt, featured, body[] { ..., _type == "image" => { ..., "#,
    image_fragment!(),
    r#" } }, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current, bio, image { "#,
    image_fragment!(),
    r#" } }, categories[]->{ _id, title, "slug": slug.current }, "relatedPosts": *[_type == "post" && slug.current != $slug && count(categories[@._ref in ^.^.categories[]._ref]) > 0] | order(publishedAt desc)[0...4] { _id, title, "slug": slug.current, publishedAt, mainImage { "#,
    image_fragment!(),
    r#" }, categories[]->{ title, "slug": slug.current } } }"#,
);

define_query!(
    POST_SLUGS,
    r#"*[_type == "post" && defined(slug.current)] | order(publishedAt desc) { "slug": slug.current, publishedAt, _updatedAt }"#,
);

define_query!(
    POST_SLUGS_LIMITED,
    r#"*[_type == "post" && defined(slug.current)] | order(publishedAt desc)[0...$limit] { "slug": slug.current }"#,
);

define_query!(
    CATEGORY_SLUGS,
    r#"*[_type == "category" && defined(slug.current)] { "slug": slug.current }"#,
);

define_query!(
    CATEGORIES,
    r#"*[_type == "category"] | order(title asc) { _id, title, "slug": slug.current, description, "postCount": count(*[_type == "post" && references(^._id)]) }"#,
);

define_query!(
    CATEGORIES_NAV,
    r#"*[_type == "category" && defined(slug.current)] | order(title asc) { title, "slug": slug.current }"#,
);

define_query!(
    POSTS_BY_CATEGORY,
    r#"*[_type == "post" && $categorySlug in categories[]->slug.current] | order(publishedAt desc) { _id, title, "slug": slug.current, publishedAt, excerpt, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current, image { "#,
    image_fragment!(),
    r#" } }, categories[]->{ title, "slug": slug.current } }"#,
);

define_query!(
    CATEGORY,
    r#"*[_type == "category" && slug.current == $slug][0] { _id, title, "slug": slug.current, description }"#,
);

define_query!(
    AUTHORS,
    r#"*[_type == "author"] | order(name asc) { _id, name, "slug": slug.current, bio, image { "#,
    image_fragment!(),
    r#" }, "postCount": count(*[_type == "post" && references(^._id)]) }"#,
);

define_query!(
    SEARCH_POSTS,
    r#"*[_type == "post" && (title match $query + "*" || excerpt match $query + "*" || pt::text(body) match $query + "*")] | order(publishedAt desc) { _id, title, "slug": slug.current, publishedAt, excerpt, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current, image { "#,
    image_fragment!(),
    r#" } }, categories[]->{ title, "slug": slug.current } }"#,
);

define_query!(
    HOME_PAGE,
    r#"{ "featured": *[_type == "post" && featured == true] | order(publishedAt desc)[0...3] { _id, title, "slug": slug.current, publishedAt, excerpt, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current }, categories[]->{ title, "slug": slug.current } }, "latest": *[_type == "post"] | order(publishedAt desc)[0...6] { _id, title, "slug": slug.current, publishedAt, excerpt, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current }, categories[]->{ title, "slug": slug.current } }, "categories": *[_type == "category"] | order(title asc) { _id, title, "slug": slug.current, description, "postCount": count(*[_type == "post" && references(^._id)]), "posts": *[_type == "post" && references(^._id)] | order(publishedAt desc)[0...6] { _id, title, "slug": slug.current, publishedAt, excerpt, mainImage { "#,
    image_fragment!(),
    r#" }, author->{ name, "slug": slug.current }, categories[]->{ title, "slug": slug.current } } } }"#,
);

/// 目录中的全部查询
pub const ALL: &[Query] = &[
    SITE_SETTINGS,
    POSTS,
    POSTS_PAGINATED,
    FEATURED_POSTS,
    LATEST_POSTS,
    RSS_POSTS,
    POST,
    POST_SLUGS,
    POST_SLUGS_LIMITED,
    CATEGORY_SLUGS,
    CATEGORIES,
    CATEGORIES_NAV,
    POSTS_BY_CATEGORY,
    CATEGORY,
    AUTHORS,
    SEARCH_POSTS,
    HOME_PAGE,
];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    /// 统计括号是否配对，粗略检查拼接后的 GROQ 文本
    fn balanced(text: &str) -> bool {
        let mut stack = Vec::new();
        for c in text.chars() {
            match c {
                '{' | '[' | '(' => stack.push(c),
                '}' => {
                    if stack.pop() != Some('{') {
                        return false;
                    }
                }
                ']' => {
                    if stack.pop() != Some('[') {
                        return false;
                    }
                }
                ')' => {
                    if stack.pop() != Some('(') {
                        return false;
                    }
                }
                _ => {}
            }
        }
        stack.is_empty()
    }

    #[test]
    fn test_catalog_names_unique_and_balanced() {
        let names: HashSet<_> = ALL.iter().map(|q| q.name).collect();
        assert_eq!(names.len(), ALL.len(), "查询名不应重复");

        for query in ALL {
            assert!(balanced(query.text), "{} 括号不配对", query.name);
        }
    }

    #[test]
    fn test_params_are_bound_not_interpolated() {
        assert!(POST.text.contains("slug.current == $slug"));
        assert!(POSTS_PAGINATED.text.contains("[$start...$end]"));
        assert!(POSTS_BY_CATEGORY.text.contains("$categorySlug in"));
        assert!(POST_SLUGS_LIMITED.text.contains("[0...$limit]"));
        assert!(SEARCH_POSTS.text.contains("title match $query"));
    }

    #[test]
    fn test_rss_limited_to_fifty() {
        assert!(RSS_POSTS.text.contains("[0...50]"));
        assert_eq!(RSS_POSTS.name, "RSS_POSTS");
    }
}
