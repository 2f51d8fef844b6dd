//! RSS、站点地图与 robots.txt

use std::io::Cursor;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::{
    Writer,
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};

use crate::{
    config::SiteConfig,
    content::{Post, SlugRef},
    seo::absolute_url,
};

type XmlWriter = Writer<Cursor<Vec<u8>>>;

/* 示例
<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>gachitore</title>
  <link>https://gachitore.example</link>
  <description>最新の記事をRSSで配信します。</description>
  <language>ja</language>
  <lastBuildDate>Mon, 13 Jan 2025 00:00:00 +0000</lastBuildDate>
  <item>
    <title>スクワット完全ガイド</title>
    <link>https://gachitore.example/posts/squat</link>
    <guid isPermaLink="true">https://gachitore.example/posts/squat</guid>
    <pubDate>Mon, 13 Jan 2025 00:00:00 +0000</pubDate>
    <description>脚を鍛える</description>
  </item>
</channel>
</rss>
*/

/// 生成 RSS 2.0 订阅源
///
/// 没有发布时间的文章使用 `now` 作为 pubDate。
pub fn render_rss(site: &SiteConfig, posts: &[Post], now: DateTime<Utc>) -> quick_xml::Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let now_rfc2822 = now.to_rfc2822();

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    writer.write_event(Event::Start(rss))?;
    writer.write_event(Event::Start(BytesStart::new("channel")))?;

    push_text(&mut writer, "title", &site.name)?;
    push_text(&mut writer, "link", &site.url)?;
    push_text(&mut writer, "description", &site.feed_description)?;
    push_text(&mut writer, "language", &site.language)?;
    push_text(&mut writer, "lastBuildDate", &now_rfc2822)?;

    for post in posts {
        let url = absolute_url(&site.url, &post.path());

        writer.write_event(Event::Start(BytesStart::new("item")))?;
        push_text(&mut writer, "title", &post.title)?;
        push_text(&mut writer, "link", &url)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        writer.write_event(Event::Start(guid))?;
        writer.write_event(Event::Text(BytesText::new(&url)))?;
        writer.write_event(Event::End(BytesEnd::new("guid")))?;

        let pub_date = post
            .published_at
            .map(|d| d.to_rfc2822())
            .unwrap_or_else(|| now_rfc2822.clone());
        push_text(&mut writer, "pubDate", &pub_date)?;

        if let Some(excerpt) = post.excerpt.as_deref().filter(|e| !e.is_empty()) {
            push_text(&mut writer, "description", excerpt)?;
        }
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(writer.into_inner().into_inner())
}

#[derive(Debug, Clone, Copy)]
enum ChangeFreq {
    Daily,
    Weekly,
    Monthly,
}

impl ChangeFreq {
    fn as_str(self) -> &'static str {
        match self {
            ChangeFreq::Daily => "daily",
            ChangeFreq::Weekly => "weekly",
            ChangeFreq::Monthly => "monthly",
        }
    }
}

const STATIC_ROUTES: &[(&str, ChangeFreq, &str)] = &[
    ("/", ChangeFreq::Daily, "1.0"),
    ("/posts", ChangeFreq::Daily, "0.9"),
    ("/categories", ChangeFreq::Weekly, "0.7"),
    ("/about", ChangeFreq::Monthly, "0.4"),
];

/// 生成站点地图：固定路由、全部分类、全部文章
///
/// 文章的 lastmod 取更新时间或发布时间，都缺失时使用 `now`。
pub fn render_sitemap(
    site: &SiteConfig,
    categories: &[SlugRef],
    posts: &[SlugRef],
    now: DateTime<Utc>,
) -> quick_xml::Result<Vec<u8>> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", "http://www.sitemaps.org/schemas/sitemap/0.9"));
    writer.write_event(Event::Start(urlset))?;

    for (path, freq, priority) in STATIC_ROUTES {
        push_url(&mut writer, &absolute_url(&site.url, path), now, *freq, priority)?;
    }
    for category in categories.iter().filter(|c| !c.slug.is_empty()) {
        let url = absolute_url(&site.url, &format!("/categories/{}", category.slug));
        push_url(&mut writer, &url, now, ChangeFreq::Weekly, "0.6")?;
    }
    for post in posts.iter().filter(|p| !p.slug.is_empty()) {
        let url = absolute_url(&site.url, &format!("/posts/{}", post.slug));
        let modified = post.updated_at.or(post.published_at).unwrap_or(now);
        push_url(&mut writer, &url, modified, ChangeFreq::Weekly, "0.8")?;
    }

    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    Ok(writer.into_inner().into_inner())
}

fn push_url(
    writer: &mut XmlWriter,
    loc: &str,
    modified: DateTime<Utc>,
    freq: ChangeFreq,
    priority: &str,
) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new("url")))?;
    push_text(writer, "loc", loc)?;
    push_text(
        writer,
        "lastmod",
        &modified.to_rfc3339_opts(SecondsFormat::Secs, true),
    )?;
    push_text(writer, "changefreq", freq.as_str())?;
    push_text(writer, "priority", priority)?;
    writer.write_event(Event::End(BytesEnd::new("url")))?;
    Ok(())
}

fn push_text(writer: &mut XmlWriter, tag: &str, text: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

/// robots.txt：禁止抓取管理后台与搜索页
pub fn render_robots(site: &SiteConfig) -> String {
    let mut robots = String::from("User-Agent: *\nAllow: /\n");
    for path in ["/studio", "/studio/", "/studio/*", "/search"] {
        robots.push_str(&format!("Disallow: {path}\n"));
    }
    robots.push_str(&format!("\nSitemap: {}\n", absolute_url(&site.url, "/sitemap.xml")));
    robots
}

#[cfg(test)]
mod tests {
    use std::str;

    use chrono::TimeZone;

    use super::*;

    fn site() -> SiteConfig {
        SiteConfig {
            url: "https://gachitore.example".into(),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_empty_rss_has_channel_and_no_items() {
        let xml = render_rss(&site(), &[], now()).expect("生成失败");
        assert_eq!(
            str::from_utf8(&xml).expect("应为 UTF-8"),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><rss version=\"2.0\"><channel>\
             <title>gachitore</title><link>https://gachitore.example</link>\
             <description>最新の記事をRSSで配信します。</description><language>ja</language>\
             <lastBuildDate>Mon, 13 Jan 2025 00:00:00 +0000</lastBuildDate></channel></rss>"
        );
    }

    #[test]
    fn test_rss_item() {
        let posts = vec![
            Post {
                title: "A & B".into(),
                slug: "a-b".into(),
                excerpt: Some("<要約>".into()),
                published_at: Some(Utc.with_ymd_and_hms(2024, 12, 1, 9, 30, 0).unwrap()),
                ..Default::default()
            },
            Post {
                title: "下書き".into(),
                slug: "draft".into(),
                ..Default::default()
            },
        ];
        let xml = render_rss(&site(), &posts, now()).expect("生成失败");
        let xml = str::from_utf8(&xml).expect("应为 UTF-8");

        assert_eq!(xml.matches("<item>").count(), 2);
        assert!(xml.contains("<title>A &amp; B</title>"));
        assert!(xml.contains(
            "<guid isPermaLink=\"true\">https://gachitore.example/posts/a-b</guid>"
        ));
        assert!(xml.contains("<pubDate>Sun, 1 Dec 2024 09:30:00 +0000</pubDate>"));
        assert!(xml.contains("<description>&lt;要約&gt;</description>"));
        assert_eq!(xml.matches("<description>").count(), 2, "频道描述加一条摘要");
    }

    #[test]
    fn test_sitemap_routes() {
        let categories = vec![SlugRef {
            slug: "legs".into(),
            ..Default::default()
        }];
        let posts = vec![SlugRef {
            slug: "squat".into(),
            updated_at: Some(Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()),
            ..Default::default()
        }];
        let xml = render_sitemap(&site(), &categories, &posts, now()).expect("生成失败");
        let xml = str::from_utf8(&xml).expect("应为 UTF-8");

        assert_eq!(xml.matches("<url>").count(), 6);
        assert!(xml.contains(
            "<url><loc>https://gachitore.example/</loc><lastmod>2025-01-13T00:00:00Z</lastmod>\
             <changefreq>daily</changefreq><priority>1.0</priority></url>"
        ));
        assert!(xml.contains("<loc>https://gachitore.example/categories/legs</loc>"));
        assert!(xml.contains(
            "<loc>https://gachitore.example/posts/squat</loc><lastmod>2025-01-02T03:04:05Z</lastmod>"
        ));
    }

    #[test]
    fn test_robots() {
        let robots = render_robots(&site());
        assert!(robots.contains("Disallow: /studio\n"));
        assert!(robots.contains("Disallow: /search\n"));
        assert!(robots.ends_with("Sitemap: https://gachitore.example/sitemap.xml\n"));
    }
}
