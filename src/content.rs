mod block;
mod model;

use chrono::{DateTime, FixedOffset, Utc};

pub use self::{
    block::{
        ContentBlock, HeadingLevel, ImageBlock, InlineSpan, ListBlock, MarkdownBlock, Marks,
        TableBlock, TextBlock, parse_blocks,
    },
    model::{
        Author, Category, CategoryWithPosts, Dimensions, HomePage, ImageAsset, ImageMetadata,
        ImageRef, Post, PostsPage, SiteSettings, SlugRef,
    },
};

/// 日本标准时间偏移
const JST_OFFSET_SECS: i32 = 9 * 3600;

/// 日文长日期，按日本时间换算
///
/// ```ignore
/// assert_eq!(format_date_ja(&published_at), "2025年1月13日");
/// ```
pub fn format_date_ja(date: &DateTime<Utc>) -> String {
    let local = match FixedOffset::east_opt(JST_OFFSET_SECS) {
        Some(offset) => date.with_timezone(&offset),
        None => date.fixed_offset(),
    };
    local.format("%Y年%-m月%-d日").to_string()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_format_date_ja() {
        let date = Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap();
        assert_eq!(format_date_ja(&date), "2025年1月13日");

        // UTC 15:00 已是日本时间次日
        let date = Utc.with_ymd_and_hms(2025, 12, 31, 15, 0, 0).unwrap();
        assert_eq!(format_date_ja(&date), "2026年1月1日");
    }
}
