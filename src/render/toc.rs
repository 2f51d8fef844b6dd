use serde::Serialize;

use crate::content::{ContentBlock, HeadingLevel};

/// 目录项，`key` 与渲染出的标题锚点一致
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TocEntry {
    pub key: String,
    pub level: u8,
    pub text: String,
}

/// 按文档顺序提取二级、三级标题
pub fn extract_toc(blocks: &[ContentBlock]) -> Vec<TocEntry> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Heading(level @ (HeadingLevel::H2 | HeadingLevel::H3), text) => {
                Some(TocEntry {
                    key: text.key.clone(),
                    level: level.as_u8(),
                    text: text.plain_text(),
                })
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{InlineSpan, TextBlock};

    fn heading(level: HeadingLevel, key: &str, text: &str) -> ContentBlock {
        ContentBlock::Heading(
            level,
            TextBlock {
                key: key.into(),
                spans: vec![
                    InlineSpan {
                        text: text.into(),
                        ..Default::default()
                    },
                    InlineSpan {
                        text: "!".into(),
                        ..Default::default()
                    },
                ],
            },
        )
    }

    #[test]
    fn test_only_h2_h3_in_order() {
        let blocks = vec![
            heading(HeadingLevel::H3, "b", "後"),
            heading(HeadingLevel::H4, "c", "除外"),
            heading(HeadingLevel::H2, "a", "前"),
        ];
        let toc = extract_toc(&blocks);

        assert_eq!(
            toc,
            vec![
                TocEntry {
                    key: "b".into(),
                    level: 3,
                    text: "後!".into()
                },
                TocEntry {
                    key: "a".into(),
                    level: 2,
                    text: "前!".into()
                },
            ]
        );
    }
}
