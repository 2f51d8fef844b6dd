use std::sync::LazyLock;

use regex::Regex;

use crate::content::ContentBlock;

/// 合并表格的 key 后缀
pub const MERGED_SUFFIX: &str = "_merged";

static SEPARATOR_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\|[\s\-:|]+\|$").expect("separator line regex"));

/// 预处理后的块：原始块，或由连续表格行段落合并出的表格
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessedBlock<'a> {
    Block(&'a ContentBlock),
    MergedTable { key: String, content: String },
}

/// 段落文本是否像一行竖线表格
pub fn is_table_row(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed.contains('\n') {
        return false;
    }
    (trimmed.len() >= 2 && trimmed.starts_with('|') && trimmed.ends_with('|'))
        || SEPARATOR_LINE.is_match(trimmed)
}

fn table_row_text(block: &ContentBlock) -> Option<String> {
    match block {
        ContentBlock::Paragraph(text) => {
            let plain = text.plain_text();
            is_table_row(&plain).then_some(plain)
        }
        _ => None,
    }
}

/// 从左到右贪婪收集连续的表格行段落，两行以上的片段合并为一个表格块
pub fn merge_table_runs(blocks: &[ContentBlock]) -> Vec<ProcessedBlock<'_>> {
    let mut result = Vec::with_capacity(blocks.len());
    let mut i = 0;

    while i < blocks.len() {
        let block = &blocks[i];
        if let Some(first) = table_row_text(block) {
            let mut lines = vec![first];
            let mut j = i + 1;
            while let Some(next) = blocks.get(j).and_then(table_row_text) {
                lines.push(next);
                j += 1;
            }

            if lines.len() >= 2 {
                result.push(ProcessedBlock::MergedTable {
                    key: format!("{}{}", block.key(), MERGED_SUFFIX),
                    content: lines.join("\n"),
                });
                i = j;
                continue;
            }
        }

        result.push(ProcessedBlock::Block(block));
        i += 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{InlineSpan, TextBlock};

    fn para(key: &str, text: &str) -> ContentBlock {
        ContentBlock::Paragraph(TextBlock {
            key: key.to_string(),
            spans: vec![InlineSpan {
                text: text.to_string(),
                ..Default::default()
            }],
        })
    }

    #[test]
    fn test_is_table_row() {
        assert!(is_table_row("| a | b |"));
        assert!(is_table_row("  |---|:--:|  "));
        assert!(is_table_row("||"));
        assert!(!is_table_row("|"));
        assert!(!is_table_row("a | b"));
        assert!(!is_table_row("| a |\n| b |"));
    }

    #[test]
    fn test_run_merges_into_one_block() {
        let blocks = vec![
            para("intro", "はじめに"),
            para("r1", "| 種目 | 回数 |"),
            para("r2", "|---|---|"),
            para("r3", "| スクワット | 10 |"),
            para("outro", "おわり"),
        ];
        let processed = merge_table_runs(&blocks);

        assert_eq!(processed.len(), 3);
        assert_eq!(
            processed[1],
            ProcessedBlock::MergedTable {
                key: "r1_merged".to_string(),
                content: "| 種目 | 回数 |\n|---|---|\n| スクワット | 10 |".to_string(),
            }
        );
        assert_eq!(processed[2], ProcessedBlock::Block(&blocks[4]));
    }

    #[test]
    fn test_single_row_is_kept() {
        let blocks = vec![para("a", "| 単独 |"), para("b", "本文"), para("c", "| 単独 |")];
        let processed = merge_table_runs(&blocks);
        assert_eq!(processed.len(), 3);
        assert!(processed.iter().all(|p| matches!(p, ProcessedBlock::Block(_))));
    }

    #[test]
    fn test_non_paragraph_breaks_run() {
        let heading = ContentBlock::Heading(
            crate::content::HeadingLevel::H2,
            TextBlock {
                key: "h".into(),
                spans: vec![InlineSpan {
                    text: "| 見出し |".into(),
                    ..Default::default()
                }],
            },
        );
        let blocks = vec![para("a", "| a |"), heading, para("b", "| b |")];
        let processed = merge_table_runs(&blocks);
        assert_eq!(processed.len(), 3);
    }
}
