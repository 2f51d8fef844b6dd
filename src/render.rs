//! 结构化正文渲染
//!
//! 输入相同则输出逐字节相同。无法渲染的块输出为空，不影响其余部分。

mod inline;
mod markdown;
mod merge;
mod table;
mod toc;

use std::fmt::Write;

use crate::content::{ContentBlock, ImageBlock, ListBlock};

pub use self::{
    inline::{emphasize, render_spans, safe_href},
    markdown::render_markdown,
    merge::{MERGED_SUFFIX, ProcessedBlock, is_table_row, merge_table_runs},
    table::{Align, PipeTable, reconstruct_inline, render_pipe_table},
    toc::{TocEntry, extract_toc},
};

/// 正文图片宽度
const BODY_IMAGE_WIDTH: u32 = 1200;

/// HTML 文本与属性转义
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// 渲染正文
pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    merge_table_runs(blocks)
        .iter()
        .map(|processed| match processed {
            ProcessedBlock::Block(block) => render_block(block),
            ProcessedBlock::MergedTable { content, .. } => render_merged_table(content),
        })
        .collect()
}

/// 合并片段解析不出表格时逐行退回普通段落
fn render_merged_table(content: &str) -> String {
    match PipeTable::parse(content) {
        Some(table) => table.to_html(),
        None => content
            .lines()
            .map(|line| format!("<p>{}</p>", escape_html(line)))
            .collect(),
    }
}

fn render_block(block: &ContentBlock) -> String {
    match block {
        ContentBlock::Paragraph(text) => {
            let plain = text.plain_text();
            if plain.matches('|').count() >= 3 {
                if let Some(table) = reconstruct_inline(&plain) {
                    return render_pipe_table(&table);
                }
            }
            format!("<p>{}</p>", render_spans(&text.spans, true))
        }
        ContentBlock::Heading(level, text) => {
            let n = level.as_u8();
            format!(
                r#"<h{n} id="{}">{}</h{n}>"#,
                escape_html(&text.key),
                render_spans(&text.spans, false)
            )
        }
        ContentBlock::Blockquote(text) => {
            format!("<blockquote>{}</blockquote>", render_spans(&text.spans, false))
        }
        ContentBlock::BulletList(list) => render_list("ul", list),
        ContentBlock::NumberedList(list) => render_list("ol", list),
        ContentBlock::Image(image) => render_image(image),
        ContentBlock::Table(table) => PipeTable::from_cells(table.rows.clone())
            .map(|t| t.to_html())
            .unwrap_or_default(),
        ContentBlock::Markdown(md) => md
            .content
            .as_deref()
            .map(render_markdown)
            .unwrap_or_default(),
        ContentBlock::Unsupported { key, kind } => {
            tracing::debug!(key, kind, "unsupported block skipped");
            String::new()
        }
    }
}

fn render_list(tag: &str, list: &ListBlock) -> String {
    let mut html = format!("<{tag}>");
    for item in &list.items {
        let _ = write!(html, "<li>{}</li>", render_spans(&item.spans, false));
    }
    let _ = write!(html, "</{tag}>");
    html
}

fn render_image(image: &ImageBlock) -> String {
    let Some(asset) = &image.asset else {
        return String::new();
    };

    let mut html = String::from("<figure>");
    let _ = write!(
        html,
        r#"<img src="{}" alt="{}" loading="lazy""#,
        escape_html(&asset.sized_url(Some(BODY_IMAGE_WIDTH), None)),
        escape_html(image.alt.as_deref().unwrap_or_default())
    );
    if let Some(dimensions) = asset.metadata.as_ref().and_then(|m| m.dimensions) {
        if dimensions.width > 0.0 {
            let height = (dimensions.height * f64::from(BODY_IMAGE_WIDTH) / dimensions.width).round();
            let _ = write!(html, r#" width="{BODY_IMAGE_WIDTH}" height="{height}""#);
        }
    }
    if let Some(lqip) = asset.metadata.as_ref().and_then(|m| m.lqip.as_deref()) {
        let _ = write!(html, r#" data-lqip="{}""#, escape_html(lqip));
    }
    html.push('>');
    if let Some(caption) = image.caption.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(html, "<figcaption>{}</figcaption>", escape_html(caption));
    }
    html.push_str("</figure>");
    html
}
