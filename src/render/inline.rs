use std::sync::LazyLock;

use regex::Regex;

use super::escape_html;
use crate::content::{InlineSpan, Marks};

/// `**强调**` 或 `*强调*`
static EMPHASIS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*[^*]+\*\*|\*[^*]+\*").expect("emphasis regex"));

/// 转义文本，并把残留的星号强调还原为 `<strong>`
pub fn emphasize(text: &str) -> String {
    let mut html = String::with_capacity(text.len());
    let mut last = 0;
    for m in EMPHASIS.find_iter(text) {
        html.push_str(&escape_html(&text[last..m.start()]));
        let token = m.as_str();
        let inner = token
            .strip_prefix("**")
            .and_then(|t| t.strip_suffix("**"))
            .unwrap_or_else(|| &token[1..token.len() - 1]);
        html.push_str("<strong>");
        html.push_str(&escape_html(inner));
        html.push_str("</strong>");
        last = m.end();
    }
    html.push_str(&escape_html(&text[last..]));
    html
}

/// 只允许站内路径、锚点以及 http(s)/mailto/tel 链接
pub fn safe_href(href: &str) -> Option<&str> {
    let href = href.trim();
    let lower = href.to_ascii_lowercase();
    let allowed = ["http://", "https://", "mailto:", "tel:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
        || (href.starts_with('/') && !href.starts_with("//"))
        || href.starts_with('#');
    allowed.then_some(href)
}

fn is_external(href: &str) -> bool {
    href.starts_with("http://") || href.starts_with("https://")
}

fn render_span(span: &InlineSpan, recover_emphasis: bool) -> String {
    let marks = &span.marks;
    let mut html = if marks.code {
        format!("<code>{}</code>", escape_html(&span.text))
    } else if recover_emphasis && *marks == Marks::default() {
        emphasize(&span.text)
    } else {
        escape_html(&span.text)
    };
    html = html.replace('\n', "<br>");

    if marks.italic {
        html = format!("<em>{html}</em>");
    }
    if marks.bold {
        html = format!("<strong>{html}</strong>");
    }
    if let Some(href) = marks.link.as_deref().and_then(safe_href) {
        let href = escape_html(href);
        html = if is_external(&href) {
            format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{html}</a>"#)
        } else {
            format!(r#"<a href="{href}">{html}</a>"#)
        };
    }
    html
}

/// 渲染一组行内片段
///
/// `recover_emphasis` 只对普通段落开启，且只作用于无标记的片段。
pub fn render_spans(spans: &[InlineSpan], recover_emphasis: bool) -> String {
    spans
        .iter()
        .map(|span| render_span(span, recover_emphasis))
        .collect()
}
