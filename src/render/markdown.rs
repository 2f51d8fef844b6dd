use comrak::options::Options;

fn options() -> Options<'static> {
    let mut options = Options::default();
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.cjk_friendly_emphasis = true;

    // 原始 HTML 一律省略
    options.render.r#unsafe = false;
    options
}

/// 渲染自由文本 Markdown 块，内容为空白时输出为空
pub fn render_markdown(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    format!(
        r#"<div class="markdown-content">{}</div>"#,
        comrak::markdown_to_html(content, &options())
    )
}
