use std::{fmt::Write, sync::LazyLock};

use regex::Regex;

use super::inline::emphasize;

/// 分隔单元格，如 `---`、`:---`、`---:`、`:---:`
static SEPARATOR_CELL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("separator regex"));

/// 切分两侧带空白的竖线
static PIPE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\|\s*").expect("pipe regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    None,
    Left,
    Center,
    Right,
}

impl Align {
    fn from_separator(cell: &str) -> Self {
        match (cell.starts_with(':'), cell.ends_with(':')) {
            (true, true) => Align::Center,
            (true, false) => Align::Left,
            (false, true) => Align::Right,
            (false, false) => Align::None,
        }
    }

    fn attr(self) -> &'static str {
        match self {
            Align::None => "",
            Align::Left => r#" style="text-align:left""#,
            Align::Center => r#" style="text-align:center""#,
            Align::Right => r#" style="text-align:right""#,
        }
    }
}

/// 竖线表格
///
/// 所有行都补齐到最宽一行的列数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeTable {
    pub header: Option<Vec<String>>,
    pub rows: Vec<Vec<String>>,
    pub align: Vec<Align>,
}

pub fn is_separator_cell(cell: &str) -> bool {
    SEPARATOR_CELL.is_match(cell.trim())
}

fn split_row(line: &str) -> Vec<String> {
    let line = line.trim();
    let line = line.strip_prefix('|').unwrap_or(line);
    let line = line.strip_suffix('|').unwrap_or(line);
    line.split('|').map(|c| c.trim().to_string()).collect()
}

fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty() && cells.iter().all(|c| is_separator_cell(c))
}

impl PipeTable {
    /// 解析竖线表格文本
    ///
    /// 表头分隔行位于第二行时第一行是表头；缺少分隔行时仍以第一行作表头。
    /// 分隔行本身不输出。没有任何数据行时返回 `None`。
    pub fn parse(content: &str) -> Option<Self> {
        let lines: Vec<Vec<String>> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(split_row)
            .collect();

        let separator = lines.iter().position(|cells| is_separator_row(cells));
        let align_source = separator.map(|i| lines[i].clone());

        let mut rows: Vec<Vec<String>> = lines
            .into_iter()
            .filter(|cells| !is_separator_row(cells))
            .collect();
        if rows.is_empty() {
            return None;
        }

        let header = match separator {
            Some(0) => None,
            _ => Some(rows.remove(0)),
        };
        Some(Self::from_rows(header, rows, align_source.as_deref()))
    }

    /// 由首行作表头的行集合构造，用于结构化表格块
    pub fn from_cells(mut rows: Vec<Vec<String>>) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }
        let header = rows.remove(0);
        Some(Self::from_rows(Some(header), rows, None))
    }

    fn from_rows(
        mut header: Option<Vec<String>>,
        mut rows: Vec<Vec<String>>,
        separator: Option<&[String]>,
    ) -> Self {
        let width = header
            .iter()
            .chain(rows.iter())
            .map(Vec::len)
            .max()
            .unwrap_or(0);

        for row in header.iter_mut().chain(rows.iter_mut()) {
            row.resize(width, String::new());
        }

        let align = (0..width)
            .map(|i| {
                separator
                    .and_then(|cells| cells.get(i))
                    .map(|c| Align::from_separator(c))
                    .unwrap_or(Align::None)
            })
            .collect();

        Self {
            header,
            rows,
            align,
        }
    }

    pub fn width(&self) -> usize {
        self.align.len()
    }

    /// 输出 HTML 表格，单元格内的 `**` 强调同样恢复
    pub fn to_html(&self) -> String {
        let mut html = String::from(r#"<div class="table-wrapper"><table>"#);

        if let Some(header) = &self.header {
            html.push_str("<thead><tr>");
            for (cell, align) in header.iter().zip(&self.align) {
                let _ = write!(html, "<th{}>{}</th>", align.attr(), emphasize(cell));
            }
            html.push_str("</tr></thead>");
        }

        html.push_str("<tbody>");
        for row in &self.rows {
            html.push_str("<tr>");
            for (cell, align) in row.iter().zip(&self.align) {
                let _ = write!(html, "<td{}>{}</td>", align.attr(), emphasize(cell));
            }
            html.push_str("</tr>");
        }
        html.push_str("</tbody></table></div>");
        html
    }
}

/// 将单段落中挤在一行的表格还原为多行竖线表格
///
/// 以第一个分隔单元格的下标作为列数，把全部单元格按列数重新分行，丢弃末尾不完整的行。
/// 没有分隔单元格或列数为零时返回 `None`。
pub fn reconstruct_inline(text: &str) -> Option<String> {
    let cells: Vec<&str> = PIPE_SPLIT
        .split(text)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    let columns = cells.iter().position(|c| is_separator_cell(c))?;
    if columns == 0 {
        return None;
    }

    let lines: Vec<String> = cells
        .chunks_exact(columns)
        .map(|row| format!("| {} |", row.join(" | ")))
        .collect();
    Some(lines.join("\n"))
}

/// 渲染表格文本，无法解析时输出为空
pub fn render_pipe_table(content: &str) -> String {
    PipeTable::parse(content)
        .map(|t| t.to_html())
        .unwrap_or_default()
}
