use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::model::{ImageAsset, null_default};

/// 行内文本片段
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub marks: Marks,
}

/// 行内标记
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Marks {
    pub bold: bool,
    pub italic: bool,
    pub code: bool,
    /// 链接目标
    pub link: Option<String>,
}

/// 带稳定 key 的文本块
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBlock {
    pub key: String,
    pub spans: Vec<InlineSpan>,
}

impl TextBlock {
    /// 拼接所有片段的纯文本
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HeadingLevel {
    H2 = 2,
    H3 = 3,
    H4 = 4,
}

impl HeadingLevel {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    fn from_style(style: &str) -> Option<Self> {
        match style {
            "h2" => Some(Self::H2),
            "h3" => Some(Self::H3),
            "h4" => Some(Self::H4),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListBlock {
    pub key: String,
    pub items: Vec<TextBlock>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageBlock {
    pub key: String,
    /// 缺失时不渲染
    pub asset: Option<ImageAsset>,
    pub alt: Option<String>,
    pub caption: Option<String>,
}

/// 表格块，行宽不做校验
#[derive(Debug, Clone, PartialEq)]
pub struct TableBlock {
    pub key: String,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownBlock {
    pub key: String,
    pub content: Option<String>,
}

/// 正文中的结构化内容块
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Paragraph(TextBlock),
    Heading(HeadingLevel, TextBlock),
    Blockquote(TextBlock),
    BulletList(ListBlock),
    NumberedList(ListBlock),
    Image(ImageBlock),
    Table(TableBlock),
    Markdown(MarkdownBlock),
    /// 未知类型或无法解析的块，渲染时跳过
    Unsupported { key: String, kind: String },
}

impl ContentBlock {
    pub fn key(&self) -> &str {
        match self {
            ContentBlock::Paragraph(b) | ContentBlock::Heading(_, b) | ContentBlock::Blockquote(b) => {
                &b.key
            }
            ContentBlock::BulletList(l) | ContentBlock::NumberedList(l) => &l.key,
            ContentBlock::Image(i) => &i.key,
            ContentBlock::Table(t) => &t.key,
            ContentBlock::Markdown(m) => &m.key,
            ContentBlock::Unsupported { key, .. } => key,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTextBlock {
    #[serde(rename = "_key", default, deserialize_with = "null_default")]
    key: String,
    #[serde(default)]
    style: Option<String>,
    #[serde(default)]
    list_item: Option<String>,
    #[serde(default, deserialize_with = "null_default")]
    children: Vec<RawSpan>,
    #[serde(default, deserialize_with = "null_default")]
    mark_defs: Vec<RawMarkDef>,
}

#[derive(Debug, Default, Deserialize)]
struct RawSpan {
    #[serde(rename = "_type", default, deserialize_with = "null_default")]
    kind: String,
    #[serde(default, deserialize_with = "null_default")]
    text: String,
    #[serde(default, deserialize_with = "null_default")]
    marks: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawMarkDef {
    #[serde(rename = "_key", default, deserialize_with = "null_default")]
    key: String,
    #[serde(rename = "_type", default, deserialize_with = "null_default")]
    kind: String,
    #[serde(default)]
    href: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawImage {
    #[serde(rename = "_key", default, deserialize_with = "null_default")]
    key: String,
    #[serde(default)]
    asset: Option<Value>,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    caption: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    #[serde(rename = "_key", default, deserialize_with = "null_default")]
    key: String,
    #[serde(default, deserialize_with = "null_default")]
    rows: Vec<RawRow>,
}

#[derive(Debug, Default, Deserialize)]
struct RawRow {
    #[serde(default, deserialize_with = "null_default")]
    cells: Vec<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct RawMarkdown {
    #[serde(rename = "_key", default, deserialize_with = "null_default")]
    key: String,
    #[serde(default)]
    content: Option<String>,
}

enum ListKind {
    Bullet,
    Number,
}

/// 文本块解析结果：普通块或列表项
enum Parsed {
    Block(ContentBlock),
    ListItem(ListKind, TextBlock),
}

impl RawTextBlock {
    fn into_text_block(self) -> TextBlock {
        let RawTextBlock {
            key,
            children,
            mark_defs,
            ..
        } = self;

        let spans = children
            .into_iter()
            .filter(|c| c.kind == "span" && !c.text.is_empty())
            .map(|c| InlineSpan {
                marks: resolve_marks(&c.marks, &mark_defs),
                text: c.text,
            })
            .collect();
        TextBlock { key, spans }
    }

    fn parse(self) -> Parsed {
        let list = match self.list_item.as_deref() {
            Some("bullet") => Some(ListKind::Bullet),
            Some("number") => Some(ListKind::Number),
            _ => None,
        };
        if let Some(kind) = list {
            return Parsed::ListItem(kind, self.into_text_block());
        }

        let style = self.style.clone().unwrap_or_default();
        let text = self.into_text_block();
        let block = match style.as_str() {
            "blockquote" => ContentBlock::Blockquote(text),
            s => match HeadingLevel::from_style(s) {
                Some(level) => ContentBlock::Heading(level, text),
                None => ContentBlock::Paragraph(text),
            },
        };
        Parsed::Block(block)
    }
}

/// 装饰器直接对应标记，其余标记按 markDefs 的 key 查找链接
fn resolve_marks(marks: &[String], defs: &[RawMarkDef]) -> Marks {
    let mut resolved = Marks::default();
    for mark in marks {
        match mark.as_str() {
            "strong" => resolved.bold = true,
            "em" => resolved.italic = true,
            "code" => resolved.code = true,
            key => {
                if let Some(def) = defs.iter().find(|d| d.key == key && d.kind == "link") {
                    resolved.link = def.href.clone();
                }
            }
        }
    }
    resolved
}

fn parse_one(raw: Value) -> Parsed {
    let kind = raw
        .get("_type")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let key = raw
        .get("_key")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let unsupported = || {
        Parsed::Block(ContentBlock::Unsupported {
            key: key.clone(),
            kind: kind.clone(),
        })
    };

    match kind.as_str() {
        "block" => match serde_json::from_value::<RawTextBlock>(raw) {
            Ok(block) => block.parse(),
            Err(_) => unsupported(),
        },
        "image" => match serde_json::from_value::<RawImage>(raw) {
            Ok(image) => Parsed::Block(ContentBlock::Image(ImageBlock {
                key: image.key,
                asset: image
                    .asset
                    .and_then(|a| serde_json::from_value::<ImageAsset>(a).ok()),
                alt: image.alt,
                caption: image.caption,
            })),
            Err(_) => unsupported(),
        },
        "table" => match serde_json::from_value::<RawTable>(raw) {
            Ok(table) => Parsed::Block(ContentBlock::Table(TableBlock {
                key: table.key,
                rows: table
                    .rows
                    .into_iter()
                    .map(|r| r.cells.into_iter().map(Option::unwrap_or_default).collect())
                    .collect(),
            })),
            Err(_) => unsupported(),
        },
        "markdown" => match serde_json::from_value::<RawMarkdown>(raw) {
            Ok(md) => Parsed::Block(ContentBlock::Markdown(MarkdownBlock {
                key: md.key,
                content: md.content,
            })),
            Err(_) => unsupported(),
        },
        _ => unsupported(),
    }
}

/// 将原始 Portable Text 数组解析为内容块
///
/// 相邻且类型相同的列表项合并为一个列表，列表 key 取第一项的 key。
/// 单个块解析失败只影响该块。
pub fn parse_blocks(raw: Vec<Value>) -> Vec<ContentBlock> {
    let mut blocks = Vec::with_capacity(raw.len());
    for value in raw {
        match parse_one(value) {
            Parsed::Block(block) => blocks.push(block),
            Parsed::ListItem(kind, item) => match (kind, blocks.last_mut()) {
                (ListKind::Bullet, Some(ContentBlock::BulletList(list)))
                | (ListKind::Number, Some(ContentBlock::NumberedList(list))) => {
                    list.items.push(item)
                }
                (ListKind::Bullet, _) => blocks.push(ContentBlock::BulletList(ListBlock {
                    key: item.key.clone(),
                    items: vec![item],
                })),
                (ListKind::Number, _) => blocks.push(ContentBlock::NumberedList(ListBlock {
                    key: item.key.clone(),
                    items: vec![item],
                })),
            },
        }
    }
    blocks
}

pub(crate) fn deserialize_body<'de, D>(deserializer: D) -> Result<Vec<ContentBlock>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<Value>> = Option::deserialize(deserializer)?;
    Ok(parse_blocks(raw.unwrap_or_default()))
}
