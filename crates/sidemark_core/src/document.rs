//! Rich-document tree used by the editing surface.
//!
//! The editor exchanges documents as generic JSON (`{type, attrs, content,
//! text, marks}`), modelled here by [`RawNode`]. The converter works on the
//! typed [`Node`] sum type instead; every `Node` (de)serializes through
//! `RawNode`, so any editor document loads and node kinds the converter does
//! not understand survive as [`Node::Unknown`].
//!
//! # Example
//!
//! ```
//! use sidemark_core::document::{Mark, Node};
//!
//! let doc = Node::doc(vec![
//!     Node::heading(2, vec![Node::text("Plan")]),
//!     Node::paragraph(vec![Node::styled("Buy milk", vec![Mark::Bold])]),
//! ]);
//!
//! let json = serde_json::to_value(&doc).unwrap();
//! assert_eq!(json["type"], "doc");
//! assert_eq!(json["content"][0]["attrs"]["level"], 2);
//!
//! let back: Node = serde_json::from_value(json).unwrap();
//! assert_eq!(back, doc);
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use ts_rs::TS;

/// Generic editor node, exactly as the editing surface serializes it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawNode {
    /// Node type tag (`paragraph`, `heading`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific attributes
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
    /// Child nodes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<RawNode>,
    /// Text payload (text nodes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Marks (text nodes only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<RawMark>,
}

/// Generic editor mark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMark {
    /// Mark type tag (`bold`, `link`, ...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Mark attributes
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub attrs: Map<String, Value>,
}

impl RawNode {
    /// Create a raw node with the given type tag and no attributes.
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    /// Concatenated text of every descendant text node.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// String attribute lookup.
    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

/// Horizontal alignment of a paragraph or heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Editor default
    #[default]
    Left,
    /// Centered
    Center,
    /// Flush right
    Right,
    /// Justified
    Justify,
}

impl TextAlign {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(TextAlign::Left),
            "center" => Some(TextAlign::Center),
            "right" => Some(TextAlign::Right),
            "justify" => Some(TextAlign::Justify),
            _ => None,
        }
    }

    /// The attribute value the editor uses for this alignment.
    pub fn as_str(&self) -> &'static str {
        match self {
            TextAlign::Left => "left",
            TextAlign::Center => "center",
            TextAlign::Right => "right",
            TextAlign::Justify => "justify",
        }
    }
}

/// Placement of an image block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "lowercase")]
pub enum ImageAlignment {
    /// Floated/aligned left
    Left,
    /// Centered
    Center,
    /// Floated/aligned right
    Right,
}

impl ImageAlignment {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(ImageAlignment::Left),
            "center" => Some(ImageAlignment::Center),
            "right" => Some(ImageAlignment::Right),
            _ => None,
        }
    }

    /// The attribute value the editor uses for this alignment.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageAlignment::Left => "left",
            ImageAlignment::Center => "center",
            ImageAlignment::Right => "right",
        }
    }
}

/// Attributes shared by paragraphs and headings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockAttrs {
    /// Stable block identifier, if one has been assigned
    pub block_id: Option<String>,
    /// Non-default alignment
    pub text_align: Option<TextAlign>,
    /// Indent level (0 = none)
    pub indent: u32,
}

impl BlockAttrs {
    /// Attributes carrying only a block id.
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            block_id: Some(id.into()),
            ..Default::default()
        }
    }

    /// Whether alignment or indent differ from the editor defaults.
    pub fn has_formatting(&self) -> bool {
        self.text_align.is_some_and(|a| a != TextAlign::Left) || self.indent > 0
    }

    fn from_raw(attrs: &Map<String, Value>) -> Self {
        Self {
            block_id: attrs
                .get("blockId")
                .and_then(Value::as_str)
                .map(String::from),
            text_align: attrs
                .get("textAlign")
                .and_then(Value::as_str)
                .and_then(TextAlign::parse),
            indent: attrs
                .get("indent")
                .and_then(lenient_u64)
                .map(|n| n.min(u32::MAX as u64) as u32)
                .unwrap_or(0),
        }
    }

    fn write_raw(&self, attrs: &mut Map<String, Value>) {
        if let Some(id) = &self.block_id {
            attrs.insert("blockId".into(), Value::String(id.clone()));
        }
        if let Some(align) = self.text_align {
            attrs.insert("textAlign".into(), Value::String(align.as_str().into()));
        }
        if self.indent > 0 {
            attrs.insert("indent".into(), Value::from(self.indent));
        }
    }
}

/// Attributes of an image node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageAttrs {
    /// Source: URL, path, inline `data:` payload or `@img:` reference
    pub src: String,
    /// Alternative text
    pub alt: String,
    /// Optional title
    pub title: Option<String>,
    /// Display width in pixels
    pub width: Option<u32>,
    /// Display height in pixels
    pub height: Option<u32>,
    /// Block alignment
    pub alignment: Option<ImageAlignment>,
    /// Stable block identifier
    pub block_id: Option<String>,
}

impl ImageAttrs {
    fn from_raw(attrs: &Map<String, Value>) -> Self {
        let string = |key: &str| attrs.get(key).and_then(Value::as_str).map(String::from);
        let dimension = |key: &str| {
            attrs
                .get(key)
                .and_then(lenient_u64)
                .map(|n| n.min(u32::MAX as u64) as u32)
        };
        Self {
            src: string("src").unwrap_or_default(),
            alt: string("alt").unwrap_or_default(),
            title: string("title"),
            width: dimension("width"),
            height: dimension("height"),
            alignment: attrs
                .get("alignment")
                .and_then(Value::as_str)
                .and_then(ImageAlignment::parse),
            block_id: string("blockId"),
        }
    }

    fn to_raw(&self) -> Map<String, Value> {
        let mut attrs = Map::new();
        attrs.insert("src".into(), Value::String(self.src.clone()));
        attrs.insert("alt".into(), Value::String(self.alt.clone()));
        if let Some(title) = &self.title {
            attrs.insert("title".into(), Value::String(title.clone()));
        }
        if let Some(width) = self.width {
            attrs.insert("width".into(), Value::from(width));
        }
        if let Some(height) = self.height {
            attrs.insert("height".into(), Value::from(height));
        }
        if let Some(alignment) = self.alignment {
            attrs.insert("alignment".into(), Value::String(alignment.as_str().into()));
        }
        if let Some(id) = &self.block_id {
            attrs.insert("blockId".into(), Value::String(id.clone()));
        }
        attrs
    }
}

/// Numbers arrive from the editor either as JSON numbers or numeric strings ("300", "300px").
fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        Value::String(s) => s.trim().trim_end_matches("px").trim().parse().ok(),
        _ => None,
    }
}

/// A style annotation on a run of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mark {
    /// `**x**`
    Bold,
    /// `*x*`
    Italic,
    /// `~~x~~`
    Strike,
    /// `` `x` ``
    Code,
    /// `[x](href)`
    Link {
        /// Link target
        href: String,
    },
    /// Sidecar only
    Underline,
    /// Sidecar only
    Superscript,
    /// Sidecar only
    Subscript,
    /// Font family/size/colour, sidecar only
    TextStyle {
        /// CSS font family
        font_family: Option<String>,
        /// CSS font size
        font_size: Option<String>,
        /// CSS text colour
        color: Option<String>,
    },
    /// Background highlight, sidecar only
    Highlight {
        /// CSS background colour (`None` = editor default highlight)
        color: Option<String>,
    },
}

impl Mark {
    /// Whether the plain-text dialect has delimiter syntax for this mark.
    pub fn has_markdown_syntax(&self) -> bool {
        matches!(
            self,
            Mark::Bold | Mark::Italic | Mark::Strike | Mark::Code | Mark::Link { .. }
        )
    }

    /// The editor's type tag for this mark.
    pub fn tag(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Strike => "strike",
            Mark::Code => "code",
            Mark::Link { .. } => "link",
            Mark::Underline => "underline",
            Mark::Superscript => "superscript",
            Mark::Subscript => "subscript",
            Mark::TextStyle { .. } => "textStyle",
            Mark::Highlight { .. } => "highlight",
        }
    }

    /// Whether two marks are of the same kind (ignoring attributes).
    pub fn same_kind(&self, other: &Mark) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn from_raw(raw: RawMark) -> Option<Self> {
        let string = |key: &str| raw.attrs.get(key).and_then(Value::as_str).map(String::from);
        let mark = match raw.kind.as_str() {
            "bold" => Mark::Bold,
            "italic" => Mark::Italic,
            "strike" => Mark::Strike,
            "code" => Mark::Code,
            "link" => Mark::Link {
                href: string("href").unwrap_or_default(),
            },
            "underline" => Mark::Underline,
            "superscript" => Mark::Superscript,
            "subscript" => Mark::Subscript,
            "textStyle" => Mark::TextStyle {
                font_family: string("fontFamily"),
                font_size: string("fontSize"),
                color: string("color"),
            },
            "highlight" => Mark::Highlight {
                color: string("color"),
            },
            other => {
                log::debug!("Dropping unsupported mark type '{}'", other);
                return None;
            }
        };
        Some(mark)
    }

    fn to_raw(&self) -> RawMark {
        let mut attrs = Map::new();
        let mut put = |key: &str, value: &Option<String>| {
            if let Some(v) = value {
                attrs.insert(key.to_string(), Value::String(v.clone()));
            }
        };
        match self {
            Mark::Link { href } => put("href", &Some(href.clone())),
            Mark::TextStyle {
                font_family,
                font_size,
                color,
            } => {
                put("fontFamily", font_family);
                put("fontSize", font_size);
                put("color", color);
            }
            Mark::Highlight { color } => put("color", color),
            _ => {}
        }
        RawMark {
            kind: self.tag().to_string(),
            attrs,
        }
    }
}

/// A run of text with its marks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Text {
    /// Literal text
    pub text: String,
    /// Marks in insertion order
    pub marks: Vec<Mark>,
}

impl Text {
    /// Length in `char`s, the unit every sidecar offset is counted in.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A node of the rich-document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawNode", into = "RawNode")]
pub enum Node {
    /// Root node
    Document {
        /// Top-level blocks
        content: Vec<Node>,
    },
    /// Paragraph of inline content
    Paragraph {
        /// Block attributes
        attrs: BlockAttrs,
        /// Inline content
        content: Vec<Node>,
    },
    /// Heading of inline content
    Heading {
        /// Heading level, nominally 1..=6
        level: u8,
        /// Block attributes
        attrs: BlockAttrs,
        /// Inline content
        content: Vec<Node>,
    },
    /// Unordered list
    BulletList {
        /// List items
        content: Vec<Node>,
    },
    /// Ordered list
    OrderedList {
        /// Number of the first item
        start: u32,
        /// List items
        content: Vec<Node>,
    },
    /// List item holding block content
    ListItem {
        /// Blocks of the item
        content: Vec<Node>,
    },
    /// Block quote
    Blockquote {
        /// Quoted blocks
        content: Vec<Node>,
    },
    /// Fenced code block
    CodeBlock {
        /// Language tag
        language: Option<String>,
        /// Verbatim code
        text: String,
    },
    /// Thematic break
    HorizontalRule,
    /// Block image
    Image(ImageAttrs),
    /// Table, carried as its opaque editor subtree
    Table(RawNode),
    /// Text run
    Text(Text),
    /// Any node kind the converter does not model
    Unknown(RawNode),
}

impl Node {
    /// Root document node.
    pub fn doc(content: Vec<Node>) -> Self {
        Node::Document { content }
    }

    /// Paragraph without attributes.
    pub fn paragraph(content: Vec<Node>) -> Self {
        Node::Paragraph {
            attrs: BlockAttrs::default(),
            content,
        }
    }

    /// Heading without attributes.
    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        Node::Heading {
            level,
            attrs: BlockAttrs::default(),
            content,
        }
    }

    /// Unmarked text run.
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks: Vec::new(),
        })
    }

    /// Text run with marks.
    pub fn styled(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node::Text(Text {
            text: text.into(),
            marks,
        })
    }

    /// Unordered list.
    pub fn bullet_list(items: Vec<Node>) -> Self {
        Node::BulletList { content: items }
    }

    /// Ordered list starting at `start`.
    pub fn ordered_list(start: u32, items: Vec<Node>) -> Self {
        Node::OrderedList {
            start,
            content: items,
        }
    }

    /// List item.
    pub fn list_item(content: Vec<Node>) -> Self {
        Node::ListItem { content }
    }

    /// Block quote.
    pub fn blockquote(content: Vec<Node>) -> Self {
        Node::Blockquote { content }
    }

    /// Code block.
    pub fn code_block(language: Option<&str>, text: impl Into<String>) -> Self {
        Node::CodeBlock {
            language: language.map(String::from),
            text: text.into(),
        }
    }

    /// Image with a source and alt text.
    pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Self {
        Node::Image(ImageAttrs {
            src: src.into(),
            alt: alt.into(),
            ..Default::default()
        })
    }

    /// Set the block id of a paragraph, heading, image or table (no-op otherwise).
    pub fn with_block_id(mut self, id: impl Into<String>) -> Self {
        let id = id.into();
        match &mut self {
            Node::Paragraph { attrs, .. } | Node::Heading { attrs, .. } => {
                attrs.block_id = Some(id)
            }
            Node::Image(image) => image.block_id = Some(id),
            Node::Table(raw) => {
                raw.attrs.insert("blockId".into(), Value::String(id));
            }
            _ => {}
        }
        self
    }

    /// Block id of a paragraph, heading, image or table.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Node::Paragraph { attrs, .. } | Node::Heading { attrs, .. } => {
                attrs.block_id.as_deref()
            }
            Node::Image(image) => image.block_id.as_deref(),
            Node::Table(raw) => raw.attr_str("blockId"),
            _ => None,
        }
    }

    /// Child nodes (empty for leaves).
    pub fn children(&self) -> &[Node] {
        match self {
            Node::Document { content }
            | Node::Paragraph { content, .. }
            | Node::Heading { content, .. }
            | Node::BulletList { content }
            | Node::OrderedList { content, .. }
            | Node::ListItem { content }
            | Node::Blockquote { content } => content,
            _ => &[],
        }
    }

    /// Concatenated text of every descendant, without any formatting.
    pub fn plain_text(&self) -> String {
        match self {
            Node::Text(text) => text.text.clone(),
            Node::CodeBlock { text, .. } => text.clone(),
            Node::Image(image) => image.alt.clone(),
            Node::Table(raw) | Node::Unknown(raw) => raw.plain_text(),
            Node::HorizontalRule => String::new(),
            _ => self.children().iter().map(Node::plain_text).collect(),
        }
    }
}

fn convert_children(content: Vec<RawNode>) -> Vec<Node> {
    content.into_iter().map(Node::from).collect()
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        match raw.kind.as_str() {
            "doc" => Node::Document {
                content: convert_children(raw.content),
            },
            "paragraph" => Node::Paragraph {
                attrs: BlockAttrs::from_raw(&raw.attrs),
                content: convert_children(raw.content),
            },
            "heading" => Node::Heading {
                level: raw
                    .attrs
                    .get("level")
                    .and_then(lenient_u64)
                    .map(|n| n.min(u8::MAX as u64) as u8)
                    .unwrap_or(1),
                attrs: BlockAttrs::from_raw(&raw.attrs),
                content: convert_children(raw.content),
            },
            "bulletList" => Node::BulletList {
                content: convert_children(raw.content),
            },
            "orderedList" => Node::OrderedList {
                start: raw
                    .attrs
                    .get("start")
                    .and_then(lenient_u64)
                    .map(|n| n.min(u32::MAX as u64) as u32)
                    .unwrap_or(1),
                content: convert_children(raw.content),
            },
            "listItem" => Node::ListItem {
                content: convert_children(raw.content),
            },
            "blockquote" => Node::Blockquote {
                content: convert_children(raw.content),
            },
            "codeBlock" => Node::CodeBlock {
                language: raw
                    .attr_str("language")
                    .filter(|lang| !lang.is_empty())
                    .map(String::from),
                text: raw.plain_text(),
            },
            "horizontalRule" => Node::HorizontalRule,
            "image" => Node::Image(ImageAttrs::from_raw(&raw.attrs)),
            "table" => Node::Table(raw),
            "text" => Node::Text(Text {
                text: raw.text.unwrap_or_default(),
                marks: raw.marks.into_iter().filter_map(Mark::from_raw).collect(),
            }),
            _ => Node::Unknown(raw),
        }
    }
}

impl From<Node> for RawNode {
    fn from(node: Node) -> Self {
        let children = |content: Vec<Node>| -> Vec<RawNode> {
            content.into_iter().map(RawNode::from).collect()
        };
        match node {
            Node::Document { content } => RawNode {
                content: children(content),
                ..RawNode::new("doc")
            },
            Node::Paragraph { attrs, content } => {
                let mut raw = RawNode::new("paragraph");
                attrs.write_raw(&mut raw.attrs);
                raw.content = children(content);
                raw
            }
            Node::Heading {
                level,
                attrs,
                content,
            } => {
                let mut raw = RawNode::new("heading");
                raw.attrs.insert("level".into(), Value::from(level));
                attrs.write_raw(&mut raw.attrs);
                raw.content = children(content);
                raw
            }
            Node::BulletList { content } => RawNode {
                content: children(content),
                ..RawNode::new("bulletList")
            },
            Node::OrderedList { start, content } => {
                let mut raw = RawNode::new("orderedList");
                raw.attrs.insert("start".into(), Value::from(start));
                raw.content = children(content);
                raw
            }
            Node::ListItem { content } => RawNode {
                content: children(content),
                ..RawNode::new("listItem")
            },
            Node::Blockquote { content } => RawNode {
                content: children(content),
                ..RawNode::new("blockquote")
            },
            Node::CodeBlock { language, text } => {
                let mut raw = RawNode::new("codeBlock");
                if let Some(language) = language {
                    raw.attrs.insert("language".into(), Value::String(language));
                }
                if !text.is_empty() {
                    raw.content.push(RawNode {
                        text: Some(text),
                        ..RawNode::new("text")
                    });
                }
                raw
            }
            Node::HorizontalRule => RawNode::new("horizontalRule"),
            Node::Image(image) => RawNode {
                attrs: image.to_raw(),
                ..RawNode::new("image")
            },
            Node::Text(text) => RawNode {
                marks: text.marks.iter().map(Mark::to_raw).collect(),
                text: Some(text.text),
                ..RawNode::new("text")
            },
            Node::Table(raw) | Node::Unknown(raw) => raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_editor_json() {
        let value = json!({
            "type": "doc",
            "content": [
                {"type": "heading", "attrs": {"level": 3, "textAlign": "center", "blockId": "h1"},
                 "content": [{"type": "text", "text": "Title"}]},
                {"type": "paragraph", "content": [
                    {"type": "text", "text": "red", "marks": [
                        {"type": "bold"},
                        {"type": "textStyle", "attrs": {"color": "#f00", "fontFamily": null}}
                    ]}
                ]}
            ]
        });

        let doc: Node = serde_json::from_value(value).unwrap();
        let Node::Document { content } = &doc else {
            panic!("expected document");
        };

        match &content[0] {
            Node::Heading { level, attrs, .. } => {
                assert_eq!(*level, 3);
                assert_eq!(attrs.text_align, Some(TextAlign::Center));
                assert_eq!(attrs.block_id.as_deref(), Some("h1"));
            }
            other => panic!("expected heading, got {:?}", other),
        }

        match &content[1].children()[0] {
            Node::Text(text) => {
                assert_eq!(
                    text.marks,
                    vec![
                        Mark::Bold,
                        Mark::TextStyle {
                            font_family: None,
                            font_size: None,
                            color: Some("#f00".into()),
                        }
                    ]
                );
            }
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_node_survives() {
        let value = json!({"type": "mention", "attrs": {"id": "u1"}, "content": [{"type": "text", "text": "@ann"}]});
        let node: Node = serde_json::from_value(value.clone()).unwrap();
        assert!(matches!(node, Node::Unknown(_)));
        assert_eq!(node.plain_text(), "@ann");
        assert_eq!(serde_json::to_value(&node).unwrap(), value);
    }

    #[test]
    fn test_unsupported_mark_is_dropped() {
        let value = json!({"type": "text", "text": "x", "marks": [{"type": "comment"}, {"type": "italic"}]});
        let node: Node = serde_json::from_value(value).unwrap();
        assert_eq!(node, Node::styled("x", vec![Mark::Italic]));
    }

    #[test]
    fn test_image_dimensions_lenient() {
        let value = json!({"type": "image", "attrs": {"src": "a.png", "width": "300px", "height": 120.4}});
        let node: Node = serde_json::from_value(value).unwrap();
        match node {
            Node::Image(image) => {
                assert_eq!(image.width, Some(300));
                assert_eq!(image.height, Some(120));
                assert_eq!(image.alt, "");
            }
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_code_block_text_roundtrip() {
        let node = Node::code_block(Some("rust"), "fn main() {}\n");
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["attrs"]["language"], "rust");
        assert_eq!(value["content"][0]["text"], "fn main() {}\n");
        let back: Node = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_with_block_id() {
        let node = Node::paragraph(vec![]).with_block_id("abc");
        assert_eq!(node.block_id(), Some("abc"));
        assert_eq!(Node::HorizontalRule.with_block_id("x").block_id(), None);
    }

    #[test]
    fn test_mark_partition() {
        assert!(Mark::Bold.has_markdown_syntax());
        assert!(Mark::Link { href: "x".into() }.has_markdown_syntax());
        assert!(!Mark::Underline.has_markdown_syntax());
        assert!(!Mark::Highlight { color: None }.has_markdown_syntax());
    }
}
