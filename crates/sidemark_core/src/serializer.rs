//! Document tree to plain text + sidecar.
//!
//! Serialization runs in two phases. First every distinct inline image
//! payload is handed to the [`ImageStore`], one at a time in tree order.
//! Then the tree is walked synchronously, threading a [`SerializeContext`]
//! that owns the sidecar under construction. The [`Serializer`] itself holds
//! only configuration, so one value can serve any number of calls.

use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;

use crate::block_id::{format_marker, generate_block_id, is_valid_id, parse_marker};
use crate::config::{ConverterConfig, TableMode};
use crate::deserializer::{ORDERED_RE, TABLE_PLACEHOLDER, starts_block};
use crate::document::{BlockAttrs, ImageAttrs, Node, RawNode, TextAlign};
use crate::error::Result;
use crate::image::{ImageStore, image_ref, is_inline_payload};
use crate::inline::{self, escape_text};
use crate::sidecar::{BlockFormat, ImageMeta, MetaUpdate, Sidecar, reading_time, word_count};

/// Output of one serialize call: the plain-text body and its sidecar.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized {
    /// Plain-text body
    pub text: String,
    /// Formatting the body cannot express
    pub sidecar: Sidecar,
}

/// Converts document trees into a plain-text body and a sidecar.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    config: ConverterConfig,
}

impl Serializer {
    /// Create a serializer with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Serialize a document into a fresh plain-text body and sidecar.
    ///
    /// Inline `data:` image payloads are stored through `store` (at most once
    /// per distinct payload) and replaced by `@img:<token>` references. A
    /// store failure is returned as-is; nothing else can fail.
    pub async fn serialize(&self, doc: &Node, store: &dyn ImageStore) -> Result<Serialized> {
        let mut payloads = IndexSet::new();
        collect_payloads(doc, &mut payloads);

        let mut tokens = HashMap::with_capacity(payloads.len());
        for payload in payloads {
            let token = store.store_image(&payload).await?;
            log::debug!("Stored inline image as {}", token);
            tokens.insert(payload, token);
        }

        let mut ctx = SerializeContext {
            config: &self.config,
            tokens: &tokens,
            sidecar: Sidecar::new(),
            seen: HashSet::new(),
            words: 0,
        };
        let blocks = match doc {
            Node::Document { content } => ctx.blocks(content, Scope::Document)?,
            other => ctx.blocks(std::slice::from_ref(other), Scope::Document)?,
        };
        let text = blocks.join("\n\n");

        let words = ctx.words;
        let mut sidecar = ctx.sidecar;
        sidecar.update_meta(MetaUpdate {
            word_count: Some(words),
            reading_time: Some(reading_time(words, self.config.words_per_minute)),
            ..Default::default()
        });

        log::debug!(
            "Serialized {} blocks ({} words, {} stored images, {} formatted blocks)",
            blocks.len(),
            words,
            tokens.len(),
            sidecar.block_ids().len()
        );

        Ok(Serialized { text, sidecar })
    }

    /// Serialize a document that was loaded with `previous`, keeping its creation time.
    pub async fn reserialize(
        &self,
        doc: &Node,
        previous: &Sidecar,
        store: &dyn ImageStore,
    ) -> Result<Serialized> {
        let mut serialized = self.serialize(doc, store).await?;
        serialized.sidecar.update_meta(MetaUpdate {
            created: Some(previous.meta.created),
            ..Default::default()
        });
        Ok(serialized)
    }
}

/// Every distinct inline image payload, in tree order.
fn collect_payloads(node: &Node, payloads: &mut IndexSet<String>) {
    if let Node::Image(image) = node
        && is_inline_payload(&image.src)
    {
        payloads.insert(image.src.clone());
    }
    for child in node.children() {
        collect_payloads(child, payloads);
    }
}

/// Where a block is being written. Decides marker placement and block separation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    /// Top level: blocks separated by a blank line, every block marked
    Document,
    /// Inside a blockquote: blocks separated by a blank `>` line
    Quote,
    /// Inside a list item: blocks on consecutive lines
    ListItem,
}

impl Scope {
    fn separator(self) -> &'static str {
        match self {
            Scope::ListItem => "\n",
            Scope::Document | Scope::Quote => "\n\n",
        }
    }
}

/// Per-call state of one serialization.
struct SerializeContext<'a> {
    config: &'a ConverterConfig,
    tokens: &'a HashMap<String, String>,
    sidecar: Sidecar,
    seen: HashSet<String>,
    words: usize,
}

impl SerializeContext<'_> {
    /// Render a sequence of sibling blocks. Blocks with no output are dropped.
    fn blocks(&mut self, nodes: &[Node], scope: Scope) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(nodes.len());
        let mut after_paragraph = false;
        for node in nodes {
            let rendered = self.block(node, scope, after_paragraph)?;
            after_paragraph = matches!(
                node,
                Node::Paragraph { .. } | Node::Text(_) | Node::Unknown(_)
            ) && rendered.is_some();
            out.extend(rendered.filter(|block| !block.is_empty()));
        }
        Ok(out)
    }

    fn block(&mut self, node: &Node, scope: Scope, after_paragraph: bool) -> Result<Option<String>> {
        let rendered = match node {
            Node::Paragraph { attrs, content } => {
                self.paragraph(attrs, content, scope, after_paragraph)
            }
            Node::Heading {
                level,
                attrs,
                content,
            } => self.heading(*level, attrs, content, scope),
            Node::BulletList { content } => self.list(content, None)?,
            Node::OrderedList { start, content } => self.list(content, Some(*start))?,
            Node::ListItem { .. } => self.list(std::slice::from_ref(node), None)?,
            Node::Blockquote { content } => self.blockquote(content)?,
            Node::CodeBlock { language, text } => code_block(language.as_deref(), text),
            Node::HorizontalRule => "---".to_string(),
            Node::Image(image) => self.image(image, scope),
            Node::Table(raw) => self.table(raw)?,
            Node::Text(_) => self.paragraph(
                &BlockAttrs::default(),
                std::slice::from_ref(node),
                scope,
                after_paragraph,
            ),
            Node::Document { content } => self.blocks(content, scope)?.join(scope.separator()),
            Node::Unknown(raw) => {
                let text = raw.plain_text();
                if text.trim().is_empty() {
                    log::warn!("Dropping unsupported '{}' block without text", raw.kind);
                    return Ok(None);
                }
                log::warn!("Writing unsupported '{}' block as plain text", raw.kind);
                self.paragraph(
                    &BlockAttrs::default(),
                    &[Node::text(text)],
                    scope,
                    after_paragraph,
                )
            }
        };
        Ok(Some(rendered))
    }

    /// Take `wanted` as this block's id if it is valid and unused, otherwise mint one.
    fn claim_id(&mut self, wanted: Option<&str>) -> String {
        if let Some(id) = wanted {
            if is_valid_id(id) && self.seen.insert(id.to_string()) {
                return id.to_string();
            }
            log::warn!("Block id '{}' is duplicated or invalid, assigning a new one", id);
        }
        loop {
            let id = generate_block_id();
            if self.seen.insert(id.clone()) {
                return id;
            }
        }
    }

    fn record_block_format(&mut self, id: &str, attrs: &BlockAttrs) {
        if !attrs.has_formatting() {
            return;
        }
        self.sidecar.blocks.insert(
            id.to_string(),
            BlockFormat {
                text_align: attrs.text_align.filter(|align| *align != TextAlign::Left),
                indent: (attrs.indent > 0).then_some(attrs.indent),
            },
        );
    }

    fn paragraph(
        &mut self,
        attrs: &BlockAttrs,
        content: &[Node],
        scope: Scope,
        after_paragraph: bool,
    ) -> String {
        let decorated = inline::decorate(content);
        self.words += word_count(&decorated.plain);

        let needs_marker = scope == Scope::Document
            || attrs.block_id.is_some()
            || attrs.has_formatting()
            || !decorated.spans.is_empty()
            || (scope == Scope::ListItem && after_paragraph);

        let mut lines = Vec::with_capacity(2);
        if needs_marker {
            let id = self.claim_id(attrs.block_id.as_deref());
            self.record_block_format(&id, attrs);
            if !decorated.spans.is_empty() {
                self.sidecar.spans.insert(id.clone(), decorated.spans);
            }
            lines.push(format_marker(&id));
        }

        if !decorated.text.is_empty() {
            lines.push(escape_lines(&decorated.text));
        } else if scope != Scope::Document {
            // A lone backslash line reads back as an empty paragraph.
            lines.push("\\".to_string());
        }
        lines.join("\n")
    }

    fn heading(&mut self, level: u8, attrs: &BlockAttrs, content: &[Node], scope: Scope) -> String {
        let clamped = level.clamp(1, 6);
        if clamped != level {
            log::warn!("Heading level {} clamped to {}", level, clamped);
        }

        let decorated = inline::decorate_line(content);
        self.words += word_count(&decorated.plain);

        let needs_marker = scope == Scope::Document
            || attrs.block_id.is_some()
            || attrs.has_formatting()
            || !decorated.spans.is_empty();

        let hashes = "#".repeat(clamped as usize);
        // Headings are one line; offsets survive because '\n' and ' ' are both one char.
        let line = if decorated.text.is_empty() {
            hashes
        } else {
            format!("{} {}", hashes, decorated.text.replace('\n', " "))
        };

        if !needs_marker {
            return line;
        }
        let id = self.claim_id(attrs.block_id.as_deref());
        self.record_block_format(&id, attrs);
        if !decorated.spans.is_empty() {
            self.sidecar.spans.insert(id.clone(), decorated.spans);
        }
        format!("{}\n{}", format_marker(&id), line)
    }

    fn list(&mut self, items: &[Node], start: Option<u32>) -> Result<String> {
        let mut out = Vec::with_capacity(items.len());
        for (n, item) in items.iter().enumerate() {
            let bullet = match start {
                Some(start) => format!("{}. ", u64::from(start) + n as u64),
                None => "- ".to_string(),
            };
            out.push(self.list_item(item, &bullet)?);
        }
        Ok(out.join("\n"))
    }

    fn list_item(&mut self, item: &Node, bullet: &str) -> Result<String> {
        let children = match item {
            Node::ListItem { content } => content.as_slice(),
            other => std::slice::from_ref(other),
        };
        if is_bare_empty(children) {
            return Ok(bullet.trim_end().to_string());
        }

        let blocks = self.blocks(children, Scope::ListItem)?;
        // The first block's marker goes on its own line above the bullet,
        // unless the marker is the whole block (an empty paragraph).
        let hoist = blocks.first().is_some_and(|first| {
            first.contains('\n') && first.lines().next().is_some_and(|l| parse_marker(l).is_some())
        });

        let body = blocks.join("\n");
        let mut lines = body.split('\n');
        let mut out = String::new();
        if hoist && let Some(marker) = lines.next() {
            out.push_str(marker);
            out.push('\n');
        }
        match lines.next() {
            Some(first) if !first.is_empty() => {
                out.push_str(bullet);
                out.push_str(first);
            }
            _ => out.push_str(bullet.trim_end()),
        }
        let indent = " ".repeat(bullet.len());
        for line in lines {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
                out.push_str(line);
            }
        }
        Ok(out)
    }

    fn blockquote(&mut self, content: &[Node]) -> Result<String> {
        let body = self.blocks(content, Scope::Quote)?.join("\n\n");
        Ok(body
            .split('\n')
            .map(|line| {
                if line.is_empty() {
                    ">".to_string()
                } else {
                    format!("> {}", line)
                }
            })
            .collect::<Vec<_>>()
            .join("\n"))
    }

    fn image(&mut self, image: &ImageAttrs, scope: Scope) -> String {
        let src = if is_inline_payload(&image.src) {
            self.tokens
                .get(&image.src)
                .map(|token| image_ref(token))
                .unwrap_or_else(|| image.src.clone())
        } else {
            image.src.clone()
        };
        let line = format_image(&image.alt, &src, image.title.as_deref());

        let has_meta = image.width.is_some() || image.height.is_some() || image.alignment.is_some();
        if scope != Scope::Document && image.block_id.is_none() && !has_meta {
            return line;
        }

        let id = self.claim_id(image.block_id.as_deref());
        self.sidecar.images.insert(
            id.clone(),
            ImageMeta {
                reference: src,
                alt: image.alt.clone(),
                title: image.title.clone(),
                width: image.width,
                height: image.height,
                alignment: image.alignment,
            },
        );
        format!("{}\n{}", format_marker(&id), line)
    }

    fn table(&mut self, raw: &RawNode) -> Result<String> {
        let rows = table_rows(raw);
        self.words += rows
            .iter()
            .flatten()
            .map(|cell| word_count(cell))
            .sum::<usize>();

        match self.config.tables {
            TableMode::Placeholder => {
                log::warn!("Writing table as a placeholder; its content is not kept");
                Ok(TABLE_PLACEHOLDER.to_string())
            }
            TableMode::Sidecar => {
                let id = self.claim_id(raw.attr_str("blockId"));
                let mut stored = raw.clone();
                stored
                    .attrs
                    .insert("blockId".into(), serde_json::Value::String(id.clone()));
                self.sidecar
                    .tables
                    .insert(id.clone(), serde_json::to_value(&stored)?);
                Ok(format!("{}\n{}", format_marker(&id), render_table(&rows)))
            }
        }
    }
}

/// A list item holding nothing, or only an unformatted empty paragraph.
fn is_bare_empty(children: &[Node]) -> bool {
    match children {
        [] => true,
        [Node::Paragraph { attrs, content }] => {
            *attrs == BlockAttrs::default() && content.iter().all(|n| n.plain_text().is_empty())
        }
        _ => false,
    }
}

/// Escape each line of a decorated paragraph so it cannot be read as block syntax.
fn escape_lines(text: &str) -> String {
    text.split('\n')
        .map(escape_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape_line(line: &str) -> String {
    if line.trim().is_empty() {
        return format!("\\{}", line);
    }
    if let Some(number) = ORDERED_RE.captures(line).and_then(|caps| caps.get(1)) {
        let dot = number.end();
        return format!("{}\\{}", &line[..dot], &line[dot..]);
    }
    if starts_block(line) {
        return format!("\\{}", line);
    }
    // Marker lines are recognised with surrounding whitespace too.
    let trimmed = line.trim_start();
    if trimmed.len() != line.len()
        && (parse_marker(line).is_some() || trimmed.trim_end() == TABLE_PLACEHOLDER)
    {
        let indent = line.len() - trimmed.len();
        return format!("{}\\{}", &line[..indent], trimmed);
    }
    line.to_string()
}

fn code_block(language: Option<&str>, text: &str) -> String {
    let longest_leading = text
        .split('\n')
        .map(|line| line.trim_start().chars().take_while(|&c| c == '`').count())
        .max()
        .unwrap_or(0);
    let fence = "`".repeat((longest_leading + 1).max(3));
    format!("{}{}\n{}\n{}", fence, language.unwrap_or(""), text, fence)
}

fn format_image(alt: &str, src: &str, title: Option<&str>) -> String {
    let src = if src.contains([' ', '(', ')']) {
        format!("<{}>", src)
    } else {
        src.to_string()
    };
    match title {
        Some(title) => format!(
            "![{}]({} \"{}\")",
            escape_text(alt),
            src,
            title.replace('\\', "\\\\").replace('"', "\\\"")
        ),
        None => format!("![{}]({})", escape_text(alt), src),
    }
}

/// Cell texts of a table subtree, row by row.
fn table_rows(raw: &RawNode) -> Vec<Vec<String>> {
    raw.content
        .iter()
        .map(|row| {
            row.content
                .iter()
                .map(|cell| {
                    cell.content
                        .iter()
                        .map(RawNode::plain_text)
                        .collect::<Vec<_>>()
                        .join(" ")
                        .replace('\n', " ")
                })
                .collect()
        })
        .collect()
}

fn render_table(rows: &[Vec<String>]) -> String {
    let render_row = |cells: &[String]| {
        if cells.is_empty() {
            return "|".to_string();
        }
        let cells: Vec<String> = cells
            .iter()
            .map(|cell| cell.replace('\\', "\\\\").replace('|', "\\|"))
            .collect();
        format!("| {} |", cells.join(" | "))
    };

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(render_row(row));
        if i == 0 && !row.is_empty() {
            lines.push(render_row(&vec!["---".to_string(); row.len()]));
        }
    }
    if lines.is_empty() {
        lines.push("|".to_string());
    }
    lines.join("\n")
}
