//! Plain text + sidecar to document tree.
//!
//! Parsing never fails: every line ends up in some block, and a line nothing
//! else claims becomes paragraph text. The only fallible step is resolving
//! `@img:` references through the [`ImageStore`], which happens after the
//! tree is built, sequentially and once per distinct token.

use std::collections::HashMap;
use std::sync::LazyLock;

use indexmap::IndexSet;
use regex::Regex;

use crate::block_id::{collect_block_ids, format_marker, parse_marker};
use crate::config::{ConverterConfig, MissingImagePolicy};
use crate::document::{BlockAttrs, ImageAttrs, Node, RawNode};
use crate::error::Result;
use crate::image::{ImageStore, parse_image_ref};
use crate::inline;
use crate::sidecar::Sidecar;

/// Line written in place of a table when tables are not kept.
pub const TABLE_PLACEHOLDER: &str = "<!-- table -->";

/// Deepest list or quote nesting parsed as structure; deeper lines are text.
const MAX_NESTING: usize = 64;

static HEADING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(#{1,6})(?: (.*))?$").expect("valid heading regex"));

pub(crate) static ORDERED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\.(?: |$)").expect("valid ordered list regex"));

static IMAGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^!\[((?:\\.|[^\\\]])*)\]\((<[^>]*>|[^\s)]*)(?: "((?:\\.|[^"\\])*)")?\)$"#)
        .expect("valid image regex")
});

static TABLE_RULE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^:?-+:?$").expect("valid table rule regex"));

/// Converts a plain-text body and its sidecar back into a document tree.
#[derive(Debug, Clone, Default)]
pub struct Deserializer {
    config: ConverterConfig,
}

impl Deserializer {
    /// Create a deserializer with the given configuration.
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Rebuild the document tree and resolve `@img:` references through `store`.
    ///
    /// Fails only when an image cannot be loaded and the configured
    /// [`MissingImagePolicy`] is `Fail`.
    pub async fn deserialize(
        &self,
        text: &str,
        sidecar: &Sidecar,
        store: &dyn ImageStore,
    ) -> Result<Node> {
        let mut doc = self.parse(text, sidecar);

        let mut tokens = IndexSet::new();
        collect_image_refs(&doc, &mut tokens);

        let mut payloads = HashMap::with_capacity(tokens.len());
        for token in tokens {
            let loaded = store.load_image(&token).await;
            match loaded {
                Ok(payload) => {
                    payloads.insert(token, payload);
                }
                Err(e) => match self.config.missing_images {
                    MissingImagePolicy::Fail => return Err(e),
                    MissingImagePolicy::KeepReference => {
                        log::warn!("Keeping unresolved image reference {}: {}", token, e);
                    }
                },
            }
        }
        replace_image_refs(&mut doc, &payloads);

        Ok(doc)
    }

    /// Rebuild the document tree without touching image references.
    pub fn parse(&self, text: &str, sidecar: &Sidecar) -> Node {
        let stale = sidecar.stale_block_ids(&collect_block_ids(text));
        if !stale.is_empty() {
            log::debug!(
                "Ignoring sidecar entries for {} blocks not in the text: {:?}",
                stale.len(),
                stale
            );
        }

        let lines: Vec<&str> = text.lines().collect();
        let ctx = ParseContext { sidecar, depth: 0 };
        let content = ctx.blocks(&lines);
        log::debug!("Parsed {} lines into {} blocks", lines.len(), content.len());
        Node::doc(content)
    }
}

fn collect_image_refs(node: &Node, tokens: &mut IndexSet<String>) {
    if let Node::Image(image) = node
        && let Some(token) = parse_image_ref(&image.src)
    {
        tokens.insert(token.to_string());
    }
    for child in node.children() {
        collect_image_refs(child, tokens);
    }
}

fn replace_image_refs(node: &mut Node, payloads: &HashMap<String, String>) {
    match node {
        Node::Image(image) => {
            let payload = parse_image_ref(&image.src)
                .and_then(|token| payloads.get(token))
                .cloned();
            if let Some(payload) = payload {
                image.src = payload;
            }
        }
        Node::Document { content }
        | Node::Paragraph { content, .. }
        | Node::Heading { content, .. }
        | Node::BulletList { content }
        | Node::OrderedList { content, .. }
        | Node::ListItem { content }
        | Node::Blockquote { content } => {
            for child in content {
                replace_image_refs(child, payloads);
            }
        }
        _ => {}
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ListKind {
    Bullet,
    Ordered,
}

struct ListMarker<'a> {
    kind: ListKind,
    number: u32,
    /// Width of the marker including its trailing space; continuation indent
    width: usize,
    rest: &'a str,
}

fn list_marker(line: &str) -> Option<ListMarker<'_>> {
    if line == "-" {
        return Some(ListMarker {
            kind: ListKind::Bullet,
            number: 0,
            width: 2,
            rest: "",
        });
    }
    if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
        return Some(ListMarker {
            kind: ListKind::Bullet,
            number: 0,
            width: 2,
            rest,
        });
    }
    let digits = ORDERED_RE.captures(line)?.get(1)?;
    let width = digits.end() + 2;
    Some(ListMarker {
        kind: ListKind::Ordered,
        // Start numbers past u32::MAX saturate.
        number: digits.as_str().parse().unwrap_or(u32::MAX),
        width,
        rest: line.get(width..).unwrap_or(""),
    })
}

/// Opening code fence: backtick count and info string.
fn fence_open(line: &str) -> Option<(usize, &str)> {
    let ticks = line.chars().take_while(|&c| c == '`').count();
    let info = &line[ticks..];
    (ticks >= 3 && !info.contains('`')).then(|| (ticks, info.trim()))
}

fn fence_close(line: &str, ticks: usize) -> bool {
    let line = line.trim();
    line.len() >= ticks && line.chars().all(|c| c == '`')
}

/// Fence state after `line`, given the fence (if any) open before it.
fn track_fence(open: Option<usize>, line: &str) -> Option<usize> {
    let line = line.trim_start();
    match open {
        Some(ticks) if fence_close(line, ticks) => None,
        Some(ticks) => Some(ticks),
        None => fence_open(line).map(|(ticks, _)| ticks),
    }
}

fn is_rule(line: &str) -> bool {
    let line = line.trim_end();
    line.len() >= 3
        && (line.chars().all(|c| c == '-')
            || line.chars().all(|c| c == '*')
            || line.chars().all(|c| c == '_'))
}

/// Whether `line` would be read as the start of a block rather than paragraph text.
pub(crate) fn starts_block(line: &str) -> bool {
    line.starts_with("<!--")
        || line.starts_with('>')
        || line.starts_with('|')
        || HEADING_RE.is_match(line)
        || list_marker(line).is_some()
        || fence_open(line).is_some()
        || is_rule(line)
        || IMAGE_RE.is_match(line)
}

/// Whether a marker line directly above `line` belongs to it.
fn attachable(line: &str) -> bool {
    !is_blank(line)
        && parse_marker(line).is_none()
        && line.trim() != TABLE_PLACEHOLDER
        && !line.starts_with('>')
        && fence_open(line).is_none()
        && !is_rule(line)
}

/// Undo backslash escapes of ASCII punctuation.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\'
            && let Some(&next) = chars.peek()
            && next.is_ascii_punctuation()
        {
            out.push(next);
            chars.next();
            continue;
        }
        out.push(c);
    }
    out
}

/// Cells of a pipe table row, with `\|` and `\\` unescaped.
fn split_cells(line: &str) -> Vec<String> {
    let inner = line.trim().strip_prefix('|').unwrap_or(line);
    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next @ ('|' | '\\')) => cell.push(next),
                Some(next) => {
                    cell.push('\\');
                    cell.push(next);
                }
                None => cell.push('\\'),
            },
            '|' => cells.push(std::mem::take(&mut cell).trim().to_string()),
            other => cell.push(other),
        }
    }
    if !cell.trim().is_empty() {
        cells.push(cell.trim().to_string());
    }
    cells
}

fn table_cell(kind: &str, text: String) -> RawNode {
    let mut paragraph = RawNode::new("paragraph");
    if !text.is_empty() {
        let mut run = RawNode::new("text");
        run.text = Some(text);
        paragraph.content.push(run);
    }
    let mut cell = RawNode::new(kind);
    cell.content.push(paragraph);
    cell
}

/// Per-call state of one parse.
struct ParseContext<'a> {
    sidecar: &'a Sidecar,
    /// Lists and quotes enclosing the lines being parsed
    depth: usize,
}

impl<'a> ParseContext<'a> {
    fn nested(&self) -> ParseContext<'a> {
        ParseContext {
            sidecar: self.sidecar,
            depth: self.depth + 1,
        }
    }

    fn blocks(&self, lines: &[&str]) -> Vec<Node> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < lines.len() {
            let line = lines[i];
            if is_blank(line) {
                i += 1;
                continue;
            }
            if let Some(id) = parse_marker(line) {
                match lines.get(i + 1) {
                    Some(next) if attachable(next) => {
                        let (node, next_i) = self.block(lines, i + 1, Some(id));
                        out.extend(node);
                        i = next_i;
                    }
                    _ => {
                        out.push(Node::Paragraph {
                            attrs: self.block_attrs(Some(id)),
                            content: Vec::new(),
                        });
                        i += 1;
                    }
                }
                continue;
            }
            if line.trim() == TABLE_PLACEHOLDER {
                log::debug!("Skipping table placeholder at line {}", i + 1);
                i += 1;
                continue;
            }
            let (node, next_i) = self.block(lines, i, None);
            out.extend(node);
            i = next_i;
        }
        out
    }

    /// Parse the block starting at `lines[i]`. Returns the node and the index after it.
    fn block(&self, lines: &[&str], i: usize, id: Option<&str>) -> (Option<Node>, usize) {
        let line = lines[i];
        log::trace!("Block at line {}: {:?}", i + 1, line);

        if let Some(caps) = HEADING_RE.captures(line) {
            let level = caps[1].len() as u8;
            let text = caps.get(2).map_or("", |m| m.as_str());
            let heading = Node::Heading {
                level,
                attrs: self.block_attrs(id),
                content: self.inline(text, id),
            };
            return (Some(heading), i + 1);
        }
        let can_nest = self.depth < MAX_NESTING;
        if can_nest && let Some(marker) = list_marker(line) {
            let (list, next) = self.list(lines, i, id, marker.kind, marker.number);
            return (Some(list), next);
        }
        if can_nest && line.starts_with('>') {
            return self.blockquote(lines, i);
        }
        if !can_nest && (line.starts_with('>') || list_marker(line).is_some()) {
            log::debug!("Nesting limit reached at line {}, reading it as text", i + 1);
        }
        if let Some((ticks, info)) = fence_open(line) {
            return self.code_block(lines, i, ticks, info);
        }
        if is_rule(line) {
            return (Some(Node::HorizontalRule), i + 1);
        }
        if line.starts_with('|') {
            return self.table(lines, i, id);
        }
        if let Some(caps) = IMAGE_RE.captures(line) {
            let src = &caps[2];
            let src = src
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
                .unwrap_or(src);
            let meta = id.and_then(|id| self.sidecar.images.get(id));
            let image = ImageAttrs {
                src: src.to_string(),
                alt: unescape(&caps[1]),
                title: caps.get(3).map(|m| unescape(m.as_str())),
                width: meta.and_then(|m| m.width),
                height: meta.and_then(|m| m.height),
                alignment: meta.and_then(|m| m.alignment),
                block_id: id.map(String::from),
            };
            return (Some(Node::Image(image)), i + 1);
        }
        self.paragraph(lines, i, id)
    }

    fn block_attrs(&self, id: Option<&str>) -> BlockAttrs {
        let format = id.and_then(|id| self.sidecar.blocks.get(id));
        BlockAttrs {
            block_id: id.map(String::from),
            text_align: format.and_then(|f| f.text_align),
            indent: format.and_then(|f| f.indent).unwrap_or(0),
        }
    }

    fn inline(&self, text: &str, id: Option<&str>) -> Vec<Node> {
        let spans = id
            .and_then(|id| self.sidecar.spans.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        inline::recompose(text, spans)
    }

    fn paragraph(&self, lines: &[&str], i: usize, id: Option<&str>) -> (Option<Node>, usize) {
        let mut text_lines = vec![lines[i]];
        let mut j = i + 1;
        while j < lines.len() && !is_blank(lines[j]) && !starts_block(lines[j]) {
            text_lines.push(lines[j]);
            j += 1;
        }
        // A backslash alone or before only whitespace stands for that whitespace.
        let text = text_lines
            .iter()
            .map(|&line| match line.strip_prefix('\\') {
                Some(rest) if rest.trim().is_empty() => rest,
                _ => line,
            })
            .collect::<Vec<_>>()
            .join("\n");

        let paragraph = Node::Paragraph {
            attrs: self.block_attrs(id),
            content: self.inline(&text, id),
        };
        (Some(paragraph), j)
    }

    fn list(
        &self,
        lines: &[&str],
        mut i: usize,
        first_id: Option<&str>,
        kind: ListKind,
        start: u32,
    ) -> (Node, usize) {
        let mut items = Vec::new();
        let mut pending = first_id.map(String::from);

        while let Some(marker) = lines.get(i).and_then(|line| list_marker(line)) {
            if marker.kind != kind {
                break;
            }

            let mut item_lines = Vec::new();
            if let Some(id) = pending.take() {
                item_lines.push(format_marker(&id));
            }
            item_lines.push(marker.rest.to_string());
            let mut fence = track_fence(None, marker.rest);
            let indent = " ".repeat(marker.width);
            i += 1;

            while let Some(line) = lines.get(i) {
                if let Some(inner) = line.strip_prefix(indent.as_str()) {
                    fence = track_fence(fence, inner);
                    item_lines.push(inner.to_string());
                } else if is_blank(line) && fence.is_some() {
                    item_lines.push(String::new());
                } else {
                    break;
                }
                i += 1;
            }

            let item_refs: Vec<&str> = item_lines.iter().map(String::as_str).collect();
            let mut content = self.nested().blocks(&item_refs);
            if content.is_empty() {
                content.push(Node::paragraph(Vec::new()));
            }
            items.push(Node::ListItem { content });

            // A marker directly above the next bullet belongs to that item.
            if let (Some(line), Some(next)) = (lines.get(i), lines.get(i + 1))
                && let Some(id) = parse_marker(line)
                && list_marker(next).is_some_and(|m| m.kind == kind)
            {
                pending = Some(id.to_string());
                i += 1;
            }
        }

        let list = match kind {
            ListKind::Bullet => Node::BulletList { content: items },
            ListKind::Ordered => Node::OrderedList {
                start,
                content: items,
            },
        };
        (list, i)
    }

    fn blockquote(&self, lines: &[&str], i: usize) -> (Option<Node>, usize) {
        let mut j = i;
        let mut inner = Vec::new();
        while let Some(&line) = lines.get(j).filter(|line| line.starts_with('>')) {
            inner.push(
                line.strip_prefix("> ")
                    .or_else(|| line.strip_prefix('>'))
                    .unwrap_or(line),
            );
            j += 1;
        }
        let quote = Node::Blockquote {
            content: self.nested().blocks(&inner),
        };
        (Some(quote), j)
    }

    fn code_block(
        &self,
        lines: &[&str],
        i: usize,
        ticks: usize,
        info: &str,
    ) -> (Option<Node>, usize) {
        let mut body = Vec::new();
        let mut j = i + 1;
        let mut closed = false;
        while j < lines.len() {
            if fence_close(lines[j], ticks) {
                closed = true;
                j += 1;
                break;
            }
            body.push(lines[j]);
            j += 1;
        }
        if !closed {
            log::warn!("Code fence opened at line {} is never closed", i + 1);
        }

        let code = Node::CodeBlock {
            language: (!info.is_empty()).then(|| info.to_string()),
            text: body.join("\n"),
        };
        (Some(code), j)
    }

    fn table(&self, lines: &[&str], i: usize, id: Option<&str>) -> (Option<Node>, usize) {
        let mut j = i;
        while j < lines.len() && lines[j].starts_with('|') {
            j += 1;
        }

        if let Some(value) = id.and_then(|id| self.sidecar.tables.get(id)) {
            match serde_json::from_value::<RawNode>(value.clone()) {
                Ok(raw) => return (Some(Node::Table(raw)), j),
                Err(e) => log::warn!("Rebuilding table from text, sidecar entry is invalid: {}", e),
            }
        }

        let rows: Vec<Vec<String>> = lines[i..j].iter().map(|line| split_cells(line)).collect();
        let has_header = rows.get(1).is_some_and(|row| {
            !row.is_empty() && row.iter().all(|cell| TABLE_RULE_RE.is_match(cell))
        });

        let mut table = RawNode::new("table");
        if let Some(id) = id {
            table
                .attrs
                .insert("blockId".into(), serde_json::Value::String(id.to_string()));
        }
        for (n, cells) in rows.into_iter().enumerate() {
            if has_header && n == 1 {
                continue;
            }
            let kind = if has_header && n == 0 {
                "tableHeader"
            } else {
                "tableCell"
            };
            let mut row = RawNode::new("tableRow");
            row.content = cells.into_iter().map(|cell| table_cell(kind, cell)).collect();
            table.content.push(row);
        }
        (Some(Node::Table(table)), j)
    }
}
