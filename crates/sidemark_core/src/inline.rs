//! Inline decoration and re-composition.
//!
//! Both directions of the converter meet here. [`decorate`] turns the inline
//! content of one block into markdown-decorated text plus the [`SpanFormat`]s
//! for marks markdown cannot express; [`recompose`] inverts it. Offsets are
//! `char` counts into the undecorated text on both sides: decoration and
//! escape characters never count.
//!
//! Delimiter matching is simple (no CommonMark flanking rules):
//! a closing delimiter is the first candidate whose enclosed text contains a
//! balanced number of delimiter characters. That is enough to invert any
//! nesting [`decorate`] produces, including runs like `***x***`.
//!
//! Italics are written `*x*`, except a run starting with a space at the start
//! of a line, which is written `_ x_` so the line is not read as a `* ` bullet.
//! `_` only opens italics at the start of a line; a literal `_` there is escaped.

use crate::document::{Mark, Node, Text};
use crate::sidecar::SpanFormat;

/// Characters escaped with a backslash in literal text.
const ESCAPED: &[char] = &['\\', '*', '`', '[', ']', '~'];

/// Deepest delimiter nesting parsed as marks; deeper delimiters are text.
const MAX_NESTING: usize = 64;

/// Result of decorating one block's inline content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decorated {
    /// Markdown-decorated text
    pub text: String,
    /// Undecorated text (what offsets index into)
    pub plain: String,
    /// Formatting for marks without markdown syntax
    pub spans: Vec<SpanFormat>,
}

/// Escape literal text so the inline parser reads it back verbatim.
pub fn escape_text(text: &str) -> String {
    escape(text, false)
}

fn escape(text: &str, all_underscores: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut line_start = true;
    for c in text.chars() {
        if ESCAPED.contains(&c) || (c == '_' && (line_start || all_underscores)) {
            out.push('\\');
        }
        out.push(c);
        line_start = c == '\n';
    }
    out
}

/// Wrap code in a backtick fence longer than any backtick run it contains.
fn code_span(code: &str) -> String {
    let longest = code
        .split(|c| c != '`')
        .map(str::len)
        .max()
        .unwrap_or(0);
    let fence = "`".repeat(longest + 1);
    let needs_padding = code.starts_with('`')
        || code.ends_with('`')
        || (code.len() > 1
            && code.starts_with(' ')
            && code.ends_with(' ')
            && !code.trim().is_empty());
    if needs_padding {
        format!("{fence} {code} {fence}")
    } else {
        format!("{fence}{code}{fence}")
    }
}

fn format_href(href: &str) -> String {
    if href.contains([' ', '(', ')', '<']) {
        format!("<{}>", href)
    } else {
        href.to_string()
    }
}

/// Sidecar span for the non-markdown marks of a run, if it has any.
fn span_for(marks: &[Mark], start: usize, end: usize) -> Option<SpanFormat> {
    let mut span = SpanFormat {
        start,
        end,
        ..Default::default()
    };
    for mark in marks {
        match mark {
            Mark::TextStyle {
                font_family,
                font_size,
                color,
            } => {
                span.font_family = font_family.clone();
                span.font_size = font_size.clone();
                span.color = color.clone();
            }
            Mark::Highlight { color } => match color {
                Some(color) => span.background_color = Some(color.clone()),
                None => span.highlight = Some(true),
            },
            Mark::Underline => span.underline = Some(true),
            Mark::Superscript => span.superscript = Some(true),
            Mark::Subscript => span.subscript = Some(true),
            _ => {}
        }
    }
    span.has_style().then_some(span)
}

/// Decorate the inline content of one block.
///
/// Markdown wraps are applied in mark-list order, so the last mark is the
/// outermost delimiter. Inline code is always the innermost wrap because
/// nothing inside a code span is interpreted.
pub fn decorate(content: &[Node]) -> Decorated {
    decorate_lines(content, true)
}

/// Decorate inline content that is written on a single line, with every
/// newline later replaced by a space.
pub fn decorate_line(content: &[Node]) -> Decorated {
    decorate_lines(content, false)
}

fn decorate_lines(content: &[Node], multiline: bool) -> Decorated {
    let mut out = Decorated::default();
    let mut offset = 0;

    for node in content {
        let text = match node {
            Node::Text(text) => text,
            Node::Unknown(raw) if raw.kind == "hardBreak" => {
                out.text.push('\n');
                out.plain.push('\n');
                offset += 1;
                continue;
            }
            other => {
                // Lossy: inline nodes without a text form keep only their text.
                let plain = other.plain_text();
                log::debug!("Flattening inline node to text: {:?}", plain);
                out.text.push_str(&escape_text(&plain));
                offset += plain.chars().count();
                out.plain.push_str(&plain);
                continue;
            }
        };
        if text.text.is_empty() {
            continue;
        }

        let len = text.char_len();
        let at_line_start = out.text.is_empty() || (multiline && out.text.ends_with('\n'));
        let underscore_italic = at_line_start
            && text.text.starts_with(' ')
            && text
                .marks
                .iter()
                .filter(|mark| mark.has_markdown_syntax())
                .eq([&Mark::Italic]);
        let mut piece = if text.marks.contains(&Mark::Code) {
            code_span(&text.text)
        } else {
            escape(&text.text, underscore_italic)
        };
        for mark in &text.marks {
            piece = match mark {
                Mark::Bold => format!("**{}**", piece),
                Mark::Italic if underscore_italic => format!("_{}_", piece),
                Mark::Italic => format!("*{}*", piece),
                Mark::Strike => format!("~~{}~~", piece),
                Mark::Link { href } => format!("[{}]({})", piece, format_href(href)),
                _ => piece,
            };
        }
        out.text.push_str(&piece);

        if let Some(span) = span_for(&text.marks, offset, offset + len) {
            out.spans.push(span);
        }
        offset += len;
        out.plain.push_str(&text.text);
    }

    out
}

/// Marks contributed by a sidecar span, in a fixed order.
fn span_marks(span: &SpanFormat) -> Vec<Mark> {
    let mut marks = Vec::new();
    if span.font_family.is_some() || span.font_size.is_some() || span.color.is_some() {
        marks.push(Mark::TextStyle {
            font_family: span.font_family.clone(),
            font_size: span.font_size.clone(),
            color: span.color.clone(),
        });
    }
    if span.background_color.is_some() || span.highlight == Some(true) {
        marks.push(Mark::Highlight {
            color: span.background_color.clone(),
        });
    }
    if span.underline == Some(true) {
        marks.push(Mark::Underline);
    }
    if span.superscript == Some(true) {
        marks.push(Mark::Superscript);
    }
    if span.subscript == Some(true) {
        marks.push(Mark::Subscript);
    }
    marks
}

/// Rebuild text nodes from decorated text and the block's sidecar spans.
///
/// Each parsed run is split at span boundaries falling inside it; every span
/// with `start <= piece_start && end >= piece_end` then adds its marks to the
/// piece (a mark kind already present is not added twice).
pub fn recompose(decorated: &str, spans: &[SpanFormat]) -> Vec<Node> {
    let runs = parse_inline(decorated);
    let mut nodes = Vec::with_capacity(runs.len());
    let mut offset = 0;

    for run in runs {
        let chars: Vec<char> = run.text.chars().collect();
        let run_end = offset + chars.len();

        let mut cuts: Vec<usize> = spans
            .iter()
            .flat_map(|span| [span.start, span.end])
            .filter(|&cut| cut > offset && cut < run_end)
            .collect();
        cuts.sort_unstable();
        cuts.dedup();

        let mut piece_start = offset;
        for piece_end in cuts.into_iter().chain(std::iter::once(run_end)) {
            let mut marks = run.marks.clone();
            for span in spans.iter().filter(|s| s.covers(piece_start, piece_end)) {
                for mark in span_marks(span) {
                    if !marks.iter().any(|m| m.same_kind(&mark)) {
                        marks.push(mark);
                    }
                }
            }
            let text: String = chars[piece_start - offset..piece_end - offset]
                .iter()
                .collect();
            nodes.push(Node::Text(Text { text, marks }));
            piece_start = piece_end;
        }

        offset = run_end;
    }

    nodes
}

/// Parse decorated text into runs carrying only markdown-implied marks.
pub fn parse_inline(decorated: &str) -> Vec<Text> {
    let parser = InlineParser::new(decorated);
    let mut runs = Vec::new();
    parser.parse_range(0, parser.chars.len(), 0, &mut runs);

    // Adjacent runs with identical marks are one run, as the editor would store them.
    let mut merged: Vec<Text> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.marks == run.marks => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

struct InlineParser {
    chars: Vec<char>,
    /// Index of the `]` matching each `[`, outside escapes and code spans
    closers: Vec<Option<usize>>,
    /// Index of the first `)` at or after each position
    next_paren: Vec<usize>,
    /// Index of the first `>` at or after each position
    next_angle: Vec<usize>,
}

struct Link {
    text_end: usize,
    href: String,
    next: usize,
}

impl InlineParser {
    fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let n = chars.len();
        let mut next_paren = vec![n; n + 1];
        let mut next_angle = vec![n; n + 1];
        for k in (0..n).rev() {
            next_paren[k] = if chars[k] == ')' { k } else { next_paren[k + 1] };
            next_angle[k] = if chars[k] == '>' { k } else { next_angle[k + 1] };
        }

        let mut parser = Self {
            chars,
            closers: vec![None; n],
            next_paren,
            next_angle,
        };
        let mut open = Vec::new();
        let mut p = 0;
        while p < n {
            match parser.chars[p] {
                '\\' => p += 2,
                '`' => p = parser.skip_code(p, n),
                '[' => {
                    open.push(p);
                    p += 1;
                }
                ']' => {
                    if let Some(start) = open.pop() {
                        parser.closers[start] = Some(p);
                    }
                    p += 1;
                }
                _ => p += 1,
            }
        }
        parser
    }

    fn starts_with(&self, at: usize, end: usize, delim: &str) -> bool {
        let mut i = at;
        for d in delim.chars() {
            if i >= end || self.chars[i] != d {
                return false;
            }
            i += 1;
        }
        true
    }

    fn run_len(&self, at: usize, end: usize, c: char) -> usize {
        self.chars[at..end].iter().take_while(|&&x| x == c).count()
    }

    fn parse_range(&self, mut i: usize, end: usize, depth: usize, out: &mut Vec<Text>) {
        let mut plain = String::new();
        let nest = depth < MAX_NESTING;

        while i < end {
            let c = self.chars[i];
            match c {
                '\\' => {
                    if i + 1 < end && self.chars[i + 1].is_ascii_punctuation() {
                        plain.push(self.chars[i + 1]);
                        i += 2;
                    } else {
                        plain.push('\\');
                        i += 1;
                    }
                    continue;
                }
                '`' => {
                    if let Some((code, next)) = self.code_span(i, end) {
                        flush(&mut plain, out);
                        out.push(Text {
                            text: code,
                            marks: vec![Mark::Code],
                        });
                        i = next;
                    } else {
                        let n = self.run_len(i, end, '`');
                        plain.extend(std::iter::repeat_n('`', n));
                        i += n;
                    }
                    continue;
                }
                '*' if nest => {
                    if self.starts_with(i, end, "**")
                        && let Some(close) = self.find_close(i + 2, end, "**")
                    {
                        flush(&mut plain, out);
                        self.parse_wrapped(i + 2, close, depth, Mark::Bold, out);
                        i = close + 2;
                        continue;
                    }
                    if let Some(close) = self.find_close(i + 1, end, "*") {
                        flush(&mut plain, out);
                        self.parse_wrapped(i + 1, close, depth, Mark::Italic, out);
                        i = close + 1;
                        continue;
                    }
                }
                '_' if nest && (i == 0 || self.chars[i - 1] == '\n') => {
                    if let Some(close) = self.find_close(i + 1, end, "_") {
                        flush(&mut plain, out);
                        self.parse_wrapped(i + 1, close, depth, Mark::Italic, out);
                        i = close + 1;
                        continue;
                    }
                }
                '~' if nest => {
                    if self.starts_with(i, end, "~~")
                        && let Some(close) = self.find_close(i + 2, end, "~~")
                    {
                        flush(&mut plain, out);
                        self.parse_wrapped(i + 2, close, depth, Mark::Strike, out);
                        i = close + 2;
                        continue;
                    }
                }
                '[' if nest => {
                    if let Some(link) = self.link(i, end) {
                        flush(&mut plain, out);
                        let mark = Mark::Link { href: link.href };
                        self.parse_wrapped(i + 1, link.text_end, depth, mark, out);
                        i = link.next;
                        continue;
                    }
                }
                _ => {}
            }
            plain.push(c);
            i += 1;
        }

        flush(&mut plain, out);
    }

    /// Parse `start..end` and append `mark` as the outermost mark of every run.
    fn parse_wrapped(
        &self,
        start: usize,
        end: usize,
        depth: usize,
        mark: Mark,
        out: &mut Vec<Text>,
    ) {
        let mut inner = Vec::new();
        self.parse_range(start, end, depth + 1, &mut inner);
        for mut run in inner {
            run.marks.push(mark.clone());
            out.push(run);
        }
    }

    /// Code span opening at `at`: returns its content and the index after the closing fence.
    fn code_span(&self, at: usize, end: usize) -> Option<(String, usize)> {
        let n = self.run_len(at, end, '`');
        let mut p = at + n;
        while p < end {
            if self.chars[p] == '`' {
                let m = self.run_len(p, end, '`');
                if m == n {
                    let content = &self.chars[at + n..p];
                    let stripped = if content.len() >= 2
                        && content[0] == ' '
                        && content[content.len() - 1] == ' '
                        && content.iter().any(|&c| c != ' ')
                    {
                        &content[1..content.len() - 1]
                    } else {
                        content
                    };
                    return Some((stripped.iter().collect(), p + m));
                }
                p += m;
            } else {
                p += 1;
            }
        }
        None
    }

    /// Link opening at `at` (`[text](href)` or `[text](<href>)`).
    fn link(&self, at: usize, end: usize) -> Option<Link> {
        let text_end = self.closers[at].filter(|&close| close < end)?;
        if text_end + 1 >= end || self.chars[text_end + 1] != '(' {
            return None;
        }
        let dest = text_end + 2;
        if dest < end && self.chars[dest] == '<' {
            let close = self.next_angle[dest + 1];
            if close + 1 >= end || self.chars[close + 1] != ')' {
                return None;
            }
            return Some(Link {
                text_end,
                href: self.chars[dest + 1..close].iter().collect(),
                next: close + 2,
            });
        }
        let close = self.next_paren[dest];
        if close >= end {
            return None;
        }
        Some(Link {
            text_end,
            href: self.chars[dest..close].iter().collect(),
            next: close + 1,
        })
    }

    fn skip_code(&self, at: usize, end: usize) -> usize {
        match self.code_span(at, end) {
            Some((_, next)) => next,
            None => at + self.run_len(at, end, '`'),
        }
    }

    /// First closing `delim` after `from` whose enclosed text holds an even
    /// number of unescaped delimiter chars outside code spans and links.
    fn find_close(&self, from: usize, end: usize, delim: &str) -> Option<usize> {
        let marker = delim.chars().next()?;
        let mut count = 0usize;
        let mut p = from;
        while p < end {
            match self.chars[p] {
                '\\' => {
                    p += 2;
                    continue;
                }
                '`' => {
                    p = self.skip_code(p, end);
                    continue;
                }
                '[' => {
                    if let Some(link) = self.link(p, end) {
                        p = link.next;
                        continue;
                    }
                }
                _ => {}
            }
            if p > from && count % 2 == 0 && self.starts_with(p, end, delim) {
                return Some(p);
            }
            if self.chars[p] == marker {
                count += 1;
            }
            p += 1;
        }
        None
    }
}

fn flush(plain: &mut String, out: &mut Vec<Text>) {
    if plain.is_empty() {
        return;
    }
    let text = std::mem::take(plain);
    match out.last_mut() {
        Some(last) if last.marks.is_empty() => last.text.push_str(&text),
        _ => out.push(Text {
            text,
            marks: Vec::new(),
        }),
    }
}
