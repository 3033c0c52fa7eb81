//! Formatting overlay ("sidecar") record.
//!
//! The plain-text body can only express what markdown can. Everything else
//! (alignment, indent, colours, fonts, highlight, underline, super/subscript,
//! image dimensions, table structure) lives in a [`Sidecar`] keyed by block
//! identifier. The record is rebuilt wholesale by every serialize call.
//!
//! # Shape (format version 1)
//!
//! ```json
//! { "version": 1,
//!   "meta": { "created": "...", "modified": "...", "wordCount": 2, "readingTime": 1 },
//!   "blocks": { "a1": { "textAlign": "center" } },
//!   "spans":  { "b2": [ { "start": 0, "end": 8, "backgroundColor": "yellow" } ] },
//!   "images": { "c3": { "ref": "@img:0123456789abcdef", "alt": "Cat", "width": 320 } } }
//! ```

use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::{ImageAlignment, TextAlign};
use crate::error::Result;

/// Current sidecar format version.
pub const SIDECAR_VERSION: u32 = 1;

/// Reading speed used for the reading-time estimate.
pub const DEFAULT_WORDS_PER_MINUTE: u32 = 200;

fn default_version() -> u32 {
    SIDECAR_VERSION
}

/// Companion record for formatting the plain-text body cannot express.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct Sidecar {
    /// Format version tag
    #[serde(default = "default_version")]
    pub version: u32,

    /// Timestamps and reading statistics
    #[serde(default)]
    pub meta: SidecarMeta,

    /// Block id → non-default block formatting
    #[serde(default)]
    pub blocks: IndexMap<String, BlockFormat>,

    /// Block id → span formattings, ordered by start offset
    #[serde(default)]
    pub spans: IndexMap<String, Vec<SpanFormat>>,

    /// Block id → image metadata
    #[serde(default)]
    pub images: IndexMap<String, ImageMeta>,

    /// Block id → full table subtree (editor JSON)
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub tables: IndexMap<String, serde_json::Value>,
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SidecarMeta {
    /// When the document was created
    pub created: DateTime<Utc>,
    /// When the sidecar was last rebuilt or updated
    pub modified: DateTime<Utc>,
    /// Whitespace-separated word count of the document text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    /// Estimated reading time in minutes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<u32>,
}

impl Default for SidecarMeta {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            modified: now,
            word_count: None,
            reading_time: None,
        }
    }
}

/// Block-level formatting of a paragraph or heading.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct BlockFormat {
    /// Alignment other than left
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
    /// Indent level above zero
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub indent: Option<u32>,
}

/// Character-range formatting inside one block.
///
/// `start` and `end` are `char` offsets into the block's undecorated text;
/// the span covers `start..end`. A run of text receives this formatting when
/// `start <= run_start && end >= run_end`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct SpanFormat {
    /// First covered character
    pub start: usize,
    /// One past the last covered character
    pub end: usize,
    /// CSS font family
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// CSS font size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<String>,
    /// CSS text colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Highlight colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    /// Highlight without an explicit colour
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
    /// Underlined
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub underline: Option<bool>,
    /// Superscript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub superscript: Option<bool>,
    /// Subscript
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscript: Option<bool>,
}

impl SpanFormat {
    /// Whether this span fully covers the char range `start..end`.
    pub fn covers(&self, start: usize, end: usize) -> bool {
        self.start <= start && self.end >= end
    }

    /// Whether any style field is set.
    pub fn has_style(&self) -> bool {
        self.font_family.is_some()
            || self.font_size.is_some()
            || self.color.is_some()
            || self.background_color.is_some()
            || self.highlight == Some(true)
            || self.underline == Some(true)
            || self.superscript == Some(true)
            || self.subscript == Some(true)
    }
}

/// Metadata of an image block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
#[serde(rename_all = "camelCase")]
pub struct ImageMeta {
    /// Source as written in the plain text (`@img:<token>` for stored payloads)
    #[serde(rename = "ref")]
    pub reference: String,
    /// Alternative text
    #[serde(default)]
    pub alt: String,
    /// Optional title
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Display width in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Display height in pixels
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Block alignment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alignment: Option<ImageAlignment>,
}

/// Partial metadata update for [`Sidecar::update_meta`].
#[derive(Debug, Clone, Default)]
pub struct MetaUpdate {
    /// Replace the creation timestamp
    pub created: Option<DateTime<Utc>>,
    /// Replace the word count
    pub word_count: Option<usize>,
    /// Replace the reading time
    pub reading_time: Option<u32>,
}

impl Default for Sidecar {
    fn default() -> Self {
        Self::new()
    }
}

impl Sidecar {
    /// Create an empty sidecar (version 1, both timestamps set to now).
    pub fn new() -> Self {
        Self {
            version: SIDECAR_VERSION,
            meta: SidecarMeta::default(),
            blocks: IndexMap::new(),
            spans: IndexMap::new(),
            images: IndexMap::new(),
            tables: IndexMap::new(),
        }
    }

    /// Merge a metadata update. `modified` is always refreshed.
    pub fn update_meta(&mut self, update: MetaUpdate) {
        if let Some(created) = update.created {
            self.meta.created = created;
        }
        if let Some(words) = update.word_count {
            self.meta.word_count = Some(words);
        }
        if let Some(minutes) = update.reading_time {
            self.meta.reading_time = Some(minutes);
        }
        self.meta.modified = Utc::now();
    }

    /// Whether no formatting is recorded at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
            && self.spans.is_empty()
            && self.images.is_empty()
            && self.tables.is_empty()
    }

    /// Every block id referenced by any section, in first-seen order.
    pub fn block_ids(&self) -> IndexSet<String> {
        self.blocks
            .keys()
            .chain(self.spans.keys())
            .chain(self.images.keys())
            .chain(self.tables.keys())
            .cloned()
            .collect()
    }

    /// Referenced block ids that are not in `live`.
    pub fn stale_block_ids(&self, live: &IndexSet<String>) -> Vec<String> {
        self.block_ids()
            .into_iter()
            .filter(|id| !live.contains(id))
            .collect()
    }

    /// Drop every entry whose block is not in `live`. Returns the number of ids removed.
    pub fn retain_blocks(&mut self, live: &IndexSet<String>) -> usize {
        let stale = self.stale_block_ids(live);
        self.blocks.retain(|id, _| live.contains(id));
        self.spans.retain(|id, _| live.contains(id));
        self.images.retain(|id, _| live.contains(id));
        self.tables.retain(|id, _| live.contains(id));
        stale.len()
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a sidecar record.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a sidecar, treating a missing or blank record as "no formatting recorded".
    ///
    /// Malformed JSON is still an error; callers decide whether to surface it.
    pub fn parse_or_empty(json: Option<&str>) -> Result<Self> {
        match json {
            Some(json) if !json.trim().is_empty() => Self::from_json(json),
            _ => Ok(Self::new()),
        }
    }
}

/// Count whitespace-separated words.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Reading time in whole minutes, rounded up.
///
/// A zero `words_per_minute` falls back to [`DEFAULT_WORDS_PER_MINUTE`].
pub fn reading_time(words: usize, words_per_minute: u32) -> u32 {
    let wpm = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    } as usize;
    words.div_ceil(wpm) as u32
}
