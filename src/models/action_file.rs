//! Action file model: front matter plus markdown body.

use std::fmt::Write as _;
use std::path::PathBuf;

use chrono::NaiveDate;

/// Characters that are not allowed in generated file names.
const INVALID_FILENAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Delimiter line around the front matter block.
const FRONT_MATTER_DELIMITER: &str = "---";

/// Coarse classification of a dropped file by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Text and office documents.
    Document,
    /// Tabular data.
    Spreadsheet,
    /// Raster images.
    Image,
    /// Compressed archives.
    Archive,
    /// Anything else.
    Unknown,
}

impl FileType {
    /// Classify by extension (case-insensitive, without the dot).
    #[must_use]
    pub fn from_extension(ext: Option<&str>) -> Self {
        let Some(ext) = ext else {
            return Self::Unknown;
        };
        match ext.to_ascii_lowercase().as_str() {
            "pdf" | "doc" | "docx" | "txt" | "md" => Self::Document,
            "xls" | "xlsx" | "csv" => Self::Spreadsheet,
            "jpg" | "jpeg" | "png" | "gif" => Self::Image,
            "zip" | "rar" => Self::Archive,
            _ => Self::Unknown,
        }
    }

    /// Front matter value.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Spreadsheet => "spreadsheet",
            Self::Image => "image",
            Self::Archive => "archive",
            Self::Unknown => "unknown",
        }
    }
}

/// Ordered key/value metadata at the top of an action file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    fields: Vec<(String, String)>,
}

impl FrontMatter {
    /// Empty front matter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`set`](Self::set).
    #[must_use]
    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Set `key`, replacing an existing value in place.
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        if let Some(slot) = self.fields.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.fields.push((key.to_owned(), value));
        }
    }

    /// Value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parse the leading `---` block of a markdown document.
    ///
    /// Returns `None` when the document does not start with front matter
    /// or the block is never closed. Lines without a `:` are ignored.
    #[must_use]
    pub fn parse(document: &str) -> Option<Self> {
        let mut lines = document.lines();
        if lines.next()?.trim() != FRONT_MATTER_DELIMITER {
            return None;
        }
        let mut front = Self::new();
        for line in lines {
            if line.trim() == FRONT_MATTER_DELIMITER {
                return Some(front);
            }
            if let Some((key, value)) = line.split_once(':') {
                front.set(key.trim(), value.trim());
            }
        }
        None
    }

    fn render_into(&self, out: &mut String) {
        out.push_str(FRONT_MATTER_DELIMITER);
        out.push('\n');
        for (key, value) in &self.fields {
            let _ = writeln!(out, "{key}: {value}");
        }
        out.push_str(FRONT_MATTER_DELIMITER);
        out.push('\n');
    }
}

/// A materialized action file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFile {
    /// Location inside `Needs_Action`.
    pub path: PathBuf,
    /// Structured metadata.
    pub front_matter: FrontMatter,
    /// Free-form markdown after the front matter.
    pub body: String,
}

impl ActionFile {
    /// Full document text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 256);
        self.front_matter.render_into(&mut out);
        out.push('\n');
        out.push_str(&self.body);
        out
    }

    /// File name component of [`path`](Self::path).
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Replace characters that are invalid in file names and trim whitespace.
#[must_use]
pub fn sanitize_title(title: &str) -> String {
    let cleaned: String = title
        .chars()
        .map(|c| {
            if INVALID_FILENAME_CHARS.contains(&c) || c.is_control() {
                '_'
            } else {
                c
            }
        })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "untitled".to_owned()
    } else {
        trimmed.to_owned()
    }
}

/// File name for an action file: `{prefix}_{title}_{date}.md`.
///
/// `attempt` 1 yields the plain name; higher attempts add `_{attempt}` so
/// a second same-day item with the same title never overwrites the first.
#[must_use]
pub fn action_file_name(prefix: &str, title: &str, date: NaiveDate, attempt: u32) -> String {
    let safe = sanitize_title(title);
    let date = date.format("%Y-%m-%d");
    if attempt <= 1 {
        format!("{prefix}_{safe}_{date}.md")
    } else {
        format!("{prefix}_{safe}_{date}_{attempt}.md")
    }
}

/// Human-readable size with one decimal, base 1024 (`"3.0 B"`, `"1.5 KB"`).
#[must_use]
#[allow(clippy::cast_precision_loss)] // Display only.
pub fn format_size(bytes: u64) -> String {
    let mut size = bytes as f64;
    for unit in ["B", "KB", "MB", "GB"] {
        if size < 1024.0 {
            return format!("{size:.1} {unit}");
        }
        size /= 1024.0;
    }
    format!("{size:.1} TB")
}
