//! Channel message rendering
//!
//! Dataset text is escaped for the parse mode the message is sent with; a
//! stray `_` or `*` in a verse would otherwise make Telegram reject the post
//! on every run.

use crate::dataset::VerseRecord;

const TITLE: &str = "Verse of the Hour";
const DIVIDER: &str = "─────────────────";
const CLOSING: &str = "✨ May this verse bring peace and guidance to your heart ✨";
const HASHTAGS: &str = "#Quran #Verse #Islam #Guidance";

/// Markup dialect of the outgoing message, matching Telegram's `parse_mode`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Markup {
    Plain,
    /// Legacy `Markdown`
    #[default]
    Markdown,
    MarkdownV2,
    Html,
}

impl Markup {
    /// Map a configured `parse_mode` to its markup. Empty and `none` mean plain text.
    pub fn from_parse_mode(parse_mode: &str) -> Option<Self> {
        match parse_mode.trim().to_ascii_lowercase().as_str() {
            "" | "none" => Some(Markup::Plain),
            "markdown" => Some(Markup::Markdown),
            "markdownv2" => Some(Markup::MarkdownV2),
            "html" => Some(Markup::Html),
            _ => None,
        }
    }

    /// Escape literal text so none of it is read as markup
    pub fn escape(&self, text: &str) -> String {
        match self {
            Markup::Plain => text.to_string(),
            Markup::Markdown => escape_with(text, |c| matches!(c, '_' | '*' | '`' | '['), "\\"),
            Markup::MarkdownV2 => escape_with(
                text,
                |c| {
                    matches!(
                        c,
                        '_' | '*' | '[' | ']' | '(' | ')' | '~' | '`' | '>' | '#' | '+' | '-'
                            | '=' | '|' | '{' | '}' | '.' | '!' | '\\'
                    )
                },
                "\\",
            ),
            Markup::Html => {
                let mut out = String::with_capacity(text.len());
                for c in text.chars() {
                    match c {
                        '&' => out.push_str("&amp;"),
                        '<' => out.push_str("&lt;"),
                        '>' => out.push_str("&gt;"),
                        _ => out.push(c),
                    }
                }
                out
            }
        }
    }

    /// Escape `text` and render it bold
    pub fn bold(&self, text: &str) -> String {
        match self {
            Markup::Plain => text.to_string(),
            // Legacy Markdown cannot escape inside an entity, so text carrying
            // markup characters is escaped and left unbolded
            Markup::Markdown if self.escape(text) != text => self.escape(text),
            Markup::Markdown => format!("*{text}*"),
            Markup::MarkdownV2 => format!("*{}*", self.escape(text)),
            Markup::Html => format!("<b>{}</b>", self.escape(text)),
        }
    }
}

fn escape_with(text: &str, special: impl Fn(char) -> bool, prefix: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if special(c) {
            out.push_str(prefix);
        }
        out.push(c);
    }
    out
}

/// Render the post for `record`, with progress through a dataset of `total` verses.
pub fn render_verse(record: &VerseRecord, total: usize, markup: Markup) -> String {
    let position = record.index + 1;
    let reference = markup.escape(&format!("({})", record.reference));
    let heading = match &record.surah_name {
        Some(name) => format!("📖 {} {reference}", markup.bold(name)),
        None => format!("📖 {reference}"),
    };

    let mut sections = vec![
        format!("🕌 {} 🕌", markup.bold(TITLE)),
        heading,
        format!("🔸 {}\n{}", markup.bold("Arabic:"), markup.escape(&record.text)),
    ];
    if let Some(translation) = &record.translation {
        sections.push(format!(
            "🔸 {}\n{}",
            markup.bold("English:"),
            markup.escape(translation)
        ));
    }
    sections.push(markup.escape(&format!("{DIVIDER}\n{CLOSING}")));
    sections.push(markup.escape(&format!(
        "📊 Progress: {position}/{total} ({:.1}%)",
        progress_percent(position, total)
    )));
    sections.push(markup.escape(HASHTAGS));

    sections.join("\n\n")
}

fn progress_percent(position: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    position as f64 / total as f64 * 100.0
}
