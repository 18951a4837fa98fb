use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use tracing::debug;

/// Clock time as written in a QC paste. Ordering is field-wise, which matches
/// lexicographic comparison of the zero-padded `HH:MM:SS` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeOfDay {
    hours: u8,
    minutes: u8,
    seconds: u8,
}

static RE_TIME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]{1,2}):([0-9]{1,2}):([0-9]{1,2})$").unwrap());

impl TimeOfDay {
    /// Substituted for a missing or malformed time token.
    pub const SENTINEL: TimeOfDay = TimeOfDay::new(0, 0, 0);
    /// Upper bound of the catch-all window. Not a real clock time.
    pub const UNBOUNDED: TimeOfDay = TimeOfDay::new(99, 59, 59);

    pub const fn new(hours: u8, minutes: u8, seconds: u8) -> Self {
        Self { hours, minutes, seconds }
    }

    /// Accepts `H:M:S` with one or two digits per field. Digit count is the
    /// only check: `25:61:00` is accepted as written.
    pub fn parse(token: &str) -> Option<Self> {
        let caps = RE_TIME_TOKEN.captures(token)?;
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u8>().ok());
        Some(Self::new(field(1)?, field(2)?, field(3)?))
    }

    pub fn hours(&self) -> u8 {
        self.hours
    }

    pub fn minutes(&self) -> u8 {
        self.minutes
    }

    pub fn seconds(&self) -> u8 {
        self.seconds
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}:{:02}", self.hours, self.minutes, self.seconds)
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Stored documents may carry whatever token the analyst pasted, or null.
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .and_then(|t| TimeOfDay::parse(t.trim()))
            .unwrap_or(TimeOfDay::SENTINEL))
    }
}

/// How the free-text descriptor is cut out of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DescriptorMode {
    /// Everything after the time token.
    #[default]
    Remainder,
    /// The first `leading_tokens` whitespace-delimited words after the time token.
    LeadingTokens,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    pub descriptor: DescriptorMode,
    pub leading_tokens: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self { descriptor: DescriptorMode::Remainder, leading_tokens: 3 }
    }
}

/// One pasted line turned into an error entry. Field names on the wire are
/// the document contract: `time`, `full` (verbatim line), `type`, `category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(default)]
    pub time: TimeOfDay,
    #[serde(rename = "full", default)]
    pub raw_line: String,
    #[serde(rename = "type", default)]
    pub descriptor: String,
    #[serde(default)]
    pub category: String,
    /// Position inside the paste, 1-based. Not persisted.
    #[serde(skip)]
    pub line_number: usize,
}

impl ErrorRecord {
    pub fn is_classified(&self) -> bool {
        !self.category.is_empty()
    }
}

pub fn parse_line(line: &str, line_number: usize) -> ErrorRecord {
    parse_line_with(line, line_number, &ParserOptions::default())
}

pub fn parse_line_with(line: &str, line_number: usize, opts: &ParserOptions) -> ErrorRecord {
    let trimmed = line.trim();
    let (first, rest) = match trimmed.find(char::is_whitespace) {
        Some(pos) => (&trimmed[..pos], trimmed[pos..].trim_start()),
        None => (trimmed, ""),
    };

    let (time, text) = match TimeOfDay::parse(first) {
        Some(t) => (t, rest),
        None => {
            debug!(line_number, token = first, "no time token, using sentinel");
            (TimeOfDay::SENTINEL, trimmed)
        }
    };

    ErrorRecord {
        time,
        raw_line: line.to_string(),
        descriptor: extract_descriptor(text, opts),
        category: String::new(),
        line_number,
    }
}

fn extract_descriptor(text: &str, opts: &ParserOptions) -> String {
    match opts.descriptor {
        DescriptorMode::Remainder => text.to_string(),
        DescriptorMode::LeadingTokens => text.split_whitespace().take(opts.leading_tokens).join(" "),
    }
}

/// Parses a whole paste. Blank lines are skipped; paste order is kept.
/// Lines are split on `\n` only, so a CRLF paste keeps its `\r` in `full`.
pub fn parse_log(text: &str, opts: &ParserOptions) -> Vec<ErrorRecord> {
    let mut out = Vec::new();
    for (idx, line) in text.split('\n').enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        out.push(parse_line_with(line, idx + 1, opts));
    }
    debug!(records = out.len(), "parsed paste");
    out
}
