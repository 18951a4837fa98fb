use crate::parser::ErrorRecord;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    pub keyword: String,
    pub label: String,
}

impl KeywordRule {
    pub fn new(keyword: &str, label: &str) -> Self {
        Self { keyword: keyword.to_string(), label: label.to_string() }
    }
}

/// Ordered keyword table. The first rule whose keyword occurs in the
/// descriptor (case-insensitive) decides the category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordTable {
    pub keywords: Vec<KeywordRule>,
    pub fallback: String,
}

impl Default for KeywordTable {
    fn default() -> Self {
        Self {
            keywords: vec![
                KeywordRule::new("goal", "Goal"),
                KeywordRule::new("substitution", "Substitution"),
                KeywordRule::new("free kick", "Free kick"),
                KeywordRule::new("penalty kick", "Penalty kick"),
                KeywordRule::new("throw in", "Throw In"),
                KeywordRule::new("start phase", "Start Phase"),
                KeywordRule::new("shot", "Shot"),
                KeywordRule::new("foul", "Foul"),
            ],
            fallback: "Other".to_string(),
        }
    }
}

static DEFAULT_TABLE: Lazy<KeywordTable> = Lazy::new(KeywordTable::default);

impl KeywordTable {
    pub fn classify(&self, descriptor: &str) -> &str {
        let text = descriptor.to_lowercase();
        self.keywords
            .iter()
            .filter(|rule| !rule.keyword.is_empty())
            .find(|rule| text.contains(&rule.keyword.to_lowercase()))
            .map(|rule| rule.label.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    pub fn classify_record(&self, record: &mut ErrorRecord) {
        record.category = self.classify(&record.descriptor).to_string();
    }

    pub fn classify_all(&self, records: &mut [ErrorRecord]) {
        for r in records.iter_mut() {
            self.classify_record(r);
        }
    }

    /// Stored category if present, otherwise classified on the fly.
    pub fn category_of<'a>(&'a self, record: &'a ErrorRecord) -> &'a str {
        if record.is_classified() {
            record.category.as_str()
        } else {
            self.classify(&record.descriptor)
        }
    }

    pub fn labels(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for rule in &self.keywords {
            if !out.contains(&rule.label.as_str()) {
                out.push(rule.label.as_str());
            }
        }
        if !out.contains(&self.fallback.as_str()) {
            out.push(self.fallback.as_str());
        }
        out
    }
}

/// Classifies against the built-in football table.
pub fn classify(descriptor: &str) -> String {
    DEFAULT_TABLE.classify(descriptor).to_string()
}
