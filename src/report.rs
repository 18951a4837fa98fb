use crate::parser::ErrorRecord;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted QC report: one per submission and covering analyst.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub qc_analyst_name: String,
    #[serde(default)]
    pub analyst_name: String,
    #[serde(default)]
    pub match_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(default)]
    pub qc_date: String,
    #[serde(default)]
    pub errors: Vec<ErrorRecord>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("error index {index} out of range (report has {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("error line is blank")]
    BlankLine,
}

/// In-place change to a report's error list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorEdit {
    Add(String),
    Replace { index: usize, text: String },
    Remove(usize),
}

impl Report {
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Parsed `qc_date`, `None` when it is not a recognisable date.
    pub fn qc_day(&self) -> Option<NaiveDate> {
        parse_qc_date(&self.qc_date)
    }

    pub fn push_error(&mut self, record: ErrorRecord) {
        self.errors.push(record);
    }

    /// Swaps in a freshly parsed record; the previous entry is returned.
    pub fn replace_error(
        &mut self,
        index: usize,
        record: ErrorRecord,
    ) -> Result<ErrorRecord, EditError> {
        let len = self.errors.len();
        let slot = self.errors.get_mut(index).ok_or(EditError::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, record))
    }

    pub fn remove_error(&mut self, index: usize) -> Result<ErrorRecord, EditError> {
        if index >= self.errors.len() {
            return Err(EditError::IndexOutOfRange { index, len: self.errors.len() });
        }
        Ok(self.errors.remove(index))
    }

    pub fn notification(&self) -> Notification {
        let analyst = if self.analyst_name.is_empty() { "Analyst" } else { self.analyst_name.as_str() };
        let match_name = if self.match_name.is_empty() { "Unknown match" } else { self.match_name.as_str() };
        Notification {
            analyst_name: analyst.to_string(),
            subject: format!("Errors in match: {match_name}"),
            body: format!(
                "Hello {analyst},\n\nYou have {} error(s) in match: {match_name}.\n\nRegards,\nQC Team",
                self.errors.len()
            ),
        }
    }
}

/// Message for the notification sink. Recipient lookup happens there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub analyst_name: String,
    pub subject: String,
    pub body: String,
}

pub fn parse_qc_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}
