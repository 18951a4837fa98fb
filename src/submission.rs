use crate::attribution::AnalystWindow;
use crate::parser::TimeOfDay;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Metadata shared by every report a submission produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeta {
    pub qc_analyst_name: String,
    pub match_name: String,
    pub game_name: String,
    pub qc_date: String,
}

/// Analyst covering part of the match. `start`/`end` are only read when
/// more than one analyst is listed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystEntry {
    pub name: String,
    #[serde(default)]
    pub start: String,
    #[serde(default)]
    pub end: String,
}

impl AnalystEntry {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Default::default() }
    }

    pub fn with_window(name: &str, start: &str, end: &str) -> Self {
        Self { name: name.to_string(), start: start.to_string(), end: end.to_string() }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    #[serde(flatten)]
    pub meta: SubmissionMeta,
    pub analysts: Vec<AnalystEntry>,
    pub error_logs: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AnalystField {
    Name,
    Start,
    End,
}

/// Form fields in the order they are presented, so the smallest key is the
/// one to focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    QcAnalystName,
    Analyst(usize, AnalystField),
    QcDate,
    MatchName,
    GameName,
    ErrorLogs,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::QcAnalystName => write!(f, "qcAnalystName"),
            Field::Analyst(i, AnalystField::Name) => write!(f, "analysts[{i}].name"),
            Field::Analyst(i, AnalystField::Start) => write!(f, "analysts[{i}].start"),
            Field::Analyst(i, AnalystField::End) => write!(f, "analysts[{i}].end"),
            Field::QcDate => write!(f, "qcDate"),
            Field::MatchName => write!(f, "matchName"),
            Field::GameName => write!(f, "gameName"),
            Field::ErrorLogs => write!(f, "errorLogs"),
        }
    }
}

pub const REQUIRED: &str = "Required";
pub const INVALID_TIME: &str = "Invalid time";
pub const WINDOW_REVERSED: &str = "End precedes start";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("submission rejected: {first} is missing or invalid ({} field(s) total)", .fields.len())]
pub struct ValidationError {
    pub first: Field,
    pub fields: BTreeMap<Field, &'static str>,
}

impl Submission {
    /// Checks every required field and builds the analyst windows.
    /// Nothing is assembled unless this succeeds.
    pub fn validate(&self) -> Result<Vec<AnalystWindow>, ValidationError> {
        let mut fields: BTreeMap<Field, &'static str> = BTreeMap::new();
        let blank = |s: &str| s.trim().is_empty();

        if blank(&self.meta.qc_analyst_name) {
            fields.insert(Field::QcAnalystName, REQUIRED);
        }
        if self.analysts.is_empty() {
            fields.insert(Field::Analyst(0, AnalystField::Name), REQUIRED);
        }

        let multi = self.analysts.len() > 1;
        let mut windows = Vec::with_capacity(self.analysts.len());
        for (i, a) in self.analysts.iter().enumerate() {
            if blank(&a.name) {
                fields.insert(Field::Analyst(i, AnalystField::Name), REQUIRED);
            }
            if !multi {
                windows.push(AnalystWindow::catch_all(a.name.trim()));
                continue;
            }
            let start = window_bound(&a.start, Field::Analyst(i, AnalystField::Start), &mut fields);
            let end = window_bound(&a.end, Field::Analyst(i, AnalystField::End), &mut fields);
            if let (Some(start), Some(end)) = (start, end) {
                if end < start {
                    fields.insert(Field::Analyst(i, AnalystField::End), WINDOW_REVERSED);
                }
                windows.push(AnalystWindow::new(a.name.trim(), start, end));
            }
        }

        if blank(&self.meta.qc_date) {
            fields.insert(Field::QcDate, REQUIRED);
        }
        if blank(&self.meta.match_name) {
            fields.insert(Field::MatchName, REQUIRED);
        }
        if blank(&self.meta.game_name) {
            fields.insert(Field::GameName, REQUIRED);
        }
        if blank(&self.error_logs) {
            fields.insert(Field::ErrorLogs, REQUIRED);
        }

        match fields.keys().next().copied() {
            Some(first) => Err(ValidationError { first, fields }),
            None => Ok(windows),
        }
    }
}

fn window_bound(
    raw: &str,
    field: Field,
    fields: &mut BTreeMap<Field, &'static str>,
) -> Option<TimeOfDay> {
    let raw = raw.trim();
    if raw.is_empty() {
        fields.insert(field, REQUIRED);
        return None;
    }
    let t = TimeOfDay::parse(raw);
    if t.is_none() {
        fields.insert(field, INVALID_TIME);
    }
    t
}
