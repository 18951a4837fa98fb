use crate::parser::{ErrorRecord, TimeOfDay};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Inclusive clock range an analyst is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalystWindow {
    pub analyst_name: String,
    pub start: TimeOfDay,
    pub end: TimeOfDay,
}

impl AnalystWindow {
    pub fn new(analyst_name: &str, start: TimeOfDay, end: TimeOfDay) -> Self {
        Self { analyst_name: analyst_name.to_string(), start, end }
    }

    /// `[00:00:00, 99:59:59]`, used when a single analyst covers the whole paste.
    pub fn catch_all(analyst_name: &str) -> Self {
        Self::new(analyst_name, TimeOfDay::SENTINEL, TimeOfDay::UNBOUNDED)
    }

    pub fn contains(&self, t: TimeOfDay) -> bool {
        self.start <= t && t <= self.end
    }
}

/// Records grouped per analyst. Buckets follow the order analysts first
/// appear in the window list and exist even when empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attribution {
    pub buckets: Vec<(String, Vec<ErrorRecord>)>,
    pub unassigned: Vec<ErrorRecord>,
}

impl Attribution {
    pub fn get(&self, analyst: &str) -> Option<&[ErrorRecord]> {
        self.buckets
            .iter()
            .find(|(name, _)| name == analyst)
            .map(|(_, v)| v.as_slice())
    }

    pub fn total(&self) -> usize {
        self.buckets.iter().map(|(_, v)| v.len()).sum::<usize>() + self.unassigned.len()
    }

    fn bucket_mut(&mut self, analyst: &str) -> &mut Vec<ErrorRecord> {
        let idx = match self.buckets.iter().position(|(name, _)| name == analyst) {
            Some(i) => i,
            None => {
                self.buckets.push((analyst.to_string(), Vec::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[idx].1
    }
}

/// Assigns every record to exactly one analyst or to `unassigned`.
/// Overlapping windows resolve to the first matching window in input order.
pub fn attribute(records: Vec<ErrorRecord>, windows: &[AnalystWindow]) -> Attribution {
    let mut out = Attribution::default();
    for w in windows {
        out.bucket_mut(&w.analyst_name);
    }

    if let [only] = windows {
        out.bucket_mut(&only.analyst_name).extend(records);
        return out;
    }

    for rec in records {
        match windows.iter().find(|w| w.contains(rec.time)) {
            Some(w) => out.bucket_mut(&w.analyst_name).push(rec),
            None => {
                debug!(time = %rec.time, line_number = rec.line_number, "record outside every window");
                out.unassigned.push(rec);
            }
        }
    }

    if !out.unassigned.is_empty() {
        warn!(count = out.unassigned.len(), "records matched no analyst window");
    }
    out
}
