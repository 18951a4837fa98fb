use crate::aggregate::{AnalystDateMatrix, SlotCounts, TimeSlot, UNKNOWN};
use crate::report::Report;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const NO_ERRORS: &str = "No errors reported";

/// One flat row per stored error; the export sink writes these as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportRow {
    pub analyst: String,
    #[serde(rename = "Match")]
    pub match_name: String,
    pub sport: String,
    pub date: String,
    pub time: String,
    pub category: String,
    pub error_detail: String,
}

/// Detailed rows for every report, ordered by QC date then error time.
/// A report without errors still yields one row.
pub fn error_rows(reports: &[Report]) -> Vec<ExportRow> {
    let mut keyed = Vec::new();
    for r in reports {
        let analyst = if r.analyst_name.is_empty() { UNKNOWN.to_string() } else { r.analyst_name.clone() };
        let base = |time: String, category: String, detail: String| ExportRow {
            analyst: analyst.clone(),
            match_name: r.match_name.clone(),
            sport: r.game_name.clone(),
            date: r.qc_date.clone(),
            time,
            category,
            error_detail: detail,
        };
        let day = r.qc_day();
        if r.errors.is_empty() {
            keyed.push(((day, None), base("None".to_string(), String::new(), NO_ERRORS.to_string())));
            continue;
        }
        for e in &r.errors {
            let row = base(e.time.to_string(), e.category.clone(), e.raw_line.clone());
            keyed.push(((day, Some(e.time)), row));
        }
    }
    // Undated reports sort first, like an invalid date would.
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, row)| row).collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnalystSummaryRow {
    #[serde(rename = "Match")]
    pub match_name: String,
    pub sport: String,
    pub date: String,
    pub error_count: usize,
    pub errors: String,
}

/// One row per report of `analyst`, error lines joined by newlines.
pub fn analyst_rows(reports: &[Report], analyst: &str) -> Vec<AnalystSummaryRow> {
    reports
        .iter()
        .filter(|r| r.analyst_name == analyst)
        .map(|r| AnalystSummaryRow {
            match_name: r.match_name.clone(),
            sport: r.game_name.clone(),
            date: r.qc_date.clone(),
            error_count: r.error_count(),
            errors: r.errors.iter().map(|e| e.raw_line.as_str()).collect::<Vec<_>>().join("\n"),
        })
        .collect()
}

/// Header row plus one row per analyst, missing cells as 0.
pub fn analyst_date_sheet(matrix: &AnalystDateMatrix) -> Vec<Vec<String>> {
    let mut header = vec!["Analyst".to_string()];
    header.extend(matrix.labels());
    let mut out = vec![header];
    for (analyst, cells) in &matrix.rows {
        let mut row = vec![analyst.clone()];
        row.extend(cells.iter().map(|c| c.to_string()));
        out.push(row);
    }
    out
}

pub fn sport_slot_sheet(matrix: &BTreeMap<String, SlotCounts>) -> Vec<Vec<String>> {
    let mut header = vec!["Sport".to_string()];
    header.extend(TimeSlot::ALL.iter().map(|s| s.label().to_string()));
    let mut out = vec![header];
    for (sport, counts) in matrix {
        let mut row = vec![sport.clone()];
        row.extend(TimeSlot::ALL.iter().map(|s| counts.get(*s).to_string()));
        out.push(row);
    }
    out
}
