use crate::classify::KeywordTable;
use crate::heatmap::{self, Intensity};
use crate::parser::TimeOfDay;
use crate::report::Report;
use crate::trend::AnalystTrend;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Selector value that disables the analyst or sport filter.
pub const ALL: &str = "All";
pub const UNKNOWN: &str = "Unknown";
/// Longest rolling window, about ten years of days.
pub const MAX_ROLLING_DAYS: u32 = 3660;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days` days ending on `today`, both ends included. `days` is
    /// clamped to `1..=MAX_ROLLING_DAYS`.
    pub fn last_days(today: NaiveDate, days: u32) -> Self {
        let back = i64::from(days.clamp(1, MAX_ROLLING_DAYS)) - 1;
        let start = today.checked_sub_signed(Duration::days(back)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    pub fn contains(&self, d: NaiveDate) -> bool {
        self.start <= d && d <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateQuery {
    pub selected_analyst: String,
    pub selected_sport: String,
    pub date_range: DateRange,
    /// Last day of the rolling analyst x date window.
    pub today: NaiveDate,
    pub rolling_days: u32,
    pub recent_activity: usize,
}

impl AggregateQuery {
    pub fn for_today(today: NaiveDate, rolling_days: u32) -> Self {
        let rolling_days = rolling_days.clamp(1, MAX_ROLLING_DAYS);
        Self {
            selected_analyst: ALL.to_string(),
            selected_sport: ALL.to_string(),
            date_range: DateRange::last_days(today, rolling_days),
            today,
            rolling_days,
            recent_activity: 5,
        }
    }

    pub fn analyst(mut self, name: &str) -> Self {
        self.selected_analyst = name.to_string();
        self
    }

    pub fn sport(mut self, name: &str) -> Self {
        self.selected_sport = name.to_string();
        self
    }

    pub fn range(mut self, range: DateRange) -> Self {
        self.date_range = range;
        self
    }

    fn selects(&self, r: &Report) -> bool {
        (self.selected_analyst == ALL || analyst_of(r) == self.selected_analyst)
            && (self.selected_sport == ALL || sport_of(r) == self.selected_sport)
    }

    /// Days of the rolling window that also fall inside `date_range`, oldest first.
    pub fn window_dates(&self) -> Vec<NaiveDate> {
        (0..i64::from(self.rolling_days.min(MAX_ROLLING_DAYS)))
            .rev()
            .filter_map(|back| self.today.checked_sub_signed(Duration::days(back)))
            .filter(|d| self.date_range.contains(*d))
            .collect()
    }
}

fn analyst_of(r: &Report) -> &str {
    if r.analyst_name.trim().is_empty() { UNKNOWN } else { r.analyst_name.as_str() }
}

fn sport_of(r: &Report) -> &str {
    if r.game_name.trim().is_empty() { UNKNOWN } else { r.game_name.as_str() }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeSlot {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 4] = [TimeSlot::Morning, TimeSlot::Afternoon, TimeSlot::Evening, TimeSlot::Night];

    /// [00,12) [12,17) [17,21) [21,..)
    pub fn of(t: TimeOfDay) -> Self {
        match t.hours() {
            0..=11 => TimeSlot::Morning,
            12..=16 => TimeSlot::Afternoon,
            17..=20 => TimeSlot::Evening,
            _ => TimeSlot::Night,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "Morning",
            TimeSlot::Afternoon => "Afternoon",
            TimeSlot::Evening => "Evening",
            TimeSlot::Night => "Night",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotCounts {
    pub morning: usize,
    pub afternoon: usize,
    pub evening: usize,
    pub night: usize,
}

impl SlotCounts {
    pub fn get(&self, slot: TimeSlot) -> usize {
        match slot {
            TimeSlot::Morning => self.morning,
            TimeSlot::Afternoon => self.afternoon,
            TimeSlot::Evening => self.evening,
            TimeSlot::Night => self.night,
        }
    }

    fn add(&mut self, slot: TimeSlot) {
        match slot {
            TimeSlot::Morning => self.morning += 1,
            TimeSlot::Afternoon => self.afternoon += 1,
            TimeSlot::Evening => self.evening += 1,
            TimeSlot::Night => self.night += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.morning + self.afternoon + self.evening + self.night
    }

    pub fn intensities(&self) -> [Intensity; 4] {
        TimeSlot::ALL.map(|s| heatmap::bucket(self.get(s)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub reports: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_reports: usize,
    pub total_analysts: usize,
    pub total_errors: usize,
    pub avg_errors_per_report: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub report_id: String,
    pub analyst_name: String,
    pub match_name: String,
    pub created_at: DateTime<Utc>,
    pub message: String,
}

/// Rows are analysts, columns are `dates`; each row has one cell per date.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalystDateMatrix {
    pub dates: Vec<NaiveDate>,
    pub rows: BTreeMap<String, Vec<usize>>,
}

impl AnalystDateMatrix {
    /// `MM/dd` column headers.
    pub fn labels(&self) -> Vec<String> {
        self.dates.iter().map(|d| d.format("%m/%d").to_string()).collect()
    }

    pub fn cell(&self, analyst: &str, date: NaiveDate) -> usize {
        let Some(col) = self.dates.iter().position(|d| *d == date) else { return 0 };
        self.rows.get(analyst).and_then(|r| r.get(col)).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationSnapshot {
    pub overview: Overview,
    pub analyst_totals: BTreeMap<String, Totals>,
    pub category_breakdown: BTreeMap<String, BTreeMap<String, usize>>,
    pub category_totals: BTreeMap<String, usize>,
    pub sport_totals: BTreeMap<String, Totals>,
    pub sport_slots: BTreeMap<String, SlotCounts>,
    pub analyst_dates: AnalystDateMatrix,
    pub trends: BTreeMap<String, AnalystTrend>,
    pub recent: Vec<RecentActivity>,
    /// Reports left out of date-keyed views because `qcDate` did not parse.
    pub undated_reports: usize,
}

/// Stateless: every call recomputes from the report set it is given.
#[derive(Debug, Clone, Default)]
pub struct AggregationEngine {
    classifier: KeywordTable,
}

impl AggregationEngine {
    pub fn new(classifier: KeywordTable) -> Self {
        Self { classifier }
    }

    pub fn aggregate(&self, reports: &[Report], query: &AggregateQuery) -> AggregationSnapshot {
        let mut snap = AggregationSnapshot::default();

        for r in reports {
            let analyst = analyst_of(r).to_string();
            let t = snap.analyst_totals.entry(analyst.clone()).or_default();
            t.reports += 1;
            t.errors += r.error_count();

            let s = snap.sport_totals.entry(sport_of(r).to_string()).or_default();
            s.reports += 1;
            s.errors += r.error_count();

            let breakdown = snap.category_breakdown.entry(analyst).or_default();
            for e in &r.errors {
                let cat = self.classifier.category_of(e);
                *breakdown.entry(cat.to_string()).or_insert(0) += 1;
                *snap.category_totals.entry(cat.to_string()).or_insert(0) += 1;
            }

            if r.qc_day().is_none() {
                snap.undated_reports += 1;
            }
        }

        snap.overview = overview(reports, snap.analyst_totals.len());
        snap.sport_slots = sport_slot_matrix(reports, query);
        snap.analyst_dates = analyst_date_matrix(reports, query);
        snap.trends = reports
            .iter()
            .into_group_map_by(|r| analyst_of(r).to_string())
            .into_iter()
            .map(|(analyst, rs)| (analyst, AnalystTrend::from_reports(rs)))
            .collect();
        snap.recent = recent_activity(reports, query.recent_activity);

        debug!(
            reports = reports.len(),
            analysts = snap.analyst_totals.len(),
            undated = snap.undated_reports,
            "aggregation recomputed"
        );
        snap
    }
}

pub fn aggregate(reports: &[Report], query: &AggregateQuery) -> AggregationSnapshot {
    AggregationEngine::default().aggregate(reports, query)
}

fn overview(reports: &[Report], total_analysts: usize) -> Overview {
    let total_reports = reports.len();
    let total_errors: usize = reports.iter().map(Report::error_count).sum();
    let avg = if total_reports == 0 {
        0.0
    } else {
        ((total_errors as f64 / total_reports as f64) * 10.0).round() / 10.0
    };
    Overview { total_reports, total_analysts, total_errors, avg_errors_per_report: avg }
}

/// Errors per sport and time-of-day slot of the error itself, for reports
/// passing the selectors and dated inside the query range.
pub fn sport_slot_matrix(
    reports: &[Report],
    query: &AggregateQuery,
) -> BTreeMap<String, SlotCounts> {
    let mut out: BTreeMap<String, SlotCounts> = BTreeMap::new();
    for r in reports.iter().filter(|r| query.selects(r)) {
        let Some(day) = r.qc_day() else { continue };
        if !query.date_range.contains(day) {
            continue;
        }
        let counts = out.entry(sport_of(r).to_string()).or_default();
        for e in &r.errors {
            counts.add(TimeSlot::of(e.time));
        }
    }
    out
}

/// Error counts per analyst and day over the rolling window.
pub fn analyst_date_matrix(reports: &[Report], query: &AggregateQuery) -> AnalystDateMatrix {
    let dates = query.window_dates();
    let mut rows: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for r in reports.iter().filter(|r| query.selects(r)) {
        let Some(day) = r.qc_day() else { continue };
        let Some(col) = dates.iter().position(|d| *d == day) else { continue };
        let row = rows.entry(analyst_of(r).to_string()).or_insert_with(|| vec![0; dates.len()]);
        row[col] += r.error_count();
    }
    AnalystDateMatrix { dates, rows }
}

pub fn recent_activity(reports: &[Report], limit: usize) -> Vec<RecentActivity> {
    reports
        .iter()
        .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
        .take(limit)
        .map(|r| RecentActivity {
            report_id: r.id.clone(),
            analyst_name: r.analyst_name.clone(),
            match_name: r.match_name.clone(),
            created_at: r.created_at,
            message: format!("{} submitted an error report for {}", r.qc_analyst_name, r.analyst_name),
        })
        .collect()
}

/// Reports of one analyst whose match name contains `match_term`
/// (case-insensitive), optionally pinned to one QC date.
pub fn find_reports<'a>(
    reports: &'a [Report],
    analyst: &str,
    match_term: &str,
    qc_date: Option<&str>,
) -> Vec<&'a Report> {
    let term = match_term.to_lowercase();
    reports
        .iter()
        .filter(|r| r.analyst_name == analyst)
        .filter(|r| r.match_name.to_lowercase().contains(&term))
        .filter(|r| qc_date.map(|d| r.qc_date == d).unwrap_or(true))
        .collect()
}
