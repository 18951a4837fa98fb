use crate::report::Report;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub matches: usize,
    pub errors: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "percent", rename_all = "kebab-case")]
pub enum Improvement {
    /// Fewer than two dates, or the first date has no errors to improve on.
    NotEnoughData,
    NoImprovement,
    /// Error drop from the first to the last date, percent with one decimal.
    Improved(f64),
}

impl fmt::Display for Improvement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Improvement::NotEnoughData => write!(f, "Not enough data"),
            Improvement::NoImprovement => write!(f, "No improvement"),
            Improvement::Improved(p) => write!(f, "{p:.1}% improvement"),
        }
    }
}

/// Per-date report and error counts, oldest first. Reports whose date does
/// not parse are left out.
pub fn trend_series<'a, I>(reports: I) -> Vec<TrendPoint>
where
    I: IntoIterator<Item = &'a Report>,
{
    let mut by_date: BTreeMap<NaiveDate, TrendPoint> = BTreeMap::new();
    for r in reports {
        let Some(date) = r.qc_day() else { continue };
        let p = by_date.entry(date).or_insert(TrendPoint { date, matches: 0, errors: 0 });
        p.matches += 1;
        p.errors += r.error_count();
    }
    by_date.into_values().collect()
}

pub fn improvement(series: &[TrendPoint]) -> Improvement {
    let (first, last) = match series {
        [first, .., last] => (first, last),
        _ => return Improvement::NotEnoughData,
    };
    if first.errors == 0 {
        return Improvement::NotEnoughData;
    }
    let drop = first.errors as f64 - last.errors as f64;
    let pct = ((drop / first.errors as f64) * 1000.0).round() / 10.0;
    if pct > 0.0 {
        Improvement::Improved(pct)
    } else {
        Improvement::NoImprovement
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystTrend {
    pub series: Vec<TrendPoint>,
    pub improvement: Improvement,
    pub summary: String,
}

impl AnalystTrend {
    pub fn from_reports<'a, I>(reports: I) -> Self
    where
        I: IntoIterator<Item = &'a Report>,
    {
        let series = trend_series(reports);
        let improvement = improvement(&series);
        Self { summary: improvement.to_string(), series, improvement }
    }
}
