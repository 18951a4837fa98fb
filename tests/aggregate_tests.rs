use chrono::{NaiveDate, TimeZone, Utc};
use qcscope::aggregate::{self, AggregateQuery, AggregationEngine, DateRange, SlotCounts, TimeSlot};
use qcscope::assembler::Pipeline;
use qcscope::heatmap::Intensity;
use qcscope::parser::TimeOfDay;
use qcscope::report::Report;
use qcscope::trend::Improvement;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn report(id: &str, analyst: &str, sport: &str, date: &str, lines: &[&str], created_hour: u32) -> Report {
    let p = Pipeline::default();
    Report {
        id: id.into(),
        qc_analyst_name: "Quinn".into(),
        analyst_name: analyst.into(),
        match_name: format!("match {id}"),
        game_name: sport.into(),
        qc_date: date.into(),
        errors: lines.iter().enumerate().map(|(i, l)| p.record(l, i + 1)).collect(),
        created_at: Utc.with_ymd_and_hms(2024, 3, 14, created_hour, 0, 0).unwrap(),
    }
}

fn sample() -> Vec<Report> {
    vec![
        report("r1", "Alice", "Soccer", "2024-03-10", &["09:15:00 Goal Disallowed Offside", "14:30:00 Substitution Made Early"], 1),
        report("r2", "Alice", "Soccer", "2024-03-12", &["18:00:00 Foul not logged"], 2),
        report("r3", "Bob", "Basketball", "2024-03-12", &["21:30:00 Shot clock", "22:00:00 Shot missed", "no time Goal"], 3),
        report("r4", "Bob", "Soccer", "garbage", &["10:00:00 Throw in wrong side"], 4),
        report("r5", "Cara", "Soccer", "2024-02-01", &[], 5),
    ]
}

fn query() -> AggregateQuery {
    AggregateQuery::for_today(day(2024, 3, 14), 14)
}

#[test]
fn totals_cover_every_report_including_undated() {
    let reports = sample();
    let snap = aggregate::aggregate(&reports, &query());
    let sum: usize = snap.analyst_totals.values().map(|t| t.errors).sum();
    let all: usize = reports.iter().map(|r| r.errors.len()).sum();
    assert_eq!(sum, all);
    assert_eq!(snap.analyst_totals["Alice"].reports, 2);
    assert_eq!(snap.analyst_totals["Alice"].errors, 3);
    assert_eq!(snap.analyst_totals["Bob"].reports, 2);
    assert_eq!(snap.analyst_totals["Bob"].errors, 4);
    assert_eq!(snap.analyst_totals["Cara"].errors, 0);
    assert_eq!(snap.undated_reports, 1);
}

#[test]
fn overview_counts() {
    let snap = aggregate::aggregate(&sample(), &query());
    assert_eq!(snap.overview.total_reports, 5);
    assert_eq!(snap.overview.total_analysts, 3);
    assert_eq!(snap.overview.total_errors, 7);
    assert_eq!(snap.overview.avg_errors_per_report, 1.4);
    assert_eq!(snap.sport_totals["Soccer"].reports, 4);
    assert_eq!(snap.sport_totals["Basketball"].errors, 3);
}

#[test]
fn category_breakdown_per_analyst() {
    let snap = aggregate::aggregate(&sample(), &query());
    let alice = &snap.category_breakdown["Alice"];
    assert_eq!(alice["Goal"], 1);
    assert_eq!(alice["Substitution"], 1);
    assert_eq!(alice["Foul"], 1);
    let bob = &snap.category_breakdown["Bob"];
    assert_eq!(bob["Shot"], 2);
    assert_eq!(bob["Goal"], 1);
    assert_eq!(bob["Throw In"], 1);
    assert_eq!(snap.category_totals.values().sum::<usize>(), 7);
}

#[test]
fn unclassified_stored_errors_are_classified_on_the_fly() {
    let mut r = report("x", "Dan", "Soccer", "2024-03-13", &["10:00:00 Goal line"], 1);
    r.errors[0].category.clear();
    let snap = AggregationEngine::default().aggregate(&[r], &query());
    assert_eq!(snap.category_breakdown["Dan"]["Goal"], 1);
}

#[test]
fn sport_slot_matrix_uses_error_time() {
    let snap = aggregate::aggregate(&sample(), &query());
    // r4 is undated and r5 is outside the 14 day range
    assert_eq!(
        snap.sport_slots["Soccer"],
        SlotCounts { morning: 1, afternoon: 1, evening: 1, night: 0 }
    );
    // the sentinel 00:00:00 lands in Morning
    assert_eq!(
        snap.sport_slots["Basketball"],
        SlotCounts { morning: 1, afternoon: 0, evening: 0, night: 2 }
    );
}

#[test]
fn sport_slot_matrix_honours_selectors() {
    let q = query().analyst("Alice").range(DateRange::new(day(2024, 3, 11), day(2024, 3, 14)));
    let m = aggregate::sport_slot_matrix(&sample(), &q);
    assert_eq!(m.len(), 1);
    assert_eq!(m["Soccer"].total(), 1);
    assert_eq!(m["Soccer"].evening, 1);

    let q = query().sport("Basketball");
    let m = aggregate::sport_slot_matrix(&sample(), &q);
    assert_eq!(m.keys().collect::<Vec<_>>(), vec!["Basketball"]);
}

#[test]
fn slot_boundaries() {
    assert_eq!(TimeSlot::of(TimeOfDay::new(11, 59, 59)), TimeSlot::Morning);
    assert_eq!(TimeSlot::of(TimeOfDay::new(12, 0, 0)), TimeSlot::Afternoon);
    assert_eq!(TimeSlot::of(TimeOfDay::new(16, 59, 59)), TimeSlot::Afternoon);
    assert_eq!(TimeSlot::of(TimeOfDay::new(17, 0, 0)), TimeSlot::Evening);
    assert_eq!(TimeSlot::of(TimeOfDay::new(21, 0, 0)), TimeSlot::Night);
    assert_eq!(TimeSlot::of(TimeOfDay::new(23, 59, 59)), TimeSlot::Night);
}

#[test]
fn analyst_date_matrix_covers_rolling_window() {
    let snap = aggregate::aggregate(&sample(), &query());
    let m = &snap.analyst_dates;
    assert_eq!(m.dates.len(), 14);
    assert_eq!(m.dates.first(), Some(&day(2024, 3, 1)));
    assert_eq!(m.dates.last(), Some(&day(2024, 3, 14)));
    assert_eq!(m.labels()[0], "03/01");
    assert_eq!(m.cell("Alice", day(2024, 3, 10)), 2);
    assert_eq!(m.cell("Alice", day(2024, 3, 12)), 1);
    assert_eq!(m.cell("Bob", day(2024, 3, 12)), 3);
    // Cara's only report is out of the window, Bob's undated one is dropped
    assert!(!m.rows.contains_key("Cara"));
    assert_eq!(m.rows["Bob"].iter().sum::<usize>(), 3);
}

#[test]
fn analyst_date_matrix_is_clipped_by_range() {
    let q = query().range(DateRange::new(day(2024, 3, 11), day(2024, 3, 20)));
    let m = aggregate::analyst_date_matrix(&sample(), &q);
    assert_eq!(m.dates.len(), 4);
    assert_eq!(m.dates[0], day(2024, 3, 11));
    assert!(!m.rows.contains_key("Alice") || m.rows["Alice"].iter().sum::<usize>() == 1);
    assert_eq!(m.cell("Alice", day(2024, 3, 10)), 0);
}

#[test]
fn trends_per_analyst() {
    let snap = aggregate::aggregate(&sample(), &query());
    let alice = &snap.trends["Alice"];
    assert_eq!(alice.series.len(), 2);
    assert_eq!(alice.improvement, Improvement::Improved(50.0));
    assert_eq!(snap.trends["Bob"].improvement, Improvement::NotEnoughData);
    assert_eq!(snap.trends["Cara"].summary, "Not enough data");
}

#[test]
fn recent_activity_newest_first() {
    let mut q = query();
    q.recent_activity = 2;
    let snap = aggregate::aggregate(&sample(), &q);
    assert_eq!(snap.recent.len(), 2);
    assert_eq!(snap.recent[0].report_id, "r5");
    assert_eq!(snap.recent[1].report_id, "r4");
    assert_eq!(snap.recent[0].message, "Quinn submitted an error report for Cara");
}

#[test]
fn heatmap_intensities_for_slots() {
    let counts = SlotCounts { morning: 0, afternoon: 5, evening: 6, night: 21 };
    assert_eq!(counts.intensities(), [Intensity::None, Intensity::Low, Intensity::Medium, Intensity::Critical]);
}

#[test]
fn recomputation_is_a_pure_function_of_the_set() {
    let reports = sample();
    let engine = AggregationEngine::default();
    let a = engine.aggregate(&reports, &query());
    let b = engine.aggregate(&reports, &query());
    assert_eq!(a, b);
    let fewer = engine.aggregate(&reports[..2], &query());
    assert_eq!(fewer.overview.total_reports, 2);
    assert!(!fewer.analyst_totals.contains_key("Bob"));
}

#[test]
fn empty_set() {
    let snap = aggregate::aggregate(&[], &query());
    assert_eq!(snap.overview.total_reports, 0);
    assert_eq!(snap.overview.avg_errors_per_report, 0.0);
    assert!(snap.analyst_dates.rows.is_empty());
    assert_eq!(snap.analyst_dates.dates.len(), 14);
}

#[test]
fn find_reports_by_match_and_date() {
    let reports = sample();
    let hits = aggregate::find_reports(&reports, "Alice", "MATCH R", None);
    assert_eq!(hits.len(), 2);
    let hits = aggregate::find_reports(&reports, "Alice", "", Some("2024-03-12"));
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "r2");
}

#[test]
fn oversized_rolling_window_is_clamped() {
    let q = AggregateQuery::for_today(day(2024, 3, 14), u32::MAX);
    assert_eq!(q.rolling_days, aggregate::MAX_ROLLING_DAYS);
    assert_eq!(q.window_dates().len(), aggregate::MAX_ROLLING_DAYS as usize);
    assert_eq!(q.window_dates().last(), Some(&day(2024, 3, 14)));

    let snap = AggregationEngine::default().aggregate(&sample(), &q);
    assert_eq!(snap.analyst_dates.dates.len(), aggregate::MAX_ROLLING_DAYS as usize);

    let near_min = DateRange::last_days(NaiveDate::MIN, 30);
    assert_eq!(near_min.start, NaiveDate::MIN);
}
