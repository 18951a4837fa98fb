use chrono::{NaiveDate, Utc};
use qcscope::aggregate::{self, AggregateQuery};
use qcscope::assembler::Pipeline;
use qcscope::export;
use qcscope::report::Report;

fn report(analyst: &str, date: &str, lines: &[&str]) -> Report {
    let p = Pipeline::default();
    Report {
        id: format!("{analyst}-{date}"),
        qc_analyst_name: "Quinn".into(),
        analyst_name: analyst.into(),
        match_name: "Team A vs Team B".into(),
        game_name: "Soccer".into(),
        qc_date: date.into(),
        errors: lines.iter().enumerate().map(|(i, l)| p.record(l, i + 1)).collect(),
        created_at: Utc::now(),
    }
}

#[test]
fn error_rows_are_sorted_by_date_then_time() {
    let reports = vec![
        report("B", "2024-03-12", &["14:30:00 Substitution Made Early", "08:00:00 Goal"]),
        report("A", "2024-03-10", &["23:00:00 Foul"]),
    ];
    let rows = export::error_rows(&reports);
    let order: Vec<(&str, &str)> = rows.iter().map(|r| (r.date.as_str(), r.time.as_str())).collect();
    assert_eq!(order, vec![("2024-03-10", "23:00:00"), ("2024-03-12", "08:00:00"), ("2024-03-12", "14:30:00")]);
    assert_eq!(rows[2].error_detail, "14:30:00 Substitution Made Early");
    assert_eq!(rows[2].category, "Substitution");
    assert_eq!(rows[2].analyst, "B");
}

#[test]
fn report_without_errors_yields_placeholder_row() {
    let rows = export::error_rows(&[report("A", "2024-03-10", &[])]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].time, "None");
    assert_eq!(rows[0].error_detail, export::NO_ERRORS);
}

#[test]
fn error_rows_use_sheet_column_names() {
    let rows = export::error_rows(&[report("A", "2024-03-10", &["09:15:00 Goal Disallowed Offside"])]);
    let v = serde_json::to_value(&rows[0]).unwrap();
    for key in ["Analyst", "Match", "Sport", "Date", "Time", "ErrorDetail"] {
        assert!(v.get(key).is_some(), "missing {key}");
    }
    assert_eq!(v["Sport"], "Soccer");
}

#[test]
fn analyst_summary_rows() {
    let reports = vec![
        report("A", "2024-03-10", &["09:00:00 Goal", "10:00:00 Shot"]),
        report("B", "2024-03-10", &["11:00:00 Foul"]),
    ];
    let rows = export::analyst_rows(&reports, "A");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].error_count, 2);
    assert_eq!(rows[0].errors, "09:00:00 Goal\n10:00:00 Shot");
}

#[test]
fn heatmap_sheets() {
    let reports = vec![report("A", "2024-03-13", &["09:00:00 Goal", "22:00:00 Shot"])];
    let q = AggregateQuery::for_today(NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(), 3);
    let snap = aggregate::aggregate(&reports, &q);

    let sheet = export::analyst_date_sheet(&snap.analyst_dates);
    assert_eq!(sheet[0], vec!["Analyst", "03/12", "03/13", "03/14"]);
    assert_eq!(sheet[1], vec!["A", "0", "2", "0"]);

    let sheet = export::sport_slot_sheet(&snap.sport_slots);
    assert_eq!(sheet[0], vec!["Sport", "Morning", "Afternoon", "Evening", "Night"]);
    assert_eq!(sheet[1], vec!["Soccer", "1", "0", "0", "1"]);
}
