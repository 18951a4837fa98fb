use crate::attribution::{self, Attribution};
use crate::classify::KeywordTable;
use crate::config::Config;
use crate::parser::{self, ErrorRecord, ParserOptions};
use crate::report::{EditError, ErrorEdit, Report};
use crate::store::{ReportStore, StoreError};
use crate::submission::{Submission, SubmissionMeta, ValidationError};
use chrono::{DateTime, Utc};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("{} of {} report writes failed (analysts: {})", .failed.len(), .failed.len() + .written.len(), failed_names(.failed))]
    WriteFailed {
        /// Analysts whose report was stored.
        written: Vec<String>,
        /// Analysts whose report was not stored, with the store's reason.
        failed: Vec<(String, StoreError)>,
    },
}

fn failed_names(failed: &[(String, StoreError)]) -> String {
    failed.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>().join(", ")
}

impl SubmitError {
    /// Some reports of the submission were stored and some were not.
    pub fn is_partial(&self) -> bool {
        matches!(self, SubmitError::WriteFailed { written, .. } if !written.is_empty())
    }
}

/// Parsing, classification and attribution settings for one deployment.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    pub parser: ParserOptions,
    pub classifier: KeywordTable,
    pub unassigned_label: String,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            parser: ParserOptions::default(),
            classifier: KeywordTable::default(),
            unassigned_label: "Unassigned".to_string(),
        }
    }
}

impl Pipeline {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            parser: cfg.parser.clone(),
            classifier: cfg.classifier.clone(),
            unassigned_label: cfg.attribution.unassigned_label.clone(),
        }
    }

    pub fn record(&self, line: &str, line_number: usize) -> ErrorRecord {
        let mut rec = parser::parse_line_with(line, line_number, &self.parser);
        self.classifier.classify_record(&mut rec);
        rec
    }

    /// Parsed and classified records of a paste, in paste order.
    pub fn extract(&self, text: &str) -> Vec<ErrorRecord> {
        let mut records = parser::parse_log(text, &self.parser);
        self.classifier.classify_all(&mut records);
        records
    }

    /// Validates, parses, classifies and attributes a submission into the
    /// reports it should produce. No store is touched.
    pub fn process(
        &self,
        submission: &Submission,
        created_at: DateTime<Utc>,
    ) -> Result<Vec<Report>, ValidationError> {
        let windows = submission.validate()?;
        let records = self.extract(&submission.error_logs);
        let attributed = attribution::attribute(records, &windows);
        Ok(assemble(&submission.meta, attributed, &self.unassigned_label, created_at))
    }

    pub fn apply_edit(&self, report: &mut Report, edit: &ErrorEdit) -> Result<(), EditError> {
        match edit {
            ErrorEdit::Add(line) => {
                if line.trim().is_empty() {
                    return Err(EditError::BlankLine);
                }
                let rec = self.record(line, report.errors.len() + 1);
                report.push_error(rec);
            }
            ErrorEdit::Replace { index, text } => {
                if text.trim().is_empty() {
                    return Err(EditError::BlankLine);
                }
                let rec = self.record(text, index + 1);
                report.replace_error(*index, rec)?;
            }
            ErrorEdit::Remove(index) => {
                report.remove_error(*index)?;
            }
        }
        Ok(())
    }
}

/// One report per analyst bucket, empty buckets included. Records no window
/// claimed are kept under `unassigned_label`.
pub fn assemble(
    meta: &SubmissionMeta,
    attribution: Attribution,
    unassigned_label: &str,
    created_at: DateTime<Utc>,
) -> Vec<Report> {
    let make = |analyst: &str, errors: Vec<ErrorRecord>| Report {
        id: uuid::Uuid::new_v4().to_string(),
        qc_analyst_name: meta.qc_analyst_name.trim().to_string(),
        analyst_name: analyst.to_string(),
        match_name: meta.match_name.trim().to_string(),
        game_name: meta.game_name.trim().to_string(),
        qc_date: meta.qc_date.trim().to_string(),
        errors,
        created_at,
    };

    let Attribution { buckets, unassigned } = attribution;
    let mut out: Vec<Report> = buckets.into_iter().map(|(analyst, errors)| make(&analyst, errors)).collect();
    if !unassigned.is_empty() {
        warn!(count = unassigned.len(), label = unassigned_label, "keeping unattributed records");
        out.push(make(unassigned_label, unassigned));
    }
    out
}

#[derive(Debug, Default)]
pub struct PersistOutcome {
    pub written: Vec<Report>,
    pub failed: Vec<(String, StoreError)>,
}

/// Issues every write concurrently and waits for all of them.
pub fn persist_reports(store: &dyn ReportStore, reports: Vec<Report>) -> PersistOutcome {
    let results: Vec<(Report, Result<String, StoreError>)> = reports
        .into_par_iter()
        .map(|r| {
            let res = store.create(r.clone());
            (r, res)
        })
        .collect();

    let mut outcome = PersistOutcome::default();
    for (report, res) in results {
        match res {
            Ok(_) => outcome.written.push(report),
            Err(e) => {
                warn!(analyst = %report.analyst_name, error = %e, "report write failed");
                outcome.failed.push((report.analyst_name, e));
            }
        }
    }
    outcome
}

/// Full submission path: validate, build reports, store them. Returns the
/// stored reports, or which analysts could not be stored.
pub fn submit(
    store: &dyn ReportStore,
    pipeline: &Pipeline,
    submission: &Submission,
) -> Result<Vec<Report>, SubmitError> {
    let created_at = Utc::now();
    let reports = pipeline.process(submission, created_at)?;
    let total = reports.len();
    let outcome = persist_reports(store, reports);
    if !outcome.failed.is_empty() {
        return Err(SubmitError::WriteFailed {
            written: outcome.written.into_iter().map(|r| r.analyst_name).collect(),
            failed: outcome.failed,
        });
    }
    info!(
        match_name = %submission.meta.match_name,
        reports = total,
        errors = outcome.written.iter().map(Report::error_count).sum::<usize>(),
        "submission stored"
    );
    Ok(outcome.written)
}
