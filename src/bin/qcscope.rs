use anyhow::{anyhow, bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use qcscope::aggregate::{AggregateQuery, AggregationEngine, DateRange};
use qcscope::assembler::{self, Pipeline, SubmitError};
use qcscope::config::Config;
use qcscope::export;
use qcscope::report::{parse_qc_date, ErrorEdit};
use qcscope::store::{JsonFileStore, ReportStore};
use qcscope::submission::{AnalystEntry, Submission, SubmissionMeta};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;
use tracing::{info, warn};

fn init_parallelism() {
    static START: Once = Once::new();
    START.call_once(|| {
        let n = num_cpus::get();
        let _ = rayon::ThreadPoolBuilder::new().num_threads(n).build_global();
    });
}

#[derive(Parser, Debug)]
#[command(name = "qcscope", version, about = "QC error log attribution and aggregation")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,

    /// Path to config TOML. If omitted, uses ./qcscope.toml if present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Report store (JSON array file).
    #[arg(long, global = true, default_value = "reports.json")]
    store: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show how a paste would be parsed and classified.
    Parse {
        /// Log file (`-` for stdin).
        #[arg(long, default_value = "-")]
        log: String,
    },
    /// Attribute a paste to analysts and store one report per analyst.
    Submit {
        #[arg(long, default_value = "-")]
        log: String,
        #[arg(long = "qc")]
        qc_analyst: String,
        #[arg(long = "match")]
        match_name: String,
        #[arg(long)]
        sport: String,
        #[arg(long)]
        date: String,
        /// `NAME` or, with several analysts, `NAME@HH:MM:SS-HH:MM:SS`. Repeatable.
        #[arg(long = "analyst", required = true)]
        analysts: Vec<String>,
    },
    /// Print the aggregation snapshot as JSON.
    Aggregate {
        #[command(flatten)]
        filter: Filter,
    },
    /// Print export rows as JSON.
    Export {
        /// errors | analyst | analyst-dates | sport-slots
        #[arg(long, default_value = "errors")]
        sheet: String,
        #[command(flatten)]
        filter: Filter,
    },
    /// Change one error of a stored report.
    Edit {
        #[arg(long)]
        id: String,
        #[arg(long, conflicts_with_all = ["replace", "remove"])]
        add: Option<String>,
        /// Index of the error to replace; requires --text.
        #[arg(long, requires = "text")]
        replace: Option<usize>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        remove: Option<usize>,
    },
    /// Delete a stored report.
    Delete {
        #[arg(long)]
        id: String,
    },
    /// Re-aggregate whenever the store file changes, until Ctrl-C.
    Watch {
        #[arg(long = "interval", default_value_t = 2)]
        interval_secs: u64,
        #[command(flatten)]
        filter: Filter,
    },
}

#[derive(clap::Args, Debug, Clone)]
struct Filter {
    #[arg(long, default_value = "All")]
    analyst: String,
    #[arg(long, default_value = "All")]
    sport: String,
    /// Range start (defaults to the start of the rolling window).
    #[arg(long)]
    start: Option<String>,
    #[arg(long)]
    end: Option<String>,
    /// Pretend today is this date.
    #[arg(long)]
    today: Option<String>,
}

fn main() -> Result<()> {
    init_parallelism();
    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;
    qcscope::logging::init(&cfg.logging, cli.log_level.as_deref())?;

    let pipeline = Pipeline::from_config(&cfg);
    match &cli.cmd {
        Command::Parse { log } => {
            let text = read_log(log)?;
            println!("{}", serde_json::to_string_pretty(&pipeline.extract(&text))?);
        }
        Command::Submit { log, qc_analyst, match_name, sport, date, analysts } => {
            let submission = Submission {
                meta: SubmissionMeta {
                    qc_analyst_name: qc_analyst.clone(),
                    match_name: match_name.clone(),
                    game_name: sport.clone(),
                    qc_date: date.clone(),
                },
                analysts: analysts.iter().map(|a| parse_analyst(a)).collect::<Result<Vec<_>>>()?,
                error_logs: read_log(log)?,
            };
            let store = JsonFileStore::open(&cli.store)?;
            match assembler::submit(&store, &pipeline, &submission) {
                Ok(reports) => {
                    let notifications: Vec<_> = reports.iter().map(|r| r.notification()).collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&serde_json::json!({
                            "reports": reports,
                            "notifications": notifications,
                        }))?
                    );
                }
                Err(SubmitError::Invalid(e)) => {
                    let fields: Vec<_> = e.fields.iter().map(|(f, msg)| serde_json::json!({"field": f.to_string(), "error": msg})).collect();
                    println!("{}", serde_json::json!({"focus": e.first.to_string(), "fields": fields}));
                    bail!(e);
                }
                Err(e) => {
                    if e.is_partial() {
                        warn!("submission partially stored");
                    }
                    return Err(e.into());
                }
            }
        }
        Command::Aggregate { filter } => {
            let store = JsonFileStore::open(&cli.store)?;
            let query = build_query(filter, &cfg)?;
            let engine = AggregationEngine::new(cfg.classifier.clone());
            let snap = engine.aggregate(&store.list()?, &query);
            println!("{}", serde_json::to_string_pretty(&snap)?);
        }
        Command::Export { sheet, filter } => {
            let store = JsonFileStore::open(&cli.store)?;
            let reports = store.list()?;
            let out = match sheet.as_str() {
                "errors" => serde_json::to_value(export::error_rows(&reports))?,
                "analyst" => {
                    if filter.analyst == "All" {
                        bail!("--sheet analyst needs --analyst NAME");
                    }
                    serde_json::to_value(export::analyst_rows(&reports, &filter.analyst))?
                }
                "analyst-dates" | "sport-slots" => {
                    let query = build_query(filter, &cfg)?;
                    let snap = AggregationEngine::new(cfg.classifier.clone()).aggregate(&reports, &query);
                    if sheet == "analyst-dates" {
                        serde_json::to_value(export::analyst_date_sheet(&snap.analyst_dates))?
                    } else {
                        serde_json::to_value(export::sport_slot_sheet(&snap.sport_slots))?
                    }
                }
                other => bail!("unknown sheet: {other}"),
            };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Edit { id, add, replace, text, remove } => {
            let edit = match (add, replace, text, remove) {
                (Some(line), None, _, None) => ErrorEdit::Add(line.clone()),
                (None, Some(index), Some(text), None) => ErrorEdit::Replace { index: *index, text: text.clone() },
                (None, None, _, Some(index)) => ErrorEdit::Remove(*index),
                _ => bail!("pass exactly one of --add, --replace/--text, --remove"),
            };
            let store = JsonFileStore::open(&cli.store)?;
            let mut report = store.get(id)?;
            pipeline.apply_edit(&mut report, &edit)?;
            store.update_errors(id, report.errors.clone())?;
            info!(id = %id, errors = report.error_count(), "report updated");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Delete { id } => {
            let store = JsonFileStore::open(&cli.store)?;
            store.delete(id)?;
            info!(id = %id, "report deleted");
        }
        Command::Watch { interval_secs, filter } => run_watch(&cli.store, *interval_secs, filter, &cfg)?,
    }
    Ok(())
}

fn run_watch(path: &Path, interval_secs: u64, filter: &Filter, cfg: &Config) -> Result<()> {
    let running = Arc::new(AtomicBool::new(true));
    {
        let r = running.clone();
        ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))
            .context("installing Ctrl-C handler")?;
    }
    // Validate the filter once up front; the feed rebuilds it per push.
    build_query(filter, cfg)?;

    let store = JsonFileStore::open(path)?;
    let filter = filter.clone();
    let cfg_for_feed = cfg.clone();
    let feed = qcscope::feed::AggregationFeed::spawn(
        store.subscribe(),
        AggregationEngine::new(cfg.classifier.clone()),
        move || build_query(&filter, &cfg_for_feed).unwrap_or_else(|_| {
            let today = Local::now().date_naive();
            AggregateQuery::for_today(today, cfg_for_feed.aggregation.rolling_days)
        }),
        |snap| match serde_json::to_string(&snap) {
            Ok(line) => println!("{line}"),
            Err(e) => warn!(error = %e, "snapshot not serializable"),
        },
    );

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_secs(interval_secs.max(1)));
        match store.reload() {
            Ok(true) => info!(path = %path.display(), "report set changed"),
            Ok(false) => {}
            Err(e) => warn!(error = %e, "store reload failed"),
        }
    }
    drop(store);
    let produced = feed.join()?;
    info!(snapshots = produced, "watch stopped");
    Ok(())
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    if let Some(p) = user {
        return Config::load(p);
    }
    let default = PathBuf::from("qcscope.toml");
    if default.exists() {
        Config::load(&default)
    } else {
        Ok(Config::default())
    }
}

fn read_log(src: &str) -> Result<String> {
    if src == "-" {
        let mut s = String::new();
        std::io::stdin().read_to_string(&mut s).context("reading log from stdin")?;
        Ok(s)
    } else {
        std::fs::read_to_string(src).with_context(|| format!("reading log: {src}"))
    }
}

fn parse_analyst(arg: &str) -> Result<AnalystEntry> {
    match arg.split_once('@') {
        None => Ok(AnalystEntry::new(arg)),
        Some((name, window)) => {
            let (start, end) = window
                .split_once('-')
                .ok_or_else(|| anyhow!("analyst window must be START-END: {arg}"))?;
            Ok(AnalystEntry::with_window(name, start, end))
        }
    }
}

fn parse_date_arg(raw: &Option<String>, what: &str) -> Result<Option<NaiveDate>> {
    match raw {
        None => Ok(None),
        Some(s) => parse_qc_date(s).map(Some).ok_or_else(|| anyhow!("invalid {what} date: {s}")),
    }
}

fn build_query(filter: &Filter, cfg: &Config) -> Result<AggregateQuery> {
    let today = parse_date_arg(&filter.today, "today")?.unwrap_or_else(|| Local::now().date_naive());
    let mut query = AggregateQuery::for_today(today, cfg.aggregation.rolling_days)
        .analyst(&filter.analyst)
        .sport(&filter.sport);
    query.recent_activity = cfg.aggregation.recent_activity;
    let start = parse_date_arg(&filter.start, "start")?.unwrap_or(query.date_range.start);
    let end = parse_date_arg(&filter.end, "end")?.unwrap_or(query.date_range.end);
    Ok(query.range(DateRange::new(start, end)))
}
