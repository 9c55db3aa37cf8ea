use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde_json::Value;
use services::sessions::input::{Key, StudyCommand, exam_command, study_command};
use services::{AppServices, Clock, ExamRun, ExamState, SequenceOrder, StudyMode, StudySession};
use study_core::filter::{FilterCriteria, Selection, available_topics};
use study_core::import::{RawRow, import_rows};
use study_core::model::{Confidence, ExamConfig, QuestionSet, SetId};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEMO_SET_ID: &str = "demo";
const DEMO_ROWS: &str = include_str!("../data/demo.json");

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingSet,
    MissingFile,
    UnknownArg(String),
    InvalidNumber { flag: &'static str, raw: String },
    InvalidConfidence { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingSet => write!(f, "no question set given (use --set or STUDY_SET_ID)"),
            ArgsError::MissingFile => write!(f, "import requires a JSON file"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidNumber { flag, raw } => write!(f, "invalid {flag} value: {raw}"),
            ArgsError::InvalidConfidence { flag, raw } => {
                write!(f, "{flag} must be a confidence from 1 to 5, got {raw}")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn require_number<T: std::str::FromStr>(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<T, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse()
        .map_err(|_| ArgsError::InvalidNumber { flag, raw: value })
}

fn require_confidence(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<Confidence, ArgsError> {
    let value = require_value(args, flag)?;
    value
        .parse::<u8>()
        .ok()
        .and_then(|level| Confidence::new(level).ok())
        .ok_or(ArgsError::InvalidConfidence { flag, raw: value })
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- sets");
    eprintln!("  cargo run -p app -- import <rows.json> --id <set> [--name <name>]");
    eprintln!("  cargo run -p app -- study  [--set <id>] [--review] [--shuffle]");
    eprintln!("                             [--section <name>]... [--topic <name>]...");
    eprintln!("                             [--min <1-5>] [--max <1-5>] [--no-unrated]");
    eprintln!("                             [--max-views <n>] [--marked]");
    eprintln!("  cargo run -p app -- exam   [--set <id>] [--count <n>] [--minutes <m>] [--no-timer]");
    eprintln!("  cargo run -p app -- stats  [--set <id>]");
    eprintln!("  cargo run -p app -- export [--set <id>] [--out <dir>]");
    eprintln!("  cargo run -p app -- reset  --set <id>");
    eprintln!("  cargo run -p app -- delete --set <id>");
    eprintln!();
    eprintln!("Every command accepts --db <sqlite_url> (default sqlite://study.sqlite3).");
    eprintln!();
    eprintln!(
        "Keys during study: Enter reveals or moves on, < goes back, 1-5 rates, b bookmarks, q quits."
    );
    eprintln!("Keys during exam: Enter reveals, 1-5 answers, s skips, p pauses, q finishes.");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  STUDY_DB_URL, STUDY_SET_ID, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Sets,
    Import,
    Study,
    Exam,
    Stats,
    Export,
    Reset,
    Delete,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "sets" => Some(Self::Sets),
            "import" => Some(Self::Import),
            "study" => Some(Self::Study),
            "exam" => Some(Self::Exam),
            "stats" => Some(Self::Stats),
            "export" => Some(Self::Export),
            "reset" => Some(Self::Reset),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq)]
struct Args {
    db_url: String,
    set_id: Option<SetId>,
    file: Option<PathBuf>,
    name: Option<String>,
    out_dir: PathBuf,
    review: bool,
    shuffle: bool,
    count: Option<usize>,
    minutes: Option<u32>,
    timer: bool,
    sections: Vec<String>,
    topics: Vec<String>,
    min_confidence: Option<Confidence>,
    max_confidence: Option<Confidence>,
    include_unrated: bool,
    max_views: Option<u32>,
    only_marked: bool,
}

impl Args {
    fn defaults() -> Self {
        Self {
            db_url: std::env::var("STUDY_DB_URL")
                .ok()
                .map_or_else(|| "sqlite://study.sqlite3".into(), normalize_sqlite_url),
            set_id: std::env::var("STUDY_SET_ID")
                .ok()
                .map(SetId::new)
                .filter(|id| !id.is_blank()),
            file: None,
            name: None,
            out_dir: PathBuf::from("."),
            review: false,
            shuffle: false,
            count: None,
            minutes: None,
            timer: true,
            sections: Vec::new(),
            topics: Vec::new(),
            min_confidence: None,
            max_confidence: None,
            include_unrated: true,
            max_views: None,
            only_marked: false,
        }
    }

    fn parse(args: &mut impl Iterator<Item = String>) -> Result<Self, ArgsError> {
        let mut parsed = Self::defaults();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    parsed.db_url = normalize_sqlite_url(value);
                }
                "--set" | "--id" => parsed.set_id = Some(SetId::new(require_value(args, "--set")?)),
                "--name" => parsed.name = Some(require_value(args, "--name")?),
                "--out" => parsed.out_dir = PathBuf::from(require_value(args, "--out")?),
                "--count" => parsed.count = Some(require_number(args, "--count")?),
                "--minutes" => parsed.minutes = Some(require_number(args, "--minutes")?),
                "--review" => parsed.review = true,
                "--shuffle" => parsed.shuffle = true,
                "--no-timer" => parsed.timer = false,
                "--section" => parsed.sections.push(require_value(args, "--section")?),
                "--topic" => parsed.topics.push(require_value(args, "--topic")?),
                "--min" => parsed.min_confidence = Some(require_confidence(args, "--min")?),
                "--max" => parsed.max_confidence = Some(require_confidence(args, "--max")?),
                "--no-unrated" => parsed.include_unrated = false,
                "--max-views" => parsed.max_views = Some(require_number(args, "--max-views")?),
                "--marked" => parsed.only_marked = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if !other.starts_with("--") && parsed.file.is_none() => {
                    parsed.file = Some(PathBuf::from(other));
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(parsed)
    }

    fn set_id(&self) -> Result<SetId, ArgsError> {
        self.set_id.clone().ok_or(ArgsError::MissingSet)
    }

    /// Falls back to the bundled demo set.
    fn set_id_or_demo(&self) -> SetId {
        self.set_id.clone().unwrap_or_else(|| SetId::new(DEMO_SET_ID))
    }

    fn criteria(&self) -> FilterCriteria {
        FilterCriteria::default()
            .with_sections(Selection::only(self.sections.iter().cloned()))
            .with_topics(Selection::only(self.topics.iter().cloned()))
            .with_confidence_range(
                self.min_confidence.unwrap_or(Confidence::MIN),
                self.max_confidence.unwrap_or(Confidence::MAX),
            )
            .with_include_no_confidence(self.include_unrated)
            .with_max_views(self.max_views)
            .with_only_marked(self.only_marked)
    }

    fn exam_config(&self) -> ExamConfig {
        let mut config = ExamConfig::default().with_timer(self.timer);
        if let Some(count) = self.count {
            config = config.with_question_count(count).with_suggested_total();
        }
        if let Some(minutes) = self.minutes {
            config = config.with_total_time_minutes(minutes);
        }
        config
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

//
// ─── ROWS ──────────────────────────────────────────────────────────────────────
//

/// Read a JSON array of objects, one object per spreadsheet row.
fn rows_from_json(text: &str) -> Result<Vec<RawRow>, Box<dyn std::error::Error>> {
    let Value::Array(items) = serde_json::from_str::<Value>(text)? else {
        return Err("expected a JSON array of rows".into());
    };

    items
        .into_iter()
        .map(|item| -> Result<RawRow, Box<dyn std::error::Error>> {
            match item {
                Value::Object(fields) => Ok(fields
                    .into_iter()
                    .map(|(header, cell)| (header, cell_text(cell)))
                    .collect()),
                other => Err(format!("expected a row object, found {other}").into()),
            }
        })
        .collect()
}

fn cell_text(cell: Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(text) => text,
        other => other.to_string(),
    }
}

fn demo_set() -> Result<QuestionSet, Box<dyn std::error::Error>> {
    let questions = import_rows(&rows_from_json(DEMO_ROWS)?)?;
    Ok(QuestionSet::built_in(
        SetId::new(DEMO_SET_ID),
        "Demo sanitaria",
        questions,
    )?)
}

//
// ─── INTERACTIVE LOOPS ─────────────────────────────────────────────────────────
//

/// Translate a typed line into a key press. An empty line is the space bar.
fn key_from_line(line: &str) -> Option<Key> {
    match line.trim() {
        "" => Some(Key::Space),
        "<" => Some(Key::ArrowLeft),
        ">" => Some(Key::ArrowRight),
        other => Key::from_name(other),
    }
}

fn render_study(session: &StudySession) {
    let Some(question) = session.current() else {
        println!("No questions match the current filters.");
        return;
    };
    let position = session.position();
    println!();
    println!(
        "[{}/{}] {} · {}",
        position.number(),
        position.total,
        question.section(),
        question.topic()
    );
    println!("{}", question.prompt());
    if session.is_answer_shown() {
        println!("  → {}", question.answer(session.answer_level()));
        println!("  rate 1-5");
    }
}

fn stdin_lines() -> Lines<BufReader<Stdin>> {
    BufReader::new(tokio::io::stdin()).lines()
}

fn describe_criteria(criteria: &FilterCriteria) {
    let join = |sel: &Selection| sel.iter().collect::<Vec<_>>().join(", ");
    if !criteria.sections.is_unrestricted() {
        println!("sections: {}", join(&criteria.sections));
    }
    if !criteria.topics.is_unrestricted() {
        println!("topics: {}", join(&criteria.topics));
    }
}

async fn run_study(
    services: &AppServices,
    set_id: &SetId,
    mode: StudyMode,
    order: SequenceOrder,
    criteria: FilterCriteria,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = services.open_set(set_id).await?;
    if !criteria.sections.is_unrestricted() {
        let state = app.snapshot().await;
        let topics = available_topics(state.questions(), &criteria.sections);
        println!("topics under the chosen sections: {}", topics.join(", "));
    }
    describe_criteria(&criteria);

    let study = services.study_loop(&app);
    let mut session = study.start(mode, criteria, order).await?;
    render_study(&session);

    let mut lines = stdin_lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim() == "q" {
            break;
        }
        let Some(command) = key_from_line(&line).and_then(|key| study_command(mode, key)) else {
            continue;
        };
        match study.dispatch(&mut session, command).await {
            Ok(Some(record)) if command == StudyCommand::ToggleBookmark => {
                let label = if record.is_marked() { "bookmarked" } else { "bookmark removed" };
                println!("  {label}");
                continue;
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "study command failed"),
        }
        render_study(&session);
    }

    let stats = app.snapshot().await.stats();
    println!(
        "answered {}/{} ({}%), avg confidence {}",
        stats.answered, stats.total, stats.progress_percent, stats.avg_confidence
    );
    Ok(())
}

async fn render_exam(run: &ExamRun) {
    let exam = run.snapshot().await;
    if exam.is_finished() {
        return;
    }
    let clock = if exam.config().use_timer() {
        format!(" [{}]", exam.time_left_label())
    } else {
        String::new()
    };
    if exam.state() == ExamState::Paused {
        println!("paused{clock}, p resumes");
        return;
    }
    let Some(question) = exam.current() else {
        return;
    };
    let position = exam.position();
    println!();
    println!("[{}/{}]{clock} {}", position.number(), position.total, question.prompt());
    if exam.is_answer_shown() {
        println!("  → {}", question.answer(study_core::model::AnswerLevel::Short));
    }
}

async fn run_exam(
    services: &AppServices,
    set_id: &SetId,
    config: ExamConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = services.open_set(set_id).await?;
    let mut run = services.exam_loop(&app).start(config).await?;
    render_exam(&run).await;

    let mut lines = stdin_lines();
    let mut state_rx = run.subscribe();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = state_rx.wait_for(|state| *state == ExamState::Finished) => {
                println!("time is up");
                break;
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim() == "q" {
            break;
        }
        let Some(command) = key_from_line(&line).and_then(exam_command) else {
            continue;
        };
        if let Err(err) = run.dispatch(command).await {
            warn!(error = %err, "exam command failed");
        }
        if run.state().await == ExamState::Finished {
            break;
        }
        render_exam(&run).await;
    }

    let summary = match run.summary().await {
        Some(summary) => summary,
        None => run.finish().await?,
    };
    println!();
    println!(
        "score {}% · answered {} · skipped {} · high {} · low {} · avg {}",
        summary.score(),
        summary.answered(),
        summary.skipped(),
        summary.high_confidence(),
        summary.low_confidence(),
        summary.avg_confidence()
    );
    Ok(())
}

//
// ─── COMMANDS ──────────────────────────────────────────────────────────────────
//

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv = std::env::args().skip(1);

    let cmd = match argv.next().as_deref() {
        None | Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            io::Error::new(io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    let parsed = Args::parse(&mut argv).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    // Open + migrate SQLite at startup. Keep this in the binary glue so core/services stay pure.
    prepare_sqlite_file(&parsed.db_url)?;
    let services = AppServices::new_sqlite(&parsed.db_url, Clock::default(), vec![demo_set()?])
        .await?;

    match cmd {
        Command::Sets => {
            for set in services.question_sets().list_sets().await? {
                println!(
                    "{:<20} {:<30} {:>5} {}",
                    set.id.as_str(),
                    set.name,
                    set.question_count,
                    set.origin.as_str()
                );
            }
        }
        Command::Import => {
            let file = parsed.file.as_ref().ok_or(ArgsError::MissingFile)?;
            let set_id = parsed.set_id()?;
            let name = parsed.name.clone().unwrap_or_else(|| set_id.to_string());
            let rows = rows_from_json(&std::fs::read_to_string(file)?)?;
            let set = services
                .question_sets()
                .import_set(set_id, &name, &rows)
                .await?;
            println!("imported {} questions into {}", set.len(), set.id());
        }
        Command::Study => {
            let mode = if parsed.review {
                StudyMode::Review
            } else {
                StudyMode::Study
            };
            let order = SequenceOrder::from_random(parsed.shuffle);
            run_study(
                &services,
                &parsed.set_id_or_demo(),
                mode,
                order,
                parsed.criteria(),
            )
            .await?;
        }
        Command::Exam => {
            run_exam(&services, &parsed.set_id_or_demo(), parsed.exam_config()).await?;
        }
        Command::Stats => {
            let app = services.open_set(&parsed.set_id_or_demo()).await?;
            let state = app.snapshot().await;
            let stats = state.stats();
            println!(
                "{}: {}/{} answered ({}%), {} pending, {} high, {} low, {} marked, avg {}",
                state.set_id(),
                stats.answered,
                stats.total,
                stats.progress_percent,
                stats.pending,
                stats.high_confidence,
                stats.low_confidence,
                stats.marked_for_review,
                stats.avg_confidence
            );
            for section in state.section_stats() {
                println!(
                    "  {:<24} {:>3}/{:<3} {:>3}%  avg {}",
                    section.name,
                    section.answered,
                    section.total,
                    section.progress_percent,
                    section.avg_confidence
                );
            }
        }
        Command::Export => {
            let export = services.export_progress(&parsed.set_id_or_demo()).await?;
            let path = parsed.out_dir.join(export.file_name());
            std::fs::write(&path, export.to_json_pretty()?)?;
            info!(path = %path.display(), records = export.len(), "progress exported");
            println!("{}", path.display());
        }
        Command::Reset => {
            let set_id = parsed.set_id()?;
            let removed = services.progress().try_reset(&set_id).await?;
            println!("removed {removed} progress records from {set_id}");
        }
        Command::Delete => {
            let set_id = parsed.set_id()?;
            if services.question_sets().delete_set(&set_id).await? {
                println!("deleted {set_id}");
            } else {
                println!("{set_id} not found");
            }
        }
    }

    io::stdout().flush()?;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run().await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
