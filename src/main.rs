//! CLI entry point for gradebook.
//!
//! Loads course definitions, pulls assignment scores from a grade source and
//! answers what-if questions, either as one-shot subcommands or from an
//! interactive prompt.

use anyhow::Result;
use clap::{Parser, Subcommand};
use gradebook::config::CourseConfig;
use gradebook::fetch::BasicClient;
use gradebook::fetch::auth::ApiKey;
use gradebook::gradebook::drop::DropStrategy;
use gradebook::output::render_json;
use gradebook::session::{Command, Reply, Session};
use gradebook::source::{CsvGradeSource, GradeSource, HttpGradeSource};
use std::ffi::OsStr;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "gradebook")]
#[command(about = "Weighted course grades with what-if projections", long_about = None)]
struct Cli {
    /// Course definitions (JSON)
    #[arg(short, long, env = "GRADEBOOK_CONFIG", default_value = "courses.json")]
    config: PathBuf,

    /// Directory of `<identifier>.csv` exports, or http(s) base URL of a portal
    #[arg(short, long, env = "GRADEBOOK_SOURCE", default_value = "grades")]
    source: String,

    /// Bearer token sent to an HTTP source
    #[arg(long, env = "GRADEBOOK_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Pick dropped assignments by exact optimization instead of the greedy default
    #[arg(long, default_value_t = false)]
    optimal_drops: bool,

    /// Print course summaries as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show category scores and the overall grade of a course
    Show { course: String },
    /// Show every configured course
    All,
    /// Add a what-if assignment and show the resulting grade
    Add {
        course: String,
        category: String,
        points_got: f64,
        points_possible: f64,
    },
    /// Drop the assignments that hurt a category most
    Drop {
        course: String,
        category: String,
        how_many: usize,
    },
    /// Score needed on the final to reach a target grade
    Final { course: String, desired_score: f64 },
    /// Read commands from stdin (default)
    Interactive,
}

impl Commands {
    /// Session command plus the course whose summary `--json` should print.
    /// `None` for [`Commands::Interactive`], which has no one-shot command.
    fn into_command(self) -> Option<(Command, Option<String>)> {
        let mapped = match self {
            Commands::Interactive => return None,
            Commands::Show { course } => (
                Command::Show {
                    course: course.clone(),
                },
                Some(course),
            ),
            Commands::All => (Command::All, None),
            Commands::Add {
                course,
                category,
                points_got,
                points_possible,
            } => (
                Command::Add {
                    course: course.clone(),
                    category,
                    points_got,
                    points_possible,
                },
                Some(course),
            ),
            Commands::Drop {
                course,
                category,
                how_many,
            } => (
                Command::Drop {
                    course: course.clone(),
                    category,
                    how_many,
                },
                Some(course),
            ),
            Commands::Final {
                course,
                desired_score,
            } => (
                Command::Final {
                    course,
                    desired_score,
                },
                None,
            ),
        };
        Some(mapped)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    let _file_guard = init_tracing()?;
    let cli = Cli::parse();

    let courses = CourseConfig::load(&cli.config)?.into_courses();
    info!(
        courses = courses.len(),
        config = %cli.config.display(),
        "Course config loaded"
    );

    let source = grade_source(&cli.source, cli.token.as_deref())?;
    let strategy = if cli.optimal_drops {
        DropStrategy::Optimal
    } else {
        DropStrategy::Greedy
    };
    let mut session = Session::new(courses, source).with_drop_strategy(strategy);

    let Some((command, summary_of)) = cli
        .command
        .unwrap_or(Commands::Interactive)
        .into_command()
    else {
        return interactive(&mut session).await;
    };

    let show_all = matches!(command, Command::All);
    let reply = session.execute(command).await?;

    if cli.json && show_all {
        for course in session.courses().values() {
            println!("{}", render_json(&course.summary())?);
        }
        return Ok(());
    }

    match (cli.json, summary_of.and_then(|key| session.course(&key))) {
        (true, Some(course)) => println!("{}", render_json(&course.summary())?),
        _ => {
            if let Reply::Text(text) = reply {
                print!("{text}");
            }
        }
    }

    Ok(())
}

/// Colored stderr logging plus a JSON rolling log file.
///
/// The returned guard flushes the file writer on drop and must outlive `main`'s work.
fn init_tracing() -> Result<WorkerGuard> {
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/gradebook.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("gradebook.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    Ok(file_guard)
}

/// Reads grades from a local export directory, or over HTTP when `source` is a URL.
fn grade_source(source: &str, token: Option<&str>) -> Result<Box<dyn GradeSource>> {
    if !source.starts_with("http") {
        info!(dir = source, "Using CSV export directory");
        return Ok(Box::new(CsvGradeSource::new(source)));
    }

    info!(base_url = source, authenticated = token.is_some(), "Using HTTP grade source");
    let client = BasicClient::new()?;
    let http: Box<dyn GradeSource> = match token {
        Some(token) => Box::new(HttpGradeSource::new(ApiKey::bearer(client, token)?, source)),
        None => Box::new(HttpGradeSource::new(client, source)),
    };
    Ok(http)
}

/// Prompt loop. Bad input and failed commands are reported and the prompt
/// comes back; `exit` or end of input stops it.
async fn interactive(session: &mut Session) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("Type 'help' for commands, 'exit' to quit.");

    loop {
        print!(": ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{e}");
                continue;
            }
        };

        match session.execute(command).await {
            Ok(Reply::Text(text)) => print!("{text}"),
            Ok(Reply::Exit) => break,
            Err(e) => {
                error!(error = %e, "Command failed");
                println!("{e:#}");
            }
        }
    }

    info!("Session finished");
    Ok(())
}
