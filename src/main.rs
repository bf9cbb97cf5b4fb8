mod signal;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, TimeZone};
use clap::Parser;
use colored::{ColoredString, Colorize};
use signal::Shutdown;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tailscope::config::{self, ViewerConfig};
use tailscope::source::file::FileFetcher;
use tailscope::source::push::STOPPED_MESSAGE;
use tailscope::source::stream::ReaderConnector;
use tailscope::{LogLevel, LogLine, LogSession, SourceKind, ViewCommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// How often the session is ticked
const TICK_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "tailscope")]
#[command(about = "Follow a log file or piped stream with tail limits and search", long_about = None)]
struct Args {
    /// Log file to follow (use - for stdin)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Keep at most N lines; 0 or negative keeps everything
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    tail: Option<i64>,

    /// Count lines matching QUERY (case-insensitive) and report on exit
    #[arg(long, value_name = "QUERY")]
    search: Option<String>,

    /// Start with follow mode off
    #[arg(long = "no-follow")]
    no_follow: bool,

    /// Use this config file instead of discovering one
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Prefix lines with their timestamp
    #[arg(long)]
    timestamps: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let stdin_is_tty = io::stdin().is_terminal();
    let use_stdin = match &args.file {
        Some(path) => path.as_os_str() == "-",
        None => !stdin_is_tty,
    };

    if args.file.is_none() && !use_stdin {
        eprintln!("Usage: tailscope <FILE>");
        eprintln!("       command | tailscope");
        eprintln!("       tailscope -  (explicit stdin)");
        std::process::exit(1);
    }

    let viewer_config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprint!("{}", err.format_cargo_style());
            std::process::exit(1);
        }
    };

    let mut settings = viewer_config.session_settings();
    if let Some(tail) = args.tail {
        settings.tail = tailscope::Tail::from_hint(tail);
    }
    if args.no_follow {
        settings.follow = false;
    }

    let (target, kind) = match (&args.file, use_stdin) {
        (Some(path), false) => (
            path.display().to_string(),
            SourceKind::Pull(Arc::new(FileFetcher::new(path))),
        ),
        _ => (
            "<stdin>".to_string(),
            SourceKind::Push(Arc::new(ReaderConnector::stdin())),
        ),
    };

    let shutdown = Shutdown::install().context("Failed to install signal handlers")?;

    let mut session = LogSession::new(target, kind, settings);
    session.start(Instant::now());
    if let Some(query) = &args.search {
        session.search(query, Instant::now());
    }

    run(&mut session, &shutdown, args.timestamps)?;
    session.stop();

    if let Some(query) = &args.search {
        // Input may end before the debounce does
        session.flush_search();
        eprintln!(
            "{} {}",
            format!("\"{}\":", query).bold(),
            session.search_state().label()
        );
    }

    Ok(())
}

fn load_config(args: &Args) -> Result<ViewerConfig, config::ConfigError> {
    match &args.config {
        Some(path) => config::load_single_file(path),
        None => {
            let discovery = config::discover();
            debug!(
                project = ?discovery.project_config,
                global = ?discovery.global_config,
                "config discovery"
            );
            config::load(&discovery)
        }
    }
}

/// Tick until the source ends or a shutdown signal arrives, printing every new line once.
fn run(session: &mut LogSession, shutdown: &Shutdown, timestamps: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut printed: Option<u64> = None;

    loop {
        for command in session.tick(Instant::now()) {
            if command == ViewCommand::Reset {
                printed = None;
            }
        }

        let last_printed = printed;
        for line in session
            .snapshot()
            .iter()
            .filter(|line| last_printed.map_or(true, |last| line.sequence > last))
        {
            if is_stream_notice(line) {
                eprintln!("{}", line.text.dimmed());
            } else {
                writeln!(out, "{}", format_line(line, timestamps))?;
            }
            printed = Some(line.sequence);
        }
        out.flush()?;

        if shutdown.requested() {
            info!("shutdown requested");
            break;
        }
        if !session.is_source_active() {
            break;
        }
        thread::sleep(TICK_INTERVAL);
    }

    Ok(())
}

/// The line a push source appends when its stream ends. Kept out of stdout so
/// piping through tailscope passes the input through unchanged.
fn is_stream_notice(line: &LogLine) -> bool {
    line.level == LogLevel::Error && line.text == STOPPED_MESSAGE
}

fn level_tag(level: LogLevel) -> ColoredString {
    let tag = format!("{:<7}", level.as_str());
    match level {
        LogLevel::Error => tag.red().bold(),
        LogLevel::Warn => tag.yellow(),
        LogLevel::Verbose => tag.dimmed(),
        LogLevel::Info => tag.green(),
    }
}

fn format_line(line: &LogLine, timestamps: bool) -> String {
    if !timestamps {
        return format!("{} {}", level_tag(line.level), line.text);
    }

    // Prefer the source's own time; fall back to when we received the line
    let time = line
        .timestamp
        .and_then(|ms| Local.timestamp_millis_opt(ms).single())
        .unwrap_or_else(|| DateTime::<Local>::from(line.received_at));

    format!(
        "{} {} {}",
        time.format("%Y-%m-%d %H:%M:%S%.3f").to_string().dimmed(),
        level_tag(line.level),
        line.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailscope::{LineBuffer, RawLine, Tail};

    #[test]
    fn test_stream_notice_detection() {
        let mut buffer = LineBuffer::new(Tail::Unbounded);
        buffer.append(vec![
            RawLine::info(STOPPED_MESSAGE),
            RawLine::error("Logs error: broken pipe"),
            RawLine::error(STOPPED_MESSAGE),
        ]);
        let flags: Vec<bool> = buffer.snapshot().iter().map(is_stream_notice).collect();
        assert_eq!(flags, vec![false, false, true]);
    }
}
