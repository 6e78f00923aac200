mod app;
mod cell;
mod clipboard;
mod config;
mod fileio;
mod session;
mod table;
mod ui;
mod util;
mod worker;

use std::fs::{self, OpenOptions};
use std::io;
use std::panic;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{error, info, Level};

use app::App;
use clipboard::ClipboardExporter;
use config::AppConfig;
use fileio::FileIO;
use session::{Phase, SessionState};
use worker::{run_job, ParseWorker};

/// Turn CSV and Excel files into aligned plain text and copy it to the clipboard.
///
/// Without --print or --copy an interactive view opens; press `o` to choose a
/// file or drag one onto the terminal window.
#[derive(Debug, Parser)]
#[command(name = "tabcopy", version)]
struct Args {
    /// File to open (.csv, .xlsx, .xls)
    file: Option<PathBuf>,

    /// Print the aligned text to stdout and exit
    #[arg(long)]
    print: bool,

    /// Copy the aligned text to the clipboard and exit
    #[arg(long)]
    copy: bool,

    /// CSV field delimiter (comma, tab, semicolon, pipe, or a character); auto-detected if omitted
    #[arg(short, long, value_parser = parse_delimiter_arg)]
    delimiter: Option<u8>,

    /// Config file (default: ~/.config/tabcopy/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

impl Args {
    fn is_batch(&self) -> bool {
        self.print || self.copy
    }
}

fn parse_delimiter_arg(s: &str) -> Result<u8, String> {
    util::parse_delimiter(s).ok_or_else(|| {
        format!(
            "invalid delimiter '{}'. Use comma, tab, semicolon, pipe, or a single character.",
            s
        )
    })
}

/// Batch mode logs to stderr; the interactive view logs to a file so the
/// alternate screen stays clean.
fn init_logging(args: &Args) {
    if args.is_batch() {
        tracing_subscriber::fmt()
            .with_max_level(args.log_level)
            .with_writer(io::stderr)
            .init();
        return;
    }

    let dir = config::config_dir();
    let file = fs::create_dir_all(&dir).and_then(|_| {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join("tabcopy.log"))
    });

    match file {
        Ok(file) => tracing_subscriber::fmt()
            .with_max_level(args.log_level)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init(),
        Err(_) => tracing_subscriber::fmt()
            .with_max_level(args.log_level)
            .with_writer(io::sink)
            .init(),
    }
}

/// Restore the terminal before the default hook prints the panic
fn install_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);

        if let Some(location) = info.location() {
            error!(
                file = location.file(),
                line = location.line(),
                "panic occurred"
            );
        } else {
            error!("panic occurred");
        }

        if let Some(s) = info.payload().downcast_ref::<&str>() {
            error!(message = %s);
        } else if let Some(s) = info.payload().downcast_ref::<String>() {
            error!(message = %s);
        }

        default_hook(info);
    }));
}

/// Parse one file through the session and print and/or copy the result
fn run_batch(args: &Args, config: &AppConfig, file_io: &FileIO) -> ExitCode {
    let Some(path) = args.file.as_ref() else {
        eprintln!("Error: --print and --copy need a FILE");
        return ExitCode::FAILURE;
    };

    let mut session = SessionState::new(config.copy_window());
    if let Some(job) = session.select_file(path) {
        session.complete(run_job(file_io, &job));
    }

    if session.phase() != Phase::Displaying {
        eprintln!("{}", session.error_message());
        return ExitCode::FAILURE;
    }

    for note in session.notes() {
        info!(note = %note, "load note");
    }

    if args.print {
        println!("{}", session.rendered_text());
    }

    if args.copy {
        let mut exporter = ClipboardExporter::system(
            config.fallback_commands(),
            config.clipboard.staging_dir.clone(),
        );
        session.copy(&mut exporter, Instant::now());
        if !session.error_message().is_empty() {
            eprintln!("{}", session.error_message());
            return ExitCode::FAILURE;
        }
        eprintln!("Copied {} to clipboard", session.file_name());
    }

    ExitCode::SUCCESS
}

fn run_interactive(args: &Args, config: &AppConfig, file_io: FileIO) -> io::Result<()> {
    install_panic_hook();

    let session = SessionState::new(config.copy_window());
    let worker = ParseWorker::new(file_io);
    let exporter = ClipboardExporter::system(
        config.fallback_commands(),
        config.clipboard.staging_dir.clone(),
    );
    let mut app = App::new(session, worker, exporter);

    if let Some(path) = &args.file {
        app.open(path);
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = app.run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableBracketedPaste, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn main() -> io::Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args);
    info!("tabcopy started");

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load config");
            eprintln!("{}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    let file_io = FileIO::new(config.load_options(args.delimiter));

    if args.is_batch() {
        return Ok(run_batch(&args, &config, &file_io));
    }

    run_interactive(&args, &config, file_io).map_err(|e| {
        error!(error = %e, "terminal error");
        e
    })?;
    Ok(ExitCode::SUCCESS)
}
