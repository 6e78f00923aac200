use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClipboardError {
    #[error("{strategy}: {detail}")]
    Strategy { strategy: String, detail: String },
    #[error("Failed to copy to clipboard. Please select and copy manually.")]
    Unavailable { attempts: Vec<String> },
}

impl ClipboardError {
    fn strategy(strategy: &str, detail: impl ToString) -> Self {
        ClipboardError::Strategy {
            strategy: strategy.to_string(),
            detail: detail.to_string(),
        }
    }
}

/// One way of putting text on the system clipboard
pub trait ClipboardStrategy {
    fn name(&self) -> &'static str;
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Successful copy, and which strategy did it
#[derive(Debug, Clone, PartialEq)]
pub struct Copied {
    pub strategy: &'static str,
}

/// Tries each strategy in order until one succeeds
pub struct ClipboardExporter {
    strategies: Vec<Box<dyn ClipboardStrategy>>,
}

impl ClipboardExporter {
    pub fn new(strategies: Vec<Box<dyn ClipboardStrategy>>) -> Self {
        Self { strategies }
    }

    /// System clipboard first, then the command-line tools
    pub fn system(fallback_commands: Vec<CopyCommand>, staging_dir: Option<PathBuf>) -> Self {
        let mut fallback = CommandFallback::new(fallback_commands);
        if let Some(dir) = staging_dir {
            fallback = fallback.with_staging_dir(dir);
        }
        Self::new(vec![Box::new(SystemClipboard::new()), Box::new(fallback)])
    }

    pub fn copy(&mut self, text: &str) -> Result<Copied, ClipboardError> {
        let mut attempts = Vec::new();

        for strategy in self.strategies.iter_mut() {
            match strategy.write_text(text) {
                Ok(()) => {
                    info!(strategy = strategy.name(), bytes = text.len(), "copied to clipboard");
                    return Ok(Copied { strategy: strategy.name() });
                }
                Err(e) => {
                    warn!(strategy = strategy.name(), error = %e, "clipboard strategy failed");
                    attempts.push(e.to_string());
                }
            }
        }

        Err(ClipboardError::Unavailable { attempts })
    }
}

// === Primary: system clipboard API ===

/// `arboard` clipboard. The handle is kept alive so X11/Wayland selections
/// stay served after the copy returns.
pub struct SystemClipboard {
    handle: Option<arboard::Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> Self {
        Self { handle: None }
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new()
    }
}

impl ClipboardStrategy for SystemClipboard {
    fn name(&self) -> &'static str {
        "system clipboard"
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.handle.is_none() {
            let clipboard =
                arboard::Clipboard::new().map_err(|e| ClipboardError::strategy(self.name(), e))?;
            self.handle = Some(clipboard);
        }

        let result = match self.handle.as_mut() {
            Some(clipboard) => clipboard.set_text(text),
            None => return Err(ClipboardError::strategy(self.name(), "no clipboard handle")),
        };

        result.map_err(|e| {
            // A broken handle is dropped so the next copy starts fresh
            self.handle = None;
            ClipboardError::strategy("system clipboard", e)
        })
    }
}

// === Fallback: command-line copy tools ===

/// A command that reads clipboard text from stdin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

impl CopyCommand {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Platform copy tools, most specific first
    pub fn platform_defaults() -> Vec<CopyCommand> {
        if cfg!(target_os = "macos") {
            vec![CopyCommand::new("pbcopy", &[])]
        } else if cfg!(target_os = "windows") {
            vec![CopyCommand::new("clip", &[])]
        } else {
            vec![
                CopyCommand::new("wl-copy", &[]),
                CopyCommand::new("xclip", &["-selection", "clipboard"]),
                CopyCommand::new("xsel", &["--clipboard", "--input"]),
            ]
        }
    }

    fn run(&self, input: File) -> io::Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::from(input))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if status.success() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::Other,
                format!("{} exited with {}", self.program, status),
            ))
        }
    }
}

/// Hidden file holding the text while a copy tool reads it.
///
/// Removed exactly once when dropped, whatever the copy outcome.
struct StagingSurface {
    file: Option<NamedTempFile>,
}

impl StagingSurface {
    fn create(text: &str, dir: Option<&Path>) -> io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(".tabcopy-").suffix(".txt");
        let mut file = match dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        file.write_all(text.as_bytes())?;
        file.flush()?;
        debug!(path = %file.path().display(), "created staging surface");
        Ok(Self { file: Some(file) })
    }

    /// Fresh read handle positioned at the start
    fn reader(&self) -> io::Result<File> {
        match self.file.as_ref() {
            Some(file) => file.reopen(),
            None => Err(io::Error::new(io::ErrorKind::NotFound, "staging surface removed")),
        }
    }
}

impl Drop for StagingSurface {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let path = file.path().to_path_buf();
            match file.close() {
                Ok(()) => debug!(path = %path.display(), "removed staging surface"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to remove staging surface"),
            }
        }
    }
}

/// Stages the text in a hidden temp file and pipes it to the first copy tool
/// that succeeds
pub struct CommandFallback {
    commands: Vec<CopyCommand>,
    staging_dir: Option<PathBuf>,
}

impl CommandFallback {
    pub fn new(commands: Vec<CopyCommand>) -> Self {
        Self { commands, staging_dir: None }
    }

    /// Stage files in `dir` instead of the system temp directory
    pub fn with_staging_dir(mut self, dir: PathBuf) -> Self {
        self.staging_dir = Some(dir);
        self
    }
}

impl ClipboardStrategy for CommandFallback {
    fn name(&self) -> &'static str {
        "copy command"
    }

    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        if self.commands.is_empty() {
            return Err(ClipboardError::strategy(self.name(), "no copy commands configured"));
        }

        let surface = StagingSurface::create(text, self.staging_dir.as_deref())
            .map_err(|e| ClipboardError::strategy(self.name(), e))?;

        let mut failures = Vec::new();
        for command in &self.commands {
            let input = surface
                .reader()
                .map_err(|e| ClipboardError::strategy(self.name(), e))?;
            match command.run(input) {
                Ok(()) => {
                    debug!(program = %command.program, "copy command succeeded");
                    return Ok(());
                }
                Err(e) => failures.push(format!("{}: {}", command.program, e)),
            }
        }

        Err(ClipboardError::strategy(self.name(), failures.join("; ")))
    }
}

// === Copy feedback ===

/// Transient "copied" indicator that expires after a fixed window
#[derive(Debug, Clone, PartialEq)]
pub struct CopyFeedback {
    window: Duration,
    copied_at: Option<Instant>,
}

impl CopyFeedback {
    pub fn new(window: Duration) -> Self {
        Self { window, copied_at: None }
    }

    pub fn mark(&mut self, now: Instant) {
        self.copied_at = Some(now);
    }

    pub fn reset(&mut self) {
        self.copied_at = None;
    }

    pub fn is_active(&self, now: Instant) -> bool {
        self.copied_at
            .map(|at| now.saturating_duration_since(at) < self.window)
            .unwrap_or(false)
    }
}

impl Default for CopyFeedback {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}
