//! Session state machine.
//!
//! `Idle -> Loading -> Displaying | Failed`, with `Clear` back to `Idle` and a new
//! file (chosen or dropped) always superseding whatever came before. Every parse
//! attempt gets a fresh token; completions carrying an older token are dropped
//! without any visible effect.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardExporter, CopyFeedback};
use crate::fileio::{route, ParseError, ParserKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading { token: u64 },
    Displaying,
    Failed,
}

/// How the file reached us
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Chooser,
    Drop,
}

/// Work order for the parse worker
#[derive(Debug, Clone, PartialEq)]
pub struct ParseJob {
    pub token: u64,
    pub path: PathBuf,
    pub kind: ParserKind,
    pub source: LoadSource,
}

/// Text produced by a successful parse
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rendered {
    pub text: String,
    pub notes: Vec<String>,
}

/// Finished parse attempt, tagged with the token of the job that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub token: u64,
    pub result: Result<Rendered, ParseError>,
}

/// Whether an event changed the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct SessionState {
    phase: Phase,
    file_name: String,
    rendered_text: String,
    error_message: String,
    notes: Vec<String>,
    copied: CopyFeedback,
    is_dragging: bool,
    next_token: u64,
}

impl SessionState {
    pub fn new(copy_window: Duration) -> Self {
        Self {
            phase: Phase::Idle,
            file_name: String::new(),
            rendered_text: String::new(),
            error_message: String::new(),
            notes: Vec::new(),
            copied: CopyFeedback::new(copy_window),
            is_dragging: false,
            next_token: 1,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn rendered_text(&self) -> &str {
        &self.rendered_text
    }

    pub fn error_message(&self) -> &str {
        &self.error_message
    }

    pub fn notes(&self) -> &[String] {
        &self.notes
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.phase, Phase::Loading { .. })
    }

    pub fn is_copied(&self, now: Instant) -> bool {
        self.copied.is_active(now)
    }

    // === File acquisition ===

    /// File picked through the chooser
    pub fn select_file(&mut self, path: &Path) -> Option<ParseJob> {
        self.begin_load(path, LoadSource::Chooser)
    }

    /// File dropped onto the window. Ends any drag in progress.
    pub fn drop_file(&mut self, path: &Path) -> Option<ParseJob> {
        self.is_dragging = false;
        self.begin_load(path, LoadSource::Drop)
    }

    /// Enter `Loading`, or go straight to `Failed` when no parser handles the
    /// extension. Prior output is discarded either way.
    fn begin_load(&mut self, path: &Path, source: LoadSource) -> Option<ParseJob> {
        self.file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.rendered_text.clear();
        self.error_message.clear();
        self.notes.clear();
        self.copied.reset();

        let kind = match route(&self.file_name) {
            Ok(kind) => kind,
            Err(e) => {
                warn!(file = %self.file_name, "unsupported file type");
                self.fail(e);
                return None;
            }
        };

        let token = self.next_token;
        self.next_token += 1;
        if let Phase::Loading { token: old } = self.phase {
            debug!(old, new = token, "superseding in-flight parse");
        }
        self.phase = Phase::Loading { token };
        info!(file = %self.file_name, token, ?source, "loading");

        Some(ParseJob {
            token,
            path: path.to_path_buf(),
            kind,
            source,
        })
    }

    /// Apply a finished parse. Stale completions are ignored.
    pub fn complete(&mut self, outcome: ParseOutcome) -> Transition {
        if self.phase != (Phase::Loading { token: outcome.token }) {
            debug!(token = outcome.token, phase = ?self.phase, "discarding stale parse result");
            return Transition::Ignored;
        }

        match outcome.result {
            Ok(rendered) => {
                info!(file = %self.file_name, bytes = rendered.text.len(), "parse complete");
                self.rendered_text = rendered.text;
                self.notes = rendered.notes;
                self.phase = Phase::Displaying;
            }
            Err(e) => {
                warn!(file = %self.file_name, error = %e, "parse failed");
                self.fail(e);
            }
        }
        Transition::Applied
    }

    fn fail(&mut self, error: ParseError) {
        self.rendered_text.clear();
        self.error_message = error.to_string();
        self.phase = Phase::Failed;
    }

    // === Output actions ===

    /// Copy the rendered text. Only meaningful while displaying; a failure is
    /// reported through the error message without leaving `Displaying`.
    pub fn copy(&mut self, exporter: &mut ClipboardExporter, now: Instant) -> Transition {
        if self.phase != Phase::Displaying {
            debug!(phase = ?self.phase, "copy ignored");
            return Transition::Ignored;
        }

        match exporter.copy(&self.rendered_text) {
            Ok(copied) => {
                debug!(strategy = copied.strategy, "copy succeeded");
                self.error_message.clear();
                self.copied.mark(now);
            }
            Err(e) => {
                self.copied.reset();
                self.error_message = e.to_string();
            }
        }
        Transition::Applied
    }

    /// Back to `Idle`, forgetting the file and its output
    pub fn clear(&mut self) -> Transition {
        if !matches!(self.phase, Phase::Displaying | Phase::Failed) {
            debug!(phase = ?self.phase, "clear ignored");
            return Transition::Ignored;
        }

        self.phase = Phase::Idle;
        self.file_name.clear();
        self.rendered_text.clear();
        self.error_message.clear();
        self.notes.clear();
        self.copied.reset();
        Transition::Applied
    }

    // === Drag feedback ===

    pub fn drag_enter(&mut self) {
        self.is_dragging = true;
    }

    pub fn drag_over(&mut self) {
        self.is_dragging = true;
    }

    pub fn drag_leave(&mut self) {
        self.is_dragging = false;
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

#[cfg(test)]
mod test;
