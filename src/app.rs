use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{debug, info};

use crate::clipboard::ClipboardExporter;
use crate::session::{ParseJob, Phase, SessionState, Transition};
use crate::ui;
use crate::worker::ParseWorker;

/// Lines moved by PageUp/PageDown
const PAGE_LINES: u16 = 20;

pub struct App {
    pub session: SessionState,
    worker: ParseWorker,
    exporter: ClipboardExporter,
    /// Path being typed into the file chooser, if open
    pub prompt: Option<String>,
    /// Path pasted onto the window, waiting for Enter (drop) or Esc (leave)
    pub pending_drop: Option<PathBuf>,
    pub scroll: u16,
    pub should_quit: bool,
}

impl App {
    pub fn new(session: SessionState, worker: ParseWorker, exporter: ClipboardExporter) -> Self {
        Self {
            session,
            worker,
            exporter,
            prompt: None,
            pending_drop: None,
            scroll: 0,
            should_quit: false,
        }
    }

    pub fn run(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()> {
        while !self.should_quit {
            // Check for completed background parses
            self.poll_parse_results();

            let now = Instant::now();
            terminal.draw(|f| ui::render(f, self, now))?;

            if poll(Duration::from_millis(16))? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(key),
                    Event::Paste(text) => self.handle_paste(&text),
                    _ => {}
                }
            }
        }
        Ok(())
    }

    /// Explicit chooser selection
    pub fn open(&mut self, path: &Path) {
        let job = self.session.select_file(path);
        self.start(job);
    }

    fn start(&mut self, job: Option<ParseJob>) {
        self.scroll = 0;
        if let Some(job) = job {
            self.worker.submit(job);
        }
    }

    fn poll_parse_results(&mut self) {
        while let Some(outcome) = self.worker.try_next() {
            if self.session.complete(outcome) == Transition::Applied {
                self.scroll = 0;
            }
        }
    }

    // === Input ===

    fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.should_quit = true;
            return;
        }

        if self.prompt.is_some() {
            self.handle_prompt_key(key);
            return;
        }

        if self.pending_drop.is_some() {
            self.handle_drop_key(key);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('o') => self.prompt = Some(String::new()),
            KeyCode::Char('c') => {
                self.session.copy(&mut self.exporter, Instant::now());
            }
            KeyCode::Char('x') => {
                if self.session.clear() == Transition::Applied {
                    self.scroll = 0;
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.scroll_by(1),
            KeyCode::Char('k') | KeyCode::Up => self.scroll_by(-1),
            KeyCode::PageDown => self.scroll_by(PAGE_LINES as i32),
            KeyCode::PageUp => self.scroll_by(-(PAGE_LINES as i32)),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            KeyCode::Char('G') | KeyCode::End => self.scroll = self.max_scroll(),
            _ => {}
        }
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        let Some(buffer) = self.prompt.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc => self.prompt = None,
            KeyCode::Enter => {
                let typed = buffer.clone();
                self.prompt = None;
                if let Some(path) = clean_path_input(&typed) {
                    self.open(&path);
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) => buffer.push(c),
            _ => {}
        }
    }

    fn handle_drop_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => {
                if let Some(path) = self.pending_drop.take() {
                    info!(path = %path.display(), "file dropped");
                    let job = self.session.drop_file(&path);
                    self.start(job);
                }
            }
            KeyCode::Esc => {
                self.pending_drop = None;
                self.session.drag_leave();
            }
            _ => {}
        }
    }

    /// Terminals deliver a file dragged onto the window as a paste of its path
    fn handle_paste(&mut self, text: &str) {
        if let Some(buffer) = self.prompt.as_mut() {
            buffer.push_str(text.trim_end_matches(['\r', '\n']));
            return;
        }

        match clean_path_input(text) {
            Some(path) => {
                debug!(path = %path.display(), "drag over window");
                if self.pending_drop.is_some() {
                    self.session.drag_over();
                } else {
                    self.session.drag_enter();
                }
                self.pending_drop = Some(path);
            }
            None => {
                self.pending_drop = None;
                self.session.drag_leave();
            }
        }
    }

    // === Scrolling ===

    fn max_scroll(&self) -> u16 {
        let lines = self.session.rendered_text().lines().count();
        u16::try_from(lines.saturating_sub(1)).unwrap_or(u16::MAX)
    }

    fn scroll_by(&mut self, delta: i32) {
        if self.session.phase() != Phase::Displaying {
            return;
        }
        let target = (self.scroll as i32 + delta).clamp(0, self.max_scroll() as i32);
        self.scroll = target as u16;
    }
}

/// Turn typed or pasted text into a path.
///
/// Accepts the forms terminals and file managers produce: surrounding quotes,
/// `file://` URLs, backslash-escaped spaces. Only the first line is used.
pub fn clean_path_input(text: &str) -> Option<PathBuf> {
    let line = text.lines().map(str::trim).find(|l| !l.is_empty())?;

    let unquoted = ['\'', '"']
        .iter()
        .find_map(|q| line.strip_prefix(*q).and_then(|l| l.strip_suffix(*q)))
        .unwrap_or(line);

    let without_scheme = unquoted.strip_prefix("file://").unwrap_or(unquoted);
    let unescaped = without_scheme.replace("\\ ", " ").replace("%20", " ");

    if unescaped.is_empty() {
        None
    } else {
        Some(PathBuf::from(unescaped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use crate::fileio::FileIO;

    fn test_app() -> App {
        App::new(
            SessionState::default(),
            ParseWorker::new(FileIO::default()),
            ClipboardExporter::new(Vec::new()),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn wait_for_result(app: &mut App) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while app.session.is_loading() && Instant::now() < deadline {
            app.poll_parse_results();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_paste_then_enter_drops_file() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(b"a,bb\nccc,d\n").unwrap();
        let mut app = test_app();

        app.handle_paste(&format!("'{}'", file.path().display()));
        assert!(app.session.is_dragging());
        assert_eq!(app.pending_drop.as_deref(), Some(file.path()));

        press(&mut app, KeyCode::Enter);
        assert!(!app.session.is_dragging());
        assert!(app.pending_drop.is_none());

        wait_for_result(&mut app);
        assert_eq!(app.session.phase(), Phase::Displaying);
        assert_eq!(app.session.rendered_text(), "a    |  bb\nccc  |  d ");
    }

    #[test]
    fn test_paste_then_escape_leaves() {
        let mut app = test_app();
        app.handle_paste("/tmp/whatever.csv");
        press(&mut app, KeyCode::Esc);
        assert!(!app.session.is_dragging());
        assert!(app.pending_drop.is_none());
        assert_eq!(app.session.phase(), Phase::Idle);
    }

    #[test]
    fn test_prompt_selects_file() {
        let mut app = test_app();
        press(&mut app, KeyCode::Char('o'));
        assert_eq!(app.prompt.as_deref(), Some(""));

        for c in "in.txt".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Enter);

        assert!(app.prompt.is_none());
        assert_eq!(app.session.phase(), Phase::Failed);
        assert_eq!(app.session.file_name(), "in.txt");

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.session.phase(), Phase::Idle);
    }

    #[test]
    fn test_copy_with_no_clipboard_shows_error() {
        let mut file = NamedTempFile::with_suffix(".csv").unwrap();
        file.write_all(b"x\n").unwrap();
        let mut app = test_app();
        app.open(file.path());
        wait_for_result(&mut app);

        press(&mut app, KeyCode::Char('c'));
        assert_eq!(app.session.phase(), Phase::Displaying);
        assert!(app.session.error_message().starts_with("Failed to copy"));
    }

    #[test]
    fn test_clean_plain_path() {
        assert_eq!(clean_path_input("/tmp/data.csv"), Some(PathBuf::from("/tmp/data.csv")));
        assert_eq!(clean_path_input("  rel.xlsx \n"), Some(PathBuf::from("rel.xlsx")));
    }

    #[test]
    fn test_clean_quoted_and_escaped() {
        assert_eq!(
            clean_path_input("'/tmp/my data.csv'"),
            Some(PathBuf::from("/tmp/my data.csv"))
        );
        assert_eq!(
            clean_path_input("\"/tmp/q.xls\""),
            Some(PathBuf::from("/tmp/q.xls"))
        );
        assert_eq!(
            clean_path_input("/tmp/my\\ data.csv"),
            Some(PathBuf::from("/tmp/my data.csv"))
        );
    }

    #[test]
    fn test_clean_file_url() {
        assert_eq!(
            clean_path_input("file:///home/me/Book%20One.xlsx"),
            Some(PathBuf::from("/home/me/Book One.xlsx"))
        );
    }

    #[test]
    fn test_clean_takes_first_line() {
        assert_eq!(
            clean_path_input("\n/a.csv\n/b.csv\n"),
            Some(PathBuf::from("/a.csv"))
        );
    }

    #[test]
    fn test_clean_empty() {
        assert_eq!(clean_path_input(""), None);
        assert_eq!(clean_path_input("   \n  "), None);
        assert_eq!(clean_path_input("''"), None);
    }
}
