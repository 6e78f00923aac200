use super::*;

use std::io::Write;
use tempfile::NamedTempFile;

use crate::clipboard::{ClipboardError, ClipboardStrategy};
use crate::fileio::{FileIO, LoadOptions};
use crate::util::WidthMode;
use crate::worker::{run_job, ParseWorker};

struct FixedStrategy {
    ok: bool,
}

impl ClipboardStrategy for FixedStrategy {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn write_text(&mut self, _text: &str) -> Result<(), ClipboardError> {
        if self.ok {
            Ok(())
        } else {
            Err(ClipboardError::Strategy {
                strategy: "fixed".to_string(),
                detail: "unavailable".to_string(),
            })
        }
    }
}

fn exporter(ok: bool) -> ClipboardExporter {
    ClipboardExporter::new(vec![Box::new(FixedStrategy { ok })])
}

fn success(token: u64, text: &str) -> ParseOutcome {
    ParseOutcome {
        token,
        result: Ok(Rendered {
            text: text.to_string(),
            notes: Vec::new(),
        }),
    }
}

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".csv").unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

/// Session already showing `text` for data.csv
fn displaying(text: &str) -> SessionState {
    let mut session = SessionState::default();
    let job = session.select_file(Path::new("data.csv")).unwrap();
    session.complete(success(job.token, text));
    session
}

#[test]
fn test_starts_idle() {
    let session = SessionState::default();
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.file_name(), "");
    assert_eq!(session.rendered_text(), "");
    assert_eq!(session.error_message(), "");
    assert!(!session.is_dragging());
    assert!(!session.is_copied(Instant::now()));
}

#[test]
fn test_select_enters_loading() {
    let mut session = SessionState::default();
    let job = session.select_file(Path::new("/tmp/some/Report.CSV")).unwrap();

    assert_eq!(job.kind, ParserKind::Delimited);
    assert_eq!(job.source, LoadSource::Chooser);
    assert_eq!(job.path, PathBuf::from("/tmp/some/Report.CSV"));
    assert_eq!(session.phase(), Phase::Loading { token: job.token });
    assert_eq!(session.file_name(), "Report.CSV");
    assert!(session.is_loading());
}

#[test]
fn test_unsupported_goes_straight_to_failed() {
    let mut session = displaying("old output");
    let job = session.select_file(Path::new("notes.txt"));

    assert!(job.is_none());
    assert_eq!(session.phase(), Phase::Failed);
    assert_eq!(session.file_name(), "notes.txt");
    assert_eq!(session.rendered_text(), "");
    assert_eq!(
        session.error_message(),
        "Unsupported file type. Please upload a CSV or Excel file."
    );
}

#[test]
fn test_success_displays_text() {
    let session = displaying("a  |  b");
    assert_eq!(session.phase(), Phase::Displaying);
    assert_eq!(session.rendered_text(), "a  |  b");
    assert_eq!(session.error_message(), "");
}

#[test]
fn test_failure_shows_error() {
    let mut session = SessionState::default();
    let job = session.select_file(Path::new("bad.xlsx")).unwrap();
    let transition = session.complete(ParseOutcome {
        token: job.token,
        result: Err(ParseError::Excel("zip error".to_string())),
    });

    assert_eq!(transition, Transition::Applied);
    assert_eq!(session.phase(), Phase::Failed);
    assert_eq!(session.rendered_text(), "");
    assert_eq!(session.error_message(), "Error parsing Excel: zip error");
}

#[test]
fn test_new_upload_discards_previous_output() {
    let mut session = displaying("old output");
    session.copy(&mut exporter(true), Instant::now());

    let job = session.select_file(Path::new("next.xlsx")).unwrap();
    assert_eq!(session.phase(), Phase::Loading { token: job.token });
    assert_eq!(session.rendered_text(), "");
    assert_eq!(session.error_message(), "");
    assert!(!session.is_copied(Instant::now()));
}

#[test]
fn test_tokens_increase() {
    let mut session = SessionState::default();
    let first = session.select_file(Path::new("a.csv")).unwrap();
    let second = session.drop_file(Path::new("b.csv")).unwrap();
    let third = session.select_file(Path::new("c.xls")).unwrap();
    assert!(first.token < second.token && second.token < third.token);
}

#[test]
fn test_late_result_of_superseded_parse_is_ignored() {
    let mut session = SessionState::default();
    let first = session.select_file(Path::new("first.csv")).unwrap();
    let second = session.select_file(Path::new("second.csv")).unwrap();

    assert_eq!(session.complete(success(second.token, "second")), Transition::Applied);
    assert_eq!(session.complete(success(first.token, "first")), Transition::Ignored);

    assert_eq!(session.phase(), Phase::Displaying);
    assert_eq!(session.rendered_text(), "second");
    assert_eq!(session.file_name(), "second.csv");
}

#[test]
fn test_stale_failure_while_loading_is_ignored() {
    let mut session = SessionState::default();
    let first = session.select_file(Path::new("first.csv")).unwrap();
    let second = session.select_file(Path::new("second.csv")).unwrap();

    let transition = session.complete(ParseOutcome {
        token: first.token,
        result: Err(ParseError::Io("gone".to_string())),
    });
    assert_eq!(transition, Transition::Ignored);
    assert_eq!(session.phase(), Phase::Loading { token: second.token });
    assert_eq!(session.error_message(), "");
}

#[test]
fn test_result_after_clear_is_ignored() {
    let mut session = displaying("shown");
    assert_eq!(session.clear(), Transition::Applied);
    assert_eq!(session.complete(success(1, "late")), Transition::Ignored);
    assert_eq!(session.phase(), Phase::Idle);
}

#[test]
fn test_copy_success_is_transient() {
    let mut session = displaying("text");
    let now = Instant::now();

    assert_eq!(session.copy(&mut exporter(true), now), Transition::Applied);
    assert!(session.is_copied(now));
    assert!(!session.is_copied(now + Duration::from_secs(2)));
    assert_eq!(session.phase(), Phase::Displaying);
}

#[test]
fn test_copy_failure_keeps_displaying() {
    let mut session = displaying("text");
    session.copy(&mut exporter(false), Instant::now());

    assert_eq!(session.phase(), Phase::Displaying);
    assert_eq!(session.rendered_text(), "text");
    assert_eq!(
        session.error_message(),
        "Failed to copy to clipboard. Please select and copy manually."
    );
    assert!(!session.is_copied(Instant::now()));

    // A later successful copy clears the banner
    session.copy(&mut exporter(true), Instant::now());
    assert_eq!(session.error_message(), "");
}

#[test]
fn test_copy_only_while_displaying() {
    let mut session = SessionState::default();
    assert_eq!(session.copy(&mut exporter(true), Instant::now()), Transition::Ignored);

    session.select_file(Path::new("x.csv"));
    assert_eq!(session.copy(&mut exporter(true), Instant::now()), Transition::Ignored);

    session.select_file(Path::new("x.doc"));
    assert_eq!(session.copy(&mut exporter(true), Instant::now()), Transition::Ignored);
}

#[test]
fn test_clear_resets_everything() {
    let mut session = displaying("text");
    session.copy(&mut exporter(true), Instant::now());

    assert_eq!(session.clear(), Transition::Applied);
    assert_eq!(session.phase(), Phase::Idle);
    assert_eq!(session.file_name(), "");
    assert_eq!(session.rendered_text(), "");
    assert_eq!(session.error_message(), "");
    assert!(!session.is_copied(Instant::now()));

    let mut failed = SessionState::default();
    failed.select_file(Path::new("x.pdf"));
    assert_eq!(failed.clear(), Transition::Applied);
    assert_eq!(failed.error_message(), "");
}

#[test]
fn test_clear_ignored_when_idle_or_loading() {
    let mut session = SessionState::default();
    assert_eq!(session.clear(), Transition::Ignored);

    let job = session.select_file(Path::new("x.csv")).unwrap();
    assert_eq!(session.clear(), Transition::Ignored);
    assert_eq!(session.phase(), Phase::Loading { token: job.token });
}

#[test]
fn test_drag_flag() {
    let mut session = SessionState::default();
    session.drag_enter();
    assert!(session.is_dragging());
    session.drag_leave();
    assert!(!session.is_dragging());

    session.drag_over();
    assert!(session.is_dragging());
    let job = session.drop_file(Path::new("dropped.xlsx")).unwrap();
    assert!(!session.is_dragging());
    assert_eq!(job.source, LoadSource::Drop);
    assert_eq!(job.kind, ParserKind::Spreadsheet);
}

#[test]
fn test_drag_does_not_touch_output() {
    let mut session = displaying("kept");
    session.drag_enter();
    session.drag_leave();
    assert_eq!(session.phase(), Phase::Displaying);
    assert_eq!(session.rendered_text(), "kept");
}

#[test]
fn test_run_job_end_to_end() {
    let file = csv_file("a,bb\nccc,d\n");
    let mut session = SessionState::default();
    let job = session.select_file(file.path()).unwrap();

    session.complete(run_job(&FileIO::default(), &job));
    assert_eq!(session.phase(), Phase::Displaying);
    assert_eq!(session.rendered_text(), "a    |  bb\nccc  |  d ");
    assert_eq!(session.notes().to_vec(), vec!["Delimiter: comma".to_string()]);
}

#[test]
fn test_run_job_uses_configured_width_mode() {
    let file = csv_file("日本,x\nabc,y\n");
    let mut session = SessionState::default();

    let job = session.select_file(file.path()).unwrap();
    session.complete(run_job(&FileIO::default(), &job));
    assert_eq!(session.rendered_text(), "日本   |  x\nabc  |  y");

    let display = FileIO::new(LoadOptions {
        width_mode: WidthMode::Display,
        ..LoadOptions::default()
    });
    let job = session.select_file(file.path()).unwrap();
    session.complete(run_job(&display, &job));
    assert_eq!(session.rendered_text(), "日本  |  x\nabc   |  y");
}

#[test]
fn test_run_job_missing_file() {
    let mut session = SessionState::default();
    let job = session.select_file(Path::new("/no/such/dir/data.csv")).unwrap();

    session.complete(run_job(&FileIO::default(), &job));
    assert_eq!(session.phase(), Phase::Failed);
    assert!(session.error_message().starts_with("Error reading file: "));
}

#[test]
fn test_only_latest_of_concurrent_parses_is_displayed() {
    let first_file = csv_file("first\n");
    let second_file = csv_file("second\n");

    let worker = ParseWorker::new(FileIO::default());
    let mut session = SessionState::default();

    let first = session.select_file(first_file.path()).unwrap();
    let h1 = worker.submit(first);
    let second = session.drop_file(second_file.path()).unwrap();
    let h2 = worker.submit(second);
    h1.join().unwrap();
    h2.join().unwrap();

    // Both threads have sent; whatever order the outcomes arrive in, only the
    // newer one applies
    let mut transitions = Vec::new();
    while let Some(outcome) = worker.try_next() {
        transitions.push(session.complete(outcome));
    }

    transitions.sort_by_key(|t| *t == Transition::Ignored);
    assert_eq!(transitions, vec![Transition::Applied, Transition::Ignored]);
    assert_eq!(session.phase(), Phase::Displaying);
    assert_eq!(session.rendered_text(), "second");
}
