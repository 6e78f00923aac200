use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use crate::fileio::{read_bytes, FileIO};
use crate::session::{ParseJob, ParseOutcome, Rendered};
use crate::table::aggregate;

/// Read, parse and render one job on the current thread
pub fn run_job(file_io: &FileIO, job: &ParseJob) -> ParseOutcome {
    let result = read_bytes(&job.path)
        .and_then(|bytes| file_io.load_bytes(job.kind, &bytes))
        .map(|loaded| Rendered {
            text: aggregate(&loaded.document, file_io.width_mode()),
            notes: loaded.notes,
        });

    ParseOutcome {
        token: job.token,
        result,
    }
}

/// Runs parse jobs on background threads and hands back their outcomes.
///
/// Every submitted job gets its own thread; several may be in flight. Outcomes
/// arrive in completion order, so the session decides which are stale.
pub struct ParseWorker {
    file_io: FileIO,
    sender: Sender<ParseOutcome>,
    receiver: Receiver<ParseOutcome>,
}

impl ParseWorker {
    pub fn new(file_io: FileIO) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { file_io, sender, receiver }
    }

    pub fn submit(&self, job: ParseJob) -> JoinHandle<()> {
        let file_io = self.file_io.clone();
        let tx = self.sender.clone();

        thread::spawn(move || {
            debug!(token = job.token, source = ?job.source, path = %job.path.display(), "parse started");
            let outcome = run_job(&file_io, &job);
            if tx.send(outcome).is_err() {
                error!(token = job.token, "parse result receiver dropped");
            }
        })
    }

    /// Non-blocking poll for the event loop
    pub fn try_next(&self) -> Option<ParseOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}
