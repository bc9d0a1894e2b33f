//! Per-file analysis state and the blocking / if-ready check contracts.
//!
//! Each file has a slot holding its state, an edit version, the last
//! published result and at most one in-flight check. Requests for the same
//! text join the in-flight check instead of starting another; requests for
//! newer text wait (blocking form) or queue behind it (non-blocking form,
//! latest text wins). A result is only published if no fresher version has
//! been published already.

use crate::error::CheckerFailure;
use crate::front_end::CompilerFrontEnd;
use glint_checker::TypedCheckResult;
use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Where a file is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileState {
    /// Never analyzed, or marked dirty since.
    Unanalyzed,
    /// Resolving context and parsing.
    Parsing,
    /// Type checking.
    Checking,
    /// The latest result matches the latest text.
    Ready,
    /// The last check faulted. The next request restarts analysis.
    Failed,
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unanalyzed => "unanalyzed",
            Self::Parsing => "parsing",
            Self::Checking => "checking",
            Self::Ready => "ready",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a non-blocking check request.
#[derive(Debug, Clone)]
pub enum Readiness {
    /// The result for the requested text.
    Ready(Arc<TypedCheckResult>),
    /// A check is running or was just scheduled; ask again later.
    NotReady,
    /// The check for the requested text faulted.
    Failed(CheckerFailure),
}

impl Readiness {
    /// The result, if ready.
    pub fn ready(self) -> Option<Arc<TypedCheckResult>> {
        match self {
            Self::Ready(result) => Some(result),
            Self::NotReady | Self::Failed(_) => None,
        }
    }

    /// Whether the caller should retry later.
    pub const fn is_not_ready(&self) -> bool {
        matches!(self, Self::NotReady)
    }
}

type Outcome = Result<Arc<TypedCheckResult>, CheckerFailure>;

/// A check in progress. Waiters block on the condition variable until the
/// outcome is set.
struct InFlight {
    version: u64,
    text: Arc<str>,
    outcome: Mutex<Option<Outcome>>,
    done: Condvar,
}

impl InFlight {
    fn new(version: u64, text: Arc<str>) -> Arc<Self> {
        Arc::new(Self {
            version,
            text,
            outcome: Mutex::new(None),
            done: Condvar::new(),
        })
    }

    fn complete(&self, outcome: Outcome) {
        *self.outcome.lock() = Some(outcome);
        self.done.notify_all();
    }

    fn wait(&self) -> Outcome {
        let mut outcome = self.outcome.lock();
        loop {
            if let Some(outcome) = outcome.as_ref() {
                return outcome.clone();
            }
            self.done.wait(&mut outcome);
        }
    }
}

struct Published {
    version: u64,
    result: Arc<TypedCheckResult>,
}

#[derive(Default)]
struct FileSlot {
    state: Option<FileState>,
    version: u64,
    text: Option<Arc<str>>,
    published: Option<Published>,
    failure: Option<(u64, CheckerFailure)>,
    in_flight: Option<Arc<InFlight>>,
    pending: Option<(u64, Arc<str>)>,
    /// Versions up to this one belong to a closed document and are never
    /// published.
    closed_at: u64,
}

impl FileSlot {
    fn state(&self) -> FileState {
        self.state.unwrap_or(FileState::Unanalyzed)
    }

    /// The version of `text`: the current one if it is unchanged, else a new
    /// one.
    fn observe(&mut self, text: &str) -> (u64, Arc<str>) {
        match &self.text {
            Some(current) if current.as_ref() == text && self.version > 0 => {
                (self.version, Arc::clone(current))
            }
            _ => {
                self.version += 1;
                let text: Arc<str> = Arc::from(text);
                self.text = Some(Arc::clone(&text));
                (self.version, text)
            }
        }
    }

    fn published_for(&self, version: u64) -> Option<Arc<TypedCheckResult>> {
        self.published
            .as_ref()
            .filter(|p| p.version == version)
            .map(|p| Arc::clone(&p.result))
    }

    /// Publish unless a fresher result is already published.
    fn publish(&mut self, version: u64, result: Arc<TypedCheckResult>) -> bool {
        if self.published.as_ref().is_some_and(|p| p.version > version) {
            return false;
        }
        self.published = Some(Published { version, result });
        true
    }

    fn start(&mut self, version: u64, text: Arc<str>) -> Arc<InFlight> {
        let flight = InFlight::new(version, text);
        self.in_flight = Some(Arc::clone(&flight));
        self.state = Some(FileState::Parsing);
        flight
    }

    fn owns(&self, flight: &InFlight) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|f| std::ptr::eq(Arc::as_ptr(f), flight))
    }

    /// Record the outcome of the owned check `flight`.
    fn settle(&mut self, path: &Path, flight: &InFlight, outcome: &Outcome) {
        self.in_flight = None;
        if flight.version <= self.closed_at {
            debug!(
                file = %path.display(),
                version = flight.version,
                "discarding check of a closed file"
            );
            self.state = None;
            return;
        }
        let current = self.version == flight.version;
        match outcome {
            Ok(result) => {
                if !self.publish(flight.version, Arc::clone(result)) {
                    debug!(
                        file = %path.display(),
                        version = flight.version,
                        "discarding result superseded by a fresher one"
                    );
                }
                self.state = Some(if current {
                    FileState::Ready
                } else {
                    FileState::Unanalyzed
                });
            }
            Err(failure) => {
                self.failure = Some((flight.version, failure.clone()));
                self.state = Some(if current {
                    FileState::Failed
                } else {
                    FileState::Unanalyzed
                });
            }
        }
    }
}

struct Shared {
    front_end: Arc<dyn CompilerFrontEnd>,
    files: Mutex<HashMap<PathBuf, FileSlot>>,
}

/// Orchestrates parse and check per file.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("files", &self.shared.files.lock().len())
            .finish_non_exhaustive()
    }
}

enum Step {
    Done(Arc<TypedCheckResult>),
    Join(Arc<InFlight>),
    WaitBehind(Arc<InFlight>),
    Run(Arc<InFlight>),
}

impl Coordinator {
    /// Create a coordinator over a front end.
    pub fn new(front_end: Arc<dyn CompilerFrontEnd>) -> Self {
        Self {
            shared: Arc::new(Shared {
                front_end,
                files: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The front end.
    pub fn front_end(&self) -> &Arc<dyn CompilerFrontEnd> {
        &self.shared.front_end
    }

    /// Check `text` as the contents of `path`, waiting for the result.
    ///
    /// Joins an in-flight check of the same text. If a check of other text
    /// is running, waits for it first; the check then runs on the calling
    /// thread.
    pub fn check_file(
        &self,
        path: &Path,
        text: &str,
    ) -> Result<Arc<TypedCheckResult>, CheckerFailure> {
        let (version, text) = self
            .shared
            .files
            .lock()
            .entry(path.to_path_buf())
            .or_default()
            .observe(text);
        debug!(file = %path.display(), version, "blocking check requested");

        loop {
            let step = {
                let mut files = self.shared.files.lock();
                let slot = files.entry(path.to_path_buf()).or_default();
                if let Some(result) = slot.published_for(version) {
                    Step::Done(result)
                } else {
                    match &slot.in_flight {
                        Some(flight) if flight.version == version => Step::Join(Arc::clone(flight)),
                        Some(flight) => Step::WaitBehind(Arc::clone(flight)),
                        None => Step::Run(slot.start(version, Arc::clone(&text))),
                    }
                }
            };

            match step {
                Step::Done(result) => return Ok(result),
                Step::Join(flight) => return flight.wait(),
                Step::WaitBehind(flight) => {
                    debug!(
                        file = %path.display(),
                        waiting_for = flight.version,
                        version,
                        "waiting behind in-flight check"
                    );
                    // The outcome belongs to the other text.
                    let _ = flight.wait();
                }
                Step::Run(flight) => {
                    self.run(path, &flight);
                    return flight.wait();
                }
            }
        }
    }

    /// Check `text` as the contents of `path` without waiting.
    ///
    /// Returns the result if it is already available. Otherwise schedules a
    /// background check (or queues the text behind the running one) and
    /// returns [`Readiness::NotReady`]. A faulted check is reported once;
    /// the request after that restarts analysis.
    pub fn try_check_file(&self, path: &Path, text: &str) -> Readiness {
        let mut files = self.shared.files.lock();
        let slot = files.entry(path.to_path_buf()).or_default();
        let (version, text) = slot.observe(text);

        if let Some(result) = slot.published_for(version) {
            return Readiness::Ready(result);
        }
        if slot.state() == FileState::Failed {
            if let Some((failed, failure)) = &slot.failure {
                if *failed == version {
                    let failure = failure.clone();
                    slot.state = Some(FileState::Unanalyzed);
                    return Readiness::Failed(failure);
                }
            }
        }

        match &slot.in_flight {
            Some(flight) if flight.version == version => {}
            Some(flight) => {
                debug!(
                    file = %path.display(),
                    running = flight.version,
                    queued = version,
                    "queued behind in-flight check"
                );
                slot.pending = Some((version, text));
            }
            None => {
                let flight = slot.start(version, text);
                drop(files);
                self.spawn(path.to_path_buf(), flight);
            }
        }
        Readiness::NotReady
    }

    /// Force the file to be re-analyzed on the next request, even if its
    /// text is unchanged.
    pub fn mark_dirty(&self, path: &Path) {
        let mut files = self.shared.files.lock();
        if let Some(slot) = files.get_mut(path) {
            slot.version += 1;
            if matches!(slot.state(), FileState::Ready | FileState::Failed) {
                slot.state = Some(FileState::Unanalyzed);
            }
            debug!(file = %path.display(), version = slot.version, "marked dirty");
        }
    }

    /// Forget a file. A check still in flight completes for its waiters but
    /// publishes nothing, and a request that reopens the file queues behind
    /// it.
    pub fn close(&self, path: &Path) {
        let mut files = self.shared.files.lock();
        let Some(slot) = files.get_mut(path) else {
            return;
        };
        if slot.in_flight.is_some() {
            let version = slot.version;
            *slot = FileSlot {
                version,
                closed_at: version,
                in_flight: slot.in_flight.take(),
                ..FileSlot::default()
            };
        } else {
            files.remove(path);
        }
        debug!(file = %path.display(), "closed");
    }

    /// The file's state.
    pub fn state(&self, path: &Path) -> FileState {
        self.shared
            .files
            .lock()
            .get(path)
            .map_or(FileState::Unanalyzed, FileSlot::state)
    }

    /// The last published result, which may be older than the latest text.
    pub fn latest(&self, path: &Path) -> Option<Arc<TypedCheckResult>> {
        self.shared
            .files
            .lock()
            .get(path)
            .and_then(|slot| slot.published.as_ref())
            .map(|p| Arc::clone(&p.result))
    }

    /// The file's current edit version, if it has been seen.
    pub fn version(&self, path: &Path) -> Option<u64> {
        self.shared
            .files
            .lock()
            .get(path)
            .filter(|slot| slot.text.is_some())
            .map(|slot| slot.version)
    }

    fn spawn(&self, path: PathBuf, flight: Arc<InFlight>) {
        let coordinator = self.clone();
        rayon::spawn(move || coordinator.run(&path, &flight));
    }

    /// Run one check to completion, publish it and start whatever was queued
    /// behind it.
    fn run(&self, path: &Path, flight: &Arc<InFlight>) {
        let outcome = self.analyze(path, flight);

        let next = {
            let mut files = self.shared.files.lock();
            let (next, forget) = match files.get_mut(path) {
                Some(slot) if slot.owns(flight) => {
                    slot.settle(path, flight, &outcome);
                    // Only the newest text is worth checking.
                    let next = slot
                        .pending
                        .take()
                        .filter(|(version, _)| *version == slot.version)
                        .map(|(version, text)| slot.start(version, text));
                    let forget = next.is_none() && slot.text.is_none();
                    (next, forget)
                }
                _ => (None, false),
            };
            if forget {
                files.remove(path);
            }
            next
        };

        flight.complete(outcome);
        if let Some(next) = next {
            self.spawn(path.to_path_buf(), next);
        }
    }

    fn analyze(&self, path: &Path, flight: &InFlight) -> Outcome {
        let front_end = Arc::clone(&self.shared.front_end);
        let text = Arc::clone(&flight.text);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let context = Arc::new(front_end.context(path, &text));
            let tree = Arc::new(front_end.parse(path, &text, &context));
            self.advance(path, flight, FileState::Checking);
            front_end.check(tree, context)
        }));

        match outcome {
            Ok(Ok(result)) => {
                info!(
                    file = %path.display(),
                    version = flight.version,
                    diagnostics = result.diagnostics().len(),
                    "check finished"
                );
                Ok(Arc::new(result))
            }
            Ok(Err(failure)) => {
                error!(file = %path.display(), version = flight.version, %failure, "check failed");
                Err(failure)
            }
            Err(payload) => {
                let failure = CheckerFailure::from_panic(payload.as_ref());
                error!(file = %path.display(), version = flight.version, %failure, "check panicked");
                Err(failure)
            }
        }
    }

    fn advance(&self, path: &Path, flight: &InFlight, state: FileState) {
        let mut files = self.shared.files.lock();
        if let Some(slot) = files.get_mut(path) {
            if slot.owns(flight) && flight.version > slot.closed_at {
                slot.state = Some(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::front_end::DefaultFrontEnd;

    fn result_for(text: &str) -> Arc<TypedCheckResult> {
        let front_end = DefaultFrontEnd::default();
        let path = Path::new("slot.glx");
        let context = front_end.context(path, text);
        let tree = front_end.parse(path, text, &context);
        Arc::new(
            front_end
                .check(Arc::new(tree), Arc::new(context))
                .expect("check"),
        )
    }

    #[test]
    fn test_observe_versions() {
        let mut slot = FileSlot::default();
        assert_eq!(slot.observe("let a = 1").0, 1);
        assert_eq!(slot.observe("let a = 1").0, 1);
        assert_eq!(slot.observe("let a = 2").0, 2);
        assert_eq!(slot.observe("let a = 1").0, 3);
    }

    #[test]
    fn test_publish_is_last_writer_wins() {
        let mut slot = FileSlot::default();
        let older = result_for("let a = 1");
        let newer = result_for("let a = 2");

        assert!(slot.publish(2, Arc::clone(&newer)));
        assert!(!slot.publish(1, older));
        assert!(Arc::ptr_eq(
            &slot.published_for(2).expect("published"),
            &newer
        ));
        assert!(slot.published_for(1).is_none());
    }

    #[test]
    fn test_in_flight_wait_returns_outcome() {
        let flight = InFlight::new(1, Arc::from("x"));
        let waiter = {
            let flight = Arc::clone(&flight);
            std::thread::spawn(move || flight.wait())
        };
        flight.complete(Err(CheckerFailure::internal("stop")));
        assert_eq!(
            waiter.join().expect("join").err(),
            Some(CheckerFailure::internal("stop"))
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(FileState::Checking.to_string(), "checking");
        assert_eq!(FileState::Unanalyzed.to_string(), "unanalyzed");
    }
}
