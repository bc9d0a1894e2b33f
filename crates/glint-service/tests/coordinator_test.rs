//! Coordinator state machine, readiness and last-writer-wins behavior.

use glint_checker::TypedCheckResult;
use glint_parser::UntypedTree;
use glint_project::CompilationContext;
use glint_service::{
    CheckerFailure, CompilerFrontEnd, Coordinator, DefaultFrontEnd, FileState, Readiness,
};
use parking_lot::{Condvar, Mutex};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(10);

/// Holds checks until opened.
struct Gate {
    open: Mutex<bool>,
    cond: Condvar,
}

impl Gate {
    fn new(open: bool) -> Self {
        Self {
            open: Mutex::new(open),
            cond: Condvar::new(),
        }
    }

    fn open(&self) {
        *self.open.lock() = true;
        self.cond.notify_all();
    }

    fn pass(&self) {
        let mut open = self.open.lock();
        while !*open {
            self.cond.wait(&mut open);
        }
    }
}

/// Delegates to the real front end, counting checks and announcing each one
/// before it passes the gate. Text containing `boom` panics; text containing
/// `fault` reports an internal failure.
struct ScriptedFrontEnd {
    inner: DefaultFrontEnd,
    checks: AtomicUsize,
    gate: Gate,
    started: Mutex<Sender<String>>,
}

impl ScriptedFrontEnd {
    fn new(open: bool) -> (Arc<Self>, Receiver<String>) {
        let (tx, rx) = mpsc::channel();
        let front_end = Arc::new(Self {
            inner: DefaultFrontEnd::default(),
            checks: AtomicUsize::new(0),
            gate: Gate::new(open),
            started: Mutex::new(tx),
        });
        (front_end, rx)
    }

    fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl CompilerFrontEnd for ScriptedFrontEnd {
    fn parse(&self, path: &Path, text: &str, context: &CompilationContext) -> UntypedTree {
        self.inner.parse(path, text, context)
    }

    fn check(
        &self,
        tree: Arc<UntypedTree>,
        context: Arc<CompilationContext>,
    ) -> Result<TypedCheckResult, CheckerFailure> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let _ = self.started.lock().send(tree.source().to_string());
        self.gate.pass();
        if tree.source().contains("boom") {
            panic!("front end exploded");
        }
        if tree.source().contains("fault") {
            return Err(CheckerFailure::internal("catalog unavailable"));
        }
        self.inner.check(tree, context)
    }
}

fn coordinator(front_end: &Arc<ScriptedFrontEnd>) -> Coordinator {
    Coordinator::new(Arc::clone(front_end) as Arc<dyn CompilerFrontEnd>)
}

fn poll(coordinator: &Coordinator, path: &Path, text: &str) -> Readiness {
    for _ in 0..1000 {
        match coordinator.try_check_file(path, text) {
            Readiness::NotReady => thread::sleep(Duration::from_millis(10)),
            other => return other,
        }
    }
    panic!("check of {} never became ready", path.display());
}

#[test]
fn test_blocking_check_publishes_and_caches() {
    let (front_end, _started) = ScriptedFrontEnd::new(true);
    let coordinator = coordinator(&front_end);
    let path = Path::new("cache.glx");
    assert_eq!(coordinator.state(path), FileState::Unanalyzed);

    let first = coordinator.check_file(path, "let a = 1").expect("check");
    assert_eq!(coordinator.state(path), FileState::Ready);
    assert_eq!(coordinator.version(path), Some(1));

    let second = coordinator.check_file(path, "let a = 1").expect("check");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(front_end.checks(), 1);

    let latest = coordinator.latest(path).expect("published");
    assert!(Arc::ptr_eq(&first, &latest));
}

#[test]
fn test_overlapping_requests_share_one_check() {
    let (front_end, started) = ScriptedFrontEnd::new(false);
    let coordinator = coordinator(&front_end);
    let path = Path::new("overlap.glx");
    let text = "let greeting = \"hello\"";

    let first = {
        let coordinator = coordinator.clone();
        thread::spawn(move || coordinator.check_file(Path::new("overlap.glx"), text))
    };
    started.recv_timeout(TIMEOUT).expect("check started");
    assert_eq!(coordinator.state(path), FileState::Checking);

    // The if-ready form answers immediately while the check is held.
    assert!(coordinator.try_check_file(path, text).is_not_ready());

    let second = {
        let coordinator = coordinator.clone();
        thread::spawn(move || coordinator.check_file(Path::new("overlap.glx"), text))
    };
    front_end.gate.open();

    let first = first.join().expect("join").expect("check");
    let second = second.join().expect("join").expect("check");
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(front_end.checks(), 1);
    assert!(coordinator.try_check_file(path, text).ready().is_some());
}

#[test]
fn test_try_check_schedules_in_background() {
    let (front_end, started) = ScriptedFrontEnd::new(false);
    let coordinator = coordinator(&front_end);
    let path = Path::new("background.glx");
    let text = "let x = 1";

    assert!(coordinator.try_check_file(path, text).is_not_ready());
    assert_eq!(started.recv_timeout(TIMEOUT).expect("started"), text);
    assert!(coordinator.try_check_file(path, text).is_not_ready());
    assert!(coordinator.latest(path).is_none());

    front_end.gate.open();
    let result = poll(&coordinator, path, text).ready().expect("ready");
    assert_eq!(result.tree().source(), text);
    assert_eq!(coordinator.state(path), FileState::Ready);
    assert_eq!(front_end.checks(), 1);
}

#[test]
fn test_queued_text_latest_wins() {
    let (front_end, started) = ScriptedFrontEnd::new(false);
    let coordinator = coordinator(&front_end);
    let path = Path::new("queue.glx");

    assert!(coordinator.try_check_file(path, "let v = 1").is_not_ready());
    assert_eq!(started.recv_timeout(TIMEOUT).expect("started"), "let v = 1");

    assert!(coordinator.try_check_file(path, "let v = 2").is_not_ready());
    assert!(coordinator.try_check_file(path, "let v = 3").is_not_ready());
    assert_eq!(coordinator.version(path), Some(3));

    front_end.gate.open();
    let result = coordinator.check_file(path, "let v = 3").expect("check");
    assert_eq!(result.tree().source(), "let v = 3");
    assert_eq!(started.recv_timeout(TIMEOUT).expect("started"), "let v = 3");

    // The intermediate text was never checked.
    assert_eq!(front_end.checks(), 2);
    let latest = coordinator.latest(path).expect("published");
    assert!(Arc::ptr_eq(&latest, &result));
    assert_eq!(coordinator.state(path), FileState::Ready);
}

#[test]
fn test_newer_text_waits_for_in_flight_check() {
    let (front_end, started) = ScriptedFrontEnd::new(false);
    let coordinator = coordinator(&front_end);
    let path = Path::new("serial.glx");

    let old = {
        let coordinator = coordinator.clone();
        thread::spawn(move || coordinator.check_file(Path::new("serial.glx"), "let n = 1"))
    };
    started.recv_timeout(TIMEOUT).expect("started");

    let new = {
        let coordinator = coordinator.clone();
        thread::spawn(move || coordinator.check_file(Path::new("serial.glx"), "let n = 2"))
    };
    front_end.gate.open();

    let old = old.join().expect("join").expect("check");
    let new = new.join().expect("join").expect("check");
    assert_eq!(old.tree().source(), "let n = 1");
    assert_eq!(new.tree().source(), "let n = 2");
    assert_eq!(front_end.checks(), 2);

    let latest = coordinator.latest(path).expect("published");
    assert_eq!(latest.tree().source(), "let n = 2");
}

#[test]
fn test_mark_dirty_forces_recheck() {
    let (front_end, _started) = ScriptedFrontEnd::new(true);
    let coordinator = coordinator(&front_end);
    let path = Path::new("dirty.glx");

    let first = coordinator.check_file(path, "let a = 1").expect("check");
    coordinator.mark_dirty(path);
    assert_eq!(coordinator.state(path), FileState::Unanalyzed);
    assert!(coordinator.latest(path).is_some());

    let second = coordinator.check_file(path, "let a = 1").expect("check");
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(front_end.checks(), 2);
    assert_eq!(coordinator.version(path), Some(2));
}

#[test]
fn test_panic_is_a_checker_failure() {
    let (front_end, _started) = ScriptedFrontEnd::new(true);
    let coordinator = coordinator(&front_end);
    let path = Path::new("panic.glx");

    let failure = coordinator
        .check_file(path, "let boom = 1")
        .expect_err("panic surfaces as failure");
    assert_eq!(
        failure,
        CheckerFailure::Panicked {
            message: "front end exploded".to_string()
        }
    );
    assert_eq!(coordinator.state(path), FileState::Failed);
    assert!(coordinator.latest(path).is_none());

    // A fresh request restarts analysis.
    coordinator.check_file(path, "let fine = 1").expect("check");
    assert_eq!(coordinator.state(path), FileState::Ready);
}

#[test]
fn test_try_check_reports_failure_then_retries() {
    let (front_end, _started) = ScriptedFrontEnd::new(true);
    let coordinator = coordinator(&front_end);
    let path = Path::new("fault.glx");
    let text = "let fault = 1";

    match poll(&coordinator, path, text) {
        Readiness::Failed(failure) => {
            assert_eq!(failure, CheckerFailure::internal("catalog unavailable"));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(coordinator.state(path), FileState::Unanalyzed);

    assert!(matches!(
        poll(&coordinator, path, text),
        Readiness::Failed(_)
    ));
    assert_eq!(front_end.checks(), 2);
}

#[test]
fn test_close_forgets_file() {
    let (front_end, _started) = ScriptedFrontEnd::new(true);
    let coordinator = coordinator(&front_end);
    let path = Path::new("closed.glx");

    coordinator.check_file(path, "let a = 1").expect("check");
    coordinator.close(path);
    assert_eq!(coordinator.state(path), FileState::Unanalyzed);
    assert!(coordinator.latest(path).is_none());
    assert_eq!(coordinator.version(path), None);
}

#[test]
fn test_reopen_during_check_queues_behind_it() {
    let (front_end, started) = ScriptedFrontEnd::new(false);
    let coordinator = coordinator(&front_end);
    let path = Path::new("reopen.glx");

    assert!(coordinator.try_check_file(path, "let a = 1").is_not_ready());
    assert_eq!(started.recv_timeout(TIMEOUT).expect("started"), "let a = 1");

    coordinator.close(path);
    assert_eq!(coordinator.state(path), FileState::Unanalyzed);
    assert_eq!(coordinator.version(path), None);

    // The reopened file must wait for the check that is still running.
    assert!(coordinator.try_check_file(path, "let a = 2").is_not_ready());
    assert!(started.try_recv().is_err());
    assert_eq!(front_end.checks(), 1);

    front_end.gate.open();
    let result = poll(&coordinator, path, "let a = 2").ready().expect("ready");
    assert_eq!(result.tree().source(), "let a = 2");
    assert_eq!(started.recv_timeout(TIMEOUT).expect("started"), "let a = 2");
    assert_eq!(front_end.checks(), 2);

    let latest = coordinator.latest(path).expect("published");
    assert!(Arc::ptr_eq(&latest, &result));
}

#[test]
fn test_close_during_check_publishes_nothing() {
    let (front_end, started) = ScriptedFrontEnd::new(false);
    let coordinator = coordinator(&front_end);
    let path = Path::new("gone.glx");

    let waiter = {
        let coordinator = coordinator.clone();
        thread::spawn(move || coordinator.check_file(Path::new("gone.glx"), "let g = 1"))
    };
    started.recv_timeout(TIMEOUT).expect("started");
    coordinator.close(path);
    front_end.gate.open();

    // The waiter still gets its result.
    let result = waiter.join().expect("join").expect("check");
    assert_eq!(result.tree().source(), "let g = 1");
    assert!(coordinator.latest(path).is_none());
    assert_eq!(coordinator.state(path), FileState::Unanalyzed);
}

#[test]
fn test_superseded_queued_text_is_skipped() {
    let (front_end, started) = ScriptedFrontEnd::new(false);
    let coordinator = coordinator(&front_end);
    let path = Path::new("skip.glx");

    assert!(coordinator.try_check_file(path, "let a = 1").is_not_ready());
    assert_eq!(started.recv_timeout(TIMEOUT).expect("started"), "let a = 1");
    assert!(coordinator.try_check_file(path, "let a = 2").is_not_ready());

    let blocking = {
        let coordinator = coordinator.clone();
        thread::spawn(move || coordinator.check_file(Path::new("skip.glx"), "let a = 3"))
    };
    while coordinator.version(path) != Some(3) {
        thread::sleep(Duration::from_millis(5));
    }
    front_end.gate.open();

    let result = blocking.join().expect("join").expect("check");
    assert_eq!(result.tree().source(), "let a = 3");
    assert_eq!(started.recv_timeout(TIMEOUT).expect("started"), "let a = 3");
    assert_eq!(front_end.checks(), 2);
}

#[test]
fn test_files_are_independent() {
    let (front_end, _started) = ScriptedFrontEnd::new(true);
    let coordinator = coordinator(&front_end);

    let handles: Vec<_> = ["one.glx", "two.glx", "three.glx"]
        .into_iter()
        .map(|name| {
            let coordinator = coordinator.clone();
            thread::spawn(move || coordinator.check_file(Path::new(name), "let z = 0"))
        })
        .collect();
    for handle in handles {
        handle.join().expect("join").expect("check");
    }

    assert_eq!(front_end.checks(), 3);
    for name in ["one.glx", "two.glx", "three.glx"] {
        assert_eq!(coordinator.state(Path::new(name)), FileState::Ready);
    }
}

#[test]
fn test_syntax_errors_are_not_failures() {
    let coordinator = Coordinator::new(Arc::new(DefaultFrontEnd::default()));
    let result = coordinator
        .check_file(Path::new("broken.glx"), "let = = 1")
        .expect("syntax errors are diagnostics");
    assert!(result.has_errors());
    assert_eq!(
        coordinator.state(Path::new("broken.glx")),
        FileState::Ready
    );
}
