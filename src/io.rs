//! Host-facing I/O and cancellation seams.
//!
//! The core never prints or polls the host directly; it talks through the
//! two traits here. Hosts implement [`IoSink`] over whatever console they
//! own and [`CancelProbe`] over whatever stop signal they expose; the core
//! only requires that both are callable from worker threads.
//!
//! Notes:
//! - Workers poll the probe between query rows and between thetas, so a
//!   probe must be cheap; [`CancelFlag`] is the conventional atomic-boolean
//!   implementation.
//! - [`ConsoleIo`] is the standalone default used by tests and replays.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Message sink for the run trace.
///
/// Implementations must tolerate being called from the driver thread while
/// workers run; the core itself only prints before work begins and after
/// the terminal barrier.
pub trait IoSink: Send + Sync {
    /// Emit one message (no trailing newline is added).
    fn print(&self, message: &str);

    /// Flush anything buffered to the host.
    fn flush(&self);
}

/// Standalone sink writing to stdout.
#[derive(Debug, Default)]
pub struct ConsoleIo;

impl IoSink for ConsoleIo {
    fn print(&self, message: &str) {
        print!("{message}");
    }

    fn flush(&self) {
        use std::io::Write;
        let _ = std::io::stdout().flush();
    }
}

/// Sink that swallows everything; used when a host passes verbosity 0 and
/// by unit tests that don't care about the trace.
#[derive(Debug, Default)]
pub struct SilentIo;

impl IoSink for SilentIo {
    fn print(&self, _message: &str) {}

    fn flush(&self) {}
}

/// Non-blocking cancellation predicate.
///
/// A `true` return is sticky from the core's point of view: once observed,
/// workers abandon their remaining queries and the driver reports the run
/// as cancelled.
pub trait CancelProbe: Send + Sync {
    /// Whether the host wants the run stopped.
    fn should_stop(&self) -> bool;
}

/// Probe that never fires.
#[derive(Debug, Default)]
pub struct NeverCancel;

impl CancelProbe for NeverCancel {
    fn should_stop(&self) -> bool {
        false
    }
}

/// Shared atomic cancellation flag.
///
/// Clone the handle into whatever thread owns the stop decision and call
/// [`CancelFlag::cancel`]; workers observe it through the probe trait.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    stop: Arc<AtomicBool>,
}

impl CancelFlag {
    /// A fresh, unset flag.
    pub fn new() -> CancelFlag {
        CancelFlag { stop: Arc::new(AtomicBool::new(false)) }
    }

    /// Request cancellation; visible to every worker on its next poll.
    pub fn cancel(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl CancelProbe for CancelFlag {
    fn should_stop(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}
