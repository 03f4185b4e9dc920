//! The guarded region.
//!
//! [`ErrorHandler::run`] wraps the whole program. Work that returns normally
//! leaves no trace; an error or a panic escaping the work is classified,
//! reported once through the [`Reporter`], and ends the process.

use crate::console::Console;
use crate::error::Failure;
use crate::report::Reporter;
use crate::store::StorageDirectory;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::Once;
use std::thread;

thread_local! {
    static GUARDED: Cell<bool> = const { Cell::new(false) };
    static PANIC_TRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// A failure caught at the edge of the guarded region.
#[derive(Debug)]
pub struct Interception {
    pub header: &'static str,
    pub failure: Failure,
    pub trace: String,
}

/// Owns the reporter that an interception is handed to.
pub struct ErrorHandler<S, C> {
    reporter: Reporter<S, C>,
}

impl<S, C> ErrorHandler<S, C>
where
    S: StorageDirectory,
    C: Console,
{
    pub fn new(reporter: Reporter<S, C>) -> Self {
        Self { reporter }
    }

    /// Runs `work`. Returns only if it succeeded; otherwise the failure is
    /// reported and the process exits.
    pub fn run<F, E>(self, work: F)
    where
        F: FnOnce() -> Result<(), E>,
        E: Into<Failure>,
    {
        if let Some(interception) = intercept(work) {
            self.reporter
                .log_and_exit(interception.header, &interception.failure, &interception.trace)
        }
    }
}

/// Runs `work` and hands back whatever escaped it, without reporting or exiting.
pub fn intercept<F, E>(work: F) -> Option<Interception>
where
    F: FnOnce() -> Result<(), E>,
    E: Into<Failure>,
{
    install_panic_hook();

    let outcome = {
        let _region = Region::enter();
        panic::catch_unwind(AssertUnwindSafe(work))
    };

    let (failure, trace) = match outcome {
        Ok(Ok(())) => return None,
        Ok(Err(err)) => {
            let failure: Failure = err.into();
            let trace = error_trace(&failure);
            (failure, trace)
        }
        Err(payload) => {
            let message = payload_message(payload.as_ref());
            let trace = PANIC_TRACE
                .with(|slot| slot.borrow_mut().take())
                .unwrap_or_else(|| format!("panicked: {message}"));
            (Failure::panic(message), trace)
        }
    };

    let header = failure.header();
    tracing::debug!(header, kind = failure.kind(), "intercepted failure");

    Some(Interception {
        header,
        failure,
        trace,
    })
}

/// Marks the current thread as inside a guarded region until dropped.
struct Region {
    was_guarded: bool,
}

impl Region {
    fn enter() -> Self {
        PANIC_TRACE.with(|slot| slot.borrow_mut().take());
        Self {
            was_guarded: GUARDED.with(|guarded| guarded.replace(true)),
        }
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        GUARDED.with(|guarded| guarded.set(self.was_guarded));
    }
}

/// Installs, once per process, a hook that records panics on guarded threads
/// instead of printing them. Panics elsewhere go to the previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARDED.with(Cell::get) {
                let trace = panic_trace(info.location(), info.payload());
                PANIC_TRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

fn panic_trace(location: Option<&Location<'_>>, payload: &(dyn Any + Send)) -> String {
    let current = thread::current();
    let name = current.name().unwrap_or("<unnamed>");
    let mut trace = match location {
        Some(location) => format!("thread '{name}' panicked at {location}:"),
        None => format!("thread '{name}' panicked:"),
    };
    let _ = write!(trace, "\n{}", payload_message(payload));
    let _ = write!(trace, "\nstack backtrace:\n{}", Backtrace::force_capture());
    trace
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}

/// Where the failure was raised, then `<Kind>: <message>` with the error's
/// cause chain and backtrace as `anyhow` renders them.
fn error_trace(failure: &Failure) -> String {
    let mut trace = String::new();
    if let Some(location) = failure.raised_at() {
        let _ = writeln!(trace, "raised at {location}");
    }
    trace.push_str(failure.kind());

    let rendered = format!("{:?}", failure.error());
    if !rendered.is_empty() {
        let _ = write!(trace, ": {rendered}");
    }
    trace
}
