//! Ctrl-C delivery.
//!
//! The handler only raises a flag. Work inside the guarded region polls it with
//! [`check`] and returns [`Interrupted`], which the guard reports like any
//! other failure.

use crate::error::Interrupted;
use std::sync::atomic::{AtomicBool, Ordering};

static INSTALLED: AtomicBool = AtomicBool::new(false);
static REQUESTED: AtomicBool = AtomicBool::new(false);

/// Installs the process-wide Ctrl-C handler. Later calls are no-ops.
pub fn install() -> Result<(), ctrlc::Error> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    ctrlc::set_handler(request).inspect_err(|_| INSTALLED.store(false, Ordering::SeqCst))
}

/// What the handler does; also usable to cancel programmatically.
pub fn request() {
    REQUESTED.store(true, Ordering::SeqCst);
}

pub fn requested() -> bool {
    REQUESTED.load(Ordering::SeqCst)
}

pub fn check() -> Result<(), Interrupted> {
    if requested() {
        Err(Interrupted)
    } else {
        Ok(())
    }
}
