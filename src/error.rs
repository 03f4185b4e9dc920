use std::any;
use std::error::Error as StdError;
use std::fmt;
use std::panic::Location;
use std::path::PathBuf;
use thiserror::Error;

/// An expected, user-actionable failure (bad configuration, a missing tool, a
/// command that did not succeed). Only its type distinguishes it from other errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct FatalError {
    pub message: String,
}

impl FatalError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The user asked the program to stop (Ctrl-C).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[error("")]
pub struct Interrupted;

/// A failure that names its own kind instead of taking it from its type.
/// Panics are reported as one of these, with kind `panic`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct UnexpectedError {
    pub kind: String,
    pub message: String,
}

impl UnexpectedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn panic(message: impl Into<String>) -> Self {
        Self::new("panic", message)
    }
}

/// The closed set of ways a failure is reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Class {
    Fatal,
    Interrupted,
    /// `kind` is the unqualified type name of the original error.
    Unexpected { kind: String },
}

/// Everything that can escape the guarded region.
///
/// Any `std::error::Error` converts into a `Failure` with `?`. The conversion
/// picks the [`Class`] by type identity, keeps the error (with its source chain
/// and, when enabled, a backtrace) and records where it happened.
#[derive(Debug)]
pub struct Failure {
    class: Class,
    error: anyhow::Error,
    raised_at: Option<&'static Location<'static>>,
}

impl Failure {
    /// Wraps an error that has already lost its concrete type. `FatalError`,
    /// `Interrupted` and `UnexpectedError` are still recognised by downcast;
    /// anything else is reported with kind `Error`.
    #[track_caller]
    pub fn from_anyhow(error: anyhow::Error) -> Self {
        Self::classify(error, any::type_name::<anyhow::Error>(), Some(Location::caller()))
    }

    /// A panic that escaped the guarded region. The panic hook already knows
    /// where it happened, so no location is recorded here.
    pub fn panic(message: impl Into<String>) -> Self {
        Self::classify(
            anyhow::Error::new(UnexpectedError::panic(message)),
            any::type_name::<UnexpectedError>(),
            None,
        )
    }

    fn classify(
        error: anyhow::Error,
        type_name: &str,
        raised_at: Option<&'static Location<'static>>,
    ) -> Self {
        let class = if error.is::<Interrupted>() {
            Class::Interrupted
        } else if error.is::<FatalError>() {
            Class::Fatal
        } else if let Some(unexpected) = error.downcast_ref::<UnexpectedError>() {
            Class::Unexpected {
                kind: unexpected.kind.clone(),
            }
        } else {
            Class::Unexpected {
                kind: short_type_name(type_name).to_string(),
            }
        };

        Self {
            class,
            error,
            raised_at,
        }
    }

    pub fn class(&self) -> &Class {
        &self.class
    }

    /// The banner printed in front of the summary line.
    ///
    /// Interruption is checked first so it wins over any other classification.
    pub fn header(&self) -> &'static str {
        match self.class {
            Class::Interrupted => "Interrupted (^C)",
            Class::Fatal => "An error has occurred",
            Class::Unexpected { .. } => "An unexpected error has occurred",
        }
    }

    pub fn kind(&self) -> &str {
        match &self.class {
            Class::Fatal => "FatalError",
            Class::Interrupted => "Interrupted",
            Class::Unexpected { kind } => kind,
        }
    }

    pub fn message(&self) -> String {
        self.error.to_string()
    }

    /// The original error.
    pub fn error(&self) -> &anyhow::Error {
        &self.error
    }

    /// Where the error became a `Failure`: the `?` or `Failure::from` call.
    pub fn raised_at(&self) -> Option<&'static Location<'static>> {
        self.raised_at
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.error)
    }
}

// `Failure` must not implement `std::error::Error`, or this overlaps
// `impl<T> From<T> for T`. For the same reason `anyhow::Error` goes through
// `Failure::from_anyhow` rather than a `From` impl.
impl<E> From<E> for Failure
where
    E: StdError + Send + Sync + 'static,
{
    #[track_caller]
    fn from(err: E) -> Self {
        Self::classify(
            anyhow::Error::new(err),
            any::type_name::<E>(),
            Some(Location::caller()),
        )
    }
}

/// Failures of the wrapped command that are not the command's own fault.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("failed to spawn `{program}`")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to wait for `{program}`")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to install the Ctrl-C handler")]
    SignalHandler(#[from] ctrlc::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no storage directory could be determined (set {env_var})")]
    NoDirectory { env_var: String },

    #[error("failed to create storage directory {path}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
#[error("failed to initialise logging")]
pub struct LoggingError(#[source] pub Box<dyn StdError + Send + Sync>);

/// Failures of the reporter itself. These are terminal: there is nothing left to
/// report them to but the console.
#[derive(Error, Debug)]
pub enum ReportError {
    #[error("could not resolve the log directory")]
    Store(#[from] StoreError),

    #[error("could not write the error log at {path}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// `core::option::Option<alloc::string::String>` becomes `Option`.
fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
