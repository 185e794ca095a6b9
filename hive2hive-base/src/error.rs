// We want a few things here:
// 1. A way to create a new error with a backtrace
// 2. A way to centralize setting a breakpoint to trap any error in the system fairly soon
//    after it's created (or at least when it's propagated from a library we use back to us)
// 3. Same but for logging / emitting error messages into the tracing/logging system
// 4. A way to tell, at the facade boundary, whether a failure is one of the small set of
//    precondition kinds the facade contract promises to surface synchronously (see
//    IllegalArgument et al. in the top-level spec's error surface), without growing a
//    separate error type per subsystem.

use backtrace_error::DynBacktraceError;
use std::borrow::Cow;
use tracing::error;

#[cfg(test)]
use test_log::test;

/// Precondition / control-flow kinds the facade and process framework need to
/// distinguish. `Other` covers everything that just propagates from a lower layer.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
    IllegalArgument,
    IllegalFileLocation,
    FileNotFound,
    NoSession,
    NoPeerConnection,
    InvalidState,
    Other,
}

#[derive(Debug)]
pub struct Error {
    kind: Kind,
    inner: DynBacktraceError,
}
pub type Result<T> = std::result::Result<T, Error>;

struct SimpleErr(Cow<'static, str>);
impl std::fmt::Debug for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Display for SimpleErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::error::Error for SimpleErr {
    fn description(&self) -> &str {
        &self.0
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<E> for Error {
    fn from(err: E) -> Error {
        Error::new(err)
    }
}

impl Error {
    pub fn new<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
        Error::with_kind(Kind::Other, err)
    }

    pub fn with_kind<E: std::error::Error + Send + Sync + 'static>(kind: Kind, err: E) -> Error {
        error!(target: "hive2hive", kind = ?kind, "{:?}", err);
        let dbe = DynBacktraceError::from(err);
        Error { kind, inner: dbe }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }
}

pub fn err(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::new(SimpleErr(msg.into()))
}

pub fn kind_err(kind: Kind, msg: impl Into<Cow<'static, str>>) -> Error {
    Error::with_kind(kind, SimpleErr(msg.into()))
}

#[test]
fn test_error() {
    let err = err("test error");
    assert_eq!(err.kind(), Kind::Other);
}

#[test]
fn test_kind_err() {
    let err = kind_err(Kind::FileNotFound, "nope");
    assert_eq!(err.kind(), Kind::FileNotFound);
}
