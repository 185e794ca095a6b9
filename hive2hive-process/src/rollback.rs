use hive2hive_base::Error;
use std::borrow::Cow;
use std::fmt;

/// Immutable record carried through a cancel/rollback (top-level spec §3,
/// "RollbackReason"). `origin` names the component id that first triggered
/// the cascade, for diagnostics; it is not consulted by any transition rule.
pub struct RollbackReason {
    pub hint: Cow<'static, str>,
    pub cause: Option<Error>,
    pub origin: Option<u64>,
}

impl RollbackReason {
    pub fn new(hint: impl Into<Cow<'static, str>>) -> Self {
        RollbackReason {
            hint: hint.into(),
            cause: None,
            origin: None,
        }
    }

    pub fn from_error(hint: impl Into<Cow<'static, str>>, cause: Error) -> Self {
        RollbackReason {
            hint: hint.into(),
            cause: Some(cause),
            origin: None,
        }
    }

    pub fn with_origin(mut self, origin: u64) -> Self {
        self.origin = Some(origin);
        self
    }
}

impl fmt::Debug for RollbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RollbackReason")
            .field("hint", &self.hint)
            .field("origin", &self.origin)
            .field("has_cause", &self.cause.is_some())
            .finish()
    }
}
