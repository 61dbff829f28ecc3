//! Per-attempt diagnostics sink handed to the catalog and the graph containers.
//!
//! Every issue is recorded so callers and tests can inspect what went wrong
//! during an attempt, and is forwarded to the `log` facade when logging is
//! enabled for the scope.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

const LOG_TARGET: &str = "regiongen";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace,
    Warn,
    Error,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    /// Shape bounds are not square.
    NonSquareCell,
    /// A second edge connector on the same side, away from the first.
    DuplicateConnector,
    /// Every pick phase came up empty; the palette lacks variations.
    ThinPalette,
    /// No shape of a cardinal type was registered.
    MissingCellType,
    /// A forced edge removal disconnected the grid.
    IntegrityViolation,
    /// An operation was called with a non-cardinal direction.
    InvalidDirection,
    /// Generator-level failures: unplaceable cells, unreachable destinations.
    Generation,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    pub severity: Severity,
    pub kind: IssueKind,
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} {:?}: {}", self.severity, self.kind, self.message)
    }
}

/// Cloneable handle; clones share the same issue list.
#[derive(Clone, Debug)]
pub struct Diagnostics {
    scope: Rc<str>,
    log_enabled: bool,
    issues: Rc<RefCell<Vec<Issue>>>,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new("region")
    }
}

impl Diagnostics {
    pub fn new(scope: &str) -> Self {
        Self { scope: Rc::from(scope), log_enabled: true, issues: Rc::default() }
    }

    /// Records issues without forwarding them to the logger.
    pub fn quiet(scope: &str) -> Self {
        Self { log_enabled: false, ..Self::new(scope) }
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    pub fn trace(&self, kind: IssueKind, message: impl Into<String>) {
        self.push(Severity::Trace, kind, message.into());
    }

    pub fn warn(&self, kind: IssueKind, message: impl Into<String>) {
        self.push(Severity::Warn, kind, message.into());
    }

    pub fn error(&self, kind: IssueKind, message: impl Into<String>) {
        self.push(Severity::Error, kind, message.into());
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.issues.borrow().clone()
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues.borrow().iter().filter(|issue| issue.kind == kind).count()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.borrow().iter().any(|issue| issue.severity == Severity::Error)
    }

    pub fn clear(&self) {
        self.issues.borrow_mut().clear();
    }

    fn push(&self, severity: Severity, kind: IssueKind, message: String) {
        if self.log_enabled {
            match severity {
                Severity::Trace => log::trace!(target: LOG_TARGET, "[{}] {message}", self.scope),
                Severity::Warn => log::warn!(target: LOG_TARGET, "[{}] {message}", self.scope),
                Severity::Error => log::error!(target: LOG_TARGET, "[{}] {message}", self.scope),
            }
        }
        self.issues.borrow_mut().push(Issue { severity, kind, message });
    }
}
