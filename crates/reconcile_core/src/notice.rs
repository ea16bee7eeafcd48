use std::fmt;

/// Every failure the user can be told about. `Cancelled` is deliberately absent:
/// it is a terminal state, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingFile,
    InvalidExtension,
    FileTooLarge,
    FileUnreadable,
    AlreadyProcessing,
    AmbiguousSelection,
    NotFound,
    NoReport,
    Timeout,
    BadResponse,
    ServerReported,
    TransportError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::MissingFile => "missing file",
            ErrorKind::InvalidExtension => "invalid extension",
            ErrorKind::FileTooLarge => "file too large",
            ErrorKind::FileUnreadable => "file unreadable",
            ErrorKind::AlreadyProcessing => "already processing",
            ErrorKind::AmbiguousSelection => "ambiguous selection",
            ErrorKind::NotFound => "not found",
            ErrorKind::NoReport => "no report",
            ErrorKind::Timeout => "timeout",
            ErrorKind::BadResponse => "bad response",
            ErrorKind::ServerReported => "server error",
            ErrorKind::TransportError => "network error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// A non-blocking message for the user. Stays visible until acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub severity: Severity,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            kind: None,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Success,
            kind: None,
            message: message.into(),
        }
    }

    pub fn warning(kind: Option<ErrorKind>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            message: message.into(),
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind: Some(kind),
            message: message.into(),
        }
    }
}
