use thiserror::Error as ThisError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    NotFound,
    InvalidArgument,   // precondition violated, raised before any I/O
    Store,             // document store / connectivity failure
    NoConverter,       // no converter registered for a native value
    InvalidValue,      // converter found but the value is malformed
    Corrupt,           // index content that cannot have been written by us
    Site,
    Offline,           // answer needs a remote service while the site is offline
    Config,
    InvalidState,
    UnsupportedQuery,
}

#[derive(Debug, ThisError)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into() }
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context)
    }

    pub fn store(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Store, context)
    }

    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<zip::result::ZipError> for Error {
    fn from(err: zip::result::ZipError) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: format!("zip archive: {}", err),
        }
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error {
            kind: ErrorKind::UnsupportedQuery,
            context: format!("regex: {}", err),
        }
    }
}

impl From<chrono::ParseError> for Error {
    fn from(err: chrono::ParseError) -> Self {
        Error {
            kind: ErrorKind::InvalidValue,
            context: format!("date: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_kind_and_context() {
        let err = Error::new(ErrorKind::NotFound, "entity urn:x");
        assert_eq!(err.to_string(), "NotFound: entity urn:x");
        assert!(err.is(ErrorKind::NotFound));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err: Error = io.into();
        assert_eq!(err.kind, ErrorKind::Io);
        assert!(err.context.contains("disk gone"));
    }
}
