use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

use indexer::error::IndexerError;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for replicator operations.
pub type ReplicatorResult<T> = Result<T, ReplicatorError>;

/// Backtrace captured when a non-pipeline error is created.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type of the replicator binary.
///
/// Wraps [`IndexerError`] for pipeline failures and adds variants for the surrounding
/// infrastructure.
#[derive(Debug)]
pub enum ReplicatorError {
    /// Pipeline construction or invocation error.
    Indexer(IndexerError),
    /// Configuration error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error while reading the event or writing the result.
    Io(std::io::Error, CapturedBacktrace),
}

impl ReplicatorError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            ReplicatorError::Indexer(_) => "pipeline error",
            ReplicatorError::Config(_, _) => "configuration error",
            ReplicatorError::Io(_, _) => "i/o error",
        }
    }

    pub fn backtrace(&self) -> &Backtrace {
        match self {
            ReplicatorError::Indexer(err) => err.backtrace(),
            ReplicatorError::Config(_, captured) => &captured.0,
            ReplicatorError::Io(_, captured) => &captured.0,
        }
    }

    /// Creates a configuration error from any error type.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        ReplicatorError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("indexer replicator failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {self}\n"));

        let mut source = Error::source(self);
        let mut idx = 1usize;
        while let Some(err) = source {
            out.push_str(&format!("cause {idx}: {err}\n"));
            source = err.source();
            idx += 1;
        }

        if should_render_backtrace() && !matches!(self, ReplicatorError::Indexer(_)) {
            out.push_str("backtrace:\n");
            out.push_str(&self.backtrace().to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for ReplicatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplicatorError::Indexer(err) => write!(f, "{err}"),
            ReplicatorError::Config(source, _) => write!(f, "configuration error: {source}"),
            ReplicatorError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for ReplicatorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ReplicatorError::Indexer(err) => err.source(),
            ReplicatorError::Config(source, _) => Some(source.as_ref()),
            ReplicatorError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for ReplicatorError {
    fn from(err: std::io::Error) -> Self {
        ReplicatorError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<IndexerError> for ReplicatorError {
    fn from(err: IndexerError) -> Self {
        ReplicatorError::Indexer(err)
    }
}

#[cfg(test)]
mod tests {
    use indexer::error::ErrorKind;
    use indexer::indexer_error;

    use super::*;

    #[test]
    fn report_lists_category_and_causes() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "event.json missing");
        let err = ReplicatorError::config(io);

        let report = err.render_report();

        assert!(report.contains("category: configuration error"));
        assert!(report.contains("error: configuration error: event.json missing"));
        assert!(report.contains("cause 1: event.json missing"));
    }

    #[test]
    fn pipeline_errors_keep_their_kind() {
        let err: ReplicatorError =
            indexer_error!(ErrorKind::DispatchFailed, "Bulk request failed", "down").into();

        assert_eq!(err.category(), "pipeline error");
        assert!(err.to_string().starts_with("[DispatchFailed] Bulk request failed"));
    }
}
