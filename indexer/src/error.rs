//! Error types and result definitions for the indexing pipeline.
//!
//! Every failure raised by the pipeline is an [`IndexerError`]: a classification
//! ([`ErrorKind`]), a static description, an optional dynamic detail and the callsite that
//! created it. Any error raised while transforming a record is offered to the record-error
//! hook; errors raised outside the record loop are offered to the error hook.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for pipeline operations using [`IndexerError`] as the error type.
pub type IndexerResult<T> = Result<T, IndexerError>;

/// Payload shared between clones of an [`IndexerError`].
#[derive(Debug)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Backtrace,
}

/// Main error type of the pipeline.
///
/// Cloning is cheap: clones share the same payload, which lets the dispatcher hand the exact
/// error produced by the client back to the caller after retries are exhausted.
#[derive(Debug, Clone)]
pub struct IndexerError {
    payload: Arc<ErrorPayload>,
}

/// Categories of errors that can occur while building or dispatching a batch.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    InvalidConfiguration,

    // Invocation Errors
    InvalidEventShape,

    // Record Errors
    FieldNotFound,
    UnknownEventName,
    InvalidVersion,
    ConversionError,

    // Hook Errors
    HookFailed,

    // Dispatch Errors
    DispatchFailed,
    DestinationConnectionFailed,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,

    // Unknown / Uncategorized
    Unknown,
}

impl IndexerError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.payload.kind
    }

    /// Returns the static description of this error.
    pub fn description(&self) -> &str {
        &self.payload.description
    }

    /// Returns the dynamic detail of this error, if any.
    pub fn detail(&self) -> Option<&str> {
        self.payload.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        &self.payload.backtrace
    }

    /// Returns the callsite that created this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.payload.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// The source is only attached while the payload is not shared with other clones.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let Some(payload) = Arc::get_mut(&mut self.payload) {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    /// Creates an [`IndexerError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        IndexerError {
            payload: Arc::new(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Backtrace::capture(),
            }),
        }
    }
}

impl PartialEq for IndexerError {
    /// Two errors are equal when they share kind, description and detail.
    fn eq(&self, other: &IndexerError) -> bool {
        self.kind() == other.kind()
            && self.description() == other.description()
            && self.detail() == other.detail()
    }
}

impl fmt::Display for IndexerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.payload.location;
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.payload.kind,
            self.payload.description,
            location.file(),
            location.line(),
            location.column()
        )?;

        write_detail(self.payload.detail.as_deref(), f)?;
        write_backtrace(&self.payload.backtrace, f)
    }
}

impl error::Error for IndexerError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.payload
            .source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

/// Writes the detail block, indenting every line.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(detail) = detail else {
        return Ok(());
    };

    if detail.trim().is_empty() {
        return write!(f, "\n  Detail: <empty>");
    }

    write!(f, "\n  Detail:")?;
    for line in detail.lines() {
        write!(f, "\n    {line}")?;
    }

    Ok(())
}

/// Writes the backtrace block when one was captured.
fn write_backtrace(backtrace: &Backtrace, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if backtrace.status() != BacktraceStatus::Captured {
        return Ok(());
    }

    write!(f, "\n  Backtrace:")?;
    for line in backtrace.to_string().lines() {
        write!(f, "\n    {line}")?;
    }

    Ok(())
}

/// Creates an [`IndexerError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for IndexerError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> IndexerError {
        IndexerError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`IndexerError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for IndexerError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> IndexerError {
        IndexerError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`IndexerError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for IndexerError {
    #[track_caller]
    fn from(err: std::io::Error) -> IndexerError {
        let detail = err.to_string();
        IndexerError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`IndexerError`].
///
/// Syntax, data and EOF failures map to [`ErrorKind::DeserializationError`], I/O failures to
/// [`ErrorKind::IoError`].
impl From<serde_json::Error> for IndexerError {
    #[track_caller]
    fn from(err: serde_json::Error) -> IndexerError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        IndexerError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`reqwest::Error`] to [`IndexerError`].
///
/// Connection and timeout failures map to [`ErrorKind::DestinationConnectionFailed`], everything
/// else to [`ErrorKind::DispatchFailed`].
impl From<reqwest::Error> for IndexerError {
    #[track_caller]
    fn from(err: reqwest::Error) -> IndexerError {
        let (kind, description) = if err.is_connect() || err.is_timeout() {
            (
                ErrorKind::DestinationConnectionFailed,
                "Bulk endpoint could not be reached",
            )
        } else if err.is_builder() {
            (ErrorKind::InvalidConfiguration, "Bulk client could not be built")
        } else {
            (ErrorKind::DispatchFailed, "Bulk request failed")
        };

        let detail = err.to_string();
        IndexerError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
