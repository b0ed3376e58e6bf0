//! Error types and result definitions for ingestion operations.
//!
//! Provides an error system with classification and captured diagnostic metadata for the
//! ingestion pipeline. [`SluiceError`] carries an [`ErrorKind`] for dispatching on failure
//! class, a static description, optional dynamic detail, and the callsite that produced it.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for ingestion operations using [`SluiceError`] as the error type.
pub type SluiceResult<T> = Result<T, SluiceError>;

/// Main error type for ingestion operations.
///
/// Errors are created through the [`crate::sluice_error!`] and [`crate::bail!`] macros or
/// through the `From` conversions below. The [`ErrorKind`] is the stable, matchable part of
/// an error; description and detail exist for diagnostics only.
#[derive(Debug, Clone)]
pub struct SluiceError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Specific categories of errors that can occur during ingestion.
///
/// The kinds are organized by failure class: caller mistakes, unsupported value shapes
/// discovered during normalization, message decoding problems, and warehouse failures.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Caller errors, never retried.
    InvalidIdentifier,

    // Value shape errors raised during schema inference.
    UnsupportedValue,
    EmptyValue,
    MixedArrayShapes,
    NestedArrays,
    InvalidData,

    // Message decoding errors.
    MissingAttribute,
    DeserializationError,
    SerializationError,
    ConversionError,
    IoError,

    // Warehouse errors.
    DestinationTableMissing,
    DestinationQueryFailed,
    DestinationConnectionFailed,
    AuthenticationError,

    // Unknown / uncategorized.
    Unknown,
}

impl SluiceError {
    /// Returns the [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the detailed error information if available.
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified
    /// instance.
    ///
    /// The stored source is preserved across clones and exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Creates a [`SluiceError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        SluiceError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for SluiceError {
    fn eq(&self, other: &SluiceError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for SluiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            write!(f, " (detail: {detail})")?;
        }

        Ok(())
    }
}

impl error::Error for SluiceError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source as &(dyn error::Error + 'static))
    }
}

/// Creates a [`SluiceError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for SluiceError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> SluiceError {
        SluiceError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`SluiceError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for SluiceError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> SluiceError {
        SluiceError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`SluiceError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for SluiceError {
    #[track_caller]
    fn from(err: std::io::Error) -> SluiceError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SluiceError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`serde_json::Error`] to [`SluiceError`] with the appropriate error kind.
///
/// Maps to [`ErrorKind::SerializationError`] for serialization failures and
/// [`ErrorKind::DeserializationError`] for deserialization failures based on error
/// classification.
impl From<serde_json::Error> for SluiceError {
    #[track_caller]
    fn from(err: serde_json::Error) -> SluiceError {
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
        let source = Arc::new(err);
        SluiceError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`std::str::Utf8Error`] to [`SluiceError`] with [`ErrorKind::ConversionError`].
impl From<std::str::Utf8Error> for SluiceError {
    #[track_caller]
    fn from(err: std::str::Utf8Error) -> SluiceError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SluiceError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("UTF-8 conversion failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`std::string::FromUtf8Error`] to [`SluiceError`] with [`ErrorKind::ConversionError`].
impl From<std::string::FromUtf8Error> for SluiceError {
    #[track_caller]
    fn from(err: std::string::FromUtf8Error) -> SluiceError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SluiceError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("UTF-8 string conversion failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`base64::DecodeError`] to [`SluiceError`] with [`ErrorKind::DeserializationError`].
impl From<base64::DecodeError> for SluiceError {
    #[track_caller]
    fn from(err: base64::DecodeError) -> SluiceError {
        let detail = err.to_string();
        let source = Arc::new(err);
        SluiceError::from_components(
            ErrorKind::DeserializationError,
            Cow::Borrowed("Base64 decoding failed"),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}

/// Converts [`gcp_bigquery_client::error::BQError`] to [`SluiceError`] with the appropriate
/// error kind.
///
/// An HTTP 404 response maps to [`ErrorKind::DestinationTableMissing`], which the ingest
/// coordinator treats as the trigger for the create-then-retry path rather than a failure.
#[cfg(feature = "bigquery")]
impl From<gcp_bigquery_client::error::BQError> for SluiceError {
    #[track_caller]
    fn from(err: gcp_bigquery_client::error::BQError) -> SluiceError {
        use gcp_bigquery_client::error::BQError;

        let (kind, description) = match &err {
            BQError::ResponseError { error } if error.error.code == 404 => (
                ErrorKind::DestinationTableMissing,
                "BigQuery entity not found",
            ),
            BQError::ResponseError { .. } => {
                (ErrorKind::DestinationQueryFailed, "BigQuery response error")
            }
            BQError::RequestError(_) => (
                ErrorKind::DestinationConnectionFailed,
                "BigQuery request failed",
            ),
            BQError::InvalidServiceAccountKey(_) => (
                ErrorKind::AuthenticationError,
                "Invalid BigQuery service account key",
            ),
            BQError::SerializationError(_) => (
                ErrorKind::SerializationError,
                "BigQuery JSON serialization error",
            ),
            BQError::NoDataAvailable => (
                ErrorKind::DestinationQueryFailed,
                "BigQuery result set positioning error",
            ),
            _ => (ErrorKind::DestinationQueryFailed, "BigQuery operation failed"),
        };

        let detail = err.to_string();
        let source = Arc::new(err);
        SluiceError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(source),
        )
    }
}
