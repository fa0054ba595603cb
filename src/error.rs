//! Contains the `Error` and `Result` types that `mongodb_executor` uses.

#[cfg(test)]
mod test;

use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    bson::{Bson, Document},
    sdam::ServerType,
};

pub(crate) const RETRYABLE_READ_CODES: [i32; 13] = [
    11600, 11602, 10107, 13435, 13436, 189, 91, 7, 6, 89, 9001, 134, 262,
];
pub(crate) const RETRYABLE_WRITE_CODES: [i32; 12] = [
    11600, 11602, 10107, 13435, 13436, 189, 91, 7, 6, 89, 9001, 262,
];

/// Retryable write error label. This label will be added to an error when the error is
/// write-retryable.
pub const RETRYABLE_WRITE_ERROR: &str = "RetryableWriteError";
/// Transient transaction error label. This label will be added to a network error or server
/// selection error that occurs during a transaction.
pub const TRANSIENT_TRANSACTION_ERROR: &str = "TransientTransactionError";
/// Label attached by the server to a failed retry that did not perform any writes. When a retry
/// fails with this label, the error from the first attempt is surfaced instead.
pub const NO_WRITES_PERFORMED: &str = "NoWritesPerformed";

/// The result type for all methods that can return an error in the `mongodb_executor` crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error that can occur in the `mongodb_executor` crate. The inner
/// [`ErrorKind`](enum.ErrorKind.html) is wrapped in an `Box` to allow the errors to be
/// cloned.
#[derive(Clone, Debug, Error)]
#[cfg_attr(
    feature = "error-backtrace",
    error("Kind: {kind}, labels: {labels:?}, source: {source:?}, backtrace: {backtrace}")
)]
#[cfg_attr(
    not(feature = "error-backtrace"),
    error("Kind: {kind}, labels: {labels:?}, source: {source:?}")
)]
#[non_exhaustive]
pub struct Error {
    /// The type of error that occurred.
    pub kind: Box<ErrorKind>,

    labels: HashSet<String>,

    pub(crate) wire_version: Option<i32>,

    #[source]
    pub(crate) source: Option<Box<Error>>,

    #[cfg(feature = "error-backtrace")]
    pub(crate) backtrace: Arc<std::backtrace::Backtrace>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, labels: Option<impl IntoIterator<Item = String>>) -> Self {
        let mut labels: HashSet<String> = labels
            .map(|labels| labels.into_iter().collect())
            .unwrap_or_default();
        if let Some(wc) = kind.get_write_concern_error() {
            labels.extend(wc.labels.clone());
        }
        Self {
            kind: Box::new(kind),
            labels,
            wire_version: None,
            source: None,
            #[cfg(feature = "error-backtrace")]
            backtrace: Arc::new(std::backtrace::Backtrace::capture()),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Error {
        ErrorKind::Internal {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_response(message: impl Into<String>) -> Error {
        ErrorKind::InvalidResponse {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn invalid_argument(message: impl Into<String>) -> Error {
        ErrorKind::InvalidArgument {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn incompatible_server(message: impl Into<String>) -> Error {
        ErrorKind::IncompatibleServer {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn transaction(message: impl Into<String>) -> Error {
        ErrorKind::Transaction {
            message: message.into(),
        }
        .into()
    }

    pub(crate) fn unexpected_server_response(message: impl Into<String>) -> Error {
        ErrorKind::UnexpectedServerResponse {
            message: message.into(),
        }
        .into()
    }

    /// Construct a generic network timeout error.
    #[cfg(test)]
    pub(crate) fn network_timeout() -> Error {
        ErrorKind::Io(Arc::new(std::io::ErrorKind::TimedOut.into())).into()
    }

    pub(crate) fn is_server_selection_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::ServerSelection { .. })
    }

    fn is_write_concern_error(&self) -> bool {
        match *self.kind {
            ErrorKind::Write(WriteFailure::WriteConcernError(_)) => true,
            ErrorKind::InsertMany(ref insert_many_error)
                if insert_many_error.write_concern_error.is_some() =>
            {
                true
            }
            _ => false,
        }
    }

    /// Whether a "RetryableWriteError" label should be added to this error. If max_wire_version
    /// indicates a 4.4+ server, a label should only be added if the error is a network error.
    /// Otherwise, a label should be added if the error is a network error or the error code
    /// matches one of the retryable write codes.
    pub(crate) fn should_add_retryable_write_label(
        &self,
        max_wire_version: i32,
        server_type: Option<ServerType>,
    ) -> bool {
        if max_wire_version > 8 {
            return self.is_network_error();
        }
        if self.is_network_error() {
            return true;
        }

        if server_type == Some(ServerType::Mongos) && self.is_write_concern_error() {
            return false;
        }

        match &self.sdam_code() {
            Some(code) => RETRYABLE_WRITE_CODES.contains(code),
            None => false,
        }
    }

    /// Whether an error originated from the server.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self.kind.as_ref(),
            ErrorKind::InsertMany(_) | ErrorKind::Command(_) | ErrorKind::Write(_)
        )
    }

    /// Returns the labels for this error.
    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }

    /// Whether this error contains the specified label.
    pub fn contains_label<T: AsRef<str>>(&self, label: T) -> bool {
        let label = label.as_ref();
        self.labels().contains(label)
            || self
                .source
                .as_ref()
                .map(|source| source.contains_label(label))
                .unwrap_or(false)
    }

    /// Adds the given label to this error.
    pub(crate) fn add_label<T: AsRef<str>>(&mut self, label: T) {
        let label = label.as_ref().to_string();
        self.labels.insert(label);
    }

    /// Whether this error was caused by a failure of the underlying transport.
    pub fn is_network_error(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Io(..))
    }

    /// Gets the server error code used to classify this error, if applicable.
    /// Any codes contained in WriteErrors are ignored.
    pub fn sdam_code(&self) -> Option<i32> {
        match self.kind.as_ref() {
            ErrorKind::Command(command_error) => Some(command_error.code),
            // Write concern error codes are checked as well; individual writeError codes are not.
            ErrorKind::InsertMany(InsertManyError {
                write_concern_error: Some(wc_error),
                ..
            }) => Some(wc_error.code),
            ErrorKind::Write(WriteFailure::WriteConcernError(wc_error)) => Some(wc_error.code),
            _ => None,
        }
        .or_else(|| self.source.as_ref().and_then(|s| s.sdam_code()))
    }

    /// Whether the server reported that the targeted namespace does not exist.
    pub(crate) fn is_ns_not_found(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::Command(ref err) if err.code == 26)
    }

    /// The error message reported by the server, if this error originated from a command reply.
    pub(crate) fn command_message(&self) -> Option<&str> {
        match self.kind.as_ref() {
            ErrorKind::Command(command_error) => Some(command_error.message.as_str()),
            _ => None,
        }
    }

    /// The source of this error, if it wraps another error.
    pub fn source_error(&self) -> Option<&Error> {
        self.source.as_deref()
    }

    /// The max wire version of the server this error was returned from, if known.
    pub fn wire_version(&self) -> Option<i32> {
        self.wire_version
    }

    pub(crate) fn with_source<E: Into<Option<Error>>>(mut self, source: E) -> Self {
        self.source = source.into().map(Box::new);
        self
    }

    #[cfg(test)]
    pub(crate) fn is_invalid_argument(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::InvalidArgument { .. })
    }

    #[cfg(test)]
    pub(crate) fn is_incompatible_server(&self) -> bool {
        matches!(self.kind.as_ref(), ErrorKind::IncompatibleServer { .. })
    }

    /// Gets the message for this error, if applicable, for use in testing.
    #[cfg(test)]
    pub(crate) fn message(&self) -> Option<String> {
        match self.kind.as_ref() {
            ErrorKind::Command(command_error) => Some(command_error.message.clone()),
            ErrorKind::Write(WriteFailure::WriteConcernError(wc_error)) => {
                Some(wc_error.message.clone())
            }
            ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
                Some(write_error.message.clone())
            }
            ErrorKind::Transaction { message }
            | ErrorKind::IncompatibleServer { message }
            | ErrorKind::InvalidArgument { message }
            | ErrorKind::Internal { message }
            | ErrorKind::UnexpectedServerResponse { message }
            | ErrorKind::ServerSelection { message } => Some(message.clone()),
            _ => None,
        }
    }
}

impl<E> From<E> for Error
where
    ErrorKind: From<E>,
{
    fn from(err: E) -> Self {
        Error::new(err.into(), None::<Option<String>>)
    }
}

impl From<crate::bson::de::Error> for ErrorKind {
    fn from(err: crate::bson::de::Error) -> Self {
        Self::BsonDeserialization(err)
    }
}

impl From<crate::bson::ser::Error> for ErrorKind {
    fn from(err: crate::bson::ser::Error) -> Self {
        Self::BsonSerialization(err)
    }
}

impl From<crate::bson::document::ValueAccessError> for ErrorKind {
    fn from(err: crate::bson::document::ValueAccessError) -> Self {
        Self::InvalidResponse {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ErrorKind {
    fn from(err: std::io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<std::io::ErrorKind> for ErrorKind {
    fn from(err: std::io::ErrorKind) -> Self {
        Self::Io(Arc::new(err.into()))
    }
}

/// The types of errors that can occur.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// An invalid argument was provided.
    #[error("An invalid argument was provided: {message}")]
    #[non_exhaustive]
    InvalidArgument { message: String },

    /// Wrapper around `bson::de::Error`.
    #[error("{0}")]
    BsonDeserialization(crate::bson::de::Error),

    /// Wrapper around `bson::ser::Error`.
    #[error("{0}")]
    BsonSerialization(crate::bson::ser::Error),

    /// An error occurred when trying to execute an insert of multiple documents.
    #[error("An error occurred when trying to execute an insert_many operation: {0:?}")]
    InsertMany(InsertManyError),

    /// The server returned an error to an attempted operation.
    #[error("Command failed: {0}")]
    Command(CommandError),

    #[error("Internal error: {message}")]
    #[non_exhaustive]
    Internal { message: String },

    /// Wrapper around [`std::io::Error`](https://doc.rust-lang.org/std/io/struct.Error.html).
    #[error("I/O error: {0}")]
    Io(Arc<std::io::Error>),

    /// The server returned an invalid reply to a database operation.
    #[error("The server returned an invalid reply to a database operation: {message}")]
    #[non_exhaustive]
    InvalidResponse { message: String },

    /// The server selected for a retry cannot run the operation being retried.
    #[error("{message}")]
    #[non_exhaustive]
    UnexpectedServerResponse { message: String },

    /// The Client was not able to select a server for the operation.
    #[error("{message}")]
    #[non_exhaustive]
    ServerSelection { message: String },

    /// An error occurred when trying to execute a write operation.
    #[error("An error occurred when trying to execute a write operation: {0:?}")]
    Write(WriteFailure),

    /// An error occurred during a transaction.
    #[error("{message}")]
    #[non_exhaustive]
    Transaction { message: String },

    /// The server does not support the operation.
    #[error("The server does not support a database operation: {message}")]
    #[non_exhaustive]
    IncompatibleServer { message: String },

    /// A session that has already been ended was passed to an operation.
    #[error("Use of expired sessions is not permitted")]
    ExpiredSession,

    /// A session created by a different client was passed to an operation.
    #[error(
        "The session provided to an operation must be created from the same client that \
         executes it"
    )]
    SessionOwnershipMismatch,

    /// A method was called on a client that was closed.
    #[error("Client must be connected before running operations")]
    NotConnected,
}

impl ErrorKind {
    fn get_write_concern_error(&self) -> Option<&WriteConcernError> {
        match self {
            ErrorKind::InsertMany(InsertManyError {
                write_concern_error,
                ..
            }) => write_concern_error.as_ref(),
            ErrorKind::Write(WriteFailure::WriteConcernError(err)) => Some(err),
            _ => None,
        }
    }
}

/// An error that occurred due to a database command failing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct CommandError {
    /// Identifies the type of error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,
}

impl fmt::Display for CommandError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(
            fmt,
            "Error code {} ({}): {}",
            self.code, self.code_name, self.message
        )
    }
}

/// An error that occurred due to not being able to satisfy a write concern.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct WriteConcernError {
    /// Identifies the type of write concern error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: String,

    /// A description of the error that occurred.
    #[serde(alias = "errmsg", default = "String::new")]
    pub message: String,

    /// A document identifying the write concern setting related to the error.
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,

    /// Labels categorizing the error.
    #[serde(rename = "errorLabels", default)]
    pub(crate) labels: Vec<String>,
}

/// An error that occurred during a write operation that wasn't due to being unable to satisfy a
/// write concern.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub struct WriteError {
    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    ///
    /// Note that the server will not return this in some cases, hence `code_name` being an
    /// `Option`.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,

    /// A document providing more information about the write error (e.g. details
    /// pertaining to document validation).
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}

/// An individual write error that occurred during a batched write.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[non_exhaustive]
pub struct IndexedWriteError {
    /// Index into the list of statements that this error corresponds to.
    #[serde(default)]
    pub index: usize,

    /// Identifies the type of write error.
    pub code: i32,

    /// The name associated with the error code.
    #[serde(rename = "codeName", default)]
    pub code_name: Option<String>,

    /// A description of the error that occurred.
    #[serde(rename = "errmsg", default = "String::new")]
    pub message: String,

    /// A document providing more information about the write error.
    #[serde(rename = "errInfo")]
    pub details: Option<Document>,
}

/// The set of errors that occurred during an insert of multiple documents.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct InsertManyError {
    /// The error(s) that occurred on account of a non write concern failure.
    pub write_errors: Option<Vec<IndexedWriteError>>,

    /// The error that occurred on account of write concern failure.
    pub write_concern_error: Option<WriteConcernError>,

    #[serde(skip)]
    pub(crate) inserted_ids: HashMap<usize, Bson>,
}

/// An error that occurred when trying to execute a write operation.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WriteFailure {
    /// An error that occurred due to not being able to satisfy a write concern.
    WriteConcernError(WriteConcernError),

    /// An error that occurred during a write operation that wasn't due to being unable to satisfy
    /// a write concern.
    WriteError(WriteError),
}

impl WriteFailure {
    fn from_insert_many_error(bulk: InsertManyError) -> Result<Self> {
        if let Some(insert_error) = bulk.write_errors.and_then(|es| es.into_iter().next()) {
            let write_error = WriteError {
                code: insert_error.code,
                code_name: insert_error.code_name,
                message: insert_error.message,
                details: insert_error.details,
            };
            Ok(WriteFailure::WriteError(write_error))
        } else if let Some(wc_error) = bulk.write_concern_error {
            Ok(WriteFailure::WriteConcernError(wc_error))
        } else {
            Err(ErrorKind::InvalidResponse {
                message: "error missing write errors and write concern errors".to_string(),
            }
            .into())
        }
    }
}

/// Translates ErrorKind::InsertMany to ErrorKind::Write, leaving all other errors untouched.
pub(crate) fn convert_insert_many_error(error: Error) -> Error {
    match *error.kind {
        ErrorKind::InsertMany(insert_many_error) => {
            match WriteFailure::from_insert_many_error(insert_many_error) {
                Ok(failure) => Error::new(ErrorKind::Write(failure), Some(error.labels)),
                Err(e) => e,
            }
        }
        _ => error,
    }
}
