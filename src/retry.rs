//! Rules deciding whether a failed operation may be attempted a second time.


use std::fmt::Debug;

use crate::{
    error::{Error, ErrorKind, NO_WRITES_PERFORMED, RETRYABLE_READ_CODES, RETRYABLE_WRITE_ERROR},
    options::ClientOptions,
};

const LEGACY_STORAGE_ENGINE_CODE: i32 = 20;
const LEGACY_STORAGE_ENGINE_MESSAGE_PREFIX: &str = "Transaction numbers";
const LEGACY_STORAGE_ENGINE_ERROR_MESSAGE: &str = "This MongoDB deployment does not support \
                                                   retryable writes. Please add \
                                                   retryWrites=false to your connection string.";

/// Classifies errors for the purposes of retrying an operation.
///
/// The default implementation, [`DefaultRetryPolicy`], follows the retryable reads and retryable
/// writes rules. A custom policy can be installed via
/// [`ClientOptions::retry_policy`](crate::options::ClientOptions::retry_policy).
pub trait RetryPolicy: Send + Sync + Debug {
    /// Whether a read operation that failed with the given error may be retried.
    fn is_read_retryable(&self, error: &Error) -> bool;

    /// Whether a write operation that failed with the given error may be retried.
    fn is_write_retryable(&self, error: &Error) -> bool;

    /// Whether the given error, returned from a retry attempt, indicates that the retry did not
    /// perform any writes. When this returns true, the error from the first attempt is surfaced
    /// instead of the given one.
    fn is_no_writes_performed(&self, error: &Error) -> bool;
}

/// The retry policy used when none is configured.
#[derive(Clone, Copy, Debug, Default)]
#[non_exhaustive]
pub struct DefaultRetryPolicy;

impl RetryPolicy for DefaultRetryPolicy {
    fn is_read_retryable(&self, error: &Error) -> bool {
        if error.is_network_error() {
            return true;
        }
        match error.sdam_code() {
            Some(code) => RETRYABLE_READ_CODES.contains(&code),
            None => false,
        }
    }

    fn is_write_retryable(&self, error: &Error) -> bool {
        error.contains_label(RETRYABLE_WRITE_ERROR)
    }

    fn is_no_writes_performed(&self, error: &Error) -> bool {
        error.contains_label(NO_WRITES_PERFORMED)
    }
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub(crate) enum Retryability {
    Write,
    Read,
    None,
}

impl Retryability {
    /// Returns this level of retryability in tandem with the client options.
    pub(crate) fn with_options(&self, options: &ClientOptions) -> Self {
        match self {
            Self::Write if options.retry_writes != Some(false) => Self::Write,
            Self::Read if options.retry_reads != Some(false) => Self::Read,
            _ => Self::None,
        }
    }

    /// Whether this level of retryability can retry the given error under the given policy.
    pub(crate) fn can_retry_error(&self, policy: &dyn RetryPolicy, error: &Error) -> bool {
        match self {
            Self::Write => policy.is_write_retryable(error),
            Self::Read => policy.is_read_retryable(error),
            Self::None => false,
        }
    }
}

/// Whether the error was produced by a storage engine that cannot record transaction numbers.
/// Retryable writes require document-level locking, which such engines lack.
pub(crate) fn is_legacy_storage_engine_error(error: &Error) -> bool {
    error.sdam_code() == Some(LEGACY_STORAGE_ENGINE_CODE)
        && error
            .command_message()
            .is_some_and(|message| message.starts_with(LEGACY_STORAGE_ENGINE_MESSAGE_PREFIX))
}

/// Rewrites a legacy storage engine failure into an error telling the operator to disable
/// retryable writes. The server's error is kept as the source.
pub(crate) fn legacy_storage_engine_error(original: Error) -> Error {
    let mut error = Error::new(
        ErrorKind::IncompatibleServer {
            message: LEGACY_STORAGE_ENGINE_ERROR_MESSAGE.to_string(),
        },
        Some(original.labels().iter().cloned().collect::<Vec<_>>()),
    );
    error.wire_version = original.wire_version;
    error.with_source(original)
}

#[cfg(test)]
pub(crate) const LEGACY_STORAGE_ENGINE_MESSAGE_FOR_TEST: &str = LEGACY_STORAGE_ENGINE_ERROR_MESSAGE;
