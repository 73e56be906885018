//! Errors that can happen when talking to the paywall calendar API or persisting browse state.
#![allow(missing_docs)]

use thiserror::Error;

pub use _inner::{ClientBuilderError, ClientError, Error, SnapshotError};

/// A failed request to the paywall calendar API.
///
/// Transport failures, non-success statuses, and undecodable bodies all end up
/// here without further distinction.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct RequestError(#[from] pub(crate) reqwest::Error);

impl RequestError {
    /// Returns the HTTP status of the response, if one was received at all.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.0.status().map(|status| status.as_u16())
    }
}

/// A browse snapshot that could not be encoded for storage.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct EncodeError(#[from] pub(crate) serde_json::Error);

mod _inner {
    use error_set::error_set;

    error_set! {
        Error := ClientBuilderError || ClientError || SnapshotError

        ClientBuilderError := {
            #[display("base url must be an absolute `http` or `https` url")]
            InvalidBaseUrl,
            #[display("failed to build the underlying http client")]
            BuildFailed,
        }

        ClientError := {
            RequestFailed(super::RequestError),
        }

        SnapshotError := {
            EncodeFailed(super::EncodeError),
        }
    }
}
