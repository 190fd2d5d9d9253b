// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Failures of control plane requests.

use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RpcError {
    /// No answer within the transport deadline. The server may just not be ready yet.
    #[error("Request {0} timed out")]
    Timeout(&'static str),
    /// The server answered with a fault (e.g. it does not implement the method).
    #[error("Remote error on {method}: {message}")]
    Remote {
        method: &'static str,
        message: String,
    },
    #[error("Transport failure: {0}")]
    Transport(String),
}

impl RpcError {
    /// Only timeouts are worth retrying; a remote fault will be answered the same way again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, RpcError::Timeout(_))
    }
}
