//! Error taxonomy for RPC2 calls

use std::fmt::Debug;

use serde_json::Value;
use thiserror::Error;

use crate::transport::TransportError;

pub type Result<T> = std::result::Result<T, Rpc2Error>;

#[derive(Debug, Error)]
pub enum Rpc2Error {
    /// Network or connection failure, never retried
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    /// Response body was not valid JSON
    #[error("Failed to decode JSON response: {source}")]
    Decode {
        #[source]
        source: serde_json::Error,
        body: String,
    },

    /// Device answered with `result: false`
    #[error("API call {method} failed: {response}")]
    ApiCall { method: String, response: Value },

    /// Well-formed response that lacks the fields the operation needs
    #[error("Protocol error in {method}: {message}")]
    Protocol { method: String, message: String },

    /// A privileged call needed a session and the device refused the credentials
    #[error("Login rejected by device")]
    LoginRejected,

    #[error("Failed to encode request: {0}")]
    Encode(serde_json::Error),
}

impl Rpc2Error {
    /// Log the offending reply and build a protocol error for `method`
    pub(crate) fn protocol(method: &str, message: String, response: &impl Debug) -> Self {
        tracing::error!(method, ?response, "Protocol error: {}", message);
        Rpc2Error::Protocol {
            method: method.to_string(),
            message,
        }
    }

    pub(crate) fn missing(method: &str, what: &str, response: &impl Debug) -> Self {
        Self::protocol(method, format!("missing {what} in response"), response)
    }
}
