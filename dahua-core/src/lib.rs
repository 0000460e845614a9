//! dahua-core: client for the Dahua RPC2 device-control protocol
//!
//! This crate provides:
//! - RPC2 request/response envelopes and per-method parameter records
//! - Challenge-response login digest
//! - Session handling with eager or lazy re-authentication
//! - Typed operations: device time, serial number, config, siren/light IO
//! - Device config file management

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod protocol;
pub mod session;
pub mod status;
pub mod transport;

pub use client::{LoginOutcome, Rpc2Client};
pub use config::{ClientConfig, Config, DeviceConfig, ReauthPolicy};
pub use error::{Result, Rpc2Error};
pub use protocol::{ResponseEnvelope, Rpc2Request};
pub use status::{CoaxialCommand, CoaxialControlIOStatus, CoaxialIoType, IoState, TriggerMode};
pub use transport::{HttpTransport, Transport, TransportError};

/// Default device HTTP port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
