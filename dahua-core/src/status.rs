//! Typed results decoded from device replies

use serde::Serialize;

use crate::error::{Result, Rpc2Error};
use crate::protocol::{CoaxialControlInfo, ResponseEnvelope, methods};

/// Output driven through the coaxial control IO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoaxialIoType {
    WhiteLight = 1,
    Speaker = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoState {
    On = 1,
    Off = 2,
}

impl IoState {
    pub fn from_on(on: bool) -> Self {
        if on { IoState::On } else { IoState::Off }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TriggerMode {
    #[default]
    Manual = 1,
}

/// One entry of a `CoaxialControlIO.control` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoaxialCommand {
    pub io_type: CoaxialIoType,
    pub io: IoState,
    pub trigger_mode: TriggerMode,
}

impl CoaxialCommand {
    pub fn new(io_type: CoaxialIoType, io: IoState) -> Self {
        Self {
            io_type,
            io,
            trigger_mode: TriggerMode::default(),
        }
    }
}

impl From<CoaxialCommand> for CoaxialControlInfo {
    fn from(cmd: CoaxialCommand) -> Self {
        CoaxialControlInfo {
            io_type: cmd.io_type as u8,
            io: cmd.io as u8,
            trigger_mode: cmd.trigger_mode as u8,
        }
    }
}

/// Siren/speaker and white light state of one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct CoaxialControlIOStatus {
    pub speaker_on: bool,
    pub white_light_on: bool,
}

impl CoaxialControlIOStatus {
    /// Decode `params.status.Speaker` / `params.status.WhiteLight`.
    /// Only the exact string `"On"` reads as on.
    pub fn from_response(resp: &ResponseEnvelope) -> Result<Self> {
        let field = |name: &str| {
            resp.param(&["status", name])
                .map(|v| v.as_str() == Some("On"))
                .ok_or_else(|| {
                    Rpc2Error::missing(methods::COAXIAL_STATUS, &format!("params.status.{name}"), resp)
                })
        };

        Ok(Self {
            speaker_on: field("Speaker")?,
            white_light_on: field("WhiteLight")?,
        })
    }

    pub fn is_on(&self, io_type: CoaxialIoType) -> bool {
        match io_type {
            CoaxialIoType::Speaker => self.speaker_on,
            CoaxialIoType::WhiteLight => self.white_light_on,
        }
    }
}
