//! RPC2 wire records
//!
//! Every call is a JSON object POSTed to `/RPC2` (or `/RPC2_Login`):
//! - `method` and `id` are always present
//! - `params`, `object` and `session` only when set
//! - extra top-level fields are merged after the standard ones
//!
//! Replies carry `result`, `params`, `session` and `error`, all optional.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Client type string the device expects on login
pub const CLIENT_TYPE: &str = "Dahua3.0-Web3.0";

pub mod methods {
    pub const LOGIN: &str = "global.login";
    pub const LOGOUT: &str = "global.logout";
    pub const CURRENT_TIME: &str = "global.getCurrentTime";
    pub const SERIAL_NO: &str = "magicBox.getSerialNo";
    pub const GET_CONFIG: &str = "configManager.getConfig";
    pub const COAXIAL_STATUS: &str = "CoaxialControlIO.getStatus";
    pub const COAXIAL_CONTROL: &str = "CoaxialControlIO.control";
}

/// One outgoing call, before the id and session are attached
#[derive(Debug, Clone, Default)]
pub struct Rpc2Request {
    pub method: String,
    pub params: Option<Value>,
    /// Sent whenever present, including `Some(0)`
    pub object: Option<u64>,
    pub extra: Map<String, Value>,
    /// Overrides the default `{base}/RPC2` endpoint
    pub url: Option<String>,
    /// Reject replies carrying `result: false`
    pub verify_result: bool,
}

impl Rpc2Request {
    pub fn new(method: &str) -> Self {
        Self {
            method: method.to_string(),
            verify_result: true,
            ..Default::default()
        }
    }

    pub fn params<P: Serialize>(mut self, params: P) -> serde_json::Result<Self> {
        self.params = Some(serde_json::to_value(params)?);
        Ok(self)
    }

    pub fn object(mut self, object: u64) -> Self {
        self.object = Some(object);
        self
    }

    pub fn extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }

    pub fn url(mut self, url: String) -> Self {
        self.url = Some(url);
        self
    }

    pub fn unverified(mut self) -> Self {
        self.verify_result = false;
        self
    }

    /// Build the JSON envelope sent on the wire
    pub fn envelope(&self, id: u64, session: Option<&str>) -> Map<String, Value> {
        let mut data = Map::new();
        data.insert("method".into(), Value::String(self.method.clone()));
        data.insert("id".into(), Value::from(id));
        if let Some(ref params) = self.params {
            data.insert("params".into(), params.clone());
        }
        if let Some(object) = self.object {
            data.insert("object".into(), Value::from(object));
        }
        for (key, value) in &self.extra {
            data.insert(key.clone(), value.clone());
        }
        if let Some(session) = session {
            data.insert("session".into(), Value::String(session.to_string()));
        }
        data
    }
}

/// Decoded device reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default)]
    pub id: Option<u64>,
    /// Only a real JSON boolean counts; anything else reads as absent
    #[serde(default, deserialize_with = "bool_or_none")]
    pub result: Option<bool>,
    #[serde(default)]
    pub params: Option<Value>,
    /// Devices send the token as a string or a bare number
    #[serde(default, deserialize_with = "session_token")]
    pub session: Option<String>,
    #[serde(default)]
    pub error: Option<Value>,
}

impl ResponseEnvelope {
    pub fn is_success(&self) -> bool {
        self.result == Some(true)
    }

    /// Walk `params` along `path`, e.g. `["status", "Speaker"]`
    pub fn param(&self, path: &[&str]) -> Option<&Value> {
        path.iter()
            .try_fold(self.params.as_ref()?, |value, key| value.get(key))
    }
}

fn bool_or_none<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => Some(b),
        _ => None,
    })
}

fn session_token<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First login round: username only, empty password
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChallengeLogin<'a> {
    pub user_name: &'a str,
    pub password: &'a str,
    pub client_type: &'a str,
}

/// Second login round: the hashed credential proof
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HashLogin<'a> {
    pub user_name: &'a str,
    pub password: &'a str,
    pub client_type: &'a str,
    pub authority_type: &'a str,
    pub password_type: &'a str,
}

/// Challenge material from the first login round
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Challenge {
    pub realm: String,
    pub random: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChannelParams {
    pub channel: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CoaxialControlParams {
    pub channel: u32,
    pub info: Vec<CoaxialControlInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoaxialControlInfo {
    #[serde(rename = "Type")]
    pub io_type: u8,
    #[serde(rename = "IO")]
    pub io: u8,
    pub trigger_mode: u8,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_minimal() {
        let req = Rpc2Request::new(methods::LOGOUT);
        let env = Value::Object(req.envelope(3, None));
        assert_eq!(env, json!({"method": "global.logout", "id": 3}));
    }

    #[test]
    fn test_envelope_full() {
        let req = Rpc2Request::new(methods::GET_CONFIG)
            .params(json!({"name": "General"}))
            .unwrap()
            .object(7)
            .extra("seq", json!(1));
        let env = Value::Object(req.envelope(1, Some("S1")));
        assert_eq!(
            env,
            json!({
                "method": "configManager.getConfig",
                "id": 1,
                "params": {"name": "General"},
                "object": 7,
                "seq": 1,
                "session": "S1"
            })
        );
    }

    #[test]
    fn test_extra_overrides_standard_fields() {
        let req = Rpc2Request::new("a.b").extra("method", json!("c.d"));
        let env = req.envelope(1, None);
        assert_eq!(env["method"], "c.d");
    }

    #[test]
    fn test_session_wins_over_extra() {
        let req = Rpc2Request::new("a.b").extra("session", json!("stale"));
        let env = req.envelope(1, Some("fresh"));
        assert_eq!(env["session"], "fresh");
    }

    #[test]
    fn test_zero_object_is_sent() {
        let env = Rpc2Request::new("a.b").object(0).envelope(1, None);
        assert_eq!(env["object"], 0);
    }

    #[test]
    fn test_response_result_only_counts_booleans() {
        let resp: ResponseEnvelope = serde_json::from_str(r#"{"result": 1}"#).unwrap();
        assert_eq!(resp.result, None);
        assert!(!resp.is_success());

        let resp: ResponseEnvelope = serde_json::from_str(r#"{"result": true, "id": 2}"#).unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.id, Some(2));
    }

    #[test]
    fn test_numeric_session_token() {
        let resp: ResponseEnvelope = serde_json::from_str(r#"{"session": 12345}"#).unwrap();
        assert_eq!(resp.session.as_deref(), Some("12345"));
    }

    #[test]
    fn test_param_path() {
        let resp: ResponseEnvelope =
            serde_json::from_str(r#"{"params": {"status": {"Speaker": "On"}}}"#).unwrap();
        assert_eq!(resp.param(&["status", "Speaker"]), Some(&json!("On")));
        assert_eq!(resp.param(&["status", "WhiteLight"]), None);
    }

    #[test]
    fn test_login_params_field_names() {
        let params = serde_json::to_value(HashLogin {
            user_name: "admin",
            password: "HASH",
            client_type: CLIENT_TYPE,
            authority_type: "Default",
            password_type: "Default",
        })
        .unwrap();
        assert_eq!(
            params,
            json!({
                "userName": "admin",
                "password": "HASH",
                "clientType": "Dahua3.0-Web3.0",
                "authorityType": "Default",
                "passwordType": "Default"
            })
        );
    }

    #[test]
    fn test_control_info_field_names() {
        let params = serde_json::to_value(CoaxialControlParams {
            channel: 0,
            info: vec![CoaxialControlInfo { io_type: 2, io: 1, trigger_mode: 1 }],
        })
        .unwrap();
        assert_eq!(
            params,
            json!({"channel": 0, "info": [{"Type": 2, "IO": 1, "TriggerMode": 1}]})
        );
    }
}
