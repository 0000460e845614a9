//! RPC2 client: request framing, login handshake and typed operations
//!
//! One client drives exactly one device. All session state (token, request
//! counter, login flag) sits behind a single lock, and every public
//! operation holds that lock for its whole login + request sequence, so
//! overlapping calls on a shared client are serialized instead of racing
//! on the token.

use chrono::NaiveDateTime;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::auth::login_digest;
use crate::config::{ClientConfig, ReauthPolicy};
use crate::error::{Result, Rpc2Error};
use crate::protocol::{
    CLIENT_TYPE, Challenge, ChallengeLogin, ChannelParams, CoaxialControlParams, HashLogin,
    ResponseEnvelope, Rpc2Request, methods,
};
use crate::session::Session;
use crate::status::{CoaxialCommand, CoaxialControlIOStatus, CoaxialIoType, IoState};
use crate::transport::{HttpTransport, Transport};

/// Format of `params.time` in `global.getCurrentTime` replies
const DEVICE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Result of [`Rpc2Client::login`].
///
/// A rejected login is an expected outcome, not an error: callers branch
/// on it. Transport, decode and protocol failures still come back as `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    Authenticated(ResponseEnvelope),
    Rejected(ResponseEnvelope),
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, LoginOutcome::Authenticated(_))
    }
}

pub struct Rpc2Client<T: Transport = HttpTransport> {
    config: ClientConfig,
    base_url: String,
    transport: T,
    session: Mutex<Session>,
}

impl Rpc2Client<HttpTransport> {
    /// Client with its own HTTP transport using `config.timeout`
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }

    /// Client over a caller-owned `reqwest::Client`
    pub fn with_http_client(config: ClientConfig, client: reqwest::Client) -> Self {
        Self::with_transport(config, HttpTransport::with_client(client))
    }
}

impl<T: Transport> Rpc2Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        let base_url = config.base_url();
        debug!(base_url = %base_url, "RPC2 client initialized");
        Self {
            config,
            base_url,
            transport,
            session: Mutex::new(Session::new()),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn is_logged_in(&self) -> bool {
        self.session.lock().await.is_logged_in()
    }

    pub async fn session_id(&self) -> Option<String> {
        self.session.lock().await.token().map(String::from)
    }

    /// Send one raw call with the current session
    pub async fn request(&self, req: Rpc2Request) -> Result<ResponseEnvelope> {
        let mut session = self.session.lock().await;
        self.send(&mut session, req).await
    }

    /// Two-round challenge-response login
    pub async fn login(&self) -> Result<LoginOutcome> {
        let mut session = self.session.lock().await;
        self.login_locked(&mut session).await
    }

    /// Best-effort teardown; never fails
    pub async fn logout(&self) -> bool {
        let mut session = self.session.lock().await;
        debug!("Attempting to log out");

        let result = self.send(&mut session, Rpc2Request::new(methods::LOGOUT)).await;
        match result {
            Ok(resp) if resp.is_success() => {
                session.clear();
                info!("Logout successful");
                true
            }
            Ok(resp) => {
                debug!(?resp, "Failed to log out");
                false
            }
            Err(e) => {
                error!("Logout failed: {}", e);
                false
            }
        }
    }

    /// Device clock
    pub async fn current_time(&self) -> Result<NaiveDateTime> {
        let resp = self.request(Rpc2Request::new(methods::CURRENT_TIME)).await?;
        let time = resp
            .param(&["time"])
            .and_then(Value::as_str)
            .ok_or_else(|| Rpc2Error::missing(methods::CURRENT_TIME, "params.time", &resp))?;

        NaiveDateTime::parse_from_str(time, DEVICE_TIME_FORMAT).map_err(|e| {
            Rpc2Error::protocol(
                methods::CURRENT_TIME,
                format!("unparseable device time {time:?}: {e}"),
                &resp,
            )
        })
    }

    pub async fn get_serial_number(&self) -> Result<String> {
        let resp = self.request(Rpc2Request::new(methods::SERIAL_NO)).await?;
        resp.param(&["sn"])
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| Rpc2Error::missing(methods::SERIAL_NO, "params.sn", &resp))
    }

    /// Whole `params` object of a `configManager.getConfig` reply
    pub async fn get_config(&self, params: Value) -> Result<Value> {
        debug!(%params, "Fetching config");
        let req = Rpc2Request::new(methods::GET_CONFIG).params(params).map_err(Rpc2Error::Encode)?;
        let resp = self.request(req).await?;
        resp.params
            .clone()
            .ok_or_else(|| Rpc2Error::missing(methods::GET_CONFIG, "params", &resp))
    }

    pub async fn get_device_name(&self) -> Result<String> {
        let config = self.get_config(json!({ "name": "General" })).await?;
        config
            .pointer("/table/MachineName")
            .and_then(Value::as_str)
            .map(String::from)
            .ok_or_else(|| Rpc2Error::missing(methods::GET_CONFIG, "params.table.MachineName", &config))
    }

    /// Siren and white light state of `channel`
    pub async fn get_coaxial_control_io_status(&self, channel: u32) -> Result<CoaxialControlIOStatus> {
        let mut session = self.session.lock().await;
        self.status_locked(&mut session, channel).await
    }

    /// Drive one output, then read the resulting state back. The control
    /// reply does not carry the new state, hence the second round trip.
    pub async fn set_coaxial_control_io_status(
        &self,
        channel: u32,
        command: CoaxialCommand,
    ) -> Result<CoaxialControlIOStatus> {
        let mut session = self.session.lock().await;
        self.control_locked(&mut session, channel, command).await
    }

    pub async fn toggle_siren(&self, channel: u32) -> Result<CoaxialControlIOStatus> {
        self.toggle(channel, CoaxialIoType::Speaker).await
    }

    pub async fn toggle_light(&self, channel: u32) -> Result<CoaxialControlIOStatus> {
        self.toggle(channel, CoaxialIoType::WhiteLight).await
    }

    async fn toggle(&self, channel: u32, io_type: CoaxialIoType) -> Result<CoaxialControlIOStatus> {
        let mut session = self.session.lock().await;
        let current = self.status_locked(&mut session, channel).await?;
        let command = CoaxialCommand::new(io_type, IoState::from_on(!current.is_on(io_type)));
        debug!(channel, ?command, "Toggling coaxial output");
        self.control_locked(&mut session, channel, command).await
    }

    // Private helpers; callers hold the session lock

    async fn status_locked(&self, session: &mut Session, channel: u32) -> Result<CoaxialControlIOStatus> {
        self.ensure_session(session).await?;
        debug!(channel, "Fetching coaxial control IO status");

        let req = Rpc2Request::new(methods::COAXIAL_STATUS)
            .params(ChannelParams { channel })
            .map_err(Rpc2Error::Encode)?;
        let resp = self.send(session, req).await?;
        CoaxialControlIOStatus::from_response(&resp)
    }

    async fn control_locked(
        &self,
        session: &mut Session,
        channel: u32,
        command: CoaxialCommand,
    ) -> Result<CoaxialControlIOStatus> {
        self.ensure_session(session).await?;
        debug!(channel, ?command, "Setting coaxial control IO status");

        let req = Rpc2Request::new(methods::COAXIAL_CONTROL)
            .params(CoaxialControlParams {
                channel,
                info: vec![command.into()],
            })
            .map_err(Rpc2Error::Encode)?;
        self.send(session, req).await?;

        self.status_locked(session, channel).await
    }

    async fn ensure_session(&self, session: &mut Session) -> Result<()> {
        let needs_login = match self.config.reauth {
            ReauthPolicy::Eager => true,
            ReauthPolicy::Lazy => !session.is_logged_in(),
        };
        if !needs_login {
            return Ok(());
        }

        match self.login_locked(session).await? {
            LoginOutcome::Authenticated(_) => Ok(()),
            LoginOutcome::Rejected(_) => Err(Rpc2Error::LoginRejected),
        }
    }

    async fn login_locked(&self, session: &mut Session) -> Result<LoginOutcome> {
        debug!(username = %self.config.username, "Attempting to log in");
        session.reset();
        let url = format!("{}/RPC2_Login", self.base_url);

        let challenge_req = Rpc2Request::new(methods::LOGIN)
            .params(ChallengeLogin {
                user_name: &self.config.username,
                password: "",
                client_type: CLIENT_TYPE,
            })
            .map_err(Rpc2Error::Encode)?
            .url(url.clone())
            .unverified();
        let resp = self.send(session, challenge_req).await?;

        let token = resp
            .session
            .clone()
            .ok_or_else(|| Rpc2Error::missing(methods::LOGIN, "session", &resp))?;
        let challenge: Challenge = resp
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .ok_or_else(|| {
                Rpc2Error::protocol(methods::LOGIN, "no realm/random in challenge response".into(), &resp)
            })?;
        debug!(session = %token, realm = %challenge.realm, "Received login challenge");
        session.set_token(token);

        let digest = login_digest(&self.config.username, &self.config.password, &challenge);
        let hash_req = Rpc2Request::new(methods::LOGIN)
            .params(HashLogin {
                user_name: &self.config.username,
                password: &digest,
                client_type: CLIENT_TYPE,
                authority_type: "Default",
                password_type: "Default",
            })
            .map_err(Rpc2Error::Encode)?
            .url(url);
        let resp = self.send(session, hash_req).await?;

        if resp.is_success() {
            session.mark_logged_in();
            info!(base_url = %self.base_url, "Login successful");
            Ok(LoginOutcome::Authenticated(resp))
        } else {
            error!(base_url = %self.base_url, "Login failed");
            Ok(LoginOutcome::Rejected(resp))
        }
    }

    async fn send(&self, session: &mut Session, req: Rpc2Request) -> Result<ResponseEnvelope> {
        let id = session.next_id();
        let url = req
            .url
            .clone()
            .unwrap_or_else(|| format!("{}/RPC2", self.base_url));
        let envelope = req.envelope(id, session.token());
        let body = serde_json::to_string(&envelope).map_err(Rpc2Error::Encode)?;

        // Login params carry the credential proof
        let params = if req.method == methods::LOGIN { None } else { req.params.as_ref() };
        debug!(
            method = %req.method,
            id,
            url = %url,
            params = ?params,
            session = ?session.token(),
            "Requesting"
        );

        let text = self.transport.post(&url, body).await.map_err(|e| {
            error!(method = %req.method, url = %url, "Request failed: {}", e);
            Rpc2Error::from(e)
        })?;
        debug!(method = %req.method, id, "Response text: {}", text);

        let value: Value = serde_json::from_str(&text).map_err(|source| {
            error!(method = %req.method, body = %text, "Failed to decode JSON");
            Rpc2Error::Decode { source, body: text.clone() }
        })?;

        if req.verify_result && value.get("result") == Some(&Value::Bool(false)) {
            error!(method = %req.method, response = %value, "API call failed");
            return Err(Rpc2Error::ApiCall {
                method: req.method,
                response: value,
            });
        }

        match serde_json::from_value(value.clone()) {
            Ok(resp) => Ok(resp),
            Err(e) => Err(Rpc2Error::protocol(
                &req.method,
                format!("unexpected response shape: {e}"),
                &value,
            )),
        }
    }
}
