//! dahua: command-line front end for Dahua RPC2 devices
//!
//! Resolves one device (from the config file or from flags/env), runs a
//! single command against it and logs out again.
//!
//! ```text
//! dahua [--device NAME | --host HOST ...] <COMMAND>
//!
//! Commands:
//!   info         Device name, serial number and clock
//!   status       Siren and white light state
//!   siren        Toggle the siren
//!   light        Toggle the white light
//!   set          Drive one output explicitly
//!   config       Dump a config table as JSON
//!   devices      List configured devices
//!   add-device   Save --host/--port/... under a name in the config file
//! ```

use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dahua_core::{
    ClientConfig, CoaxialCommand, CoaxialControlIOStatus, CoaxialIoType, Config, DeviceConfig,
    IoState, ReauthPolicy, Rpc2Client,
};

#[derive(Debug, Parser)]
#[command(name = "dahua", version, about = "Query and control Dahua devices over RPC2")]
struct Cli {
    /// Device name from the config file
    #[arg(long, short)]
    device: Option<String>,

    /// Device host; overrides the config file
    #[arg(long, env = "DAHUA_HOST")]
    host: Option<String>,

    #[arg(long, env = "DAHUA_PORT", default_value_t = dahua_core::DEFAULT_HTTP_PORT)]
    port: u16,

    #[arg(long, env = "DAHUA_USERNAME", default_value = "admin")]
    username: String,

    #[arg(long, env = "DAHUA_PASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Video channel for siren/light commands
    #[arg(long, short)]
    channel: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = dahua_core::DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Reuse one session across privileged calls
    #[arg(long)]
    lazy: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(flatten)]
    Device(DeviceCommand),
    /// List configured devices
    Devices,
    /// Save the connection flags as a named device
    AddDevice {
        name: String,
        /// Make it the default device
        #[arg(long)]
        default: bool,
    },
}

/// Commands that talk to a device
#[derive(Debug, Subcommand)]
enum DeviceCommand {
    /// Device name, serial number and clock
    Info,
    /// Siren and white light state
    Status,
    /// Toggle the siren
    Siren,
    /// Toggle the white light
    Light,
    /// Drive one output explicitly
    Set {
        #[arg(long = "type", value_enum)]
        io_type: Output,
        #[arg(long, value_enum)]
        io: Switch,
    },
    /// Dump a config table as JSON
    Config {
        /// Config table name, e.g. General
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Output {
    Light,
    Siren,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Switch {
    On,
    Off,
}

impl From<Output> for CoaxialIoType {
    fn from(output: Output) -> Self {
        match output {
            Output::Light => CoaxialIoType::WhiteLight,
            Output::Siren => CoaxialIoType::Speaker,
        }
    }
}

impl From<Switch> for IoState {
    fn from(switch: Switch) -> Self {
        IoState::from_on(matches!(switch, Switch::On))
    }
}

/// Connection settings plus the channel to act on
fn resolve(cli: &Cli, config: &Config) -> anyhow::Result<(ClientConfig, u32)> {
    if let Some(ref host) = cli.host {
        let mut client = ClientConfig::new(host, cli.port, &cli.username, &cli.password)
            .with_timeout(Duration::from_secs(cli.timeout));
        if cli.lazy {
            client = client.with_reauth(ReauthPolicy::Lazy);
        }
        return Ok((client, cli.channel.unwrap_or(0)));
    }

    let Some(device) = config.resolve_device(cli.device.as_deref()) else {
        match cli.device {
            Some(ref name) => bail!("device {name:?} not found in config"),
            None => bail!("no device selected: pass --host or --device"),
        }
    };

    let mut client = device.client_config();
    if cli.lazy {
        client = client.with_reauth(ReauthPolicy::Lazy);
    }
    Ok((client, cli.channel.unwrap_or(device.channel)))
}

/// Device entry built from the connection flags
fn device_from_flags(cli: &Cli, name: &str) -> anyhow::Result<DeviceConfig> {
    let Some(ref host) = cli.host else {
        bail!("add-device needs --host");
    };

    Ok(DeviceConfig {
        name: name.to_string(),
        host: host.clone(),
        port: cli.port,
        username: cli.username.clone(),
        password: cli.password.clone(),
        channel: cli.channel.unwrap_or(0),
        timeout_secs: cli.timeout,
        reauth: if cli.lazy { ReauthPolicy::Lazy } else { ReauthPolicy::Eager },
    })
}

fn list_devices(config: &Config) {
    for device in &config.devices {
        let marker = if config.default_device.as_deref() == Some(device.name.as_str()) { "*" } else { " " };
        println!("{marker} {:<16} {}:{} ch{}", device.name, device.host, device.port, device.channel);
    }
}

fn print_status(status: &CoaxialControlIOStatus) {
    let on_off = |on: bool| if on { "on" } else { "off" };
    println!("siren: {}", on_off(status.speaker_on));
    println!("light: {}", on_off(status.white_light_on));
}

async fn run(client: &Rpc2Client, channel: u32, command: &DeviceCommand) -> anyhow::Result<()> {
    match command {
        DeviceCommand::Info => {
            println!("name:   {}", client.get_device_name().await.context("device name")?);
            println!("serial: {}", client.get_serial_number().await.context("serial number")?);
            println!("time:   {}", client.current_time().await.context("device time")?);
        }
        DeviceCommand::Status => print_status(&client.get_coaxial_control_io_status(channel).await?),
        DeviceCommand::Siren => print_status(&client.toggle_siren(channel).await?),
        DeviceCommand::Light => print_status(&client.toggle_light(channel).await?),
        DeviceCommand::Set { io_type, io } => {
            let command = CoaxialCommand::new((*io_type).into(), (*io).into());
            print_status(&client.set_coaxial_control_io_status(channel, command).await?);
        }
        DeviceCommand::Config { name } => {
            let table = client.get_config(serde_json::json!({ "name": name })).await?;
            println!("{}", serde_json::to_string_pretty(&table)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "dahua=info,dahua_core=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}, using defaults", e);
        Config::default()
    });

    let command = match cli.command {
        Command::Devices => {
            list_devices(&config);
            return Ok(());
        }
        Command::AddDevice { ref name, default } => {
            let mut config = config;
            let device = device_from_flags(&cli, name)?;
            config.upsert_device(device);
            if default {
                config.default_device = Some(name.clone());
            }
            config.save().context("saving config")?;
            println!("saved {name} to {}", Config::config_path()?.display());
            return Ok(());
        }
        Command::Device(ref command) => command,
    };

    let (client_config, channel) = resolve(&cli, &config)?;
    tracing::info!("Connecting to {}", client_config.base_url());
    let client = Rpc2Client::new(client_config)?;

    // Identity and config reads ride on an existing session
    if matches!(command, DeviceCommand::Info | DeviceCommand::Config { .. })
        && !client.login().await.context("login")?.is_authenticated()
    {
        bail!("login rejected by device");
    }

    let result = run(&client, channel, command).await;
    client.logout().await;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with(names: &[&str]) -> Config {
        let mut config = Config::default();
        for (i, name) in names.iter().enumerate() {
            config.upsert_device(DeviceConfig {
                name: name.to_string(),
                host: format!("192.0.2.{}", 10 + i),
                port: 80,
                username: "admin".to_string(),
                password: "pw".to_string(),
                channel: i as u32,
                timeout_secs: 4,
                reauth: ReauthPolicy::Eager,
            });
        }
        config
    }

    // Built directly so exported DAHUA_* variables cannot leak in
    fn cli(command: Command) -> Cli {
        Cli {
            device: None,
            host: None,
            port: dahua_core::DEFAULT_HTTP_PORT,
            username: "admin".to_string(),
            password: String::new(),
            channel: None,
            timeout: dahua_core::DEFAULT_TIMEOUT_SECS,
            lazy: false,
            command,
        }
    }

    #[test]
    fn test_host_flag_wins_over_config() {
        let mut cli = cli(Command::Device(DeviceCommand::Status));
        cli.host = Some("192.0.2.99".to_string());
        cli.port = 443;

        let (client, channel) = resolve(&cli, &config_with(&["porch"])).unwrap();
        assert_eq!(client.base_url(), "https://192.0.2.99:443");
        assert_eq!(channel, 0);
    }

    #[test]
    fn test_named_device_from_config() {
        let mut cli = cli(Command::Device(DeviceCommand::Siren));
        cli.device = Some("gate".to_string());
        cli.lazy = true;

        let (client, channel) = resolve(&cli, &config_with(&["porch", "gate"])).unwrap();
        assert_eq!(client.host, "192.0.2.11");
        assert_eq!(client.timeout, Duration::from_secs(4));
        assert_eq!(client.reauth, ReauthPolicy::Lazy);
        assert_eq!(channel, 1);
    }

    #[test]
    fn test_unknown_device_is_error() {
        let mut cli = cli(Command::Device(DeviceCommand::Status));
        cli.device = Some("attic".to_string());
        assert!(resolve(&cli, &config_with(&["porch"])).is_err());
    }

    #[test]
    fn test_add_device_from_flags() {
        let mut cli = cli(Command::Devices);
        cli.host = Some("192.0.2.40".to_string());
        cli.port = 8080;
        cli.channel = Some(3);
        cli.lazy = true;

        let device = device_from_flags(&cli, "garage").unwrap();
        assert_eq!(device.name, "garage");
        assert_eq!(device.port, 8080);
        assert_eq!(device.channel, 3);
        assert_eq!(device.reauth, ReauthPolicy::Lazy);

        let mut config = config_with(&["porch"]);
        config.upsert_device(device);
        let (client, channel) = {
            let mut cli = cli;
            cli.host = None;
            cli.device = Some("garage".to_string());
            resolve(&cli, &config).unwrap()
        };
        assert_eq!(client.base_url(), "http://192.0.2.40:8080");
        assert_eq!(channel, 3);
    }

    #[test]
    fn test_add_device_needs_host() {
        assert!(device_from_flags(&cli(Command::Devices), "garage").is_err());
    }

    #[test]
    fn test_set_command_parses_outputs() {
        let cli = Cli::try_parse_from([
            "dahua", "--host", "192.0.2.1", "--port", "80", "--username", "admin", "--password", "pw",
            "set", "--type", "siren", "--io", "on",
        ])
        .unwrap();
        match cli.command {
            Command::Device(DeviceCommand::Set { io_type, io }) => {
                assert_eq!(CoaxialIoType::from(io_type), CoaxialIoType::Speaker);
                assert_eq!(IoState::from(io), IoState::On);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_add_device_parses() {
        let cli = Cli::try_parse_from([
            "dahua", "--host", "192.0.2.1", "--port", "80", "--username", "admin", "--password", "pw",
            "add-device", "porch", "--default",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::AddDevice { ref name, default: true } if name == "porch"));
    }
}
