use std::net::IpAddr;

use clap::{ArgAction, Parser};
use tracing::error;

use naim_remote::config::{DeviceSettings, MqttConfig};
use naim_remote::device::DeviceClient;
use naim_remote::dispatch::{self, Action, Command, Outcome, QueuedCommand};
use naim_remote::mqtt::producer;

/// For controlling a Naim Uniti device via command line
#[derive(Debug, Parser)]
#[command(name = "naim-remote", version)]
struct Cli {
    /// IP address of your Naim Uniti device
    #[arg(long, value_name = "IP")]
    ip: IpAddr,

    /// Simulate an action on the remote control
    #[arg(value_enum)]
    action: Action,

    /// Read the value back after changing it and print it
    #[arg(short, long)]
    confirm: bool,

    /// Volume step; repeat to increase (-sss = 3)
    #[arg(short, long, action = ArgAction::Count)]
    step: u8,

    /// Hand the command to a worker through the MQTT broker instead of
    /// executing it here
    #[arg(short, long)]
    queue: bool,
}

impl Cli {
    fn to_command(&self) -> Command {
        Command::new(self.action, u32::from(self.step), self.confirm)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    naim_remote::init_tracing("warn");

    let cli = Cli::parse();
    let command = cli.to_command();

    if cli.queue {
        let config = match MqttConfig::from_env("naim-remote") {
            Ok(c) => c,
            Err(e) => {
                error!("Configuration error: {}", e);
                std::process::exit(1);
            }
        };
        let queued = QueuedCommand { ip: cli.ip, command };
        if let Err(e) = producer::publish_command(&config, &queued).await {
            error!("Failed to queue {}: {}", queued.command.action, e);
            std::process::exit(1);
        }
        return;
    }

    let settings = DeviceSettings::from_env();
    let client = DeviceClient::new(cli.ip, &settings);
    if let Outcome::Done {
        confirmation: Some(confirmation),
    } = dispatch::execute(&client, &command, &settings).await
    {
        println!("{confirmation}");
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;
    use naim_remote::device::Input;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_action_and_defaults() {
        let cli = Cli::try_parse_from(["naim-remote", "--ip", "192.168.1.20", "volume-up"]).unwrap();
        assert_eq!(cli.to_command(), Command::new(Action::VolumeUp, 1, false));
        assert!(!cli.queue);
    }

    #[test]
    fn repeated_step_flag_sets_step() {
        let cli = Cli::try_parse_from([
            "naim-remote",
            "--ip",
            "fe80::1",
            "-sss",
            "--confirm",
            "volume-down",
        ])
        .unwrap();
        assert_eq!(cli.to_command(), Command::new(Action::VolumeDown, 3, true));
        assert!(cli.ip.is_ipv6());
    }

    #[test]
    fn input_actions_are_accepted() {
        let cli = Cli::try_parse_from(["naim-remote", "--ip", "10.0.0.7", "-q", "input-dig2"])
            .unwrap();
        assert_eq!(cli.action, Action::Input(Input::Digital2));
        assert!(cli.queue);
    }

    #[test]
    fn rejects_invalid_ip_and_unknown_action() {
        assert!(Cli::try_parse_from(["naim-remote", "--ip", "192.168.1", "volume-up"]).is_err());
        assert!(Cli::try_parse_from(["naim-remote", "--ip", "uniti.local", "volume-up"]).is_err());
        assert!(Cli::try_parse_from(["naim-remote", "--ip", "10.0.0.7", "eject"]).is_err());
        assert!(Cli::try_parse_from(["naim-remote", "volume-up"]).is_err());
    }
}
