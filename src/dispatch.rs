//! Command table: maps one user action onto the device calls that carry it out.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use clap::builder::PossibleValue;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DeviceSettings;
use crate::device::{DeviceClient, Input, Playback, PowerAction, PowerState, Transport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Action {
    VolumeUp,
    VolumeDown,
    MuteToggle,
    PowerOn,
    PowerOff,
    PowerToggle,
    PlayNext,
    PlayPrevious,
    PlayPause,
    Input(Input),
}

impl Action {
    pub const ALL: [Action; 22] = [
        Action::VolumeUp,
        Action::VolumeDown,
        Action::MuteToggle,
        Action::PowerOn,
        Action::PowerOff,
        Action::PowerToggle,
        Action::PlayNext,
        Action::PlayPrevious,
        Action::PlayPause,
        Action::Input(Input::Analog1),
        Action::Input(Input::Digital1),
        Action::Input(Input::Digital2),
        Action::Input(Input::Digital3),
        Action::Input(Input::Usb),
        Action::Input(Input::Bluetooth),
        Action::Input(Input::Radio),
        Action::Input(Input::Upnp),
        Action::Input(Input::Spotify),
        Action::Input(Input::Tidal),
        Action::Input(Input::Airplay),
        Action::Input(Input::Chromecast),
        Action::Input(Input::Hdmi),
    ];

    pub fn name(self) -> &'static str {
        match self {
            Action::VolumeUp => "volume-up",
            Action::VolumeDown => "volume-down",
            Action::MuteToggle => "mute-toggle",
            Action::PowerOn => "power-on",
            Action::PowerOff => "power-off",
            Action::PowerToggle => "power-toggle",
            Action::PlayNext => "play-next",
            Action::PlayPrevious => "play-previous",
            Action::PlayPause => "play-pause",
            Action::Input(input) => match input {
                Input::Analog1 => "input-ana1",
                Input::Digital1 => "input-dig1",
                Input::Digital2 => "input-dig2",
                Input::Digital3 => "input-dig3",
                Input::Usb => "input-usb",
                Input::Bluetooth => "input-bluetooth",
                Input::Radio => "input-radio",
                Input::Upnp => "input-upnp",
                Input::Spotify => "input-spotify",
                Input::Tidal => "input-tidal",
                Input::Airplay => "input-airplay",
                Input::Chromecast => "input-chromecast",
                Input::Hdmi => "input-hdmi",
            },
        }
    }

    /// Fire-and-forget actions never read state and never confirm.
    pub fn is_fire_and_forget(self) -> bool {
        matches!(
            self,
            Action::PlayNext | Action::PlayPrevious | Action::PlayPause | Action::Input(_)
        )
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| format!("unknown action '{s}'"))
    }
}

impl TryFrom<String> for Action {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Action> for String {
    fn from(action: Action) -> Self {
        action.name().to_string()
    }
}

impl clap::ValueEnum for Action {
    fn value_variants<'a>() -> &'a [Self] {
        &Self::ALL
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(PossibleValue::new(self.name()))
    }
}

fn default_step() -> u32 {
    1
}

/// One user command, in the shape that travels over the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub action: Action,
    #[serde(default = "default_step")]
    pub step: u32,
    #[serde(default)]
    pub confirm: bool,
}

impl Command {
    pub fn new(action: Action, step: u32, confirm: bool) -> Self {
        Self {
            action,
            step: step.max(1),
            confirm,
        }
    }
}

/// A command addressed to a specific device, as published to the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedCommand {
    pub ip: IpAddr,
    #[serde(flatten)]
    pub command: Command,
}

/// Authoritative post-change value, read back from the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    Volume(Option<i64>),
    Mute(Option<bool>),
    Power(Option<PowerState>),
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::Volume(Some(v)) => write!(f, "Volume has been set to {v}"),
            Confirmation::Mute(Some(m)) => write!(f, "Mute has been set to {m}"),
            Confirmation::Power(Some(state)) if state.is_on() => {
                f.write_str("Your Naim Uniti device is Power On")
            }
            Confirmation::Power(Some(_)) => f.write_str("Your Naim Uniti device is Power Off"),
            Confirmation::Volume(None) => f.write_str("Volume could not be confirmed"),
            Confirmation::Mute(None) => f.write_str("Mute could not be confirmed"),
            Confirmation::Power(None) => f.write_str("Power state could not be confirmed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The current value could not be read, so nothing was written.
    Skipped,
    Done { confirmation: Option<Confirmation> },
}

/// Run a command against the device. Never fails: unreadable state skips
/// the command, and write failures are only logged.
pub async fn execute<T: Transport>(
    client: &DeviceClient<T>,
    command: &Command,
    settings: &DeviceSettings,
) -> Outcome {
    let step = i64::from(command.step.max(1));
    let confirm = command.confirm;

    let outcome = match command.action {
        Action::VolumeUp => change_volume(client, step, confirm).await,
        Action::VolumeDown => change_volume(client, -step, confirm).await,
        Action::MuteToggle => toggle_mute(client, confirm).await,
        Action::PowerOn => change_power(client, PowerAction::On, confirm).await,
        Action::PowerOff => change_power(client, PowerAction::Off, confirm).await,
        Action::PowerToggle => change_power(client, PowerAction::Toggle, confirm).await,
        Action::PlayNext => fire(command.action, client.playback(Playback::Next).await),
        Action::PlayPrevious => fire(command.action, client.playback(Playback::Previous).await),
        Action::PlayPause => fire(command.action, client.playback(Playback::PlayPause).await),
        Action::Input(input) => fire(command.action, client.select_input(input).await),
    };

    if outcome == Outcome::Skipped && settings.warn_on_skip {
        warn!(
            "Skipped {}: could not read current state from {}",
            command.action,
            client.endpoint().ip
        );
    }
    outcome
}

fn fire(action: Action, result: Result<(), crate::device::DeviceError>) -> Outcome {
    if let Err(e) = result {
        debug!("{} failed: {}", action, e);
    }
    Outcome::Done { confirmation: None }
}

fn log_write(what: &str, result: Result<(), crate::device::DeviceError>) {
    if let Err(e) = result {
        warn!("Failed to write {}: {}", what, e);
    }
}

async fn change_volume<T: Transport>(
    client: &DeviceClient<T>,
    delta: i64,
    confirm: bool,
) -> Outcome {
    let Some(current) = client.read_volume().await else {
        return Outcome::Skipped;
    };
    let Some(target) = current.checked_add(delta) else {
        warn!("Volume {} reported by {} is out of range", current, client.endpoint().ip);
        return Outcome::Skipped;
    };
    log_write("volume", client.write_volume(target).await);

    let confirmation = if confirm {
        Some(Confirmation::Volume(client.read_volume().await))
    } else {
        None
    };
    Outcome::Done { confirmation }
}

async fn toggle_mute<T: Transport>(client: &DeviceClient<T>, confirm: bool) -> Outcome {
    let Some(muted) = client.read_mute().await else {
        return Outcome::Skipped;
    };
    log_write("mute", client.write_mute(!muted).await);

    let confirmation = if confirm {
        Some(Confirmation::Mute(client.read_mute().await))
    } else {
        None
    };
    Outcome::Done { confirmation }
}

async fn change_power<T: Transport>(
    client: &DeviceClient<T>,
    action: PowerAction,
    confirm: bool,
) -> Outcome {
    let Some(current) = client.read_power().await else {
        return Outcome::Skipped;
    };
    log_write("power", client.write_power(action.wants_on(&current)).await);

    let confirmation = if confirm {
        Some(Confirmation::Power(client.read_power().await))
    } else {
        None
    };
    Outcome::Done { confirmation }
}
