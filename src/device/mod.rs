pub mod api;
pub mod client;
#[cfg(test)]
pub(crate) mod fake;

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use client::{DeviceClient, HttpTransport};

/// Port the Uniti control API listens on.
pub const DEVICE_PORT: u16 = 15081;

pub const LEVELS_PATH: &str = "/levels/room";
pub const POWER_PATH: &str = "/power";
pub const NOW_PLAYING_PATH: &str = "/nowplaying";

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device unreachable: {0}")]
    Unreachable(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceEndpoint {
    pub ip: IpAddr,
}

impl DeviceEndpoint {
    pub fn new(ip: IpAddr) -> Self {
        Self { ip }
    }

    /// `http://{ip}:15081`, with IPv6 literals bracketed.
    pub fn base_url(&self) -> String {
        format!("http://{}", SocketAddr::new(self.ip, DEVICE_PORT))
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Get => f.write_str("GET"),
            Method::Put => f.write_str("PUT"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl DeviceRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.query.push((key, value.to_string()));
        self
    }
}

impl fmt::Display for DeviceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct DeviceResponse {
    pub status: u16,
    pub body: String,
}

/// Sends one request to the device. No retries, no pooling beyond what the
/// implementation does on its own.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &DeviceEndpoint,
        request: &DeviceRequest,
    ) -> Result<DeviceResponse, DeviceError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        endpoint: &DeviceEndpoint,
        request: &DeviceRequest,
    ) -> Result<DeviceResponse, DeviceError> {
        (**self).send(endpoint, request).await
    }
}

/// Power state as reported by `GET /power`. Only the exact string `"on"`
/// counts as on; every other token is some flavour of standby.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum PowerState {
    On,
    Standby(String),
}

impl PowerState {
    pub fn is_on(&self) -> bool {
        matches!(self, PowerState::On)
    }
}

impl From<String> for PowerState {
    fn from(value: String) -> Self {
        if value == "on" {
            PowerState::On
        } else {
            PowerState::Standby(value)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerAction {
    On,
    Off,
    Toggle,
}

impl PowerAction {
    /// Whether the device should end up on, given its current state.
    pub fn wants_on(self, current: &PowerState) -> bool {
        match self {
            PowerAction::On => true,
            PowerAction::Off => false,
            PowerAction::Toggle => !current.is_on(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Playback {
    Next,
    Previous,
    PlayPause,
}

impl Playback {
    pub fn cmd(self) -> &'static str {
        match self {
            Playback::Next => "next",
            Playback::Previous => "prev",
            Playback::PlayPause => "playpause",
        }
    }
}

/// Inputs exposed under `/inputs/{id}` on Uniti devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Input {
    #[serde(rename = "ana1")]
    Analog1,
    #[serde(rename = "dig1")]
    Digital1,
    #[serde(rename = "dig2")]
    Digital2,
    #[serde(rename = "dig3")]
    Digital3,
    Usb,
    Bluetooth,
    Radio,
    Upnp,
    Spotify,
    Tidal,
    Airplay,
    Chromecast,
    Hdmi,
}

impl Input {
    pub const ALL: [Input; 13] = [
        Input::Analog1,
        Input::Digital1,
        Input::Digital2,
        Input::Digital3,
        Input::Usb,
        Input::Bluetooth,
        Input::Radio,
        Input::Upnp,
        Input::Spotify,
        Input::Tidal,
        Input::Airplay,
        Input::Chromecast,
        Input::Hdmi,
    ];

    pub fn id(self) -> &'static str {
        match self {
            Input::Analog1 => "ana1",
            Input::Digital1 => "dig1",
            Input::Digital2 => "dig2",
            Input::Digital3 => "dig3",
            Input::Usb => "usb",
            Input::Bluetooth => "bluetooth",
            Input::Radio => "radio",
            Input::Upnp => "upnp",
            Input::Spotify => "spotify",
            Input::Tidal => "tidal",
            Input::Airplay => "airplay",
            Input::Chromecast => "chromecast",
            Input::Hdmi => "hdmi",
        }
    }

    pub fn path(self) -> String {
        format!("/inputs/{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use std::net::{Ipv4Addr, Ipv6Addr};

    use super::*;

    #[test]
    fn base_url_brackets_ipv6() {
        let v4 = DeviceEndpoint::new(IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)));
        assert_eq!(v4.url(LEVELS_PATH), "http://192.168.1.20:15081/levels/room");

        let v6 = DeviceEndpoint::new(IpAddr::V6(Ipv6Addr::LOCALHOST));
        assert_eq!(v6.base_url(), "http://[::1]:15081");
    }

    #[test]
    fn request_display_includes_query() {
        let request = DeviceRequest::put(LEVELS_PATH).param("volume", 23);
        assert_eq!(request.to_string(), "PUT /levels/room?volume=23");
        assert_eq!(DeviceRequest::get(POWER_PATH).to_string(), "GET /power");
    }

    #[test]
    fn power_state_only_exact_on_is_on() {
        assert!(PowerState::from("on".to_string()).is_on());
        assert!(!PowerState::from("On".to_string()).is_on());
        assert_eq!(
            PowerState::from("lona".to_string()),
            PowerState::Standby("lona".into())
        );
    }

    #[test]
    fn toggle_flips_current_state() {
        assert!(!PowerAction::Toggle.wants_on(&PowerState::On));
        assert!(PowerAction::Toggle.wants_on(&PowerState::Standby("lona".into())));
        assert!(PowerAction::On.wants_on(&PowerState::On));
        assert!(!PowerAction::Off.wants_on(&PowerState::Standby("lona".into())));
    }

    #[test]
    fn input_ids_match_serde_names() {
        for input in Input::ALL {
            let json = serde_json::to_string(&input).unwrap();
            assert_eq!(json, format!("\"{}\"", input.id()));
        }
        assert_eq!(Input::Digital2.path(), "/inputs/dig2");
    }
}
