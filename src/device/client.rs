use std::net::IpAddr;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::DeviceSettings;

use super::api::{LevelsBody, PowerBody};
use super::{
    DeviceEndpoint, DeviceError, DeviceRequest, DeviceResponse, Input, LEVELS_PATH, Method,
    NOW_PLAYING_PATH, POWER_PATH, Playback, PowerState, Transport,
};

/// Plain HTTP transport. Uses reqwest's defaults for timeouts.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &DeviceEndpoint,
        request: &DeviceRequest,
    ) -> Result<DeviceResponse, DeviceError> {
        let url = endpoint.url(&request.path);
        let mut builder = match request.method {
            Method::Get => self.client.get(&url),
            Method::Put => self.client.put(&url),
        };
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                DeviceError::Unreachable(e.to_string())
            } else {
                DeviceError::Http(e)
            }
        })?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(DeviceResponse { status, body })
    }
}

pub struct DeviceClient<T = HttpTransport> {
    endpoint: DeviceEndpoint,
    transport: T,
    off_token: String,
}

impl DeviceClient<HttpTransport> {
    pub fn new(ip: IpAddr, settings: &DeviceSettings) -> Self {
        Self::with_transport(ip, HttpTransport::new(), settings)
    }
}

impl<T: Transport> DeviceClient<T> {
    pub fn with_transport(ip: IpAddr, transport: T, settings: &DeviceSettings) -> Self {
        Self {
            endpoint: DeviceEndpoint::new(ip),
            transport,
            off_token: settings.off_token.clone(),
        }
    }

    pub fn endpoint(&self) -> &DeviceEndpoint {
        &self.endpoint
    }

    async fn fetch<B: DeserializeOwned>(&self, path: &str) -> Result<B, DeviceError> {
        let response = self
            .transport
            .send(&self.endpoint, &DeviceRequest::get(path))
            .await?;
        if response.status != 200 {
            return Err(DeviceError::Status(response.status));
        }
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Fetch and decode a body. Every failure collapses to `None`; callers
    /// treat that as "nothing to act on".
    async fn read<B: DeserializeOwned>(&self, path: &str) -> Option<B> {
        match self.fetch(path).await {
            Ok(body) => Some(body),
            Err(e) => {
                debug!("Read of {} from {} failed: {}", path, self.endpoint.ip, e);
                None
            }
        }
    }

    pub async fn read_volume(&self) -> Option<i64> {
        self.read::<LevelsBody>(LEVELS_PATH).await?.volume
    }

    pub async fn read_mute(&self) -> Option<bool> {
        self.read::<LevelsBody>(LEVELS_PATH).await?.mute
    }

    pub async fn read_power(&self) -> Option<PowerState> {
        self.read::<PowerBody>(POWER_PATH).await?.system
    }

    /// Send a state-changing request. The response body is never used and a
    /// non-200 status is only logged.
    async fn write(&self, request: DeviceRequest) -> Result<(), DeviceError> {
        debug!("{} -> {}", request, self.endpoint.ip);
        let response = self.transport.send(&self.endpoint, &request).await?;
        if response.status != 200 {
            debug!("{} answered with status {}", request, response.status);
        }
        Ok(())
    }

    /// No clamping here; the device floors volume at 0 itself.
    pub async fn write_volume(&self, volume: i64) -> Result<(), DeviceError> {
        self.write(DeviceRequest::put(LEVELS_PATH).param("volume", volume))
            .await
    }

    pub async fn write_mute(&self, muted: bool) -> Result<(), DeviceError> {
        self.write(DeviceRequest::put(LEVELS_PATH).param("mute", u8::from(muted)))
            .await
    }

    pub async fn write_power(&self, on: bool) -> Result<(), DeviceError> {
        let system = if on { "on" } else { self.off_token.as_str() };
        self.write(DeviceRequest::put(POWER_PATH).param("system", system))
            .await
    }

    pub async fn playback(&self, action: Playback) -> Result<(), DeviceError> {
        self.write(DeviceRequest::get(NOW_PLAYING_PATH).param("cmd", action.cmd()))
            .await
    }

    pub async fn select_input(&self, input: Input) -> Result<(), DeviceError> {
        self.write(DeviceRequest::get(input.path()).param("cmd", "select"))
            .await
    }
}
