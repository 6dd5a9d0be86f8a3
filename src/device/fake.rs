//! In-memory Uniti used by the tests. Holds levels and power state the way
//! the firmware reports them (numbers as strings) and records every request.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use super::{
    DeviceEndpoint, DeviceError, DeviceRequest, DeviceResponse, LEVELS_PATH, Method, POWER_PATH,
    Transport,
};

struct State {
    volume: i64,
    muted: bool,
    power: String,
    read_status: u16,
    write_status: u16,
    unreachable: bool,
    levels_body: Option<String>,
}

pub(crate) struct FakeDevice {
    state: Mutex<State>,
    requests: Mutex<Vec<DeviceRequest>>,
}

impl FakeDevice {
    pub(crate) fn new(volume: i64, muted: bool, power: &str) -> Self {
        Self {
            state: Mutex::new(State {
                volume,
                muted,
                power: power.to_string(),
                read_status: 200,
                write_status: 200,
                unreachable: false,
                levels_body: None,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn set_read_status(&self, status: u16) {
        self.state.lock().unwrap().read_status = status;
    }

    pub(crate) fn set_write_status(&self, status: u16) {
        self.state.lock().unwrap().write_status = status;
    }

    pub(crate) fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub(crate) fn set_levels_body(&self, body: &str) {
        self.state.lock().unwrap().levels_body = Some(body.to_string());
    }

    pub(crate) fn volume(&self) -> i64 {
        self.state.lock().unwrap().volume
    }

    pub(crate) fn muted(&self) -> bool {
        self.state.lock().unwrap().muted
    }

    pub(crate) fn power(&self) -> String {
        self.state.lock().unwrap().power.clone()
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    pub(crate) fn writes(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == Method::Put || !r.query.is_empty())
            .map(ToString::to_string)
            .collect()
    }
}

#[async_trait]
impl Transport for FakeDevice {
    async fn send(
        &self,
        _endpoint: &DeviceEndpoint,
        request: &DeviceRequest,
    ) -> Result<DeviceResponse, DeviceError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(DeviceError::Unreachable("connection refused".into()));
        }

        let body = match (request.method, request.path.as_str()) {
            (Method::Get, LEVELS_PATH) if request.query.is_empty() => {
                let body = state.levels_body.clone().unwrap_or_else(|| {
                    json!({
                        "volume": state.volume.to_string(),
                        "mute": u8::from(state.muted).to_string(),
                    })
                    .to_string()
                });
                return Ok(DeviceResponse {
                    status: state.read_status,
                    body,
                });
            }
            (Method::Get, POWER_PATH) if request.query.is_empty() => {
                return Ok(DeviceResponse {
                    status: state.read_status,
                    body: json!({ "system": state.power }).to_string(),
                });
            }
            (Method::Put, LEVELS_PATH) => {
                for (key, value) in &request.query {
                    match *key {
                        "volume" => {
                            if let Ok(v) = value.parse::<i64>() {
                                state.volume = v.max(0);
                            }
                        }
                        "mute" => state.muted = value != "0",
                        _ => {}
                    }
                }
                String::new()
            }
            (Method::Put, POWER_PATH) => {
                for (key, value) in &request.query {
                    if *key == "system" {
                        state.power = value.clone();
                    }
                }
                String::new()
            }
            _ => String::new(),
        };

        Ok(DeviceResponse {
            status: state.write_status,
            body,
        })
    }
}
