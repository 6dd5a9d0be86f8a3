pub mod client;
pub mod producer;

use std::net::IpAddr;
use std::time::Duration;

use rumqttc::{MqttOptions, Publish};
use serde::{Deserialize, Serialize};

use crate::config::MqttConfig;
use crate::dispatch::{Action, Outcome};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Client(#[from] rumqttc::ClientError),
    #[error(transparent)]
    Connection(#[from] rumqttc::ConnectionError),
    #[error(transparent)]
    Encode(#[from] serde_json::Error),
}

/// A raw message received from the broker. `publish` is kept so the
/// message can be acked once it has been handled.
pub struct MqttMessage {
    pub topic: String,
    pub payload: String,
    pub publish: Publish,
}

impl MqttMessage {
    pub fn new(publish: Publish) -> Self {
        Self {
            topic: publish.topic.clone(),
            payload: String::from_utf8_lossy(&publish.payload).to_string(),
            publish,
        }
    }
}

/// A message the worker is done with: ack it, then publish the report if any.
pub struct Handled {
    pub publish: Publish,
    pub report: Option<CommandReport>,
}

/// What the worker did with one queued command, published to the result topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    pub ip: IpAddr,
    pub action: Action,
    pub status: ReportStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirmation: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Done,
    Skipped,
}

impl CommandReport {
    pub fn new(ip: IpAddr, action: Action, outcome: &Outcome) -> Self {
        let (status, confirmation) = match outcome {
            Outcome::Skipped => (ReportStatus::Skipped, None),
            Outcome::Done { confirmation } => (
                ReportStatus::Done,
                confirmation.as_ref().map(ToString::to_string),
            ),
        };
        Self {
            ip,
            action,
            status,
            confirmation,
        }
    }
}

pub(crate) fn mqtt_options(config: &MqttConfig) -> MqttOptions {
    let mut mqttopts = MqttOptions::new(&config.client_id, &config.broker_host, config.broker_port);
    mqttopts.set_keep_alive(Duration::from_secs(30));

    if let (Some(user), Some(pass)) = (&config.username, &config.password) {
        mqttopts.set_credentials(user, pass);
    }
    mqttopts
}

/// Persistent session with manual acks: the broker keeps the subscription
/// and undelivered commands while the worker is offline, and redelivers
/// anything not acked after execution.
pub(crate) fn worker_options(config: &MqttConfig) -> MqttOptions {
    let mut mqttopts = mqtt_options(config);
    mqttopts.set_clean_session(false);
    mqttopts.set_manual_acks(true);
    mqttopts
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;
    use crate::dispatch::Confirmation;

    fn config() -> MqttConfig {
        MqttConfig::from_lookup(
            |key| (key == "MQTT_BROKER_HOST").then(|| "broker".to_string()),
            "naim-worker",
        )
        .unwrap()
    }

    #[test]
    fn worker_session_survives_disconnects() {
        let opts = worker_options(&config());
        assert!(!opts.clean_session());
        assert!(opts.manual_acks());
        assert_eq!(opts.client_id(), "naim-worker");
    }

    #[test]
    fn producer_session_is_clean() {
        let opts = mqtt_options(&config());
        assert!(opts.clean_session());
        assert!(!opts.manual_acks());
    }

    #[test]
    fn message_keeps_publish_for_ack() {
        let publish = Publish::new("naim/command", rumqttc::QoS::AtLeastOnce, "{}");
        let msg = MqttMessage::new(publish);
        assert_eq!(msg.topic, "naim/command");
        assert_eq!(msg.payload, "{}");
        assert_eq!(msg.publish.topic, "naim/command");
    }

    #[test]
    fn report_from_outcome() {
        let ip = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
        let report = CommandReport::new(
            ip,
            Action::VolumeUp,
            &Outcome::Done {
                confirmation: Some(Confirmation::Volume(Some(21))),
            },
        );
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            serde_json::json!({
                "ip": "192.168.1.20",
                "action": "volume-up",
                "status": "done",
                "confirmation": "Volume has been set to 21",
            })
        );

        let skipped = CommandReport::new(ip, Action::MuteToggle, &Outcome::Skipped);
        assert_eq!(skipped.status, ReportStatus::Skipped);
        assert!(
            !serde_json::to_string(&skipped)
                .unwrap()
                .contains("confirmation")
        );
    }
}
