use rumqttc::{AsyncClient, Event, Incoming, QoS};
use tracing::{debug, info};

use crate::config::MqttConfig;
use crate::dispatch::QueuedCommand;

use super::{QueueError, mqtt_options};

/// Publish one command for a worker to execute. Returns once the broker has
/// acknowledged the publish; execution happens elsewhere.
pub async fn publish_command(config: &MqttConfig, command: &QueuedCommand) -> Result<(), QueueError> {
    let payload = serde_json::to_vec(command)?;
    let topic = config.command_topic();

    let (client, mut eventloop) = AsyncClient::new(mqtt_options(config), 10);
    client
        .publish(&topic, QoS::AtLeastOnce, false, payload)
        .await?;

    loop {
        match eventloop.poll().await? {
            Event::Incoming(Incoming::PubAck(_)) => break,
            Event::Incoming(Incoming::ConnAck(_)) => {
                debug!(
                    "Connected to MQTT broker {}:{}",
                    config.broker_host, config.broker_port
                );
            }
            _ => {}
        }
    }
    info!("Queued {} for {} on {}", command.command.action, command.ip, topic);

    client.disconnect().await?;
    // Flush the DISCONNECT packet; the broker closing the socket is expected.
    let _ = eventloop.poll().await;
    Ok(())
}
