use rumqttc::{AsyncClient, Event, EventLoop, Incoming, LastWill, QoS};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::MqttConfig;

use super::{Handled, MqttMessage, worker_options};

/// Worker-side broker connection.
pub struct MqttClient {
    client: AsyncClient,
    eventloop: EventLoop,
    config: MqttConfig,
}

impl MqttClient {
    pub fn new(config: &MqttConfig) -> Self {
        let mut mqttopts = worker_options(config);

        // LWT: the broker flips worker_status to "offline" if we drop off.
        let lwt = LastWill::new(
            config.worker_status_topic(),
            "offline".as_bytes().to_vec(),
            QoS::AtLeastOnce,
            true,
        );
        mqttopts.set_last_will(lwt);

        let (client, eventloop) = AsyncClient::new(mqttopts, 100);

        Self {
            client,
            eventloop,
            config: config.clone(),
        }
    }

    /// Run the MQTT event loop. Subscribes to the command topic on every
    /// connect, forwards incoming publishes through command_tx, and for each
    /// message handed back on handled_rx acks it and publishes its report.
    pub async fn run(
        mut self,
        command_tx: mpsc::Sender<MqttMessage>,
        mut handled_rx: mpsc::UnboundedReceiver<Handled>,
    ) {
        let command_topic = self.config.command_topic();
        let status_topic = self.config.worker_status_topic();
        let result_topic = self.config.result_topic();

        loop {
            tokio::select! {
                event = self.eventloop.poll() => {
                    match event {
                        Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                            info!("Connected to MQTT broker");

                            if let Err(e) = self
                                .client
                                .publish(&status_topic, QoS::AtLeastOnce, true, "online")
                                .await
                            {
                                error!("Failed to publish online status: {}", e);
                            }

                            if let Err(e) = self
                                .client
                                .subscribe(&command_topic, QoS::AtLeastOnce)
                                .await
                            {
                                error!("Failed to subscribe to {}: {}", command_topic, e);
                            }
                        }
                        Ok(Event::Incoming(Incoming::Publish(publish))) => {
                            if command_tx.send(MqttMessage::new(publish)).await.is_err() {
                                warn!("Command channel closed");
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("MQTT connection error: {}. Reconnecting...", e);
                            tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                        }
                    }
                }
                Some(handled) = handled_rx.recv() => {
                    if let Err(e) = self.client.ack(&handled.publish).await {
                        warn!("Failed to ack command: {}", e);
                    }
                    let Some(report) = handled.report else {
                        continue;
                    };
                    let payload = match serde_json::to_vec(&report) {
                        Ok(p) => p,
                        Err(e) => {
                            warn!("Failed to encode report: {}", e);
                            continue;
                        }
                    };
                    if let Err(e) = self
                        .client
                        .publish(&result_topic, QoS::AtLeastOnce, false, payload)
                        .await
                    {
                        warn!("Failed to publish {}: {}", result_topic, e);
                    }
                }
            }
        }
    }
}
