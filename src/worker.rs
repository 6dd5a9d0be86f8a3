//! Consumer side of the queue: decode a published command and run it.

use std::future::Future;
use std::net::IpAddr;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::DeviceSettings;
use crate::device::{DeviceClient, Transport};
use crate::dispatch::{self, Outcome, QueuedCommand};
use crate::mqtt::{CommandReport, Handled, MqttMessage};

/// Consume commands one at a time, in arrival order, until the channel
/// closes or `shutdown` resolves. Every message, valid or not, is handed
/// back on `handled_tx` so it gets acked; that channel is unbounded so the
/// broker loop feeding `command_rx` can never wait on this one.
pub async fn run<T, F, S>(
    mut command_rx: mpsc::Receiver<MqttMessage>,
    handled_tx: mpsc::UnboundedSender<Handled>,
    command_topic: &str,
    settings: &DeviceSettings,
    connect: F,
    shutdown: S,
) where
    T: Transport,
    F: Fn(IpAddr) -> DeviceClient<T>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            msg = command_rx.recv() => {
                let Some(msg) = msg else {
                    warn!("Command channel closed");
                    break;
                };
                let report = if msg.topic == command_topic {
                    handle_payload(&msg.payload, settings, &connect).await
                } else {
                    warn!("Ignoring message on unexpected topic {}", msg.topic);
                    None
                };
                let handled = Handled {
                    publish: msg.publish,
                    report,
                };
                if handled_tx.send(handled).is_err() {
                    warn!("Report channel closed");
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }
}

/// Execute one queued command. Returns `None` for payloads that are not a
/// valid command; those are dropped with a warning.
pub async fn handle_payload<T, F>(
    payload: &str,
    settings: &DeviceSettings,
    connect: F,
) -> Option<CommandReport>
where
    T: Transport,
    F: FnOnce(IpAddr) -> DeviceClient<T>,
{
    let queued: QueuedCommand = match serde_json::from_str(payload) {
        Ok(q) => q,
        Err(e) => {
            warn!("Dropping malformed command {:?}: {}", payload, e);
            return None;
        }
    };

    let client = connect(queued.ip);
    info!("Executing {} on {}", queued.command.action, queued.ip);
    let outcome = dispatch::execute(&client, &queued.command, settings).await;

    match &outcome {
        Outcome::Done {
            confirmation: Some(confirmation),
        } => info!("{}", confirmation),
        Outcome::Done { confirmation: None } => {}
        Outcome::Skipped => info!("{} on {} skipped", queued.command.action, queued.ip),
    }

    Some(CommandReport::new(queued.ip, queued.command.action, &outcome))
}
