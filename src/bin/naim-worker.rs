use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::mpsc;
use tracing::{error, info};

use naim_remote::config::{DeviceSettings, MqttConfig};
use naim_remote::device::DeviceClient;
use naim_remote::mqtt::client::MqttClient;
use naim_remote::mqtt::{Handled, MqttMessage};
use naim_remote::worker;

#[tokio::main]
async fn main() {
    naim_remote::init_tracing("info");

    let config = match MqttConfig::from_env("naim-worker") {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let settings = DeviceSettings::from_env();

    // Registered once, up front, so a signal that lands mid-command is kept.
    let sigint = register(SignalKind::interrupt(), "SIGINT");
    let sigterm = register(SignalKind::terminate(), "SIGTERM");

    info!(
        "Starting naim-worker (mqtt={}:{}, client_id={}, topic={}, off_token={})",
        config.broker_host,
        config.broker_port,
        config.client_id,
        config.command_topic(),
        settings.off_token,
    );

    // Channels
    let (command_tx, command_rx) = mpsc::channel::<MqttMessage>(100);
    let (handled_tx, handled_rx) = mpsc::unbounded_channel::<Handled>();

    let mqtt_client = MqttClient::new(&config);
    let mqtt_handle = tokio::spawn(async move {
        mqtt_client.run(command_tx, handled_rx).await;
    });

    let command_topic = config.command_topic();
    worker::run(
        command_rx,
        handled_tx,
        &command_topic,
        &settings,
        |ip| DeviceClient::new(ip, &settings),
        shutdown(sigint, sigterm),
    )
    .await;

    mqtt_handle.abort();
    info!("naim-worker stopped");
}

fn register(kind: SignalKind, name: &str) -> Option<Signal> {
    match signal(kind) {
        Ok(s) => Some(s),
        Err(e) => {
            error!("Failed to register {} handler: {}", name, e);
            None
        }
    }
}

async fn recv(signal: Option<Signal>) {
    match signal {
        Some(mut s) => {
            s.recv().await;
        }
        None => std::future::pending::<()>().await,
    }
}

async fn shutdown(sigint: Option<Signal>, sigterm: Option<Signal>) {
    tokio::select! {
        _ = recv(sigint) => info!("Received SIGINT, shutting down"),
        _ = recv(sigterm) => info!("Received SIGTERM, shutting down"),
    }
}
