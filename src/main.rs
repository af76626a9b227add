// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Console controller for an aquaponics node.
//!
//! Reads menu keys from stdin and prints the node status. Logs go to stderr;
//! set `RUST_LOG` to change the level.

use std::process::ExitCode;
use std::time::Duration;

use aquactl::controller::Intent;
use aquactl::{
    Controller, ControllerConfig, ControllerEvent, EventStream, ExitReason, StatusSnapshot,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

const MENU: &str = "\
Commands:
  [1] Toggle pump
  [2] Toggle light
  [3] Turn both on
  [4] Turn both off
  [5] Refresh status
  [0] Exit
  or: pump on|off, light on|off";

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match ControllerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };

    info!(
        host = %config.mqtt.host(),
        port = config.mqtt.port(),
        status = %config.topics.status(),
        command = %config.topics.command(),
        "Starting aquaponics controller"
    );

    let mut controller = match Controller::connect(&config).await {
        Ok(controller) => controller,
        Err(e) => {
            error!(error = %e, "Could not connect to broker");
            return ExitCode::FAILURE;
        }
    };

    tokio::spawn(print_events(controller.events().stream(), config.stale_after));

    let (intent_tx, intent_rx) = mpsc::channel(16);
    tokio::spawn(read_intents(intent_tx));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            shutdown_tx.send_replace(true);
        }
    });

    println!("Waiting for node status...");

    match controller.run(intent_rx, shutdown_rx).await {
        Ok(reason) => {
            if reason == ExitReason::OperatorExit {
                println!("Controller stopped");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Controller stopped");
            ExitCode::FAILURE
        }
    }
}

/// Forwards parsed stdin lines to the controller until stdin closes.
async fn read_intents(intents: mpsc::Sender<Intent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => {}
            Ok(Some(line)) => match line.parse::<Intent>() {
                Ok(intent) => {
                    if intents.send(intent).await.is_err() {
                        break;
                    }
                }
                Err(e) => println!("{e}. Enter 0-5."),
            },
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                break;
            }
        }
    }
}

async fn print_events(mut events: EventStream, stale_after: Duration) {
    while let Some(event) = events.next().await {
        match event {
            ControllerEvent::Ready { snapshot } | ControllerEvent::StatusRefreshed { snapshot } => {
                print_status(&snapshot, stale_after);
                println!("{MENU}");
            }
            ControllerEvent::CommandSent { command } => println!("Sent command: {command}"),
            ControllerEvent::PublishFailed { command, error } => {
                println!("Command {command} not sent: {error}");
            }
            ControllerEvent::IntentRejected { .. } => println!("No status received yet"),
            _ => {}
        }
    }
}

fn print_status(snapshot: &StatusSnapshot, stale_after: Duration) {
    let status = snapshot.status();
    let on_off = |flag: Option<bool>| match flag {
        Some(true) => "ON",
        Some(false) => "OFF",
        None => "N/A",
    };
    let reading = |value: Option<f64>, unit: &str| {
        value.map_or_else(|| "N/A".to_string(), |v| format!("{v:.1}{unit}"))
    };

    println!("========================================");
    println!(
        "AQUAPONICS CONTROLLER  (#{} at {})",
        snapshot.revision(),
        snapshot.received_at().format("%H:%M:%S")
    );
    if snapshot.is_stale(stale_after) {
        println!(
            "!! status is {}s old, node may be offline",
            snapshot.age().as_secs()
        );
    }
    println!("Temperature: {}", reading(status.temperature, "°C"));
    println!("Humidity:    {}", reading(status.humidity, "%"));
    println!(
        "Water level: {}",
        status
            .water_level
            .as_ref()
            .map_or_else(|| "N/A".to_string(), ToString::to_string)
    );
    println!("Pump:        {}", on_off(status.pump_on));
    println!("Light:       {}", on_off(status.light_on));
    println!("========================================");
}
