//! Habla terminal front end.
//!
//! Drives a single realtime voice session from the keyboard: every toggle
//! fetches a fresh credential from the broker and opens (or closes) the
//! provider session. Status goes to stdout, logs to stderr.

mod view;

use anyhow::Context;
use clap::Parser;
use habla_core::{
    BrokerClient, ControllerError, DEFAULT_REALTIME_MODEL, VoiceController,
    openai::{DEFAULT_REALTIME_ENDPOINT, OpenAISessionFactory},
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{Level, debug, info};
use view::{BUSY_TEXT, Command, HELP_TEXT, render};

#[derive(Parser, Debug)]
#[command(name = "habla", version, about = "Realtime voice chat from the terminal")]
struct Args {
    /// Base URL of the token broker.
    #[arg(long, env = "HABLA_BROKER_URL", default_value = "http://127.0.0.1:3000")]
    broker_url: String,

    /// Realtime model the session is bound to.
    #[arg(long, env = "HABLA_REALTIME_MODEL", default_value = DEFAULT_REALTIME_MODEL)]
    model: String,

    /// Realtime WebSocket endpoint.
    #[arg(long, env = "HABLA_REALTIME_URL", default_value = DEFAULT_REALTIME_ENDPOINT)]
    realtime_url: String,

    #[arg(long, env = "HABLA_LOG", default_value = "warn")]
    log_level: Level,
}

fn print_state(state: &habla_core::ControllerState) {
    for line in render(state) {
        println!("{}", line);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();
    info!(broker = %args.broker_url, model = %args.model, "Starting voice front end.");

    let controller = Arc::new(
        VoiceController::new(
            BrokerClient::new(&args.broker_url),
            OpenAISessionFactory::new(args.realtime_url),
        )
        .with_model(args.model),
    );
    let mut state_rx = controller.subscribe();

    println!("{}", HELP_TEXT);
    print_state(&state_rx.borrow_and_update());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read from stdin")? else {
                    break;
                };
                match Command::parse(&line) {
                    Some(Command::Toggle) => {
                        let controller = controller.clone();
                        tokio::spawn(async move {
                            match controller.toggle().await {
                                Ok(()) => {}
                                Err(ControllerError::Busy) => println!("{}", BUSY_TEXT),
                                // Failures are already reflected in the rendered state.
                                Err(e) => debug!(error = %e, "Toggle did not complete."),
                            }
                        });
                    }
                    Some(Command::Quit) => break,
                    None => println!("{}", HELP_TEXT),
                }
            }
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                print_state(&state_rx.borrow_and_update());
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    // Dropping the last handle tears the session down.
    drop(state_rx);
    drop(controller);
    info!("Voice front end stopped.");
    Ok(())
}
