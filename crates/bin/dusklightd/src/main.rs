//! # dusklightd — dusklight daemon
//!
//! Composition root that wires the trigger engine to virtual lights and feeds
//! it events read from stdin.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Construct the light gateway over the virtual light adapter
//! - Construct the trigger engine, injecting the gateway and decision bus
//! - Read JSON-lines events from stdin into the engine queue
//! - Print every trigger decision as a JSON line on stdout
//! - Stop on end of input or SIGINT, then log the final light states
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use dusklight_adapter_virtual::VirtualLightSink;
use dusklight_app::decision_bus::InProcessDecisionBus;
use dusklight_app::event_queue::{self, EngineHandle};
use dusklight_app::services::light_gateway::LightGateway;
use dusklight_app::services::presence_aggregator::PresenceAggregator;
use dusklight_app::trigger_engine::TriggerEngine;
use dusklight_domain::event::InboundEvent;
use dusklight_domain::time;
use dusklight_domain::trigger::TriggerDecision;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_logging(&config.logging.filter)?;

    // Lights
    let lights = config.light_ids()?;
    if lights.is_empty() {
        tracing::warn!("no lights configured, the engine will never actuate anything");
    }
    let sink = VirtualLightSink::new(lights.clone());
    let gateway = LightGateway::new(sink, lights, config.actuation_timeout());

    // Decision bus
    let bus = Arc::new(InProcessDecisionBus::new(64));
    let decision_log = tokio::spawn(print_decisions(BroadcastStream::new(bus.subscribe())));

    // Engine
    let presence = PresenceAggregator::new(config.known_devices()?, time::now());
    let engine = TriggerEngine::new(
        config.trigger_settings(),
        presence,
        gateway,
        Arc::clone(&bus),
    );
    let (handle, inbox) = event_queue::channel(config.engine.queue_capacity);
    let engine_task = tokio::spawn(engine.run(inbox));

    tokio::select! {
        result = feed_events(BufReader::new(tokio::io::stdin()), handle) => {
            result?;
            tracing::info!("end of input, shutting down");
        }
        result = tokio::signal::ctrl_c() => {
            result.context("failed to listen for shutdown signal")?;
            tracing::info!("interrupted, shutting down");
        }
    }

    let engine = engine_task.await.context("trigger engine task failed")?;
    for target in engine.gateway().targets() {
        tracing::info!(
            light_id = %target.id,
            state = %target.current_known_state,
            "final light state"
        );
    }
    if let Some(decision) = bus.latest() {
        tracing::info!(
            rule = %decision.rule,
            outcome = ?decision.outcome,
            at = %decision.timestamp,
            "last trigger decision"
        );
    }

    drop(engine);
    drop(bus);
    decision_log.await.context("decision log task failed")?;
    Ok(())
}

fn init_logging(filter: &str) -> anyhow::Result<()> {
    let filter =
        tracing_subscriber::EnvFilter::try_new(filter).context("invalid logging filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Push every JSON line of `reader` into the engine queue.
///
/// Malformed lines are logged and skipped.
async fn feed_events<R>(reader: R, handle: EngineHandle) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<InboundEvent>(line) {
            Ok(event) => handle.submit(event).await?,
            Err(err) => tracing::warn!(%err, line, "ignoring malformed event"),
        }
    }
    Ok(())
}

async fn print_decisions(mut decisions: BroadcastStream<TriggerDecision>) {
    while let Some(item) = decisions.next().await {
        match item {
            Ok(decision) => match serde_json::to_string(&decision) {
                Ok(json) => println!("{json}"),
                Err(err) => tracing::warn!(%err, "failed to serialize trigger decision"),
            },
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "decision log lagged, some decisions were dropped");
            }
        }
    }
}
