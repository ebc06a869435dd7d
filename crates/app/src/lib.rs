//! # dusklight-app
//!
//! Application layer — the trigger engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `LightCommandSink` — deliver one light command to a physical/virtual light
//!   - `DecisionPublisher` — emit trigger decisions for logging/telemetry
//! - Provide the engine's building blocks as services:
//!   - `PresenceAggregator` — per-device presence and the "anyone home" flag
//!   - `SunPhaseTracker` — last reported sun phase and its staleness deadline
//!   - `LightGateway` — idempotent, bounded, per-light actuation
//! - Provide the `TriggerEngine` and its single-consumer event queue
//! - Provide **in-process infrastructure** (decision bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `dusklight-domain` only (plus `tokio` for channels and timers).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod decision_bus;
pub mod event_queue;
pub mod ports;
pub mod services;
pub mod trigger_engine;
