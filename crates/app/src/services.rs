//! Engine services — the stateful building blocks the trigger engine owns.
//!
//! Each service is plain owned state with synchronous (or, for the gateway,
//! port-driven async) operations. None of them is shared across tasks; the
//! engine's processing loop is their only caller.

pub mod light_gateway;
pub mod presence_aggregator;
pub mod sun_tracker;
