//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the trigger core and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod decision_publisher;
pub mod light_sink;

pub use decision_publisher::DecisionPublisher;
pub use light_sink::LightCommandSink;
