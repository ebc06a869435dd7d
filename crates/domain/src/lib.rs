//! # dusklight-domain
//!
//! Pure domain model for the dusklight presence/sun light trigger.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **presence** (tracked devices and the "anyone home" aggregate)
//! - Define the **sun phase** as reported by an astronomy collaborator
//! - Define **lights** (managed targets and the commands sent to them)
//! - Define **events** (inbound collaborator notifications and the normalized
//!   changes the engine reacts to)
//! - Define the **trigger** rules as a pure decision function
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod event;
pub mod light;
pub mod presence;
pub mod sun;
pub mod trigger;
