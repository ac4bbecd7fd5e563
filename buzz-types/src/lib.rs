//! # buzz-types
//!
//! Data model types for the buzzline attention-alert system.
//!
//! This crate provides the foundational types used across all buzzline crates:
//! - [`ActorId`], [`GroupId`], [`EventId`] - Identity types
//! - [`JoinCode`] - Short numeric group discovery code
//! - [`Event`], [`EventKind`] - Group notification events
//! - [`Target`] - A push-delivery recipient

#![warn(missing_docs)]
#![warn(clippy::all)]

mod event;
mod ids;
mod target;

pub use event::{Event, EventKind};
pub use ids::{ActorId, EventId, GroupId, InvalidJoinCode, JoinCode};
pub use target::Target;
