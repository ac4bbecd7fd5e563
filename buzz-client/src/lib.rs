//! # buzz-client
//!
//! Client library for buzzline: direct buzz dispatch and group channels.
//!
//! ## Features
//!
//! - **Fan-out dispatch**: [`BuzzDispatcher`] pushes one message to many
//!   relay endpoints concurrently with per-target failure isolation.
//! - **Group channels**: [`GroupChannel`] abstracts over a realtime pub/sub
//!   store and a local offline simulation behind one backend trait.
//! - **Idempotent merge**: all history mutations funnel through one
//!   per-group merge point, so optimistic publishes and remote echoes
//!   never produce duplicate entries.
//!
//! ## Example
//!
//! ```ignore
//! use buzz_client::{BuzzDispatcher, GroupChannel, ChannelConfig, OfflineWorld};
//!
//! let world = OfflineWorld::new();
//! let channel = GroupChannel::connect(config, &world);
//! let group = channel.create("Standup").await?;
//! println!("join code: {}", group.join_code());
//! channel.publish_buzz(&group, "on my way").await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod relay;
pub mod store;

pub use channel::{
    ChannelError, ChannelMode, EventListener, GroupBackend, GroupChannel, GroupHandle,
    OfflineWorld, Subscription,
};
pub use config::{ActorProfile, ChannelConfig, DispatchConfig, StoreConfig};
pub use dispatch::{BatchReport, BuzzDispatcher, DeliveryFailure, DispatchError};
pub use relay::{HttpRelay, MockRelay, PushRelay, PushRequest, RelayError};
pub use store::{GroupRecord, GroupStore, MockStore, RestStore, StoreError};
