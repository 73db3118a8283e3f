//! Domain layer: identifiers, envelopes, and the shared registries.
//!
//! This module contains the routing vocabulary (namespaces, rooms, bus
//! channels, validated envelopes) and the two cross-process stores built on
//! [`crate::persistence::SharedStore`]: the session registry and the
//! conversation room membership store.

pub mod channel;
pub mod envelope;
pub mod handle;
pub mod namespace;
pub mod room;
pub mod room_membership;
pub mod session;
pub mod session_registry;

pub use channel::Channel;
pub use envelope::{BusEvent, Envelope, events};
pub use handle::ConnectionHandle;
pub use namespace::{ActorType, Namespace};
pub use room::RoomKey;
pub use room_membership::RoomMembership;
pub use session::{Identity, Session};
pub use session_registry::SessionRegistry;
