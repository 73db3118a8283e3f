//! WebSocket layer: upgrade handlers, the per-connection loop, the local
//! connection hub and the wire frames.
//!
//! Four endpoints share one transport: `/ws/agent`, `/ws/customer`,
//! `/ws/ticket` and `/ws/ticket-sla`. Each upgraded socket is bound to the
//! namespace gateway of its endpoint.

pub mod connection;
pub mod handler;
pub mod hub;
pub mod messages;
