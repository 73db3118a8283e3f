//! Data Transfer Objects for REST request/response serialization.

pub mod common_dto;
pub mod conversation_dto;
pub mod event_dto;
pub mod ticket_dto;

pub use common_dto::*;
pub use conversation_dto::*;
pub use event_dto::*;
pub use ticket_dto::*;
