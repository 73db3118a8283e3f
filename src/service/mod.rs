//! Service layer: routing policy, dispatch and orchestration.
//!
//! - [`broadcast_policy`] decides where a bus event goes.
//! - [`LocalDispatcher`] applies those decisions to this process's hub.
//! - [`ConversationService`] and [`TicketService`] publish the events that
//!   gateways and the REST surface originate.
//! - [`collaborators`] defines the black-box token and database contracts.

pub mod broadcast_policy;
pub mod collaborators;
pub mod conversation_service;
pub mod dispatcher;
pub mod ticket_service;
pub mod token;

pub use collaborators::{DomainStore, TokenVerifier};
pub use conversation_service::ConversationService;
pub use dispatcher::LocalDispatcher;
pub use ticket_service::{SlaAlert, TicketService};
pub use token::JwtVerifier;
