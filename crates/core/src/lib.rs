//! `crudstack-core`: shared vocabulary for the CRUD backend and its clients.
//!
//! This crate holds **pure** types (no IO, no async): identifiers, the error
//! model, table query state and its wire encoding, the structured validation
//! payload, and the resources served by the API.

pub mod error;
pub mod id;
pub mod query;
pub mod resource;
pub mod user;
pub mod validation;

pub use error::{DomainError, DomainResult};
pub use id::UserId;
pub use query::{ListQuery, Page, PageMeta, QueryParams, Sort, SortDirection, TableState};
pub use resource::Resource;
pub use user::{User, UserPayload};
pub use validation::ValidationErrors;
