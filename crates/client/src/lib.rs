//! `crudstack-client`
//!
//! **Responsibility:** headless controllers for list/form/delete screens that
//! talk to the users API.
//!
//! This crate provides:
//! - A table controller (paging, sorting, debounced search, fetch ordering)
//! - A create/edit form controller with server-side validation mapping
//! - A two-step delete confirmation
//! - A session context and column descriptors for presentation layers
//! - A `reqwest` client for the `/users` endpoints
//!
//! Controllers spawn their timers and fetches onto the ambient tokio runtime,
//! so they must be constructed from inside one.

pub mod columns;
pub mod config;
pub mod debounce;
pub mod delete;
pub mod error;
pub mod form;
pub mod http;
pub mod notify;
pub mod session;
pub mod source;
pub mod table;

pub use columns::{Alignment, ColumnDescriptor};
pub use config::ClientConfig;
pub use delete::{CommitOutcome, DeleteConfirmation, DeleteMessages, ItemList};
pub use error::ClientError;
pub use form::{FormMode, ResourceForm, SubmitOutcome};
pub use http::UsersClient;
pub use notify::{NotificationLevel, NotificationLog, Notifier, TracingNotifier};
pub use session::{IdentitySource, SessionContext, SessionState};
pub use source::{PageSource, ResourceApi};
pub use table::{TableController, TableOptions};
