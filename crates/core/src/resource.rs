//! Identity contract shared by every CRUD resource.

use core::fmt::{Debug, Display};

/// A server-side entity exposed through create/read/update/delete.
pub trait Resource: Clone + Send + Sync + 'static {
    type Id: Clone + PartialEq + Display + Debug + Send + Sync + 'static;

    fn id(&self) -> Self::Id;

    /// Human-readable label, e.g. for a delete confirmation prompt.
    fn label(&self) -> Option<String> {
        None
    }
}
