//! Two-step delete: pick a record, then confirm.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crudstack_core::Resource;

use crate::error::ClientError;
use crate::notify::Notifier;
use crate::source::ResourceApi;
use crate::table::TableController;

/// A locally held list that deleted records can be removed from.
pub trait ItemList<T>: Send + Sync {
    /// Keep only the items for which `keep` returns true, preserving order.
    fn retain_items(&self, keep: &mut dyn FnMut(&T) -> bool);
}

impl<T: Clone + Send + Sync + 'static> ItemList<T> for TableController<T> {
    fn retain_items(&self, keep: &mut dyn FnMut(&T) -> bool) {
        self.update_items(|items| items.retain(|item| keep(item)));
    }
}

impl<T: Send + Sync> ItemList<T> for Mutex<Vec<T>> {
    fn retain_items(&self, keep: &mut dyn FnMut(&T) -> bool) {
        self.lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|item| keep(item));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteMessages {
    pub success: String,
    pub error: String,
}

impl Default for DeleteMessages {
    fn default() -> Self {
        Self {
            success: "Deleted successfully".to_string(),
            error: "Error deleting item".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Nothing was pending.
    Idle,
    Deleted,
    Failed(ClientError),
}

pub struct DeleteConfirmation<A: ResourceApi> {
    api: Arc<A>,
    list: Arc<dyn ItemList<A::Resource>>,
    notifier: Arc<dyn Notifier>,
    messages: DeleteMessages,
    pending: Mutex<Option<A::Resource>>,
}

impl<A: ResourceApi> DeleteConfirmation<A> {
    pub fn new(api: Arc<A>, list: Arc<dyn ItemList<A::Resource>>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            api,
            list,
            notifier,
            messages: DeleteMessages::default(),
            pending: Mutex::new(None),
        }
    }

    pub fn with_messages(mut self, messages: DeleteMessages) -> Self {
        self.messages = messages;
        self
    }

    fn slot(&self) -> MutexGuard<'_, Option<A::Resource>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select `item` for deletion; replaces any earlier selection.
    pub fn confirm_delete(&self, item: A::Resource) {
        *self.slot() = Some(item);
    }

    pub fn cancel_delete(&self) {
        self.slot().take();
    }

    pub fn pending(&self) -> Option<A::Resource> {
        self.slot().clone()
    }

    /// Whether the confirmation dialog should be open.
    pub fn is_open(&self) -> bool {
        self.slot().is_some()
    }

    /// Delete the pending item. On success it is removed from the list and a
    /// success notification is raised; on failure the list is untouched and
    /// an error notification is raised. The selection is cleared either way,
    /// unless another record was selected in the meantime.
    pub async fn commit_delete(&self) -> CommitOutcome {
        let Some(item) = self.pending() else {
            return CommitOutcome::Idle;
        };
        let id = item.id();

        let outcome = match self.api.delete(id.clone()).await {
            Ok(()) => {
                self.list.retain_items(&mut |row: &A::Resource| row.id() != id);
                tracing::info!(%id, "record deleted");
                self.notifier.success(&self.messages.success);
                CommitOutcome::Deleted
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "delete failed");
                self.notifier.error(&self.messages.error);
                CommitOutcome::Failed(err)
            }
        };

        // Leave a different selection made while the request was in flight.
        let mut slot = self.slot();
        if slot.as_ref().is_some_and(|staged| staged.id() == id) {
            slot.take();
        }
        outcome
    }
}
