//! Authenticated-user context shared by pages.

use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::ClientError;

/// Resolves who is signed in.
#[async_trait]
pub trait IdentitySource<U>: Send + Sync {
    /// `Ok(None)` for a guest.
    async fn current_user(&self) -> Result<Option<U>, ClientError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState<U> {
    Uninitialized,
    Loading,
    Resolved(Option<U>),
}

/// Holds the resolved user; pages gate on `is_loading` before deciding.
#[derive(Debug)]
pub struct SessionContext<U> {
    state: RwLock<SessionState<U>>,
}

impl<U> Default for SessionContext<U> {
    fn default() -> Self {
        Self {
            state: RwLock::new(SessionState::Uninitialized),
        }
    }
}

impl<U: Clone> SessionContext<U> {
    pub fn new() -> Self {
        Self::default()
    }

    fn set(&self, state: SessionState<U>) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn state(&self) -> SessionState<U> {
        self.state.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn user(&self) -> Option<U> {
        match self.state() {
            SessionState::Resolved(user) => user,
            _ => None,
        }
    }

    /// True until the session has been resolved one way or the other.
    pub fn is_loading(&self) -> bool {
        !matches!(self.state(), SessionState::Resolved(_))
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state(), SessionState::Resolved(Some(_)))
    }

    pub fn is_guest(&self) -> bool {
        matches!(self.state(), SessionState::Resolved(None))
    }

    /// Resolve the session from `source`.
    ///
    /// 401/419 resolve to a guest. Any other failure also resolves to a guest
    /// but is returned so the caller can report it.
    pub async fn initialize(&self, source: &dyn IdentitySource<U>) -> Result<(), ClientError> {
        self.set(SessionState::Loading);
        match source.current_user().await {
            Ok(user) => {
                self.set(SessionState::Resolved(user));
                Ok(())
            }
            Err(err) if err.is_unauthenticated() => {
                self.set(SessionState::Resolved(None));
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to resolve session; continuing as guest");
                self.set(SessionState::Resolved(None));
                Err(err)
            }
        }
    }

    /// Record a user after sign-in.
    pub fn sign_in(&self, user: U) {
        self.set(SessionState::Resolved(Some(user)));
    }

    pub fn sign_out(&self) {
        self.set(SessionState::Resolved(None));
    }
}
