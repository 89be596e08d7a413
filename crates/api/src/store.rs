//! User persistence behind a small store abstraction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};

use crudstack_core::query::{ListQuery, SortDirection};
use crudstack_core::{DomainError, DomainResult, User, UserId};

/// Columns a list request may sort by.
pub const SORTABLE_COLUMNS: &[&str] = &["id", "name", "email", "email_verified_at", "created_at", "updated_at"];

/// A stored user together with its credential digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Partial update; `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.password_hash.is_none()
    }
}

/// Storage abstraction for users.
pub trait UserStore: Send + Sync {
    /// Filter, sort and slice according to `query`; returns the page and the
    /// total number of matches before slicing.
    fn list(&self, query: &ListQuery) -> (Vec<User>, u64);
    fn get(&self, id: UserId) -> Option<UserRecord>;
    /// Case-insensitive lookup.
    fn find_by_email(&self, email: &str) -> Option<User>;
    /// Fails with `Conflict` if the email is taken.
    fn insert(&self, new_user: NewUser) -> DomainResult<User>;
    fn update(&self, id: UserId, changes: UserChanges, now: DateTime<Utc>) -> DomainResult<User>;
    fn delete(&self, id: UserId) -> DomainResult<User>;
}

impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    fn list(&self, query: &ListQuery) -> (Vec<User>, u64) {
        (**self).list(query)
    }

    fn get(&self, id: UserId) -> Option<UserRecord> {
        (**self).get(id)
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        (**self).find_by_email(email)
    }

    fn insert(&self, new_user: NewUser) -> DomainResult<User> {
        (**self).insert(new_user)
    }

    fn update(&self, id: UserId, changes: UserChanges, now: DateTime<Utc>) -> DomainResult<User> {
        (**self).update(id, changes, now)
    }

    fn delete(&self, id: UserId) -> DomainResult<User> {
        (**self).delete(id)
    }
}

#[derive(Debug, Default)]
struct UserTable {
    last_id: u64,
    rows: BTreeMap<UserId, UserRecord>,
}

impl UserTable {
    fn email_owner(&self, email: &str) -> Option<UserId> {
        self.rows
            .values()
            .find(|r| r.user.email.eq_ignore_ascii_case(email))
            .map(|r| r.user.id)
    }
}

/// In-memory user store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<UserTable>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, UserTable> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, UserTable> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn matches_search(user: &User, needle: &str) -> bool {
    user.name.to_lowercase().contains(needle) || user.email.to_lowercase().contains(needle)
}

fn compare_by_column(a: &User, b: &User, column: &str) -> Ordering {
    match column {
        "name" => a.name.cmp(&b.name),
        "email" => a.email.cmp(&b.email),
        "email_verified_at" => a.email_verified_at.cmp(&b.email_verified_at),
        "created_at" => a.created_at.cmp(&b.created_at),
        "updated_at" => a.updated_at.cmp(&b.updated_at),
        _ => a.id.cmp(&b.id),
    }
}

impl UserStore for InMemoryUserStore {
    fn list(&self, query: &ListQuery) -> (Vec<User>, u64) {
        let table = self.read();
        let needle = query.search.as_deref().map(str::to_lowercase);

        let mut matches: Vec<&User> = table
            .rows
            .values()
            .map(|r| &r.user)
            .filter(|u| needle.as_deref().is_none_or(|n| matches_search(u, n)))
            .collect();

        // Ties fall back to id so paging is stable.
        matches.sort_by(|a, b| {
            let ordering = compare_by_column(a, b, &query.sort.column).then_with(|| a.id.cmp(&b.id));
            match query.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let total = matches.len() as u64;
        let items = matches
            .into_iter()
            .skip(query.offset())
            .take(query.per_page as usize)
            .cloned()
            .collect();

        (items, total)
    }

    fn get(&self, id: UserId) -> Option<UserRecord> {
        self.read().rows.get(&id).cloned()
    }

    fn find_by_email(&self, email: &str) -> Option<User> {
        let table = self.read();
        let id = table.email_owner(email)?;
        table.rows.get(&id).map(|r| r.user.clone())
    }

    fn insert(&self, new_user: NewUser) -> DomainResult<User> {
        let mut table = self.write();
        if table.email_owner(&new_user.email).is_some() {
            return Err(DomainError::conflict(format!("email {} already exists", new_user.email)));
        }

        table.last_id += 1;
        let user = User {
            id: UserId::new(table.last_id),
            name: new_user.name,
            email: new_user.email,
            email_verified_at: None,
            created_at: new_user.created_at,
            updated_at: new_user.created_at,
        };
        table.rows.insert(
            user.id,
            UserRecord {
                user: user.clone(),
                password_hash: new_user.password_hash,
            },
        );
        Ok(user)
    }

    fn update(&self, id: UserId, changes: UserChanges, now: DateTime<Utc>) -> DomainResult<User> {
        let mut table = self.write();

        if let Some(email) = &changes.email {
            if table.email_owner(email).is_some_and(|owner| owner != id) {
                return Err(DomainError::conflict(format!("email {email} already exists")));
            }
        }

        let record = table.rows.get_mut(&id).ok_or(DomainError::NotFound)?;
        let dirty = !changes.is_empty();
        if let Some(name) = changes.name {
            record.user.name = name;
        }
        if let Some(email) = changes.email {
            record.user.email = email;
        }
        if let Some(hash) = changes.password_hash {
            record.password_hash = hash;
        }
        if dirty {
            record.user.updated_at = now;
        }
        Ok(record.user.clone())
    }

    fn delete(&self, id: UserId) -> DomainResult<User> {
        self.write()
            .rows
            .remove(&id)
            .map(|r| r.user)
            .ok_or(DomainError::NotFound)
    }
}
