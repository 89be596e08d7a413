//! User service: request validation, password hashing, store access.

use std::sync::Arc;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;

use crudstack_core::query::{ListDefaults, ListQuery, PageMeta, Paginated};
use crudstack_core::{DomainError, DomainResult, User, UserId, ValidationErrors};

use crate::app::dto::{CreateUserRequest, UpdateUserRequest};
use crate::store::{NewUser, SORTABLE_COLUMNS, UserChanges, UserStore};

const MAX_STRING_LEN: usize = 255;
const MIN_PASSWORD_LEN: usize = 8;
const EMAIL_TAKEN: &str = "The email has already been taken.";

pub struct AppServices {
    users: Arc<dyn UserStore>,
    list_defaults: ListDefaults,
}

impl AppServices {
    pub fn new(users: Arc<dyn UserStore>, list_defaults: ListDefaults) -> Self {
        Self { users, list_defaults }
    }

    pub fn list_users<'a>(
        &self,
        params: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> DomainResult<Paginated<User>> {
        let query = ListQuery::from_pairs(params, &self.list_defaults)?;
        if !SORTABLE_COLUMNS.contains(&query.sort.column.as_str()) {
            return Err(DomainError::invalid_query(format!(
                "cannot sort by {:?}",
                query.sort.column
            )));
        }

        let (data, total) = self.users.list(&query);
        Ok(Paginated {
            data,
            meta: PageMeta::new(query.page, query.per_page, total),
        })
    }

    pub fn get_user(&self, id: &str) -> DomainResult<User> {
        let id: UserId = id.parse()?;
        self.users.get(id).map(|r| r.user).ok_or(DomainError::NotFound)
    }

    pub fn create_user(&self, req: CreateUserRequest) -> DomainResult<User> {
        let mut errors = ValidationErrors::new();

        let name = required(&mut errors, "name", req.name);
        if let Some(name) = &name {
            check_max_len(&mut errors, "name", name);
        }

        let email = required(&mut errors, "email", req.email);
        if let Some(email) = &email {
            self.check_email(&mut errors, email, None);
        }

        let password = required(&mut errors, "password", req.password);
        if let Some(password) = &password {
            check_password(&mut errors, password);
        }

        errors.into_result()?;
        let (Some(name), Some(email), Some(password)) = (name, email, password) else {
            return Err(DomainError::Validation(ValidationErrors::new()));
        };

        let user = self
            .users
            .insert(NewUser {
                name,
                email,
                password_hash: hash_password(&password)?,
                created_at: Utc::now(),
            })
            .map_err(email_conflict_as_validation)?;
        tracing::info!(user_id = %user.id, "user created");
        Ok(user)
    }

    pub fn update_user(&self, id: &str, req: UpdateUserRequest) -> DomainResult<User> {
        let id: UserId = id.parse()?;
        if self.users.get(id).is_none() {
            return Err(DomainError::NotFound);
        }

        let mut errors = ValidationErrors::new();
        let mut changes = UserChanges::default();

        if let Some(name) = req.name {
            if let Some(name) = required(&mut errors, "name", name) {
                check_max_len(&mut errors, "name", &name);
                changes.name = Some(name);
            }
        }

        if let Some(email) = req.email {
            if let Some(email) = required(&mut errors, "email", email) {
                self.check_email(&mut errors, &email, Some(id));
                changes.email = Some(email);
            }
        }

        if let Some(password) = req.password.filter(|p| !p.is_empty()) {
            check_password(&mut errors, &password);
            if errors.is_empty() {
                changes.password_hash = Some(hash_password(&password)?);
            }
        }

        errors.into_result()?;
        let user = self
            .users
            .update(id, changes, Utc::now())
            .map_err(email_conflict_as_validation)?;
        tracing::info!(user_id = %user.id, "user updated");
        Ok(user)
    }

    pub fn delete_user(&self, id: &str) -> DomainResult<()> {
        let id: UserId = id.parse()?;
        self.users.delete(id)?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    fn check_email(&self, errors: &mut ValidationErrors, email: &str, ignore: Option<UserId>) {
        check_max_len(errors, "email", email);
        if !is_valid_email(email) {
            errors.add("email", "The email field must be a valid email address.");
        }
        let taken = self
            .users
            .find_by_email(email)
            .is_some_and(|owner| Some(owner.id) != ignore);
        if taken {
            errors.add("email", EMAIL_TAKEN);
        }
    }
}

/// Trimmed value, or a "required" message when missing or blank.
fn required(errors: &mut ValidationErrors, field: &str, value: Option<String>) -> Option<String> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(v) => Some(v),
        None => {
            errors.add(field, format!("The {field} field is required."));
            None
        }
    }
}

fn check_max_len(errors: &mut ValidationErrors, field: &str, value: &str) {
    if value.chars().count() > MAX_STRING_LEN {
        errors.add(
            field,
            format!("The {field} field must not be greater than {MAX_STRING_LEN} characters."),
        );
    }
}

fn check_password(errors: &mut ValidationErrors, password: &str) {
    if password.chars().count() < MIN_PASSWORD_LEN {
        errors.add(
            "password",
            format!("The password field must be at least {MIN_PASSWORD_LEN} characters."),
        );
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && domain.contains('.')
        && !email.chars().any(char::is_whitespace)
}

/// The store enforces email uniqueness under its own lock; a duplicate that
/// slipped past `check_email` is reported the same way.
fn email_conflict_as_validation(err: DomainError) -> DomainError {
    match err {
        DomainError::Conflict(_) => ValidationErrors::new().with("email", EMAIL_TAKEN).into(),
        other => other,
    }
}

/// Argon2id hash in PHC string form (`$argon2id$v=19$...`), random salt.
pub fn hash_password(password: &str) -> DomainResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| DomainError::internal(format!("failed to hash password: {e}")))
}

/// Constant-time check of `password` against a stored PHC hash. Malformed
/// hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserStore;

    fn services() -> AppServices {
        AppServices::new(Arc::new(InMemoryUserStore::new()), ListDefaults::default())
    }

    fn create_req(name: &str, email: &str, password: &str) -> CreateUserRequest {
        CreateUserRequest {
            name: Some(name.to_string()),
            email: Some(email.to_string()),
            password: Some(password.to_string()),
        }
    }

    fn validation(err: DomainError) -> ValidationErrors {
        match err {
            DomainError::Validation(v) => v,
            other => panic!("Expected Validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_requires_every_field() {
        let err = services().create_user(CreateUserRequest::default()).unwrap_err();
        let errors = validation(err);
        assert_eq!(errors.first("name"), Some("The name field is required."));
        assert_eq!(errors.first("email"), Some("The email field is required."));
        assert_eq!(errors.first("password"), Some("The password field is required."));
    }

    #[test]
    fn create_rejects_short_password_and_bad_email() {
        let err = services().create_user(create_req("Ada", "not-an-email", "short")).unwrap_err();
        let errors = validation(err);
        assert_eq!(errors.first("email"), Some("The email field must be a valid email address."));
        assert_eq!(errors.first("password"), Some("The password field must be at least 8 characters."));
        assert!(!errors.has("name"));
    }

    #[test]
    fn create_rejects_taken_email() {
        let svc = services();
        svc.create_user(create_req("Ada", "ada@example.com", "password1")).unwrap();
        let err = svc.create_user(create_req("Ada 2", "ada@example.com", "password1")).unwrap_err();
        assert_eq!(validation(err).first("email"), Some("The email has already been taken."));
    }

    #[test]
    fn create_trims_and_hashes() {
        let store = Arc::new(InMemoryUserStore::new());
        let svc = AppServices::new(store.clone(), ListDefaults::default());
        let user = svc.create_user(create_req("  Ada  ", "ada@example.com", "password1")).unwrap();
        assert_eq!(user.name, "Ada");

        let record = store.get(user.id).unwrap();
        assert_ne!(record.password_hash, "password1");
        assert!(verify_password("password1", &record.password_hash));
        assert!(!verify_password("password2", &record.password_hash));
    }

    #[test]
    fn password_hash_is_argon2id_phc_with_fresh_salt() {
        let first = hash_password("password1").unwrap();
        let second = hash_password("password1").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert!(!first.contains("password1"));
        assert_ne!(first, second);
        assert!(verify_password("password1", &second));
        assert!(!verify_password("password1", "sha256$salt$digest"));
    }

    /// Store whose email lookup never finds anyone, so the pre-insert check
    /// passes and uniqueness is only caught by `insert`/`update`.
    struct BlindLookupStore(InMemoryUserStore);

    impl UserStore for BlindLookupStore {
        fn list(&self, query: &ListQuery) -> (Vec<User>, u64) {
            self.0.list(query)
        }

        fn get(&self, id: UserId) -> Option<crate::store::UserRecord> {
            self.0.get(id)
        }

        fn find_by_email(&self, _email: &str) -> Option<User> {
            None
        }

        fn insert(&self, new_user: NewUser) -> DomainResult<User> {
            self.0.insert(new_user)
        }

        fn update(&self, id: UserId, changes: UserChanges, now: chrono::DateTime<Utc>) -> DomainResult<User> {
            self.0.update(id, changes, now)
        }

        fn delete(&self, id: UserId) -> DomainResult<User> {
            self.0.delete(id)
        }
    }

    #[test]
    fn store_level_duplicate_email_is_a_field_error() {
        let svc = AppServices::new(
            Arc::new(BlindLookupStore(InMemoryUserStore::new())),
            ListDefaults::default(),
        );
        svc.create_user(create_req("Ada", "ada@example.com", "password1")).unwrap();
        let grace = svc.create_user(create_req("Grace", "grace@navy.mil", "password1")).unwrap();

        let err = svc.create_user(create_req("Ada 2", "ada@example.com", "password1")).unwrap_err();
        assert_eq!(validation(err).first("email"), Some("The email has already been taken."));

        let err = svc
            .update_user(
                &grace.id.to_string(),
                UpdateUserRequest {
                    email: Some(Some("ada@example.com".to_string())),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(validation(err).first("email"), Some("The email has already been taken."));
    }

    #[test]
    fn update_allows_keeping_own_email_and_skips_empty_password() {
        let store = Arc::new(InMemoryUserStore::new());
        let svc = AppServices::new(store.clone(), ListDefaults::default());
        let user = svc.create_user(create_req("Ada", "ada@example.com", "password1")).unwrap();
        let before = store.get(user.id).unwrap().password_hash;

        let updated = svc
            .update_user(
                &user.id.to_string(),
                UpdateUserRequest {
                    name: Some(Some("Ada L.".to_string())),
                    email: Some(Some("ada@example.com".to_string())),
                    password: Some(String::new()),
                },
            )
            .unwrap();

        assert_eq!(updated.name, "Ada L.");
        assert_eq!(store.get(user.id).unwrap().password_hash, before);
    }

    #[test]
    fn update_with_null_name_is_required_error() {
        let svc = services();
        let user = svc.create_user(create_req("Ada", "ada@example.com", "password1")).unwrap();
        let err = svc
            .update_user(
                &user.id.to_string(),
                UpdateUserRequest {
                    name: Some(None),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert_eq!(validation(err).first("name"), Some("The name field is required."));
    }

    #[test]
    fn update_missing_user_is_not_found() {
        let err = services().update_user("99", UpdateUserRequest::default()).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn list_rejects_unknown_sort_column() {
        let err = services().list_users(vec![("sort", "password:asc")]).unwrap_err();
        assert!(matches!(err, DomainError::InvalidQuery(_)));
    }

    #[test]
    fn list_reports_page_meta() {
        let svc = services();
        for i in 0..5 {
            svc.create_user(create_req(&format!("User {i}"), &format!("u{i}@example.com"), "password1"))
                .unwrap();
        }
        let page = svc.list_users(vec![("page", "2"), ("per_page", "2"), ("sort", "id:asc")]).unwrap();
        assert_eq!(page.meta, PageMeta::new(2, 2, 5));
        assert_eq!(page.meta.last_page, 3);
        assert_eq!(page.data[0].name, "User 2");
    }

    #[test]
    fn email_shape_check() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@@b.co"));
    }
}
