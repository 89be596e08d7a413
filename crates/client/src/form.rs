//! Create/edit form controller.
//!
//! Holds the editable field values, submits them through a [`ResourceApi`],
//! maps 422 responses onto per-field messages and keeps a short-lived
//! "recently successful" flag for save confirmations.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crudstack_core::Resource;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::debounce::Debouncer;
use crate::error::ClientError;
use crate::notify::Notifier;
use crate::source::ResourceApi;

pub const DEFAULT_RECENTLY_SUCCESSFUL: Duration = Duration::from_millis(2000);

/// First message per field.
pub type FieldErrors = BTreeMap<String, String>;

type ResourceId<A> = <<A as ResourceApi>::Resource as Resource>::Id;
type SuccessCallback<R> = Arc<dyn Fn(&R) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode<Id> {
    Create,
    Edit(Id),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome<R> {
    Saved(R),
    /// The server rejected the values; the map is also stored on the form.
    Invalid(FieldErrors),
}

pub struct ResourceForm<A: ResourceApi> {
    shared: Arc<FormShared<A>>,
}

struct FormShared<A: ResourceApi> {
    api: Arc<A>,
    mode: FormMode<ResourceId<A>>,
    notifier: Arc<dyn Notifier>,
    loading: watch::Sender<bool>,
    inner: Mutex<FormInner<A>>,
}

struct FormInner<A: ResourceApi> {
    values: A::Payload,
    /// Values the form was loaded or last reset with; `is_dirty` compares against it.
    baseline: A::Payload,
    errors: FieldErrors,
    is_submitting: bool,
    recently_successful: bool,
    success_flash: Debouncer,
    on_success: Option<SuccessCallback<A::Resource>>,
    load: Option<JoinHandle<()>>,
}

impl<A: ResourceApi> FormShared<A> {
    fn lock(&self) -> MutexGuard<'_, FormInner<A>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> ResourceForm<A>
where
    A: ResourceApi,
    A::Payload: Default + PartialEq + From<A::Resource>,
{
    /// Empty form that creates a new record on submit.
    pub fn create(api: Arc<A>, notifier: Arc<dyn Notifier>) -> Self {
        Self::build(api, notifier, FormMode::Create)
    }

    /// Form for an existing record. Starts empty and loads the record in the
    /// background; a failed load leaves the fields empty and raises a warning.
    pub fn edit(id: ResourceId<A>, api: Arc<A>, notifier: Arc<dyn Notifier>) -> Self {
        let form = Self::build(api, notifier, FormMode::Edit(id.clone()));
        form.spawn_load(id);
        form
    }

    fn build(api: Arc<A>, notifier: Arc<dyn Notifier>, mode: FormMode<ResourceId<A>>) -> Self {
        let (loading, _) = watch::channel(false);
        Self {
            shared: Arc::new(FormShared {
                api,
                mode,
                notifier,
                loading,
                inner: Mutex::new(FormInner {
                    values: A::Payload::default(),
                    baseline: A::Payload::default(),
                    errors: FieldErrors::new(),
                    is_submitting: false,
                    recently_successful: false,
                    success_flash: Debouncer::new(DEFAULT_RECENTLY_SUCCESSFUL),
                    on_success: None,
                    load: None,
                }),
            }),
        }
    }

    /// Callback run after a successful create.
    pub fn on_success(self, callback: impl Fn(&A::Resource) + Send + Sync + 'static) -> Self {
        self.shared.lock().on_success = Some(Arc::new(callback));
        self
    }

    /// How long `recently_successful` stays up after a save.
    pub fn recently_successful_for(self, window: Duration) -> Self {
        self.shared.lock().success_flash = Debouncer::new(window);
        self
    }

    fn spawn_load(&self, id: ResourceId<A>) {
        self.shared.loading.send_replace(true);
        let api = self.shared.api.clone();
        let form = Arc::downgrade(&self.shared);

        let handle = tokio::spawn(async move {
            let result = api.fetch_one(id.clone()).await;
            let Some(form) = form.upgrade() else {
                return;
            };
            match result {
                Ok(resource) => {
                    let payload = A::Payload::from(resource);
                    let mut inner = form.lock();
                    inner.values = payload.clone();
                    inner.baseline = payload;
                }
                Err(err) => {
                    tracing::warn!(%id, error = %err, "failed to load record for editing");
                    form.notifier.warning(&format!("Could not load record {id}: {err}"));
                }
            }
            form.loading.send_replace(false);
        });
        self.shared.lock().load = Some(handle);
    }

    pub fn mode(&self) -> &FormMode<ResourceId<A>> {
        &self.shared.mode
    }

    pub fn is_loading(&self) -> bool {
        *self.shared.loading.borrow()
    }

    /// Resolves once the initial edit load has finished (immediately in create mode).
    pub async fn loaded(&self) {
        let mut loading = self.shared.loading.subscribe();
        // Only errors when the sender is gone, which cannot happen while `self` lives.
        let _ = loading.wait_for(|busy| !busy).await;
    }

    pub fn values(&self) -> A::Payload {
        self.shared.lock().values.clone()
    }

    pub fn set_values(&self, values: A::Payload) {
        self.shared.lock().values = values;
    }

    pub fn update_values(&self, edit: impl FnOnce(&mut A::Payload)) {
        edit(&mut self.shared.lock().values);
    }

    pub fn is_dirty(&self) -> bool {
        let inner = self.shared.lock();
        inner.values != inner.baseline
    }

    pub fn errors(&self) -> FieldErrors {
        self.shared.lock().errors.clone()
    }

    pub fn error(&self, field: &str) -> Option<String> {
        self.shared.lock().errors.get(field).cloned()
    }

    pub fn set_error(&self, field: impl Into<String>, message: impl Into<String>) {
        self.shared.lock().errors.insert(field.into(), message.into());
    }

    pub fn clear_errors(&self) {
        self.shared.lock().errors.clear();
    }

    pub fn is_submitting(&self) -> bool {
        self.shared.lock().is_submitting
    }

    pub fn recently_successful(&self) -> bool {
        self.shared.lock().recently_successful
    }

    /// Create or update with the current values.
    ///
    /// Errors from the previous attempt are cleared first. A 422 fills the
    /// field errors (first message per field) and yields
    /// [`SubmitOutcome::Invalid`]; any other failure is returned as is.
    pub async fn submit(&self) -> Result<SubmitOutcome<A::Resource>, ClientError> {
        let values = {
            let mut inner = self.shared.lock();
            inner.errors.clear();
            inner.values.clone()
        };

        let submitting = Submitting::start(&self.shared);
        let result = match &self.shared.mode {
            FormMode::Create => self.shared.api.create(values).await,
            FormMode::Edit(id) => self.shared.api.update(id.clone(), values).await,
        };
        drop(submitting);

        let mut inner = self.shared.lock();
        match result {
            Ok(resource) => {
                self.flash_success(&mut inner);
                let callback = match self.shared.mode {
                    FormMode::Create => inner.on_success.clone(),
                    FormMode::Edit(_) => None,
                };
                drop(inner);
                tracing::debug!(id = %resource.id(), "form saved");
                if let Some(callback) = callback {
                    callback(&resource);
                }
                Ok(SubmitOutcome::Saved(resource))
            }
            Err(ClientError::Validation(validation)) => {
                for (field, message) in validation.first_messages() {
                    inner.errors.insert(field.to_string(), message.to_string());
                }
                tracing::debug!(fields = inner.errors.len(), "form rejected by server validation");
                Ok(SubmitOutcome::Invalid(inner.errors.clone()))
            }
            Err(err) => Err(err),
        }
    }

    /// Raise `recently_successful`; a later save restarts the window. When it
    /// lapses the current values become the new baseline.
    fn flash_success(&self, inner: &mut FormInner<A>) {
        inner.recently_successful = true;
        let form = Arc::downgrade(&self.shared);
        inner.success_flash.schedule(async move {
            if let Some(form) = form.upgrade() {
                let mut inner = form.lock();
                inner.recently_successful = false;
                inner.baseline = inner.values.clone();
            }
        });
    }
}

/// Holds `is_submitting` up for as long as it lives, so a cancelled submit
/// future still lowers the flag.
struct Submitting<'a, A: ResourceApi> {
    shared: &'a FormShared<A>,
}

impl<'a, A: ResourceApi> Submitting<'a, A> {
    fn start(shared: &'a FormShared<A>) -> Self {
        shared.lock().is_submitting = true;
        Self { shared }
    }
}

impl<A: ResourceApi> Drop for Submitting<'_, A> {
    fn drop(&mut self) {
        self.shared.lock().is_submitting = false;
    }
}

impl<A: ResourceApi> Drop for ResourceForm<A> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.success_flash.cancel();
        if let Some(load) = inner.load.take() {
            load.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::Utc;
    use crudstack_core::{User, UserId, UserPayload, ValidationErrors};

    use super::*;
    use crate::notify::{NotificationLevel, NotificationLog};

    #[derive(Default)]
    struct StubUsers {
        stored: Mutex<Option<User>>,
        updates: Mutex<Vec<(UserId, UserPayload)>>,
        creates: AtomicUsize,
        reject_with: Mutex<Option<ClientError>>,
        latency: Mutex<Duration>,
    }

    fn user(id: u64, name: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(id),
            name: name.to_string(),
            email: email.to_string(),
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    impl StubUsers {
        fn rejecting(err: ClientError) -> Arc<Self> {
            let stub = Self::default();
            *stub.reject_with.lock().unwrap() = Some(err);
            Arc::new(stub)
        }

        fn holding(user: User) -> Arc<Self> {
            let stub = Self::default();
            *stub.stored.lock().unwrap() = Some(user);
            Arc::new(stub)
        }

        fn rejection(&self) -> Option<ClientError> {
            self.reject_with.lock().unwrap().clone()
        }

        fn slow(self: Arc<Self>, latency: Duration) -> Arc<Self> {
            *self.latency.lock().unwrap() = latency;
            self
        }

        async fn respond_later(&self) {
            let latency = *self.latency.lock().unwrap();
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
        }
    }

    #[async_trait]
    impl ResourceApi for StubUsers {
        type Resource = User;
        type Payload = UserPayload;

        async fn fetch_one(&self, id: UserId) -> Result<User, ClientError> {
            self.respond_later().await;
            self.stored
                .lock()
                .unwrap()
                .clone()
                .filter(|u| u.id == id)
                .ok_or(ClientError::NotFound)
        }

        async fn create(&self, payload: UserPayload) -> Result<User, ClientError> {
            self.respond_later().await;
            if let Some(err) = self.rejection() {
                return Err(err);
            }
            let id = self.creates.fetch_add(1, Ordering::SeqCst) as u64 + 1;
            Ok(user(id, &payload.name, &payload.email))
        }

        async fn update(&self, id: UserId, payload: UserPayload) -> Result<User, ClientError> {
            if let Some(err) = self.rejection() {
                return Err(err);
            }
            self.updates.lock().unwrap().push((id, payload.clone()));
            Ok(user(id.get(), &payload.name, &payload.email))
        }

        async fn delete(&self, _id: UserId) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn payload(name: &str, email: &str) -> UserPayload {
        UserPayload {
            name: name.to_string(),
            email: email.to_string(),
            password: None,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn edit_loads_record_then_submits_a_single_update() {
        let api = StubUsers::holding(user(5, "Ada", "ada@example.com"));
        let notes = Arc::new(NotificationLog::new());
        let form = ResourceForm::edit(UserId::new(5), api.clone(), notes.clone());

        form.loaded().await;
        assert_eq!(form.values(), payload("Ada", "ada@example.com"));
        assert!(!form.is_dirty());

        form.update_values(|v| v.name = "Ada Lovelace".to_string());
        assert!(form.is_dirty());

        let outcome = form.submit().await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Saved(ref u) if u.name == "Ada Lovelace"));
        assert_eq!(
            *api.updates.lock().unwrap(),
            vec![(UserId::new(5), payload("Ada Lovelace", "ada@example.com"))]
        );
        assert_eq!(api.creates.load(Ordering::SeqCst), 0);
        assert!(notes.entries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_edit_load_warns_and_keeps_defaults() {
        let api = Arc::new(StubUsers::default());
        let notes = Arc::new(NotificationLog::new());
        let form = ResourceForm::edit(UserId::new(9), api, notes.clone());
        assert!(form.is_loading());

        form.loaded().await;
        assert!(!form.is_loading());
        assert_eq!(form.values(), UserPayload::default());
        let entries = notes.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, NotificationLevel::Warning);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failure_maps_first_message_per_field() {
        let errors = ValidationErrors::new()
            .with("email", "The email has already been taken.")
            .with("email", "The email field must be a valid email address.")
            .with("name", "The name field is required.");
        let api = StubUsers::rejecting(ClientError::Validation(errors));
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()));
        form.set_values(payload("", "ada@example.com"));

        let outcome = form.submit().await.unwrap();

        let SubmitOutcome::Invalid(fields) = outcome else {
            panic!("Expected Invalid outcome");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(form.error("email").as_deref(), Some("The email has already been taken."));
        assert_eq!(form.error("name").as_deref(), Some("The name field is required."));
        assert!(!form.recently_successful());
        assert!(!form.is_submitting());
    }

    #[tokio::test(start_paused = true)]
    async fn resubmitting_clears_stale_errors() {
        let api = Arc::new(StubUsers::default());
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()));
        form.set_error("email", "stale");

        form.submit().await.unwrap();
        assert!(form.errors().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn other_failures_propagate() {
        let api = StubUsers::rejecting(ClientError::Status {
            status: 500,
            body: "oops".to_string(),
        });
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()));

        let err = form.submit().await.unwrap_err();
        match err {
            ClientError::Status { status: 500, .. } => {}
            _ => panic!("Expected Status error"),
        }
        assert!(form.errors().is_empty());
        assert!(!form.recently_successful());
    }

    #[tokio::test(start_paused = true)]
    async fn create_runs_success_callback() {
        let api = Arc::new(StubUsers::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()))
            .on_success(move |user: &User| sink.lock().unwrap().push(user.id));
        form.set_values(payload("Ada", "ada@example.com"));

        form.submit().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![UserId::new(1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn recently_successful_window_restarts_on_each_save() {
        let api = Arc::new(StubUsers::default());
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()));
        form.set_values(payload("Ada", "ada@example.com"));

        form.submit().await.unwrap();
        assert!(form.recently_successful());
        assert!(form.is_dirty());

        tokio::time::sleep(Duration::from_millis(1500)).await;
        form.submit().await.unwrap();

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(form.recently_successful(), "second save restarted the window");

        tokio::time::sleep(Duration::from_millis(1001)).await;
        assert!(!form.recently_successful());
        assert!(!form.is_dirty(), "values become the new baseline");
        assert_eq!(form.values(), payload("Ada", "ada@example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_success_window() {
        let api = Arc::new(StubUsers::default());
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()))
            .recently_successful_for(Duration::from_millis(100));

        form.submit().await.unwrap();
        tokio::time::sleep(Duration::from_millis(101)).await;
        assert!(!form.recently_successful());
    }

    #[tokio::test(start_paused = true)]
    async fn loaded_record_replaces_draft_typed_during_load() {
        let api = StubUsers::holding(user(5, "Ada", "ada@example.com")).slow(Duration::from_millis(200));
        let form = ResourceForm::edit(UserId::new(5), api, Arc::new(NotificationLog::new()));

        form.set_values(UserPayload {
            name: "Draft".to_string(),
            email: "draft@example.com".to_string(),
            password: Some("secret123".to_string()),
        });
        assert!(form.is_loading());
        assert!(form.is_dirty());

        form.loaded().await;
        assert_eq!(form.values(), payload("Ada", "ada@example.com"));
        assert!(!form.is_dirty(), "baseline is the loaded record");
    }

    #[tokio::test(start_paused = true)]
    async fn submitting_flag_tracks_the_request() {
        let api = Arc::new(StubUsers::default()).slow(Duration::from_millis(100));
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()));

        let (outcome, during) = tokio::join!(form.submit(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            form.is_submitting()
        });

        assert!(during);
        assert!(matches!(outcome, Ok(SubmitOutcome::Saved(_))));
        assert!(!form.is_submitting());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_submit_clears_submitting_flag() {
        let api = Arc::new(StubUsers::default()).slow(Duration::from_secs(60));
        let form = ResourceForm::create(api, Arc::new(NotificationLog::new()));

        let timed_out = tokio::time::timeout(Duration::from_secs(1), form.submit()).await;

        assert!(timed_out.is_err());
        assert!(!form.is_submitting());
        assert!(!form.recently_successful());
    }
}
