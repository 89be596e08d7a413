//! Seams between the controllers and whatever backend serves the data.

use std::sync::Arc;

use async_trait::async_trait;
use crudstack_core::{Page, QueryParams, Resource};

use crate::error::ClientError;

/// Serves one page of rows for a set of encoded query parameters.
#[async_trait]
pub trait PageSource<T>: Send + Sync {
    async fn fetch_page(&self, params: QueryParams) -> Result<Page<T>, ClientError>;
}

/// Per-record operations of a resource endpoint.
#[async_trait]
pub trait ResourceApi: Send + Sync + 'static {
    type Resource: Resource;
    /// Editable field set submitted by forms.
    type Payload: Clone + Send + Sync + 'static;

    async fn fetch_one(&self, id: <Self::Resource as Resource>::Id) -> Result<Self::Resource, ClientError>;

    async fn create(&self, payload: Self::Payload) -> Result<Self::Resource, ClientError>;

    async fn update(
        &self,
        id: <Self::Resource as Resource>::Id,
        payload: Self::Payload,
    ) -> Result<Self::Resource, ClientError>;

    async fn delete(&self, id: <Self::Resource as Resource>::Id) -> Result<(), ClientError>;
}

#[async_trait]
impl<T, S> PageSource<T> for Arc<S>
where
    T: Send + 'static,
    S: PageSource<T> + ?Sized,
{
    async fn fetch_page(&self, params: QueryParams) -> Result<Page<T>, ClientError> {
        (**self).fetch_page(params).await
    }
}
