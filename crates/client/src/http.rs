//! `reqwest` client for the `/users` endpoints.

use async_trait::async_trait;
use crudstack_core::query::Paginated;
use crudstack_core::{Page, QueryParams, User, UserId, UserPayload, ValidationErrors};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::session::IdentitySource;
use crate::source::{PageSource, ResourceApi};

#[derive(Debug, Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

#[derive(Debug, Clone)]
pub struct UsersClient {
    http: reqwest::Client,
    base_url: Url,
}

impl UsersClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert("x-requested-with", HeaderValue::from_static("XMLHttpRequest"));

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::Transport(format!("invalid url {path:?}: {e}")))
    }

    fn user_url(&self, id: UserId) -> Result<Url, ClientError> {
        self.url(&format!("users/{id}"))
    }
}

/// Map non-2xx responses onto [`ClientError`].
async fn check_status(res: Response) -> Result<Response, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }

    match status {
        StatusCode::UNPROCESSABLE_ENTITY => {
            let errors: ValidationErrors = res.json().await.map_err(|e| ClientError::Decode(e.to_string()))?;
            Err(ClientError::Validation(errors))
        }
        StatusCode::NOT_FOUND => Err(ClientError::NotFound),
        _ => Err(ClientError::Status {
            status: status.as_u16(),
            body: res.text().await.unwrap_or_default(),
        }),
    }
}

async fn read_json<T: DeserializeOwned>(res: Response) -> Result<T, ClientError> {
    check_status(res)
        .await?
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

#[async_trait]
impl PageSource<User> for UsersClient {
    async fn fetch_page(&self, params: QueryParams) -> Result<Page<User>, ClientError> {
        let res = self
            .http
            .get(self.url("users")?)
            .query(params.as_pairs())
            .send()
            .await?;
        let page: Paginated<User> = read_json(res).await?;
        tracing::debug!(total = page.meta.total, rows = page.data.len(), "fetched users page");
        Ok(page.into())
    }
}

#[async_trait]
impl ResourceApi for UsersClient {
    type Resource = User;
    type Payload = UserPayload;

    async fn fetch_one(&self, id: UserId) -> Result<User, ClientError> {
        let res = self.http.get(self.user_url(id)?).send().await?;
        Ok(read_json::<DataEnvelope<User>>(res).await?.data)
    }

    async fn create(&self, payload: UserPayload) -> Result<User, ClientError> {
        let res = self.http.post(self.url("users")?).json(&payload).send().await?;
        Ok(read_json::<DataEnvelope<User>>(res).await?.data)
    }

    async fn update(&self, id: UserId, payload: UserPayload) -> Result<User, ClientError> {
        let res = self.http.put(self.user_url(id)?).json(&payload).send().await?;
        Ok(read_json::<DataEnvelope<User>>(res).await?.data)
    }

    async fn delete(&self, id: UserId) -> Result<(), ClientError> {
        let res = self.http.delete(self.user_url(id)?).send().await?;
        check_status(res).await?;
        Ok(())
    }
}

/// Asks the auth backend's `user` endpoint who is signed in.
///
/// 401, 204 and 404 mean a guest, as do `null` and `[]` bodies. The user may
/// come bare or wrapped in `{"data": ...}`.
#[async_trait]
impl IdentitySource<User> for UsersClient {
    async fn current_user(&self) -> Result<Option<User>, ClientError> {
        let res = self.http.get(self.url("user")?).send().await?;
        match res.status() {
            StatusCode::UNAUTHORIZED | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            _ => identity_from_body(read_json(res).await?),
        }
    }
}

fn identity_from_body(body: Value) -> Result<Option<User>, ClientError> {
    let body = match body {
        Value::Object(mut map) if map.contains_key("data") => map.remove("data").unwrap_or(Value::Null),
        other => other,
    };
    match body {
        Value::Null => Ok(None),
        Value::Array(items) if items.is_empty() => Ok(None),
        other => serde_json::from_value(other)
            .map(Some)
            .map_err(|e| ClientError::Decode(e.to_string())),
    }
}
