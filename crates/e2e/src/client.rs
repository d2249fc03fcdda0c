//! REST client for the build server under test

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::marker::PhantomData;
use tracing::debug;

use ciprobe_common::{Category, Entity, EntityTransport, User};

use crate::config::HarnessConfig;
use crate::error::{E2eError, E2eResult};

/// How requests authenticate
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Basic { username: String, password: String },
    /// Super user token, sent as basic auth with an empty username
    SuperUser { token: String },
}

impl Credentials {
    /// Elevated credentials from configuration: the super user token if
    /// set, else the administrator account
    pub fn superuser(config: &HarnessConfig) -> E2eResult<Self> {
        if let Some(token) = &config.superuser_token {
            return Ok(Credentials::SuperUser {
                token: token.clone(),
            });
        }
        match (&config.admin.username, &config.admin.password) {
            (Some(username), Some(password)) => Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(E2eError::Config(
                "no super user token or admin credentials configured".to_string(),
            )),
        }
    }

    pub fn for_user(user: &User) -> E2eResult<Self> {
        match (&user.username, &user.password) {
            (Some(username), Some(password)) => Ok(Credentials::Basic {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(E2eError::Config("user has no username or password".to_string())),
        }
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Credentials::Basic { username, password } => request.basic_auth(username, Some(password)),
            Credentials::SuperUser { token } => request.basic_auth("", Some(token)),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => write!(f, "Basic({})", username),
            Credentials::SuperUser { .. } => f.write_str("SuperUser"),
        }
    }
}

/// Authenticated client bound to one server
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
}

impl ApiClient {
    pub fn new(config: &HarnessConfig, credentials: Credentials) -> E2eResult<Self> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url().to_string(),
            credentials,
        })
    }

    /// Client acting with elevated credentials
    pub fn superuser(config: &HarnessConfig) -> E2eResult<Self> {
        Self::new(config, Credentials::superuser(config)?)
    }

    /// Client acting as `user`
    pub fn for_user(config: &HarnessConfig, user: &User) -> E2eResult<Self> {
        Self::new(config, Credentials::for_user(user)?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Raw requests for a category, no status assertions
    pub fn unchecked(&self, category: Category) -> UncheckedRequester<'_> {
        UncheckedRequester {
            client: self,
            category,
        }
    }

    /// Typed requests that expect success
    pub fn checked<T: Entity>(&self) -> CheckedRequester<'_, T> {
        CheckedRequester {
            unchecked: self.unchecked(T::CATEGORY),
            _entity: PhantomData,
        }
    }

    fn url(&self, category: Category, locator: Option<&str>) -> E2eResult<Url> {
        let raw = format!("{}{}", self.base_url, category.path());
        let mut url = Url::parse(&raw)
            .map_err(|e| E2eError::Config(format!("invalid URL {}: {}", raw, e)))?;

        if let Some(locator) = locator {
            url.path_segments_mut()
                .map_err(|_| E2eError::Config(format!("URL {} cannot take a path", raw)))?
                .push(locator);
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!("{} {} as {:?}", method, url, self.credentials);
        self.credentials
            .apply(self.http.request(method, url))
            .header(ACCEPT, "application/json")
    }
}

/// Requests for one category that return the raw response
pub struct UncheckedRequester<'a> {
    client: &'a ApiClient,
    category: Category,
}

impl<'a> UncheckedRequester<'a> {
    pub async fn create<B: Serialize>(&self, body: &B) -> E2eResult<Response> {
        let url = self.client.url(self.category, None)?;
        let body = payload(body)?;
        Ok(self.client.request(Method::POST, url).json(&body).send().await?)
    }

    pub async fn read(&self, locator: &str) -> E2eResult<Response> {
        let url = self.client.url(self.category, Some(locator))?;
        Ok(self.client.request(Method::GET, url).send().await?)
    }

    /// Collection query, `GET {path}?locator=<locator>`
    pub async fn search(&self, locator: &str) -> E2eResult<Response> {
        let mut url = self.client.url(self.category, None)?;
        url.query_pairs_mut().append_pair("locator", locator);
        Ok(self.client.request(Method::GET, url).send().await?)
    }

    pub async fn update<B: Serialize>(&self, locator: &str, body: &B) -> E2eResult<Response> {
        let url = self.client.url(self.category, Some(locator))?;
        let body = payload(body)?;
        Ok(self.client.request(Method::PUT, url).json(&body).send().await?)
    }

    pub async fn delete(&self, locator: &str) -> E2eResult<Response> {
        let url = self.client.url(self.category, Some(locator))?;
        Ok(self.client.request(Method::DELETE, url).send().await?)
    }
}

/// Typed requests for an entity, failing on any non-2xx status
pub struct CheckedRequester<'a, T: Entity> {
    unchecked: UncheckedRequester<'a>,
    _entity: PhantomData<T>,
}

impl<'a, T: Entity> CheckedRequester<'a, T> {
    pub async fn create(&self, entity: &T) -> E2eResult<T> {
        let response = expect_success("POST", self.unchecked.create(entity).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn read(&self, locator: &str) -> E2eResult<T> {
        let response = expect_success("GET", self.unchecked.read(locator).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn update(&self, locator: &str, entity: &T) -> E2eResult<T> {
        let response = expect_success("PUT", self.unchecked.update(locator, entity).await?).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, locator: &str) -> E2eResult<()> {
        expect_success("DELETE", self.unchecked.delete(locator).await?).await?;
        Ok(())
    }
}

async fn expect_success(method: &str, response: Response) -> E2eResult<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    Err(E2eError::UnexpectedStatus {
        method: method.to_string(),
        url,
        status,
        body,
    })
}

/// Request body with null members dropped; the server rejects explicit nulls
fn payload<B: Serialize>(body: &B) -> E2eResult<Value> {
    let mut value = serde_json::to_value(body)?;
    strip_nulls(&mut value);
    Ok(value)
}

fn strip_nulls(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(strip_nulls);
        }
        Value::Array(items) => items.iter_mut().for_each(strip_nulls),
        _ => {}
    }
}

/// Id of the first entity in a collection response
fn first_id(category: Category, collection: &Value) -> Option<String> {
    let first = collection.get(category.collection_key())?.get(0)?;
    match first.get("id")? {
        Value::String(id) if !id.is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn transport_error(e: impl fmt::Display) -> ciprobe_common::Error {
    ciprobe_common::Error::Transport(e.to_string())
}

#[async_trait]
impl EntityTransport for ApiClient {
    async fn delete(&self, category: Category, identity: &str) -> ciprobe_common::Result<()> {
        let locator = category.identity_locator(identity);
        let response = self
            .unchecked(category)
            .delete(&locator)
            .await
            .map_err(transport_error)?;

        // Already gone, e.g. a build configuration removed with its project
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        expect_success("DELETE", response)
            .await
            .map(|_| ())
            .map_err(transport_error)
    }

    async fn find_id_by_name(
        &self,
        category: Category,
        name: &str,
    ) -> ciprobe_common::Result<Option<String>> {
        let response = self
            .unchecked(category)
            .search(&category.name_locator(name))
            .await
            .map_err(transport_error)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_success("GET", response).await.map_err(transport_error)?;
        let value: Value = response.json().await.map_err(transport_error)?;

        Ok(first_id(category, &value))
    }
}
