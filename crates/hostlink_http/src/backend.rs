//! The hosted service's REST surface.

use crate::client::HttpClient;
use crate::wire::{
    HttpRequest, HttpResponse, Method, HEADER_API_KEY, HEADER_AUTHORIZATION, HEADER_CONTENT_TYPE,
    HEADER_PREFER, HEADER_UPSERT, JSON, OCTET_STREAM,
};
use async_trait::async_trait;
use bytes::Bytes;
use hostlink_core::storage::{check_object_path, join_url, split_object_path, OBJECT_PREFIX};
use hostlink_core::{
    BackendService, Credentials, FacadeConfig, Filter, Row, ServiceError, ServiceResult, Session,
    SignUp, StoredObject, UploadOptions, User,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};
use url::Url;

/// Asks the table API to return affected rows.
const RETURN_REPRESENTATION: &str = "return=representation";

/// A [`BackendService`] speaking the hosted REST API over an [`HttpClient`].
///
/// Holds no session state; the facade passes the bearer token per call and
/// the public key is sent as `apikey` on every request.
pub struct HttpBackend<C: HttpClient> {
    base_url: String,
    public_key: String,
    client: C,
}

impl<C: HttpClient> HttpBackend<C> {
    /// Creates a backend for the service at `base_url`.
    pub fn new(base_url: impl Into<String>, public_key: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            public_key: public_key.into(),
            client,
        }
    }

    /// Creates a backend from a facade configuration.
    pub fn from_config(config: &FacadeConfig, client: C) -> Self {
        Self::new(&config.base_url, &config.public_key, client)
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    fn url(&self, segments: &[&str], query: &[(&str, String)]) -> String {
        let joined = join_url(&self.base_url, segments);
        if query.is_empty() {
            return joined;
        }
        match Url::parse(&joined) {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
                url.into()
            }
            Err(_) => joined,
        }
    }

    fn request(&self, method: Method, url: String, bearer: Option<&str>) -> HttpRequest {
        let token = bearer.unwrap_or(&self.public_key);
        HttpRequest::new(method, url)
            .header(HEADER_API_KEY, self.public_key.clone())
            .header(HEADER_AUTHORIZATION, format!("Bearer {token}"))
    }

    fn json_request<T: Serialize>(
        &self,
        method: Method,
        url: String,
        bearer: Option<&str>,
        body: &T,
    ) -> ServiceResult<HttpRequest> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| ServiceError::transport(format!("failed to encode request: {e}")))?;
        Ok(self
            .request(method, url, bearer)
            .header(HEADER_CONTENT_TYPE, JSON)
            .body(bytes))
    }

    async fn send(&self, request: HttpRequest) -> ServiceResult<HttpResponse> {
        let method = request.method;
        let path = request_path(&request.url);
        debug!(%method, path = %path, "sending request");

        let response = self.client.send(request).await.map_err(|e| {
            warn!(%method, path = %path, error = %e, "request failed without response");
            ServiceError::transport(e)
        })?;

        if response.is_success() {
            Ok(response)
        } else {
            let err = response.to_service_error();
            debug!(%method, path = %path, status = response.status, error = %err.message, "service error");
            Err(err)
        }
    }

    async fn send_json<T: DeserializeOwned>(&self, request: HttpRequest) -> ServiceResult<T> {
        let response = self.send(request).await?;
        decode(&response)
    }

    fn table_url(&self, table: &str, query: &[(&str, String)]) -> String {
        self.url(&["rest", "v1", table], query)
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        let mut segments: Vec<&str> = OBJECT_PREFIX.to_vec();
        segments.push(bucket);
        segments.extend(split_object_path(path));
        self.url(&segments, &[])
    }
}

/// A success body that cannot be read is reported without a status: the
/// service answered, but not with anything usable.
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> ServiceResult<T> {
    serde_json::from_slice(&response.body).map_err(unreadable_body)
}

fn decode_value<T: DeserializeOwned>(value: Value) -> ServiceResult<T> {
    serde_json::from_value(value).map_err(unreadable_body)
}

fn unreadable_body(err: serde_json::Error) -> ServiceError {
    ServiceError::transport(format!("unexpected response body: {err}"))
}

fn request_path(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.path().to_string())
        .unwrap_or_else(|_| url.to_string())
}

fn filter_query<'a>(filters: &'a [Filter]) -> impl Iterator<Item = (&'a str, String)> + 'a {
    filters
        .iter()
        .map(|f| (f.column.as_str(), format!("eq.{}", f.value_text())))
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct RefreshGrant<'a> {
    refresh_token: &'a str,
}

#[derive(Deserialize)]
struct UploadAck {
    #[serde(rename = "Key")]
    key: String,
}

#[async_trait]
impl<C: HttpClient> BackendService for HttpBackend<C> {
    async fn sign_up(&self, credentials: &Credentials) -> ServiceResult<SignUp> {
        let body = json!({
            "email": credentials.email,
            "password": credentials.password,
            "data": credentials.metadata,
        });
        let url = self.url(&["auth", "v1", "signup"], &[]);
        let request = self.json_request(Method::Post, url, None, &body)?;
        let value: Value = self.send_json(request).await?;

        // With auto-confirm the service answers with a session, otherwise
        // with the bare user awaiting confirmation.
        if value.get("access_token").is_some() {
            let session: Session = decode_value(value)?;
            Ok(SignUp {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user: User = decode_value(value)?;
            Ok(SignUp { user, session: None })
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<Session> {
        let url = self.url(&["auth", "v1", "token"], &[("grant_type", "password".into())]);
        let request =
            self.json_request(Method::Post, url, None, &PasswordGrant { email, password })?;
        self.send_json(request).await
    }

    async fn refresh_session(&self, refresh_token: &str) -> ServiceResult<Session> {
        let url = self.url(
            &["auth", "v1", "token"],
            &[("grant_type", "refresh_token".into())],
        );
        let request =
            self.json_request(Method::Post, url, None, &RefreshGrant { refresh_token })?;
        self.send_json(request).await
    }

    async fn sign_out(&self, access_token: &str) -> ServiceResult<()> {
        let url = self.url(&["auth", "v1", "logout"], &[]);
        self.send(self.request(Method::Post, url, Some(access_token)))
            .await
            .map(|_| ())
    }

    async fn get_user(&self, access_token: &str) -> ServiceResult<User> {
        let url = self.url(&["auth", "v1", "user"], &[]);
        self.send_json(self.request(Method::Get, url, Some(access_token)))
            .await
    }

    async fn select(
        &self,
        bearer: Option<&str>,
        table: &str,
        columns: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        let mut query = vec![("select", columns.to_string())];
        query.extend(filter_query(filters));
        let url = self.table_url(table, &query);
        self.send_json(self.request(Method::Get, url, bearer)).await
    }

    async fn insert(
        &self,
        bearer: Option<&str>,
        table: &str,
        rows: Vec<Row>,
    ) -> ServiceResult<Vec<Row>> {
        let url = self.table_url(table, &[]);
        let request = self
            .json_request(Method::Post, url, bearer, &rows)?
            .header(HEADER_PREFER, RETURN_REPRESENTATION);
        self.send_json(request).await
    }

    async fn update(
        &self,
        bearer: Option<&str>,
        table: &str,
        patch: Row,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        let query: Vec<_> = filter_query(filters).collect();
        let url = self.table_url(table, &query);
        let request = self
            .json_request(Method::Patch, url, bearer, &patch)?
            .header(HEADER_PREFER, RETURN_REPRESENTATION);
        self.send_json(request).await
    }

    async fn delete(
        &self,
        bearer: Option<&str>,
        table: &str,
        filters: &[Filter],
    ) -> ServiceResult<Vec<Row>> {
        let query: Vec<_> = filter_query(filters).collect();
        let url = self.table_url(table, &query);
        let request = self
            .request(Method::Delete, url, bearer)
            .header(HEADER_PREFER, RETURN_REPRESENTATION);
        self.send_json(request).await
    }

    async fn upload(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
        blob: Bytes,
        options: &UploadOptions,
    ) -> ServiceResult<StoredObject> {
        check_object_path(path)?;
        let content_type = options.content_type.as_deref().unwrap_or(OCTET_STREAM);
        let request = self
            .request(Method::Post, self.object_url(bucket, path), bearer)
            .header(HEADER_CONTENT_TYPE, content_type)
            .header(HEADER_UPSERT, options.upsert.to_string())
            .body(blob);

        let ack: UploadAck = self.send_json(request).await?;
        Ok(StoredObject {
            bucket: bucket.to_string(),
            path: path.to_string(),
            key: ack.key,
        })
    }

    async fn download(
        &self,
        bearer: Option<&str>,
        bucket: &str,
        path: &str,
    ) -> ServiceResult<Bytes> {
        check_object_path(path)?;
        let request = self.request(Method::Get, self.object_url(bucket, path), bearer);
        Ok(self.send(request).await?.body)
    }
}
