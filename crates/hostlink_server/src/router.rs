//! The REST surface of [`HostedService`].

use crate::error::{HostError, HostResult};
use crate::service::HostedService;
use bytes::Bytes;
use hostlink_core::{Credentials, Filter, Row, ServiceError, UploadOptions};
use hostlink_http::wire::{HEADER_API_KEY, HEADER_CONTENT_TYPE, HEADER_UPSERT};
use hostlink_http::{HttpRequest, HttpResponse, LoopbackServer, Method};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Answers hosted-service HTTP requests from a [`HostedService`].
///
/// Plug it into a `hostlink_http::LoopbackClient` to exercise
/// `HttpBackend` end to end without a network.
#[derive(Clone)]
pub struct Router {
    service: Arc<HostedService>,
}

/// A parsed request target.
struct Target {
    segments: Vec<String>,
    query: Vec<(String, String)>,
}

impl Target {
    fn parse(url: &str) -> HostResult<Self> {
        let url = Url::parse(url).map_err(|e| HostError::InvalidRequest(format!("bad url: {e}")))?;
        let segments = url
            .path_segments()
            .map(|parts| {
                parts
                    .filter(|s| !s.is_empty())
                    .map(percent_decode)
                    .collect()
            })
            .unwrap_or_default();
        let query = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        Ok(Self { segments, query })
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn path(&self) -> String {
        format!("/{}", self.segments.join("/"))
    }
}

#[derive(Deserialize)]
struct SignUpBody {
    email: String,
    password: String,
    #[serde(default)]
    data: Option<Map<String, Value>>,
}

#[derive(Deserialize)]
struct PasswordGrant {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshGrant {
    refresh_token: String,
}

impl Router {
    /// Creates a router over `service`.
    pub fn new(service: Arc<HostedService>) -> Self {
        Self { service }
    }

    /// Returns the service.
    pub fn service(&self) -> &Arc<HostedService> {
        &self.service
    }

    fn route(&self, request: &HttpRequest) -> HostResult<HttpResponse> {
        let target = Target::parse(&request.url)?;
        let segments: Vec<&str> = target.segments.iter().map(String::as_str).collect();

        // Public objects are served to anyone holding the URL.
        if let ["storage", "v1", "object", "public", bucket, path @ ..] = segments.as_slice() {
            if request.method == Method::Get && !path.is_empty() {
                let object = self
                    .service
                    .buckets()
                    .download_public(bucket, &path.join("/"))?;
                return Ok(HttpResponse::new(200, object.data)
                    .header(HEADER_CONTENT_TYPE, object.content_type));
            }
        }

        self.check_api_key(request)?;
        let bearer = request.bearer();

        match (request.method, segments.as_slice()) {
            (Method::Post, ["auth", "v1", "signup"]) => {
                let body: SignUpBody = parse_body(&request.body)?;
                let credentials = Credentials::new(body.email, body.password)
                    .with_metadata(body.data.unwrap_or_default());
                let outcome = self.service.accounts().sign_up(&credentials)?;
                Ok(match outcome.session {
                    Some(session) => HttpResponse::json(200, &session),
                    None => HttpResponse::json(200, &outcome.user),
                })
            }
            (Method::Post, ["auth", "v1", "token"]) => {
                let session = match target.param("grant_type") {
                    Some("password") => {
                        let grant: PasswordGrant = parse_body(&request.body)?;
                        self.service
                            .accounts()
                            .sign_in(&grant.email, &grant.password)?
                    }
                    Some("refresh_token") => {
                        let grant: RefreshGrant = parse_body(&request.body)?;
                        self.service.accounts().refresh(&grant.refresh_token)?
                    }
                    other => {
                        return Err(HostError::InvalidRequest(format!(
                            "unsupported grant_type: {}",
                            other.unwrap_or("none")
                        )))
                    }
                };
                Ok(HttpResponse::json(200, &session))
            }
            (Method::Post, ["auth", "v1", "logout"]) => {
                let token = user_token(bearer, &self.service.config().public_key)?;
                self.service.accounts().sign_out(token)?;
                Ok(HttpResponse::new(204, Bytes::new()))
            }
            (Method::Get, ["auth", "v1", "user"]) => {
                let token = user_token(bearer, &self.service.config().public_key)?;
                let user = self.service.accounts().user_for(token)?;
                Ok(HttpResponse::json(200, &user))
            }
            (method, ["rest", "v1", table]) => {
                let authenticated = self.service.authenticated(bearer)?;
                self.table(method, table, &target, &request.body, authenticated)
            }
            (method, ["storage", "v1", "object", bucket, path @ ..]) if !path.is_empty() => {
                let authenticated = self.service.authenticated(bearer)?;
                self.object(method, bucket, &path.join("/"), request, authenticated)
            }
            _ => Err(HostError::RouteNotFound(target.path())),
        }
    }

    fn check_api_key(&self, request: &HttpRequest) -> HostResult<()> {
        match request.header_value(HEADER_API_KEY) {
            None => Err(HostError::MissingApiKey),
            Some(key) if key == self.service.config().public_key => Ok(()),
            Some(_) => Err(HostError::InvalidApiKey),
        }
    }

    fn table(
        &self,
        method: Method,
        table: &str,
        target: &Target,
        body: &Bytes,
        authenticated: bool,
    ) -> HostResult<HttpResponse> {
        let tables = self.service.tables();
        let filters = parse_filters(target)?;
        match method {
            Method::Get => {
                let columns = target.param("select").unwrap_or("*");
                let rows = tables.select(table, columns, &filters, authenticated)?;
                Ok(HttpResponse::json(200, &rows))
            }
            Method::Post => {
                let rows = match parse_body::<Value>(body)? {
                    Value::Array(items) => items
                        .into_iter()
                        .map(into_row)
                        .collect::<HostResult<Vec<Row>>>()?,
                    value => vec![into_row(value)?],
                };
                let inserted = tables.insert(table, rows, authenticated)?;
                Ok(HttpResponse::json(201, &inserted))
            }
            Method::Patch => {
                let patch = into_row(parse_body(body)?)?;
                let updated = tables.update(table, &patch, &filters, authenticated)?;
                Ok(HttpResponse::json(200, &updated))
            }
            Method::Delete => {
                let removed = tables.delete(table, &filters, authenticated)?;
                Ok(HttpResponse::json(200, &removed))
            }
        }
    }

    fn object(
        &self,
        method: Method,
        bucket: &str,
        path: &str,
        request: &HttpRequest,
        authenticated: bool,
    ) -> HostResult<HttpResponse> {
        let buckets = self.service.buckets();
        match method {
            Method::Post => {
                let options = UploadOptions {
                    upsert: request.header_value(HEADER_UPSERT) == Some("true"),
                    content_type: request.header_value(HEADER_CONTENT_TYPE).map(String::from),
                };
                let stored =
                    buckets.upload(bucket, path, request.body.clone(), &options, authenticated)?;
                Ok(HttpResponse::json(200, &json!({ "Key": stored.key })))
            }
            Method::Get => {
                let object = buckets.download(bucket, path, authenticated)?;
                Ok(HttpResponse::new(200, object.data)
                    .header(HEADER_CONTENT_TYPE, object.content_type))
            }
            _ => Err(HostError::RouteNotFound(format!(
                "/storage/v1/object/{bucket}/{path}"
            ))),
        }
    }
}

impl LoopbackServer for Router {
    fn handle(&self, request: &HttpRequest) -> HttpResponse {
        let response = self.route(request).unwrap_or_else(|err| {
            HttpResponse::error(&ServiceError::from(err))
        });
        debug!(
            method = %request.method,
            url = %request.url,
            status = response.status,
            "request handled"
        );
        response
    }
}

/// Returns the bearer if it is a user token rather than the public key.
fn user_token<'a>(bearer: Option<&'a str>, public_key: &str) -> HostResult<&'a str> {
    match bearer {
        Some(token) if token != public_key => Ok(token),
        _ => Err(HostError::InvalidToken("no user token in request".into())),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> HostResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| HostError::InvalidRequest(format!("invalid request body: {e}")))
}

fn into_row(value: Value) -> HostResult<Row> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(HostError::InvalidRequest("row must be a JSON object".into())),
    }
}

/// Every query parameter except `select` is an `eq.` filter.
fn parse_filters(target: &Target) -> HostResult<Vec<Filter>> {
    target
        .query
        .iter()
        .filter(|(k, _)| k != "select")
        .map(|(column, expr)| match expr.strip_prefix("eq.") {
            Some(value) => Ok(Filter::eq(column.clone(), value)),
            None => Err(HostError::InvalidRequest(format!(
                "unsupported filter on {column}: {expr}"
            ))),
        })
        .collect()
}

fn percent_decode(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}
