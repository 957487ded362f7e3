//! Request and response values exchanged with an [`crate::HttpClient`].

use bytes::Bytes;
use hostlink_core::ServiceError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the public API key.
pub const HEADER_API_KEY: &str = "apikey";
/// Header carrying the bearer token.
pub const HEADER_AUTHORIZATION: &str = "authorization";
/// Header carrying the body's MIME type.
pub const HEADER_CONTENT_TYPE: &str = "content-type";
/// Header asking the table API to echo affected rows.
pub const HEADER_PREFER: &str = "prefer";
/// Header asking storage to overwrite an existing object.
pub const HEADER_UPSERT: &str = "x-upsert";

/// MIME type of JSON bodies.
pub const JSON: &str = "application/json";
/// MIME type of opaque blobs.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET.
    Get,
    /// POST.
    Post,
    /// PATCH.
    Patch,
    /// DELETE.
    Delete,
}

impl Method {
    /// Returns the method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method.
    pub method: Method,
    /// Absolute URL, query included.
    pub url: String,
    /// Headers, names in lower case.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: Bytes,
}

impl HttpRequest {
    /// Creates a request with no headers and an empty body.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a header.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Sets the body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the first value of header `name`.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns the bearer token from the authorization header.
    pub fn bearer(&self) -> Option<&str> {
        self.header_value(HEADER_AUTHORIZATION).and_then(|v| {
            v.strip_prefix("Bearer ")
                .or_else(|| v.strip_prefix("bearer "))
                .map(str::trim)
        })
    }
}

/// A response received for an [`HttpRequest`].
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Headers, names in lower case.
    pub headers: Vec<(String, String)>,
    /// Body.
    pub body: Bytes,
}

impl HttpResponse {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Creates a JSON response.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self::new(status, body).header(HEADER_CONTENT_TYPE, JSON),
            Err(e) => Self::error(&ServiceError::new(500, format!("encode error: {e}"))),
        }
    }

    /// Creates a JSON error response from a service error.
    pub fn error(err: &ServiceError) -> Self {
        let status = err.status.unwrap_or(500);
        let body = ErrorBody {
            message: Some(err.message.clone()),
            code: err.code.clone(),
            ..ErrorBody::default()
        };
        let bytes = serde_json::to_vec(&body).unwrap_or_default();
        Self::new(status, bytes).header(HEADER_CONTENT_TYPE, JSON)
    }

    /// Adds a header.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Returns the first value of header `name`.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Converts a non-2xx response into the service error it carries.
    ///
    /// The body's message is used verbatim; a body that is not a JSON error
    /// object becomes the message as text.
    pub fn to_service_error(&self) -> ServiceError {
        let parsed: Option<ErrorBody> = serde_json::from_slice(&self.body).ok();
        let (message, code) = match parsed {
            Some(body) => (body.message_text(), body.code_text()),
            None => (None, None),
        };

        let message = message.unwrap_or_else(|| {
            let text = String::from_utf8_lossy(&self.body).trim().to_string();
            if text.is_empty() {
                format!("request failed with status {}", self.status)
            } else {
                text
            }
        });

        let err = ServiceError::new(self.status, message);
        match code {
            Some(code) => err.with_code(code),
            None => err,
        }
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Error body shapes used by the hosted service's APIs.
///
/// Auth uses `msg`/`error_code` or `error`/`error_description`; the table
/// API uses `message`/`code`; storage uses `message`/`error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Message (table and storage APIs).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Message (auth API).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
    /// Error code.
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "code_string")]
    pub code: Option<String>,
    /// Error code (auth API).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// Short error name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Long error description (OAuth style).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
}

impl ErrorBody {
    fn message_text(&self) -> Option<String> {
        self.message
            .clone()
            .or_else(|| self.msg.clone())
            .or_else(|| self.error_description.clone())
            .or_else(|| self.error.clone())
    }

    fn code_text(&self) -> Option<String> {
        self.error_code
            .clone()
            .or_else(|| self.code.clone())
            .or_else(|| self.message.as_ref().and(self.error.clone()))
    }
}

/// Accepts numeric codes (the auth API sends the HTTP status there).
fn code_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}
