//! Call specification: what the caller wants sent.
//!
//! A [`CallSpec`] is validated once, at construction. Anything that gets past
//! [`CallSpecBuilder::build`] has a known verb and a parseable absolute URL,
//! so the executor never has to reject a call after the clock has started.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Timeout applied when the caller does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Error raised while building a [`CallSpec`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    #[error("call specification is missing an HTTP method")]
    MissingMethod,

    #[error("call specification is missing a target URL")]
    MissingUrl,

    #[error("unsupported HTTP method '{0}'")]
    InvalidMethod(String),

    #[error("invalid target URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid timeout of {0} seconds")]
    InvalidTimeout(String),
}

/// The verbs an instrumented call may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    /// Upper-case wire name of the verb.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ConstructionError;

    /// Verbs are matched case-insensitively ("post" and "POST" are the same).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "HEAD" => Ok(HttpMethod::Head),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "OPTIONS" => Ok(HttpMethod::Options),
            "" => Err(ConstructionError::MissingMethod),
            _ => Err(ConstructionError::InvalidMethod(s.to_string())),
        }
    }
}

impl Serialize for HttpMethod {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Ordered header list.
///
/// Names keep the casing the caller gave them. Lookups through
/// [`Headers::get`] are case-insensitive, as HTTP header names are.
///
/// One entry per name. [`Headers::insert`] replaces an earlier value,
/// [`Headers::append`] folds repeated fields into one comma-separated value.
/// Values are UTF-8 text; callers converting from wire headers skip the rest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    /// Create an empty header list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert a header, replacing any existing entry with the same
    /// (case-insensitive) name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => entry.1 = value,
            None => self.0.push((name, value)),
        }
    }

    /// Add a header, joining it onto an existing entry of the same
    /// (case-insensitive) name with `", "`.
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.0.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(&name)) {
            Some(entry) => {
                entry.1.push_str(", ");
                entry.1.push_str(&value);
            }
            None => self.0.push((name, value)),
        }
    }

    /// Look up a header value by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of distinct header names.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl Serialize for Headers {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Headers {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HeadersVisitor;

        impl<'de> Visitor<'de> for HeadersVisitor {
            type Value = Headers;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of header names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Headers, A::Error> {
                let mut headers = Headers::new();
                while let Some((name, value)) = access.next_entry::<String, String>()? {
                    headers.insert(name, value);
                }
                Ok(headers)
            }
        }

        deserializer.deserialize_map(HeadersVisitor)
    }
}

/// An immutable, validated description of one outbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSpec {
    method: HttpMethod,
    target_url: String,
    headers: Headers,
    body: Option<Value>,
    timeout: Duration,
    extra_options: Map<String, Value>,
}

impl CallSpec {
    /// Start building a call specification.
    pub fn builder() -> CallSpecBuilder {
        CallSpecBuilder::default()
    }

    /// Get the HTTP verb.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Get the absolute target URL.
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Get the request headers, unmasked.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get the JSON body, if any.
    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    /// Get the per-call timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Get the transport-specific options.
    pub fn extra_options(&self) -> &Map<String, Value> {
        &self.extra_options
    }
}

/// Builder for [`CallSpec`].
#[derive(Debug, Clone, Default)]
pub struct CallSpecBuilder {
    method: Option<String>,
    target_url: Option<String>,
    headers: Headers,
    body: Option<Value>,
    timeout: Option<Duration>,
    extra_options: Map<String, Value>,
}

impl CallSpecBuilder {
    /// Set the HTTP verb (case-insensitive).
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Set the absolute target URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.target_url = Some(url.into());
        self
    }

    /// Add one header.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Replace all headers.
    pub fn headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    /// Sets a JSON body.
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Set the per-call timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets a transport-specific option. The value is forwarded untouched.
    pub fn option(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_options.insert(key.into(), value);
        self
    }

    /// Validate and build the specification.
    pub fn build(self) -> Result<CallSpec, ConstructionError> {
        let method: HttpMethod = self
            .method
            .ok_or(ConstructionError::MissingMethod)?
            .parse()?;

        let target_url = self.target_url.ok_or(ConstructionError::MissingUrl)?;
        if target_url.trim().is_empty() {
            return Err(ConstructionError::MissingUrl);
        }
        url::Url::parse(&target_url).map_err(|e| ConstructionError::InvalidUrl {
            url: target_url.clone(),
            reason: e.to_string(),
        })?;

        Ok(CallSpec {
            method,
            target_url,
            headers: self.headers,
            body: self.body,
            timeout: self.timeout.unwrap_or(DEFAULT_TIMEOUT),
            extra_options: self.extra_options,
        })
    }
}

/// Loosely-typed request document, as callers usually hand it over
/// (e.g. read from JSON). Converted into a [`CallSpec`] with `try_from`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    pub method: Option<String>,
    pub url: Option<String>,
    pub headers: Headers,
    #[serde(alias = "json")]
    pub body: Option<Value>,
    pub timeout_secs: Option<f64>,
    #[serde(alias = "kwargs")]
    pub options: Map<String, Value>,
}

impl TryFrom<RequestConfig> for CallSpec {
    type Error = ConstructionError;

    fn try_from(config: RequestConfig) -> Result<Self, Self::Error> {
        let mut builder = CallSpecBuilder {
            method: config.method,
            target_url: config.url,
            headers: config.headers,
            body: config.body,
            timeout: None,
            extra_options: config.options,
        };
        if let Some(secs) = config.timeout_secs {
            let timeout = Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|t| !t.is_zero())
                .ok_or_else(|| ConstructionError::InvalidTimeout(secs.to_string()))?;
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}
