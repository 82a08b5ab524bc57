use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// Destination and options for one outbound request
#[derive(Debug, Clone)]
pub struct RequestTarget {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl RequestTarget {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers
            .extend(headers.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Serialize `body` as JSON and mark the request accordingly
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_vec(body)?);
        if !self
            .headers
            .iter()
            .any(|(name, _)| name.eq_ignore_ascii_case("content-type"))
        {
            self.headers
                .push(("content-type".to_string(), "application/json".to_string()));
        }
        Ok(self)
    }

    /// `"<METHOD> <url>"`, used in logs and terminal errors
    pub fn describe(&self) -> String {
        format!("{} {}", self.method, self.url)
    }
}

/// Status, headers and buffered body of one completed exchange
#[derive(Debug, Clone)]
pub struct ExchangeResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    body: Result<Vec<u8>, String>,
}

impl ExchangeResponse {
    pub fn new(status: u16, status_text: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: HeaderMap::new(),
            body: Ok(body),
        }
    }

    /// A response whose body could not be read after the headers arrived
    pub fn with_unreadable_body(
        status: u16,
        status_text: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            status,
            status_text: status_text.into(),
            headers: HeaderMap::new(),
            body: Err(reason.into()),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Adds a header, ignoring names or values that are not valid HTTP
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of `name`, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body_text(&self) -> Result<String, String> {
        match &self.body {
            Ok(bytes) => String::from_utf8(bytes.clone()).map_err(|e| e.to_string()),
            Err(reason) => Err(reason.clone()),
        }
    }

    pub fn body_json(&self) -> Result<Value, String> {
        match &self.body {
            Ok(bytes) => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
            Err(reason) => Err(reason.clone()),
        }
    }
}
