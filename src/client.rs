use crate::error::{PacerError, PacerResult};
use crate::request::RequestTarget;
use crate::scheduler::RequestScheduler;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Thin JSON client that sends every call through one scheduler
#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    default_headers: Vec<(String, String)>,
    scheduler: RequestScheduler,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, scheduler: RequestScheduler) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            default_headers: Vec::new(),
            scheduler,
        }
    }

    /// Header sent with every request
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    /// Absolute URLs pass through untouched; anything else is joined onto the base URL
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> PacerResult<T> {
        let target = RequestTarget::get(self.url_for(path)).headers(self.default_headers.clone());
        self.scheduler.fetch(target).await
    }

    /// POST with an optional JSON body; no body is attached when `body` is `None`
    pub async fn post<T, B>(&self, path: &str, body: Option<&B>) -> PacerResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let mut target = RequestTarget::post(self.url_for(path))
            .headers(self.default_headers.clone())
            .header("content-type", "application/json");

        if let Some(body) = body {
            target = target.json(body).map_err(|e| PacerError::Validation(format!(
                "Request body for {} could not be serialized: {}",
                path, e
            )))?;
        }

        self.scheduler.fetch(target).await
    }
}
