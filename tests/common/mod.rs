#![allow(dead_code)]

use async_trait::async_trait;
use pacer::request::{ExchangeResponse, RequestTarget};
use pacer::transport::{Exchange, TransportError};
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// A scripted reply for one exchange
pub enum Reply {
    Respond(ExchangeResponse),
    Fail(String),
}

pub fn ok_json(body: serde_json::Value) -> Reply {
    Reply::Respond(ExchangeResponse::new(
        200,
        "OK",
        serde_json::to_vec(&body).unwrap(),
    ))
}

pub fn status(code: u16, text: &str, body: &str) -> Reply {
    Reply::Respond(ExchangeResponse::new(code, text, body.as_bytes().to_vec()))
}

/// One observed exchange
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub url: String,
    pub at: Duration,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// In-memory exchange that replays scripted replies per URL and records every call.
///
/// URLs without a script (or whose script ran out) get `200 {"url": <url>}`.
pub struct ScriptedExchange {
    started: Instant,
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    log: Mutex<Vec<Dispatch>>,
}

impl ScriptedExchange {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            scripts: Mutex::new(HashMap::new()),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.log.lock().unwrap().clone()
    }

    pub fn urls(&self) -> Vec<String> {
        self.dispatches().into_iter().map(|d| d.url).collect()
    }

    pub fn count_for(&self, url: &str) -> usize {
        self.dispatches().iter().filter(|d| d.url == url).count()
    }

    /// Dispatch offsets in whole milliseconds, grouped by window start
    pub fn windows(&self) -> Vec<(u128, Vec<String>)> {
        let mut windows: Vec<(u128, Vec<String>)> = Vec::new();
        for dispatch in self.dispatches() {
            let at = dispatch.at.as_millis();
            match windows.last_mut() {
                Some((start, urls)) if *start == at => urls.push(dispatch.url),
                _ => windows.push((at, vec![dispatch.url])),
            }
        }
        windows
    }
}

#[async_trait]
impl Exchange for ScriptedExchange {
    async fn exchange(&self, target: &RequestTarget) -> Result<ExchangeResponse, TransportError> {
        self.log.lock().unwrap().push(Dispatch {
            url: target.url.clone(),
            at: self.started.elapsed(),
            method: target.method.to_string(),
            headers: target.headers.clone(),
            body: target.body.clone(),
        });

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&target.url)
            .and_then(|replies| replies.pop_front());

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(TransportError(message)),
            None => match ok_json(json!({ "url": target.url })) {
                Reply::Respond(response) => Ok(response),
                Reply::Fail(message) => Err(TransportError(message)),
            },
        }
    }
}
