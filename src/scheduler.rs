//! Rate-limited request scheduler.
//!
//! A single actor task owns the pending queue, the learned policy and the
//! window timer. Callers talk to it through the cloneable [`RequestScheduler`]
//! handle; exchanges run on their own tasks and report back to the actor, so
//! every queue and timer mutation happens on one task, one message at a time.

use crate::config::Config;
use crate::error::{PacerError, PacerResult};
use crate::metrics::SchedulerMetrics;
use crate::queue::{Descriptor, PendingQueue};
use crate::rate_limit_policy::{RateLimitPolicy, MAX_WINDOW};
use crate::request::{ExchangeResponse, RequestTarget};
use crate::retry::{RetryDecision, RetryPolicy};
use crate::transport::{Exchange, TransportError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

/// Requests from handles to the actor
#[derive(Debug)]
enum Command {
    Submit(Descriptor),
    Policy(oneshot::Sender<RateLimitPolicy>),
    Metrics(oneshot::Sender<SchedulerMetrics>),
}

/// A finished exchange handed back to the actor
struct Completion {
    descriptor: Descriptor,
    result: Result<ExchangeResponse, TransportError>,
}

/// Cloneable handle to a running scheduler
#[derive(Clone)]
pub struct RequestScheduler {
    tx: mpsc::UnboundedSender<Command>,
}

impl RequestScheduler {
    /// Start a scheduler task configured from `config`. Must be called inside a tokio runtime.
    pub fn spawn<E: Exchange>(config: &Config, exchange: Arc<E>) -> Self {
        Self::spawn_with(
            exchange,
            config.initial_policy(),
            config.retry_policy(),
            config.policy_header.clone(),
        )
    }

    pub fn spawn_with<E: Exchange>(
        exchange: Arc<E>,
        policy: RateLimitPolicy,
        retry: RetryPolicy,
        policy_header: impl Into<String>,
    ) -> Self {
        let (tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();

        let actor = SchedulerActor {
            exchange,
            commands,
            completions_tx,
            completions,
            queue: PendingQueue::new(),
            policy,
            retry,
            policy_header: policy_header.into(),
            next_window: Instant::now(),
            timer: None,
            accepting: true,
            metrics: SchedulerMetrics::default(),
        };

        info!(
            request_limit = actor.policy.request_limit,
            window = ?actor.policy.window,
            max_attempts = actor.retry.max_attempts,
            "Request scheduler started"
        );
        tokio::spawn(actor.run());

        Self { tx }
    }

    /// Queue `target` and return a handle to its eventual outcome.
    ///
    /// Never blocks and never touches the network.
    pub fn submit(&self, target: RequestTarget) -> PendingRequest {
        let (descriptor, rx) = Descriptor::new(target);
        if let Err(mpsc::error::SendError(Command::Submit(descriptor))) =
            self.tx.send(Command::Submit(descriptor))
        {
            descriptor.resolve(Err(PacerError::Closed));
        }
        PendingRequest { rx }
    }

    /// Submit `target`, wait for it, and decode the payload into `T`
    pub async fn fetch<T: DeserializeOwned>(&self, target: RequestTarget) -> PacerResult<T> {
        let request = target.describe();
        let payload = self.submit(target).await?;
        serde_json::from_value(payload).map_err(|e| PacerError::Decode {
            request,
            message: e.to_string(),
        })
    }

    /// The policy currently in effect
    pub async fn policy(&self) -> PacerResult<RateLimitPolicy> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Policy(reply))
            .map_err(|_| PacerError::Closed)?;
        rx.await.map_err(|_| PacerError::Closed)
    }

    pub async fn metrics(&self) -> PacerResult<SchedulerMetrics> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Metrics(reply))
            .map_err(|_| PacerError::Closed)?;
        rx.await.map_err(|_| PacerError::Closed)
    }
}

/// Outcome of one submitted request
#[derive(Debug)]
pub struct PendingRequest {
    rx: oneshot::Receiver<PacerResult<Value>>,
}

impl Future for PendingRequest {
    type Output = PacerResult<Value>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(PacerError::Closed)))
    }
}

struct SchedulerActor<E: Exchange> {
    exchange: Arc<E>,
    commands: mpsc::UnboundedReceiver<Command>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions: mpsc::UnboundedReceiver<Completion>,
    queue: PendingQueue,
    policy: RateLimitPolicy,
    retry: RetryPolicy,
    policy_header: String,
    /// Earliest instant the next batch may leave
    next_window: Instant,
    /// The single armed wake-up, if any
    timer: Option<Instant>,
    accepting: bool,
    metrics: SchedulerMetrics,
}

impl<E: Exchange> SchedulerActor<E> {
    async fn run(mut self) {
        loop {
            if !self.accepting && self.queue.is_empty() && self.metrics.in_flight == 0 {
                break;
            }

            let timer = self.timer;
            tokio::select! {
                biased;

                Some(completion) = self.completions.recv() => self.on_completion(completion),
                command = self.commands.recv(), if self.accepting => match command {
                    Some(command) => self.on_command(command),
                    None => {
                        debug!("All scheduler handles dropped, draining");
                        self.accepting = false;
                    }
                },
                _ = wait_for(timer), if timer.is_some() => self.dispatch_window(),
            }
        }

        info!(
            succeeded = self.metrics.succeeded,
            failed = self.metrics.failed,
            "Request scheduler stopped"
        );
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Submit(descriptor) => {
                self.metrics.submitted += 1;
                self.queue.push_back(descriptor);
                self.schedule_send();
            }
            Command::Policy(reply) => {
                let _ = reply.send(self.policy.clone());
            }
            Command::Metrics(reply) => {
                let mut snapshot = self.metrics.clone();
                snapshot.queue_depth = self.queue.len();
                let _ = reply.send(snapshot);
            }
        }
    }

    /// Arm the wake-up for the next window unless one is armed or there is nothing to send
    fn schedule_send(&mut self) {
        if self.timer.is_some() || self.queue.is_empty() {
            return;
        }

        let now = Instant::now();
        let wait = self.next_window.saturating_duration_since(now);
        debug!(?wait, "Waiting for next window");
        self.timer = Some(now + wait);
    }

    fn dispatch_window(&mut self) {
        self.timer = None;

        let batch = self.queue.take_batch(self.policy.request_limit as usize);
        let now = Instant::now();
        self.next_window = now
            .checked_add(self.policy.window.min(MAX_WINDOW))
            .unwrap_or(now);

        if !batch.is_empty() {
            self.metrics.record_window(batch.len());
            debug!(count = batch.len(), queued = self.queue.len(), "Sending batch");
            for (i, descriptor) in batch.iter().enumerate() {
                debug!(
                    id = %descriptor.id,
                    attempt = descriptor.attempt,
                    "  {}: {}",
                    i,
                    descriptor.target.describe()
                );
            }
        }

        for descriptor in batch {
            self.issue(descriptor);
        }

        self.schedule_send();
    }

    fn issue(&self, descriptor: Descriptor) {
        let exchange = Arc::clone(&self.exchange);
        let completions = self.completions_tx.clone();

        tokio::spawn(async move {
            let result = exchange.exchange(&descriptor.target).await;
            let _ = completions.send(Completion { descriptor, result });
        });
    }

    fn on_completion(&mut self, completion: Completion) {
        self.metrics.record_completion();
        let Completion {
            mut descriptor,
            result,
        } = completion;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(request = %descriptor.target.describe(), error = %e, "Exchange failed");
                self.metrics.failed += 1;
                let request = descriptor.target.describe();
                descriptor.resolve(Err(PacerError::Transport {
                    request,
                    message: e.to_string(),
                }));
                return;
            }
        };

        if !self.policy.learned {
            if let Some(value) = response.header(&self.policy_header) {
                self.policy.capture(value);
            }
        }

        if response.ok() {
            let request = descriptor.target.describe();
            match response.body_json() {
                Ok(payload) => {
                    self.metrics.succeeded += 1;
                    descriptor.resolve(Ok(payload));
                }
                Err(message) => {
                    warn!(%request, %message, "Response body could not be decoded");
                    self.metrics.failed += 1;
                    descriptor.resolve(Err(PacerError::Decode { request, message }));
                }
            }
            return;
        }

        match self.retry.decide(descriptor.attempt, response.status) {
            RetryDecision::Throttled => {
                self.metrics.throttled += 1;
                warn!("Throttled! {}", descriptor.target.describe());
                self.requeue(descriptor);
            }
            RetryDecision::Retry { next_attempt } => {
                self.metrics.retried += 1;
                debug!(
                    request = %descriptor.target.describe(),
                    status = response.status,
                    next_attempt,
                    "Retrying failed request"
                );
                descriptor.attempt = next_attempt;
                self.requeue(descriptor);
            }
            RetryDecision::Exhausted => {
                self.metrics.failed += 1;
                let error = PacerError::Exhausted {
                    request: descriptor.target.describe(),
                    status: response.status,
                    status_text: response.status_text.clone(),
                    body: response.body_text().unwrap_or_default(),
                    attempts: descriptor.attempt,
                };
                warn!(error = %error, "Giving up on request");
                descriptor.resolve(Err(error));
            }
        }
    }

    fn requeue(&mut self, descriptor: Descriptor) {
        self.queue.push_front(descriptor);
        self.schedule_send();
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
