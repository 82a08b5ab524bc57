pub mod client;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod metrics;
pub mod queue;
pub mod rate_limit_policy;
pub mod request;
pub mod retry;
pub mod scheduler;
pub mod transport;

pub use client::ApiClient;
pub use config::Config;
pub use error::{PacerError, PacerResult};
pub use rate_limit_policy::RateLimitPolicy;
pub use request::{ExchangeResponse, RequestTarget};
pub use scheduler::{PendingRequest, RequestScheduler};
pub use transport::{Exchange, HttpTransport, TransportError};
