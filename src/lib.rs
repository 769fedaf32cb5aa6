//! NeuraLex embeddings client
//!
//! Turns text into dense vectors by calling the NeuraLex embedding service.
//! You hand us one string or a batch, we validate it, send it, retry the
//! transient failures and give back one vector per input, in your order.
//!
//! ## What you get
//!
//! - **Two facades** - [`Client`] for async code on tokio, [`blocking::Client`]
//!   for plain threads. Same validation, same retry policy, same results.
//! - **Semantic weight** - Per-call blend between term matching (0.0) and
//!   meaning (1.0), checked before anything hits the network.
//! - **Retries that behave** - 429, 5xx and transport failures back off
//!   exponentially with jitter; `Retry-After` hints are honored.
//! - **Typed errors** - Every failure is a [`NeuralexError`] variant you can
//!   match on. No stringly-typed surprises.
//! - **Structured logs** - Each call runs in a `neuralex.embed` tracing span.
//!   The API key never shows up in logs or `Debug` output.
//!
//! ## Quick example
//!
//! ```no_run
//! use neuralex::{Client, ClientConfig, EmbedOptions};
//!
//! #[tokio::main]
//! async fn main() -> neuralex::Result<()> {
//!     let client = Client::new(ClientConfig::new("nlx_your_api_key"))?;
//!
//!     let options = EmbedOptions::new().with_semantic_weight(0.8);
//!     let response = client.embed(vec!["cats purr", "dogs bark"], &options).await?;
//!
//!     for item in &response.payload {
//!         println!("{} -> {} dims", item.text, item.dimensions());
//!     }
//!     println!("{} tokens", response.total_usage.total_tokens);
//!     Ok(())
//! }
//! ```
//!
//! ## Testing your code
//!
//! Both facades accept any transport via `with_transport`, so you can script
//! responses without a network. See [`AsyncTransport`] and
//! [`BlockingTransport`].

mod client;
mod connection;
mod pipeline;
mod serde_millis;

pub mod classify;
pub mod config;
pub mod error;
pub mod normalize;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;
pub mod types;

#[cfg(feature = "blocking")]
pub mod blocking;

pub use crate::client::Client;
pub use crate::config::{ApiKey, ClientConfig};
pub use crate::error::{ErrorKind, NeuralexError, Result, TransportErrorKind};
pub use crate::normalize::{EmbedInput, NormalizedInput, normalize_input};
pub use crate::request::{RequestDescriptor, build_request};
pub use crate::response::{ItemOrdering, parse_response};
pub use crate::retry::RetryConfig;
#[cfg(feature = "blocking")]
pub use crate::transport::http::BlockingHttpTransport;
pub use crate::transport::http::HttpTransport;
pub use crate::transport::{
    AsyncTransport, BlockingTransport, HttpRequest, HttpResponse, TransportFailure,
};
pub use crate::types::{EmbedOptions, EmbeddingItem, EmbeddingResponse, Usage};
