//! Thread-blocking client.
//!
//! Same behavior as the async [`Client`](crate::Client), with backoff waits
//! blocking the calling thread. Do not use it from inside an async runtime.
//!
//! ```no_run
//! use neuralex::blocking::Client;
//! use neuralex::{ClientConfig, EmbedOptions};
//!
//! # fn run() -> neuralex::Result<()> {
//! let client = Client::new(ClientConfig::new("nlx_your_api_key"))?;
//! let response = client.embed("Hello, world!", &EmbedOptions::default())?;
//! println!("{} dimensions", response.dimensions());
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::time::Instant;

use tracing::{debug, info_span};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::normalize::EmbedInput;
use crate::pipeline::{finish, prepare, record_outcome};
use crate::transport::http::BlockingHttpTransport;
use crate::transport::{BlockingTransport, execute_blocking};
use crate::types::{EmbedOptions, EmbeddingResponse};

/// Blocking client for the NeuraLex embedding endpoint.
///
/// `Send + Sync`; share it between threads with an `Arc`.
pub struct Client<T = BlockingHttpTransport> {
    config: ClientConfig,
    connection: Connection<T>,
}

impl Client<BlockingHttpTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = BlockingHttpTransport::new(&config)?;
        Ok(Self::assemble(config, transport))
    }

    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: BlockingTransport> Client<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, transport))
    }

    fn assemble(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            connection: Connection::open(transport),
        }
    }

    /// Embed one text or a batch, blocking until the call completes.
    pub fn embed(
        &self,
        input: impl Into<EmbedInput>,
        options: &EmbedOptions,
    ) -> Result<EmbeddingResponse> {
        let start = Instant::now();
        let transport = match self.connection.acquire() {
            Ok(transport) => transport,
            Err(err) => return record_outcome(Err(err), start),
        };
        let prepared = match prepare(input.into(), &self.config, options) {
            Ok(prepared) => prepared,
            Err(err) => return record_outcome(Err(err), start),
        };

        let span = info_span!(
            "neuralex.embed",
            request_id = %prepared.request_id,
            inputs = prepared.input.len()
        );
        let _guard = span.enter();

        let result = execute_blocking(
            transport.as_ref(),
            &prepared.request,
            &self.config.retry,
            prepared.budget,
        )
        .and_then(|body| finish(&body, &prepared.input, &self.config));
        record_outcome(result, start)
    }
}

impl<T> Client<T> {
    /// Release the connection. Idempotent.
    pub fn close(&self) {
        if self.connection.release() {
            debug!("neuralex blocking client closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.connection.is_closed()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl<T> Drop for Client<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("blocking::Client")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}
