use std::fmt;
use std::time::Instant;

use tracing::{Instrument, debug, info_span};

use crate::config::ClientConfig;
use crate::connection::Connection;
use crate::error::Result;
use crate::normalize::EmbedInput;
use crate::pipeline::{finish, prepare, record_outcome};
use crate::transport::http::HttpTransport;
use crate::transport::{AsyncTransport, execute_async};
use crate::types::{EmbedOptions, EmbeddingResponse};

/// Async client for the NeuraLex embedding endpoint.
///
/// Cheap to share behind an `Arc`; `embed` takes `&self` and concurrent calls
/// are independent. Dropping the client releases its connection pool.
///
/// ```no_run
/// # async fn run() -> neuralex::Result<()> {
/// use neuralex::{Client, ClientConfig, EmbedOptions};
///
/// let client = Client::new(ClientConfig::new("nlx_your_api_key"))?;
/// let response = client
///     .embed(["first text", "second text"], &EmbedOptions::new().with_semantic_weight(0.7))
///     .await?;
/// assert_eq!(response.len(), 2);
/// # Ok(())
/// # }
/// ```
pub struct Client<T = HttpTransport> {
    config: ClientConfig,
    connection: Connection<T>,
}

impl Client<HttpTransport> {
    /// Validate `config` and open an HTTP connection pool.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::assemble(config, transport))
    }

    /// Build from `NEURALEX_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env()?)
    }
}

impl<T: AsyncTransport> Client<T> {
    /// Use a caller-supplied transport instead of the default HTTP one.
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

    /// Embed one text or a batch.
    ///
    /// Items in the result are in input order. Validation problems fail
    /// before any request is sent; transient failures are retried per
    /// [`RetryConfig`](crate::RetryConfig) within the call's deadline.
    pub async fn embed(
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
        async move {
            let result = match execute_async(
                transport.as_ref(),
                &prepared.request,
                &self.config.retry,
                prepared.budget,
            )
            .await
            {
                Ok(body) => finish(&body, &prepared.input, &self.config),
                Err(err) => Err(err),
            };
            record_outcome(result, start)
        }
        .instrument(span)
        .await
    }
}

impl<T> Client<T> {
    /// Release the connection. Later `embed` calls fail with
    /// [`NeuralexError::Closed`](crate::NeuralexError::Closed); calls already
    /// in flight finish normally. Calling it again is a no-op.
    pub fn close(&self) {
        if self.connection.release() {
            debug!("neuralex client closed");
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
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}
