//! Main API client implementation

use crate::config::ClientConfig;
use crate::endpoints::{AuthApi, IpfsApi, VirusTotalApi};
use crate::error::{ApiError, ApiResult, ErrorContext};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use uuid::Uuid;
use zerobyte_core::rate_limit::RateLimiter;
use zerobyte_core::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

const USER_AGENT_VALUE: &str = concat!("zerobyte/", env!("CARGO_PKG_VERSION"));

/// Remote services the client talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// IPFS node RPC API
    Ipfs,
    /// VirusTotal malware scanning
    VirusTotal,
    /// Firebase identity and token endpoints
    Identity,
}

impl Service {
    /// Short name used in logs and errors
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Ipfs => "ipfs",
            Self::VirusTotal => "virustotal",
            Self::Identity => "identity",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

struct Breakers {
    ipfs: CircuitBreaker,
    virustotal: CircuitBreaker,
    identity: CircuitBreaker,
}

impl Breakers {
    fn new() -> Self {
        Self {
            ipfs: CircuitBreaker::new(CircuitBreakerConfig::default()),
            virustotal: CircuitBreaker::new(CircuitBreakerConfig::default()),
            identity: CircuitBreaker::new(CircuitBreakerConfig::default()),
        }
    }

    fn get(&self, service: Service) -> &CircuitBreaker {
        match service {
            Service::Ipfs => &self.ipfs,
            Service::VirusTotal => &self.virustotal,
            Service::Identity => &self.identity,
        }
    }
}

/// ZeroByte API client with built-in resilience patterns
///
/// This client wraps `reqwest` and adds, per remote service:
/// - Automatic retry with exponential backoff
/// - A circuit breaker to stop hammering a service that is down
/// - Request correlation IDs for tracing
///
/// VirusTotal requests additionally wait for the shared rate limiter,
/// since the public API allows only a handful of requests per minute.
#[derive(Clone)]
pub struct ZeroByteClient {
    inner: Client,
    config: Arc<ClientConfig>,
    breakers: Arc<Breakers>,
    rate_limiter: Arc<RateLimiter>,
}

impl ZeroByteClient {
    /// Create a new client with default configuration from environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::from_env()?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        // Only connecting is bounded here; transfers get an idle timeout instead
        let inner = Client::builder()
            .connect_timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            inner,
            config: Arc::new(config),
            breakers: Arc::new(Breakers::new()),
            rate_limiter,
        })
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get circuit breaker state for a service
    #[must_use]
    pub fn circuit_state(&self, service: Service) -> CircuitState {
        self.breakers.get(service).state()
    }

    /// Reset the circuit breaker of a service
    pub fn reset_circuit(&self, service: Service) {
        self.breakers.get(service).reset();
    }

    // -------------------------------------------------------------------------
    // Endpoint API accessors
    // -------------------------------------------------------------------------

    /// Access the IPFS node RPC API
    #[must_use]
    pub fn ipfs(&self) -> IpfsApi {
        IpfsApi::new(self.clone())
    }

    /// Access the VirusTotal API
    #[must_use]
    pub fn virustotal(&self) -> VirusTotalApi {
        VirusTotalApi::new(self.clone())
    }

    /// Access the Firebase identity API
    #[must_use]
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Low-level HTTP methods with resilience
    // -------------------------------------------------------------------------

    /// Send a request and deserialize a JSON response
    ///
    /// The whole exchange must finish within the configured timeout.
    pub async fn send_json<T, F>(&self, service: Service, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let timeout = self.config.timeout;
        let response = self.send(service, |c| build(c).timeout(timeout)).await?;
        response.json().await.map_err(ApiError::Request)
    }

    /// Send an upload and deserialize the JSON answer
    ///
    /// Sending the body is not bounded, since a large file can take longer
    /// than the timeout; waiting for the answer afterwards is.
    pub async fn send_upload_json<T, F>(&self, service: Service, build: F) -> ApiResult<T>
    where
        T: DeserializeOwned,
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = self.send(service, build).await?;
        self.within_timeout(response.json()).await
    }

    /// Await one step of a transfer, failing when it stalls past the configured timeout
    pub(crate) async fn within_timeout<T, Fut>(&self, step: Fut) -> ApiResult<T>
    where
        Fut: Future<Output = Result<T, reqwest::Error>>,
    {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, step).await {
            Ok(result) => result.map_err(ApiError::Request),
            Err(_) => Err(ApiError::Timeout(timeout)),
        }
    }

    /// Send a request with the client's retry policy
    ///
    /// `build` is called once per attempt, so request bodies that cannot be
    /// cloned (multipart forms) are rebuilt for every retry.
    pub async fn send<F>(&self, service: Service, build: F) -> ApiResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let retry = self.config.retry.clone();
        self.send_with_retry(service, &retry, build).await
    }

    /// Send a request with an explicit retry policy
    #[instrument(skip(self, retry, build), fields(service = %service, request_id))]
    pub async fn send_with_retry<F>(&self, service: Service, retry: &RetryConfig, build: F) -> ApiResult<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let request_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("request_id", request_id.as_str());

        let breaker = self.breakers.get(service);
        let max_attempts = retry.max_attempts.max(1);
        let mut last_error: Option<ApiError> = None;

        for attempt in 0..max_attempts {
            // Wait before retry (except first attempt)
            if attempt > 0 {
                let delay = retry.delay_for_attempt(attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying after delay");
                tokio::time::sleep(delay).await;
            }

            if !breaker.can_execute() {
                warn!("Circuit breaker is open, rejecting request");
                return Err(ApiError::CircuitOpen(service.name()));
            }

            if service == Service::VirusTotal {
                let waited = self.rate_limiter.acquire(service.name()).await;
                if !waited.is_zero() {
                    debug!(waited_ms = waited.as_millis() as u64, "Waited for rate limit");
                }
            }

            let start = Instant::now();
            let request = build(&self.inner).header(X_REQUEST_ID, &request_id);
            let result = execute(&self.inner, request, &request_id).await;
            let elapsed = start.elapsed();

            match result {
                Ok(response) => {
                    breaker.record_success();
                    debug!(attempt = attempt + 1, elapsed_ms = elapsed.as_millis() as u64, "Request succeeded");
                    return Ok(response);
                }
                Err(e) => {
                    // 4xx means the service answered; only outages trip the breaker
                    if e.is_retryable() || e.is_server_error() {
                        breaker.record_failure();
                    }

                    if e.is_retryable() && attempt + 1 < max_attempts {
                        debug!(attempt = attempt + 1, error = %e, "Request failed, will retry");
                        last_error = Some(e);
                    } else {
                        debug!(attempt = attempt + 1, error = %e, "Request failed, not retrying");
                        return Err(e);
                    }
                }
            }
        }

        Err(ApiError::RetriesExhausted {
            attempts: max_attempts,
            last_error: last_error.map_or_else(|| "Unknown error".to_string(), |e| e.to_string()),
        })
    }
}

/// Execute a single request without retry
async fn execute(client: &Client, request: RequestBuilder, request_id: &str) -> ApiResult<Response> {
    let request = request.build()?;
    let context = ErrorContext {
        request_id: Some(request_id.to_string()),
        endpoint: request.url().path().to_string(),
        method: request.method().to_string(),
    };

    let response = client.execute(request).await?;
    let status = response.status();

    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());
    debug!(context = %context, status = status.as_u16(), message = %message, "Error response");

    Err(ApiError::api_response(status.as_u16(), message))
}

/// Pull the human-readable message out of a service error body
///
/// Handles `{"error": {"message": ..}}` (VirusTotal, Firebase),
/// `{"Message": ..}` (IPFS node) and plain-text bodies.
pub(crate) fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        let message = value
            .pointer("/error/message")
            .or_else(|| value.get("Message"))
            .or_else(|| value.get("error"))
            .and_then(serde_json::Value::as_str);
        if let Some(message) = message {
            return Some(message.to_string());
        }
    }

    Some(body.to_string())
}
