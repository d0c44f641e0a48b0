//! Generic JSON REST client for the lembaas API.
//!
//! # Design
//! `RestClient` holds an immutable `ClientConfig` and a shared `Transport`;
//! it carries no mutable state between calls, so one instance can serve
//! concurrent callers. Every call goes through the same three steps:
//! `build_request` produces an `HttpRequest`, the transport sends it once,
//! and `parse_response` classifies the `HttpResponse`. Both ends are public
//! and pure, so a caller can also drive the round-trip itself.

use std::sync::Arc;
use std::time::Instant;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::envelope::{decode_body, empty_payload, Envelope};
use crate::error::{ApiError, TransportError};
use crate::http::{HttpRequest, HttpResponse, Transport};
use crate::resources::{AppClient, AppConfigClient, RoleClient, UserClient};
use crate::route::Endpoint;
use crate::transport::UreqTransport;

const USER_AGENT: &str = concat!("lembaas-core/", env!("CARGO_PKG_VERSION"));

/// Client for one lembaas app, generic over how requests reach the network.
///
/// Cloning is cheap: clones share the transport. Resource clients such as
/// `roles()` borrow the `RestClient` and add no state of their own.
pub struct RestClient<T = UreqTransport> {
    config: ClientConfig,
    api_root: String,
    transport: Arc<T>,
}

impl RestClient<UreqTransport> {
    /// Create a client that talks to the network through `ureq`.
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let transport = UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> RestClient<T> {
    /// Create a client over an injected transport.
    ///
    /// Fails with `ApiError::Config` when the configuration is malformed.
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self, ApiError> {
        Self::from_parts(config, Arc::new(transport))
    }

    fn from_parts(config: ClientConfig, transport: Arc<T>) -> Result<Self, ApiError> {
        config.validate()?;
        Ok(Self {
            api_root: config.api_root(),
            config,
            transport,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// A client identical to this one but authenticated with `token`. The
    /// transport, and with it any pooled connections, is shared.
    pub fn with_auth_token(&self, token: impl Into<String>) -> Self {
        Self {
            config: self.config.clone().with_auth_token(token),
            api_root: self.api_root.clone(),
            transport: Arc::clone(&self.transport),
        }
    }

    pub fn app(&self) -> AppClient<'_, T> {
        AppClient::new(self)
    }

    pub fn app_config(&self) -> AppConfigClient<'_, T> {
        AppConfigClient::new(self)
    }

    pub fn roles(&self) -> RoleClient<'_, T> {
        RoleClient::new(self)
    }

    pub fn users(&self) -> UserClient<'_, T> {
        UserClient::new(self)
    }

    /// Perform one call and classify its response.
    ///
    /// Errors are checked in a fixed order and the first failure wins:
    /// request building (missing token, serialization), deadline, transport,
    /// body decoding, status code, then the embedded error field.
    pub fn execute<B, R>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<Envelope<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.run(endpoint, body, None)
    }

    /// Like `execute`, but gives up once `deadline` passes. The caller is
    /// unblocked no later than the deadline and never sees a partial result.
    pub fn execute_before<B, R>(
        &self,
        endpoint: &Endpoint,
        body: Option<&B>,
        deadline: Instant,
    ) -> Result<Envelope<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.run(endpoint, body, Some(deadline))
    }

    /// Classify a response received for `endpoint`.
    pub fn parse_response<R: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        response: HttpResponse,
    ) -> Result<Envelope<R>, ApiError> {
        let route = &endpoint.route;
        let decoded = decode_body::<R>(&response.body, &route.error_field)?;

        if !route.accepts(response.status) {
            warn!(
                "{} {} returned {} (expected {:?})",
                route.method, endpoint.path, response.status, route.expected
            );
            if response.status == 404 && route.not_found_on_404 {
                return Err(ApiError::NotFound {
                    body_error: decoded.error_message,
                });
            }
            return Err(ApiError::UnexpectedStatus {
                expected: route.primary_status(),
                actual: response.status,
                body_error: decoded.error_message,
            });
        }

        if route.check_error_field {
            if let Some(message) = decoded.error_message {
                warn!("{} {} reported an error: {}", route.method, endpoint.path, message);
                return Err(ApiError::Api { message });
            }
        }

        let payload = match decoded.payload {
            Some(payload) => payload,
            None => empty_payload()?,
        };

        Ok(Envelope {
            payload,
            error_message: decoded.error_message,
            status: response.status,
        })
    }

    fn run<B, R>(&self, endpoint: &Endpoint, body: Option<&B>, deadline: Option<Instant>) -> Result<Envelope<R>, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.build_request(endpoint, body)?;
        if let Some(deadline) = deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::DeadlineExceeded.into());
            }
            request.timeout = request.timeout.min(remaining);
        }
        debug!("{} {}", request.method, request.url);

        let response = self.transport.send(&request)?;
        debug!("Response status: {}", response.status);

        self.parse_response(endpoint, response)
    }

    /// Build the `HttpRequest` for `endpoint` without sending it.
    pub fn build_request<B>(&self, endpoint: &Endpoint, body: Option<&B>) -> Result<HttpRequest, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let route = &endpoint.route;
        let mut headers = vec![
            ("accept".to_string(), "application/json".to_string()),
            ("user-agent".to_string(), USER_AGENT.to_string()),
        ];

        if route.requires_auth {
            let token = self.config.auth_token().ok_or_else(|| {
                ApiError::Config(format!(
                    "{} {} requires an auth token but none is configured",
                    route.method, endpoint.path
                ))
            })?;
            headers.push(("authorization".to_string(), format!("Bearer {token}")));
        }

        let body = match body {
            Some(input) => {
                let json = serde_json::to_string(input).map_err(|e| ApiError::Serialization(e.to_string()))?;
                headers.push(("content-type".to_string(), "application/json".to_string()));
                Some(json)
            }
            None => None,
        };

        Ok(HttpRequest {
            method: route.method,
            url: format!("{}{}", self.api_root, endpoint.path),
            headers,
            body,
            timeout: self.config.timeout(),
        })
    }
}

impl<T> Clone for RestClient<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            api_root: self.api_root.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> std::fmt::Debug for RestClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("config", &self.config)
            .field("api_root", &self.api_root)
            .finish_non_exhaustive()
    }
}
