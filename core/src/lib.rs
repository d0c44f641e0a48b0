//! Typed client for the lembaas backend-as-a-service REST API.
//!
//! # Overview
//! `RestClient` performs one JSON call at a time: it builds the request,
//! attaches the bearer token, sends it through a `Transport`, decodes the
//! body and classifies the outcome into a payload or an `ApiError`. The
//! App, AppConfig, Role and User clients are thin tables of `Route`s on
//! top of it.
//!
//! # Design
//! - `ClientConfig` is immutable once owned by a client; the client itself
//!   holds no mutable state, so one instance can be shared across threads.
//! - The network sits behind the `Transport` trait. `UreqTransport` is the
//!   default; tests inject scripted transports.
//! - Per-route policy (accepted statuses, auth, 404 handling, where the
//!   embedded error text lives) is data on the `Route`, not code.
//!
//! ```no_run
//! use lembaas_core::{ClientConfig, RestClient};
//!
//! let client = RestClient::new(ClientConfig::new("https://baas.example.com", 1))?;
//! let authed = client.app().authenticate("client-id", "client-secret")?;
//! let roles = authed.roles().list()?;
//! println!("{} roles", roles.count);
//! # Ok::<(), lembaas_core::ApiError>(())
//! ```

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod resources;
pub mod route;
pub mod transport;
pub mod types;

pub use client::RestClient;
pub use config::ClientConfig;
pub use envelope::{Envelope, ErrorExtractor};
pub use error::{ApiError, ErrorKind, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Transport};
pub use resources::{AppClient, AppConfigClient, RoleClient, UserClient};
pub use route::{Endpoint, Route};
pub use transport::UreqTransport;
pub use types::{
    AppInfo, AuthResponse, ConfigValue, ConfigValueList, CreateRole, LoginRequest, RegisterUser, Role,
    RoleList, SetConfigValue, TokenRequest, TokenResponse, TotpConfirmRequest, TotpEnableResponse,
    TotpLoginRequest, UpdateUser, User, UserList, UserResponse,
};
