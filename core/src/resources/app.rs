use tracing::info;

use crate::client::RestClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::route::Route;
use crate::types::{AppInfo, TokenRequest, TokenResponse};

const TOKEN: Route = Route::post("/token").anonymous();
const INFO: Route = Route::get("/app");

/// App-level calls: token exchange and app metadata.
pub struct AppClient<'a, T> {
    rest: &'a RestClient<T>,
}

impl<'a, T: Transport> AppClient<'a, T> {
    pub(crate) fn new(rest: &'a RestClient<T>) -> Self {
        Self { rest }
    }

    /// Exchange client credentials for a bearer token. Does not need a
    /// token itself.
    pub fn get_auth_token(&self, client_id: &str, client_secret: &str) -> Result<TokenResponse, ApiError> {
        let body = TokenRequest {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        };
        self.rest
            .execute(&TOKEN.endpoint()?, Some(&body))
            .map(|envelope| envelope.payload)
    }

    /// Exchange client credentials and return a client that uses the new
    /// token. The token is not refreshed.
    pub fn authenticate(&self, client_id: &str, client_secret: &str) -> Result<RestClient<T>, ApiError> {
        let token = self.get_auth_token(client_id, client_secret)?;
        if token.token.is_empty() {
            return Err(ApiError::Api {
                message: "token exchange returned an empty token".to_string(),
            });
        }
        info!(
            "Obtained {} token for {} (expires in {}s)",
            token.token_type, client_id, token.expires_in
        );
        Ok(self.rest.with_auth_token(token.token))
    }

    pub fn info(&self) -> Result<AppInfo, ApiError> {
        self.rest
            .execute(&INFO.endpoint()?, None::<&()>)
            .map(|envelope| envelope.payload)
    }
}
