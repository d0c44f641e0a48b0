use serde::de::IgnoredAny;

use crate::client::RestClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::route::Route;
use crate::types::{ConfigValue, ConfigValueList, SetConfigValue};

const LIST: Route = Route::get("/config/all");
const GET: Route = Route::get("/config/{key}/get").lookup();
const SET: Route = Route::post("/config/set").expect(&[201]);
const DELETE: Route = Route::delete("/config/{key}/delete");

/// Custom key/value settings stored for the app.
pub struct AppConfigClient<'a, T> {
    rest: &'a RestClient<T>,
}

impl<'a, T: Transport> AppConfigClient<'a, T> {
    pub(crate) fn new(rest: &'a RestClient<T>) -> Self {
        Self { rest }
    }

    pub fn list(&self) -> Result<ConfigValueList, ApiError> {
        self.rest
            .execute(&LIST.endpoint()?, None::<&()>)
            .map(|envelope| envelope.payload)
    }

    /// Fails with `ApiError::NotFound` when `key` is not set.
    pub fn get(&self, key: &str) -> Result<ConfigValue, ApiError> {
        self.rest
            .execute(&GET.bind(&[("key", key)])?, None::<&()>)
            .map(|envelope| envelope.payload)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<ConfigValue, ApiError> {
        let body = SetConfigValue {
            config_key: key.to_string(),
            config_value: value.to_string(),
        };
        self.rest
            .execute(&SET.endpoint()?, Some(&body))
            .map(|envelope| envelope.payload)
    }

    pub fn delete(&self, key: &str) -> Result<(), ApiError> {
        self.rest
            .execute::<(), IgnoredAny>(&DELETE.bind(&[("key", key)])?, None)
            .map(|_| ())
    }
}
