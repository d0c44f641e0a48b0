use serde::de::IgnoredAny;

use crate::client::RestClient;
use crate::error::ApiError;
use crate::http::Transport;
use crate::route::Route;
use crate::types::{
    AuthResponse, LoginRequest, RegisterUser, TotpConfirmRequest, TotpEnableResponse, TotpLoginRequest,
    UpdateUser, User, UserList, UserResponse,
};

const LIST: Route = Route::get("/users");
const GET: Route = Route::get("/users/{id}/get").lookup();
const GET_BY_EMAIL: Route = Route::get("/users/email/{email}/get").lookup();
const REGISTER: Route = Route::post("/users/register").expect(&[201]);
const UPDATE: Route = Route::post("/users/update");
const DELETE: Route = Route::delete("/users/{id}/delete");
const ENABLE_TOTP: Route = Route::post("/users/{id}/totp/enable");
const CONFIRM_TOTP: Route = Route::post("/users/{id}/totp/enable/confirm");
const LOGIN: Route = Route::post("/users/login");
const LOGIN_TOTP: Route = Route::post("/users/login/totp");

/// App users: registration, lookup, login and TOTP enrollment.
pub struct UserClient<'a, T> {
    rest: &'a RestClient<T>,
}

impl<'a, T: Transport> UserClient<'a, T> {
    pub(crate) fn new(rest: &'a RestClient<T>) -> Self {
        Self { rest }
    }

    pub fn list(&self) -> Result<UserList, ApiError> {
        self.rest
            .execute(&LIST.endpoint()?, None::<&()>)
            .map(|envelope| envelope.payload)
    }

    /// Fails with `ApiError::NotFound` when no user has `user_id`.
    pub fn get(&self, user_id: i64) -> Result<User, ApiError> {
        let id = user_id.to_string();
        self.rest
            .execute::<(), UserResponse>(&GET.bind(&[("id", &id)])?, None)
            .map(|envelope| envelope.payload.user)
    }

    /// Fails with `ApiError::NotFound` when no user has `email`.
    pub fn get_by_email(&self, email: &str) -> Result<User, ApiError> {
        self.rest
            .execute::<(), UserResponse>(&GET_BY_EMAIL.bind(&[("email", email)])?, None)
            .map(|envelope| envelope.payload.user)
    }

    pub fn register(&self, request: &RegisterUser) -> Result<User, ApiError> {
        self.rest
            .execute::<_, UserResponse>(&REGISTER.endpoint()?, Some(request))
            .map(|envelope| envelope.payload.user)
    }

    pub fn update(&self, request: &UpdateUser) -> Result<User, ApiError> {
        self.rest
            .execute::<_, UserResponse>(&UPDATE.endpoint()?, Some(request))
            .map(|envelope| envelope.payload.user)
    }

    pub fn delete(&self, user_id: i64) -> Result<(), ApiError> {
        let id = user_id.to_string();
        self.rest
            .execute::<(), IgnoredAny>(&DELETE.bind(&[("id", &id)])?, None)
            .map(|_| ())
    }

    /// Start TOTP enrollment; the response carries the QR code to scan.
    pub fn enable_totp(&self, user_id: i64) -> Result<TotpEnableResponse, ApiError> {
        let id = user_id.to_string();
        self.rest
            .execute(&ENABLE_TOTP.bind(&[("id", &id)])?, None::<&()>)
            .map(|envelope| envelope.payload)
    }

    /// Finish TOTP enrollment with a code from the authenticator app.
    pub fn confirm_totp(&self, user_id: i64, code: &str) -> Result<TotpEnableResponse, ApiError> {
        let id = user_id.to_string();
        let body = TotpConfirmRequest {
            totp_code: code.to_string(),
        };
        self.rest
            .execute(&CONFIRM_TOTP.bind(&[("id", &id)])?, Some(&body))
            .map(|envelope| envelope.payload)
    }

    /// First login step. Check `AuthResponse::is_totp_required` before
    /// using the session.
    pub fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.rest
            .execute(&LOGIN.endpoint()?, Some(request))
            .map(|envelope| envelope.payload)
    }

    pub fn login_with_totp(&self, request: &TotpLoginRequest) -> Result<AuthResponse, ApiError> {
        self.rest
            .execute(&LOGIN_TOTP.endpoint()?, Some(request))
            .map(|envelope| envelope.payload)
    }
}
