//! Domain DTOs for the lembaas API.
//!
//! # Design
//! Response types derive `Default` and use `#[serde(default)]`: the backend
//! omits fields freely, and error bodies such as `{"error": "..."}` must
//! still decode so the error text can be classified. A field present with the
//! wrong type still fails. Embedded error fields are not modelled here; the
//! route's `ErrorExtractor` reads them from the raw body.
//!
//! These types are defined independently from the mock-server crate;
//! integration tests catch schema drift.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// App
// ---------------------------------------------------------------------------

/// Client-credentials exchange sent to `POST /token`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenRequest {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TokenResponse {
    pub token: String,
    /// Lifetime in seconds.
    pub expires_in: i64,
    pub token_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppInfo {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub client_id: String,
    pub icon_url: String,
    pub created_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// A custom key/value setting stored for the app.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigValue {
    pub config_key: String,
    pub config_value: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetConfigValue {
    pub config_key: String,
    pub config_value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigValueList {
    pub count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub config_values: Vec<ConfigValue>,
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Role {
    pub id: i64,
    pub app_id: i64,
    pub name: String,
    pub description: String,
    pub permissions: String,
    pub is_default: bool,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoleList {
    pub count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRole {
    pub name: String,
    pub description: String,
    pub permissions: String,
    pub is_default: bool,
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user within one app.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub app_id: i64,
    pub email: String,
    pub role_id: i64,
    pub is_active: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UserList {
    pub count: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub users: Vec<User>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegisterUser {
    pub email: String,
    pub password: String,
    pub role_id: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateUser {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub role_id: i64,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Second login step, trading the login code from the first step plus a
/// TOTP code for a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotpLoginRequest {
    pub login_code: String,
    pub totp_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TotpConfirmRequest {
    pub totp_code: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TotpEnableResponse {
    /// PNG bytes of the enrollment QR code, base64 on the wire.
    #[serde(with = "base64_bytes")]
    pub qr_code: Vec<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthResponse {
    pub session_token: String,
    pub user_id: i64,
    pub email: String,
    pub role_id: i64,
    pub expires_at: Option<DateTime<Utc>>,
    pub expires_in: i64,
    /// Set instead of a session when the user has TOTP enabled.
    pub login_code: String,
    pub login_code_valid_until: Option<DateTime<Utc>>,
}

impl AuthResponse {
    /// The login produced a usable session.
    pub fn is_valid_login(&self) -> bool {
        self.user_id > 0
            && (self.expires_in > 0 || is_set(&self.expires_at))
            && !self.session_token.is_empty()
    }

    /// The login stopped at the second factor; call `login_with_totp` with
    /// `login_code`.
    pub fn is_totp_required(&self) -> bool {
        !self.login_code.is_empty() && is_set(&self.login_code_valid_until)
    }
}

// The backend sends 0001-01-01T00:00:00Z for unset timestamps.
fn is_set(timestamp: &Option<DateTime<Utc>>) -> bool {
    timestamp.is_some_and(|t| t.year() > 1)
}

// Empty lists arrive as `null` rather than `[]`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(encoded) => STANDARD.decode(encoded.as_bytes()).map_err(de::Error::custom),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn token_response_decodes_wire_names() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"token":"T","expires_in":3600,"token_type":"Bearer"}"#).unwrap();
        assert_eq!(token.token, "T");
        assert_eq!(token.expires_in, 3600);
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn user_response_tolerates_error_only_body() {
        let response: UserResponse = serde_json::from_str(r#"{"error":"user not found"}"#).unwrap();
        assert_eq!(response.user, User::default());
    }

    #[test]
    fn user_decodes_timestamps() {
        let response: UserResponse = serde_json::from_str(
            r#"{"user":{"id":7,"app_id":1,"email":"a@b.c","role_id":2,"is_active":true,
                "created_at":"2024-05-01T10:00:00Z","updated_at":"2024-05-02T10:00:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(response.user.id, 7);
        assert_eq!(
            response.user.created_at,
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn null_lists_decode_as_empty() {
        let roles: RoleList = serde_json::from_str(r#"{"count":0,"roles":null}"#).unwrap();
        assert!(roles.roles.is_empty());
        let users: UserList = serde_json::from_str(r#"{"count":0,"users":null}"#).unwrap();
        assert!(users.users.is_empty());
        let configs: ConfigValueList = serde_json::from_str(r#"{"count":0,"config_values":null}"#).unwrap();
        assert!(configs.config_values.is_empty());

        let missing: RoleList = serde_json::from_str(r#"{"count":0}"#).unwrap();
        assert!(missing.roles.is_empty());
        assert!(serde_json::from_str::<RoleList>(r#"{"roles":"none"}"#).is_err());
    }

    #[test]
    fn wrong_typed_field_fails() {
        let result: Result<RoleList, _> = serde_json::from_str(r#"{"count":"three"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn qr_code_travels_as_base64() {
        let response = TotpEnableResponse {
            qr_code: b"\x89PNG".to_vec(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["qr_code"], "iVBORw==");

        let back: TotpEnableResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back.qr_code, b"\x89PNG");

        let empty: TotpEnableResponse = serde_json::from_str(r#"{"qr_code":null}"#).unwrap();
        assert!(empty.qr_code.is_empty());
    }

    #[test]
    fn valid_login_needs_session_and_expiry() {
        let mut auth = AuthResponse {
            session_token: "s".to_string(),
            user_id: 3,
            expires_in: 3600,
            ..Default::default()
        };
        assert!(auth.is_valid_login());

        auth.expires_in = 0;
        assert!(!auth.is_valid_login());

        auth.expires_at = Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap());
        assert!(auth.is_valid_login());

        auth.session_token.clear();
        assert!(!auth.is_valid_login());
    }

    #[test]
    fn zero_timestamp_counts_as_unset() {
        let auth: AuthResponse = serde_json::from_str(
            r#"{"session_token":"s","user_id":1,"expires_in":0,
                "expires_at":"0001-01-01T00:00:00Z","login_code":"lc",
                "login_code_valid_until":"0001-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(!auth.is_valid_login());
        assert!(!auth.is_totp_required());
    }

    #[test]
    fn totp_required_needs_code_and_validity() {
        let auth = AuthResponse {
            login_code: "abc".to_string(),
            login_code_valid_until: Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap()),
            ..Default::default()
        };
        assert!(auth.is_totp_required());
        assert!(!auth.is_valid_login());
    }
}
