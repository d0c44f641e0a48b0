//! Declarative endpoint descriptors.
//!
//! A `Route` is a `const` describing one REST endpoint: method, path
//! template, accepted status codes, auth requirement and error-field policy.
//! Resource clients bind a route's `{placeholders}` to get an `Endpoint`
//! and pass it to `RestClient::execute`.

use crate::envelope::ErrorExtractor;
use crate::error::ApiError;
use crate::http::HttpMethod;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub method: HttpMethod,
    /// Path relative to the API root, with `{name}` placeholders.
    pub path: &'static str,
    /// Accepted status codes. The first one is reported as `expected` when a
    /// response does not match.
    pub expected: &'static [u16],
    pub requires_auth: bool,
    /// Report 404 as `ApiError::NotFound` rather than `UnexpectedStatus`.
    pub not_found_on_404: bool,
    pub error_field: ErrorExtractor,
    /// Fail with `ApiError::Api` when the error field is non-empty.
    pub check_error_field: bool,
}

impl Route {
    const fn new(method: HttpMethod, path: &'static str, expected: &'static [u16]) -> Self {
        Self {
            method,
            path,
            expected,
            requires_auth: true,
            not_found_on_404: false,
            error_field: ErrorExtractor::ERROR,
            check_error_field: true,
        }
    }

    /// Authenticated GET expecting 200.
    pub const fn get(path: &'static str) -> Self {
        Self::new(HttpMethod::Get, path, &[200])
    }

    /// Authenticated POST expecting 200.
    pub const fn post(path: &'static str) -> Self {
        Self::new(HttpMethod::Post, path, &[200])
    }

    /// Authenticated DELETE expecting 204.
    pub const fn delete(path: &'static str) -> Self {
        Self::new(HttpMethod::Delete, path, &[204])
    }

    pub const fn expect(mut self, codes: &'static [u16]) -> Self {
        self.expected = codes;
        self
    }

    pub const fn anonymous(mut self) -> Self {
        self.requires_auth = false;
        self
    }

    pub const fn lookup(mut self) -> Self {
        self.not_found_on_404 = true;
        self
    }

    pub const fn error_field(mut self, extractor: ErrorExtractor) -> Self {
        self.error_field = extractor;
        self
    }

    pub const fn skip_error_check(mut self) -> Self {
        self.check_error_field = false;
        self
    }

    pub fn primary_status(&self) -> u16 {
        self.expected.first().copied().unwrap_or(200)
    }

    pub fn accepts(&self, status: u16) -> bool {
        self.expected.contains(&status)
    }

    /// Endpoint for a route without placeholders.
    pub fn endpoint(&self) -> Result<Endpoint, ApiError> {
        self.bind(&[])
    }

    /// Substitute every `{name}` in the path template with the path-escaped
    /// value from `params`.
    pub fn bind(&self, params: &[(&str, &str)]) -> Result<Endpoint, ApiError> {
        let mut path = String::with_capacity(self.path.len());
        let mut rest = self.path;

        while let Some(open) = rest.find('{') {
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| ApiError::Config(format!("unterminated placeholder in {}", self.path)))?;
            let name = &rest[open + 1..close];
            let value = params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
                .ok_or_else(|| {
                    ApiError::Config(format!("missing path parameter `{name}` for {}", self.path))
                })?;
            if value.is_empty() {
                return Err(ApiError::Config(format!("empty path parameter `{name}` for {}", self.path)));
            }
            path.push_str(&rest[..open]);
            path.push_str(&urlencoding::encode(value));
            rest = &rest[close + 1..];
        }
        path.push_str(rest);

        Ok(Endpoint { route: *self, path })
    }
}

/// A route with its placeholders filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub route: Route,
    pub path: String,
}
