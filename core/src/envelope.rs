//! Decoded responses and embedded error extraction.
//!
//! The backend has reported failures in several shapes over time: a flat
//! `error` string, a flat `message` string, and a nested
//! `{"Error": {"code": .., "message": ..}}` object. An `ErrorExtractor` names
//! the one field path a route uses, so decoding stays in one place.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// A successfully classified response.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope<T> {
    pub payload: T,
    /// Error text found in the body. Always `None` when the route fails on
    /// embedded errors, since such a response never becomes an envelope.
    pub error_message: Option<String>,
    pub status: u16,
}

impl<T> Envelope<T> {
    pub fn into_payload(self) -> T {
        self.payload
    }
}

/// Field path locating error text inside a JSON response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorExtractor {
    path: &'static [&'static str],
}

impl ErrorExtractor {
    /// `{"error": "..."}`
    pub const ERROR: Self = Self::at(&["error"]);
    /// `{"message": "..."}`
    pub const MESSAGE: Self = Self::at(&["message"]);
    /// `{"Error": {"message": "..."}}`
    pub const NESTED: Self = Self::at(&["Error", "message"]);
    /// Never reports embedded error text.
    pub const NONE: Self = Self::at(&[]);

    pub const fn at(path: &'static [&'static str]) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &'static [&'static str] {
        self.path
    }

    /// Pull the error text out of `body`.
    ///
    /// A missing or null field, or an empty string, means "no error". Any
    /// other non-string value is a decode failure.
    pub fn extract(&self, body: &Value) -> Result<Option<String>, ApiError> {
        let Some((last, parents)) = self.path.split_last() else {
            return Ok(None);
        };

        let mut current = body;
        for segment in parents {
            match current.get(segment) {
                None | Some(Value::Null) => return Ok(None),
                Some(next @ Value::Object(_)) => current = next,
                Some(_) => return Err(self.wrong_type()),
            }
        }

        match current.get(last) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(text)) if text.trim().is_empty() => Ok(None),
            Some(Value::String(text)) => Ok(Some(text.clone())),
            Some(_) => Err(self.wrong_type()),
        }
    }

    fn wrong_type(&self) -> ApiError {
        ApiError::Decode(format!("error field `{}` is not a string", self.path.join(".")))
    }
}

impl Default for ErrorExtractor {
    fn default() -> Self {
        Self::ERROR
    }
}

/// Result of decoding a raw body before any status checks.
#[derive(Debug)]
pub(crate) struct Decoded<T> {
    /// `None` when the body was empty and decoding was skipped.
    pub payload: Option<T>,
    pub error_message: Option<String>,
}

/// Decode `body` into `T` and extract its embedded error text.
///
/// Empty bodies are not decoded at all. Missing fields are left to `T`'s
/// serde defaults; a present field of the wrong type fails.
pub(crate) fn decode_body<T: DeserializeOwned>(
    body: &str,
    extractor: &ErrorExtractor,
) -> Result<Decoded<T>, ApiError> {
    if body.trim().is_empty() {
        return Ok(Decoded {
            payload: None,
            error_message: None,
        });
    }

    let value: Value = serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    let error_message = extractor.extract(&value)?;
    let payload = serde_json::from_value(value).map_err(|e| ApiError::Decode(e.to_string()))?;

    Ok(Decoded {
        payload: Some(payload),
        error_message,
    })
}

/// Produce a payload for a response that had no body.
///
/// Works for `()` and other types that deserialize from `null`.
pub(crate) fn empty_payload<T: DeserializeOwned>() -> Result<T, ApiError> {
    serde_json::from_value(Value::Null)
        .map_err(|_| ApiError::Decode("empty response body".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Named {
        name: String,
        count: i64,
    }

    #[test]
    fn extracts_flat_error_field() {
        let body = json!({"error": "invalid token"});
        assert_eq!(
            ErrorExtractor::ERROR.extract(&body).unwrap(),
            Some("invalid token".to_string())
        );
        assert_eq!(ErrorExtractor::MESSAGE.extract(&body).unwrap(), None);
    }

    #[test]
    fn extracts_nested_error_message() {
        let body = json!({"Error": {"code": 17, "message": "quota exceeded"}});
        assert_eq!(
            ErrorExtractor::NESTED.extract(&body).unwrap(),
            Some("quota exceeded".to_string())
        );
    }

    #[test]
    fn null_and_empty_fields_mean_no_error() {
        assert_eq!(ErrorExtractor::ERROR.extract(&json!({"error": null})).unwrap(), None);
        assert_eq!(ErrorExtractor::ERROR.extract(&json!({"error": ""})).unwrap(), None);
        assert_eq!(ErrorExtractor::NESTED.extract(&json!({"Error": null})).unwrap(), None);
        assert_eq!(ErrorExtractor::NONE.extract(&json!({"error": "x"})).unwrap(), None);
    }

    #[test]
    fn non_string_error_field_is_a_decode_error() {
        let err = ErrorExtractor::ERROR.extract(&json!({"error": 42})).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        let err = ErrorExtractor::NESTED.extract(&json!({"Error": "flat"})).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn decode_body_defaults_missing_fields() {
        let decoded: Decoded<Named> = decode_body(r#"{"name":"x"}"#, &ErrorExtractor::ERROR).unwrap();
        assert_eq!(
            decoded.payload,
            Some(Named {
                name: "x".to_string(),
                count: 0
            })
        );
        assert!(decoded.error_message.is_none());
    }

    #[test]
    fn decode_body_rejects_wrong_field_type() {
        let err = decode_body::<Named>(r#"{"count":"many"}"#, &ErrorExtractor::ERROR).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn decode_body_skips_empty_bodies() {
        let decoded: Decoded<Named> = decode_body("  \n", &ErrorExtractor::ERROR).unwrap();
        assert!(decoded.payload.is_none());
        assert!(decoded.error_message.is_none());
    }

    #[test]
    fn empty_payload_only_fits_unit_like_types() {
        assert!(empty_payload::<()>().is_ok());
        assert!(matches!(empty_payload::<Named>(), Err(ApiError::Decode(_))));
    }
}
