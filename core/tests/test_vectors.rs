//! Verify response classification against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each case names a route profile and an error-field convention, gives a
//! simulated response, and states the expected outcome. Payloads are
//! compared as parsed JSON to avoid false negatives from field ordering.

use lembaas_core::{
    ApiError, ClientConfig, Envelope, ErrorExtractor, HttpRequest, HttpResponse, RestClient, RoleList, Route,
    Transport, TransportError,
};
use serde_json::Value;

struct Offline;

impl Transport for Offline {
    fn send(&self, _: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Err(TransportError::Connection("offline".to_string()))
    }
}

fn client() -> RestClient<Offline> {
    RestClient::with_transport(
        ClientConfig::new("http://localhost:3000", 1).with_auth_token("tok"),
        Offline,
    )
    .unwrap()
}

/// Map a profile name from the vectors to a route.
fn route(profile: &str) -> Route {
    match profile {
        "read" => Route::get("/things"),
        "lookup" => Route::get("/things/{id}/get").lookup(),
        "create" => Route::post("/things/create").expect(&[201]),
        "delete" => Route::delete("/things/{id}/delete"),
        "role_delete" => Route::delete("/things/{id}/delete").expect(&[204, 200]),
        "lenient" => Route::get("/things").skip_error_check(),
        other => panic!("unknown route profile: {other}"),
    }
}

fn extractor(name: &str) -> ErrorExtractor {
    match name {
        "error" => ErrorExtractor::ERROR,
        "message" => ErrorExtractor::MESSAGE,
        "nested" => ErrorExtractor::NESTED,
        "none" => ErrorExtractor::NONE,
        other => panic!("unknown extractor: {other}"),
    }
}

fn opt_str(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/responses.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let c = client();
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let route = route(case["route"].as_str().unwrap()).error_field(extractor(case["extractor"].as_str().unwrap()));
        let endpoint = route.bind(&[("id", "1")]).unwrap();

        let sim = &case["response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );
        let result: Result<Envelope<Value>, ApiError> = c.parse_response(&endpoint, response.clone());

        // Some cases must also decode into a concrete list type.
        match case["decode_as"].as_str() {
            Some("role_list") => {
                let typed: Result<Envelope<RoleList>, ApiError> = c.parse_response(&endpoint, response);
                let typed = typed.unwrap_or_else(|e| panic!("{name}: typed decode failed: {e:?}"));
                let want = case["expected"]["payload"]["roles"].as_array().map_or(0, Vec::len);
                assert_eq!(typed.payload.roles.len(), want, "{name}: roles");
            }
            Some(other) => panic!("{name}: unknown decode_as {other}"),
            None => {}
        }

        let expected = &case["expected"];
        match expected["outcome"].as_str().unwrap() {
            "ok" => {
                let envelope = result.unwrap_or_else(|e| panic!("{name}: expected success, got {e:?}"));
                assert_eq!(envelope.payload, expected["payload"], "{name}: payload");
                assert_eq!(
                    envelope.error_message,
                    opt_str(&expected["error_message"]),
                    "{name}: error_message"
                );
            }
            "api" => match result {
                Err(ApiError::Api { message }) => {
                    assert_eq!(message, expected["message"].as_str().unwrap(), "{name}: message")
                }
                other => panic!("{name}: expected api error, got {other:?}"),
            },
            "not_found" => match result {
                Err(ApiError::NotFound { body_error }) => {
                    assert_eq!(body_error, opt_str(&expected["body_error"]), "{name}: body_error")
                }
                other => panic!("{name}: expected not found, got {other:?}"),
            },
            "unexpected_status" => match result {
                Err(ApiError::UnexpectedStatus {
                    expected: want,
                    actual,
                    body_error,
                }) => {
                    assert_eq!(want as u64, expected["expected"].as_u64().unwrap(), "{name}: expected");
                    assert_eq!(actual as u64, expected["actual"].as_u64().unwrap(), "{name}: actual");
                    assert_eq!(body_error, opt_str(&expected["body_error"]), "{name}: body_error");
                }
                other => panic!("{name}: expected unexpected status, got {other:?}"),
            },
            "decode" => assert!(
                matches!(result, Err(ApiError::Decode(_))),
                "{name}: expected decode error, got {result:?}"
            ),
            other => panic!("{name}: unknown outcome {other}"),
        }
    }
}
