use serde_json::json;
use statbot_api::{Client, Error};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APP_ID: &str = "0f8fad5b-d9cb-469f-a165-70867728950e";

#[tokio::test]
async fn trn_profile_success() {
    let mock_server = MockServer::start().await;
    let body = json!({"data": {"platformInfo": {"platformUserHandle": "Player"}, "segments": []}});

    Mock::given(method("GET"))
        .and(path("/v2/smite2/standard/profile/steam/Player"))
        .and(header("TRN-Api-Key", APP_ID))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri());
    let profile = client
        .trn_profile(APP_ID, "smite2", "steam", "Player")
        .await
        .unwrap();
    assert_eq!(profile, body);
}

#[tokio::test]
async fn trn_profile_not_found() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"errors":[]}"#))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri());
    let err = client
        .trn_profile(APP_ID, "smite", "steam", "nobody")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 404, .. }));
}

#[tokio::test]
async fn trn_profile_malformed_json() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&mock_server)
        .await;

    let client = Client::with_base_url(&mock_server.uri());
    let err = client
        .trn_profile(APP_ID, "smite", "steam", "Player")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidJson));
}

#[tokio::test]
async fn rapidapi_sends_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/shop/featured"))
        .and(header("X-RapidAPI-Key", "secret"))
        .and(header("X-RapidAPI-Host", "rl.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [1, 2]})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let url = format!("{}/shop/featured", mock_server.uri());
    let value = client
        .rapidapi_json(&url, "secret", "rl.example.com")
        .await
        .unwrap();
    assert_eq!(value["items"], json!([1, 2]));
}

#[tokio::test]
async fn rapidapi_error_envelope_in_success_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"error": "Too many requests", "statusCode": 429})),
        )
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let err = client
        .rapidapi_json(&mock_server.uri(), "k", "h")
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(429));
}

#[tokio::test]
async fn rapidapi_empty_object_rejected() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let err = client
        .rapidapi_json(&mock_server.uri(), "k", "h")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::EmptyPayload));
}

#[tokio::test]
async fn rapidapi_non_json_body_is_wrapped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let value = client
        .rapidapi_json(&mock_server.uri(), "k", "h")
        .await
        .unwrap();
    assert_eq!(value, json!({"raw": "plain text"}));
}

#[tokio::test]
async fn rapidapi_server_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&mock_server)
        .await;

    let client = Client::new();
    let err = client
        .rapidapi_json(&mock_server.uri(), "k", "h")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
}
