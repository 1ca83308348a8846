//! End-to-end scenarios from spec §8 ("Concrete scenarios"), driven through
//! the full axum router via `tower::ServiceExt::oneshot` (no live socket).
//!
//! Fixture keys are generated at test-run time with the `rsa` crate rather
//! than checked-in PEM files, mirroring the teacher's own `rsa`+`pem`
//! dev-dependency for signing test tokens. JWKS/discovery are served by a
//! `mockito` server standing in for a real authorization server.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use mcp_gateway::metadata::ProtectedResourceMetadata;
use mcp_gateway::middleware::RequiredScopes;
use mcp_gateway::registry::{EchoTool, ResourceRegistry, StaticTextResource, ToolRegistry};
use mcp_gateway::router::build_router;
use mcp_gateway::state::{AppState, AppStateInner};
use mcp_gateway::validator::Validator;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use serde_json::{json, Value};
use tower::ServiceExt;

const TEST_AUDIENCE: &str = "https://api.example.com";
const TEST_KID: &str = "test-key-1";

struct Fixture {
    issuer: String,
    encoding_key: EncodingKey,
    _server: mockito::ServerGuard,
    _jwks_mock: mockito::Mock,
    _discovery_mock: mockito::Mock,
}

async fn build_fixture() -> Fixture {
    build_fixture_expecting_jwks_calls(1).await
}

/// `expected_jwks_calls` lets the `alg=none` scenario assert the discovery
/// and JWKS endpoints are never hit (0), while every other scenario leaves
/// the default (1) unchecked since `assert_async` is never called on it.
async fn build_fixture_expecting_jwks_calls(expected_jwks_calls: usize) -> Fixture {
    let mut rng = rand::rngs::OsRng;
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("generate rsa key");
    let public_key = rsa::RsaPublicKey::from(&private_key);

    let pem = private_key
        .to_pkcs1_pem(rsa::pkcs1::LineEnding::LF)
        .expect("encode private key pem");
    let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes()).expect("parse rsa pem");

    let n = URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be());
    let e = URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be());
    let jwk = json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": TEST_KID,
            "n": n,
            "e": e,
        }]
    });

    let mut server = mockito::Server::new_async().await;
    let issuer = server.url();

    let discovery_mock = server
        .mock("GET", "/.well-known/openid-configuration")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({ "jwks_uri": format!("{issuer}/jwks.json") }).to_string())
        .expect(expected_jwks_calls)
        .create_async()
        .await;

    let jwks_mock = server
        .mock("GET", "/jwks.json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(jwk.to_string())
        .expect(expected_jwks_calls)
        .create_async()
        .await;

    Fixture {
        issuer,
        encoding_key,
        _server: server,
        _jwks_mock: jwks_mock,
        _discovery_mock: discovery_mock,
    }
}

fn now_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs()
}

fn sign(fixture: &Fixture, claims: &Value) -> String {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KID.to_string());
    jsonwebtoken::encode(&header, claims, &fixture.encoding_key).expect("sign test jwt")
}

fn default_claims(fixture: &Fixture, exp_offset_secs: i64, scope: &str) -> Value {
    let exp = (now_secs() as i64 + exp_offset_secs).max(0) as u64;
    json!({
        "sub": "user-1",
        "iss": fixture.issuer,
        "aud": [TEST_AUDIENCE],
        "exp": exp,
        "iat": now_secs(),
        "scope": scope,
    })
}

fn build_state(fixture: &Fixture, clock_skew: Duration) -> AppState {
    let http = reqwest::Client::new();
    let jwks = mcp_gateway::jwks::JwksCache::new(http, Duration::from_secs(600));
    let validator = Validator::new(
        jwks,
        vec![fixture.issuer.clone()],
        TEST_AUDIENCE.to_string(),
        clock_skew,
    );

    let tools = ToolRegistry::new();
    tools.register(std::sync::Arc::new(EchoTool));
    let resources = ResourceRegistry::new();
    resources.register(std::sync::Arc::new(StaticTextResource::new(
        "welcome://readme",
        "hello",
    )));

    let base_url = "https://gw.example";
    let resource_metadata_url = format!("{base_url}/.well-known/oauth-protected-resource");
    let metadata = ProtectedResourceMetadata::from_config(
        base_url,
        vec![fixture.issuer.clone()],
        vec!["mcp:read".to_string()],
    );

    AppState::new(AppStateInner {
        validator,
        tools,
        resources,
        metadata,
        resource_metadata_url,
        default_scope: Some("mcp:read".to_string()),
    })
}

fn rpc_request(uri: &str, token: Option<&str>, body: Value) -> axum::http::Request<axum::body::Body> {
    let mut builder = axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(axum::body::Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// Scenario 1: initialize mirrors id and reports capabilities.
#[tokio::test]
async fn scenario_initialize_mirrors_id_and_reports_capabilities() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    let token = sign(&fixture, &default_claims(&fixture, 3600, "mcp:read"));
    let body = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client","version":"1.0.0"}}
    });
    let response = app.oneshot(rpc_request("/mcp", Some(&token), body)).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["id"], 1);
    assert!(value["result"]["capabilities"]["tools"].is_object());
    assert!(value["result"]["capabilities"]["resources"].is_object());
}

// Scenario 2: tools/call against an unknown tool.
#[tokio::test]
async fn scenario_tools_call_unknown_tool_is_tool_not_found() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    let token = sign(&fixture, &default_claims(&fixture, 3600, "mcp:read"));
    let body = json!({"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nonexistent","arguments":{}}});
    let response = app.oneshot(rpc_request("/mcp", Some(&token), body)).await.unwrap();
    let value = body_json(response).await;
    assert_eq!(value["error"]["code"], -32003);
}

// Scenario 3: tools/call missing name.
#[tokio::test]
async fn scenario_tools_call_missing_name_is_invalid_params() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    let token = sign(&fixture, &default_claims(&fixture, 3600, "mcp:read"));
    let body = json!({"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"arguments":{}}});
    let response = app.oneshot(rpc_request("/mcp", Some(&token), body)).await.unwrap();
    let value = body_json(response).await;
    assert_eq!(value["error"]["code"], -32602);
}

// Scenario 4: resources/read with empty and unknown uri.
#[tokio::test]
async fn scenario_resources_read_empty_and_unknown_uri() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);
    let token = sign(&fixture, &default_claims(&fixture, 3600, "mcp:read"));

    let empty_body = json!({"jsonrpc":"2.0","id":4,"method":"resources/read","params":{"uri":""}});
    let response = app
        .clone()
        .oneshot(rpc_request("/mcp", Some(&token), empty_body))
        .await
        .unwrap();
    let value = body_json(response).await;
    assert_eq!(value["error"]["code"], -32602);

    let unknown_body = json!({"jsonrpc":"2.0","id":5,"method":"resources/read","params":{"uri":"x://nope"}});
    let response = app.oneshot(rpc_request("/mcp", Some(&token), unknown_body)).await.unwrap();
    let value = body_json(response).await;
    assert_eq!(value["error"]["code"], -32002);
}

// Scenario 5: missing Authorization header yields 401 with a bearer challenge.
#[tokio::test]
async fn scenario_missing_authorization_header_is_401_with_challenge() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    let body = json!({"jsonrpc":"2.0","id":6,"method":"tools/list"});
    let response = app.oneshot(rpc_request("/mcp", None, body)).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
    let header = response
        .headers()
        .get(axum::http::header::WWW_AUTHENTICATE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(header.starts_with("Bearer"));
    assert!(header.contains("resource_metadata="));
}

// Scenario 6: audience match succeeds, mismatch fails with InvalidAudience (401).
#[tokio::test]
async fn scenario_audience_mismatch_is_rejected() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    let good_token = sign(&fixture, &default_claims(&fixture, 3600, "mcp:read"));
    let body = json!({"jsonrpc":"2.0","id":7,"method":"tools/list"});
    let response = app
        .clone()
        .oneshot(rpc_request("/mcp", Some(&good_token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);

    let mut bad_claims = default_claims(&fixture, 3600, "mcp:read");
    bad_claims["aud"] = json!(["https://other.example"]);
    let bad_token = sign(&fixture, &bad_claims);
    let body = json!({"jsonrpc":"2.0","id":8,"method":"tools/list"});
    let response = app.oneshot(rpc_request("/mcp", Some(&bad_token), body)).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);
}

// Scenario 7: expired token rejected; token within clock skew accepted.
#[tokio::test]
async fn scenario_expired_token_rejected_within_skew_accepted() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(5));
    let app = build_router(state);

    let expired_token = sign(&fixture, &default_claims(&fixture, -3600, "mcp:read"));
    let body = json!({"jsonrpc":"2.0","id":9,"method":"tools/list"});
    let response = app
        .clone()
        .oneshot(rpc_request("/mcp", Some(&expired_token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);

    let within_skew_token = sign(&fixture, &default_claims(&fixture, -1, "mcp:read"));
    let body = json!({"jsonrpc":"2.0","id":10,"method":"tools/list"});
    let response = app
        .oneshot(rpc_request("/mcp", Some(&within_skew_token), body))
        .await
        .unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
}

// Scenario 8: alg=none is rejected before any JWKS/discovery fetch.
#[tokio::test]
async fn scenario_alg_none_rejected_before_any_key_lookup() {
    let fixture = build_fixture_expecting_jwks_calls(0).await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    // jsonwebtoken::encode refuses to encode with Algorithm::None, so the
    // unsigned token is built by hand: header.payload. with an empty
    // signature segment, exactly what an alg=none JWT looks like on the wire.
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","kid":"test-key-1"}"#);
    let claims = default_claims(&fixture, 3600, "mcp:read");
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    let token = format!("{header}.{payload}.");

    let body = json!({"jsonrpc":"2.0","id":11,"method":"tools/list"});
    let response = app.oneshot(rpc_request("/mcp", Some(&token), body)).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::UNAUTHORIZED);

    // The algorithm whitelist check happens before any key material is
    // fetched; the mocked discovery/jwks endpoints must never be hit.
    fixture._discovery_mock.assert_async().await;
    fixture._jwks_mock.assert_async().await;
}

// Scenario 9: insufficient scope yields 403 with the required scope named.
#[tokio::test]
async fn scenario_insufficient_scope_is_403_with_required_scope_in_challenge() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));

    // Mount a route that requires `mcp:admin`, mirroring how a real
    // deployment would scope an administrative tool route differently from
    // the default `/mcp` mount (which requires no scopes in this sample app).
    let admin_app = axum::Router::new()
        .route("/admin", axum::routing::get(|| async { "ok" }))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mcp_gateway::middleware::require_scopes,
        ))
        .layer(axum::Extension(RequiredScopes(vec!["mcp:admin"])))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            mcp_gateway::middleware::authenticate,
        ))
        .with_state(state);

    let token = sign(&fixture, &default_claims(&fixture, 3600, "mcp:read mcp:write"));
    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/admin")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = admin_app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), axum::http::StatusCode::FORBIDDEN);
    let header = response
        .headers()
        .get(axum::http::header::WWW_AUTHENTICATE)
        .unwrap()
        .to_str()
        .unwrap();
    assert!(header.contains(r#"error="insufficient_scope""#));
    assert!(header.contains(r#"scope="mcp:admin""#));
}

// Nil / unparseable JSON-RPC body still yields HTTP 200 with -32600.
#[tokio::test]
async fn unparseable_body_yields_200_with_invalid_request_and_no_id() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    let token = sign(&fixture, &default_claims(&fixture, 3600, "mcp:read"));
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/mcp")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {token}"))
        .body(axum::body::Body::from("not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["error"]["code"], -32600);
    assert!(value.as_object().unwrap().get("id").is_none());
}

// The protected-resource metadata endpoint is unauthenticated.
#[tokio::test]
async fn protected_resource_metadata_is_served_without_auth() {
    let fixture = build_fixture().await;
    let state = build_state(&fixture, Duration::from_secs(60));
    let app = build_router(state);

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/.well-known/oauth-protected-resource")
        .body(axum::body::Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    let value = body_json(response).await;
    assert_eq!(value["resource"], "https://gw.example");
    assert_eq!(value["authorization_servers"][0], fixture.issuer);
}
