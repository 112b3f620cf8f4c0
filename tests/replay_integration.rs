//! End-to-end replay scenarios against a mocked API

use apiscout::capture::CapturedRequest;
use apiscout::http::{ReplayClient, ReplayClientConfig};
use apiscout::pagination::{CursorParameter, NumberParameter, PaginationInfo};
use apiscout::source::{RequestDetail, ResponseDetail, Source};
use apiscout::types::{Method, RequestType, ValueMap};
use serde_json::json;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client() -> ReplayClient {
    ReplayClient::with_config(ReplayClientConfig {
        max_retries: 0,
        rate_limit: None,
        ..Default::default()
    })
}

fn limit_offset_source(server_uri: &str, default_entity_count: usize) -> Source {
    let request = CapturedRequest::new(
        Method::GET,
        format!("{server_uri}/items"),
        RequestType::Ajax,
    )
    .with_query("offset", "0")
    .with_query("limit", "2");

    let info = PaginationInfo::new(
        None,
        None,
        Some(NumberParameter::new("limit", 2)),
        Some(NumberParameter::new("offset", 0)),
    )
    .unwrap();

    Source::new(
        "https://site.test/items",
        "items",
        RequestDetail {
            request,
            pagination: Some(info),
            dynamic_parameters: ValueMap::new(),
            parameter_code: None,
        },
        ResponseDetail {
            preprocessor: None,
            extraction_code: None,
            default_entity_count,
        },
    )
}

// ============================================================================
// Limit / Offset
// ============================================================================

#[tokio::test]
async fn test_end_to_end_limit_offset_window() {
    // Spec scenario: limit=3, offset=1 over batches [{1,A},{2,B}],
    // [{3,C},{4,D}], [] yields {2,B},{3,C},{4,D}.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id":1,"name":"A"},{"id":2,"name":"B"}]"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[{"id":3,"name":"C"},{"id":4,"name":"D"}]"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let source = limit_offset_source(&server.uri(), 2);
    let client = test_client();

    let records = source
        .generate_data(&client, 3, 1, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();

    assert_eq!(
        records,
        vec![
            json!({"id":2,"name":"B"}),
            json!({"id":3,"name":"C"}),
            json!({"id":4,"name":"D"}),
        ]
    );
}

#[tokio::test]
async fn test_limit_offset_empty_first_page_stops() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;

    let source = limit_offset_source(&server.uri(), 2);
    let client = test_client();

    let records = source
        .generate_data(&client, 5, 0, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_400_fallback_is_one_shot() {
    // First request (limit=20) is rejected; the retry with the observed
    // page size succeeds. A later 400 must propagate, with the batches
    // already yielded remaining valid.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("limit", "20"))
        .respond_with(ResponseTemplate::new(400).set_body_string("limit too large"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":1},{"id":2}]"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "2"))
        .respond_with(ResponseTemplate::new(400).set_body_string("nope"))
        .expect(1)
        .mount(&server)
        .await;

    let source = limit_offset_source(&server.uri(), 2);
    let client = test_client();

    let mut stream = source.generate_data(&client, 20, 0, ValueMap::new()).unwrap();

    let first = stream.next_batch().await.unwrap().unwrap();
    assert_eq!(first, vec![json!({"id":1}), json!({"id":2})]);

    // The second 400 is not eligible for fallback.
    let err = stream.next_batch().await.unwrap().unwrap_err();
    assert!(err.is_parameter_rejected());

    // The stream is finished after the error.
    assert!(stream.next_batch().await.is_none());
}

// ============================================================================
// Page / Limit
// ============================================================================

fn page_limit_source(server_uri: &str) -> Source {
    let request = CapturedRequest::new(
        Method::GET,
        format!("{server_uri}/paged"),
        RequestType::Ajax,
    )
    .with_query("page", "1")
    .with_query("size", "2");

    let info = PaginationInfo::new(
        Some(NumberParameter::new("page", 1)),
        None,
        Some(NumberParameter::new("size", 2)),
        None,
    )
    .unwrap();

    Source::new(
        "https://site.test/paged",
        "paged items",
        RequestDetail {
            request,
            pagination: Some(info),
            dynamic_parameters: ValueMap::new(),
            parameter_code: None,
        },
        ResponseDetail {
            preprocessor: None,
            extraction_code: None,
            default_entity_count: 2,
        },
    )
}

#[tokio::test]
async fn test_page_limit_detects_base_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":1},{"id":2}]"#))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":3},{"id":4}]"#))
        .mount(&server)
        .await;

    let source = page_limit_source(&server.uri());
    let client = test_client();

    let records = source
        .generate_data(&client, 4, 0, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![json!({"id":1}), json!({"id":2}), json!({"id":3}), json!({"id":4})]
    );
}

#[tokio::test]
async fn test_page_limit_zero_one_collision_advances() {
    // The API clamps page 0 to its first page, so base detection sees
    // data at page 0 and pages 0/1 come back identical. The identical
    // body at page 1 must advance the counter, not terminate.
    let server = MockServer::start().await;
    let first_page = r#"[{"id":1},{"id":2}]"#;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(first_page))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":3},{"id":4}]"#))
        .mount(&server)
        .await;

    let source = page_limit_source(&server.uri());
    let client = test_client();

    let records = source
        .generate_data(&client, 4, 0, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(
        records,
        vec![json!({"id":1}), json!({"id":2}), json!({"id":3}), json!({"id":4})]
    );
}

#[tokio::test]
async fn test_page_limit_identical_bodies_terminate() {
    let server = MockServer::start().await;
    let only_page = r#"[{"id":1},{"id":2}]"#;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .respond_with(ResponseTemplate::new(200).set_body_string(only_page))
        .mount(&server)
        .await;

    let source = page_limit_source(&server.uri());
    let client = test_client();

    // Every page returns the same body. The probe's data is yielded
    // once; the identical page 1 gets the collision allowance, and the
    // identical page 2 terminates generation.
    let records = source
        .generate_data(&client, 10, 0, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"id":1}), json!({"id":2})]);
}

#[tokio::test]
async fn test_page_limit_starts_at_window_page() {
    // offset=4 with page size 2 starts two pages in; items 0..4 are
    // never fetched.
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/paged"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":5},{"id":6}]"#))
        .expect(1)
        .mount(&server)
        .await;

    let source = page_limit_source(&server.uri());
    let client = test_client();

    let records = source
        .generate_data(&client, 2, 4, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"id":5}), json!({"id":6})]);
}

// ============================================================================
// Cursor
// ============================================================================

fn cursor_source(server_uri: &str) -> Source {
    // Pattern map built from a sample first-page body, the way analysis
    // would have done it.
    let sample = r#"{"items":[{"id":1},{"id":2}],"next":"cursorAAAA0001"}"#.to_string();
    let cursor = CursorParameter::build("cursor", "cursorAAAA0001", &[sample]).unwrap();

    let request = CapturedRequest::new(
        Method::GET,
        format!("{server_uri}/feed"),
        RequestType::Ajax,
    )
    .with_query("cursor", "cursorAAAA0001");

    let info = PaginationInfo::new(None, Some(cursor), None, None).unwrap();

    Source::new(
        "https://site.test/feed",
        "feed",
        RequestDetail {
            request,
            pagination: Some(info),
            dynamic_parameters: ValueMap::new(),
            parameter_code: None,
        },
        ResponseDetail {
            preprocessor: None,
            extraction_code: Some(
                "function extract(text) { return JSON.parse(text).items; }".to_string(),
            ),
            default_entity_count: 2,
        },
    )
}

#[tokio::test]
async fn test_cursor_chain_follows_extracted_tokens() {
    let server = MockServer::start().await;
    // Implicit first page: the omitted-cursor probe succeeds.
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"items":[{"id":1},{"id":2}],"next":"cursorBBBB0002"}"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("cursor", "cursorBBBB0002"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"items":[{"id":3},{"id":4}],"next":null}"#,
        ))
        .mount(&server)
        .await;

    let source = cursor_source(&server.uri());
    let client = test_client();

    // Cursor chains cannot jump: the tracker discards up to the offset.
    let records = source
        .generate_data(&client, 2, 1, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"id":2}), json!({"id":3})]);
}

#[tokio::test]
async fn test_cursor_cycle_terminates() {
    let server = MockServer::start().await;
    // Every page points at the same next cursor: after following it
    // once, the repeat must end generation.
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"items":[{"id":1},{"id":2}],"next":"cursorBBBB0002"}"#,
        ))
        .mount(&server)
        .await;

    let source = cursor_source(&server.uri());
    let client = test_client();

    let records = source
        .generate_data(&client, 100, 0, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    // First page plus one follow of cursorBBBB0002, then cycle.
    assert_eq!(records.len(), 4);
}

#[tokio::test]
async fn test_cursor_speculative_start_falls_back_to_default() {
    let server = MockServer::start().await;
    // No implicit first page: both speculative starts (omitted cursor,
    // nulled cursor) are rejected; the captured default works.
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(422).set_body_string("cursor required"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("cursor", "null"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad cursor"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("cursor", "cursorAAAA0001"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"items":[{"id":1},{"id":2}],"next":null}"#,
        ))
        .mount(&server)
        .await;
    // Any other cursor value (least-specific delimiter patterns can
    // bracket junk) serves an empty page, ending the chain.
    Mock::given(method("GET"))
        .and(path("/feed"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"items":[],"next":null}"#),
        )
        .mount(&server)
        .await;

    let source = cursor_source(&server.uri());
    let client = test_client();

    let records = source
        .generate_data(&client, 10, 0, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"id":1}), json!({"id":2})]);
}

// ============================================================================
// Single Page
// ============================================================================

#[tokio::test]
async fn test_single_page_source_fetches_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/once"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[{"id":1},{"id":2},{"id":3}]"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let request = CapturedRequest::new(
        Method::GET,
        format!("{}/once", server.uri()),
        RequestType::Ajax,
    );
    let source = Source::new(
        "https://site.test/once",
        "one shot",
        RequestDetail::new(request),
        ResponseDetail::empty(),
    );
    let client = test_client();

    let records = source
        .generate_data(&client, 2, 1, ValueMap::new())
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"id":2}), json!({"id":3})]);
}

// ============================================================================
// Dynamic Parameters
// ============================================================================

#[tokio::test]
async fn test_dynamic_parameter_override_reaches_wire() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/items"))
        .and(query_param("sort", "oldest"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"id":1}]"#))
        .expect(1)
        .mount(&server)
        .await;

    let request = CapturedRequest::new(
        Method::GET,
        format!("{}/items", server.uri()),
        RequestType::Ajax,
    )
    .with_query("sort", "newest");

    let mut dynamic = ValueMap::new();
    dynamic.insert("sort".to_string(), json!("newest"));

    let source = Source::new(
        "https://site.test/items",
        "items",
        RequestDetail {
            request,
            pagination: None,
            dynamic_parameters: dynamic,
            parameter_code: None,
        },
        ResponseDetail::empty(),
    );
    let client = test_client();

    let mut overrides = ValueMap::new();
    overrides.insert("sort".to_string(), json!("oldest"));

    let records = source
        .generate_data(&client, 10, 0, overrides)
        .unwrap()
        .collect()
        .await
        .unwrap();
    assert_eq!(records, vec![json!({"id":1})]);
}
