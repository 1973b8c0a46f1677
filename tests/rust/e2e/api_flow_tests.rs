//! End-to-end tests for the HTTP surface
//!
//! Routing, extractors, error mapping and response shapes, exercised
//! through the assembled router without binding a port.

#[cfg(test)]
mod api_flow_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use pglens::catalog::type_map::{OID_INT8, OID_NUMERIC, OID_TEXT, OID_TIMESTAMPTZ};
    use pglens::catalog::{CatalogSnapshot, DescriptionCatalog, RelationKind};
    use pglens::config::ServerConfig;
    use pglens::server::pool::PgPool;
    use pglens::server::resolver::RelationRegistry;
    use pglens::server::{build_router, AppState};

    const ORDERS: u32 = 16400;
    const HUSK: u32 = 16500;

    fn snapshot() -> CatalogSnapshot {
        let mut b = CatalogSnapshot::builder();
        b.add_namespace(11, "pg_catalog");
        b.add_namespace(2200, "public");
        b.add_relation(ORDERS, "orders", 2200, RelationKind::Table);
        b.add_attribute(ORDERS, 1, "id", OID_INT8, false);
        b.add_attribute(ORDERS, 2, "status", OID_TEXT, false);
        b.add_attribute(ORDERS, 3, "created_at", OID_TIMESTAMPTZ, false);
        b.add_attribute(ORDERS, 4, "total", OID_NUMERIC, false);
        // A relation that cannot bind: nothing but dropped columns.
        b.add_relation(HUSK, "husk", 2200, RelationKind::Table);
        b.add_attribute(HUSK, 1, "........pg.dropped.1........", 0, true);
        b.add_type(OID_INT8, "int8", 11, b'N', 0);
        b.add_type(OID_TEXT, "text", 11, b'S', 0);
        b.add_type(OID_TIMESTAMPTZ, "timestamptz", 11, b'D', 0);
        b.add_type(OID_NUMERIC, "numeric", 11, b'N', 0);
        b.add_description(DescriptionCatalog::Class, ORDERS, 0, "Customer orders");
        b.build()
    }

    /// The real app over a pool aimed at a closed port: acquisition fails
    /// fast with a connect error instead of hanging.
    fn app() -> Router {
        let registry = RelationRegistry::bind_all(&snapshot(), &["public".to_string()]);
        let config = ServerConfig {
            database_url: "postgres://app@127.0.0.1:1/pglens_e2e?connect_timeout=1".to_string(),
            max_limit: Some(1000),
            ..Default::default()
        };
        let pool = Arc::new(
            PgPool::new(&config.database_url, 1, Duration::from_secs(1)).unwrap(),
        );
        build_router(AppState { registry, pool, config })
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_what_is_being_served() {
        let (status, body) = send(app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "pglens");
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["relations"]["servable"], 1);
        assert_eq!(body["relations"]["unavailable"], 1);
    }

    #[tokio::test]
    async fn relation_listing_shows_servable_and_failed_alike() {
        let (status, body) = send(app(), get("/relations")).await;
        assert_eq!(status, StatusCode::OK);

        let relations = body["relations"].as_array().unwrap();
        assert_eq!(relations.len(), 2);

        assert_eq!(relations[0]["name"], "orders");
        assert_eq!(relations[0]["status"], "servable");
        assert_eq!(relations[0]["display_name"], "Orders");
        assert_eq!(relations[0]["fields"], 4);
        assert_eq!(relations[0]["route"], "/public/orders");
        assert!(relations[0].get("error").is_none());

        assert_eq!(relations[1]["name"], "husk");
        assert_eq!(relations[1]["status"], "unavailable");
        assert!(relations[1]["error"]
            .as_str()
            .unwrap()
            .contains("no live columns"));
    }

    #[tokio::test]
    async fn relation_schema_describes_the_surface() {
        let (status, body) = send(app(), get("/relations/public/orders")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["display_name"], "Orders");
        assert_eq!(body["kind"], "table");
        assert_eq!(body["doc"], "Customer orders");

        let fields = body["fields"].as_array().unwrap();
        assert_eq!(fields[0]["name"], "id");
        assert_eq!(fields[0]["type"], "int8");
        assert_eq!(fields[0]["semantic"], "integer");
        assert_eq!(fields[3]["type"], "numeric");

        let filters = body["filters"].as_array().unwrap();
        let names: Vec<&str> = filters
            .iter()
            .map(|f| f["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"status_patternMatchInsensitive"));
        assert!(names.contains(&"createdAt_lessOrEqual"));
        assert!(names.contains(&"total_isNull"));

        assert_eq!(body["pagination"]["max_limit"], 1000);
    }

    #[tokio::test]
    async fn unknown_relations_get_404() {
        let (status, body) = send(app(), get("/relations/public/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("public.nope"));

        let (status, _) = send(app(), post_json("/public/nope", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // Namespaces outside the exposed set do not exist as far as the
        // API is concerned.
        let (status, _) = send(app(), post_json("/pg_catalog/pg_class", json!({}))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_relations_get_503_with_the_reason() {
        let (status, body) = send(app(), post_json("/public/husk", json!({}))).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(body["error"].as_str().unwrap().contains("no live columns"));

        let (status, _) = send(app(), get("/relations/public/husk")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn malformed_bodies_get_400() {
        // Valid JSON, wrong shape.
        let (status, body) = send(app(), post_json("/public/orders", json!([1, 2]))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("JSON object"));

        // Unknown filter name.
        let (status, body) =
            send(app(), post_json("/public/orders", json!({ "bogus_equals": 1 }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("bogus_equals"));

        // Wrong value kind.
        let (status, body) =
            send(app(), post_json("/public/orders", json!({ "id_equals": "7" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("integral"));
    }

    #[tokio::test]
    async fn json_content_type_is_required() {
        let request = Request::builder()
            .method("POST")
            .uri("/public/orders")
            .body(Body::from("{}"))
            .unwrap();
        let (status, _) = send(app(), request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    /// With no database behind the pool, a valid query makes it all the
    /// way to connection setup and comes back as an upstream failure, not
    /// a panic and not a hang.
    #[tokio::test]
    async fn valid_queries_without_a_database_fail_as_upstream_errors() {
        let (status, body) = send(
            app(),
            post_json("/public/orders", json!({ "status_equals": "shipped" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body["error"].as_str().unwrap().contains("query failed"));
    }

    /// Validation runs before the pool is touched, so a bad body is a 400
    /// even when the database is down.
    #[tokio::test]
    async fn validation_precedes_execution() {
        let (status, _) = send(
            app(),
            post_json("/public/orders", json!({ "id_equals": "not a number" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
