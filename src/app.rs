use std::net::SocketAddr;

use axum::{extract::State, http::StatusCode, routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

use crate::state::AppState;
use crate::{dashboard, orders, products, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .merge(users::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(dashboard::router())
        .route("/health", get(|| async { "ok" }))
        .route("/ready", get(ready))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
}

/// Readiness: the store answers within the pool's acquire timeout.
async fn ready(State(state): State<AppState>) -> Result<&'static str, (StatusCode, String)> {
    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| {
            error!(error = %e, "readiness probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "database unavailable".to_string())
        })?;
    Ok("ready")
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "3000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use tower::ServiceExt;

    fn app() -> Router {
        build_app(AppState::fake())
    }

    fn bearer(state: &AppState) -> String {
        use crate::auth::JwtKeys;
        use crate::users::repo_types::User;
        use axum::extract::FromRef;

        let user = User {
            id: 1,
            first_name: "Test".into(),
            last_name: "Admin".into(),
            username: "admin".into(),
            password_digest: String::new(),
        };
        let token = JwtKeys::from_ref(state).sign(&user).expect("sign");
        format!("Bearer {token}")
    }

    async fn body_text(res: axum::response::Response) -> String {
        let bytes = to_bytes(res.into_body(), usize::MAX).await.expect("body");
        String::from_utf8(bytes.to_vec()).expect("utf8")
    }

    #[tokio::test]
    async fn health_is_ok() {
        let res = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "ok");
    }

    #[tokio::test]
    async fn listing_users_requires_a_token() {
        let res = app()
            .oneshot(Request::get("/users").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let res = app()
            .oneshot(
                Request::get("/orders")
                    .header(header::AUTHORIZATION, "Bearer not.a.jwt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn zero_quantity_is_a_bad_request() {
        let res = app()
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/orders/1/products")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"product_id":1,"quantity":0}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(res).await.contains("quantity must be a positive integer"));
    }

    #[tokio::test]
    async fn unknown_category_lists_nothing() {
        let res = app()
            .oneshot(
                Request::get("/products?category=spaceships")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(body_text(res).await, "[]");
    }

    #[tokio::test]
    async fn popular_count_must_be_positive() {
        let res = app()
            .oneshot(
                Request::get("/products/popular?count=0")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_without_password_names_the_user() {
        let state = AppState::fake();
        let auth = bearer(&state);
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/users")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::AUTHORIZATION, auth)
                    .body(Body::from(
                        r#"{"users":[
                            {"first_name":"A","last_name":"A","username":"alpha","password":"pw"},
                            {"first_name":"B","last_name":"B","username":"bravo"}
                        ]}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let text = body_text(res).await;
        assert!(text.contains("bravo"), "{text}");
        assert!(text.contains("password is required"), "{text}");
    }

    #[tokio::test]
    async fn unreachable_store_is_a_server_error() {
        // The fake pool points at nothing, so the acquire timeout trips.
        let res = app()
            .oneshot(Request::get("/orders/1").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(res).await, "internal error");
    }
}
