// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    handler::Handler,
    http::Method,
    middleware,
    routing::{on, MethodFilter},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        require_auth, Access, Claims, Identity, PolicyBuilder, PolicyError, PolicyRegistry, Role,
        RouteGroup, RouteKey,
    },
    state::AppState,
};

pub mod health;
pub mod tokens;
pub mod users;

/// Handlers and their access annotations. The router and the access policy
/// are both built from these registrations.
struct Routes {
    router: Router<AppState>,
    policy: PolicyBuilder,
    unroutable: Vec<RouteKey>,
}

impl Routes {
    fn new() -> Self {
        Self {
            router: Router::new(),
            policy: PolicyRegistry::builder(),
            unroutable: Vec::new(),
        }
    }

    fn group<F>(self, prefix: &str, access: Option<Access>, register: F) -> Self
    where
        F: FnOnce(GroupRoutes) -> GroupRoutes,
    {
        register(GroupRoutes {
            group: RouteGroup::new(prefix, access),
            routes: self,
        })
        .routes
    }

    fn into_policy(self) -> Result<PolicyRegistry, PolicyError> {
        if let Some(route) = self.unroutable.first() {
            return Err(PolicyError::UnsupportedMethod(route.to_string()));
        }
        self.policy.build()
    }
}

struct GroupRoutes {
    group: RouteGroup,
    routes: Routes,
}

impl GroupRoutes {
    fn route<H, T>(mut self, method: Method, path: &str, handler: H, access: Option<Access>) -> Self
    where
        H: Handler<T, AppState>,
        T: 'static,
    {
        let full = self.group.path(path);
        match MethodFilter::try_from(method.clone()) {
            Ok(filter) => self.routes.router = self.routes.router.route(&full, on(filter, handler)),
            Err(_) => self.routes.unroutable.push(RouteKey::new(method.clone(), full)),
        }
        self.routes.policy = self.routes.policy.route(&self.group, method, path, access);
        self
    }
}

fn routes() -> Routes {
    Routes::new()
        .group("/health", Some(Access::Public), |g| {
            g.route(Method::GET, "", health::health, None)
                .route(Method::GET, "/live", health::liveness, None)
        })
        .group("/v1/auth", None, |g| {
            g.route(Method::POST, "/login", tokens::login, Some(Access::Public))
                .route(Method::POST, "/verify", tokens::verify_token, Some(Access::Public))
                .route(Method::GET, "/profile", tokens::profile, None)
                .route(Method::POST, "/token", tokens::issue_token, None)
        })
        .group("/v1/users", Some(Access::Authenticated), |g| {
            g.route(Method::GET, "/me", users::get_current_user, None)
                .route(Method::GET, "/{user_id}", users::get_user, None)
        })
}

/// Access policy for every route in [`router`].
pub fn access_policy() -> Result<PolicyRegistry, PolicyError> {
    routes().into_policy()
}

pub fn router(state: AppState) -> Router {
    let guarded = routes()
        .router
        .route_layer(middleware::from_fn_with_state(
            state.authorizer.clone(),
            require_auth,
        ))
        .with_state(state);

    guarded
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        tokens::login,
        tokens::verify_token,
        tokens::profile,
        tokens::issue_token,
        users::get_current_user,
        users::get_user
    ),
    components(
        schemas(
            Claims,
            Identity,
            Role,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            tokens::ProfileResponse,
            tokens::LoginRequest,
            tokens::IssueTokenRequest,
            tokens::TokenResponse,
            users::UserMeResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness"),
        (name = "Auth", description = "Login, token verification and issuing"),
        (name = "Users", description = "Authenticated identity lookup")
    )
)]
struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{header::AUTHORIZATION, Request, StatusCode},
    };
    use async_trait::async_trait;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::auth::{IdentityStore, IdentityStoreError, InMemoryIdentityStore, ManualClock};
    use crate::config::AuthSettings;

    const START: i64 = 1_700_000_000;

    struct TestApp {
        app: Router,
        state: AppState,
        store: Arc<InMemoryIdentityStore>,
        clock: Arc<ManualClock>,
    }

    fn test_app() -> TestApp {
        let clock = Arc::new(ManualClock::new(START));
        let store = Arc::new(InMemoryIdentityStore::new());
        let settings = AuthSettings::new("router-secret", Duration::from_secs(3600)).unwrap();
        let state = AppState::new(&settings, store.clone(), clock.clone()).unwrap();
        TestApp {
            app: router(state.clone()),
            state,
            store,
            clock,
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    fn post_json(uri: &str, authorization: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get_with(uri: &str, authorization: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(value) = authorization {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn access_policy_builds() {
        let policy = access_policy().unwrap();
        assert!(policy.is_public(&RouteKey::new(Method::GET, "/health")));
        assert!(policy.is_public(&RouteKey::new(Method::POST, "/v1/auth/login")));
        assert!(policy.is_public(&RouteKey::new(Method::POST, "/v1/auth/verify")));
        assert!(!policy.is_public(&RouteKey::new(Method::POST, "/v1/auth/token")));
        assert!(!policy.is_public(&RouteKey::new(Method::GET, "/v1/auth/profile")));
        assert!(!policy.is_public(&RouteKey::new(Method::GET, "/v1/users/{user_id}")));
    }

    #[test]
    fn every_documented_operation_has_a_policy_entry() {
        let policy = access_policy().unwrap();
        let doc = ApiDoc::openapi();

        let mut documented = 0;
        for (path, item) in &doc.paths.paths {
            let operations = [
                (Method::GET, item.get.is_some()),
                (Method::POST, item.post.is_some()),
                (Method::PUT, item.put.is_some()),
                (Method::PATCH, item.patch.is_some()),
                (Method::DELETE, item.delete.is_some()),
            ];
            for (method, present) in operations {
                if present {
                    documented += 1;
                    let key = RouteKey::new(method, path.as_str());
                    assert!(policy.contains(&key), "{key} has no access policy");
                }
            }
        }
        assert_eq!(documented, policy.route_count());
    }

    #[test]
    fn unroutable_method_fails_policy_build() {
        let purge = Method::from_bytes(b"PURGE").unwrap();
        let err = Routes::new()
            .group("/cache", None, |g| g.route(purge, "", health::liveness, None))
            .into_policy()
            .unwrap_err();
        assert_eq!(err, PolicyError::UnsupportedMethod("PURGE /cache".to_string()));
    }

    #[tokio::test]
    async fn public_health_needs_no_token() {
        let t = test_app();
        let (status, body) = send(&t.app, get_with("/health", None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let t = test_app();
        let (status, body) = send(&t.app, get_with("/v1/auth/profile", None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthorized");
    }

    #[tokio::test]
    async fn basic_scheme_is_rejected() {
        let t = test_app();
        let (status, body) = send(&t.app, get_with("/v1/auth/profile", Some("Basic abc"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthorized");
    }

    #[tokio::test]
    async fn deactivated_identity_looks_like_any_other_rejection() {
        let t = test_app();
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        let token = t.state.codec().issue_default(&user.id).unwrap();
        t.store.deactivate(&user.id).await;

        let bearer = format!("Bearer {token}");
        let (status, deactivated) = send(&t.app, get_with("/v1/users/me", Some(&bearer))).await;
        let (_, no_header) = send(&t.app, get_with("/v1/users/me", None)).await;
        let (_, garbage) = send(&t.app, get_with("/v1/users/me", Some("Bearer x.y.z"))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(deactivated, no_header);
        assert_eq!(deactivated, garbage);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let t = test_app();
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        let token = t.state.codec().issue(&user.id, Duration::from_secs(30)).unwrap();
        t.clock.advance(30);

        let bearer = format!("Bearer {token}");
        let (status, _) = send(&t.app, get_with("/v1/auth/profile", Some(&bearer))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn active_identity_reaches_handler_with_its_subject() {
        let t = test_app();
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        let token = t.state.codec().issue_default(&user.id).unwrap();
        let bearer = format!("Bearer {token}");

        let (status, body) = send(&t.app, get_with("/v1/auth/profile", Some(&bearer))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["claims"]["subject_id"], user.id.as_str());
        assert_eq!(body["identity"]["email"], "ada@example.com");

        let (status, body) = send(&t.app, get_with("/v1/users/me", Some(&bearer))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], user.id.as_str());
        assert_eq!(body["role"], "user");
    }

    #[tokio::test]
    async fn admin_routes_forbid_regular_users() {
        let t = test_app();
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        let token = t.state.codec().issue_default(&user.id).unwrap();
        let bearer = format!("Bearer {token}");

        let uri = format!("/v1/users/{}", user.id);
        let (status, body) = send(&t.app, get_with(&uri, Some(&bearer))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error_code"], "forbidden");
    }

    #[tokio::test]
    async fn admin_can_look_up_identities() {
        let t = test_app();
        let admin = t.store.create("Root", "root@example.com", Role::Admin).await;
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        let bearer = format!("Bearer {}", t.state.codec().issue_default(&admin.id).unwrap());

        let (status, body) =
            send(&t.app, get_with(&format!("/v1/users/{}", user.id), Some(&bearer))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], user.id.as_str());

        let (status, _) = send(&t.app, get_with("/v1/users/nobody", Some(&bearer))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_issues_tokens_that_verify() {
        let t = test_app();
        let admin = t.store.create("Root", "root@example.com", Role::Admin).await;
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        let bearer = format!("Bearer {}", t.state.codec().issue_default(&admin.id).unwrap());

        let request = post_json(
            "/v1/auth/token",
            Some(&bearer),
            serde_json::json!({"user_id": user.id, "ttl_secs": 120}),
        );
        let (status, body) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 120);

        let issued = body["access_token"].as_str().unwrap();
        let claims = t.state.codec().verify(issued).unwrap();
        assert_eq!(claims.subject_id(), user.id);
    }

    #[tokio::test]
    async fn issued_ttl_is_bounded() {
        let t = test_app();
        let admin = t.store.create("Root", "root@example.com", Role::Admin).await;
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        let bearer = format!("Bearer {}", t.state.codec().issue_default(&admin.id).unwrap());

        for ttl_secs in [0, 30 * 24 * 60 * 60 + 1, i64::MAX as u64, u64::MAX] {
            let request = post_json(
                "/v1/auth/token",
                Some(&bearer),
                serde_json::json!({"user_id": user.id, "ttl_secs": ttl_secs}),
            );
            let (status, body) = send(&t.app, request).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "ttl_secs = {ttl_secs}");
            assert_eq!(body["error_code"], "invalid_input");
        }
    }

    #[tokio::test]
    async fn login_returns_token_and_cookie() {
        let t = test_app();
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        t.store.set_password(&user.id, "hunter2").await.unwrap();

        let request = post_json(
            "/v1/auth/login",
            None,
            serde_json::json!({"email": "ada@example.com", "password": "hunter2"}),
        );
        let response = t.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers()["set-cookie"].to_str().unwrap().to_string();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();

        let token = body["access_token"].as_str().unwrap();
        assert!(cookie.starts_with(&format!("token={token};")));
        assert_eq!(body["expires_in"], 3600);

        let bearer = format!("Bearer {token}");
        let (status, me) = send(&t.app, get_with("/v1/users/me", Some(&bearer))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["user_id"], user.id.as_str());
    }

    #[tokio::test]
    async fn failed_login_looks_like_any_other_rejection() {
        let t = test_app();
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        t.store.set_password(&user.id, "hunter2").await.unwrap();

        let wrong_password = post_json(
            "/v1/auth/login",
            None,
            serde_json::json!({"email": "ada@example.com", "password": "hunter3"}),
        );
        let unknown_email = post_json(
            "/v1/auth/login",
            None,
            serde_json::json!({"email": "eve@example.com", "password": "hunter2"}),
        );
        let (status, wrong) = send(&t.app, wrong_password).await;
        let (_, unknown) = send(&t.app, unknown_email).await;
        let (_, no_header) = send(&t.app, get_with("/v1/users/me", None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong, unknown);
        assert_eq!(wrong, no_header);
    }

    #[tokio::test]
    async fn deactivated_identity_cannot_log_in() {
        let t = test_app();
        let user = t.store.create("Ada", "ada@example.com", Role::User).await;
        t.store.set_password(&user.id, "hunter2").await.unwrap();
        t.store.deactivate(&user.id).await;

        let request = post_json(
            "/v1/auth/login",
            None,
            serde_json::json!({"email": "ada@example.com", "password": "hunter2"}),
        );
        let (status, _) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    struct UnreachableStore;

    #[async_trait]
    impl IdentityStore for UnreachableStore {
        async fn find_active_by_id(&self, _id: &str) -> Result<Option<Identity>, IdentityStoreError> {
            Err(IdentityStoreError::Unavailable("connection refused".to_string()))
        }

        async fn check_health(&self) -> Result<(), IdentityStoreError> {
            Err(IdentityStoreError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn health_is_degraded_when_identity_store_is_unreachable() {
        let settings = AuthSettings::new("router-secret", Duration::from_secs(3600)).unwrap();
        let clock = Arc::new(ManualClock::new(START));
        let state = AppState::new(&settings, Arc::new(UnreachableStore), clock).unwrap();
        let app = router(state);

        let (status, body) = send(&app, get_with("/health", None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "degraded");
        assert_eq!(body["checks"]["identity_store"], "unavailable");

        let (status, _) = send(&app, get_with("/health/live", None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn verify_endpoint_reads_token_cookie() {
        let t = test_app();
        let token = t.state.codec().issue_default("user_123").unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/verify")
            .header("cookie", format!("token={token}"))
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["subject_id"], "user_123");

        let request = Request::builder()
            .method("POST")
            .uri("/v1/auth/verify")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&t.app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error_code"], "unauthorized");
    }

    #[tokio::test]
    async fn request_id_is_propagated() {
        let t = test_app();
        let response = t
            .app
            .clone()
            .oneshot(get_with("/health/live", None))
            .await
            .unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }
}
