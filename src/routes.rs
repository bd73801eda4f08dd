// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};

use crate::{config::AppState, handlers, middleware::auth::auth_guard};

pub fn app_router(app_state: AppState) -> Router {
    // Only /me needs the guard; /login is public
    let auth_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard))
        .route("/login", post(handlers::auth::login));

    let user_routes = Router::new()
        .route("/", get(handlers::auth::list_users).post(handlers::auth::create_user))
        .route("/{id}", axum::routing::delete(handlers::auth::delete_user));

    let ferme_routes = Router::new()
        .route("/", get(handlers::fermes::list_fermes).post(handlers::fermes::create_ferme))
        .route(
            "/{id}",
            put(handlers::fermes::update_ferme).delete(handlers::fermes::delete_ferme),
        );

    let worker_routes = Router::new()
        .route("/", get(handlers::workers::list_workers).post(handlers::workers::create_worker))
        .route("/import", post(handlers::workers::import_workers))
        .route("/bulk-delete", post(handlers::workers::bulk_delete_workers))
        .route(
            "/{id}",
            get(handlers::workers::get_worker)
                .put(handlers::workers::update_worker)
                .delete(handlers::workers::delete_worker),
        )
        .route("/{id}/room", put(handlers::workers::assign_room))
        .route("/{id}/exit", post(handlers::workers::exit_worker));

    let room_routes = Router::new()
        .route("/", get(handlers::rooms::list_rooms).post(handlers::rooms::create_room))
        .route("/reconcile", post(handlers::rooms::reconcile_all))
        .route(
            "/{id}",
            get(handlers::rooms::get_room)
                .put(handlers::rooms::update_room)
                .delete(handlers::rooms::delete_room),
        )
        .route("/{id}/reconcile", post(handlers::rooms::reconcile_room));

    let supervisor_routes = Router::new()
        .route(
            "/",
            get(handlers::supervisors::list_supervisors).post(handlers::supervisors::create_supervisor),
        )
        .route(
            "/{id}",
            put(handlers::supervisors::update_supervisor).delete(handlers::supervisors::delete_supervisor),
        );

    let motif_routes = Router::new()
        .route("/", get(handlers::catalog::list_motifs).post(handlers::catalog::create_motif))
        .route(
            "/{id}",
            put(handlers::catalog::update_motif).delete(handlers::catalog::delete_motif),
        );

    let article_name_routes = Router::new()
        .route(
            "/",
            get(handlers::catalog::list_article_names).post(handlers::catalog::create_article_name),
        )
        .route(
            "/{id}",
            put(handlers::catalog::update_article_name).delete(handlers::catalog::delete_article_name),
        );

    let stock_routes = Router::new()
        .route("/", get(handlers::stock::list_stock).post(handlers::stock::create_article))
        .route("/low", get(handlers::stock::list_low_stock))
        .route("/{id}", axum::routing::delete(handlers::stock::delete_article))
        .route(
            "/{id}/movements",
            get(handlers::stock::list_movements).post(handlers::stock::record_movement),
        );

    let transfer_routes = Router::new()
        .route(
            "/",
            get(handlers::transfers::list_transfers).post(handlers::transfers::create_transfer),
        )
        .route("/{id}/accept", post(handlers::transfers::accept_transfer))
        .route("/{id}/reject", post(handlers::transfers::reject_transfer));

    let dashboard_routes = Router::new().route("/summary", get(handlers::dashboard::get_dashboard_summary));

    // Everything below needs a valid bearer token; roles are checked per handler
    let protected = Router::new()
        .nest("/api/users", user_routes)
        .nest("/api/fermes", ferme_routes)
        .nest("/api/workers", worker_routes)
        .nest("/api/rooms", room_routes)
        .nest("/api/supervisors", supervisor_routes)
        .nest("/api/motifs", motif_routes)
        .nest("/api/article-names", article_name_routes)
        .nest("/api/stock", stock_routes)
        .nest("/api/transfers", transfer_routes)
        .nest("/api/dashboard", dashboard_routes)
        .layer(axum_middleware::from_fn_with_state(app_state.clone(), auth_guard));

    Router::new()
        .route("/api/health", get(handlers::health::health))
        .nest("/api/auth", auth_routes)
        .merge(protected)
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::{
        db::StoreError,
        models::auth::{CreateUserPayload, Role},
        test_utils::test_state,
    };

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, body)
    }

    fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn token_for(state: &AppState, app: &Router, email: &str, role: Role, ferme_id: Option<&str>) -> String {
        state
            .auth_service
            .create_user(CreateUserPayload {
                email: email.into(),
                password: "motdepasse".into(),
                nom: "Test".into(),
                role,
                ferme_id: ferme_id.map(str::to_string),
            })
            .await
            .unwrap();

        let (status, body) = send(
            app,
            request("POST", "/api/auth/login", None, Some(json!({"email": email, "password": "motdepasse"}))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health_follows_store_reachability() {
        let (memory, state) = test_state();
        let app = app_router(state);

        let (status, body) = send(&app, request("GET", "/api/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["circuit"], "CLOSED");

        memory.set_offline(StoreError::Network("unreachable".into())).await;
        let (status, body) = send(&app, request("GET", "/api/health", None, None)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unavailable");
    }

    #[tokio::test]
    async fn protected_routes_need_a_token() {
        let (_memory, state) = test_state();
        let app = app_router(state);

        let (status, _) = send(&app, request("GET", "/api/workers", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn roles_and_farm_scope_are_enforced() {
        let (_memory, state) = test_state();
        let app = app_router(state.clone());
        let admin = token_for(&state, &app, "admin@ferme.ma", Role::Admin, Some("F")).await;
        let user = token_for(&state, &app, "user@ferme.ma", Role::User, Some("F")).await;

        let new_worker = json!({"nom": "Youssef", "cin": "AB1", "sexe": "homme"});

        let (status, body) = send(&app, request("POST", "/api/workers", Some(&user), Some(new_worker.clone()))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Vous n'avez pas les droits nécessaires pour cette action.");

        let (status, body) = send(&app, request("POST", "/api/workers", Some(&admin), Some(new_worker))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["fermeId"], "F");

        let (status, body) = send(&app, request("GET", "/api/workers", Some(&user), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let foreign = Request::builder()
            .method("GET")
            .uri("/api/workers")
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header("x-ferme-id", "G")
            .header(header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app, foreign).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "You do not have access to this farm.");
    }

    #[tokio::test]
    async fn validation_errors_are_detailed() {
        let (_memory, state) = test_state();
        let app = app_router(state.clone());
        let admin = token_for(&state, &app, "admin@ferme.ma", Role::Admin, Some("F")).await;

        let (status, body) = send(
            &app,
            request("POST", "/api/rooms", Some(&admin), Some(json!({"numero": "", "genre": "hommes", "capacite": 0}))),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["numero"][0], "Ce champ est obligatoire.");
        assert_eq!(body["details"]["capacite"][0], "La capacité doit être d'au moins 1.");
    }

    #[tokio::test]
    async fn room_reconciliation_endpoint() {
        let (_memory, state) = test_state();
        let app = app_router(state.clone());
        let admin = token_for(&state, &app, "admin@ferme.ma", Role::Admin, Some("F")).await;

        let (status, room) = send(
            &app,
            request("POST", "/api/rooms", Some(&admin), Some(json!({"numero": "10", "genre": "hommes", "capacite": 4}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(
            &app,
            request("POST", "/api/workers", Some(&admin), Some(json!({"nom": "Ali", "cin": "Z9", "sexe": "homme", "chambre": "10"}))),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let room_id = room["id"].as_str().unwrap();
        let (status, body) = send(&app, request("GET", &format!("/api/rooms/{room_id}"), Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["occupantsActuels"], 1);

        // Already consistent: nothing left to update
        let (status, report) = send(&app, request("POST", "/api/rooms/reconcile", Some(&admin), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["roomsChecked"], 1);
        assert_eq!(report["roomsUpdated"], 0);
    }

    #[tokio::test]
    async fn open_circuit_is_503() {
        let (_memory, state) = test_state();
        let app = app_router(state.clone());
        let admin = token_for(&state, &app, "admin@ferme.ma", Role::Admin, Some("F")).await;

        state.store.breaker().force_open().await;

        let (status, body) = send(
            &app,
            request("POST", "/api/supervisors", Some(&admin), Some(json!({"nom": "Karim", "telephone": "0612345678"}))),
        )
        .await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["error"], "La base de données est momentanément indisponible. Réessayez dans quelques instants.");
    }
}
