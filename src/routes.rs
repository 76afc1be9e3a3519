// src/routes.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};

use crate::{
    config::AppState,
    handlers::{frontend, history, resources},
    middleware::auth::auth_guard,
};

pub fn router(app_state: AppState) -> Router {
    // Rotas públicas
    let public_routes = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/frontend/signup", post(frontend::signup))
        .route("/frontend/login/{token}", get(frontend::login_by_token))
        .route("/frontend/remind/password", post(frontend::remind_password));

    // Rotas protegidas pelo bearer token
    let protected_routes = Router::new()
        .route(
            "/frontend/profile/me",
            get(frontend::get_me).put(frontend::put_me),
        )
        .route("/histories", get(history::list))
        .route("/histories/{id}", get(history::show))
        .route("/histories/{entity}/{entity_id}", get(history::for_entity))
        .route(
            "/{resource}",
            get(resources::list).post(resources::create),
        )
        .route(
            "/{resource}/{id}",
            get(resources::show)
                .put(resources::update)
                .delete(resources::delete),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    Router::new()
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(app_state)
}
