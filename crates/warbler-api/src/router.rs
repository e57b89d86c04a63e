use axum::{
    Router, middleware,
    routing::{get, post},
};

use crate::auth::{self, AppState};
use crate::messages;
use crate::session::require_login;
use crate::users;

/// All Warbler routes. Protected routes redirect anonymous visitors to
/// `/login`; unmatched paths still fall through to 404.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/", get(messages::homepage))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/{id}", get(users::show_user))
        .route("/messages/{id}", get(messages::show_message));

    let protected_routes = Router::new()
        .route("/users/{id}/followers", get(users::show_followers))
        .route("/users/{id}/following", get(users::show_following))
        .route("/users/follow/{id}", post(users::follow))
        .route("/users/stop-following/{id}", post(users::stop_following))
        .route("/users/{id}/messages/new", post(messages::create_message_as))
        .route(
            "/messages/new",
            get(messages::new_message_form).post(messages::create_message),
        )
        .route("/messages/{id}/delete", post(messages::delete_message))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_login));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}
