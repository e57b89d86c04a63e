#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Method, Request, Response, StatusCode, header},
};
use tower::ServiceExt;

use warbler_api::auth::{AppState, AppStateInner, register_user};
use warbler_api::config::AppConfig;
use warbler_api::session::{SESSION_COOKIE, Session};
use warbler_types::api::SignupForm;
use warbler_types::models::{User, UserId};

/// Fresh application, database and fixture users for one test.
///
/// The schema is dropped again when the value goes out of scope, whether the
/// test passed or panicked.
pub struct TestApp {
    pub state: AppState,
    pub router: Router,
    pub user1: User,
    pub user2: User,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(AppConfig::for_tests())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let state = AppStateInner::new(config).unwrap();
        state.db.reset().unwrap();

        let user1 = create_user(&state, "user1");
        let user2 = create_user(&state, "user2");
        let router = warbler_api::router(state.clone());

        Self {
            state,
            router,
            user1,
            user2,
        }
    }

    /// Session cookie logged in as `user_id`, like writing the key straight
    /// into the session store.
    pub fn login_cookie(&self, user_id: UserId) -> String {
        let mut session = Session::default();
        session.log_in(user_id);
        self.cookie_for(&session)
    }

    pub fn cookie_for(&self, session: &Session) -> String {
        let token = session.encode(&self.state.config.secret_key).unwrap();
        format!("{SESSION_COOKIE}={token}")
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, None, cookie).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::POST, uri, Some(form), cookie).await
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        form: Option<&str>,
        cookie: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let body = match form {
            Some(form) => {
                builder = builder.header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
                Body::from(form.to_string())
            }
            None => Body::empty(),
        };
        self.router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap()
    }

    /// Follow `302 Found` responses with GETs, keeping the same cookie.
    pub async fn follow_redirects(&self, mut resp: Response<Body>, cookie: Option<&str>) -> Response<Body> {
        for _ in 0..5 {
            if resp.status() != StatusCode::FOUND {
                break;
            }
            let location = location(&resp);
            resp = self.get(&location, cookie).await;
        }
        resp
    }

    pub fn message_count(&self, text: &str) -> u64 {
        self.state.db.count_messages_with_text(text).unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = self.state.db.drop_all();
    }
}

fn create_user(state: &AppStateInner, name: &str) -> User {
    register_user(
        state,
        &SignupForm {
            username: name.into(),
            email: format!("{name}@example.com"),
            password: "password123".into(),
            image_url: None,
        },
    )
    .unwrap()
}

pub fn location(resp: &Response<Body>) -> String {
    resp.headers()[header::LOCATION].to_str().unwrap().to_string()
}

/// `name=value` of the session cookie set by a response, if any.
pub fn session_cookie(resp: &Response<Body>) -> Option<String> {
    resp.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(&format!("{SESSION_COOKIE}=")))
        .map(|v| v.split(';').next().unwrap_or_default().to_string())
        .next()
}

pub async fn body_text(resp: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
