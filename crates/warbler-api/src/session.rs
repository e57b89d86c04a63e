use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::distr::{Alphanumeric, SampleString};
use tracing::warn;

use warbler_types::api::SessionClaims;
use warbler_types::models::{User, UserId};

use crate::auth::AppState;
use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

pub const SESSION_COOKIE: &str = "warbler_session";

const SESSION_TTL_DAYS: i64 = 14;

/// Typed view of the cookie-backed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    current_user_id: Option<UserId>,
    csrf_token: String,
}

/// Inserted into request extensions by [`require_login`].
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Session,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            current_user_id: None,
            csrf_token: new_csrf_token(),
        }
    }
}

impl Session {
    pub fn current_user_id(&self) -> Option<UserId> {
        self.current_user_id
    }

    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }

    /// Start an authenticated session. The CSRF token is rotated.
    pub fn log_in(&mut self, user_id: UserId) {
        self.current_user_id = Some(user_id);
        self.csrf_token = new_csrf_token();
    }

    pub fn log_out(&mut self) {
        self.current_user_id = None;
        self.csrf_token = new_csrf_token();
    }

    /// Read the session cookie. Missing, forged or expired cookies yield an
    /// anonymous session.
    pub fn from_jar(jar: &CookieJar, secret: &str) -> Self {
        jar.get(SESSION_COOKIE)
            .and_then(|cookie| Self::decode(cookie.value(), secret))
            .unwrap_or_default()
    }

    pub fn decode(token: &str, secret: &str) -> Option<Self> {
        match decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => Some(Self {
                current_user_id: data.claims.curr_user,
                csrf_token: data.claims.csrf,
            }),
            Err(e) => {
                warn!("Rejected session cookie: {}", e);
                None
            }
        }
    }

    pub fn encode(&self, secret: &str) -> anyhow::Result<String> {
        let claims = SessionClaims {
            curr_user: self.current_user_id,
            csrf: self.csrf_token.clone(),
            exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS)).timestamp()
                as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Write this session into the cookie jar.
    pub fn store(&self, jar: CookieJar, secret: &str) -> anyhow::Result<CookieJar> {
        let cookie = Cookie::build((SESSION_COOKIE, self.encode(secret)?))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);
        Ok(jar.add(cookie))
    }

    pub fn clear(jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    }
}

fn new_csrf_token() -> String {
    Alphanumeric.sample_string(&mut rand::rng(), 32)
}

/// Require a session whose user still exists; otherwise redirect to login.
pub async fn require_login(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> AppResult<Response> {
    let session = Session::from_jar(&jar, &state.config.secret_key);
    let user_id = session
        .current_user_id()
        .ok_or(AppError::AuthenticationRequired)?;

    let row = state.db.get_user_by_id(&user_id.to_string())?.ok_or_else(|| {
        warn!("Session refers to unknown user {}", user_id);
        AppError::AuthenticationRequired
    })?;
    let user = User::try_from(row)?;

    req.extensions_mut().insert(CurrentUser { user, session });
    Ok(next.run(req).await)
}

/// Check a submitted form token against the session when CSRF protection is on.
pub fn verify_csrf(config: &AppConfig, session: &Session, submitted: Option<&str>) -> AppResult<()> {
    if !config.csrf_enabled {
        return Ok(());
    }
    match submitted {
        Some(token) if token == session.csrf_token() => Ok(()),
        _ => {
            warn!("CSRF check failed");
            Err(AppError::CsrfMismatch)
        }
    }
}
