use std::sync::Arc;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use warbler_db::Database;
use warbler_db::queries::NewUser;
use warbler_types::api::{LoginForm, SignupForm};
use warbler_types::models::User;

use crate::config::AppConfig;
use crate::error::{AppResult, LOGIN_PATH, found};
use crate::session::Session;
use crate::views;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub config: AppConfig,
}

impl AppStateInner {
    /// Open the configured database and wrap everything handlers need.
    pub fn new(config: AppConfig) -> anyhow::Result<AppState> {
        let db = Database::connect(&config.database_url)?;
        Ok(Arc::new(Self { db, config }))
    }
}

#[derive(Debug, Error)]
pub enum SignupError {
    #[error("{0}")]
    Invalid(&'static str),

    #[error("Username already taken")]
    Taken,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl SignupError {
    /// A concurrent signup can claim the name or email between the lookup and
    /// the insert. The UNIQUE index catches it; report it as taken.
    fn from_insert(err: anyhow::Error) -> Self {
        if warbler_db::is_constraint_violation(&err) {
            SignupError::Taken
        } else {
            SignupError::Internal(err)
        }
    }
}

/// Validate, hash the password, and insert a new user.
pub fn register_user(state: &AppStateInner, form: &SignupForm) -> Result<User, SignupError> {
    let username = form.username.trim();
    if username.is_empty() || username.chars().count() > 30 {
        return Err(SignupError::Invalid("Username must be 1 to 30 characters."));
    }
    if !form.email.contains('@') {
        return Err(SignupError::Invalid("Invalid email address."));
    }
    if form.password.len() < 6 {
        return Err(SignupError::Invalid("Password must be at least 6 characters."));
    }

    if state.db.get_user_by_username(username)?.is_some()
        || state.db.get_user_by_email(&form.email)?.is_some()
    {
        return Err(SignupError::Taken);
    }

    let password_hash = hash_password(&form.password, state.config.testing)?;
    let user_id = Uuid::new_v4().to_string();
    let image_url = form.image_url.as_deref().filter(|url| !url.is_empty());

    state
        .db
        .create_user(&NewUser {
            id: &user_id,
            username,
            email: &form.email,
            password_hash: &password_hash,
            image_url,
        })
        .map_err(SignupError::from_insert)?;

    let row = state
        .db
        .get_user_by_id(&user_id)?
        .ok_or_else(|| anyhow::anyhow!("user {} vanished after insert", user_id))?;
    Ok(User::try_from(row)?)
}

/// Look up `username` and check `password` against the stored hash.
pub fn authenticate(db: &Database, username: &str, password: &str) -> anyhow::Result<Option<User>> {
    let Some(row) = db.get_user_by_username(username)? else {
        return Ok(None);
    };

    let parsed_hash = PasswordHash::new(&row.password)
        .map_err(|e| anyhow::anyhow!("corrupt password hash for {}: {}", row.username, e))?;

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Ok(None);
    }

    Ok(Some(User::try_from(row)?))
}

fn hash_password(password: &str, testing: bool) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher(testing)?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?
        .to_string();
    Ok(hash)
}

/// Argon2id with default costs, or the minimum costs in testing mode.
fn hasher(testing: bool) -> anyhow::Result<Argon2<'static>> {
    if !testing {
        return Ok(Argon2::default());
    }
    let params = Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
        .map_err(|e| anyhow::anyhow!("invalid argon2 params: {}", e))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

// -- Handlers --

pub async fn signup_form() -> Html<String> {
    Html(views::signup_form(None))
}

pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SignupForm>,
) -> AppResult<Response> {
    let user = match register_user(&state, &form) {
        Ok(user) => user,
        Err(SignupError::Invalid(msg)) => {
            return Ok((StatusCode::BAD_REQUEST, Html(views::signup_form(Some(msg)))).into_response());
        }
        Err(SignupError::Taken) => {
            warn!("Signup rejected, username or email taken: {}", form.username);
            let msg = SignupError::Taken.to_string();
            return Ok((StatusCode::CONFLICT, Html(views::signup_form(Some(msg.as_str())))).into_response());
        }
        Err(SignupError::Internal(e)) => return Err(e.into()),
    };

    info!("New user {} ({})", user.username, user.id);

    let mut session = Session::from_jar(&jar, &state.config.secret_key);
    session.log_in(user.id);
    let jar = session.store(jar, &state.config.secret_key)?;
    Ok((jar, found("/")).into_response())
}

pub async fn login_form() -> Html<String> {
    Html(views::login_form(None))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let username = form.username.trim();
    let Some(user) = authenticate(&state.db, username, &form.password)? else {
        warn!("Failed login for {}", username);
        return Ok((
            StatusCode::UNAUTHORIZED,
            Html(views::login_form(Some("Invalid credentials."))),
        )
            .into_response());
    };

    info!("User {} logged in", user.username);

    let mut session = Session::from_jar(&jar, &state.config.secret_key);
    session.log_in(user.id);
    let jar = session.store(jar, &state.config.secret_key)?;
    Ok((jar, found("/")).into_response())
}

pub async fn logout(jar: CookieJar) -> Response {
    (Session::clear(jar), found(LOGIN_PATH)).into_response()
}
