use axum::{
    Extension, Form,
    extract::{Path, State, rejection::FormRejection},
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};
use uuid::Uuid;

use warbler_types::api::{MessageForm, TokenForm};
use warbler_types::models::{Message, MessageId, User};

use crate::auth::{AppState, AppStateInner};
use crate::error::{AppError, AppResult, found};
use crate::guard::{Action, authorize};
use crate::session::{CurrentUser, Session, verify_csrf};
use crate::users::{optional_viewer, path_id};
use crate::views;

/// Longest accepted message, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

const FEED_LIMIT: u32 = 100;

fn load_message(state: &AppStateInner, id: MessageId) -> AppResult<Message> {
    let row = state
        .db
        .get_message(&id.to_string())?
        .ok_or(AppError::NotFound)?;
    Ok(Message::try_from(row)?)
}

fn validate_text(text: &str) -> AppResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::BadRequest("Message text is required.".into()));
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::BadRequest(format!(
            "Messages are limited to {} characters.",
            MAX_MESSAGE_LEN
        )));
    }
    Ok(text)
}

/// Insert a message authored by `author` and redirect to their profile.
fn post_as(state: &AppStateInner, author: &User, text: &str) -> AppResult<Response> {
    let text = validate_text(text)?;
    let message_id = Uuid::new_v4();

    state
        .db
        .insert_message(&message_id.to_string(), &author.id.to_string(), text)?;

    info!("{} posted message {}", author.username, message_id);
    Ok(found(format!("/users/{}", author.id)))
}

/// Feed for logged-in users, landing page otherwise.
pub async fn homepage(State(state): State<AppState>, jar: CookieJar) -> AppResult<Html<String>> {
    let Some(viewer) = optional_viewer(&state, &jar)? else {
        return Ok(Html(views::landing()));
    };
    let messages = state
        .db
        .get_feed(&viewer.id.to_string(), FEED_LIMIT)?
        .into_iter()
        .map(Message::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Html(views::home_feed(&viewer, &messages)))
}

pub async fn new_message_form(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
) -> Html<String> {
    let csrf = state.config.csrf_enabled.then(|| current.session.csrf_token());
    Html(views::message_form(&current.user, csrf))
}

pub async fn create_message(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<MessageForm>,
) -> AppResult<Response> {
    verify_csrf(&state.config, &current.session, form.csrf_token.as_deref())?;
    post_as(&state, &current.user, &form.text)
}

/// Posting on behalf of `user_id` is only allowed when it is the session user.
/// The target is checked before the body is read, so any other target is 403
/// whatever the path or form holds.
pub async fn create_message_as(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(current): Extension<CurrentUser>,
    form: Result<Form<MessageForm>, FormRejection>,
) -> AppResult<Response> {
    let Ok(user_id) = raw_id.parse::<Uuid>() else {
        warn!("{} tried to post as {}", current.user.username, raw_id);
        return Err(AppError::Forbidden);
    };
    authorize(current.session.current_user_id(), user_id, Action::Write)
        .check()
        .inspect_err(|_| {
            warn!("{} tried to post as {}", current.user.username, user_id);
        })?;
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    verify_csrf(&state.config, &current.session, form.csrf_token.as_deref())?;
    post_as(&state, &current.user, &form.text)
}

pub async fn show_message(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    jar: CookieJar,
) -> AppResult<Html<String>> {
    let message = load_message(&state, path_id(&raw_id)?)?;
    let viewer = optional_viewer(&state, &jar)?;
    let session = Session::from_jar(&jar, &state.config.secret_key);
    let csrf = state.config.csrf_enabled.then(|| session.csrf_token());
    Ok(Html(views::message_page(&message, viewer.as_ref(), csrf)))
}

pub async fn delete_message(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(current): Extension<CurrentUser>,
    form: Result<Form<TokenForm>, FormRejection>,
) -> AppResult<Response> {
    let message_id = path_id(&raw_id)?;
    let message = load_message(&state, message_id)?;
    authorize(current.session.current_user_id(), message.user_id, Action::Write).check()?;
    let Form(form) = form.map_err(|e| AppError::BadRequest(e.body_text()))?;
    verify_csrf(&state.config, &current.session, form.csrf_token.as_deref())?;

    state.db.delete_message(&message_id.to_string())?;
    info!("{} deleted message {}", current.user.username, message_id);

    Ok(found(format!("/users/{}", current.user.id)))
}
