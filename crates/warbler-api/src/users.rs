use axum::{
    Extension, Form,
    extract::{Path, Query, State},
    response::{Html, Response},
};
use axum_extra::extract::cookie::CookieJar;
use tracing::{info, warn};
use uuid::Uuid;

use warbler_types::api::{TokenForm, UserSearch};
use warbler_types::models::{Message, User};

use crate::auth::{AppState, AppStateInner};
use crate::error::{AppError, AppResult, found};
use crate::guard::{Action, authorize};
use crate::session::{CurrentUser, Session, verify_csrf};
use crate::views::{self, FollowPage};

/// Most messages shown on a profile page.
const PROFILE_MESSAGE_LIMIT: u32 = 100;

/// Parse an id taken from the URL. Anything that is not a UUID names no row, so 404.
pub(crate) fn path_id(raw: &str) -> AppResult<Uuid> {
    raw.parse::<Uuid>().map_err(|_| AppError::NotFound)
}

/// Resolve a user by id, mapping a missing row to 404.
pub(crate) fn load_user(state: &AppStateInner, id: Uuid) -> AppResult<User> {
    let row = state
        .db
        .get_user_by_id(&id.to_string())?
        .ok_or(AppError::NotFound)?;
    Ok(User::try_from(row)?)
}

/// The logged-in user on public pages, if any. Stale sessions count as anonymous.
pub(crate) fn optional_viewer(state: &AppStateInner, jar: &CookieJar) -> AppResult<Option<User>> {
    let session = Session::from_jar(jar, &state.config.secret_key);
    let Some(id) = session.current_user_id() else {
        return Ok(None);
    };
    match state.db.get_user_by_id(&id.to_string())? {
        Some(row) => Ok(Some(User::try_from(row)?)),
        None => Ok(None),
    }
}

fn to_users(rows: Vec<warbler_db::models::UserRow>) -> AppResult<Vec<User>> {
    rows.into_iter()
        .map(|row| User::try_from(row).map_err(AppError::from))
        .collect()
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(search): Query<UserSearch>,
    jar: CookieJar,
) -> AppResult<Html<String>> {
    let query = search.q.as_deref().map(str::trim).filter(|q| !q.is_empty());
    let users = to_users(state.db.search_users(query)?)?;
    let viewer = optional_viewer(&state, &jar)?;
    Ok(Html(views::user_list(&users, query, viewer.as_ref())))
}

pub async fn show_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    jar: CookieJar,
) -> AppResult<Html<String>> {
    let user_id = path_id(&raw_id)?;
    let user = load_user(&state, user_id)?;
    let messages = state
        .db
        .get_messages_for_user(&user_id.to_string(), PROFILE_MESSAGE_LIMIT)?
        .into_iter()
        .map(Message::try_from)
        .collect::<anyhow::Result<Vec<_>>>()?;
    let viewer = optional_viewer(&state, &jar)?;
    Ok(Html(views::user_profile(&user, &messages, viewer.as_ref())))
}

/// Any logged-in user may view anyone's followers.
pub async fn show_followers(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let user_id = path_id(&raw_id)?;
    authorize(current.session.current_user_id(), user_id, Action::Read).check()?;
    let owner = load_user(&state, user_id)?;
    let followers = to_users(state.db.get_followers(&user_id.to_string())?)?;
    Ok(Html(views::follow_list(
        FollowPage::Followers,
        &owner,
        &followers,
        &current.user,
    )))
}

pub async fn show_following(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(current): Extension<CurrentUser>,
) -> AppResult<Html<String>> {
    let user_id = path_id(&raw_id)?;
    authorize(current.session.current_user_id(), user_id, Action::Read).check()?;
    let owner = load_user(&state, user_id)?;
    let following = to_users(state.db.get_following(&user_id.to_string())?)?;
    Ok(Html(views::follow_list(
        FollowPage::Following,
        &owner,
        &following,
        &current.user,
    )))
}

pub async fn follow(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<TokenForm>,
) -> AppResult<Response> {
    let followee_id = path_id(&raw_id)?;
    verify_csrf(&state.config, &current.session, form.csrf_token.as_deref())?;
    if followee_id == current.user.id {
        return Err(AppError::BadRequest("You cannot follow yourself.".into()));
    }
    let followee = load_user(&state, followee_id)?;

    if state
        .db
        .follow(&current.user.id.to_string(), &followee_id.to_string())?
    {
        info!("{} now follows {}", current.user.username, followee.username);
    }

    Ok(found(format!("/users/{}/following", current.user.id)))
}

pub async fn stop_following(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Extension(current): Extension<CurrentUser>,
    Form(form): Form<TokenForm>,
) -> AppResult<Response> {
    let followee_id = path_id(&raw_id)?;
    verify_csrf(&state.config, &current.session, form.csrf_token.as_deref())?;

    if !state
        .db
        .unfollow(&current.user.id.to_string(), &followee_id.to_string())?
    {
        warn!("{} was not following {}", current.user.username, followee_id);
    }

    Ok(found(format!("/users/{}/following", current.user.id)))
}
