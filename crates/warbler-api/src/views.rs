//! Server-rendered HTML pages.

use std::fmt::Write;

use axum::http::StatusCode;

use warbler_types::models::{Message, User};

/// Escape text for use in HTML element content and quoted attributes.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

fn layout(title: &str, viewer: Option<&User>, body: &str) -> String {
    let nav = match viewer {
        Some(user) => format!(
            r#"<a href="/users/{id}">@{name}</a> <a href="/messages/new">New Message</a>
<form method="POST" action="/logout"><button>Log out</button></form>"#,
            id = user.id,
            name = escape(&user.username),
        ),
        None => r#"<a href="/signup">Sign up</a> <a href="/login">Log in</a>"#.to_string(),
    };
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title} | Warbler</title></head>
<body>
<nav><a href="/">Warbler</a> <a href="/users">Users</a> {nav}</nav>
<main>
{body}
</main>
</body>
</html>
"#,
        title = escape(title),
    )
}

fn csrf_field(token: Option<&str>) -> String {
    token
        .map(|t| format!(r#"<input type="hidden" name="csrf_token" value="{}">"#, escape(t)))
        .unwrap_or_default()
}

fn message_items(messages: &[Message]) -> String {
    if messages.is_empty() {
        return "<p>No messages yet.</p>".to_string();
    }
    let mut out = String::from("<ul class=\"messages\">\n");
    for m in messages {
        let _ = writeln!(
            out,
            r#"<li><a href="/users/{uid}">@{author}</a> <a href="/messages/{mid}">{when}</a><p>{text}</p></li>"#,
            uid = m.user_id,
            author = escape(&m.author_username),
            mid = m.id,
            when = m.created_at.format("%d %B %Y"),
            text = escape(&m.text),
        );
    }
    out.push_str("</ul>");
    out
}

fn user_items(users: &[User]) -> String {
    if users.is_empty() {
        return "<p>Nobody here yet.</p>".to_string();
    }
    let mut out = String::from("<ul class=\"users\">\n");
    for u in users {
        let _ = writeln!(
            out,
            r#"<li><a href="/users/{id}">@{name}</a></li>"#,
            id = u.id,
            name = escape(&u.username),
        );
    }
    out.push_str("</ul>");
    out
}

fn error_line(error: Option<&str>) -> String {
    error
        .map(|e| format!(r#"<p class="error">{}</p>"#, escape(e)))
        .unwrap_or_default()
}

pub fn landing() -> String {
    layout(
        "Home",
        None,
        r#"<h1>What's Happening?</h1>
<p>New to Warbler?</p>
<a href="/signup">Sign up now</a>"#,
    )
}

pub fn home_feed(viewer: &User, messages: &[Message]) -> String {
    let body = format!(
        "<h1>Welcome back, @{}</h1>\n{}",
        escape(&viewer.username),
        message_items(messages)
    );
    layout("Home", Some(viewer), &body)
}

pub fn signup_form(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Join Warbler today.</h1>
{error}
<form method="POST" action="/signup">
<input name="username" placeholder="Username">
<input name="email" type="email" placeholder="E-mail">
<input name="password" type="password" placeholder="Password">
<input name="image_url" placeholder="(Optional) Image URL">
<button>Sign me up!</button>
</form>"#,
        error = error_line(error),
    );
    layout("Sign up", None, &body)
}

pub fn login_form(error: Option<&str>) -> String {
    let body = format!(
        r#"<h1>Welcome back.</h1>
{error}
<form method="POST" action="/login">
<input name="username" placeholder="Username">
<input name="password" type="password" placeholder="Password">
<button>Log in</button>
</form>"#,
        error = error_line(error),
    );
    layout("Log in", None, &body)
}

pub fn user_list(users: &[User], query: Option<&str>, viewer: Option<&User>) -> String {
    let heading = match query {
        Some(q) if !q.is_empty() => format!("<h1>Users matching \"{}\"</h1>", escape(q)),
        _ => "<h1>Users</h1>".to_string(),
    };
    let body = format!(
        r#"{heading}
<form method="GET" action="/users"><input name="q" placeholder="Search Warbler"></form>
{items}"#,
        items = user_items(users),
    );
    layout("Users", viewer, &body)
}

pub fn user_profile(user: &User, messages: &[Message], viewer: Option<&User>) -> String {
    let mut body = format!("<h1>@{}</h1>\n", escape(&user.username));
    if let Some(url) = &user.image_url {
        let _ = writeln!(body, r#"<img src="{}" alt="">"#, escape(url));
    }
    let _ = writeln!(
        body,
        r#"<a href="/users/{id}/following">Following</a> <a href="/users/{id}/followers">Followers</a>"#,
        id = user.id,
    );
    body.push_str(&message_items(messages));
    layout(&user.username, viewer, &body)
}

/// Which side of the follow graph a list page shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowPage {
    Followers,
    Following,
}

impl FollowPage {
    fn heading(self) -> &'static str {
        match self {
            FollowPage::Followers => "Followers",
            FollowPage::Following => "Following",
        }
    }
}

pub fn follow_list(page: FollowPage, owner: &User, users: &[User], viewer: &User) -> String {
    let body = format!(
        "<h1>{heading} of @{name}</h1>\n<p>{count} {heading_lower}</p>\n{items}",
        heading = page.heading(),
        heading_lower = page.heading().to_lowercase(),
        name = escape(&owner.username),
        count = users.len(),
        items = user_items(users),
    );
    layout(page.heading(), Some(viewer), &body)
}

pub fn message_form(viewer: &User, csrf: Option<&str>) -> String {
    let body = format!(
        r#"<h1>New Message</h1>
<form method="POST" action="/messages/new">
{csrf}
<textarea name="text" maxlength="140" placeholder="What's happening?"></textarea>
<button>Add my message!</button>
</form>"#,
        csrf = csrf_field(csrf),
    );
    layout("New Message", Some(viewer), &body)
}

pub fn message_page(message: &Message, viewer: Option<&User>, csrf: Option<&str>) -> String {
    let mut body = format!(
        r#"<h1><a href="/users/{uid}">@{author}</a></h1>
<p>{text}</p>
<p>{when}</p>"#,
        uid = message.user_id,
        author = escape(&message.author_username),
        text = escape(&message.text),
        when = message.created_at.format("%d %B %Y %H:%M"),
    );
    if viewer.is_some_and(|v| v.id == message.user_id) {
        let _ = write!(
            body,
            r#"
<form method="POST" action="/messages/{id}/delete">{csrf}<button>Delete</button></form>"#,
            id = message.id,
            csrf = csrf_field(csrf),
        );
    }
    layout("Message", viewer, &body)
}

pub fn error_page(status: StatusCode, message: &str) -> String {
    let body = format!(
        "<h1>{}</h1>\n<p>{}</p>",
        status.as_u16(),
        escape(message)
    );
    layout(status.canonical_reason().unwrap_or("Error"), None, &body)
}
