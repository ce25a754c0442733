//! Account routes and the session extractor

use crate::app::AppState;
use crate::database::UserId;
use crate::error::{AppError, Result};
use axum::extract::{FromRequestParts, State};
use axum::http::request::Parts;
use axum::response::Redirect;
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};

pub const SESSION_COOKIE: &str = "notehub_session";

/// The logged-in user of the current request.
///
/// Rejects with `Unauthenticated` when the request carries no live session.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: UserId,
    pub token: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string())
            .ok_or(AppError::Unauthenticated)?;

        let user_id = state
            .sessions
            .resolve(&token)
            .await
            .ok_or(AppError::Unauthenticated)?;

        Ok(CurrentUser { user_id, token })
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Fields a client must post to an account route
#[derive(Debug, Serialize)]
pub struct FormDescription {
    pub action: &'static str,
    pub method: &'static str,
    pub fields: &'static [&'static str],
}

/// Target of the post-registration and login-required redirects
pub async fn login_form() -> Json<FormDescription> {
    Json(FormDescription {
        action: "/login",
        method: "POST",
        fields: &["email", "password"],
    })
}

pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> Result<Redirect> {
    state
        .identity
        .register(&form.name, &form.email, &form.password)
        .await?;

    Ok(Redirect::to("/login"))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<(CookieJar, Redirect)> {
    let user = state.identity.authenticate(&form.email, &form.password).await?;
    let token = state.sessions.open(user.id).await;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), Redirect::to("/")))
}

pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> (CookieJar, Redirect) {
    state.sessions.close(&user.token).await;

    (jar.remove(Cookie::build(SESSION_COOKIE).path("/")), Redirect::to("/"))
}

/// Delete the caller's account with all of its notes
pub async fn delete_account(
    State(state): State<AppState>,
    user: CurrentUser,
    jar: CookieJar,
) -> Result<(CookieJar, Redirect)> {
    state.identity.delete_user(user.user_id, &state.catalog).await?;
    state.sessions.close_all_for(user.user_id).await;

    Ok((jar.remove(Cookie::build(SESSION_COOKIE).path("/")), Redirect::to("/")))
}
