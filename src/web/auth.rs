//! Login, registration and logout
//!
//! A successful login stores a server-side session and hands its token to
//! the browser in an HttpOnly `session` cookie.

use axum::{
    extract::{OriginalUri, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Redirect, Response},
    Form,
};

use crate::models::Session;
use crate::services::{LoginInput, RegisterInput, UserServiceError};

use super::common::NextQuery;
use super::forms::{safe_next, FormErrors, LoginForm, RegistrationForm};
use super::middleware::{extract_session_token, AppState, Viewer, SESSION_COOKIE};
use super::responses::{page_context, render, see_other, HandlerResult};

fn session_cookie(session: &Session, days: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        session.id,
        days * 24 * 60 * 60
    )
}

fn cleared_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// GET /auth/login/
pub async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Query(query): Query<NextQuery>,
) -> HandlerResult {
    let form = LoginForm {
        next: query.next.unwrap_or_default(),
        ..LoginForm::default()
    };
    render_login(&state, &viewer, uri.path(), &form, &FormErrors::default())
}

/// POST /auth/login/
pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<LoginForm>,
) -> HandlerResult {
    if let Err(errors) = form.validate() {
        return render_login(&state, &viewer, uri.path(), &form, &errors);
    }

    match state
        .user_service
        .login(LoginInput::new(form.username.clone(), form.password.clone()))
        .await
    {
        Ok(session) => {
            let cookie = session_cookie(&session, state.user_service.session_expiration_days());
            let next = safe_next(Some(form.next.as_str()).filter(|n| !n.is_empty()));
            Ok(([(header::SET_COOKIE, cookie)], Redirect::to(next)).into_response())
        }
        Err(UserServiceError::AuthenticationError(message)) => {
            render_login(&state, &viewer, uri.path(), &form, &FormErrors::non_field(message))
        }
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/logout/
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> HandlerResult {
    if let Some(token) = extract_session_token(&headers) {
        state.user_service.logout(&token).await?;
    }
    Ok(([(header::SET_COOKIE, cleared_cookie())], Redirect::to("/")).into_response())
}

/// GET /auth/registration/
pub async fn registration_form(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
) -> HandlerResult {
    render_registration(&state, &viewer, uri.path(), &RegistrationForm::default(), &FormErrors::default())
}

/// POST /auth/registration/ - on success the new user is sent to log in
pub async fn register(
    State(state): State<AppState>,
    viewer: Viewer,
    OriginalUri(uri): OriginalUri,
    Form(form): Form<RegistrationForm>,
) -> HandlerResult {
    let (username, email, password) = match form.validate() {
        Ok(fields) => fields,
        Err(errors) => return render_registration(&state, &viewer, uri.path(), &form, &errors),
    };

    match state
        .user_service
        .register(RegisterInput::new(username, email, password))
        .await
    {
        Ok(_) => Ok(see_other("/auth/login/")),
        Err(UserServiceError::UserExists(_)) => {
            let mut errors = FormErrors::default();
            errors.add("username", "Пользователь с таким именем уже существует.");
            render_registration(&state, &viewer, uri.path(), &form, &errors)
        }
        Err(UserServiceError::ValidationError(message)) => {
            render_registration(&state, &viewer, uri.path(), &form, &FormErrors::non_field(message))
        }
        Err(e) => Err(e.into()),
    }
}

fn render_login(
    state: &AppState,
    viewer: &Viewer,
    path: &str,
    form: &LoginForm,
    errors: &FormErrors,
) -> HandlerResult<Response> {
    let mut ctx = page_context(viewer.user(), path);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(render(state, "registration/login.html", &ctx)?.into_response())
}

fn render_registration(
    state: &AppState,
    viewer: &Viewer,
    path: &str,
    form: &RegistrationForm,
    errors: &FormErrors,
) -> HandlerResult<Response> {
    let mut ctx = page_context(viewer.user(), path);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    Ok(render(state, "registration/registration_form.html", &ctx)?.into_response())
}
