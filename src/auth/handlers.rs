use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect},
    routing::get,
    Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginForm, NextQuery, RegisterForm},
        password::{hash_password, verify_password},
        repo::User,
        session::{safe_next, Flash, RequireUser, SessionToken},
    },
    error::AppError,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

/// Payload standing in for a rendered form page.
#[derive(Debug, Serialize)]
struct FormPage {
    title: &'static str,
    flash: Vec<Flash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next: Option<String>,
}

fn session_cookie(name: String, token: Uuid) -> Cookie<'static> {
    Cookie::build((name, token.to_string()))
        .path("/")
        .http_only(true)
        .build()
}

#[instrument(skip(state))]
async fn register_page(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
) -> Json<FormPage> {
    let flash = token
        .map(|t| state.sessions.take_flash(t))
        .unwrap_or_default();
    Json(FormPage {
        title: "Register",
        flash,
        next: None,
    })
}

#[instrument(skip(state, jar, form))]
async fn register(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Result<impl IntoResponse, AppError> {
    let valid = form.validate().map_err(AppError::Validation)?;

    let hash = hash_password(&valid.password)?;
    let user = User::create(&state.db, &valid.full_name, &valid.email, &hash).await?;

    let token = state.sessions.open(token);
    state.sessions.push_flash(
        token,
        Flash::success(format!(
            "Thanks {}, you are now registered! Please log in.",
            user.full_name
        )),
    );
    info!(user_id = user.id, email = %user.email, "user registered");

    let jar = jar.add(session_cookie(state.config.session.cookie_name.clone(), token));
    Ok((jar, Redirect::to("/login")))
}

#[instrument(skip(state))]
async fn login_page(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    Query(query): Query<NextQuery>,
) -> Json<FormPage> {
    let flash = token
        .map(|t| state.sessions.take_flash(t))
        .unwrap_or_default();
    Json(FormPage {
        title: "Login",
        flash,
        next: query.next,
    })
}

#[instrument(skip(state, jar, form))]
async fn login(
    State(state): State<AppState>,
    SessionToken(token): SessionToken,
    jar: CookieJar,
    Query(query): Query<NextQuery>,
    Form(form): Form<LoginForm>,
) -> Result<impl IntoResponse, AppError> {
    let valid = form.validate().map_err(AppError::Validation)?;

    // Unknown email and wrong password both collapse into the same
    // generic outcome.
    let Some(user) = User::find_by_email(&state.db, &valid.email).await? else {
        warn!(email = %valid.email, "login unknown email");
        return Err(AppError::InvalidCredentials);
    };
    if !verify_password(&valid.password, &user.password_hash)? {
        warn!(email = %valid.email, user_id = user.id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.sessions.login(token, user.id);
    state.sessions.push_flash(
        token,
        Flash::success(format!("Welcome back, {}!", user.full_name)),
    );
    info!(user_id = user.id, email = %user.email, "user logged in");

    let jar = jar.add(session_cookie(state.config.session.cookie_name.clone(), token));
    Ok((jar, Redirect::to(safe_next(query.next.as_deref()))))
}

#[instrument(skip(state, user, jar))]
async fn logout(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    SessionToken(token): SessionToken,
    jar: CookieJar,
) -> impl IntoResponse {
    if let Some(token) = token {
        state.sessions.logout(token);
    }
    // Fresh anonymous session so the notice survives the redirect.
    let anon = state.sessions.open(None);
    state
        .sessions
        .push_flash(anon, Flash::info("You have been logged out."));
    info!(user_id = user.id, "user logged out");

    let jar = jar.add(session_cookie(state.config.session.cookie_name.clone(), anon));
    (jar, Redirect::to("/"))
}
