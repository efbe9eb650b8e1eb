use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo::User;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Error,
    Info,
}

/// One-shot notice carried across a redirect.
#[derive(Debug, Clone, Serialize)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Success,
            message: message.into(),
        }
    }
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Error,
            message: message.into(),
        }
    }
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: FlashLevel::Info,
            message: message.into(),
        }
    }
}

struct SessionRecord {
    user_id: Option<i64>,
    flash: Vec<Flash>,
    expires_at: Instant,
}

/// In-memory session table keyed by the opaque cookie token. Sessions
/// live only as long as the process; logout removes the record and a
/// missing or expired token means Anonymous.
pub struct SessionStore {
    ttl: Duration,
    inner: RwLock<HashMap<Uuid, SessionRecord>>,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: RwLock::new(HashMap::new()),
        }
    }

    fn fresh_record(&self, user_id: Option<i64>, flash: Vec<Flash>) -> SessionRecord {
        SessionRecord {
            user_id,
            flash,
            expires_at: Instant::now() + self.ttl,
        }
    }

    fn remove_if_expired(map: &mut HashMap<Uuid, SessionRecord>, token: Uuid) {
        if map
            .get(&token)
            .is_some_and(|rec| rec.expires_at <= Instant::now())
        {
            map.remove(&token);
        }
    }

    /// Returns a live token, reusing the given one when it still
    /// resolves and creating an anonymous session otherwise.
    pub fn open(&self, token: Option<Uuid>) -> Uuid {
        let mut map = self.inner.write().expect("session lock poisoned");
        if let Some(token) = token {
            Self::remove_if_expired(&mut map, token);
            if map.contains_key(&token) {
                return token;
            }
        }
        let token = Uuid::new_v4();
        let record = self.fresh_record(None, Vec::new());
        map.insert(token, record);
        token
    }

    /// The authenticated user bound to this token, if any.
    pub fn user_id(&self, token: Uuid) -> Option<i64> {
        let mut map = self.inner.write().expect("session lock poisoned");
        Self::remove_if_expired(&mut map, token);
        map.get(&token).and_then(|rec| rec.user_id)
    }

    /// Binds a verified user to a fresh token. The old token (if any)
    /// is dropped and its pending flash carries over.
    pub fn login(&self, old_token: Option<Uuid>, user_id: i64) -> Uuid {
        let mut map = self.inner.write().expect("session lock poisoned");
        let flash = old_token
            .and_then(|t| map.remove(&t))
            .map(|rec| rec.flash)
            .unwrap_or_default();
        let token = Uuid::new_v4();
        map.insert(token, self.fresh_record(Some(user_id), flash));
        token
    }

    /// Destroys the session; the token no longer resolves afterwards.
    pub fn logout(&self, token: Uuid) {
        let mut map = self.inner.write().expect("session lock poisoned");
        map.remove(&token);
    }

    pub fn push_flash(&self, token: Uuid, flash: Flash) {
        let mut map = self.inner.write().expect("session lock poisoned");
        if let Some(rec) = map.get_mut(&token) {
            rec.flash.push(flash);
        }
    }

    /// Drains pending flash messages; a second call returns nothing.
    pub fn take_flash(&self, token: Uuid) -> Vec<Flash> {
        let mut map = self.inner.write().expect("session lock poisoned");
        map.get_mut(&token)
            .map(|rec| std::mem::take(&mut rec.flash))
            .unwrap_or_default()
    }
}

/// Login only ever follows a local path; anything else falls back to
/// the listing page.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") => n,
        _ => "/",
    }
}

/// The session cookie's token, if the request carried a parseable one.
pub struct SessionToken(pub Option<Uuid>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(&state.config.session.cookie_name)
            .and_then(|c| Uuid::parse_str(c.value()).ok());
        Ok(SessionToken(token))
    }
}

/// The session's user, if the request is authenticated. A session whose
/// user id no longer resolves to a stored user is invalidated on sight.
pub struct CurrentUser(pub Option<User>);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app = AppState::from_ref(state);
        let SessionToken(token) = match SessionToken::from_request_parts(parts, state).await {
            Ok(token) => token,
            Err(never) => match never {},
        };
        let Some(token) = token else {
            return Ok(CurrentUser(None));
        };
        let Some(user_id) = app.sessions.user_id(token) else {
            return Ok(CurrentUser(None));
        };
        match User::find_by_id(&app.db, user_id)
            .await
            .map_err(IntoResponse::into_response)?
        {
            Some(user) => Ok(CurrentUser(Some(user))),
            None => {
                warn!(user_id, "session bound to missing user, invalidating");
                app.sessions.logout(token);
                Ok(CurrentUser(None))
            }
        }
    }
}

/// Guard for admin-only routes. Anonymous requests are redirected to
/// the login page with the requested path preserved in `next`.
pub struct RequireUser(pub User);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let next = parts.uri.path().to_owned();
        match CurrentUser::from_request_parts(parts, state).await? {
            CurrentUser(Some(user)) => Ok(RequireUser(user)),
            CurrentUser(None) => {
                Err(Redirect::to(&format!("/login?next={next}")).into_response())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(300))
    }

    #[test]
    fn missing_token_is_anonymous() {
        let store = store();
        assert_eq!(store.user_id(Uuid::new_v4()), None);
    }

    #[test]
    fn login_binds_user_and_logout_destroys() {
        let store = store();
        let token = store.login(None, 7);
        assert_eq!(store.user_id(token), Some(7));
        store.logout(token);
        assert_eq!(store.user_id(token), None);
    }

    #[test]
    fn login_rotates_the_token() {
        let store = store();
        let anon = store.open(None);
        let authed = store.login(Some(anon), 3);
        assert_ne!(anon, authed);
        assert_eq!(store.user_id(anon), None);
        assert_eq!(store.user_id(authed), Some(3));
    }

    #[test]
    fn login_carries_pending_flash_over() {
        let store = store();
        let anon = store.open(None);
        store.push_flash(anon, Flash::success("registered"));
        let authed = store.login(Some(anon), 1);
        let flash = store.take_flash(authed);
        assert_eq!(flash.len(), 1);
        assert_eq!(flash[0].message, "registered");
    }

    #[test]
    fn flash_is_read_once() {
        let store = store();
        let token = store.open(None);
        store.push_flash(token, Flash::info("logged out"));
        assert_eq!(store.take_flash(token).len(), 1);
        assert!(store.take_flash(token).is_empty());
    }

    #[test]
    fn expired_sessions_resolve_to_anonymous() {
        let store = SessionStore::new(Duration::ZERO);
        let token = store.login(None, 5);
        assert_eq!(store.user_id(token), None);
    }

    #[test]
    fn open_reuses_a_live_token() {
        let store = store();
        let token = store.open(None);
        assert_eq!(store.open(Some(token)), token);
    }

    #[test]
    fn safe_next_only_follows_local_paths() {
        assert_eq!(safe_next(Some("/admin/add_project")), "/admin/add_project");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
