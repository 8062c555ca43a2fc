use axum::{
    RequestPartsExt,
    extract::{FromRequestParts, OptionalFromRequestParts},
    response::{IntoResponse, Response},
};
use axum_extra::{TypedHeader, headers};
use chrono::{DateTime, Duration, Utc};
use http::{HeaderMap, HeaderValue, StatusCode, header::SET_COOKIE, request::Parts};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::Mutex;

use oidc_login::{MemorySession, User, UtilError, gen_random_string};

use super::config::{
    OIDC_SESSION_COOKIE_NAME, OIDC_SESSION_COOKIE_SECURE, OIDC_SESSION_MAX_AGE,
};
use super::state::OidcLoginState;

struct SessionEntry {
    session: MemorySession,
    expires_at: DateTime<Utc>,
}

impl SessionEntry {
    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// Server-side sessions keyed by the id in the session cookie.
///
/// Each entry lives for `max_age` seconds from creation, or from sign-in once
/// its id is rotated. Expired entries are never returned and are dropped
/// whenever a new entry is inserted.
///
/// Entries live in process memory, so this suits a single instance only.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, SessionEntry>>>,
    max_age: u64,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_max_age(*OIDC_SESSION_MAX_AGE)
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_age(max_age: u64) -> Self {
        Self {
            sessions: Arc::default(),
            max_age,
        }
    }

    /// Session lifetime in seconds, also used as the cookie `Max-Age`.
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    fn new_entry(&self, session: MemorySession, now: DateTime<Utc>) -> SessionEntry {
        let expires_at = i64::try_from(self.max_age)
            .ok()
            .and_then(Duration::try_seconds)
            .and_then(|age| now.checked_add_signed(age))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        SessionEntry {
            session,
            expires_at,
        }
    }

    fn insert(
        sessions: &mut HashMap<String, SessionEntry>,
        id: String,
        entry: SessionEntry,
        now: DateTime<Utc>,
    ) {
        let before = sessions.len();
        sessions.retain(|_, entry| entry.is_live(now));
        let pruned = before - sessions.len();
        if pruned > 0 {
            tracing::debug!(pruned, "Dropped expired sessions");
        }
        sessions.insert(id, entry);
    }

    pub async fn get(&self, session_id: &str) -> Option<MemorySession> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        match sessions.get(session_id) {
            Some(entry) if entry.is_live(now) => Some(entry.session.clone()),
            Some(_) => {
                tracing::debug!("Session expired");
                sessions.remove(session_id);
                None
            }
            None => None,
        }
    }

    /// The session named by the cookie, or a fresh one. The flag is true when
    /// the session was created here and its cookie still has to be set.
    pub async fn get_or_create(
        &self,
        session_id: Option<&str>,
    ) -> Result<(String, MemorySession, bool), UtilError> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;

        if let Some(id) = session_id {
            match sessions.get(id) {
                Some(entry) if entry.is_live(now) => {
                    return Ok((id.to_string(), entry.session.clone(), false));
                }
                Some(_) => tracing::debug!("Session expired, starting a new session"),
                None => tracing::debug!("Unknown session id in cookie, starting a new session"),
            }
        }

        let id = gen_random_string(32)?;
        let session = MemorySession::new();
        Self::insert(&mut sessions, id.clone(), self.new_entry(session.clone(), now), now);
        Ok((id, session, true))
    }

    /// Move a session to a fresh id with a fresh lifetime, so an id planted
    /// before sign-in is useless afterwards.
    pub async fn rotate(&self, session_id: &str) -> Result<String, UtilError> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .remove(session_id)
            .map(|entry| entry.session)
            .unwrap_or_default();
        let new_id = gen_random_string(32)?;
        Self::insert(&mut sessions, new_id.clone(), self.new_entry(session, now), now);
        Ok(new_id)
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.lock().await.remove(session_id);
    }

    /// Number of stored entries, expired ones not yet pruned included.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

pub(crate) fn session_id_from_cookies(cookies: Option<&headers::Cookie>) -> Option<String> {
    cookies
        .and_then(|c| c.get(OIDC_SESSION_COOKIE_NAME.as_str()))
        .map(str::to_string)
}

fn cookie_value(session_id: &str, max_age: u64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax",
        OIDC_SESSION_COOKIE_NAME.as_str(),
        session_id
    );
    if *OIDC_SESSION_COOKIE_SECURE {
        cookie.push_str("; Secure");
    }
    cookie.push_str(&format!("; Max-Age={max_age}"));
    cookie
}

pub(crate) fn set_session_cookie(
    headers: &mut HeaderMap,
    session_id: &str,
    max_age: u64,
) -> Result<(), (StatusCode, String)> {
    let value = HeaderValue::from_str(&cookie_value(session_id, max_age))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

pub(crate) fn clear_session_cookie(headers: &mut HeaderMap) -> Result<(), (StatusCode, String)> {
    let value = HeaderValue::from_str(&cookie_value("", 0))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// The signed-in user, available as an axum extractor on routes that share
/// [`OidcLoginState`].
///
/// Requests without a signed-in session are rejected with 401.
#[derive(Clone, Debug)]
pub struct SignedInUser(pub User);

pub struct Unauthorized;

impl IntoResponse for Unauthorized {
    fn into_response(self) -> Response {
        (StatusCode::UNAUTHORIZED, "Unauthorized").into_response()
    }
}

impl FromRequestParts<OidcLoginState> for SignedInUser {
    type Rejection = Unauthorized;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &OidcLoginState,
    ) -> Result<Self, Self::Rejection> {
        let cookies: TypedHeader<headers::Cookie> = parts.extract().await.map_err(|_| {
            tracing::debug!("No cookies on request");
            Unauthorized
        })?;

        let session_id = session_id_from_cookies(Some(&cookies)).ok_or(Unauthorized)?;
        let session = state.sessions().get(&session_id).await.ok_or_else(|| {
            tracing::debug!("Session cookie names no live session");
            Unauthorized
        })?;

        match state.current_user(&session).await {
            Ok(Some(user)) => Ok(SignedInUser(user)),
            Ok(None) => Err(Unauthorized),
            Err(e) => {
                tracing::error!(error = %e, "Failed to resolve signed-in user");
                Err(Unauthorized)
            }
        }
    }
}

impl OptionalFromRequestParts<OidcLoginState> for SignedInUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &OidcLoginState,
    ) -> Result<Option<Self>, Self::Rejection> {
        Ok(
            <SignedInUser as FromRequestParts<OidcLoginState>>::from_request_parts(parts, state)
                .await
                .ok(),
        )
    }
}
