//! Login routes

use axum::{
    Json, Router,
    extract::{Form, Path, Query, State},
    routing::get,
};
use axum_extra::{TypedHeader, headers};
use http::{HeaderMap, HeaderValue, StatusCode, header::LOCATION};

use oidc_login::{CallbackParams, User, UtilError};

use super::config::{OIDC_REDIRECT_AFTER_LOGIN, OIDC_REDIRECT_AFTER_LOGOUT};
use super::error::IntoResponseError;
use super::session::{
    SignedInUser, clear_session_cookie, session_id_from_cookies, set_session_cookie,
};
use super::state::OidcLoginState;

/// Routes for every provider registered on `state`:
///
/// - `GET /{provider}/login` redirects to the issuer
/// - `GET|POST /{provider}/callback` finishes the login
/// - `GET|POST /logout` signs the browser out
/// - `GET /user` returns the signed-in user as JSON
pub fn oidc_login_router(state: OidcLoginState) -> Router {
    Router::new()
        .route("/{provider}/login", get(login))
        .route(
            "/{provider}/callback",
            get(callback_query).post(callback_form),
        )
        .route("/logout", get(logout).post(logout))
        .route("/user", get(current_user))
        .with_state(state)
}

fn internal(e: UtilError) -> (StatusCode, String) {
    tracing::error!(error = %e, "Session id generation failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

/// 302 Found to `location`, carrying any cookies already in `headers`.
fn found(
    mut headers: HeaderMap,
    location: &str,
) -> Result<(StatusCode, HeaderMap), (StatusCode, String)> {
    let value = HeaderValue::from_str(location)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.insert(LOCATION, value);
    Ok((StatusCode::FOUND, headers))
}

fn unknown_provider(provider: &str) -> (StatusCode, String) {
    tracing::debug!(provider, "Request for unknown provider");
    (StatusCode::NOT_FOUND, "Unknown provider".to_string())
}

async fn login(
    State(state): State<OidcLoginState>,
    Path(provider): Path<String>,
    cookies: Option<TypedHeader<headers::Cookie>>,
) -> Result<(StatusCode, HeaderMap), (StatusCode, String)> {
    let orchestrator = state
        .orchestrator(&provider)
        .ok_or_else(|| unknown_provider(&provider))?;

    let cookie_id = session_id_from_cookies(cookies.as_deref());
    let (session_id, session, created) = state
        .sessions()
        .get_or_create(cookie_id.as_deref())
        .await
        .map_err(internal)?;

    let auth_url = orchestrator
        .login(&session)
        .await
        .into_response_error()?;

    let mut headers = HeaderMap::new();
    if created {
        set_session_cookie(&mut headers, &session_id, state.sessions().max_age())?;
    }
    found(headers, &auth_url)
}

async fn callback_query(
    state: State<OidcLoginState>,
    provider: Path<String>,
    cookies: Option<TypedHeader<headers::Cookie>>,
    Query(params): Query<CallbackParams>,
) -> Result<(StatusCode, HeaderMap), (StatusCode, String)> {
    finish_login(state, provider, cookies, params).await
}

/// Callback delivered with `response_mode=form_post`.
///
/// The session cookie is `SameSite=Lax`, so a cross-site POST from the
/// issuer arrives without it and the login fails the state check.
async fn callback_form(
    state: State<OidcLoginState>,
    provider: Path<String>,
    cookies: Option<TypedHeader<headers::Cookie>>,
    Form(params): Form<CallbackParams>,
) -> Result<(StatusCode, HeaderMap), (StatusCode, String)> {
    finish_login(state, provider, cookies, params).await
}

async fn finish_login(
    State(state): State<OidcLoginState>,
    Path(provider): Path<String>,
    cookies: Option<TypedHeader<headers::Cookie>>,
    params: CallbackParams,
) -> Result<(StatusCode, HeaderMap), (StatusCode, String)> {
    let orchestrator = state
        .orchestrator(&provider)
        .ok_or_else(|| unknown_provider(&provider))?;

    let cookie_id = session_id_from_cookies(cookies.as_deref());
    let known = match cookie_id.as_deref() {
        Some(id) => state.sessions().get(id).await.map(|s| (id.to_string(), s)),
        None => None,
    };

    let Some((session_id, session)) = known else {
        // No session means no pending login to check the callback against.
        tracing::warn!(provider = %provider, "Callback without a live session");
        return Err((
            StatusCode::BAD_REQUEST,
            "Login failed. Please try again.".to_string(),
        ));
    };

    orchestrator
        .callback(&params, &session)
        .await
        .into_response_error()?;

    let new_id = state
        .sessions()
        .rotate(&session_id)
        .await
        .map_err(internal)?;

    let mut headers = HeaderMap::new();
    set_session_cookie(&mut headers, &new_id, state.sessions().max_age())?;
    found(headers, OIDC_REDIRECT_AFTER_LOGIN.as_str())
}

async fn logout(
    State(state): State<OidcLoginState>,
    cookies: Option<TypedHeader<headers::Cookie>>,
) -> Result<(StatusCode, HeaderMap), (StatusCode, String)> {
    if let Some(id) = session_id_from_cookies(cookies.as_deref()) {
        if let Some(session) = state.sessions().get(&id).await {
            state.logout(&session).await.into_response_error()?;
        }
        state.sessions().remove(&id).await;
    }

    let mut headers = HeaderMap::new();
    clear_session_cookie(&mut headers)?;
    found(headers, OIDC_REDIRECT_AFTER_LOGOUT.as_str())
}

async fn current_user(SignedInUser(user): SignedInUser) -> Json<User> {
    Json(user)
}
