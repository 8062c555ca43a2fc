use axum::{extract::State, response::Html};
use oidc_login_axum::{OidcLoginState, SignedInUser};

use crate::AUTH_ROUTE_PREFIX;

pub(crate) async fn index(
    State(state): State<OidcLoginState>,
    user: Option<SignedInUser>,
) -> Html<String> {
    match user {
        Some(SignedInUser(user)) => {
            let name = if user.username.is_empty() {
                user.external_identity.as_str()
            } else {
                user.username.as_str()
            };
            Html(format!(
                r#"<p>Hey {name}!</p>
<p><a href="/protected">Protected page</a></p>
<p><a href="{AUTH_ROUTE_PREFIX}/logout">Logout</a></p>"#,
                name = escape(name)
            ))
        }
        None => {
            let links: String = state
                .provider_names()
                .iter()
                .map(|p| format!(r#"<li><a href="{AUTH_ROUTE_PREFIX}/{p}/login">Login with {p}</a></li>"#))
                .collect();
            Html(format!("<p>Click a login link below.</p><ul>{links}</ul>"))
        }
    }
}

pub(crate) async fn protected(SignedInUser(user): SignedInUser) -> Html<String> {
    Html(format!(
        r#"<p>Signed in as {identity}</p>
<p>Member since {created}, last login {last}</p>
<p><a href="/">Home</a></p>"#,
        identity = escape(&user.external_identity),
        created = user.created_at.format("%Y-%m-%d"),
        last = user.last_login.format("%Y-%m-%d %H:%M:%S UTC"),
    ))
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
