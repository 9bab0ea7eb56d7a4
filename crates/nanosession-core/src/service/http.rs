//! Minimal web app wired through the session manager: `/`, `/login`,
//! `/logout`. Handlers only open, mutate and close sessions; the lifecycle
//! rules all live in [`SessionManager`].

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::SessionError;
use crate::session::{Session, SessionManager};

/// Shared application state for the HTTP app.
pub struct AppState {
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(sessions: SessionManager) -> Self {
        Self { sessions }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub store: String,
}

const LOGIN_PAGE: &str = r#"<!doctype html>
<html>
<head><title>Login</title></head>
<body>
<h2>Login</h2>
<form action="/login" method="post">
  <p><input type=text name=username>
  <p><input type=submit value=Login>
</form>
</body>
</html>
"#;

/// Create the axum Router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handle_index))
        .route("/login", get(handle_login_page).post(handle_login))
        .route("/logout", get(handle_logout))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /: who is logged in
async fn handle_index(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let session = match open_session(&state, &headers).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    let body = match session.get_as::<String>(state.sessions.principal_key()) {
        Some(user) => format!("Logged in as {}", user),
        None => "You are not logged in".to_string(),
    };
    finish(&state, session, body.into_response()).await
}

/// GET /login: login form
async fn handle_login_page() -> Html<&'static str> {
    Html(LOGIN_PAGE)
}

/// POST /login: bind the submitted username to a fresh session
async fn handle_login(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let username = form.username.trim();
    if username.is_empty() {
        return (StatusCode::BAD_REQUEST, "username is required").into_response();
    }

    let mut session = match open_session(&state, &headers).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    session.clear();
    session.login(state.sessions.principal_key(), username);
    info!("Login as {}", username);

    finish(&state, session, Redirect::to("/").into_response()).await
}

/// GET /logout: drop the session
async fn handle_logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let mut session = match open_session(&state, &headers).await {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    session.clear();
    finish(&state, session, Redirect::to("/").into_response()).await
}

/// GET /health
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        store: state.sessions.store().name().to_string(),
    })
}

async fn open_session(state: &AppState, headers: &HeaderMap) -> Result<Session, Response> {
    let cookie_header = cookie_header(headers);
    state
        .sessions
        .open(cookie_header.as_deref())
        .await
        .map_err(error_response)
}

/// Close the session and attach its cookie to `response`.
async fn finish(state: &AppState, session: Session, mut response: Response) -> Response {
    let outcome = match state.sessions.close(session).await {
        Ok(o) => o,
        Err(e) => return error_response(e),
    };
    if let Some(set_cookie) = outcome.set_cookie_header() {
        match HeaderValue::from_str(&set_cookie) {
            Ok(v) => {
                response.headers_mut().append(header::SET_COOKIE, v);
            }
            Err(e) => warn!("Unrenderable session cookie: {}", e),
        }
    }
    response
}

/// Join every `Cookie` header; HTTP/2 clients may split them.
fn cookie_header(headers: &HeaderMap) -> Option<String> {
    let parts: Vec<&str> = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("; "))
    }
}

fn error_response(err: SessionError) -> Response {
    warn!("Session error: {}", err);
    let status = match err {
        SessionError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, "session store unavailable").into_response()
}

/// Start the HTTP server.
pub async fn serve(addr: &str, state: Arc<AppState>) -> anyhow::Result<()> {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, router).await?;
    Ok(())
}
