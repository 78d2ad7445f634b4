use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::{debug, warn};

use crate::application::auth::{AuthError, TokenError};

use super::error::{ApiError, codes};
use super::rate_limit::RateDecision;
use super::state::{ApiState, CurrentUser};

const RATE_LIMIT_HEADER: &str = "x-ratelimit-remaining";

pub async fn require_auth(
    State(state): State<ApiState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = extract_token(request.headers().get(header::AUTHORIZATION)) else {
        return ApiError::unauthorized().into_response();
    };

    let user = match state.auth.authenticate(&token).await {
        Ok(user) => user,
        Err(AuthError::Token(TokenError::Expired)) => {
            return ApiError::new(
                StatusCode::UNAUTHORIZED,
                codes::TOKEN_EXPIRED,
                "Token expired",
                None,
            )
            .into_response();
        }
        Err(AuthError::Token(_) | AuthError::UnknownSubject) => {
            return ApiError::unauthorized().into_response();
        }
        Err(err) => {
            warn!(
                target: "articles::api::auth",
                error = %err,
                "token verification failed"
            );
            return ApiError::internal(err.to_string()).into_response();
        }
    };

    debug!(target: "articles::api::auth", user_id = %user.id, "authenticated request");
    let current = CurrentUser::from(user);
    request.extensions_mut().insert(current.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(current);
    response
}

pub async fn api_rate_limit(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_key(&request);

    match state.rate_limiter.check(&client) {
        RateDecision::Allowed { remaining } => {
            let mut response = next.run(request).await;
            if let Ok(value) = HeaderValue::from_str(&remaining.to_string()) {
                response.headers_mut().insert(RATE_LIMIT_HEADER, value);
            }
            response
        }
        RateDecision::Limited { retry_after } => {
            counter!("articles_rate_limited_total").increment(1);
            ApiError::rate_limited(retry_after.as_secs().max(1))
        }
    }
}

/// Prefer the socket peer; fall back to the first forwarded hop.
fn client_key(request: &Request<Body>) -> String {
    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    forwarded_for(request.headers()).unwrap_or_else(|| "anonymous".to_string())
}

fn forwarded_for(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get("x-forwarded-for")?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

fn extract_token(header: Option<&HeaderValue>) -> Option<String> {
    let raw = header?.to_str().ok()?;
    let bearer = raw.strip_prefix("Bearer ")?.trim();
    (!bearer.is_empty()).then(|| bearer.to_string())
}
