// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token authentication.
//!
//! [`authenticate`] runs on every route. A request without a token stays
//! anonymous; one with a bad token is rejected. Handlers then pick the
//! extractor matching their access level.

use crate::error::AppError;
use crate::models::Caller;
use crate::services::TokenError;
use crate::AppState;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Cookie carrying the ID token for server-rendered pages.
pub const SESSION_COOKIE: &str = "__session";

/// Middleware that verifies the caller's ID token, if any, and stores the
/// resulting [`Caller`] in the request extensions.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(token) = token_from(request.headers(), &jar) else {
        return Ok(next.run(request).await);
    };

    let identity = state
        .token_verifier
        .verify(&token)
        .await
        .map_err(|e| match e {
            TokenError::Invalid(reason) => {
                tracing::debug!(reason = %reason, "Rejected ID token");
                AppError::InvalidToken
            }
            TokenError::Transient(reason) => {
                AppError::Internal(anyhow::anyhow!("token verification unavailable: {reason}"))
            }
        })?;

    // The allow-list only trusts addresses Firebase has verified
    let is_admin = identity.admin_claim
        || (identity.email_verified
            && identity
                .email
                .as_deref()
                .is_some_and(|email| state.config.admins.allows(email)));

    request.extensions_mut().insert(Caller {
        uid: identity.uid,
        email: identity.email,
        is_admin,
    });

    Ok(next.run(request).await)
}

/// Bearer header first, then the session cookie.
fn token_from(headers: &HeaderMap, jar: &CookieJar) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// The caller, if authenticated.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

impl<S: Send + Sync> FromRequestParts<S> for MaybeCaller {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeCaller(parts.extensions.get::<Caller>().cloned()))
    }
}

/// An authenticated caller; `AUTH_REQUIRED` otherwise.
#[derive(Debug, Clone)]
pub struct RequireCaller(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for RequireCaller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .map(RequireCaller)
            .ok_or(AppError::AuthRequired)
    }
}

/// An authenticated administrator.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub Caller);

impl<S: Send + Sync> FromRequestParts<S> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireCaller(caller) = RequireCaller::from_request_parts(parts, state).await?;
        if !caller.is_admin {
            return Err(AppError::PermissionDenied(
                "administrator access required".to_string(),
            ));
        }
        Ok(RequireAdmin(caller))
    }
}
