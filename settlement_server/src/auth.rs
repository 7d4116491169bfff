//! Principal resolution.
//!
//! The server does not authenticate callers itself. An identity proxy in front of it resolves the caller and forwards
//! the result in three headers:
//! * `X-Principal-Id` - the caller's user id.
//! * `X-Principal-Roles` - a comma-separated list of `buyer`, `seller` and `admin`.
//! * `X-Principal-Store` - optional. The store a seller acts for.
use std::{
    future::{ready, Ready},
    ops::Deref,
};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use log::debug;
use settlement_engine::db_types::{Principal, Role};

use crate::errors::{AuthError, ServerError};

pub const PRINCIPAL_ID_HEADER: &str = "X-Principal-Id";
pub const PRINCIPAL_ROLES_HEADER: &str = "X-Principal-Roles";
pub const PRINCIPAL_STORE_HEADER: &str = "X-Principal-Store";

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<Option<&'a str>, AuthError> {
    match headers.get(name) {
        None => Ok(None),
        Some(v) => v
            .to_str()
            .map(|s| Some(s.trim()).filter(|s| !s.is_empty()))
            .map_err(|e| AuthError::PoorlyFormattedPrincipal(format!("{name}: {e}"))),
    }
}

pub fn principal_from_headers(headers: &HeaderMap) -> Result<Principal, AuthError> {
    let id = header_value(headers, PRINCIPAL_ID_HEADER)?.ok_or(AuthError::MissingPrincipal)?;
    let roles = header_value(headers, PRINCIPAL_ROLES_HEADER)?
        .ok_or_else(|| AuthError::PoorlyFormattedPrincipal(format!("{PRINCIPAL_ROLES_HEADER} is missing")))?
        .split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| s.parse::<Role>().map_err(|e| AuthError::PoorlyFormattedPrincipal(e.to_string())))
        .collect::<Result<Vec<Role>, AuthError>>()?;
    let mut principal = Principal::new(id, &roles);
    if let Some(store_id) = header_value(headers, PRINCIPAL_STORE_HEADER)? {
        principal = principal.with_store(store_id);
    }
    Ok(principal)
}

/// The caller of a request, as resolved by the identity proxy.
#[derive(Debug, Clone)]
pub struct AuthenticatedPrincipal(pub Principal);

impl Deref for AuthenticatedPrincipal {
    type Target = Principal;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromRequest for AuthenticatedPrincipal {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = principal_from_headers(req.headers()).map(AuthenticatedPrincipal).map_err(|e| {
            debug!("💻️ Could not resolve the principal for {}. {e}", req.path());
            ServerError::from(e)
        });
        ready(result)
    }
}
