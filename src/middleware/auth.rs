//! Authentication extractors
//!
//! `CurrentUser` resolves the bearer token of a request to the stored
//! account, so deleted accounts are refused and role changes apply at once.
//! `Authorized<R>` additionally requires the caller's role to include
//! `R::ROLE` in the hierarchy super_admin > admin > rep_admin > user.

use std::marker::PhantomData;
use std::sync::Arc;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tracing::{debug, warn};
use crate::models::user::{Actor, Role, User};
use crate::services::auth::Claims;
use crate::server::AppState;
use crate::utils::errors::PortalError;

/// Extract the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.id, self.role)
    }
}

impl From<&Claims> for CurrentUser {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.clone(),
            role: claims.role,
        }
    }
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            role: user.role,
        }
    }
}

/// Verified claims of the request's bearer token
fn verified_claims(parts: &Parts, state: &AppState) -> Result<Claims, PortalError> {
    let token = bearer_token(&parts.headers)
        .ok_or_else(|| PortalError::Authentication("missing bearer token".to_string()))?;

    state.services.auth_service.authenticate(token).map_err(|e| {
        debug!(error = %e, "Rejected bearer token");
        PortalError::Authentication("invalid or expired token".to_string())
    })
}

/// The stored account behind `claims`; its current role replaces the
/// role the token was issued with
async fn load_account(state: &AppState, claims: &Claims) -> Result<CurrentUser, PortalError> {
    let user = state.services.auth_service.account_for(claims).await?;
    if user.role != claims.role {
        debug!(user_id = user.id, token_role = %claims.role, role = %user.role, "Role changed since token issue");
    }
    Ok(CurrentUser::from(user))
}

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let claims = verified_claims(parts, state)?;
        load_account(state, &claims).await
    }
}

/// Minimum role required by a route
pub trait MinRole: Send + Sync {
    const ROLE: Role;
}

/// Marker: rep_admin or above
pub struct RepAdmin;
/// Marker: admin or above
pub struct Admin;
/// Marker: super_admin only
pub struct SuperAdmin;

impl MinRole for RepAdmin {
    const ROLE: Role = Role::RepAdmin;
}

impl MinRole for Admin {
    const ROLE: Role = Role::Admin;
}

impl MinRole for SuperAdmin {
    const ROLE: Role = Role::SuperAdmin;
}

/// A caller whose role includes `R::ROLE`
pub struct Authorized<R: MinRole> {
    pub user: CurrentUser,
    _role: PhantomData<R>,
}

impl<R: MinRole> Authorized<R> {
    pub fn actor(&self) -> Actor {
        self.user.actor()
    }
}

/// Check a role against a requirement
pub fn require_role(user: &CurrentUser, required: Role) -> Result<(), PortalError> {
    if user.role.includes(required) {
        Ok(())
    } else {
        warn!(user_id = user.id, role = %user.role, required = %required, "Insufficient role");
        Err(PortalError::PermissionDenied(format!("{required} role required")))
    }
}

impl<R: MinRole> FromRequestParts<Arc<AppState>> for Authorized<R> {
    type Rejection = PortalError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let claims = verified_claims(parts, state)?;

        // A token issued below the required role is refused before the lookup
        require_role(&CurrentUser::from(&claims), R::ROLE)?;
        let user = load_account(state, &claims).await?;
        require_role(&user, R::ROLE)?;

        Ok(Self {
            user,
            _role: PhantomData,
        })
    }
}
