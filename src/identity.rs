use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{error::ApiError, token::TokenService};

/// AuthUser
///
/// The resolved identity of an authenticated request: the user id and email
/// bound into the presented token. Lives for exactly one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

/// Identity
///
/// The per-request identity attached by the identity middleware. Anonymous is
/// the default state when no valid credential is presented. It is a normal
/// state, distinct from an error, and on its own never causes a rejection.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity {
    Anonymous,
    User(AuthUser),
}

impl Identity {
    /// Authentication check: fails with `Unauthenticated` when the request
    /// carries no resolved identity. Pure decision over an already-resolved
    /// input; applied only at call sites that require identity.
    pub fn require(&self) -> Result<&AuthUser, ApiError> {
        match self {
            Identity::User(user) => Ok(user),
            Identity::Anonymous => Err(ApiError::Unauthenticated),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::User(_))
    }
}

/// Ownership check: fails with `Forbidden` when the requester is not the
/// recorded owner of the resource. Pure, no I/O, applied identically by both
/// transport surfaces.
pub fn ensure_owner(owner: Uuid, requester: Uuid) -> Result<(), ApiError> {
    if owner == requester {
        Ok(())
    } else {
        Err(ApiError::Forbidden)
    }
}

/// attach_identity
///
/// The identity middleware. Runs on every inbound request, exactly once,
/// before any handler: extracts a bearer token, resolves it through the
/// TokenService, and attaches the outcome to the request's extensions.
///
/// This middleware **never rejects**. A missing header, a garbled header, a
/// bad signature or an expired token all resolve to `Identity::Anonymous`
/// and the request proceeds; rejection is the guard's job, evaluated later
/// and only where identity is actually required.
pub async fn attach_identity(
    State(tokens): State<TokenService>,
    mut request: Request,
    next: Next,
) -> Response {
    let identity = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .and_then(|token| tokens.verify(token))
        .map(|claims| {
            Identity::User(AuthUser {
                id: claims.sub,
                email: claims.email,
            })
        })
        .unwrap_or(Identity::Anonymous);

    request.extensions_mut().insert(identity);
    next.run(request).await
}

/// Infallible extractor for the attached identity. Handlers that serve both
/// anonymous and authenticated traffic (the GraphQL endpoint) use this and
/// decide per-operation.
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<Identity>()
            .cloned()
            .unwrap_or(Identity::Anonymous))
    }
}

/// Rejecting extractor: handlers that take `AuthUser` as an argument only run
/// for authenticated requests; anonymous traffic gets a 401 from the guard
/// before the handler body executes.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<Identity>() {
            Some(Identity::User(user)) => Ok(user.clone()),
            _ => Err(ApiError::Unauthenticated),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
        }
    }

    #[test]
    fn anonymous_fails_the_authentication_check() {
        assert!(matches!(
            Identity::Anonymous.require(),
            Err(ApiError::Unauthenticated)
        ));
    }

    #[test]
    fn authenticated_identity_passes() {
        let u = user();
        let identity = Identity::User(u.clone());
        assert_eq!(identity.require().unwrap(), &u);
    }

    #[test]
    fn owner_check_allows_owner_only() {
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        assert!(ensure_owner(owner, owner).is_ok());
        assert!(matches!(
            ensure_owner(owner, stranger),
            Err(ApiError::Forbidden)
        ));
    }
}
