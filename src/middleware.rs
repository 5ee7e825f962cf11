use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::IntoResponse,
    Extension,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use crate::{
    error::{ErrorMessage, HttpError},
    utils::token,
    AppState,
};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Customer,
    Tradie,
    Admin,
}

impl UserRole {
    pub fn from_claim(role: &str) -> Option<Self> {
        match role {
            "customer" => Some(UserRole::Customer),
            "tradie" => Some(UserRole::Tradie),
            "admin" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// Display name recorded in audit rows (job_status_history.changed_by_name).
    pub fn label(&self) -> &'static str {
        match self {
            UserRole::Customer => "Customer",
            UserRole::Tradie => "Tradie",
            UserRole::Admin => "Admin",
        }
    }
}

/// The authenticated caller, as asserted by the gateway's token. Identity
/// lives upstream; this service only needs the id and role.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthUser {
    pub id: uuid::Uuid,
    pub role: UserRole,
}

pub async fn auth(
    cookie_jar: CookieJar,
    Extension(app_state): Extension<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<impl IntoResponse, HttpError> {
    let token = cookie_jar
        .get("token")
        .map(|cookie| cookie.value().to_string())
        .or_else(|| {
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|auth_value| {
                    auth_value
                        .strip_prefix("Bearer ")
                        .map(|token| token.to_owned())
                })
        });

    let token = token
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::TokenNotProvided.to_string()))?;

    let claims = token::decode_token(token, app_state.env.jwt_secret.as_bytes())
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let user_id = uuid::Uuid::parse_str(&claims.sub)
        .map_err(|_| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    let role = UserRole::from_claim(&claims.role)
        .ok_or_else(|| HttpError::unauthorized(ErrorMessage::InvalidToken.to_string()))?;

    req.extensions_mut().insert(AuthUser { id: user_id, role });

    Ok(next.run(req).await)
}

/// In-handler role gate for routes whose methods carry different roles.
pub fn require_role(user: &AuthUser, required: UserRole) -> Result<(), HttpError> {
    if user.role != UserRole::Admin && user.role != required {
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }
    Ok(())
}

pub async fn role_check(
    req: Request,
    next: Next,
    required_roles: Vec<UserRole>,
) -> Result<impl IntoResponse, HttpError> {
    let user = req.extensions().get::<AuthUser>().ok_or_else(|| {
        HttpError::unauthorized(ErrorMessage::UserNotAuthenticated.to_string())
    })?;

    // Admin tokens pass every gate.
    if user.role != UserRole::Admin && !required_roles.contains(&user.role) {
        return Err(HttpError::new(
            ErrorMessage::PermissionDenied.to_string(),
            StatusCode::FORBIDDEN,
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audit_labels_follow_the_caller_role() {
        assert_eq!(UserRole::Customer.label(), "Customer");
        assert_eq!(UserRole::Tradie.label(), "Tradie");
        assert_eq!(UserRole::Admin.label(), "Admin");
    }

    #[test]
    fn roles_parse_from_gateway_claims() {
        assert_eq!(UserRole::from_claim("customer"), Some(UserRole::Customer));
        assert_eq!(UserRole::from_claim("tradie"), Some(UserRole::Tradie));
        assert_eq!(UserRole::from_claim("admin"), Some(UserRole::Admin));
        assert_eq!(UserRole::from_claim("moderator"), None);
        assert_eq!(UserRole::from_claim(""), None);
    }
}
