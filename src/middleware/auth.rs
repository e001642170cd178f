use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::user::Role;
use crate::utils::token::{TokenIssuer, TokenKind};

pub const STAFF_ROLES: &[&str] = &["consultant", "admin", "superadmin"];
pub const ADMIN_ROLES: &[&str] = &["admin", "superadmin"];
pub const SUPERADMIN_ROLES: &[&str] = &["superadmin"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub role: Option<String>,
    pub kind: TokenKind,
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| Error::Unauthorized("Invalid token subject".to_string()))
    }

    pub fn role(&self) -> Result<Role> {
        self.role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .ok_or_else(|| Error::Unauthorized("Token carries no valid role".to_string()))
    }

    pub fn is_staff(&self) -> bool {
        self.role().map(|r| r.is_staff()).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.role().map(|r| r.is_admin()).unwrap_or(false)
    }

    pub fn require_any(&self, allowed: &[Role]) -> Result<Role> {
        let role = self.role()?;
        if allowed.contains(&role) {
            Ok(role)
        } else {
            Err(Error::Forbidden("Not enough permissions".to_string()))
        }
    }

    pub fn require_staff(&self) -> Result<Role> {
        self.require_any(&[Role::Consultant, Role::Admin, Role::Superadmin])
    }
}

fn reject(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn bearer_claims(tokens: &TokenIssuer, req: &Request) -> std::result::Result<Claims, Response> {
    let Some(auth_header) = req.headers().get(axum::http::header::AUTHORIZATION) else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Not authenticated"));
    };
    let Ok(auth_str) = auth_header.to_str() else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Malformed authorization header"));
    };
    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(reject(StatusCode::UNAUTHORIZED, "Unsupported authorization scheme"));
    };

    match tokens.decode(token, TokenKind::Access) {
        Ok(claims) => Ok(claims),
        Err(Error::Unauthorized(_)) => Err(reject(StatusCode::UNAUTHORIZED, "Access token required")),
        Err(_) => Err(reject(
            StatusCode::UNAUTHORIZED,
            "Could not validate credentials",
        )),
    }
}

/// Decodes the access token and stores its [`Claims`] as a request extension.
pub async fn require_bearer_auth(
    State(tokens): State<TokenIssuer>,
    mut req: Request,
    next: Next,
) -> Response {
    match bearer_claims(&tokens, &req) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            next.run(req).await
        }
        Err(response) => response,
    }
}

/// Must sit inside [`require_bearer_auth`].
pub async fn require_roles(req: Request, next: Next, allowed: &[&str]) -> Response {
    let Some(claims) = req.extensions().get::<Claims>() else {
        return reject(StatusCode::UNAUTHORIZED, "Not authenticated");
    };
    let role = claims.role.as_deref().unwrap_or_default();
    if !allowed.is_empty() && !allowed.iter().any(|r| r.eq_ignore_ascii_case(role)) {
        return reject(StatusCode::FORBIDDEN, "Not enough permissions");
    }
    next.run(req).await
}

pub async fn require_staff(req: Request, next: Next) -> Response {
    require_roles(req, next, STAFF_ROLES).await
}

pub async fn require_admin(req: Request, next: Next) -> Response {
    require_roles(req, next, ADMIN_ROLES).await
}

pub async fn require_superadmin(req: Request, next: Next) -> Response {
    require_roles(req, next, SUPERADMIN_ROLES).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(role: &str) -> Claims {
        Claims {
            sub: Uuid::new_v4().to_string(),
            exp: usize::MAX,
            role: Some(role.to_string()),
            kind: TokenKind::Access,
        }
    }

    #[test]
    fn role_gate_rejects_outsiders() {
        assert!(claims("consultant").require_staff().is_ok());
        assert!(matches!(
            claims("candidate").require_staff(),
            Err(Error::Forbidden(_))
        ));
        assert!(matches!(claims("wizard").role(), Err(Error::Unauthorized(_))));
    }
}
