// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User endpoints.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Auth, AuthContext, AuthStrategy, Role};

/// Response for GET /v1/users/me
#[derive(Debug, Serialize, ToSchema)]
pub struct UserMeResponse {
    /// Stored user id
    pub id: String,
    /// Normalized email, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// User's role
    pub role: Role,
    /// Firebase uid, once linked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub firebase_uid: Option<String>,
    /// Token type that authenticated this request
    pub strategy: AuthStrategy,
}

impl From<AuthContext> for UserMeResponse {
    fn from(ctx: AuthContext) -> Self {
        Self {
            id: ctx.identity.id,
            email: ctx.identity.email,
            role: ctx.identity.role,
            firebase_uid: ctx.identity.firebase_uid,
            strategy: ctx.strategy,
        }
    }
}

/// Get the current authenticated user's information.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "User information", body = UserMeResponse),
        (status = 401, description = "Unauthorized - invalid or missing token"),
    )
)]
pub async fn get_current_user(Auth(ctx): Auth) -> Json<UserMeResponse> {
    Json(ctx.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::BearerToken;
    use crate::storage::UserIdentity;
    use chrono::Utc;

    #[test]
    fn user_me_response_from_auth_context() {
        let ctx = AuthContext {
            raw_token: BearerToken::for_tests("tok"),
            identity: UserIdentity {
                id: "65a1b2c3d4e5f60718293a4b".to_string(),
                firebase_uid: Some("uid-1".to_string()),
                email: Some("a@x.com".to_string()),
                role: Role::Admin,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            claims: None,
            strategy: AuthStrategy::SelfIssued,
        };

        let response: UserMeResponse = ctx.into();
        assert_eq!(response.id, "65a1b2c3d4e5f60718293a4b");
        assert_eq!(response.role, Role::Admin);
        assert_eq!(response.firebase_uid.as_deref(), Some("uid-1"));
        assert_eq!(response.strategy, AuthStrategy::SelfIssued);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["strategy"], "self_issued");
        assert_eq!(json["role"], "admin");
    }
}
