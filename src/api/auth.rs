//! Request identity and authorization.
//!
//! The identity provider in front of the service authenticates the caller and forwards
//! their user id in the `x-user-id` header. This module turns that id into an active
//! [`user::Model`] and checks role and school scope for each request.

use super::AppState;
use crate::{
    core::{
        school,
        user::{self, Capability, role_allows},
    },
    entities::{Role, school as school_entity, user as user_entity},
    errors::{Error, Result},
};
use axum::{extract::FromRequestParts, http::request::Parts};

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The authenticated caller of a request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: user_entity::Model,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<i64>().ok())
            .ok_or_else(|| Error::Unauthorized {
                message: format!("Missing or invalid {USER_ID_HEADER} header"),
            })?;

        let user = user::get_user(&state.db, user_id)
            .await?
            .filter(|user| user.is_active)
            .ok_or_else(|| Error::Unauthorized {
                message: format!("Unknown or inactive user {user_id}"),
            })?;

        Ok(Self { user })
    }
}

impl AuthContext {
    /// Whether the caller is the platform superadmin.
    #[must_use]
    pub fn is_superadmin(&self) -> bool {
        self.user.role == Role::Superadmin
    }

    /// Fails with `Forbidden` unless the caller is the platform superadmin.
    pub fn require_superadmin(&self) -> Result<()> {
        if self.is_superadmin() {
            Ok(())
        } else {
            Err(Error::Forbidden {
                message: "Superadmin access required".to_string(),
            })
        }
    }

    /// Checks that the caller may perform `capability` in `school_id` and returns the school.
    ///
    /// Staff only reach their own, active school. The superadmin reaches every school,
    /// deactivated ones included.
    pub async fn authorize(
        &self,
        state: &AppState,
        school_id: i64,
        capability: Capability,
    ) -> Result<school_entity::Model> {
        if self.is_superadmin() {
            return school::require_school(&state.db, school_id).await;
        }

        if self.user.school_id != Some(school_id) {
            return Err(Error::Forbidden {
                message: format!("No access to school {school_id}"),
            });
        }
        if !role_allows(self.user.role, capability) {
            return Err(Error::Forbidden {
                message: format!("Role {:?} cannot {capability:?}", self.user.role),
            });
        }

        let school = school::require_school(&state.db, school_id).await?;
        if !school.is_active {
            return Err(Error::Forbidden {
                message: "School is deactivated".to_string(),
            });
        }
        Ok(school)
    }
}
