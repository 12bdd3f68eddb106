//! Signed-in user decoded from the identity cookie.

use std::future::{Ready, ready};

use actix_identity::IdentityExt;
use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest, web};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::types::{CompanyId, TypeConstraintError, UserId};
use crate::models::config::ServerConfig;

/// JWT claims issued by the auth service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub company_id: i32,
    pub roles: Vec<String>,
    pub exp: usize,
}

impl AuthenticatedUser {
    /// Numeric user id carried in `sub`.
    pub fn user_id(&self) -> Result<UserId, TypeConstraintError> {
        let id = self
            .sub
            .trim()
            .parse::<i32>()
            .map_err(|_| TypeConstraintError::InvalidValue(format!("invalid subject `{}`", self.sub)))?;
        UserId::new(id)
    }

    pub fn company_id(&self) -> Result<CompanyId, TypeConstraintError> {
        CompanyId::new(self.company_id)
    }

    /// Decodes and validates a HS256 token.
    pub fn from_jwt(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        let validation = Validation::default();
        decode::<AuthenticatedUser>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
    }

    pub fn to_jwt(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_user(req))
    }
}

fn extract_user(req: &HttpRequest) -> Result<AuthenticatedUser, actix_web::Error> {
    let identity = req
        .get_identity()
        .map_err(|_| actix_web::error::ErrorUnauthorized("Not signed in"))?;
    let token = identity
        .id()
        .map_err(|_| actix_web::error::ErrorUnauthorized("Invalid identity"))?;

    let config = req
        .app_data::<web::Data<ServerConfig>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Server config is missing"))?;

    AuthenticatedUser::from_jwt(&token, &config.secret).map_err(|err| {
        log::warn!("Rejected identity token: {err}");
        actix_web::error::ErrorUnauthorized("Invalid token")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(sub: &str) -> AuthenticatedUser {
        AuthenticatedUser {
            sub: sub.to_string(),
            email: "user@example.com".to_string(),
            name: "User".to_string(),
            company_id: 1,
            roles: vec![],
            exp: 4_102_444_800,
        }
    }

    #[test]
    fn user_id_parses_subject() {
        assert_eq!(user("15").user_id().unwrap().get(), 15);
        assert!(user("abc").user_id().is_err());
        assert!(user("0").user_id().is_err());
    }

    #[test]
    fn jwt_round_trips_with_shared_secret() {
        let original = user("3");
        let token = original.to_jwt("secret").expect("encode");
        let decoded = AuthenticatedUser::from_jwt(&token, "secret").expect("decode");
        assert_eq!(decoded, original);
        assert!(AuthenticatedUser::from_jwt(&token, "other").is_err());
    }
}
