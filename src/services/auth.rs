//! Client-credentials token issuance and validation

use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::auth::{TokenClaims, TokenRequest, TokenResponse},
};

const CLIENT_CREDENTIALS: &str = "client_credentials";

#[derive(Clone)]
pub struct AuthService {
    config: AuthConfig,
}

impl AuthService {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    fn is_registered(&self, client_id: &str, client_secret: &str) -> bool {
        self.config
            .clients
            .iter()
            .any(|c| c.id == client_id && c.secret == client_secret)
    }

    /// Issue a bearer token for a registered client
    pub fn issue_token(&self, request: &TokenRequest) -> AppResult<TokenResponse> {
        if request.grant_type != CLIENT_CREDENTIALS {
            return Err(AppError::Validation("unsupported authentication type".to_string()));
        }

        if request.client_id.is_empty() || request.client_secret.is_empty() {
            return Err(AppError::Authentication(
                "missing required fields client_id and client_secret".to_string(),
            ));
        }

        if !self.is_registered(&request.client_id, &request.client_secret) {
            tracing::warn!(client_id = %request.client_id, "Rejected token request");
            return Err(AppError::Authentication("invalid credentials".to_string()));
        }

        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            cid: request.client_id.clone(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: now,
            exp: now + self.config.token_ttl_seconds,
        };

        let access_token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("could not issue token: {}", e)))?;

        tracing::info!(client_id = %claims.cid, "Token issued");

        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.config.token_ttl_seconds,
        })
    }

    /// Parse a bearer token and check signature, expiry, issuer and audience
    pub fn validate(&self, token: &str) -> AppResult<TokenClaims> {
        TokenClaims::from_token(
            token,
            &self.config.jwt_secret,
            &self.config.issuer,
            &self.config.audience,
        )
        .map_err(|e| AppError::Authentication(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientCredentials;

    fn service() -> AuthService {
        AuthService::new(AuthConfig {
            clients: vec![ClientCredentials {
                id: "frontend".into(),
                secret: "s3cret".into(),
            }],
            ..AuthConfig::default()
        })
    }

    fn request(grant_type: &str, id: &str, secret: &str) -> TokenRequest {
        TokenRequest {
            grant_type: grant_type.into(),
            client_id: id.into(),
            client_secret: secret.into(),
        }
    }

    #[test]
    fn issued_token_validates() {
        let auth = service();
        let token = auth.issue_token(&request("client_credentials", "frontend", "s3cret")).unwrap();

        assert_eq!(token.token_type, "Bearer");
        assert_eq!(token.expires_in, 3600);
        let claims = auth.validate(&token.access_token).unwrap();
        assert_eq!(claims.cid, "frontend");
    }

    #[test]
    fn wrong_grant_type_is_rejected() {
        let err = service().issue_token(&request("password", "frontend", "s3cret")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn bad_credentials_are_rejected() {
        let auth = service();
        assert!(matches!(
            auth.issue_token(&request("client_credentials", "frontend", "nope")),
            Err(AppError::Authentication(_))
        ));
        assert!(matches!(
            auth.issue_token(&request("client_credentials", "", "")),
            Err(AppError::Authentication(_))
        ));
    }

    #[test]
    fn token_for_another_audience_is_rejected() {
        let other = AuthService::new(AuthConfig {
            audience: "someone-else".into(),
            ..service().config
        });
        let token = other.issue_token(&request("client_credentials", "frontend", "s3cret")).unwrap();

        assert!(matches!(service().validate(&token.access_token), Err(AppError::Authentication(_))));
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(matches!(service().validate("not-a-jwt"), Err(AppError::Authentication(_))));
    }
}
