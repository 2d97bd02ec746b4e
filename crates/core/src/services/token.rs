//! Token service: session issuance, rotation, and revocation.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use unipoll_common::{AppError, AppResult, AuthConfig, IdGenerator};
use unipoll_db::{entities::refresh_session, repositories::TokenRepository};

/// Discriminator carried inside every issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims embedded in issued tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's IdP uuid.
    pub sub: String,
    /// Legal name, carried for display without a user lookup.
    pub name: String,
    #[serde(rename = "tokenType")]
    pub kind: TokenKind,
    /// Unique token id, used for blacklisting.
    pub jti: String,
    /// Expiry as a unix timestamp.
    pub exp: i64,
}

/// An access/refresh token pair.
#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token service for session lifecycle.
#[derive(Clone)]
pub struct TokenService {
    token_repo: TokenRepository,
    config: AuthConfig,
    id_gen: IdGenerator,
}

impl TokenService {
    /// Create a new token service.
    #[must_use]
    pub const fn new(token_repo: TokenRepository, config: AuthConfig) -> Self {
        Self {
            token_repo,
            config,
            id_gen: IdGenerator::new(),
        }
    }

    /// Issue a fresh access/refresh pair for a user and persist the
    /// refresh session.
    ///
    /// Only a hash of the refresh token is stored; the plaintext leaves
    /// the process exactly once, in the response.
    pub async fn issue_pair(&self, user_id: &str, user_name: &str) -> AppResult<TokenPair> {
        let now = Utc::now();

        let access_token = self.encode_claims(&Claims {
            sub: user_id.to_string(),
            name: user_name.to_string(),
            kind: TokenKind::Access,
            jti: self.id_gen.generate_jti(),
            exp: (now + Duration::seconds(self.config.access_ttl_secs)).timestamp(),
        })?;

        let refresh_token = self.encode_claims(&Claims {
            sub: user_id.to_string(),
            name: user_name.to_string(),
            kind: TokenKind::Refresh,
            jti: self.id_gen.generate_jti(),
            exp: (now + Duration::seconds(self.config.refresh_ttl_secs)).timestamp(),
        })?;

        // The session row must expire exactly when the signed token says
        // it does; read the expiry back out of the token itself.
        let refresh_expires_at = self
            .decode_claims(&refresh_token)
            .ok()
            .and_then(|claims| chrono::DateTime::from_timestamp(claims.exp, 0))
            .ok_or_else(|| {
                AppError::Internal("Issued refresh token failed verification".to_string())
            })?;

        let session = refresh_session::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(user_id.to_string()),
            token_hash: Set(hash_token(&refresh_token)),
            expires_at: Set(refresh_expires_at.into()),
            revoked_at: Set(None),
            created_at: Set(now.into()),
        };
        self.token_repo.create_session(session).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    /// Exchange a refresh token for a new pair, consuming the old session.
    ///
    /// Any failure along the way collapses to `Unauthorized`: a caller
    /// must not be able to distinguish a forged token from a revoked one.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        let claims = self.decode_claims(refresh_token)?;
        if claims.kind != TokenKind::Refresh {
            return Err(AppError::Unauthorized);
        }

        let now = Utc::now();
        let session = self
            .token_repo
            .find_active_session(&claims.sub, &hash_token(refresh_token), now.into())
            .await?
            .ok_or(AppError::Unauthorized)?;

        let new_access = self.encode_claims(&Claims {
            sub: claims.sub.clone(),
            name: claims.name.clone(),
            kind: TokenKind::Access,
            jti: self.id_gen.generate_jti(),
            exp: (now + Duration::seconds(self.config.access_ttl_secs)).timestamp(),
        })?;

        let refresh_expires_at = now + Duration::seconds(self.config.refresh_ttl_secs);
        let new_refresh = self.encode_claims(&Claims {
            sub: claims.sub.clone(),
            name: claims.name,
            kind: TokenKind::Refresh,
            jti: self.id_gen.generate_jti(),
            exp: refresh_expires_at.timestamp(),
        })?;

        let replacement = refresh_session::ActiveModel {
            id: Set(self.id_gen.generate()),
            user_id: Set(claims.sub),
            token_hash: Set(hash_token(&new_refresh)),
            expires_at: Set(refresh_expires_at.into()),
            revoked_at: Set(None),
            created_at: Set(now.into()),
        };
        self.token_repo
            .rotate_session(&session.id, replacement, now.into())
            .await?;

        Ok(TokenPair {
            access_token: new_access,
            refresh_token: new_refresh,
        })
    }

    /// Revoke a session: blacklist the access token for its remaining
    /// lifetime and revoke the matching refresh session.
    ///
    /// The refresh token must verify, carry the refresh kind, and belong
    /// to the same subject as the access token; otherwise nothing is
    /// revoked and the caller gets `Unauthorized`.
    pub async fn logout(&self, access_claims: &Claims, refresh_token: &str) -> AppResult<()> {
        let refresh_claims = self.decode_claims(refresh_token)?;
        if refresh_claims.kind != TokenKind::Refresh || refresh_claims.sub != access_claims.sub {
            return Err(AppError::Unauthorized);
        }

        let now = Utc::now();

        let expires_at = chrono::DateTime::from_timestamp(access_claims.exp, 0)
            .unwrap_or(now)
            .fixed_offset();
        self.token_repo
            .upsert_blacklist(&access_claims.jti, expires_at, now.into())
            .await?;

        self.token_repo
            .revoke_matching_sessions(&access_claims.sub, &hash_token(refresh_token), now.into())
            .await?;

        // Opportunistic cleanup; rows past their expiry are inert anyway.
        let pruned = self.token_repo.prune_expired_blacklist(now.into()).await?;
        if pruned > 0 {
            tracing::debug!(pruned, "Pruned expired blacklist entries");
        }

        Ok(())
    }

    /// Validate an access token and return its claims.
    pub async fn authenticate(&self, token: &str) -> AppResult<Claims> {
        let claims = self.decode_claims(token)?;
        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized);
        }
        if self
            .token_repo
            .is_blacklisted(&claims.jti, Utc::now().into())
            .await?
        {
            return Err(AppError::Unauthorized);
        }
        Ok(claims)
    }

    fn encode_claims(&self, claims: &Claims) -> AppResult<String> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token encoding failed: {e}")))
    }

    fn decode_claims(&self, token: &str) -> AppResult<Claims> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
    }
}

/// Sha256 hex digest of a token, as persisted in refresh sessions.
#[must_use]
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn test_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_ttl_secs: 300,
            refresh_ttl_secs: 86_400,
        }
    }

    fn service_over(db: DatabaseConnection) -> TokenService {
        TokenService::new(TokenRepository::new(Arc::new(db)), test_config())
    }

    fn test_service() -> TokenService {
        service_over(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn claims(sub: &str, kind: TokenKind, exp_offset: i64) -> Claims {
        Claims {
            sub: sub.to_string(),
            name: "Alice".to_string(),
            kind,
            jti: "jti-1".to_string(),
            exp: Utc::now().timestamp() + exp_offset,
        }
    }

    fn session_row(id: &str) -> refresh_session::Model {
        let now = Utc::now();
        refresh_session::Model {
            id: id.to_string(),
            user_id: "uuid-1".to_string(),
            token_hash: "0".repeat(64),
            expires_at: (now + Duration::seconds(86_400)).into(),
            revoked_at: None,
            created_at: now.into(),
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let service = test_service();
        let claims = Claims {
            sub: "uuid-1".to_string(),
            name: "Alice".to_string(),
            kind: TokenKind::Access,
            jti: "jti-1".to_string(),
            exp: Utc::now().timestamp() + 300,
        };
        let token = service.encode_claims(&claims).unwrap();
        let decoded = service.decode_claims(&token).unwrap();
        assert_eq!(decoded.sub, "uuid-1");
        assert_eq!(decoded.name, "Alice");
        assert_eq!(decoded.kind, TokenKind::Access);
        assert_eq!(decoded.jti, "jti-1");
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = test_service();
        let claims = Claims {
            sub: "uuid-1".to_string(),
            name: "Alice".to_string(),
            kind: TokenKind::Access,
            jti: "jti-1".to_string(),
            exp: Utc::now().timestamp() - 600,
        };
        let token = service.encode_claims(&claims).unwrap();
        assert!(matches!(
            service.decode_claims(&token),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let service = test_service();
        let claims = Claims {
            sub: "uuid-1".to_string(),
            name: "Alice".to_string(),
            kind: TokenKind::Access,
            jti: "jti-1".to_string(),
            exp: Utc::now().timestamp() + 300,
        };
        let mut token = service.encode_claims(&claims).unwrap();
        token.push('x');
        assert!(service.decode_claims(&token).is_err());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_refresh_kind() {
        let service = test_service();
        let claims = Claims {
            sub: "uuid-1".to_string(),
            name: "Alice".to_string(),
            kind: TokenKind::Refresh,
            jti: "jti-1".to_string(),
            exp: Utc::now().timestamp() + 300,
        };
        let token = service.encode_claims(&claims).unwrap();
        assert!(matches!(
            service.authenticate(&token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_issue_pair_refresh_expiry_matches_token() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![session_row("sess1")]])
            .into_connection();
        let service = service_over(db);

        let pair = service.issue_pair("uuid-1", "Alice").await.unwrap();
        let decoded = service.decode_claims(&pair.refresh_token).unwrap();
        assert_eq!(decoded.kind, TokenKind::Refresh);
        let now = Utc::now().timestamp();
        assert!((decoded.exp - now - 86_400).abs() <= 2);
    }

    #[tokio::test]
    async fn test_refresh_token_is_single_use() {
        let revoked = refresh_session::Model {
            revoked_at: Some(Utc::now().into()),
            ..session_row("sess1")
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([
                vec![session_row("sess1")], // active session lookup
                vec![session_row("sess1")], // rotation reloads the old row
                vec![revoked],              // old session marked revoked
                vec![session_row("sess2")], // replacement inserted
                vec![],                     // second lookup finds nothing
            ])
            .into_connection();
        let service = service_over(db);
        let token = service
            .encode_claims(&claims("uuid-1", TokenKind::Refresh, 600))
            .unwrap();

        assert!(service.refresh(&token).await.is_ok());
        assert!(matches!(
            service.refresh(&token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_logout_rejects_access_token_in_refresh_slot() {
        let service = test_service();
        let access_claims = claims("uuid-1", TokenKind::Access, 300);
        let token = service.encode_claims(&access_claims).unwrap();
        assert!(matches!(
            service.logout(&access_claims, &token).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_logout_rejects_foreign_refresh_token() {
        let service = test_service();
        let access_claims = claims("uuid-1", TokenKind::Access, 300);
        let foreign = service
            .encode_claims(&claims("uuid-2", TokenKind::Refresh, 600))
            .unwrap();
        assert!(matches!(
            service.logout(&access_claims, &foreign).await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_logout_rejects_garbage_refresh_token() {
        let service = test_service();
        let access_claims = claims("uuid-1", TokenKind::Access, 300);
        assert!(matches!(
            service.logout(&access_claims, "not-a-token").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn test_hash_token_is_hex_sha256() {
        let hash = hash_token("some-token");
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(hash, hash_token("some-token"));
        assert_ne!(hash, hash_token("other-token"));
    }
}
