//! Auth service: IdP login and session lifecycle.

use chrono::Utc;
use sea_orm::Set;
use unipoll_common::{AppError, AppResult};
use unipoll_db::{entities::user, repositories::UserRepository};

use super::idp::IdpClient;
use super::token::{TokenPair, TokenService};

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// True until the user has completed profile setup.
    pub is_new_user: bool,
}

/// Auth service for business logic.
#[derive(Clone)]
pub struct AuthService {
    idp: IdpClient,
    user_repo: UserRepository,
    tokens: TokenService,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(idp: IdpClient, user_repo: UserRepository, tokens: TokenService) -> Self {
        Self {
            idp,
            user_repo,
            tokens,
        }
    }

    /// Exchange an IdP token for a local session.
    ///
    /// The profile reported by the provider is upserted on every login,
    /// so name or email changes propagate without any local editing.
    pub async fn login(&self, idp_token: &str) -> AppResult<LoginResponse> {
        let info = self.idp.fetch_user_info(idp_token).await?;
        let now = Utc::now();

        let user = match self.user_repo.find_by_uuid(&info.sub).await? {
            Some(existing) => {
                let mut active: user::ActiveModel = existing.into();
                active.email = Set(info.email);
                active.name = Set(info.name);
                active.picture = Set(info.picture);
                active.student_id = Set(info.student_id);
                active.updated_at = Set(Some(now.into()));
                self.user_repo.update(active).await?
            }
            None => {
                let model = user::ActiveModel {
                    uuid: Set(info.sub),
                    email: Set(info.email),
                    name: Set(info.name),
                    picture: Set(info.picture),
                    nickname: Set(None),
                    department: Set(None),
                    student_id: Set(info.student_id),
                    created_at: Set(now.into()),
                    updated_at: Set(None),
                };
                self.user_repo.create(model).await?
            }
        };

        let pair = self.tokens.issue_pair(&user.uuid, &user.name).await?;

        Ok(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            is_new_user: user.nickname.is_none(),
        })
    }

    /// Exchange a refresh token for a new pair.
    pub async fn refresh(&self, refresh_token: &str) -> AppResult<TokenPair> {
        self.tokens.refresh(refresh_token).await
    }

    /// End the session behind an access/refresh token pair.
    pub async fn logout(&self, access_token: &str, refresh_token: &str) -> AppResult<()> {
        let claims = self.tokens.authenticate(access_token).await?;
        self.tokens.logout(&claims, refresh_token).await
    }

    /// Validate an access token and load its subject.
    pub async fn authenticate(&self, access_token: &str) -> AppResult<user::Model> {
        let claims = self.tokens.authenticate(access_token).await?;
        // A token for a deleted user is as dead as a forged one.
        self.user_repo
            .find_by_uuid(&claims.sub)
            .await?
            .ok_or(AppError::Unauthorized)
    }
}
