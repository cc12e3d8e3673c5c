//! Auth Service
//!
//! Registration, login, profile update and current-user lookup. Every
//! successful call returns a freshly signed access token, except
//! [`AuthService::current`] which echoes the token the caller presented.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::UserId;
use platform::password::ClearTextPassword;
use platform::token::TokenSigner;

use crate::application::config::ConduitConfig;
use crate::domain::entity::{AccessClaims, User, UserChanges};
use crate::domain::repository::{ArticleRepository, UserRepository};
use crate::domain::value_object::{Email, Username};
use crate::error::{ConduitError, ConduitResult};

pub struct RegisterInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Fields left `None` are not changed
#[derive(Default)]
pub struct UpdateUserInput {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub bio: Option<String>,
    pub image: Option<String>,
}

/// User paired with an access token
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub user: User,
    pub token: String,
}

pub struct AuthService<U, A>
where
    U: UserRepository,
    A: ArticleRepository,
{
    user_repo: Arc<U>,
    article_repo: Arc<A>,
    config: Arc<ConduitConfig>,
    signer: Arc<TokenSigner>,
}

impl<U, A> AuthService<U, A>
where
    U: UserRepository,
    A: ArticleRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        article_repo: Arc<A>,
        config: Arc<ConduitConfig>,
        signer: Arc<TokenSigner>,
    ) -> Self {
        Self {
            user_repo,
            article_repo,
            config,
            signer,
        }
    }

    pub async fn register(&self, input: RegisterInput) -> ConduitResult<AuthenticatedUser> {
        let email = Email::new(&input.email)?;
        let username = Username::new(&input.username)?;
        let password = ClearTextPassword::new(input.password)?;

        if self
            .user_repo
            .exists_user_by_email_or_username(&email, &username)
            .await?
        {
            return Err(ConduitError::DuplicateIdentifier);
        }

        let password_hash = password.hash(self.config.pepper())?;
        let user = User::new(email, username, password_hash);
        self.user_repo.create_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "User registered");

        self.authenticated(user)
    }

    pub async fn login(&self, input: LoginInput) -> ConduitResult<AuthenticatedUser> {
        // No stored user can have a malformed address
        let email = Email::new(&input.email).map_err(|_| ConduitError::NotFound)?;

        let user = self
            .user_repo
            .find_user_by_email(&email)
            .await?
            .ok_or(ConduitError::NotFound)?;

        let password = ClearTextPassword::for_verification(input.password);
        if !user.password_hash.verify(&password, self.config.pepper()) {
            return Err(ConduitError::InvalidCredential);
        }

        tracing::info!(user_id = %user.id, "User logged in");

        self.authenticated(user)
    }

    /// Apply a partial update and refresh the author snapshot on every
    /// article the user wrote. Both writes share the caller's transaction.
    pub async fn update(
        &self,
        user_id: &UserId,
        input: UpdateUserInput,
    ) -> ConduitResult<AuthenticatedUser> {
        let mut user = self
            .user_repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(ConduitError::NotFound)?;

        let changes = UserChanges {
            email: input.email.map(Email::new).transpose()?,
            username: input.username.map(Username::new).transpose()?,
            password_hash: match input.password {
                Some(raw) => Some(ClearTextPassword::new(raw)?.hash(self.config.pepper())?),
                None => None,
            },
            bio: input.bio,
            image: input.image,
        };

        user.apply(changes);
        self.user_repo.update_user(&user).await?;

        let refreshed = self
            .article_repo
            .update_author_snapshot(&user.author())
            .await?;

        tracing::info!(
            user_id = %user.id,
            articles_refreshed = refreshed,
            "User updated"
        );

        self.authenticated(user)
    }

    /// The authenticated caller, with the token they presented
    pub async fn current(&self, user_id: &UserId, token: String) -> ConduitResult<AuthenticatedUser> {
        let user = self
            .user_repo
            .find_user_by_id(user_id)
            .await?
            .ok_or(ConduitError::NotFound)?;

        Ok(AuthenticatedUser { user, token })
    }

    fn authenticated(&self, user: User) -> ConduitResult<AuthenticatedUser> {
        let claims = AccessClaims::issue(
            &user,
            &self.config.token_issuer,
            self.config.token_ttl,
            Utc::now(),
        );
        let token = self.signer.sign(&claims)?;
        Ok(AuthenticatedUser { user, token })
    }
}
