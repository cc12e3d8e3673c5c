//! Profile Service

use std::sync::Arc;

use kernel::id::UserId;

use crate::domain::entity::Profile;
use crate::domain::repository::UserRepository;
use crate::error::{ConduitError, ConduitResult};

pub struct ProfileService<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
}

impl<U> ProfileService<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>) -> Self {
        Self { user_repo }
    }

    /// Anonymous viewers always see `following = false`
    pub async fn find(&self, viewer: Option<&UserId>, username: &str) -> ConduitResult<Profile> {
        let target = self
            .user_repo
            .find_user_by_username(username)
            .await?
            .ok_or(ConduitError::NotFound)?;

        let following = match viewer {
            Some(viewer) => self.user_repo.exists_follow(viewer, &target.id).await?,
            None => false,
        };

        Ok(target.profile(following))
    }

    pub async fn follow(&self, viewer: &UserId, username: &str) -> ConduitResult<Profile> {
        let target = self
            .user_repo
            .find_user_by_username(username)
            .await?
            .ok_or(ConduitError::NotFound)?;

        if target.id == *viewer {
            return Err(ConduitError::SelfFollow);
        }

        self.user_repo.create_follow(viewer, &target.id).await?;

        tracing::info!(follower = %viewer, following = %target.id, "Follow created");

        Ok(target.profile(true))
    }

    /// Unfollowing a user that was never followed succeeds
    pub async fn unfollow(&self, viewer: &UserId, username: &str) -> ConduitResult<Profile> {
        let target = self
            .user_repo
            .find_user_by_username(username)
            .await?
            .ok_or(ConduitError::NotFound)?;

        self.user_repo.delete_follow(viewer, &target.id).await?;

        tracing::info!(follower = %viewer, following = %target.id, "Follow removed");

        Ok(target.profile(false))
    }
}
