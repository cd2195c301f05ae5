use sea_orm::{sea_query::OnConflict, DatabaseConnection};
use thiserror::Error;

use crate::{
    entity::prelude::*,
    ids::{FollowId, UserId},
};

#[derive(Debug, Error)]
pub enum FollowsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("user not found")]
    UserNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Created,
    AlreadyFollowing,
    /// Following yourself is refused; nothing was written.
    SelfFollow,
}

#[derive(Clone)]
pub struct FollowsService {
    db: DatabaseConnection,
}

impl FollowsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn author_by_username(&self, username: &str) -> Result<UserModel, FollowsServiceError> {
        User::find()
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(FollowsServiceError::UserNotFound)
    }

    /// Makes `user_id` follow `author`. Repeating it is harmless.
    pub async fn follow(
        &self,
        user_id: UserId,
        author: &str,
    ) -> Result<(UserModel, FollowOutcome), FollowsServiceError> {
        let author = self.author_by_username(author).await?;

        if author.id == user_id {
            return Ok((author, FollowOutcome::SelfFollow));
        }

        let edge = FollowActiveModel {
            id: Set(FollowId::new()),
            user_id: Set(user_id),
            author_id: Set(author.id),
        };

        let inserted = Follow::insert(edge)
            .on_conflict(
                OnConflict::columns([FollowColumn::UserId, FollowColumn::AuthorId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        let outcome = if inserted == 0 {
            FollowOutcome::AlreadyFollowing
        } else {
            tracing::info!(%user_id, author_id = %author.id, "follow created");
            FollowOutcome::Created
        };

        Ok((author, outcome))
    }

    /// Removes the edge if there is one. Returns whether anything was removed.
    pub async fn unfollow(
        &self,
        user_id: UserId,
        author: &str,
    ) -> Result<(UserModel, bool), FollowsServiceError> {
        let author = self.author_by_username(author).await?;

        let result = Follow::delete_many()
            .filter(FollowColumn::UserId.eq(user_id))
            .filter(FollowColumn::AuthorId.eq(author.id))
            .exec(&self.db)
            .await?;

        if result.rows_affected > 0 {
            tracing::info!(%user_id, author_id = %author.id, "follow removed");
        }

        Ok((author, result.rows_affected > 0))
    }

    pub async fn is_following(
        &self,
        user_id: UserId,
        author_id: UserId,
    ) -> Result<bool, FollowsServiceError> {
        let edge = Follow::find()
            .filter(FollowColumn::UserId.eq(user_id))
            .filter(FollowColumn::AuthorId.eq(author_id))
            .one(&self.db)
            .await?;

        Ok(edge.is_some())
    }

    /// Ids of every author `user_id` follows.
    pub async fn following_ids(&self, user_id: UserId) -> Result<Vec<UserId>, FollowsServiceError> {
        let edges = Follow::find()
            .filter(FollowColumn::UserId.eq(user_id))
            .all(&self.db)
            .await?;

        Ok(edges.into_iter().map(|edge| edge.author_id).collect())
    }
}
