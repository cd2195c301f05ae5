use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entity::prelude::*,
    ids::{CommentId, PostId, UserId},
};

#[derive(Debug, Error)]
pub enum CommentsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("post not found")]
    PostNotFound,
}

/// A comment with its author's username resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub id: CommentId,
    pub author: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct CommentsService {
    db: DatabaseConnection,
}

impl CommentsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Attach a comment by `author_id` to an existing post
    pub async fn add_comment(
        &self,
        post_id: PostId,
        author_id: UserId,
        text: String,
    ) -> Result<CommentModel, CommentsServiceError> {
        let post_exists = Post::find_by_id(post_id).one(&self.db).await?.is_some();

        if !post_exists {
            return Err(CommentsServiceError::PostNotFound);
        }

        let comment = CommentActiveModel {
            id: Set(CommentId::new()),
            post_id: Set(post_id),
            author_id: Set(author_id),
            text: Set(text),
            created_at: Set(Utc::now()),
        };

        let comment = Comment::insert(comment)
            .exec_with_returning(&self.db)
            .await?;

        tracing::info!(comment_id = %comment.id, %post_id, "comment added");
        Ok(comment)
    }

    /// Comments on a post, oldest first (conversation order)
    pub async fn list_for_post(
        &self,
        post_id: PostId,
    ) -> Result<Vec<CommentView>, CommentsServiceError> {
        let comments = Comment::find()
            .filter(CommentColumn::PostId.eq(post_id))
            .order_by_asc(CommentColumn::CreatedAt)
            .order_by_asc(CommentColumn::Id)
            .all(&self.db)
            .await?;

        let mut author_ids: Vec<UserId> = comments.iter().map(|c| c.author_id).collect();
        author_ids.sort();
        author_ids.dedup();

        let authors: HashMap<UserId, String> = User::find()
            .filter(UserColumn::Id.is_in(author_ids))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|user| (user.id, user.username))
            .collect();

        let views = comments
            .into_iter()
            .map(|comment| CommentView {
                id: comment.id,
                author: authors.get(&comment.author_id).cloned().unwrap_or_default(),
                text: comment.text,
                created_at: comment.created_at,
            })
            .collect();

        Ok(views)
    }
}
