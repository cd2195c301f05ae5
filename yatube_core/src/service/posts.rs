use sea_orm::DatabaseConnection;
use thiserror::Error;

use crate::{
    entity::prelude::*,
    forms::{CleanedPostForm, Upload},
    ids::{PostId, UserId},
    media::{MediaStorage, POST_IMAGES_DIR},
};

#[derive(Debug, Error)]
pub enum PostsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("failed to store image")]
    Media(#[from] std::io::Error),

    #[error("post not found")]
    PostNotFound,

    #[error("unauthorized: not post author")]
    Unauthorized,
}

#[derive(Clone)]
pub struct PostsService {
    db: DatabaseConnection,
    media: MediaStorage,
}

impl PostsService {
    pub fn new(db: DatabaseConnection, media: MediaStorage) -> Self {
        Self { db, media }
    }

    async fn store_image(&self, image: Option<&Upload>) -> Result<Option<String>, PostsServiceError> {
        match image {
            Some(upload) => Ok(Some(self.media.save(POST_IMAGES_DIR, upload).await?)),
            None => Ok(None),
        }
    }

    /// Best effort: a file that can't be removed is only logged.
    async fn discard_image(&self, name: &str) {
        if let Err(e) = self.media.delete(name).await {
            tracing::warn!(image = name, error = %e, "failed to remove image");
        }
    }

    /// Create a new post authored by `author_id`
    pub async fn create_post(
        &self,
        author_id: UserId,
        form: CleanedPostForm,
    ) -> Result<PostModel, PostsServiceError> {
        let image = self.store_image(form.image.as_ref()).await?;

        let post = PostActiveModel {
            id: Set(PostId::new()),
            text: Set(form.text),
            created_at: Set(chrono::Utc::now()),
            author_id: Set(author_id),
            group_id: Set(form.group),
            image: Set(image.clone()),
        };

        let post = match Post::insert(post).exec_with_returning(&self.db).await {
            Ok(post) => post,
            Err(e) => {
                if let Some(name) = &image {
                    self.discard_image(name).await;
                }
                return Err(e.into());
            }
        };

        tracing::info!(post_id = %post.id, %author_id, "post created");
        Ok(post)
    }

    /// Get a specific post by ID
    pub async fn get_post(&self, post_id: PostId) -> Result<PostModel, PostsServiceError> {
        Post::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(PostsServiceError::PostNotFound)
    }

    /// Get a post for editing; only its author may.
    pub async fn get_post_for_edit(
        &self,
        post_id: PostId,
        user_id: UserId,
    ) -> Result<PostModel, PostsServiceError> {
        let post = self.get_post(post_id).await?;

        if post.author_id != user_id {
            return Err(PostsServiceError::Unauthorized);
        }

        Ok(post)
    }

    /// Update a post (only by author). Without a new upload the current
    /// image is kept; a replaced image is removed from storage.
    pub async fn update_post(
        &self,
        post_id: PostId,
        user_id: UserId,
        form: CleanedPostForm,
    ) -> Result<PostModel, PostsServiceError> {
        let post = self.get_post_for_edit(post_id, user_id).await?;
        let previous = post.image.clone();
        let image = self.store_image(form.image.as_ref()).await?;

        let mut post_active: PostActiveModel = post.into();
        post_active.text = Set(form.text);
        post_active.group_id = Set(form.group);
        if image.is_some() {
            post_active.image = Set(image.clone());
        }

        let updated = match post_active.update(&self.db).await {
            Ok(updated) => updated,
            Err(e) => {
                if let Some(name) = &image {
                    self.discard_image(name).await;
                }
                return Err(e.into());
            }
        };

        if let (Some(_), Some(old)) = (&image, &previous) {
            self.discard_image(old).await;
        }

        tracing::info!(%post_id, "post updated");
        Ok(updated)
    }

    /// Delete a post (only by author). Its comments and image go with it.
    pub async fn delete_post(&self, post_id: PostId, user_id: UserId) -> Result<(), PostsServiceError> {
        let post = self.get_post_for_edit(post_id, user_id).await?;

        Post::delete_by_id(post_id).exec(&self.db).await?;

        if let Some(image) = &post.image {
            self.media.delete(image).await?;
        }

        tracing::info!(%post_id, "post deleted");
        Ok(())
    }

    /// Count total posts by a user
    pub async fn count_posts_by_author(&self, author_id: UserId) -> Result<u64, PostsServiceError> {
        let count = Post::find()
            .filter(PostColumn::AuthorId.eq(author_id))
            .count(&self.db)
            .await?;

        Ok(count)
    }
}
