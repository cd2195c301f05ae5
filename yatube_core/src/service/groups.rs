use sea_orm::{DatabaseConnection, SqlErr};
use thiserror::Error;

use crate::{entity::prelude::*, ids::GroupId};

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum GroupsServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("group not found")]
    GroupNotFound,

    #[error("slug already in use")]
    SlugTaken,

    #[error("slugs are letters, digits, hyphens and underscores")]
    InvalidSlug,

    #[error("title must be 1-200 characters")]
    InvalidTitle,
}

/// Letters, digits, `-` and `_`, nothing else.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn insert_error(e: DbErr) -> GroupsServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => GroupsServiceError::SlugTaken,
        _ => GroupsServiceError::DbError(e),
    }
}

#[derive(Clone)]
pub struct GroupsService {
    db: DatabaseConnection,
}

impl GroupsService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_group(
        &self,
        title: &str,
        slug: &str,
        description: &str,
    ) -> Result<GroupModel, GroupsServiceError> {
        let title_len = title.trim().chars().count();
        if title_len == 0 || title_len > MAX_TITLE_LEN {
            return Err(GroupsServiceError::InvalidTitle);
        }

        if !is_valid_slug(slug) {
            return Err(GroupsServiceError::InvalidSlug);
        }

        let taken = Group::find()
            .filter(GroupColumn::Slug.eq(slug))
            .one(&self.db)
            .await?
            .is_some();

        if taken {
            return Err(GroupsServiceError::SlugTaken);
        }

        let group = GroupActiveModel {
            id: Set(GroupId::new()),
            title: Set(title.trim().to_string()),
            slug: Set(slug.to_string()),
            description: Set(description.to_string()),
        }
        .insert(&self.db)
        .await
        .map_err(insert_error)?;

        tracing::info!(group_id = %group.id, slug = %group.slug, "group created");
        Ok(group)
    }

    pub async fn get_by_slug(&self, slug: &str) -> Result<GroupModel, GroupsServiceError> {
        Group::find()
            .filter(GroupColumn::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(GroupsServiceError::GroupNotFound)
    }

    /// All groups by title; these are the choices offered on the post form.
    pub async fn list_groups(&self) -> Result<Vec<GroupModel>, GroupsServiceError> {
        let groups = Group::find()
            .order_by_asc(GroupColumn::Title)
            .all(&self.db)
            .await?;

        Ok(groups)
    }

    /// Deletes the group. Its posts stay, with their group cleared.
    pub async fn delete_group(&self, slug: &str) -> Result<(), GroupsServiceError> {
        let group = self.get_by_slug(slug).await?;

        Group::delete_by_id(group.id).exec(&self.db).await?;

        tracing::info!(group_id = %group.id, slug, "group deleted");
        Ok(())
    }
}
