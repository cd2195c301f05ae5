use sea_orm::{DatabaseConnection, SqlErr};
use thiserror::Error;

use crate::{entity::prelude::*, ids::UserId};

const MAX_USERNAME_LEN: usize = 150;

#[derive(Debug, Error)]
pub enum UsersServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("user not found")]
    UserNotFound,

    #[error("username already taken")]
    UsernameTaken,

    #[error("usernames are 1-150 letters, digits and @/./+/-/_")]
    InvalidUsername,
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.chars().count() <= MAX_USERNAME_LEN
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Two requests can both pass the lookup; the unique index settles it.
fn insert_error(e: DbErr) -> UsersServiceError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => UsersServiceError::UsernameTaken,
        _ => UsersServiceError::DbError(e),
    }
}

#[derive(Clone)]
pub struct UsersService {
    db: DatabaseConnection,
}

impl UsersService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create_user(&self, username: &str) -> Result<UserModel, UsersServiceError> {
        if !is_valid_username(username) {
            return Err(UsersServiceError::InvalidUsername);
        }

        let taken = User::find()
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .is_some();

        if taken {
            return Err(UsersServiceError::UsernameTaken);
        }

        let user = UserActiveModel {
            id: Set(UserId::new()),
            username: Set(username.to_string()),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&self.db)
        .await
        .map_err(insert_error)?;

        tracing::info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    pub async fn get(&self, user_id: UserId) -> Result<UserModel, UsersServiceError> {
        User::find_by_id(user_id)
            .one(&self.db)
            .await?
            .ok_or(UsersServiceError::UserNotFound)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<UserModel, UsersServiceError> {
        User::find()
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(UsersServiceError::UserNotFound)
    }

    /// Removes the user. Their posts, comments and follow edges go with them.
    pub async fn delete_user(&self, user_id: UserId) -> Result<(), UsersServiceError> {
        let result = User::delete_by_id(user_id).exec(&self.db).await?;
        if result.rows_affected == 0 {
            return Err(UsersServiceError::UserNotFound);
        }

        tracing::info!(%user_id, "user deleted");
        Ok(())
    }
}
