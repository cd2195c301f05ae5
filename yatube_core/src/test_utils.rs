use sea_orm::DatabaseConnection;

use crate::{entity::prelude::*, ids::*, models};

/// 2x1 transparent GIF, small enough to inline in tests.
pub const SMALL_GIF: &[u8] = b"\x47\x49\x46\x38\x39\x61\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xFF\xFF\xFF\x21\xF9\x04\x00\x00\x00\x00\x00\x2C\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0C\x0A\x00\x3B";

/// Create a fresh in-memory SQLite database with migrations applied.
/// Each call gets its own isolated database.
pub async fn setup_test_db() -> DatabaseConnection {
    let db = models::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");

    models::migrate_up(&db)
        .await
        .expect("Failed to run migrations");

    db
}

pub async fn create_user(db: &DatabaseConnection, username: &str) -> UserModel {
    UserActiveModel {
        id: Set(UserId::new()),
        username: Set(username.to_string()),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(db)
    .await
    .expect("Failed to insert user")
}

pub async fn create_group(db: &DatabaseConnection, slug: &str) -> GroupModel {
    GroupActiveModel {
        id: Set(GroupId::new()),
        title: Set(format!("Group {slug}")),
        slug: Set(slug.to_string()),
        description: Set("Test".to_string()),
    }
    .insert(db)
    .await
    .expect("Failed to insert group")
}

/// Inserts a post with an explicit timestamp offset (in seconds) from now,
/// so tests control the feed order.
pub async fn create_post_at(
    db: &DatabaseConnection,
    author: &UserModel,
    group: Option<&GroupModel>,
    text: &str,
    offset_secs: i64,
) -> PostModel {
    PostActiveModel {
        id: Set(PostId::new()),
        text: Set(text.to_string()),
        created_at: Set(chrono::Utc::now() + chrono::Duration::seconds(offset_secs)),
        author_id: Set(author.id),
        group_id: Set(group.map(|g| g.id)),
        image: Set(None),
    }
    .insert(db)
    .await
    .expect("Failed to insert post")
}

pub async fn create_post(
    db: &DatabaseConnection,
    author: &UserModel,
    group: Option<&GroupModel>,
    text: &str,
) -> PostModel {
    create_post_at(db, author, group, text, 0).await
}
