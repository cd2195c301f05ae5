pub mod cache;
pub mod entity;
pub mod forms;
pub mod ids;
pub mod media;
pub mod models;
pub mod pagination;
pub mod sessions;

use sea_orm::DatabaseConnection;

use crate::{
    cache::PageCache,
    error::StartupError,
    media::MediaStorage,
    service::{
        comments::CommentsService, feed::FeedService, follows::FollowsService,
        groups::GroupsService, posts::PostsService, users::UsersService,
    },
    sessions::SessionStore,
};

pub mod service;

pub mod error;

pub mod config;

#[cfg(test)]
pub(crate) mod test_utils;

/// Main runtime handle for Yatube. Cloning is cheap; every clone shares the
/// same database pool, page cache and session table.
#[derive(Clone)]
pub struct Yatube {
    pub config: config::YatubeConfig,

    pub db: DatabaseConnection,

    pub users: UsersService,
    pub groups: GroupsService,
    pub posts: PostsService,
    pub comments: CommentsService,
    pub follows: FollowsService,
    pub feed: FeedService,

    /// Rendered index pages.
    pub cache: PageCache,

    pub sessions: SessionStore,
    pub media: MediaStorage,
}

impl Yatube {
    /// Opens the configured database, brings its schema up to date and
    /// wires the services together.
    pub async fn start(config: config::YatubeConfig) -> Result<Self, StartupError> {
        let db = models::open_or_create_db(&config).await?;
        models::migrate_up(&db).await?;

        Ok(Self::with_db(config, db))
    }

    /// Builds the handle around an already migrated connection.
    pub fn with_db(config: config::YatubeConfig, db: DatabaseConnection) -> Self {
        let media = MediaStorage::new(config.media_root.clone());

        tracing::info!(
            page_size = config.page_size,
            cache_ttl_secs = config.index_cache_ttl_secs,
            "yatube core ready"
        );

        Self {
            users: UsersService::new(db.clone()),
            groups: GroupsService::new(db.clone()),
            posts: PostsService::new(db.clone(), media.clone()),
            comments: CommentsService::new(db.clone()),
            follows: FollowsService::new(db.clone()),
            feed: FeedService::new(db.clone(), config.page_size),
            cache: PageCache::new(config.index_cache_ttl()),
            sessions: SessionStore::new(),
            media,
            db,
            config,
        }
    }
}

pub mod prelude {
    pub use super::ids;
    pub use super::entity;
    pub use super::models;

    pub use super::service;

    pub use super::error;

    pub use super::config;

    pub use super::Yatube;
}
