//! Feed composition: the index, group, profile and follow feeds, plus the
//! post detail page. Everything here is a read.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, Select};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    entity::prelude::*,
    ids::{GroupId, PostId, UserId},
    pagination::{self, Page, PageRequest},
    service::comments::{CommentView, CommentsService, CommentsServiceError},
};

#[derive(Debug, Error)]
pub enum FeedServiceError {
    #[error("fatal database error")]
    DbError(#[from] DbErr),

    #[error("group not found")]
    GroupNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("post not found")]
    PostNotFound,
}

impl From<CommentsServiceError> for FeedServiceError {
    fn from(error: CommentsServiceError) -> Self {
        match error {
            CommentsServiceError::DbError(e) => FeedServiceError::DbError(e),
            CommentsServiceError::PostNotFound => FeedServiceError::PostNotFound,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRef {
    pub title: String,
    pub slug: String,
}

/// A post as it appears in any feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostView {
    pub id: PostId,
    pub text: String,
    pub created_at: DateTime<Utc>,
    pub author: String,
    pub group: Option<GroupRef>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupFeed {
    pub group: GroupModel,
    pub page: Page<PostView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileFeed {
    pub author: UserModel,
    pub posts_count: u64,
    /// Whether the viewer follows this author. Always false for anonymous
    /// viewers and on one's own profile.
    pub following: bool,
    pub page: Page<PostView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostDetail {
    pub post: PostView,
    pub author_posts_count: u64,
    pub comments: Vec<CommentView>,
}

#[derive(Clone)]
pub struct FeedService {
    db: DatabaseConnection,
    page_size: u64,
}

impl FeedService {
    pub fn new(db: DatabaseConnection, page_size: u64) -> Self {
        Self { db, page_size }
    }

    /// Newest first; the id breaks ties between equal timestamps.
    fn newest_first(select: Select<Post>) -> Select<Post> {
        select
            .order_by_desc(PostColumn::CreatedAt)
            .order_by_desc(PostColumn::Id)
    }

    async fn page_of(
        &self,
        select: Select<Post>,
        request: &PageRequest,
    ) -> Result<Page<PostView>, FeedServiceError> {
        let mut page =
            pagination::fetch_page(&self.db, Self::newest_first(select), self.page_size, request)
                .await?;
        let posts = std::mem::take(&mut page.items);
        let views = self.hydrate(posts).await?;

        Ok(page.with_items(views))
    }

    /// Resolves author usernames and groups for a batch of posts.
    async fn hydrate(&self, posts: Vec<PostModel>) -> Result<Vec<PostView>, DbErr> {
        let mut author_ids: Vec<UserId> = posts.iter().map(|p| p.author_id).collect();
        author_ids.sort();
        author_ids.dedup();

        let mut group_ids: Vec<GroupId> = posts.iter().filter_map(|p| p.group_id).collect();
        group_ids.sort();
        group_ids.dedup();

        let authors: HashMap<UserId, String> = if author_ids.is_empty() {
            HashMap::new()
        } else {
            User::find()
                .filter(UserColumn::Id.is_in(author_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|user| (user.id, user.username))
                .collect()
        };

        let groups: HashMap<GroupId, GroupRef> = if group_ids.is_empty() {
            HashMap::new()
        } else {
            Group::find()
                .filter(GroupColumn::Id.is_in(group_ids))
                .all(&self.db)
                .await?
                .into_iter()
                .map(|group| {
                    (
                        group.id,
                        GroupRef {
                            title: group.title,
                            slug: group.slug,
                        },
                    )
                })
                .collect()
        };

        let views = posts
            .into_iter()
            .map(|post| PostView {
                id: post.id,
                author: authors.get(&post.author_id).cloned().unwrap_or_default(),
                group: post.group_id.and_then(|id| groups.get(&id).cloned()),
                text: post.text,
                created_at: post.created_at,
                image: post.image,
            })
            .collect();

        Ok(views)
    }

    /// Every post on the site
    pub async fn index(&self, request: &PageRequest) -> Result<Page<PostView>, FeedServiceError> {
        self.page_of(Post::find(), request).await
    }

    /// Posts filed under the group with this slug
    pub async fn group(
        &self,
        slug: &str,
        request: &PageRequest,
    ) -> Result<GroupFeed, FeedServiceError> {
        let group = Group::find()
            .filter(GroupColumn::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or(FeedServiceError::GroupNotFound)?;

        let page = self
            .page_of(Post::find().filter(PostColumn::GroupId.eq(group.id)), request)
            .await?;

        Ok(GroupFeed { group, page })
    }

    /// An author's posts, as seen by `viewer`
    pub async fn profile(
        &self,
        username: &str,
        viewer: Option<UserId>,
        request: &PageRequest,
    ) -> Result<ProfileFeed, FeedServiceError> {
        let author = User::find()
            .filter(UserColumn::Username.eq(username))
            .one(&self.db)
            .await?
            .ok_or(FeedServiceError::UserNotFound)?;

        let by_author = Post::find().filter(PostColumn::AuthorId.eq(author.id));
        let posts_count = by_author.clone().count(&self.db).await?;

        let following = match viewer {
            Some(viewer) if viewer != author.id => Follow::find()
                .filter(FollowColumn::UserId.eq(viewer))
                .filter(FollowColumn::AuthorId.eq(author.id))
                .one(&self.db)
                .await?
                .is_some(),
            _ => false,
        };

        let page = self.page_of(by_author, request).await?;

        Ok(ProfileFeed {
            author,
            posts_count,
            following,
            page,
        })
    }

    /// Posts by every author `user_id` follows. Empty if they follow nobody.
    pub async fn follow(
        &self,
        user_id: UserId,
        request: &PageRequest,
    ) -> Result<Page<PostView>, FeedServiceError> {
        let author_ids: Vec<UserId> = Follow::find()
            .filter(FollowColumn::UserId.eq(user_id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|edge| edge.author_id)
            .collect();

        if author_ids.is_empty() {
            return Ok(Page::empty());
        }

        self.page_of(
            Post::find().filter(PostColumn::AuthorId.is_in(author_ids)),
            request,
        )
        .await
    }

    /// One post with its comments
    pub async fn detail(&self, post_id: PostId) -> Result<PostDetail, FeedServiceError> {
        let post = Post::find_by_id(post_id)
            .one(&self.db)
            .await?
            .ok_or(FeedServiceError::PostNotFound)?;

        let author_posts_count = Post::find()
            .filter(PostColumn::AuthorId.eq(post.author_id))
            .count(&self.db)
            .await?;

        let comments = CommentsService::new(self.db.clone())
            .list_for_post(post_id)
            .await?;

        let post = self
            .hydrate(vec![post])
            .await?
            .pop()
            .ok_or(FeedServiceError::PostNotFound)?;

        Ok(PostDetail {
            post,
            author_posts_count,
            comments,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{pagination::DEFAULT_PAGE_SIZE, test_utils};

    async fn setup() -> (DatabaseConnection, FeedService) {
        let db = test_utils::setup_test_db().await;
        let service = FeedService::new(db.clone(), DEFAULT_PAGE_SIZE);
        (db, service)
    }

    #[tokio::test]
    async fn test_index_pages_of_ten_then_five() {
        let (db, feed) = setup().await;
        let author = test_utils::create_user(&db, "auth").await;
        let group = test_utils::create_group(&db, "test-slug").await;
        for i in 0..15 {
            test_utils::create_post_at(&db, &author, Some(&group), &format!("post {i}"), i).await;
        }

        let first = feed.index(&PageRequest::default()).await.unwrap();
        let second = feed.index(&PageRequest::number(2)).await.unwrap();

        assert_eq!(first.len(), 10);
        assert_eq!(second.len(), 5);
        assert_eq!(first.num_pages, 2);
        assert_eq!(first.count, 15);
        assert!(first.has_next && !first.has_previous);
        assert!(second.has_previous && !second.has_next);

        let group_second = feed.group("test-slug", &PageRequest::number(2)).await.unwrap();
        assert_eq!(group_second.page.len(), 5);
        let profile_second = feed
            .profile("auth", None, &PageRequest::number(2))
            .await
            .unwrap();
        assert_eq!(profile_second.page.len(), 5);
        assert_eq!(profile_second.posts_count, 15);
    }

    #[tokio::test]
    async fn test_index_is_newest_first_and_hydrated() {
        let (db, feed) = setup().await;
        let author = test_utils::create_user(&db, "auth").await;
        let group = test_utils::create_group(&db, "test-slug").await;
        test_utils::create_post_at(&db, &author, None, "older", -60).await;
        let newest = test_utils::create_post_at(&db, &author, Some(&group), "newer", 0).await;

        let page = feed.index(&PageRequest::default()).await.unwrap();
        let texts: Vec<_> = page.items.iter().map(|p| p.text.as_str()).collect();

        assert_eq!(texts, ["newer", "older"]);
        assert_eq!(page.items[0].id, newest.id);
        assert_eq!(page.items[0].author, "auth");
        assert_eq!(
            page.items[0].group,
            Some(GroupRef {
                title: "Group test-slug".into(),
                slug: "test-slug".into(),
            })
        );
        assert_eq!(page.items[1].group, None);
    }

    #[tokio::test]
    async fn test_out_of_range_pages_clamp() {
        let (db, feed) = setup().await;
        let author = test_utils::create_user(&db, "auth").await;
        for i in 0..12 {
            test_utils::create_post_at(&db, &author, None, &format!("post {i}"), i).await;
        }

        let past_end = feed.index(&PageRequest::number(99)).await.unwrap();
        let garbage = feed
            .index(&PageRequest {
                page: Some("abc".into()),
            })
            .await
            .unwrap();

        assert_eq!(past_end.number, 2);
        assert_eq!(past_end.len(), 2);
        assert_eq!(garbage.number, 1);
        assert_eq!(garbage.len(), 10);
    }

    #[tokio::test]
    async fn test_group_feed_only_shows_its_posts() {
        let (db, feed) = setup().await;
        let author = test_utils::create_user(&db, "auth").await;
        let group = test_utils::create_group(&db, "one").await;
        let other = test_utils::create_group(&db, "two").await;
        test_utils::create_post(&db, &author, Some(&group), "in one").await;
        test_utils::create_post(&db, &author, Some(&other), "in two").await;

        let result = feed.group("one", &PageRequest::default()).await.unwrap();

        assert_eq!(result.group.id, group.id);
        assert_eq!(result.page.len(), 1);
        assert_eq!(result.page.items[0].text, "in one");
        assert!(matches!(
            feed.group("missing", &PageRequest::default()).await,
            Err(FeedServiceError::GroupNotFound)
        ));
    }

    #[tokio::test]
    async fn test_profile_following_flag() {
        let (db, feed) = setup().await;
        let author = test_utils::create_user(&db, "auth").await;
        let reader = test_utils::create_user(&db, "reader").await;
        FollowActiveModel {
            id: Set(crate::ids::FollowId::new()),
            user_id: Set(reader.id),
            author_id: Set(author.id),
        }
        .insert(&db)
        .await
        .unwrap();

        let req = PageRequest::default();
        assert!(feed.profile("auth", Some(reader.id), &req).await.unwrap().following);
        assert!(!feed.profile("auth", None, &req).await.unwrap().following);
        assert!(!feed.profile("auth", Some(author.id), &req).await.unwrap().following);
        assert!(!feed.profile("reader", Some(author.id), &req).await.unwrap().following);
        assert!(matches!(
            feed.profile("ghost", None, &req).await,
            Err(FeedServiceError::UserNotFound)
        ));
    }

    #[tokio::test]
    async fn test_follow_feed_lists_followed_authors_only() {
        let (db, feed) = setup().await;
        let author = test_utils::create_user(&db, "auth").await;
        let stranger = test_utils::create_user(&db, "stranger").await;
        let reader = test_utils::create_user(&db, "reader").await;
        test_utils::create_post(&db, &author, None, "followed").await;
        test_utils::create_post(&db, &stranger, None, "not followed").await;

        let before = feed.follow(reader.id, &PageRequest::default()).await.unwrap();
        assert!(before.is_empty());
        assert_eq!(before.num_pages, 1);

        FollowActiveModel {
            id: Set(crate::ids::FollowId::new()),
            user_id: Set(reader.id),
            author_id: Set(author.id),
        }
        .insert(&db)
        .await
        .unwrap();

        let after = feed.follow(reader.id, &PageRequest::default()).await.unwrap();
        let texts: Vec<_> = after.items.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(texts, ["followed"]);

        let strangers_feed = feed.follow(stranger.id, &PageRequest::default()).await.unwrap();
        assert!(strangers_feed.is_empty());
    }

    #[tokio::test]
    async fn test_detail_includes_comments_and_count() {
        let (db, feed) = setup().await;
        let author = test_utils::create_user(&db, "auth").await;
        let post = test_utils::create_post(&db, &author, None, "Тестовый текст").await;
        test_utils::create_post(&db, &author, None, "another").await;
        CommentsService::new(db.clone())
            .add_comment(post.id, author.id, "nice".into())
            .await
            .unwrap();

        let detail = feed.detail(post.id).await.unwrap();

        assert_eq!(detail.post.text, "Тестовый текст");
        assert_eq!(detail.author_posts_count, 2);
        assert_eq!(detail.comments.len(), 1);
        assert_eq!(detail.comments[0].text, "nice");
        assert!(matches!(
            feed.detail(PostId::new()).await,
            Err(FeedServiceError::PostNotFound)
        ));
    }
}
