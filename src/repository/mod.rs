use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::RepoError,
    models::{Category, Comment, Location, NewPost, Post, PostEntry, ProfileUpdate, User},
    visibility,
};

mod memory;
mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// PostFilter
///
/// Selects the posts of one feed. Filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub category_id: Option<i64>,
    pub author_id: Option<Uuid>,
    /// Keep only posts visible at this instant. `None` switches the visibility
    /// rule off, which only an author's own profile does.
    pub visible_at: Option<DateTime<Utc>>,
}

impl PostFilter {
    /// The index feed.
    pub fn public(now: DateTime<Utc>) -> Self {
        Self {
            visible_at: Some(now),
            ..Self::default()
        }
    }

    pub fn in_category(category_id: i64, now: DateTime<Utc>) -> Self {
        Self {
            category_id: Some(category_id),
            visible_at: Some(now),
            ..Self::default()
        }
    }

    /// A profile feed. The owner sees everything they wrote; everyone else sees
    /// only what is visible.
    pub fn by_author(author_id: Uuid, viewer_is_author: bool, now: DateTime<Utc>) -> Self {
        Self {
            author_id: Some(author_id),
            visible_at: (!viewer_is_author).then_some(now),
            ..Self::default()
        }
    }

    /// In-memory form of the filter.
    pub fn admits(&self, entry: &PostEntry) -> bool {
        self.category_id
            .is_none_or(|id| entry.category_id == Some(id))
            && self.author_id.is_none_or(|id| entry.author_id == id)
            && self
                .visible_at
                .is_none_or(|now| visibility::is_visible(entry, now))
    }
}

/// Repository Trait
///
/// The persistence contract. Handlers only see `Arc<dyn Repository>`, so the
/// Postgres implementation and the in-memory one are interchangeable.
///
/// Lookups return `Ok(None)` for missing rows; `Err` is reserved for storage failures.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError>;
    // Mirrors a provider identity seen for the first time.
    async fn create_user(&self, user: User) -> Result<User, RepoError>;
    // Fails with `UsernameTaken` if another user holds the new username.
    async fn update_user(&self, id: Uuid, update: ProfileUpdate)
    -> Result<Option<User>, RepoError>;

    // --- Categories & Locations ---
    async fn get_category(&self, id: i64) -> Result<Option<Category>, RepoError>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError>;
    async fn get_location(&self, id: i64) -> Result<Option<Location>, RepoError>;

    // --- Post feeds ---
    async fn count_posts(&self, filter: &PostFilter) -> Result<i64, RepoError>;
    // Ordered by pub_date descending, then id descending.
    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostEntry>, RepoError>;

    // --- Posts ---
    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepoError>;
    async fn get_post_entry(&self, id: i64) -> Result<Option<PostEntry>, RepoError>;
    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post, RepoError>;
    // Leaves author, published flag and creation time untouched.
    async fn update_post(&self, id: i64, post: NewPost) -> Result<Option<Post>, RepoError>;
    // Cascades to the post's comments. Returns false if nothing was deleted.
    async fn delete_post(&self, id: i64) -> Result<bool, RepoError>;

    // --- Comments ---
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, RepoError>;
    // Oldest first.
    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, RepoError>;
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, RepoError>;
    async fn update_comment(&self, id: i64, text: String) -> Result<Option<Comment>, RepoError>;
    async fn delete_comment(&self, id: i64) -> Result<bool, RepoError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;
