use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PostFilter, Repository};
use crate::{
    error::RepoError,
    models::{Category, Comment, Location, NewPost, Post, PostEntry, ProfileUpdate, User},
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<Uuid, User>,
    categories: BTreeMap<i64, Category>,
    locations: BTreeMap<i64, Location>,
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    next_post_id: i64,
    next_comment_id: i64,
}

impl Tables {
    fn allocate_post_id(&mut self) -> i64 {
        self.next_post_id += 1;
        self.next_post_id
    }

    fn allocate_comment_id(&mut self) -> i64 {
        self.next_comment_id += 1;
        self.next_comment_id
    }

    fn username(&self, id: Uuid) -> Option<String> {
        self.users.get(&id).map(|u| u.username.clone())
    }

    /// Joins a post the way `ENTRY_SELECT` does in SQL.
    fn entry(&self, post: &Post) -> PostEntry {
        let category = post.category_id.and_then(|id| self.categories.get(&id));
        let location = post.location_id.and_then(|id| self.locations.get(&id));
        let comment_count = self
            .comments
            .values()
            .filter(|c| c.post_id == post.id)
            .count() as i64;

        PostEntry {
            id: post.id,
            title: post.title.clone(),
            text: post.text.clone(),
            pub_date: post.pub_date,
            image: post.image.clone(),
            is_published: post.is_published,
            created_at: post.created_at,
            author_id: post.author_id,
            author_username: self.username(post.author_id).unwrap_or_default(),
            category_id: category.map(|c| c.id),
            category_title: category.map(|c| c.title.clone()),
            category_slug: category.map(|c| c.slug.clone()),
            category_is_published: category.map(|c| c.is_published),
            location_id: location.map(|l| l.id),
            location_name: location.map(|l| l.name.clone()),
            location_is_published: location.map(|l| l.is_published),
            comment_count,
        }
    }

    fn with_author(&self, comment: &Comment) -> Comment {
        Comment {
            author_username: self.username(comment.author_id),
            ..comment.clone()
        }
    }

    fn filtered(&self, filter: &PostFilter) -> Vec<PostEntry> {
        let mut entries: Vec<PostEntry> = self
            .posts
            .values()
            .map(|p| self.entry(p))
            .filter(|e| filter.admits(e))
            .collect();
        entries.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        entries
    }
}

/// InMemoryRepository
///
/// A `Repository` held entirely in process memory, used by the test-suite to drive
/// handlers and the full router without a database. Seed it with the `with_*`
/// builders before sharing it.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, user: User) -> Self {
        self.tables.get_mut().users.insert(user.id, user);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.tables.get_mut().categories.insert(category.id, category);
        self
    }

    pub fn with_location(mut self, location: Location) -> Self {
        self.tables.get_mut().locations.insert(location.id, location);
        self
    }

    /// Inserts `post` as given, keeping its id.
    pub fn with_post(mut self, post: Post) -> Self {
        let tables = self.tables.get_mut();
        tables.next_post_id = tables.next_post_id.max(post.id);
        tables.posts.insert(post.id, post);
        self
    }

    /// Inserts `comment` as given, keeping its id and timestamp.
    pub fn with_comment(mut self, comment: Comment) -> Self {
        let tables = self.tables.get_mut();
        tables.next_comment_id = tables.next_comment_id.max(comment.id);
        tables.comments.insert(comment.id, comment);
        self
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.username == user.username) {
            return Err(RepoError::UsernameTaken(user.username));
        }
        let user = User {
            date_joined: Utc::now(),
            ..user
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        let mut tables = self.tables.write().await;
        if tables
            .users
            .values()
            .any(|u| u.id != id && u.username == update.username)
        {
            return Err(RepoError::UsernameTaken(update.username));
        }
        Ok(tables.users.get_mut(&id).map(|user| {
            user.username = update.username;
            user.email = update.email;
            user.first_name = update.first_name;
            user.last_name = update.last_name;
            user.clone()
        }))
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, RepoError> {
        Ok(self.tables.read().await.categories.get(&id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>, RepoError> {
        Ok(self.tables.read().await.locations.get(&id).cloned())
    }

    async fn count_posts(&self, filter: &PostFilter) -> Result<i64, RepoError> {
        Ok(self.tables.read().await.filtered(filter).len() as i64)
    }

    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let entries = self.tables.read().await.filtered(filter);
        Ok(entries
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepoError> {
        Ok(self.tables.read().await.posts.get(&id).cloned())
    }

    async fn get_post_entry(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.get(&id).map(|p| tables.entry(p)))
    }

    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post, RepoError> {
        let mut tables = self.tables.write().await;
        let created = Post {
            id: tables.allocate_post_id(),
            title: post.title,
            text: post.text,
            pub_date: post.pub_date,
            image: post.image,
            is_published: true,
            created_at: Utc::now(),
            author_id,
            location_id: post.location_id,
            category_id: post.category_id,
        };
        tables.posts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_post(&self, id: i64, post: NewPost) -> Result<Option<Post>, RepoError> {
        let mut tables = self.tables.write().await;
        Ok(tables.posts.get_mut(&id).map(|existing| {
            existing.title = post.title;
            existing.text = post.text;
            existing.pub_date = post.pub_date;
            existing.image = post.image;
            existing.location_id = post.location_id;
            existing.category_id = post.category_id;
            existing.clone()
        }))
    }

    async fn delete_post(&self, id: i64) -> Result<bool, RepoError> {
        let mut tables = self.tables.write().await;
        let deleted = tables.posts.remove(&id).is_some();
        if deleted {
            tables.comments.retain(|_, c| c.post_id != id);
        }
        Ok(deleted)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.get(&id).map(|c| tables.with_author(c)))
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| tables.with_author(c))
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, RepoError> {
        let mut tables = self.tables.write().await;
        let comment = Comment {
            id: tables.allocate_comment_id(),
            text,
            created_at: Utc::now(),
            author_id,
            post_id,
            author_username: None,
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(tables.with_author(&comment))
    }

    async fn update_comment(&self, id: i64, text: String) -> Result<Option<Comment>, RepoError> {
        let mut tables = self.tables.write().await;
        let updated = tables.comments.get_mut(&id).map(|comment| {
            comment.text = text;
            comment.clone()
        });
        Ok(updated.map(|c| tables.with_author(&c)))
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, RepoError> {
        Ok(self.tables.write().await.comments.remove(&id).is_some())
    }
}
