use async_trait::async_trait;
use sqlx::{PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{PostFilter, Repository};
use crate::{
    error::RepoError,
    models::{Category, Comment, Location, NewPost, Post, PostEntry, ProfileUpdate, User},
    visibility,
};

/// Columns of `PostEntry`. Aliases: `p` posts, `u` users, `c` categories, `l` locations.
const ENTRY_SELECT: &str = r#"
    SELECT
        p.id, p.title, p.text, p.pub_date, p.image, p.is_published, p.created_at,
        p.author_id, u.username AS author_username,
        p.category_id, c.title AS category_title, c.slug AS category_slug,
        c.is_published AS category_is_published,
        p.location_id, l.name AS location_name, l.is_published AS location_is_published,
        (SELECT COUNT(*) FROM comments cm WHERE cm.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
    LEFT JOIN locations l ON l.id = p.location_id
    WHERE TRUE
"#;

const POST_COLUMNS: &str =
    "id, title, text, pub_date, image, is_published, created_at, author_id, location_id, category_id";

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, date_joined";

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the `PostFilter` conditions. The query must alias posts as `p` and
/// LEFT JOIN categories as `c`, and already be inside a `WHERE` clause.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    if let Some(category_id) = filter.category_id {
        builder.push(" AND p.category_id = ");
        builder.push_bind(category_id);
    }
    if let Some(author_id) = filter.author_id {
        builder.push(" AND p.author_id = ");
        builder.push_bind(author_id);
    }
    if let Some(now) = filter.visible_at {
        visibility::push_visible(builder, now);
    }
}

/// Maps a unique-constraint violation on `users.username` to `UsernameTaken`.
fn username_conflict(e: sqlx::Error, username: &str) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::UsernameTaken(username.to_string())
        }
        _ => RepoError::Database(e),
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    /// create_user
    ///
    /// Inserts the mirror record of a provider identity. `date_joined` is set by the database.
    async fn create_user(&self, user: User) -> Result<User, RepoError> {
        sqlx::query_as::<_, User>(&format!(
            r#"INSERT INTO users (id, username, email, first_name, last_name)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| username_conflict(e, &user.username))
    }

    async fn update_user(
        &self,
        id: Uuid,
        update: ProfileUpdate,
    ) -> Result<Option<User>, RepoError> {
        sqlx::query_as::<_, User>(&format!(
            r#"UPDATE users
               SET username = $2, email = $3, first_name = $4, last_name = $5
               WHERE id = $1
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(id)
        .bind(&update.username)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| username_conflict(e, &update.username))
    }

    async fn get_category(&self, id: i64) -> Result<Option<Category>, RepoError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, description, slug, is_published, created_at FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, description, slug, is_published, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn get_location(&self, id: i64) -> Result<Option<Location>, RepoError> {
        let location = sqlx::query_as::<_, Location>(
            "SELECT id, name, is_published, created_at FROM locations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(location)
    }

    /// count_posts
    ///
    /// Counts the rows `list_posts` would page through, using the same filter SQL.
    async fn count_posts(&self, filter: &PostFilter) -> Result<i64, RepoError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "SELECT COUNT(*) FROM posts p LEFT JOIN categories c ON c.id = p.category_id WHERE TRUE",
        );
        push_filter(&mut builder, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// list_posts
    ///
    /// One slice of a feed, built with QueryBuilder so every filter value is bound.
    async fn list_posts(
        &self,
        filter: &PostFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PostEntry>, RepoError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(ENTRY_SELECT);
        push_filter(&mut builder, filter);

        builder.push(" ORDER BY p.pub_date DESC, p.id DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let posts = builder
            .build_query_as::<PostEntry>()
            .fetch_all(&self.pool)
            .await?;
        Ok(posts)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>, RepoError> {
        let post = sqlx::query_as::<_, Post>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(post)
    }

    async fn get_post_entry(&self, id: i64) -> Result<Option<PostEntry>, RepoError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(ENTRY_SELECT);
        builder.push(" AND p.id = ");
        builder.push_bind(id);

        let post = builder
            .build_query_as::<PostEntry>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    /// create_post
    ///
    /// New posts are published by default; scheduling is done through `pub_date`.
    async fn create_post(&self, author_id: Uuid, post: NewPost) -> Result<Post, RepoError> {
        let created = sqlx::query_as::<_, Post>(&format!(
            r#"INSERT INTO posts (title, text, pub_date, image, author_id, location_id, category_id)
               VALUES ($1, $2, $3, $4, $5, $6, $7)
               RETURNING {POST_COLUMNS}"#
        ))
        .bind(post.title)
        .bind(post.text)
        .bind(post.pub_date)
        .bind(post.image)
        .bind(author_id)
        .bind(post.location_id)
        .bind(post.category_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_post(&self, id: i64, post: NewPost) -> Result<Option<Post>, RepoError> {
        let updated = sqlx::query_as::<_, Post>(&format!(
            r#"UPDATE posts
               SET title = $2, text = $3, pub_date = $4, image = $5,
                   location_id = $6, category_id = $7
               WHERE id = $1
               RETURNING {POST_COLUMNS}"#
        ))
        .bind(id)
        .bind(post.title)
        .bind(post.text)
        .bind(post.pub_date)
        .bind(post.image)
        .bind(post.location_id)
        .bind(post.category_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    /// delete_post
    ///
    /// Comments go with the post through `ON DELETE CASCADE`.
    async fn delete_post(&self, id: i64) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>, RepoError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"SELECT cm.id, cm.text, cm.created_at, cm.author_id, cm.post_id,
                      u.username AS author_username
               FROM comments cm
               JOIN users u ON u.id = cm.author_id
               WHERE cm.id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn get_comments(&self, post_id: i64) -> Result<Vec<Comment>, RepoError> {
        let comments = sqlx::query_as::<_, Comment>(
            r#"SELECT cm.id, cm.text, cm.created_at, cm.author_id, cm.post_id,
                      u.username AS author_username
               FROM comments cm
               JOIN users u ON u.id = cm.author_id
               WHERE cm.post_id = $1
               ORDER BY cm.created_at ASC, cm.id ASC"#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(comments)
    }

    /// add_comment
    ///
    /// Inserts and joins the author's username in one statement.
    async fn add_comment(
        &self,
        post_id: i64,
        author_id: Uuid,
        text: String,
    ) -> Result<Comment, RepoError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (text, author_id, post_id) VALUES ($1, $2, $3)
                RETURNING id, text, created_at, author_id, post_id
            )
            SELECT i.id, i.text, i.created_at, i.author_id, i.post_id, u.username AS author_username
            FROM inserted i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(text)
        .bind(author_id)
        .bind(post_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn update_comment(&self, id: i64, text: String) -> Result<Option<Comment>, RepoError> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            WITH updated AS (
                UPDATE comments SET text = $2 WHERE id = $1
                RETURNING id, text, created_at, author_id, post_id
            )
            SELECT i.id, i.text, i.created_at, i.author_id, i.post_id, u.username AS author_username
            FROM updated i JOIN users u ON u.id = i.author_id
            "#,
        )
        .bind(id)
        .bind(text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn delete_comment(&self, id: i64) -> Result<bool, RepoError> {
        let res = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
