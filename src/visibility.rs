//! The publication-visibility rule.
//!
//! A post is publicly visible iff it is published, its `pub_date` is not in the
//! future, and it either has no category or its category is published. The rule
//! exists twice: as a Rust predicate for rows already in memory, and as a SQL
//! fragment for listing queries. Both must agree.

use chrono::{DateTime, Utc};
use sqlx::{Postgres, QueryBuilder};

use crate::models::PostEntry;

/// is_visible
///
/// Whether `post` may appear in public listings at instant `now`. A post without
/// a category (`category_is_published` is `None`) is not held back by one.
pub fn is_visible(post: &PostEntry, now: DateTime<Utc>) -> bool {
    post.is_published
        && post.pub_date <= now
        && post.category_is_published.unwrap_or(true)
}

/// push_visible
///
/// Appends the SQL form of `is_visible` to a query that aliases `posts` as `p`
/// and LEFT JOINs `categories` as `c`. The caller must already be inside a
/// `WHERE` clause.
pub fn push_visible(builder: &mut QueryBuilder<'_, Postgres>, now: DateTime<Utc>) {
    builder.push(" AND p.is_published = TRUE AND p.pub_date <= ");
    builder.push_bind(now);
    builder.push(" AND (p.category_id IS NULL OR c.is_published = TRUE)");
}
