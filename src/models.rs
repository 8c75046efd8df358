use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::AppError;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The blog's record of an identity owned by the external provider. The `id` is the
/// provider's subject; everything else is profile data the blog lets users edit.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
}

/// Category
///
/// A thematic section. Unpublishing a category hides every post filed under it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub title: String,
    pub description: String,
    // Unique, URL-safe identifier used by `/category/{slug}/`.
    pub slug: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Location
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Location {
    pub id: i64,
    pub name: String,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// A raw row of the `posts` table. Listing and detail pages use the joined
/// `PostEntry` instead.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub text: String,
    // A future value schedules the post; it stays hidden until then.
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    // Both references become NULL when the referenced row is deleted.
    pub location_id: Option<i64>,
    pub category_id: Option<i64>,
}

/// PostEntry
///
/// A post joined with its author, category and location, annotated with the
/// number of comments. This is the shape every feed and the detail page return.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct PostEntry {
    pub id: i64,
    pub title: String,
    pub text: String,
    #[ts(type = "string")]
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub is_published: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub author_username: String,
    pub category_id: Option<i64>,
    pub category_title: Option<String>,
    pub category_slug: Option<String>,
    // NULL exactly when the post has no category.
    pub category_is_published: Option<bool>,
    pub location_id: Option<i64>,
    pub location_name: Option<String>,
    pub location_is_published: Option<bool>,
    pub comment_count: i64,
}

/// Comment
///
/// A comment row augmented with the author's username (a join).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub author_id: Uuid,
    pub post_id: i64,
    #[sqlx(default)]
    pub author_username: Option<String>,
}

/// NewPost
///
/// Validated post fields, ready for insertion or update. The author is never part
/// of it: create stamps the acting user, edit keeps the original author.
#[derive(Debug, Clone, Default)]
pub struct NewPost {
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    pub image: Option<String>,
    pub category_id: Option<i64>,
    pub location_id: Option<i64>,
}

/// ProfileUpdate
///
/// Validated profile fields for `Repository::update_user`.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

// --- Request Payloads (HTML forms) ---

const MAX_TITLE_LEN: usize = 256;
const MAX_USERNAME_LEN: usize = 150;

/// PostForm
///
/// Form body for creating or editing a post. Every field arrives as text; an
/// empty `category`/`location`/`image` means "none".
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// `YYYY-MM-DDTHH:MM` as sent by a `datetime-local` input, or RFC 3339.
    #[schema(example = "2025-03-01T12:30")]
    #[serde(default)]
    pub pub_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Reference to an already stored image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl PostForm {
    /// Checks every field and converts the form into `NewPost`. All problems are
    /// reported together, one `field: message` pair per line.
    pub fn validate(self) -> Result<NewPost, AppError> {
        let mut errors = Vec::new();

        let title = self.title.trim().to_string();
        if title.is_empty() {
            errors.push("title: This field is required.".to_string());
        } else if title.chars().count() > MAX_TITLE_LEN {
            errors.push(format!("title: Ensure this value has at most {MAX_TITLE_LEN} characters."));
        }

        let text = self.text.trim().to_string();
        if text.is_empty() {
            errors.push("text: This field is required.".to_string());
        }

        let pub_date = match self.pub_date.trim() {
            "" => {
                errors.push("pub_date: This field is required.".to_string());
                None
            }
            raw => {
                let parsed = parse_form_datetime(raw);
                if parsed.is_none() {
                    errors.push("pub_date: Enter a valid date/time.".to_string());
                }
                parsed
            }
        };

        let category_id = parse_optional_id("category", self.category.as_deref(), &mut errors);
        let location_id = parse_optional_id("location", self.location.as_deref(), &mut errors);

        let image = self
            .image
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty());

        match (errors.is_empty(), pub_date) {
            (true, Some(pub_date)) => Ok(NewPost {
                title,
                text,
                pub_date,
                image,
                category_id,
                location_id,
            }),
            _ => Err(AppError::Validation(errors.join("\n"))),
        }
    }
}

/// CommentForm
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

impl CommentForm {
    pub fn validate(self) -> Result<String, AppError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(AppError::Validation(
                "text: This field is required.".to_string(),
            ));
        }
        Ok(text.to_string())
    }
}

/// ProfileForm
///
/// Form body for `POST /profile/{username}/edit/`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfileForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl ProfileForm {
    pub fn validate(self) -> Result<ProfileUpdate, AppError> {
        let mut errors = Vec::new();

        let username = self.username.trim().to_string();
        if username.is_empty() {
            errors.push("username: This field is required.".to_string());
        } else if username.chars().count() > MAX_USERNAME_LEN {
            errors.push(format!(
                "username: Ensure this value has at most {MAX_USERNAME_LEN} characters."
            ));
        } else if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            errors.push(
                "username: Letters, digits and @/./+/-/_ only.".to_string(),
            );
        }

        let email = self.email.trim().to_string();
        if !email.is_empty() && !looks_like_email(&email) {
            errors.push("email: Enter a valid email address.".to_string());
        }

        if !errors.is_empty() {
            return Err(AppError::Validation(errors.join("\n")));
        }

        Ok(ProfileUpdate {
            username,
            email,
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
        })
    }
}

/// PageQuery
///
/// `?page=` as received. Kept as text: anything that is not an integer means page 1.
#[derive(Debug, Clone, Deserialize, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<String>,
}

// --- Page Schemas (Output) ---

/// PostPage
///
/// One page of a post feed.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostPage {
    /// 1-based number of this page, after clamping.
    pub number: i64,
    pub num_pages: i64,
    /// Number of posts across all pages.
    pub count: i64,
    pub has_previous: bool,
    pub has_next: bool,
    pub posts: Vec<PostEntry>,
}

/// PublicProfile
///
/// The part of a `User` shown on their profile page.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PublicProfile {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    #[ts(type = "string")]
    pub date_joined: DateTime<Utc>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            date_joined: user.date_joined,
        }
    }
}

/// ProfilePage
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ProfilePage {
    pub profile: PublicProfile,
    /// True when the viewer is looking at their own profile; the feed then
    /// includes unpublished and scheduled posts.
    pub is_owner: bool,
    pub page: PostPage,
}

/// CategoryPage
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategoryPage {
    pub category: Category,
    pub page: PostPage,
}

/// PostDetail
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct PostDetail {
    pub post: PostEntry,
    /// Oldest first.
    pub comments: Vec<Comment>,
}

// --- Form parsing helpers ---

/// Parses a form date/time. Naive values are taken as UTC.
pub fn parse_form_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
    ]
    .iter()
    .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    .map(|naive| naive.and_utc())
}

fn parse_optional_id(field: &str, raw: Option<&str>, errors: &mut Vec<String>) -> Option<i64> {
    match raw.map(str::trim) {
        None | Some("") => None,
        Some(value) => match value.parse::<i64>() {
            Ok(id) if id > 0 => Some(id),
            _ => {
                errors.push(format!("{field}: Select a valid choice."));
                None
            }
        },
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
