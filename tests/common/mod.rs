#![allow(dead_code)]

use axum::{
    body::to_bytes,
    http::{StatusCode, header},
    response::{IntoResponse, Redirect, Response},
};
use blogicum::{
    AppConfig, AppState, InMemoryRepository,
    auth::AuthUser,
    models::{Category, Comment, Location, Post, User},
};
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use uuid::Uuid;

pub const ALICE_ID: Uuid = Uuid::from_u128(0xA11CE);
pub const BOB_ID: Uuid = Uuid::from_u128(0xB0B);

pub const TRAVEL: i64 = 1;
pub const DRAFTS: i64 = 2;

// Post ids of the seeded dataset.
pub const ALICE_VISIBLE: i64 = 1;
pub const ALICE_SCHEDULED: i64 = 2;
pub const ALICE_UNPUBLISHED: i64 = 3;
pub const BOB_IN_HIDDEN_CATEGORY: i64 = 4;
pub const BOB_VISIBLE: i64 = 5;

pub fn user(id: Uuid, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        first_name: username.to_string(),
        last_name: "Tester".to_string(),
        date_joined: Utc::now() - Duration::days(30),
    }
}

pub fn category(id: i64, slug: &str, is_published: bool) -> Category {
    Category {
        id,
        title: slug.to_uppercase(),
        description: format!("All about {slug}"),
        slug: slug.to_string(),
        is_published,
        created_at: Utc::now() - Duration::days(30),
    }
}

pub fn location(id: i64, name: &str) -> Location {
    Location {
        id,
        name: name.to_string(),
        is_published: true,
        created_at: Utc::now() - Duration::days(30),
    }
}

pub fn post(
    id: i64,
    author_id: Uuid,
    pub_date: DateTime<Utc>,
    is_published: bool,
    category_id: Option<i64>,
) -> Post {
    Post {
        id,
        title: format!("Post {id}"),
        text: format!("Body of post {id}"),
        pub_date,
        image: None,
        is_published,
        created_at: pub_date,
        author_id,
        location_id: None,
        category_id,
    }
}

pub fn comment(id: i64, post_id: i64, author_id: Uuid, created_at: DateTime<Utc>) -> Comment {
    Comment {
        id,
        text: format!("Comment {id}"),
        created_at,
        author_id,
        post_id,
        author_username: None,
    }
}

pub fn days(n: i64) -> DateTime<Utc> {
    Utc::now() + Duration::days(n)
}

/// Two users, a published and an unpublished category, and five posts covering
/// every branch of the visibility rule. Post 1 carries two comments whose ids
/// run against their creation order.
pub fn seeded_repo() -> InMemoryRepository {
    let now = Utc::now();
    InMemoryRepository::new()
        .with_user(user(ALICE_ID, "alice"))
        .with_user(user(BOB_ID, "bob"))
        .with_category(category(TRAVEL, "travel", true))
        .with_category(category(DRAFTS, "drafts", false))
        .with_location(location(1, "Lisbon"))
        .with_post(post(ALICE_VISIBLE, ALICE_ID, days(-2), true, Some(TRAVEL)))
        .with_post(post(ALICE_SCHEDULED, ALICE_ID, days(3), true, Some(TRAVEL)))
        .with_post(post(ALICE_UNPUBLISHED, ALICE_ID, days(-4), false, None))
        .with_post(post(BOB_IN_HIDDEN_CATEGORY, BOB_ID, days(-1), true, Some(DRAFTS)))
        .with_post(post(BOB_VISIBLE, BOB_ID, days(-3), true, None))
        .with_comment(comment(1, ALICE_VISIBLE, BOB_ID, now - Duration::minutes(10)))
        .with_comment(comment(2, ALICE_VISIBLE, ALICE_ID, now - Duration::minutes(50)))
}

pub fn app_state(repo: InMemoryRepository) -> AppState {
    AppState {
        repo: Arc::new(repo),
        config: AppConfig::default(),
    }
}

pub fn alice() -> AuthUser {
    AuthUser {
        id: ALICE_ID,
        username: "alice".to_string(),
    }
}

pub fn bob() -> AuthUser {
    AuthUser {
        id: BOB_ID,
        username: "bob".to_string(),
    }
}

/// Asserts a 303 redirect and returns its target.
pub fn redirect_target(redirect: Redirect) -> String {
    let response = redirect.into_response();
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .expect("redirect without Location")
        .to_string()
}

pub async fn body_json<T: DeserializeOwned>(response: Response) -> T {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
