mod common;

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use blogicum::{
    AppState, InMemoryRepository,
    handlers,
    models::{CommentForm, PageQuery, PostEntry, PostForm, ProfileForm},
    visibility,
};
use chrono::Utc;
use common::*;
use tokio::test;

// --- TEST UTILITIES ---

fn ids(posts: &[PostEntry]) -> Vec<i64> {
    posts.iter().map(|p| p.id).collect()
}

fn no_page() -> Query<PageQuery> {
    Query(PageQuery { page: None })
}

fn page(raw: &str) -> Query<PageQuery> {
    Query(PageQuery {
        page: Some(raw.to_string()),
    })
}

fn post_form(title: &str) -> Form<PostForm> {
    Form(PostForm {
        title: title.to_string(),
        text: "Some text".to_string(),
        pub_date: "2024-05-01T10:00".to_string(),
        category: Some(String::new()),
        location: Some(String::new()),
        image: None,
    })
}

fn comment_form(text: &str) -> Form<CommentForm> {
    Form(CommentForm {
        text: text.to_string(),
    })
}

async fn title_of(state: &AppState, id: i64) -> String {
    state.repo.get_post(id).await.unwrap().unwrap().title
}

// --- FEEDS ---

#[test]
async fn test_index_lists_only_visible_posts_newest_first() {
    let state = app_state(seeded_repo());

    let Json(page) = handlers::index(State(state), no_page()).await.unwrap();

    assert_eq!(ids(&page.posts), vec![ALICE_VISIBLE, BOB_VISIBLE]);
    assert_eq!(page.count, 2);
    assert_eq!(page.number, 1);
    assert_eq!(page.num_pages, 1);
    assert!(!page.has_next && !page.has_previous);
}

#[test]
async fn test_index_annotates_comment_counts() {
    let state = app_state(seeded_repo());

    let Json(page) = handlers::index(State(state), no_page()).await.unwrap();

    let counts: Vec<(i64, i64)> = page.posts.iter().map(|p| (p.id, p.comment_count)).collect();
    assert_eq!(counts, vec![(ALICE_VISIBLE, 2), (BOB_VISIBLE, 0)]);
}

#[test]
async fn test_index_membership_matches_visibility_predicate() {
    let state = app_state(seeded_repo());
    let Json(page) = handlers::index(State(state.clone()), no_page()).await.unwrap();
    let listed = ids(&page.posts);
    let now = Utc::now();

    for id in 1..=5 {
        let entry = state.repo.get_post_entry(id).await.unwrap().unwrap();
        assert_eq!(
            listed.contains(&id),
            visibility::is_visible(&entry, now),
            "post {id} listing disagrees with the predicate"
        );
    }
}

#[test]
async fn test_future_post_absent_from_index_but_on_own_profile() {
    let state = app_state(seeded_repo());

    let Json(index) = handlers::index(State(state.clone()), no_page()).await.unwrap();
    assert!(!ids(&index.posts).contains(&ALICE_SCHEDULED));

    let Json(profile) = handlers::profile(
        Some(alice()),
        State(state),
        Path("alice".to_string()),
        no_page(),
    )
    .await
    .unwrap();
    assert!(ids(&profile.page.posts).contains(&ALICE_SCHEDULED));
}

#[test]
async fn test_own_profile_shows_every_post() {
    let state = app_state(seeded_repo());

    let Json(profile) = handlers::profile(
        Some(alice()),
        State(state),
        Path("alice".to_string()),
        no_page(),
    )
    .await
    .unwrap();

    assert!(profile.is_owner);
    assert_eq!(profile.profile.username, "alice");
    assert_eq!(
        ids(&profile.page.posts),
        vec![ALICE_SCHEDULED, ALICE_VISIBLE, ALICE_UNPUBLISHED]
    );
}

#[test]
async fn test_other_profiles_are_filtered() {
    let state = app_state(seeded_repo());

    let Json(as_bob) = handlers::profile(
        Some(bob()),
        State(state.clone()),
        Path("alice".to_string()),
        no_page(),
    )
    .await
    .unwrap();
    assert!(!as_bob.is_owner);
    assert_eq!(ids(&as_bob.page.posts), vec![ALICE_VISIBLE]);

    let Json(anonymous) =
        handlers::profile(None, State(state), Path("bob".to_string()), no_page())
            .await
            .unwrap();
    // Post 4 sits in an unpublished category.
    assert_eq!(ids(&anonymous.page.posts), vec![BOB_VISIBLE]);
}

#[test]
async fn test_profile_unknown_user_not_found() {
    let state = app_state(seeded_repo());

    let result = handlers::profile(None, State(state), Path("nobody".to_string()), no_page()).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_category_feed() {
    let state = app_state(seeded_repo());

    let Json(travel) =
        handlers::category_posts(State(state), Path("travel".to_string()), no_page())
            .await
            .unwrap();

    assert_eq!(travel.category.id, TRAVEL);
    // The scheduled travel post stays hidden.
    assert_eq!(ids(&travel.page.posts), vec![ALICE_VISIBLE]);
}

#[test]
async fn test_unpublished_or_unknown_category_not_found() {
    let state = app_state(seeded_repo());

    for slug in ["drafts", "missing"] {
        let result =
            handlers::category_posts(State(state.clone()), Path(slug.to_string()), no_page())
                .await;
        assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND, "{slug}");
    }
}

#[test]
async fn test_pagination_clamps_out_of_range_pages() {
    let mut repo = InMemoryRepository::new().with_user(user(ALICE_ID, "alice"));
    for id in 1..=23 {
        repo = repo.with_post(post(id, ALICE_ID, days(-id), true, None));
    }
    let state = app_state(repo);

    let Json(third) = handlers::index(State(state.clone()), page("3")).await.unwrap();
    assert_eq!(third.number, 3);
    assert_eq!(third.num_pages, 3);
    assert_eq!(ids(&third.posts), vec![21, 22, 23]);
    assert!(third.has_previous && !third.has_next);

    let Json(beyond) = handlers::index(State(state.clone()), page("99")).await.unwrap();
    assert_eq!(beyond.number, 3);
    assert_eq!(ids(&beyond.posts), ids(&third.posts));

    let Json(first) = handlers::index(State(state.clone()), page("0")).await.unwrap();
    assert_eq!(first.number, 1);
    assert_eq!(first.posts.len(), 10);
    assert_eq!(first.posts[0].id, 1);

    let Json(garbage) = handlers::index(State(state), page("abc")).await.unwrap();
    assert_eq!(garbage.number, 1);
}

// --- DETAIL ---

#[test]
async fn test_post_detail_orders_comments_by_creation() {
    let state = app_state(seeded_repo());

    let Json(detail) = handlers::post_detail(None, State(state), Path(ALICE_VISIBLE))
        .await
        .unwrap();

    assert_eq!(detail.post.id, ALICE_VISIBLE);
    assert_eq!(detail.post.author_username, "alice");
    let comment_ids: Vec<i64> = detail.comments.iter().map(|c| c.id).collect();
    assert_eq!(comment_ids, vec![2, 1]);
    assert!(
        detail
            .comments
            .windows(2)
            .all(|w| w[0].created_at <= w[1].created_at)
    );
    assert_eq!(detail.comments[0].author_username.as_deref(), Some("alice"));
}

#[test]
async fn test_hidden_post_detail_only_for_author() {
    let state = app_state(seeded_repo());

    for viewer in [None, Some(bob())] {
        let result =
            handlers::post_detail(viewer, State(state.clone()), Path(ALICE_UNPUBLISHED)).await;
        assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
    }

    let Json(detail) =
        handlers::post_detail(Some(alice()), State(state), Path(ALICE_UNPUBLISHED))
            .await
            .unwrap();
    assert_eq!(detail.post.id, ALICE_UNPUBLISHED);
}

#[test]
async fn test_missing_post_detail_not_found() {
    let state = app_state(seeded_repo());

    let result = handlers::post_detail(Some(alice()), State(state), Path(999)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

// --- POST MUTATIONS ---

#[test]
async fn test_create_post_stamps_actor_as_author() {
    let state = app_state(seeded_repo());

    let redirect = handlers::create_post(bob(), State(state.clone()), post_form("Fresh"))
        .await
        .unwrap();
    assert_eq!(redirect_target(redirect), "/profile/bob/");

    let created = state.repo.get_post(BOB_VISIBLE + 1).await.unwrap().unwrap();
    assert_eq!(created.title, "Fresh");
    assert_eq!(created.author_id, BOB_ID);
    assert!(created.is_published);
    assert_eq!(created.category_id, None);
}

#[test]
async fn test_create_post_rejects_unknown_category() {
    let state = app_state(seeded_repo());
    let Form(mut form) = post_form("Lost");
    form.category = Some("42".to_string());

    let result = handlers::create_post(bob(), State(state.clone()), Form(form)).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::BAD_REQUEST);
    assert!(state.repo.get_post(BOB_VISIBLE + 1).await.unwrap().is_none());
}

#[test]
async fn test_edit_post_by_non_author_redirects_and_leaves_post() {
    let state = app_state(seeded_repo());

    let redirect = handlers::edit_post(
        bob(),
        State(state.clone()),
        Path(ALICE_VISIBLE),
        post_form("Hijacked"),
    )
    .await
    .unwrap();

    assert_eq!(redirect_target(redirect), "/posts/1/");
    assert_eq!(title_of(&state, ALICE_VISIBLE).await, "Post 1");
}

#[test]
async fn test_edit_post_by_author() {
    let state = app_state(seeded_repo());

    let redirect = handlers::edit_post(
        alice(),
        State(state.clone()),
        Path(ALICE_VISIBLE),
        post_form("Edited"),
    )
    .await
    .unwrap();

    assert_eq!(redirect_target(redirect), "/posts/1/");
    let post = state.repo.get_post(ALICE_VISIBLE).await.unwrap().unwrap();
    assert_eq!(post.title, "Edited");
    assert_eq!(post.author_id, ALICE_ID);
}

#[test]
async fn test_edit_missing_post_not_found() {
    let state = app_state(seeded_repo());

    let result = handlers::edit_post(alice(), State(state), Path(999), post_form("x")).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_delete_post_guarded_then_cascades() {
    let state = app_state(seeded_repo());

    let refused = handlers::delete_post(bob(), State(state.clone()), Path(ALICE_VISIBLE))
        .await
        .unwrap();
    assert_eq!(redirect_target(refused), "/posts/1/");
    assert!(state.repo.get_post(ALICE_VISIBLE).await.unwrap().is_some());

    let done = handlers::delete_post(alice(), State(state.clone()), Path(ALICE_VISIBLE))
        .await
        .unwrap();
    assert_eq!(redirect_target(done), "/");
    assert!(state.repo.get_post(ALICE_VISIBLE).await.unwrap().is_none());
    assert!(state.repo.get_comments(ALICE_VISIBLE).await.unwrap().is_empty());
    assert!(state.repo.get_comment(1).await.unwrap().is_none());
}

// --- COMMENTS ---

#[test]
async fn test_add_comment() {
    let state = app_state(seeded_repo());

    let redirect = handlers::add_comment(
        bob(),
        State(state.clone()),
        Path(BOB_VISIBLE),
        comment_form("  Nice one  "),
    )
    .await
    .unwrap();

    assert_eq!(redirect_target(redirect), "/posts/5/");
    let comments = state.repo.get_comments(BOB_VISIBLE).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Nice one");
    assert_eq!(comments[0].author_id, BOB_ID);
}

#[test]
async fn test_add_comment_to_missing_post_not_found() {
    let state = app_state(seeded_repo());

    let result = handlers::add_comment(bob(), State(state), Path(999), comment_form("hi")).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_blank_comment_rejected() {
    let state = app_state(seeded_repo());

    let result =
        handlers::add_comment(bob(), State(state), Path(BOB_VISIBLE), comment_form("   ")).await;

    assert_eq!(result.unwrap_err().status(), StatusCode::BAD_REQUEST);
}

#[test]
async fn test_edit_comment_by_non_author_redirects_and_leaves_comment() {
    let state = app_state(seeded_repo());

    // Comment 1 was written by bob.
    let redirect = handlers::edit_comment(
        alice(),
        State(state.clone()),
        Path((ALICE_VISIBLE, 1)),
        comment_form("rewritten"),
    )
    .await
    .unwrap();

    assert_eq!(redirect_target(redirect), "/posts/1/");
    let comment = state.repo.get_comment(1).await.unwrap().unwrap();
    assert_eq!(comment.text, "Comment 1");
}

#[test]
async fn test_edit_comment_by_author() {
    let state = app_state(seeded_repo());

    let redirect = handlers::edit_comment(
        bob(),
        State(state.clone()),
        Path((ALICE_VISIBLE, 1)),
        comment_form("rewritten"),
    )
    .await
    .unwrap();

    assert_eq!(redirect_target(redirect), "/posts/1/");
    let comment = state.repo.get_comment(1).await.unwrap().unwrap();
    assert_eq!(comment.text, "rewritten");
}

#[test]
async fn test_comment_addressed_under_wrong_post_not_found() {
    let state = app_state(seeded_repo());

    let result = handlers::edit_comment(
        bob(),
        State(state.clone()),
        Path((BOB_VISIBLE, 1)),
        comment_form("moved"),
    )
    .await;
    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);

    let result = handlers::delete_comment(bob(), State(state), Path((BOB_VISIBLE, 1))).await;
    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}

#[test]
async fn test_delete_comment_guarded() {
    let state = app_state(seeded_repo());

    let refused = handlers::delete_comment(alice(), State(state.clone()), Path((ALICE_VISIBLE, 1)))
        .await
        .unwrap();
    assert_eq!(redirect_target(refused), "/posts/1/");
    assert!(state.repo.get_comment(1).await.unwrap().is_some());

    let done = handlers::delete_comment(bob(), State(state.clone()), Path((ALICE_VISIBLE, 1)))
        .await
        .unwrap();
    assert_eq!(redirect_target(done), "/");
    assert!(state.repo.get_comment(1).await.unwrap().is_none());
}

// --- PROFILE ---

#[test]
async fn test_edit_profile_renames_and_redirects() {
    let state = app_state(seeded_repo());

    let redirect = handlers::edit_profile(
        alice(),
        State(state.clone()),
        Path("alice".to_string()),
        Form(ProfileForm {
            username: "alicia".to_string(),
            email: "alicia@example.com".to_string(),
            first_name: "Alicia".to_string(),
            last_name: "Liddell".to_string(),
        }),
    )
    .await
    .unwrap();

    assert_eq!(redirect_target(redirect), "/profile/alicia/");
    let user = state.repo.get_user(ALICE_ID).await.unwrap().unwrap();
    assert_eq!(user.username, "alicia");
    assert_eq!(user.last_name, "Liddell");
}

#[test]
async fn test_edit_profile_username_taken() {
    let state = app_state(seeded_repo());

    let result = handlers::edit_profile(
        alice(),
        State(state.clone()),
        Path("alice".to_string()),
        Form(ProfileForm {
            username: "bob".to_string(),
            ..ProfileForm::default()
        }),
    )
    .await;

    assert_eq!(result.unwrap_err().status(), StatusCode::CONFLICT);
    let user = state.repo.get_user(ALICE_ID).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
}

#[test]
async fn test_edit_profile_of_another_user_redirects() {
    let state = app_state(seeded_repo());

    let redirect = handlers::edit_profile(
        bob(),
        State(state.clone()),
        Path("alice".to_string()),
        Form(ProfileForm {
            username: "mallory".to_string(),
            ..ProfileForm::default()
        }),
    )
    .await
    .unwrap();

    assert_eq!(redirect_target(redirect), "/profile/alice/");
    let user = state.repo.get_user(ALICE_ID).await.unwrap().unwrap();
    assert_eq!(user.username, "alice");
}

#[test]
async fn test_edit_profile_of_unknown_user_not_found() {
    let state = app_state(seeded_repo());

    let result = handlers::edit_profile(
        alice(),
        State(state),
        Path("nobody".to_string()),
        Form(ProfileForm::default()),
    )
    .await;

    assert_eq!(result.unwrap_err().status(), StatusCode::NOT_FOUND);
}
