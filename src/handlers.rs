use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    feed,
    models::{
        CategoryPage, Comment, CommentForm, NewPost, PageQuery, PostDetail, PostForm, PostPage,
        ProfileForm, ProfilePage, PublicProfile,
    },
    repository::{PostFilter, Repository},
    visibility,
};
use axum::{
    Form, Json,
    extract::{Path, Query, State},
    response::Redirect,
};
use chrono::Utc;

// --- URL helpers ---

pub fn post_url(id: i64) -> String {
    format!("/posts/{id}/")
}

pub fn profile_url(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

const INDEX_URL: &str = "/";

/// Rejects a form whose category or location does not exist.
async fn check_references(repo: &dyn Repository, post: &NewPost) -> Result<(), AppError> {
    if let Some(id) = post.category_id {
        if repo.get_category(id).await?.is_none() {
            return Err(AppError::Validation(
                "category: Select a valid choice.".to_string(),
            ));
        }
    }
    if let Some(id) = post.location_id {
        if repo.get_location(id).await?.is_none() {
            return Err(AppError::Validation(
                "location: Select a valid choice.".to_string(),
            ));
        }
    }
    Ok(())
}

// --- Feeds ---

/// index
///
/// [Public Route] The main feed: every visible post, ten per page.
#[utoipa::path(
    get,
    path = "/",
    params(PageQuery),
    responses((status = 200, description = "Index page", body = PostPage))
)]
pub async fn index(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PostPage>, AppError> {
    let filter = PostFilter::public(Utc::now());
    let page = feed::assemble_page(state.repo.as_ref(), &filter, query.page.as_deref()).await?;
    Ok(Json(page))
}

/// category_posts
///
/// [Public Route] Visible posts of one published category. An unpublished or
/// unknown category is not found.
#[utoipa::path(
    get,
    path = "/category/{slug}/",
    params(("slug" = String, Path, description = "Category slug"), PageQuery),
    responses(
        (status = 200, description = "Category page", body = CategoryPage),
        (status = 404, description = "Unknown or unpublished category")
    )
)]
pub async fn category_posts(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<CategoryPage>, AppError> {
    let category = state
        .repo
        .get_category_by_slug(&slug)
        .await?
        .filter(|c| c.is_published)
        .ok_or_else(|| AppError::NotFound(format!("category {slug}")))?;

    let filter = PostFilter::in_category(category.id, Utc::now());
    let page = feed::assemble_page(state.repo.as_ref(), &filter, query.page.as_deref()).await?;
    Ok(Json(CategoryPage { category, page }))
}

/// profile
///
/// [Public Route] A user's posts. The owner sees all of them, scheduled and
/// unpublished included; other viewers see the visible ones.
#[utoipa::path(
    get,
    path = "/profile/{username}/",
    params(("username" = String, Path, description = "Username"), PageQuery),
    responses(
        (status = 200, description = "Profile page", body = ProfilePage),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn profile(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfilePage>, AppError> {
    let user = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {username}")))?;

    let is_owner = viewer.is_some_and(|v| v.id == user.id);
    let filter = PostFilter::by_author(user.id, is_owner, Utc::now());
    let page = feed::assemble_page(state.repo.as_ref(), &filter, query.page.as_deref()).await?;

    Ok(Json(ProfilePage {
        profile: PublicProfile::from(&user),
        is_owner,
        page,
    }))
}

/// post_detail
///
/// [Public Route] One post with its comments, oldest first. Shown when visible,
/// or to its author regardless.
#[utoipa::path(
    get,
    path = "/posts/{id}/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Post detail", body = PostDetail),
        (status = 404, description = "Unknown or hidden post")
    )
)]
pub async fn post_detail(
    viewer: Option<AuthUser>,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, AppError> {
    let post = state
        .repo
        .get_post_entry(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

    let is_author = viewer.is_some_and(|v| v.id == post.author_id);
    if !is_author && !visibility::is_visible(&post, Utc::now()) {
        return Err(AppError::NotFound(format!("post {id}")));
    }

    let comments = state.repo.get_comments(id).await?;
    Ok(Json(PostDetail { post, comments }))
}

// --- Profile ---

/// edit_profile
///
/// [Authenticated Route] Owner-only. Updates the profile, then shows it under
/// the (possibly new) username. Anyone else is sent back to the profile.
#[utoipa::path(
    post,
    path = "/profile/{username}/edit/",
    params(("username" = String, Path, description = "Username")),
    request_body(content = ProfileForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the profile"),
        (status = 400, description = "Invalid form"),
        (status = 404, description = "Unknown user"),
        (status = 409, description = "Username taken")
    )
)]
pub async fn edit_profile(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect, AppError> {
    let owner = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {username}")))?;

    if let Err(denied) = actor.ensure_author(owner.id, &profile_url(&owner.username)) {
        return Ok(denied);
    }

    let update = form.validate()?;
    let user = state
        .repo
        .update_user(owner.id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {username}")))?;

    tracing::info!(user_id = %user.id, username = %user.username, "profile updated");
    Ok(Redirect::to(&profile_url(&user.username)))
}

// --- Posts ---

/// create_post
///
/// [Authenticated Route] Publishes a new post authored by the actor and shows
/// the actor's profile.
#[utoipa::path(
    post,
    path = "/posts/create/",
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the author's profile"),
        (status = 400, description = "Invalid form")
    )
)]
pub async fn create_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Form(form): Form<PostForm>,
) -> Result<Redirect, AppError> {
    let new_post = form.validate()?;
    check_references(state.repo.as_ref(), &new_post).await?;

    let post = state.repo.create_post(actor.id, new_post).await?;
    tracing::info!(post_id = post.id, author = %actor.username, "post created");
    Ok(Redirect::to(&profile_url(&actor.username)))
}

/// edit_post
///
/// [Authenticated Route] Author-only. Anyone else is sent back to the post.
#[utoipa::path(
    post,
    path = "/posts/{id}/edit/",
    params(("id" = i64, Path, description = "Post ID")),
    request_body(content = PostForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the post"),
        (status = 400, description = "Invalid form"),
        (status = 404, description = "Unknown post")
    )
)]
pub async fn edit_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<PostForm>,
) -> Result<Redirect, AppError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

    if let Err(denied) = actor.ensure_author(post.author_id, &post_url(id)) {
        return Ok(denied);
    }

    let changes = form.validate()?;
    check_references(state.repo.as_ref(), &changes).await?;

    state
        .repo
        .update_post(id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;
    tracing::info!(post_id = id, author = %actor.username, "post updated");
    Ok(Redirect::to(&post_url(id)))
}

/// delete_post
///
/// [Authenticated Route] Author-only. Removes the post and its comments.
#[utoipa::path(
    post,
    path = "/posts/{id}/delete/",
    params(("id" = i64, Path, description = "Post ID")),
    responses(
        (status = 303, description = "Redirect to the index, or to the post when refused"),
        (status = 404, description = "Unknown post")
    )
)]
pub async fn delete_post(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Redirect, AppError> {
    let post = state
        .repo
        .get_post(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post {id}")))?;

    if let Err(denied) = actor.ensure_author(post.author_id, &post_url(id)) {
        return Ok(denied);
    }

    state.repo.delete_post(id).await?;
    tracing::info!(post_id = id, author = %actor.username, "post deleted");
    Ok(Redirect::to(INDEX_URL))
}

// --- Comments ---

/// add_comment
///
/// [Authenticated Route] Comments on any existing post.
#[utoipa::path(
    post,
    path = "/posts/{id}/comment/",
    params(("id" = i64, Path, description = "Post ID")),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the post"),
        (status = 400, description = "Invalid form"),
        (status = 404, description = "Unknown post")
    )
)]
pub async fn add_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    if state.repo.get_post(post_id).await?.is_none() {
        return Err(AppError::NotFound(format!("post {post_id}")));
    }

    let text = form.validate()?;
    let comment = state.repo.add_comment(post_id, actor.id, text).await?;
    tracing::info!(comment_id = comment.id, post_id, author = %actor.username, "comment added");
    Ok(Redirect::to(&post_url(post_id)))
}

/// Loads a comment addressed as `/posts/{post_id}/.../{id}/`. A comment that
/// belongs to another post is not found.
async fn comment_of_post(
    repo: &dyn Repository,
    post_id: i64,
    id: i64,
) -> Result<Comment, AppError> {
    repo.get_comment(id)
        .await?
        .filter(|c| c.post_id == post_id)
        .ok_or_else(|| AppError::NotFound(format!("comment {id}")))
}

/// edit_comment
///
/// [Authenticated Route] Author-only. Anyone else is sent back to the post.
#[utoipa::path(
    post,
    path = "/posts/{id}/edit_comment/{comment_id}/",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    request_body(content = CommentForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Redirect to the post"),
        (status = 400, description = "Invalid form"),
        (status = 404, description = "Unknown comment")
    )
)]
pub async fn edit_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((post_id, id)): Path<(i64, i64)>,
    Form(form): Form<CommentForm>,
) -> Result<Redirect, AppError> {
    let comment = comment_of_post(state.repo.as_ref(), post_id, id).await?;

    if let Err(denied) = actor.ensure_author(comment.author_id, &post_url(post_id)) {
        return Ok(denied);
    }

    let text = form.validate()?;
    state
        .repo
        .update_comment(id, text)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("comment {id}")))?;
    tracing::info!(comment_id = id, post_id, author = %actor.username, "comment updated");
    Ok(Redirect::to(&post_url(post_id)))
}

/// delete_comment
///
/// [Authenticated Route] Author-only.
#[utoipa::path(
    post,
    path = "/posts/{id}/delete_comment/{comment_id}/",
    params(
        ("id" = i64, Path, description = "Post ID"),
        ("comment_id" = i64, Path, description = "Comment ID")
    ),
    responses(
        (status = 303, description = "Redirect to the index, or to the post when refused"),
        (status = 404, description = "Unknown comment")
    )
)]
pub async fn delete_comment(
    actor: AuthUser,
    State(state): State<AppState>,
    Path((post_id, id)): Path<(i64, i64)>,
) -> Result<Redirect, AppError> {
    let comment = comment_of_post(state.repo.as_ref(), post_id, id).await?;

    if let Err(denied) = actor.ensure_author(comment.author_id, &post_url(post_id)) {
        return Ok(denied);
    }

    state.repo.delete_comment(id).await?;
    tracing::info!(comment_id = id, post_id, author = %actor.username, "comment deleted");
    Ok(Redirect::to(INDEX_URL))
}
