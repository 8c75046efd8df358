//! List assembly: filter, count, order and slice a post feed into one page.

use crate::{
    error::RepoError,
    models::PostPage,
    pagination::{POSTS_PER_PAGE, PageWindow},
    repository::{PostFilter, Repository},
};

/// assemble_page
///
/// Resolves the requested page against the filtered count, then fetches only that
/// slice. Each post comes annotated with its comment count, newest `pub_date` first.
pub async fn assemble_page(
    repo: &dyn Repository,
    filter: &PostFilter,
    requested_page: Option<&str>,
) -> Result<PostPage, RepoError> {
    let count = repo.count_posts(filter).await?;
    let window = PageWindow::resolve(requested_page, count, POSTS_PER_PAGE);
    let posts = repo
        .list_posts(filter, window.limit(), window.offset())
        .await?;

    tracing::debug!(
        page = window.number,
        num_pages = window.num_pages,
        count,
        "feed page assembled"
    );

    Ok(window.into_page(posts))
}
