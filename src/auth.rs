use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, RepoError},
    models::User,
    repository::RepositoryState,
};

/// Claims
///
/// The payload of a JWT issued by the external identity provider.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the provider's user UUID, which is also `users.id`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    /// Used to provision the blog's user record the first time `sub` is seen.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// AuthUser
///
/// The resolved identity of the acting user. Mutating handlers take it as an
/// argument; public pages take `Option<AuthUser>`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub username: String,
}

impl From<User> for AuthUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

impl AuthUser {
    /// ensure_author
    ///
    /// The ownership guard for edit/delete. Passes when the actor wrote the
    /// resource; otherwise yields the redirect to `fallback` (the post's detail
    /// page) that the handler must return instead of acting.
    pub fn ensure_author(&self, author_id: Uuid, fallback: &str) -> Result<(), Redirect> {
        if self.id == author_id {
            return Ok(());
        }
        tracing::warn!(
            actor = %self.username,
            %author_id,
            "mutation refused: actor is not the author"
        );
        Err(Redirect::to(fallback))
    }
}

/// AuthRejection
///
/// Why a request has no actor. A missing or invalid identity sends the client to
/// the login flow, carrying the original path in `next`.
#[derive(Debug)]
pub enum AuthRejection {
    Login(String),
    Repository(RepoError),
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            AuthRejection::Login(location) => Redirect::to(&location).into_response(),
            AuthRejection::Repository(e) => AppError::from(e).into_response(),
        }
    }
}

fn login_redirect(parts: &Parts, config: &AppConfig) -> AuthRejection {
    let next = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    AuthRejection::Login(format!(
        "{}?next={}",
        config.login_url,
        urlencoding::encode(next)
    ))
}

/// resolve_actor
///
/// 1. Reuse an identity already resolved by the auth middleware.
/// 2. Local only: accept the UUID of an existing user in the `x-user-id` header.
/// 3. Validate the bearer JWT and load (or provision) the user it names.
async fn resolve_actor(
    parts: &Parts,
    repo: &RepositoryState,
    config: &AppConfig,
) -> Result<AuthUser, AuthRejection> {
    if let Some(user) = parts.extensions.get::<AuthUser>() {
        return Ok(user.clone());
    }

    if config.env == Env::Local {
        let bypass_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok());
        if let Some(user_id) = bypass_id {
            if let Some(user) = repo
                .get_user(user_id)
                .await
                .map_err(AuthRejection::Repository)?
            {
                return Ok(user.into());
            }
        }
    }

    let token = parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| login_redirect(parts, config))?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            tracing::debug!("rejected bearer token: {}", e);
            return Err(login_redirect(parts, config));
        }
    };

    if let Some(user) = repo
        .get_user(claims.sub)
        .await
        .map_err(AuthRejection::Repository)?
    {
        return Ok(user.into());
    }

    // First sight of this identity: mirror it, if the token names a username.
    let Some(username) = claims.preferred_username else {
        return Err(login_redirect(parts, config));
    };
    let new_user = User {
        id: claims.sub,
        username,
        email: claims.email.unwrap_or_default(),
        ..User::default()
    };
    match repo.create_user(new_user).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, username = %user.username, "user provisioned");
            Ok(user.into())
        }
        Err(RepoError::UsernameTaken(name)) => {
            tracing::warn!(username = %name, "cannot provision user: username taken");
            Err(login_redirect(parts, config))
        }
        Err(e) => Err(AuthRejection::Repository(e)),
    }
}

/// AuthUser Extractor Implementation
///
/// Required identity. Rejection: redirect to the login flow.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        resolve_actor(parts, &repo, &config).await
    }
}

/// Optional identity for public pages: any failure reads as an anonymous visitor.
impl<S> OptionalFromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);
        Ok(resolve_actor(parts, &repo, &config).await.ok())
    }
}
