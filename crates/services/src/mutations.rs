//! # Mutation Coordinator
//!
//! Create and soft-delete posts on behalf of an authenticated caller. Every
//! mutation passes through the guard first; storage steps within one call run
//! strictly in order.

use std::sync::Arc;

use chrono::Utc;

use domains::{
    DomainError, NewPost, Post, PostId, PostRepository, Result, SessionClaims, StorageError,
    ThreadId, ThreadRepository,
};

use crate::content::{render_content, validate_content};
use crate::guard::{Action, AuthorizationGuard};

pub struct MutationCoordinator {
    guard: AuthorizationGuard,
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
}

impl MutationCoordinator {
    pub fn new(
        guard: AuthorizationGuard,
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
    ) -> Self {
        Self { guard, threads, posts }
    }

    /// The author is always `claims`' identity; there is no way to post as
    /// someone else. Returns the row as stored.
    #[tracing::instrument(skip(self, claims, content), fields(user_id = claims.map(|c| c.user_id().get())))]
    pub async fn create_post(
        &self,
        claims: Option<&SessionClaims>,
        thread_id: ThreadId,
        content: &str,
    ) -> Result<Post> {
        self.guard.authorize(claims, Action::CreatePost).await?.into_result()?;
        let claims = claims.ok_or(DomainError::AuthenticationFailed)?;

        let content = validate_content(content)?;
        if self.threads.find_thread(thread_id).await?.is_none() {
            return Err(DomainError::NotFound("thread", thread_id.get()));
        }

        let new_post = NewPost {
            thread_id,
            author_id: claims.user_id(),
            content: content.to_string(),
            content_html: render_content(content),
            created_at: Utc::now(),
        };
        let post_id = self.posts.insert_post(new_post).await?;

        let stored = self.posts.find_post(post_id).await?.ok_or_else(|| {
            StorageError::Unavailable(format!("post {post_id} missing after insert"))
        })?;

        tracing::info!(post_id = %stored.id, thread_id = %thread_id, "post created");
        Ok(stored)
    }

    /// Soft-deletes a post the caller owns, or any post if the caller currently
    /// holds the admin role. Returns rows affected: 1, or 0 when the post was
    /// already deleted.
    #[tracing::instrument(skip(self, claims), fields(user_id = claims.map(|c| c.user_id().get())))]
    pub async fn delete_post(&self, claims: Option<&SessionClaims>, post_id: PostId) -> Result<u64> {
        if claims.is_none() {
            return Err(DomainError::AuthenticationFailed);
        }

        let post = self
            .posts
            .find_post(post_id)
            .await?
            .ok_or(DomainError::NotFound("post", post_id.get()))?;

        self.guard
            .authorize(claims, Action::DeletePost { author_id: post.author_id })
            .await?
            .into_result()?;

        let affected = self.posts.soft_delete_post(post_id).await?;
        tracing::info!(%post_id, affected, "post soft-deleted");
        Ok(affected)
    }
}
