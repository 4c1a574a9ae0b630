//! # Content Aggregator
//!
//! Assembles a thread view: header, live posts oldest first, and a redacted
//! author block per post. A purged author yields `author: null` instead of
//! failing the whole view.

use std::collections::HashMap;
use std::sync::Arc;

use domains::{
    AuthorSummary, DomainError, PostRepository, PostView, Result, ThreadId, ThreadRepository,
    ThreadView, UserId, UserRepository,
};

use crate::role_directory::RoleDirectory;

pub struct ContentAggregator {
    threads: Arc<dyn ThreadRepository>,
    posts: Arc<dyn PostRepository>,
    users: Arc<dyn UserRepository>,
    directory: RoleDirectory,
}

impl ContentAggregator {
    pub fn new(
        threads: Arc<dyn ThreadRepository>,
        posts: Arc<dyn PostRepository>,
        users: Arc<dyn UserRepository>,
        directory: RoleDirectory,
    ) -> Self {
        Self { threads, posts, users, directory }
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_thread(&self, thread_id: ThreadId) -> Result<ThreadView> {
        let thread = self
            .threads
            .find_thread(thread_id)
            .await?
            .ok_or(DomainError::NotFound("thread", thread_id.get()))?;

        let posts = self.posts.live_posts_for_thread(thread_id).await?;

        // Each distinct author is looked up once per view.
        let mut authors: HashMap<UserId, Option<AuthorSummary>> = HashMap::new();
        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            if !authors.contains_key(&post.author_id) {
                let summary = self.author_summary(post.author_id).await?;
                authors.insert(post.author_id, summary);
            }
            let author = authors.get(&post.author_id).cloned().flatten();
            views.push(PostView { post, author });
        }

        Ok(ThreadView { thread, posts: views })
    }

    async fn author_summary(&self, author_id: UserId) -> Result<Option<AuthorSummary>> {
        let Some(user) = self.users.find_by_id(author_id).await? else {
            tracing::debug!(%author_id, "post author no longer exists");
            return Ok(None);
        };
        let primary_role = self.directory.primary_role(author_id).await?;
        Ok(Some(AuthorSummary { profile: user.profile(), primary_role }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{post, thread, user};
    use domains::{
        MockPostRepository, MockRoleRepository, MockThreadRepository, MockUserRepository, PostId, Role,
        RoleId,
    };

    fn aggregator(
        threads: MockThreadRepository,
        posts: MockPostRepository,
        users: MockUserRepository,
        roles: MockRoleRepository,
    ) -> ContentAggregator {
        ContentAggregator::new(
            Arc::new(threads),
            Arc::new(posts),
            Arc::new(users),
            RoleDirectory::new(Arc::new(roles)),
        )
    }

    #[tokio::test]
    async fn unknown_thread_is_not_found() {
        let mut threads = MockThreadRepository::new();
        threads.expect_find_thread().returning(|_| Ok(None));
        let mut posts = MockPostRepository::new();
        posts.expect_live_posts_for_thread().never();

        let err = aggregator(threads, posts, MockUserRepository::new(), MockRoleRepository::new())
            .get_thread(ThreadId(404))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound("thread", 404)));
    }

    #[tokio::test]
    async fn empty_thread_is_valid() {
        let mut threads = MockThreadRepository::new();
        threads.expect_find_thread().returning(|id| Ok(Some(thread(id.get()))));
        let mut posts = MockPostRepository::new();
        posts.expect_live_posts_for_thread().returning(|_| Ok(Vec::new()));

        let view = aggregator(threads, posts, MockUserRepository::new(), MockRoleRepository::new())
            .get_thread(ThreadId(42))
            .await
            .unwrap();
        assert_eq!(view.thread.id, ThreadId(42));
        assert!(view.posts.is_empty());
    }

    #[tokio::test]
    async fn authors_are_redacted_and_resolved_once() {
        let mut threads = MockThreadRepository::new();
        threads.expect_find_thread().returning(|id| Ok(Some(thread(id.get()))));
        let mut posts = MockPostRepository::new();
        posts.expect_live_posts_for_thread().returning(|_| {
            Ok(vec![post(1, 42, 7, false), post(2, 42, 7, false), post(3, 42, 8, false)])
        });
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().times(2).returning(|id| {
            // User 8 has been purged.
            Ok((id == UserId(7)).then(|| user(7)))
        });
        let mut roles = MockRoleRepository::new();
        roles.expect_roles_for_user().times(1).returning(|_| {
            Ok(vec![
                Role { id: RoleId(3), name: "member".into(), privilege_level: 30 },
                Role { id: RoleId(2), name: "moderator".into(), privilege_level: 10 },
            ])
        });

        let view = aggregator(threads, posts, users, roles).get_thread(ThreadId(42)).await.unwrap();

        let ids: Vec<PostId> = view.posts.iter().map(|p| p.post.id).collect();
        assert_eq!(ids, vec![PostId(1), PostId(2), PostId(3)]);
        let first = view.posts[0].author.as_ref().unwrap();
        assert_eq!(first.primary_role, Some(RoleId(2)));
        assert!(view.posts[2].author.is_none());

        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("password_hash"));
    }
}
