//! # services
//!
//! The session and access-control core: role directory, credential verifier,
//! authorization guard, content aggregator and mutation coordinator. Every
//! component receives its ports explicitly; none of them reaches for global
//! state.

pub mod aggregator;
pub mod content;
pub mod credentials;
pub mod guard;
pub mod mutations;
pub mod role_directory;
pub mod sessions;

use std::sync::Arc;

use domains::{
    CredentialHasher, PostRepository, RoleRepository, SessionTokens, ThreadRepository,
    UserRepository,
};

pub use aggregator::ContentAggregator;
pub use credentials::CredentialVerifier;
pub use guard::{Action, AuthorizationGuard, Decision, DenyReason};
pub use mutations::MutationCoordinator;
pub use role_directory::RoleDirectory;
pub use sessions::{LoginOutcome, SessionService};

/// Adapter handles the services are assembled from.
#[derive(Clone)]
pub struct Ports {
    pub users: Arc<dyn UserRepository>,
    pub roles: Arc<dyn RoleRepository>,
    pub threads: Arc<dyn ThreadRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub hasher: Arc<dyn CredentialHasher>,
    pub tokens: Arc<dyn SessionTokens>,
}

/// Fully wired core, shared by every request handler.
pub struct Services {
    pub sessions: SessionService,
    pub guard: AuthorizationGuard,
    pub content: ContentAggregator,
    pub mutations: MutationCoordinator,
}

impl Services {
    pub fn new(ports: Ports) -> Self {
        let directory = RoleDirectory::new(Arc::clone(&ports.roles));
        let guard = AuthorizationGuard::new(Arc::clone(&ports.tokens), directory.clone());

        let verifier = CredentialVerifier::new(Arc::clone(&ports.users), Arc::clone(&ports.hasher));
        let sessions = SessionService::new(
            verifier,
            directory.clone(),
            Arc::clone(&ports.users),
            Arc::clone(&ports.tokens),
        );
        let content = ContentAggregator::new(
            Arc::clone(&ports.threads),
            Arc::clone(&ports.posts),
            Arc::clone(&ports.users),
            directory,
        );
        let mutations = MutationCoordinator::new(guard.clone(), ports.threads, ports.posts);

        Self { sessions, guard, content, mutations }
    }
}
