//! Environment for the ticket view reducer.

use crate::repository::TicketRepository;
use std::sync::Arc;

/// Dependencies the reducer's effects run against.
pub struct TicketEnvironment<B> {
    repository: Arc<TicketRepository<B>>,
}

impl<B> TicketEnvironment<B> {
    /// Create an environment around a repository.
    #[must_use]
    pub const fn new(repository: Arc<TicketRepository<B>>) -> Self {
        Self { repository }
    }

    /// The repository effects call.
    #[must_use]
    pub const fn repository(&self) -> &Arc<TicketRepository<B>> {
        &self.repository
    }
}

impl<B> Clone for TicketEnvironment<B> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
        }
    }
}
