//! Store for the ticket view.

use crate::repository::TransferReceipt;
use crate::view::{
    OperationKey, TicketEnvironment, TicketViewAction, TicketViewReducer, TicketViewState,
    WalletSnapshot,
};
use afritix_core::effect::Effect;
use afritix_core::error::Result;
use afritix_core::reducer::Reducer;
use afritix_core::types::{EventId, Ticket, TicketId, TicketTypeId, UserId};
use afritix_core::{BackendError, TicketBackend, TicketError};
use futures::future::join_all;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Store for the ticket view.
///
/// The state lock is held only while the reducer runs, never across a
/// repository call, so independent operations proceed concurrently.
pub struct TicketViewStore<B: TicketBackend + 'static> {
    state: Arc<RwLock<TicketViewState>>,
    reducer: TicketViewReducer<B>,
    env: TicketEnvironment<B>,
}

impl<B: TicketBackend + 'static> TicketViewStore<B> {
    /// Create a store with an empty, signed-out state.
    #[must_use]
    pub fn new(environment: TicketEnvironment<B>) -> Self {
        Self::with_state(environment, TicketViewState::new())
    }

    /// Create a store starting from `state`.
    #[must_use]
    pub fn with_state(environment: TicketEnvironment<B>, state: TicketViewState) -> Self {
        Self {
            state: Arc::new(RwLock::new(state)),
            reducer: TicketViewReducer::new(),
            env: environment,
        }
    }

    /// Send an action and run everything it triggers.
    ///
    /// Returns the actions produced by effects, in the order they were
    /// reduced.
    #[tracing::instrument(skip(self, action), name = "ticket_store_send")]
    pub async fn send(&self, action: TicketViewAction) -> Vec<TicketViewAction> {
        let mut queue = VecDeque::from([action]);
        let mut produced = Vec::new();

        while let Some(action) = queue.pop_front() {
            let effects = {
                let mut state = self.state.write().await;
                self.reducer.reduce(&mut state, action, &self.env)
            };

            for next in join_all(effects.into_iter().map(execute)).await.into_iter().flatten() {
                produced.push(next.clone());
                queue.push_back(next);
            }
        }

        tracing::trace!(produced = produced.len(), "Store settled");
        produced
    }

    /// Get a snapshot of the current state.
    pub async fn state(&self) -> TicketViewState {
        self.state.read().await.clone()
    }

    /// The persistable part of the current state.
    pub async fn snapshot(&self) -> WalletSnapshot {
        self.state.read().await.snapshot()
    }

    /// Put back a persisted wallet.
    pub async fn restore(&self, snapshot: WalletSnapshot) {
        self.send(TicketViewAction::Restore { snapshot }).await;
    }

    /// Bind the store to an authenticated user.
    pub async fn start_session(&self, user_id: UserId) {
        self.send(TicketViewAction::SessionStarted { user_id }).await;
    }

    /// Clear everything.
    pub async fn logout(&self) {
        self.send(TicketViewAction::LoggedOut).await;
    }

    /// Dismiss the shared error message.
    pub async fn clear_error(&self) {
        self.send(TicketViewAction::ClearError).await;
    }

    /// Fetch the user's tickets into the collection.
    ///
    /// # Errors
    ///
    /// Returns the failure also written to the error slot.
    pub async fn load_tickets(&self) -> Result<Vec<Ticket>> {
        match self.send(TicketViewAction::LoadTickets).await.pop() {
            Some(TicketViewAction::TicketsLoaded { tickets, .. }) => Ok(tickets),
            other => Err(failure(OperationKey::LoadTickets, other)),
        }
    }

    /// Select a ticket, fetching its detail and history.
    ///
    /// # Errors
    ///
    /// Returns the failure also written to the error slot.
    pub async fn select_ticket(&self, ticket_id: TicketId) -> Result<Ticket> {
        match self.send(TicketViewAction::SelectTicket { ticket_id }).await.pop() {
            Some(TicketViewAction::TicketSelected { ticket, .. }) => Ok(ticket),
            other => Err(failure(OperationKey::FetchTicket(ticket_id), other)),
        }
    }

    /// Buy a ticket; on success it is appended and selected.
    ///
    /// # Errors
    ///
    /// Returns the failure also written to the error slot.
    pub async fn purchase_ticket(
        &self,
        event_id: EventId,
        ticket_type_id: TicketTypeId,
    ) -> Result<Ticket> {
        let action = TicketViewAction::PurchaseTicket {
            event_id,
            ticket_type_id,
        };
        match self.send(action).await.pop() {
            Some(TicketViewAction::TicketPurchased { ticket, .. }) => Ok(ticket),
            other => Err(failure(OperationKey::Purchase(ticket_type_id), other)),
        }
    }

    /// Transfer a ticket; on success it shows as pending transfer.
    ///
    /// # Errors
    ///
    /// Returns the failure also written to the error slot.
    pub async fn transfer_ticket(
        &self,
        ticket_id: TicketId,
        recipient_email: impl Into<String>,
    ) -> Result<TransferReceipt> {
        let action = TicketViewAction::TransferTicket {
            ticket_id,
            recipient_email: recipient_email.into(),
        };
        match self.send(action).await.pop() {
            Some(TicketViewAction::TicketTransferred {
                transfer,
                history_entry,
                ..
            }) => Ok(TransferReceipt {
                transfer,
                history_entry,
            }),
            other => Err(failure(OperationKey::Transfer(ticket_id), other)),
        }
    }
}

/// Run one effect to completion, yielding its follow-up action.
async fn execute(effect: Effect<TicketViewAction>) -> Option<TicketViewAction> {
    match effect {
        Effect::None => None,
        Effect::Future(future) => future.await,
    }
}

fn failure(key: OperationKey, outcome: Option<TicketViewAction>) -> TicketError {
    match outcome {
        Some(
            TicketViewAction::OperationFailed { error, .. }
            | TicketViewAction::OperationRejected { error, .. },
        ) => error,
        other => {
            tracing::error!(?key, outcome = ?other, "Operation produced no outcome");
            TicketError::DataSource(BackendError::message("operation produced no outcome"))
        },
    }
}
