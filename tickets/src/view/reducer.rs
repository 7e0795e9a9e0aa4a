//! Reducer for the ticket view.

use crate::view::{OperationKey, TicketEnvironment, TicketViewAction, TicketViewState};
use afritix_core::types::TicketStatus;
use afritix_core::{TicketBackend, TicketError};
use afritix_core::{effect::Effect, reducer::Reducer};
use smallvec::{SmallVec, smallvec};
use std::marker::PhantomData;
use std::sync::Arc;

/// Reducer for the ticket view.
///
/// Commands mark their [`OperationKey`] in flight and return one effect that
/// calls the repository. Outcomes clear the key and apply the result, unless
/// they belong to an earlier session.
pub struct TicketViewReducer<B> {
    backend: PhantomData<fn() -> B>,
}

impl<B> TicketViewReducer<B> {
    /// Create a new ticket view reducer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            backend: PhantomData,
        }
    }
}

impl<B> Default for TicketViewReducer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B> std::fmt::Debug for TicketViewReducer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TicketViewReducer")
    }
}

/// Answer a duplicate command.
fn reject(session: u64, key: OperationKey) -> SmallVec<[Effect<TicketViewAction>; 4]> {
    tracing::debug!(?key, "Operation already in flight");
    smallvec![Effect::future(async move {
        Some(TicketViewAction::OperationRejected {
            session,
            key,
            error: TicketError::DuplicateRequest,
        })
    })]
}

impl<B: TicketBackend + 'static> Reducer for TicketViewReducer<B> {
    type State = TicketViewState;
    type Action = TicketViewAction;
    type Environment = TicketEnvironment<B>;

    #[allow(clippy::too_many_lines)] // One arm per action
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            TicketViewAction::SessionStarted { user_id } => {
                if state.user_id != Some(user_id) {
                    state.reset(Some(user_id));
                }
                smallvec![Effect::None]
            },

            TicketViewAction::LoggedOut => {
                state.reset(None);
                smallvec![Effect::None]
            },

            TicketViewAction::ClearError => {
                state.error = None;
                smallvec![Effect::None]
            },

            TicketViewAction::Restore { snapshot } => {
                state.tickets = snapshot.tickets;
                state.selected_ticket = snapshot.selected_ticket;
                smallvec![Effect::None]
            },

            TicketViewAction::LoadTickets => {
                let key = OperationKey::LoadTickets;
                let session = state.session();
                if !state.begin(key) {
                    return reject(session, key);
                }
                state.error = None;

                let repository = Arc::clone(env.repository());
                let user = state.user_id;
                smallvec![Effect::future(async move {
                    Some(match repository.list_tickets(user).await {
                        Ok(tickets) => TicketViewAction::TicketsLoaded { session, tickets },
                        Err(error) => TicketViewAction::OperationFailed { session, key, error },
                    })
                })]
            },

            TicketViewAction::SelectTicket { ticket_id } => {
                let key = OperationKey::FetchTicket(ticket_id);
                let session = state.session();
                if !state.begin(key) {
                    return reject(session, key);
                }
                state.error = None;

                let repository = Arc::clone(env.repository());
                let user = state.user_id;
                let cached = state.ticket(ticket_id).cloned();
                smallvec![Effect::future(async move {
                    Some(match repository.fetch_ticket(user, ticket_id, cached).await {
                        Ok(ticket) => TicketViewAction::TicketSelected { session, ticket },
                        Err(error) => TicketViewAction::OperationFailed { session, key, error },
                    })
                })]
            },

            TicketViewAction::PurchaseTicket {
                event_id,
                ticket_type_id,
            } => {
                let key = OperationKey::Purchase(ticket_type_id);
                let session = state.session();
                if !state.begin(key) {
                    return reject(session, key);
                }
                state.error = None;

                let repository = Arc::clone(env.repository());
                let user = state.user_id;
                smallvec![Effect::future(async move {
                    Some(
                        match repository
                            .purchase_ticket(user, event_id, ticket_type_id)
                            .await
                        {
                            Ok(ticket) => TicketViewAction::TicketPurchased {
                                session,
                                ticket_type_id,
                                ticket,
                            },
                            Err(error) => TicketViewAction::OperationFailed { session, key, error },
                        },
                    )
                })]
            },

            TicketViewAction::TransferTicket {
                ticket_id,
                recipient_email,
            } => {
                let key = OperationKey::Transfer(ticket_id);
                let session = state.session();
                if !state.begin(key) {
                    return reject(session, key);
                }
                state.error = None;

                let repository = Arc::clone(env.repository());
                let user = state.user_id;
                smallvec![Effect::future(async move {
                    Some(
                        match repository
                            .transfer_ticket(user, ticket_id, &recipient_email)
                            .await
                        {
                            Ok(receipt) => TicketViewAction::TicketTransferred {
                                session,
                                ticket_id,
                                transfer: receipt.transfer,
                                history_entry: receipt.history_entry,
                            },
                            Err(error) => TicketViewAction::OperationFailed { session, key, error },
                        },
                    )
                })]
            },

            TicketViewAction::TicketsLoaded { session, tickets } => {
                if state.finish(session, OperationKey::LoadTickets) {
                    state.tickets = tickets;
                } else {
                    tracing::debug!(session, "Dropping stale ticket list");
                }
                smallvec![Effect::None]
            },

            TicketViewAction::TicketSelected { session, ticket } => {
                if state.finish(session, OperationKey::FetchTicket(ticket.id)) {
                    state.selected_ticket = Some(ticket);
                } else {
                    tracing::debug!(session, ticket_id = %ticket.id, "Dropping stale ticket detail");
                }
                smallvec![Effect::None]
            },

            TicketViewAction::TicketPurchased {
                session,
                ticket_type_id,
                ticket,
            } => {
                if state.finish(session, OperationKey::Purchase(ticket_type_id)) {
                    state.tickets.push(ticket.clone());
                    state.selected_ticket = Some(ticket);
                } else {
                    tracing::debug!(session, ticket_id = %ticket.id, "Dropping stale purchase");
                }
                smallvec![Effect::None]
            },

            TicketViewAction::TicketTransferred {
                session,
                ticket_id,
                history_entry,
                ..
            } => {
                if !state.finish(session, OperationKey::Transfer(ticket_id)) {
                    tracing::debug!(session, ticket_id = %ticket_id, "Dropping stale transfer");
                    return smallvec![Effect::None];
                }

                if let Some(ticket) = state.tickets.iter_mut().find(|t| t.id == ticket_id) {
                    ticket.set_status(TicketStatus::TransferPending);
                }
                if let Some(selected) = state
                    .selected_ticket
                    .as_mut()
                    .filter(|selected| selected.id == ticket_id)
                {
                    selected.set_status(TicketStatus::TransferPending);
                    selected.validation_history.push(history_entry);
                }
                smallvec![Effect::None]
            },

            TicketViewAction::OperationFailed {
                session,
                key,
                error,
            } => {
                if state.finish(session, key) {
                    state.error = Some(error.user_message());
                } else {
                    tracing::debug!(session, ?key, "Dropping stale failure");
                }
                smallvec![Effect::None]
            },

            TicketViewAction::OperationRejected {
                session,
                key,
                error,
            } => {
                if session == state.session() {
                    state.error = Some(error.user_message());
                } else {
                    tracing::debug!(session, ?key, "Dropping stale rejection");
                }
                smallvec![Effect::None]
            },
        }
    }
}
