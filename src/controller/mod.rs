//! Conversation controller
//!
//! Owns the [`ConversationState`] and coordinates at most one exchange with
//! the [`ChatTransport`] at a time. Submission is split in two halves,
//! [`ConversationController::begin`] and [`ConversationController::resolve`],
//! so a UI can keep drawing while the network call runs elsewhere;
//! [`ConversationController::submit`] composes both around the transport call.

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

use crate::error::ExchangeError;
use crate::events::{ConversationEvent, ConversationRole, Turn};
use crate::state::ConversationState;
use crate::transport::{ChatReply, ChatTransport};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Ticket for one outstanding exchange.
///
/// Issued by [`ConversationController::begin`] and handed back to
/// [`ConversationController::resolve`]. Not `Clone`: each exchange resolves once.
#[derive(Debug)]
pub struct Exchange {
    sequence: u64,
    message: String,
    session_id: Option<String>,
}

impl Exchange {
    /// Trimmed message text sent to the service
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Session identifier the request carries
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Run this exchange against a transport
    pub async fn send_via(&self, transport: &dyn ChatTransport) -> Result<ChatReply, ExchangeError> {
        transport.send(&self.message, self.session_id.as_deref()).await
    }
}

/// What `resolve` did with an outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The assistant turn was appended
    Answered,
    /// The user turn was rolled back and the error recorded
    Failed,
    /// The exchange was superseded (e.g. by `clear`) and the outcome dropped
    Stale,
}

pub struct ConversationController {
    conversation_id: Uuid,
    state: ConversationState,
    transport: Arc<dyn ChatTransport>,
    events: broadcast::Sender<ConversationEvent>,
}

impl ConversationController {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self::with_state(transport, ConversationState::new())
    }

    /// Continue a server session started elsewhere
    pub fn resume(transport: Arc<dyn ChatTransport>, session_id: impl Into<String>) -> Self {
        Self::with_state(transport, ConversationState::with_session(session_id))
    }

    fn with_state(transport: Arc<dyn ChatTransport>, state: ConversationState) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            conversation_id: Uuid::new_v4(),
            state,
            transport,
            events,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        Arc::clone(&self.transport)
    }

    /// Receive a notification after every state change
    pub fn subscribe(&self) -> broadcast::Receiver<ConversationEvent> {
        self.events.subscribe()
    }

    /// Submit `text` and wait for the exchange to finish.
    ///
    /// Returns `None` when the submission was rejected: blank text, or an
    /// exchange already outstanding.
    pub async fn submit(&mut self, text: &str) -> Option<Resolution> {
        let exchange = self.begin(text)?;
        let outcome = exchange.send_via(self.transport.as_ref()).await;
        Some(self.resolve(exchange, outcome))
    }

    /// Optimistically append the user's turn and mark the exchange outstanding
    pub fn begin(&mut self, text: &str) -> Option<Exchange> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }
        if self.state.pending() {
            tracing::debug!(conversation = %self.conversation_id, "Submission rejected while pending");
            return None;
        }

        self.state.push_turn(Turn::user(message));
        self.publish(ConversationEvent::TurnAppended { role: ConversationRole::User });

        if self.state.take_error().is_some() {
            self.publish(ConversationEvent::ErrorDismissed);
        }

        let sequence = self.state.issue();
        self.publish(ConversationEvent::PendingChanged { pending: true });

        tracing::info!(
            conversation = %self.conversation_id,
            sequence,
            session_id = ?self.state.session_id(),
            "Exchange issued"
        );

        Some(Exchange {
            sequence,
            message: message.to_string(),
            session_id: self.state.session_id().map(str::to_string),
        })
    }

    /// Apply the outcome of an exchange issued by [`Self::begin`]
    pub fn resolve(&mut self, exchange: Exchange, outcome: Result<ChatReply, ExchangeError>) -> Resolution {
        if self.state.in_flight() != Some(exchange.sequence) {
            tracing::info!(
                conversation = %self.conversation_id,
                sequence = exchange.sequence,
                "Discarding result of superseded exchange"
            );
            self.publish(ConversationEvent::StaleResultDiscarded { sequence: exchange.sequence });
            return Resolution::Stale;
        }

        let resolution = match outcome {
            Ok(reply) => {
                if let Some(session_id) = reply.session_id {
                    if self.state.assign_session(session_id.clone()) {
                        tracing::info!(conversation = %self.conversation_id, %session_id, "Session assigned");
                        self.publish(ConversationEvent::SessionAssigned { session_id });
                    }
                }

                self.state.push_turn(Turn::assistant(reply.response));
                self.publish(ConversationEvent::TurnAppended { role: ConversationRole::Assistant });
                Resolution::Answered
            }
            Err(error) => {
                let message = error.user_message();
                tracing::warn!(conversation = %self.conversation_id, error = %message, "Exchange failed");

                self.state.set_error(message.clone());
                self.publish(ConversationEvent::ErrorRaised { message });

                if self.state.pop_turn().is_some() {
                    self.publish(ConversationEvent::TurnRolledBack);
                }
                Resolution::Failed
            }
        };

        self.state.settle();
        self.publish(ConversationEvent::PendingChanged { pending: false });
        resolution
    }

    /// Reset to an empty conversation without waiting on server-side cleanup
    pub fn clear(&mut self) {
        if let Some(session_id) = self.state.session_id() {
            self.transport.release_session(session_id);
        }

        let was_pending = self.state.pending();
        self.state.reset();
        tracing::info!(conversation = %self.conversation_id, was_pending, "Conversation cleared");

        self.publish(ConversationEvent::Cleared);
        if was_pending {
            self.publish(ConversationEvent::PendingChanged { pending: false });
        }
    }

    /// Hide the error notice
    pub fn dismiss_error(&mut self) {
        if self.state.take_error().is_some() {
            self.publish(ConversationEvent::ErrorDismissed);
        }
    }

    fn publish(&self, event: ConversationEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MockTransport;
    use super::*;

    fn controller(transport: &Arc<MockTransport>) -> ConversationController {
        ConversationController::new(transport.clone())
    }

    fn transcript(state: &ConversationState) -> Vec<(ConversationRole, String)> {
        state
            .turns()
            .iter()
            .map(|turn| (turn.role(), turn.content().to_string()))
            .collect()
    }

    #[tokio::test]
    async fn successful_exchange_appends_two_turns() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_reply(ChatReply::new("What do you mean by exist?", "abc"));
        let mut controller = controller(&transport);

        let resolution = controller.submit("  Why do we exist?  ").await;

        assert_eq!(resolution, Some(Resolution::Answered));
        assert_eq!(
            transcript(controller.state()),
            vec![
                (ConversationRole::User, "Why do we exist?".to_string()),
                (ConversationRole::Assistant, "What do you mean by exist?".to_string()),
            ]
        );
        assert_eq!(controller.state().session_id(), Some("abc"));
        assert!(!controller.state().pending());

        let requests = transport.recorded_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].message, "Why do we exist?");
        assert_eq!(requests[0].session_id, None);
    }

    #[tokio::test]
    async fn session_id_is_reused_and_never_overwritten() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_reply(ChatReply::new("What do you mean by exist?", "abc"));
        transport.queue_reply(ChatReply::new("What would knowing feel like?", "other"));
        transport.queue_reply(ChatReply::new("And then?", "abc"));
        let mut controller = controller(&transport);

        controller.submit("Why do we exist?").await;
        controller.submit("I don't know").await;
        controller.submit("Maybe").await;

        let requests = transport.recorded_requests();
        assert_eq!(requests[1].session_id.as_deref(), Some("abc"));
        assert_eq!(requests[2].session_id.as_deref(), Some("abc"));
        assert_eq!(controller.state().session_id(), Some("abc"));
        assert_eq!(controller.state().turns().len(), 6);
    }

    #[tokio::test]
    async fn failure_rolls_back_user_turn() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_error(ExchangeError::with_detail("rate limited"));
        let mut controller = controller(&transport);

        let resolution = controller.submit("test").await;

        assert_eq!(resolution, Some(Resolution::Failed));
        assert!(controller.state().turns().is_empty());
        assert_eq!(controller.state().last_error(), Some("rate limited"));
        assert!(!controller.state().pending());
    }

    #[tokio::test]
    async fn failure_without_detail_uses_generic_message() {
        let transport = Arc::new(MockTransport::new());
        transport.queue_reply(ChatReply::new("first", "s1"));
        transport.queue_error(ExchangeError::generic());
        let mut controller = controller(&transport);

        controller.submit("hello").await;
        controller.submit("again").await;

        assert_eq!(controller.state().turns().len(), 2);
        assert_eq!(controller.state().last_error(), Some(crate::error::GENERIC_FAILURE));
        // A failed exchange never clears an assigned session
        assert_eq!(controller.state().session_id(), Some("s1"));
    }

    #[tokio::test]
    async fn blank_input_is_a_no_op() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);

        assert_eq!(controller.submit("").await, None);
        assert_eq!(controller.submit(" \n\t ").await, None);

        assert!(controller.state().is_empty());
        assert!(!controller.state().pending());
        assert!(transport.recorded_requests().is_empty());
    }

    #[test]
    fn begin_is_rejected_while_pending() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);

        let first = controller.begin("one");
        assert!(first.is_some());
        assert!(controller.begin("two").is_none());
        assert_eq!(controller.state().turns().len(), 1);
        assert!(controller.state().pending());
    }

    #[test]
    fn new_submission_clears_previous_error() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);

        let exchange = controller.begin("one").unwrap();
        controller.resolve(exchange, Err(ExchangeError::with_detail("down")));
        assert_eq!(controller.state().last_error(), Some("down"));

        controller.begin("two").unwrap();
        assert_eq!(controller.state().last_error(), None);
    }

    #[test]
    fn clear_resets_everything_and_releases_session() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);

        let exchange = controller.begin("hi").unwrap();
        controller.resolve(exchange, Ok(ChatReply::new("hello", "abc")));
        let exchange = controller.begin("fail").unwrap();
        controller.resolve(exchange, Err(ExchangeError::generic()));

        controller.clear();

        assert!(controller.state().is_empty());
        assert_eq!(controller.state().session_id(), None);
        assert_eq!(controller.state().last_error(), None);
        assert!(!controller.state().pending());
        assert_eq!(transport.released_sessions(), vec!["abc".to_string()]);
    }

    #[test]
    fn result_after_clear_is_discarded() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);

        let stale = controller.begin("before clear").unwrap();
        controller.clear();

        let resolution = controller.resolve(stale, Ok(ChatReply::new("late", "zzz")));

        assert_eq!(resolution, Resolution::Stale);
        assert!(controller.state().is_empty());
        assert_eq!(controller.state().session_id(), None);
        assert!(!controller.state().pending());
    }

    #[test]
    fn stale_result_does_not_settle_newer_exchange() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);

        let stale = controller.begin("old").unwrap();
        controller.clear();
        let current = controller.begin("new").unwrap();

        assert_eq!(controller.resolve(stale, Err(ExchangeError::generic())), Resolution::Stale);
        assert!(controller.state().pending());
        assert_eq!(controller.state().turns().len(), 1);
        assert_eq!(controller.state().last_error(), None);

        assert_eq!(
            controller.resolve(current, Ok(ChatReply::new("answer", "s"))),
            Resolution::Answered
        );
        assert_eq!(controller.state().turns().len(), 2);
    }

    #[test]
    fn resumed_conversation_sends_known_session() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = ConversationController::resume(transport.clone(), "kept");

        let exchange = controller.begin("hi").unwrap();
        assert_eq!(exchange.session_id(), Some("kept"));
        controller.resolve(exchange, Ok(ChatReply::new("hello", "different")));
        assert_eq!(controller.state().session_id(), Some("kept"));
    }

    #[test]
    fn subscribers_see_state_changes_in_order() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);
        let mut events = controller.subscribe();

        let exchange = controller.begin("test").unwrap();
        controller.resolve(exchange, Err(ExchangeError::with_detail("rate limited")));
        controller.dismiss_error();

        let received: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                ConversationEvent::TurnAppended { role: ConversationRole::User },
                ConversationEvent::PendingChanged { pending: true },
                ConversationEvent::ErrorRaised { message: "rate limited".to_string() },
                ConversationEvent::TurnRolledBack,
                ConversationEvent::PendingChanged { pending: false },
                ConversationEvent::ErrorDismissed,
            ]
        );

        controller.begin("again").unwrap();
        controller.clear();

        let received: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(
            received,
            vec![
                ConversationEvent::TurnAppended { role: ConversationRole::User },
                ConversationEvent::PendingChanged { pending: true },
                ConversationEvent::Cleared,
                ConversationEvent::PendingChanged { pending: false },
            ]
        );
        assert!(!controller.state().pending());
    }

    #[test]
    fn clearing_while_idle_does_not_report_pending_change() {
        let transport = Arc::new(MockTransport::new());
        let mut controller = controller(&transport);
        let mut events = controller.subscribe();

        controller.clear();

        let received: Vec<_> = std::iter::from_fn(|| events.try_recv().ok()).collect();
        assert_eq!(received, vec![ConversationEvent::Cleared]);
    }
}
