//! Property-based tests for the controller
//!
//! Random sequences of submissions, outcomes and clears are driven through
//! `begin`/`resolve` and checked against a tiny model of the transcript.

use super::testing::MockTransport;
use super::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Submit(String),
    Succeed(Option<String>),
    Fail(Option<String>),
    Clear,
    ResolveStale,
}

fn arb_text() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => "[a-z ]{0,12}",
        1 => Just("  \t ".to_string()),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => arb_text().prop_map(Op::Submit),
        2 => proptest::option::of("[a-z0-9]{1,6}").prop_map(Op::Succeed),
        1 => proptest::option::of("[a-z ]{0,10}").prop_map(Op::Fail),
        1 => Just(Op::Clear),
        1 => Just(Op::ResolveStale),
    ]
}

#[derive(Default)]
struct Model {
    turns: usize,
    session_id: Option<String>,
}

proptest! {
    #[test]
    fn controller_matches_model(ops in proptest::collection::vec(arb_op(), 1..40)) {
        let mut controller = ConversationController::new(Arc::new(MockTransport::new()));
        let mut model = Model::default();
        let mut outstanding: Option<Exchange> = None;
        let mut stale: Vec<Exchange> = Vec::new();

        for op in ops {
            match op {
                Op::Submit(text) => {
                    let accepted = !text.trim().is_empty() && outstanding.is_none();
                    let exchange = controller.begin(&text);
                    prop_assert_eq!(exchange.is_some(), accepted);
                    if let Some(exchange) = exchange {
                        prop_assert_eq!(exchange.session_id(), model.session_id.as_deref());
                        prop_assert_eq!(exchange.message(), text.trim());
                        prop_assert_eq!(controller.state().last_error(), None);
                        model.turns += 1;
                        outstanding = Some(exchange);
                    }
                }
                Op::Succeed(session_id) => {
                    if let Some(exchange) = outstanding.take() {
                        let reply = ChatReply {
                            response: "why?".to_string(),
                            session_id: session_id.clone(),
                            processed_input: None,
                        };
                        prop_assert_eq!(controller.resolve(exchange, Ok(reply)), Resolution::Answered);
                        model.turns += 1;
                        if model.session_id.is_none() {
                            model.session_id = session_id;
                        }
                    }
                }
                Op::Fail(detail) => {
                    if let Some(exchange) = outstanding.take() {
                        let error = ExchangeError::from_detail(detail);
                        prop_assert_eq!(controller.resolve(exchange, Err(error)), Resolution::Failed);
                        model.turns -= 1;
                        let message = controller.state().last_error().unwrap_or_default();
                        prop_assert!(!message.is_empty());
                    }
                }
                Op::Clear => {
                    controller.clear();
                    stale.extend(outstanding.take());
                    model = Model::default();
                    prop_assert_eq!(controller.state().last_error(), None);
                }
                Op::ResolveStale => {
                    if let Some(exchange) = stale.pop() {
                        let before = controller.state().clone();
                        let reply = ChatReply::new("late", "late-session");
                        prop_assert_eq!(controller.resolve(exchange, Ok(reply)), Resolution::Stale);
                        prop_assert_eq!(controller.state().turns(), before.turns());
                        prop_assert_eq!(controller.state().session_id(), before.session_id());
                        prop_assert_eq!(controller.state().last_error(), before.last_error());
                        prop_assert_eq!(controller.state().pending(), before.pending());
                    }
                }
            }

            prop_assert_eq!(controller.state().pending(), outstanding.is_some());
            prop_assert_eq!(controller.state().turns().len(), model.turns);
            prop_assert_eq!(controller.state().session_id(), model.session_id.as_deref());
        }
    }
}
