//! Rephrase: turn a follow-up into a standalone retrieval query.

use super::NodeContext;
use crate::prompts::REPHRASE_SYSTEM;
use crate::state::DialogState;
use ragraph_core::error::Result;
use ragraph_core::message::Message;
use tracing::debug;

pub async fn run(ctx: &NodeContext, state: &mut DialogState) -> Result<()> {
    let history = state.prior_history();
    let prior_turns = history.len();
    if prior_turns == 0 {
        state.refined_query = state.current_question.clone();
        debug!(conversation_id = %state.conversation_id, "Rephrase: first turn, question kept verbatim");
        return Ok(());
    }

    let mut messages = Vec::with_capacity(prior_turns + 2);
    messages.push(Message::system(REPHRASE_SYSTEM));
    messages.extend(history.iter().cloned());
    messages.push(Message::user(state.current_question.clone()));

    let rewritten = ctx.generate(messages).await?;
    state.refined_query = if rewritten.is_empty() {
        state.current_question.clone()
    } else {
        rewritten
    };

    debug!(
        conversation_id = %state.conversation_id,
        prior_turns,
        refined_query = %state.refined_query,
        "Rephrase: query rewritten"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use ragraph_core::message::Role;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_turn_makes_no_call() {
        let provider = Arc::new(ScriptedProvider::agreeable("unused"));
        let ctx = context(provider.clone(), Arc::new(StubRetriever::new(vec![])));
        let mut state = DialogState::new("c1".into(), vec![], "When does it open?");

        run(&ctx, &mut state).await.unwrap();

        assert_eq!(state.refined_query, "When does it open?");
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn follow_up_sees_full_prior_history() {
        let provider = Arc::new(ScriptedProvider::new(|_, _| {
            Ok("  Is Bella Vista open on Sunday?\n".into())
        }));
        let ctx = context(provider.clone(), Arc::new(StubRetriever::new(vec![])));
        let history = vec![
            Message::user("When does Bella Vista open?"),
            Message::assistant("It opens at 11:00 AM."),
        ];
        let mut state = DialogState::new("c1".into(), history, "Also on Sunday?");

        run(&ctx, &mut state).await.unwrap();

        assert_eq!(state.refined_query, "Is Bella Vista open on Sunday?");
        assert_eq!(state.current_question, "Also on Sunday?");

        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        let messages = &requests[0].messages;
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "When does Bella Vista open?");
        assert_eq!(messages[3].content, "Also on Sunday?");
        assert!(requests[0].response_schema.is_none());
    }

    #[tokio::test]
    async fn empty_rewrite_keeps_question() {
        let provider = Arc::new(ScriptedProvider::new(|_, _| Ok("   ".into())));
        let ctx = context(provider, Arc::new(StubRetriever::new(vec![])));
        let history = vec![Message::user("hi"), Message::assistant("hello")];
        let mut state = DialogState::new("c1".into(), history, "Who owns it?");

        run(&ctx, &mut state).await.unwrap();
        assert_eq!(state.refined_query, "Who owns it?");
    }
}
