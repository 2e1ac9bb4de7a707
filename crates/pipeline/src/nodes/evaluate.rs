//! Evaluate: grade every retrieved passage for relevance.
//!
//! Judgments run concurrently up to `evaluate_concurrency`, but results are
//! collected in retrieval order, so the kept passages are always an
//! order-preserving subset of what Retrieve returned.

use super::NodeContext;
use crate::grading::{Grade, relevance_schema};
use crate::graph::NodeKind;
use crate::prompts::{GRADER_SYSTEM, grader_user};
use crate::state::DialogState;
use futures::stream::{self, StreamExt, TryStreamExt};
use ragraph_core::error::{Error, Result};
use ragraph_core::message::Message;
use tracing::{debug, info};

/// First `max_chars` characters of a passage.
fn excerpt(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((end, _)) => &content[..end],
        None => content,
    }
}

pub async fn run(ctx: &NodeContext, state: &mut DialogState) -> Result<()> {
    let query = state.refined_query.as_str();
    let max_chars = ctx.settings.grading_excerpt_chars;

    let requests: Vec<(String, Vec<Message>)> = state
        .retrieved_documents
        .iter()
        .map(|passage| {
            let messages = vec![
                Message::system(GRADER_SYSTEM),
                Message::user(grader_user(query, excerpt(&passage.content, max_chars))),
            ];
            (passage.id.clone(), messages)
        })
        .collect();

    let grades: Vec<Grade> = stream::iter(requests)
        .map(|(passage_id, messages)| async move {
            let grade = ctx
                .grade(NodeKind::Evaluate, relevance_schema(), messages)
                .await?;
            debug!(passage_id = %passage_id, ?grade, "Evaluate: passage graded");
            Ok::<_, Error>(grade)
        })
        .buffered(ctx.settings.evaluate_concurrency.max(1))
        .try_collect()
        .await?;

    let retrieved = state.retrieved_documents.len();
    let mut verdicts = grades.into_iter();
    state
        .retrieved_documents
        .retain(|_| verdicts.next().is_some_and(Grade::is_yes));
    state.ready_for_response = !state.retrieved_documents.is_empty();

    info!(
        conversation_id = %state.conversation_id,
        retrieved,
        kept = state.retrieved_documents.len(),
        attempts = state.refinement_attempts,
        "Evaluate: relevance graded"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use async_trait::async_trait;
    use ragraph_core::error::ProviderError;
    use ragraph_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use ragraph_core::retrieval::Passage;
    use std::sync::Arc;
    use std::time::Duration;

    fn four_passages() -> Vec<Passage> {
        (1..=4)
            .map(|i| passage(&format!("p{i}"), "doc.txt", &format!("passage {i}")))
            .collect()
    }

    fn state_with(passages: Vec<Passage>) -> DialogState {
        let mut state = DialogState::new("c1".into(), vec![], "When does it open?");
        state.retrieved_documents = passages;
        state
    }

    fn grade_by_content(relevant: &'static [&'static str]) -> ScriptedProvider {
        ScriptedProvider::new(move |_, request| {
            let doc = &request.messages[1].content;
            Ok(if relevant.iter().any(|r| doc.contains(r)) { yes() } else { no() })
        })
    }

    #[tokio::test]
    async fn keeps_relevant_subset_in_order() {
        let provider = Arc::new(grade_by_content(&["passage 1", "passage 3", "passage 4"]));
        let ctx = context(provider.clone(), Arc::new(StubRetriever::new(vec![])));
        let mut state = state_with(four_passages());

        run(&ctx, &mut state).await.unwrap();

        let ids: Vec<_> = state.retrieved_documents.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3", "p4"]);
        assert!(state.ready_for_response);
        assert_eq!(provider.count(Call::Grade), 4);
    }

    #[tokio::test]
    async fn nothing_relevant_is_not_ready() {
        let provider = Arc::new(grade_by_content(&[]));
        let ctx = context(provider, Arc::new(StubRetriever::new(vec![])));
        let mut state = state_with(four_passages());

        run(&ctx, &mut state).await.unwrap();

        assert!(state.retrieved_documents.is_empty());
        assert!(!state.ready_for_response);
    }

    #[tokio::test]
    async fn empty_retrieval_makes_no_calls() {
        let provider = Arc::new(grade_by_content(&[]));
        let ctx = context(provider.clone(), Arc::new(StubRetriever::new(vec![])));
        let mut state = state_with(vec![]);

        run(&ctx, &mut state).await.unwrap();

        assert!(!state.ready_for_response);
        assert!(provider.requests().is_empty());
    }

    #[tokio::test]
    async fn replay_yields_same_subset() {
        let provider = Arc::new(grade_by_content(&["passage 2", "passage 4"]));
        let ctx = context(provider, Arc::new(StubRetriever::new(vec![])));

        let mut first = state_with(four_passages());
        let mut second = state_with(four_passages());
        run(&ctx, &mut first).await.unwrap();
        run(&ctx, &mut second).await.unwrap();

        assert_eq!(first.retrieved_documents, second.retrieved_documents);
    }

    #[tokio::test]
    async fn grading_excerpt_is_truncated() {
        let provider = Arc::new(grade_by_content(&[]));
        let mut ctx = context(provider.clone(), Arc::new(StubRetriever::new(vec![])));
        ctx.settings.grading_excerpt_chars = 10;
        let mut state = state_with(vec![passage("long", "doc.txt", &"x".repeat(50))]);

        run(&ctx, &mut state).await.unwrap();

        let sent = &provider.requests()[0].messages[1].content;
        assert!(sent.ends_with(&"x".repeat(10)));
        assert!(!sent.contains(&"x".repeat(11)));
    }

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("héllo", 2), "hé");
        assert_eq!(excerpt("short", 100), "short");
    }

    #[tokio::test]
    async fn one_bad_grade_fails_the_node() {
        let provider = Arc::new(ScriptedProvider::new(|_, request| {
            if request.messages[1].content.contains("passage 2") {
                Ok("relevant".into())
            } else {
                Ok(yes())
            }
        }));
        let ctx = context(provider, Arc::new(StubRetriever::new(vec![])));
        let mut state = state_with(four_passages());

        let err = run(&ctx, &mut state).await.unwrap_err();
        assert!(matches!(err, Error::SchemaViolation { ref node, .. } if node == "evaluate"));
    }

    /// Answers "yes" for odd passages, sleeping longer for earlier ones.
    struct SlowEarlyGrader;

    #[async_trait]
    impl Provider for SlowEarlyGrader {
        fn name(&self) -> &str {
            "slow-early"
        }

        async fn complete(
            &self,
            request: ProviderRequest,
        ) -> std::result::Result<ProviderResponse, ProviderError> {
            let doc = request.messages[1].content.clone();
            let n: u64 = doc
                .rsplit(' ')
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(100 * (5 - n))).await;
            Ok(make_text_response(if n % 2 == 1 {
                r#"{"score":"yes"}"#
            } else {
                r#"{"score":"no"}"#
            }))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn order_survives_out_of_order_completion() {
        let ctx = context(Arc::new(SlowEarlyGrader), Arc::new(StubRetriever::new(vec![])));
        let mut state = state_with(four_passages());

        run(&ctx, &mut state).await.unwrap();

        let ids: Vec<_> = state.retrieved_documents.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p3"]);
    }
}
