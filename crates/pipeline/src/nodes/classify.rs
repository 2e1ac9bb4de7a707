//! Classify: the topic gate.

use super::NodeContext;
use crate::grading::topic_schema;
use crate::graph::NodeKind;
use crate::prompts::{classifier_system, classifier_user};
use crate::state::{DialogState, TopicFlag};
use ragraph_core::error::Result;
use ragraph_core::message::Message;
use tracing::info;

pub async fn run(ctx: &NodeContext, state: &mut DialogState) -> Result<()> {
    let messages = vec![
        Message::system(classifier_system(&ctx.settings.topic_description)),
        Message::user(classifier_user(&state.refined_query)),
    ];

    let grade = ctx.grade(NodeKind::Classify, topic_schema(), messages).await?;
    let flag = if grade.is_yes() {
        TopicFlag::OnTopic
    } else {
        TopicFlag::OffTopic
    };
    state.topic_flag = Some(flag);

    info!(
        conversation_id = %state.conversation_id,
        query = %state.refined_query,
        topic = ?flag,
        "Classify: topic decided"
    );
    Ok(())
}
