//! The pipeline graph: node kinds, routers and transitions.
//!
//! ```text
//! Rephrase → Classify ─┬─ on-topic ──→ Retrieve → Evaluate ─┬─ ready ──────────→ Respond
//!                      └─ off-topic ─→ Reject        ↑      ├─ attempts < max ─→ Tweak ─┐
//!                                                    │      └─ attempts ≥ max ─→ Fallback
//!                                                    └──────────────────────────────────┘
//! ```
//!
//! Routers are pure functions of the dialog state. The only cycle,
//! Tweak → Retrieve, is bounded because Tweak increments
//! `refinement_attempts` and the decision router stops offering Tweak once
//! the bound is reached.

use crate::state::{DialogState, TopicFlag};
use ragraph_core::error::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Rephrase,
    Classify,
    Retrieve,
    Evaluate,
    Tweak,
    Respond,
    Reject,
    Fallback,
}

impl NodeKind {
    pub const START: NodeKind = NodeKind::Rephrase;

    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Rephrase => "rephrase",
            NodeKind::Classify => "classify",
            NodeKind::Retrieve => "retrieve",
            NodeKind::Evaluate => "evaluate",
            NodeKind::Tweak => "tweak",
            NodeKind::Respond => "respond",
            NodeKind::Reject => "reject",
            NodeKind::Fallback => "fallback",
        }
    }

    /// Terminal nodes append the assistant turn and end the walk.
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeKind::Respond | NodeKind::Reject | NodeKind::Fallback)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Successors of Classify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicRoute {
    Retrieve,
    Reject,
}

impl From<TopicRoute> for NodeKind {
    fn from(route: TopicRoute) -> Self {
        match route {
            TopicRoute::Retrieve => NodeKind::Retrieve,
            TopicRoute::Reject => NodeKind::Reject,
        }
    }
}

/// Successors of Evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionRoute {
    Respond,
    Tweak,
    Fallback,
}

impl From<DecisionRoute> for NodeKind {
    fn from(route: DecisionRoute) -> Self {
        match route {
            DecisionRoute::Respond => NodeKind::Respond,
            DecisionRoute::Tweak => NodeKind::Tweak,
            DecisionRoute::Fallback => NodeKind::Fallback,
        }
    }
}

/// on-topic → Retrieve, off-topic → Reject.
pub fn topic_router(state: &DialogState) -> Result<TopicRoute> {
    match state.topic_flag {
        Some(TopicFlag::OnTopic) => Ok(TopicRoute::Retrieve),
        Some(TopicFlag::OffTopic) => Ok(TopicRoute::Reject),
        None => Err(Error::Internal(
            "topic router reached before classification".into(),
        )),
    }
}

/// ready → Respond; otherwise Tweak while attempts remain, else Fallback.
pub fn decision_router(state: &DialogState, max_attempts: u32) -> DecisionRoute {
    if state.ready_for_response {
        DecisionRoute::Respond
    } else if state.refinement_attempts < max_attempts {
        DecisionRoute::Tweak
    } else {
        DecisionRoute::Fallback
    }
}

/// How the walk continues after a node ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Unconditional edge
    Fixed(NodeKind),
    /// Conditional edge chosen by the named router
    Routed { router: &'static str, next: NodeKind },
    /// A terminal node ran
    End,
}

/// Compute the edge leaving `node`.
pub fn next(node: NodeKind, state: &DialogState, max_attempts: u32) -> Result<Transition> {
    let transition = match node {
        NodeKind::Rephrase => Transition::Fixed(NodeKind::Classify),
        NodeKind::Classify => Transition::Routed {
            router: "topic",
            next: topic_router(state)?.into(),
        },
        NodeKind::Retrieve => Transition::Fixed(NodeKind::Evaluate),
        NodeKind::Evaluate => Transition::Routed {
            router: "decision",
            next: decision_router(state, max_attempts).into(),
        },
        NodeKind::Tweak => Transition::Fixed(NodeKind::Retrieve),
        NodeKind::Respond | NodeKind::Reject | NodeKind::Fallback => Transition::End,
    };
    Ok(transition)
}

/// Longest possible walk: Rephrase, Classify, `max_attempts + 1`
/// Retrieve/Evaluate pairs, `max_attempts` Tweaks and one terminal.
pub fn step_ceiling(max_attempts: u32) -> usize {
    5 + 3 * max_attempts as usize
}
