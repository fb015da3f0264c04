//! Audit records of applied decisions

use crate::reset::{Decision, Trigger};
use crate::world::{BotObservation, Class, PlayerHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One decision that was applied to a bot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetRecord {
    /// Unique ID of this record
    pub id: String,
    /// Bot the decision was applied to
    pub player: PlayerHandle,
    /// Bot name at the time
    pub name: String,
    pub class: Class,
    /// Level before the decision was applied
    pub from_level: u8,
    pub decision: Decision,
    /// What caused the evaluation
    pub trigger: Trigger,
    /// When the decision was applied
    pub applied_at: DateTime<Utc>,
}

impl ResetRecord {
    #[must_use]
    pub fn new(
        player: PlayerHandle,
        obs: &BotObservation,
        decision: Decision,
        trigger: Trigger,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            player,
            name: obs.name.clone(),
            class: obs.class,
            from_level: obs.level,
            decision,
            trigger,
            applied_at: Utc::now(),
        }
    }
}
