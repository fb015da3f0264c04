//! Reset decision engine
//!
//! [`decide`] is a pure function of the observation, the policy, the trigger
//! and one optional draw from the roller. Nothing is remembered between calls;
//! a bot's "state" is re-derived from its current observation every time.

use crate::reset::{Policy, Roller, compute_chance};
use crate::world::{BotObservation, Class, DEATH_KNIGHT_START_LEVEL};
use crate::DECISION_TARGET;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error};

/// What the engine wants done to a bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Leave the bot alone
    NoAction,
    /// Rebuild the bot at a lower level
    ResetTo(u8),
    /// Move the bot straight to another level
    SkipTo(u8),
}

impl Decision {
    /// Target level, if the decision changes anything
    #[must_use]
    pub fn target_level(&self) -> Option<u8> {
        match self {
            Self::NoAction => None,
            Self::ResetTo(level) | Self::SkipTo(level) => Some(*level),
        }
    }

    #[must_use]
    pub fn is_action(&self) -> bool {
        !matches!(self, Self::NoAction)
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoAction => write!(f, "No action"),
            Self::ResetTo(level) => write!(f, "Reset to {level}"),
            Self::SkipTo(level) => write!(f, "Skip to {level}"),
        }
    }
}

/// What caused a bot to be evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigger {
    Login,
    LevelChanged,
    /// Periodic time-gated population scan
    Rescan,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => write!(f, "Login"),
            Self::LevelChanged => write!(f, "Level Changed"),
            Self::Rescan => write!(f, "Rescan"),
        }
    }
}

/// Raise a target level to the class floor. Death Knights cannot go below 55.
#[must_use]
pub fn adjust_for_class(level: u8, class: Class) -> u8 {
    if class == Class::DeathKnight && level < DEATH_KNIGHT_START_LEVEL {
        DEATH_KNIGHT_START_LEVEL
    } else {
        level
    }
}

/// Decide what to do with an eligible bot.
///
/// The roller is only consulted when a chance roll is actually needed.
pub fn decide(
    obs: &BotObservation,
    policy: &Policy,
    trigger: Trigger,
    roller: &mut dyn Roller,
) -> Decision {
    let level = obs.level;

    // Structural floors: a fresh character or a fresh Death Knight
    if level == 1 || (level == DEATH_KNIGHT_START_LEVEL && obs.class == Class::DeathKnight) {
        return Decision::NoAction;
    }

    if trigger == Trigger::Rescan && !policy.is_rescan_candidate(level) {
        return Decision::NoAction;
    }

    if policy.skips_enabled() && level == policy.skip_from_level {
        let target = adjust_for_class(policy.skip_to_level, obs.class);
        debug!(
            target: DECISION_TARGET,
            bot = %obs.name,
            level,
            skip_to = target,
            "Bot reached skip level"
        );
        return Decision::SkipTo(target);
    }

    if !policy.resets_enabled() {
        return Decision::NoAction;
    }

    let ceiling = policy.rule.ceiling();
    if level > ceiling {
        let target = policy
            .rule
            .top()
            .map_or(policy.reset_to_level, |pair| pair.target_level);
        debug!(
            target: DECISION_TARGET,
            bot = %obs.name,
            level,
            ceiling,
            "Bot is above the reset ceiling, resetting unconditionally"
        );
        return Decision::ResetTo(adjust_for_class(target, obs.class));
    }

    let Some(pair) = policy.rule.applicable(level) else {
        return Decision::NoAction;
    };

    if policy.restrict_by_played_time && obs.level_played_seconds < policy.min_time_played_seconds
    {
        debug!(
            target: DECISION_TARGET,
            bot = %obs.name,
            level,
            played = obs.level_played_seconds,
            required = policy.min_time_played_seconds,
            %trigger,
            "Insufficient played time at level"
        );
        return Decision::NoAction;
    }

    let chance = match compute_chance(level, pair.trigger_level, policy) {
        Ok(chance) => chance,
        Err(e) => {
            error!(target: DECISION_TARGET, bot = %obs.name, "Cannot compute reset chance: {e}");
            return Decision::NoAction;
        }
    };

    let draw = roller.roll();
    debug!(
        target: DECISION_TARGET,
        bot = %obs.name,
        level,
        pair = %pair,
        chance,
        draw,
        %trigger,
        "Rolled for reset"
    );

    if draw < chance {
        Decision::ResetTo(adjust_for_class(pair.target_level, obs.class))
    } else {
        Decision::NoAction
    }
}
