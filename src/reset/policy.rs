//! Reset policy
//!
//! A [`Policy`] is an immutable snapshot of every threshold and toggle the
//! engine reads. It is built once from a [`ConfigSource`] and shared through a
//! [`PolicyHandle`]; a reload builds a fresh policy and swaps it in whole.

use crate::config::{ConfigSource, keys};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, info, warn};

/// Highest level a character can reach
pub const LEVEL_CAP: u8 = 80;

pub const DEFAULT_MAX_LEVEL: u8 = 80;
pub const DEFAULT_RESET_TO_LEVEL: u8 = 1;
pub const DEFAULT_SKIP_FROM_LEVEL: u8 = 0;
pub const DEFAULT_SKIP_TO_LEVEL: u8 = 1;
pub const DEFAULT_RESET_CHANCE: u8 = 100;
pub const DEFAULT_MIN_TIME_PLAYED: u32 = 86_400;
pub const DEFAULT_RESCAN_INTERVAL: u32 = 60;
pub const DEFAULT_GUILD_TRACKER_INTERVAL: u32 = 600;

/// A trigger level and the level to send a bot back to once it gets there
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPair {
    pub trigger_level: u8,
    pub target_level: u8,
}

impl ResetPair {
    #[must_use]
    pub const fn new(trigger_level: u8, target_level: u8) -> Self {
        Self {
            trigger_level,
            target_level,
        }
    }
}

impl fmt::Display for ResetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.trigger_level, self.target_level)
    }
}

/// Which levels reset, and to where
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThresholdRule {
    /// `maxLevel` / `resetToLevel`
    SinglePair(ResetPair),
    /// `ResetPairs` list, sorted by descending trigger level
    OrderedPairList(Vec<ResetPair>),
}

impl ThresholdRule {
    /// Build a pair list, sorting it by descending trigger level.
    /// Pairs sharing a trigger keep their configured order, so the first
    /// one listed wins.
    #[must_use]
    pub fn pair_list(mut pairs: Vec<ResetPair>, fallback: ResetPair) -> Self {
        if pairs.is_empty() {
            pairs.push(fallback);
        }
        pairs.sort_by(|a, b| b.trigger_level.cmp(&a.trigger_level));
        Self::OrderedPairList(pairs)
    }

    /// Pairs in lookup order
    #[must_use]
    pub fn pairs(&self) -> &[ResetPair] {
        match self {
            Self::SinglePair(pair) => std::slice::from_ref(pair),
            Self::OrderedPairList(pairs) => pairs,
        }
    }

    /// First pair, in descending order, whose trigger the level meets or exceeds
    #[must_use]
    pub fn applicable(&self, level: u8) -> Option<&ResetPair> {
        self.pairs().iter().find(|pair| level >= pair.trigger_level)
    }

    /// Pair with the highest trigger level
    #[must_use]
    pub fn top(&self) -> Option<&ResetPair> {
        self.pairs().first()
    }

    /// Highest trigger level; anything above it always resets
    #[must_use]
    pub fn ceiling(&self) -> u8 {
        self.top().map_or(0, |pair| pair.trigger_level)
    }
}

impl fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<String> = self.pairs().iter().map(ToString::to_string).collect();
        write!(f, "{}", pairs.join(";"))
    }
}

/// Immutable set of reset thresholds and toggles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Level at which bots become reset candidates; 0 disables resets
    pub max_level: u8,
    /// Level a reset sends a bot back to
    pub reset_to_level: u8,
    /// Trigger/target lookup used for resets
    pub rule: ThresholdRule,
    /// Level that triggers a skip; 0 disables skips
    pub skip_from_level: u8,
    /// Level a skip sends a bot to
    pub skip_to_level: u8,
    /// Base reset chance in percent
    pub reset_chance_percent: u8,
    /// Scale the chance by how far past the trigger the bot is
    pub scaled_chance: bool,
    /// Require `min_time_played_seconds` at the level before resetting
    pub restrict_by_played_time: bool,
    pub min_time_played_seconds: u32,
    /// Seconds between time-gated population rescans
    pub rescan_interval_seconds: u32,
    /// Seconds between guild tracker refreshes
    pub guild_tracker_interval_seconds: u32,
    /// Leave bots alone whose guild has a real player in it
    pub ignore_guilds_with_real_players: bool,
    /// Bot names that are never reset
    pub excluded_names: HashSet<String>,
    /// Verbose decision logging
    pub debug: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            reset_to_level: DEFAULT_RESET_TO_LEVEL,
            rule: ThresholdRule::SinglePair(ResetPair::new(
                DEFAULT_MAX_LEVEL,
                DEFAULT_RESET_TO_LEVEL,
            )),
            skip_from_level: DEFAULT_SKIP_FROM_LEVEL,
            skip_to_level: DEFAULT_SKIP_TO_LEVEL,
            reset_chance_percent: DEFAULT_RESET_CHANCE,
            scaled_chance: false,
            restrict_by_played_time: false,
            min_time_played_seconds: DEFAULT_MIN_TIME_PLAYED,
            rescan_interval_seconds: DEFAULT_RESCAN_INTERVAL,
            guild_tracker_interval_seconds: DEFAULT_GUILD_TRACKER_INTERVAL,
            ignore_guilds_with_real_players: true,
            excluded_names: HashSet::new(),
            debug: false,
        }
    }
}

impl Policy {
    /// Build a validated policy from configuration.
    ///
    /// Out-of-range values are replaced by their defaults with a warning.
    #[must_use]
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let max_level = validated(
            keys::MAX_LEVEL,
            source.get_u32(keys::MAX_LEVEL, u32::from(DEFAULT_MAX_LEVEL)),
            DEFAULT_MAX_LEVEL,
            |v| v == 0 || (2..=LEVEL_CAP).contains(&v),
        );

        let reset_to_level = validated(
            keys::RESET_TO_LEVEL,
            source.get_u32(keys::RESET_TO_LEVEL, u32::from(DEFAULT_RESET_TO_LEVEL)),
            DEFAULT_RESET_TO_LEVEL,
            |v| (1..=LEVEL_CAP).contains(&v) && (max_level == 0 || v < max_level),
        );

        let skip_from_level = validated(
            keys::SKIP_FROM_LEVEL,
            source.get_u32(keys::SKIP_FROM_LEVEL, u32::from(DEFAULT_SKIP_FROM_LEVEL)),
            DEFAULT_SKIP_FROM_LEVEL,
            |v| v == 0 || (2..=LEVEL_CAP).contains(&v),
        );

        let skip_to_level = validated(
            keys::SKIP_TO_LEVEL,
            source.get_u32(keys::SKIP_TO_LEVEL, u32::from(DEFAULT_SKIP_TO_LEVEL)),
            DEFAULT_SKIP_TO_LEVEL,
            |v| (1..=LEVEL_CAP).contains(&v) && (max_level == 0 || v <= max_level),
        );

        // A skip that lands on its own trigger level would fire on every event
        let skip_from_level = if skip_from_level > 0 && skip_to_level == skip_from_level {
            warn!(
                "Invalid {} value: {skip_to_level} equals {}. Disabling skips.",
                keys::SKIP_TO_LEVEL,
                keys::SKIP_FROM_LEVEL
            );
            0
        } else {
            skip_from_level
        };

        let reset_chance_percent = validated(
            keys::RESET_CHANCE,
            source.get_u32(keys::RESET_CHANCE, u32::from(DEFAULT_RESET_CHANCE)),
            DEFAULT_RESET_CHANCE,
            |v| v <= 100,
        );

        let rescan_interval_seconds = positive_or_default(
            keys::PLAYED_TIME_CHECK_FREQUENCY,
            source.get_u32(keys::PLAYED_TIME_CHECK_FREQUENCY, DEFAULT_RESCAN_INTERVAL),
            DEFAULT_RESCAN_INTERVAL,
        );

        let guild_tracker_interval_seconds = positive_or_default(
            keys::GUILD_TRACKER_UPDATE_FREQUENCY,
            source.get_u32(
                keys::GUILD_TRACKER_UPDATE_FREQUENCY,
                DEFAULT_GUILD_TRACKER_INTERVAL,
            ),
            DEFAULT_GUILD_TRACKER_INTERVAL,
        );

        let fallback = ResetPair::new(
            if max_level == 0 { LEVEL_CAP } else { max_level },
            DEFAULT_RESET_TO_LEVEL,
        );
        let pairs_option = source.get_string(keys::RESET_PAIRS, "");
        let rule = if pairs_option.trim().is_empty() {
            ThresholdRule::SinglePair(ResetPair::new(max_level, reset_to_level))
        } else {
            ThresholdRule::pair_list(parse_reset_pairs(&pairs_option), fallback)
        };

        let policy = Self {
            max_level,
            reset_to_level,
            rule,
            skip_from_level,
            skip_to_level,
            reset_chance_percent,
            scaled_chance: source.get_bool(keys::SCALED_CHANCE, false),
            restrict_by_played_time: source.get_bool(keys::RESTRICT_TIME_PLAYED, false),
            min_time_played_seconds: source
                .get_u32(keys::MIN_TIME_PLAYED, DEFAULT_MIN_TIME_PLAYED),
            rescan_interval_seconds,
            guild_tracker_interval_seconds,
            ignore_guilds_with_real_players: source
                .get_bool(keys::IGNORE_GUILDS_WITH_REAL_PLAYERS, true),
            excluded_names: parse_excluded_names(&source.get_string(keys::EXCLUDED_BOT_NAMES, "")),
            debug: source.get_bool(keys::DEBUG_MODE, false),
        };

        info!(
            rule = %policy.rule,
            max_level = policy.max_level,
            skip_from_level = policy.skip_from_level,
            skip_to_level = policy.skip_to_level,
            reset_chance = policy.reset_chance_percent,
            scaled_chance = policy.scaled_chance,
            restrict_by_played_time = policy.restrict_by_played_time,
            excluded = policy.excluded_names.len(),
            "Reset policy loaded"
        );

        policy
    }

    /// Whether the max-level reset path is enabled
    #[must_use]
    pub fn resets_enabled(&self) -> bool {
        self.max_level > 0
    }

    /// Whether the skip path is enabled
    #[must_use]
    pub fn skips_enabled(&self) -> bool {
        self.skip_from_level > 0
    }

    /// Whether a bot at this level is a candidate for the periodic rescan
    #[must_use]
    pub fn is_rescan_candidate(&self, level: u8) -> bool {
        self.resets_enabled() && self.rule.applicable(level).is_some()
    }
}

fn validated(key: &str, value: u32, default: u8, is_valid: impl Fn(u8) -> bool) -> u8 {
    match u8::try_from(value) {
        Ok(level) if is_valid(level) => level,
        _ => {
            warn!("Invalid {key} value: {value}. Using default value {default}.");
            default
        }
    }
}

fn positive_or_default(key: &str, value: u32, default: u32) -> u32 {
    if value == 0 {
        warn!("Invalid {key} value: 0. Using default value {default}.");
        default
    } else {
        value
    }
}

/// Parse `trigger:target` pairs separated by `;`, skipping invalid entries
#[must_use]
pub fn parse_reset_pairs(raw: &str) -> Vec<ResetPair> {
    let mut pairs = Vec::new();

    for item in raw.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        let values: Vec<&str> = item.split(':').map(str::trim).collect();
        let [trigger, target] = values.as_slice() else {
            error!("Invalid reset pair format: '{item}'. Expected format 'trigger:target'.");
            continue;
        };

        let trigger = trigger.parse::<u8>().unwrap_or(0);
        let target = target.parse::<u8>().unwrap_or(0);

        if !(2..=LEVEL_CAP).contains(&trigger) {
            error!("Invalid trigger level {trigger} in reset pair '{item}'. Valid range: 2-{LEVEL_CAP}.");
            continue;
        }
        if !(1..=LEVEL_CAP).contains(&target) {
            error!("Invalid target level {target} in reset pair '{item}'. Valid range: 1-{LEVEL_CAP}.");
            continue;
        }

        pairs.push(ResetPair::new(trigger, target));
    }

    pairs
}

fn parse_excluded_names(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Shared, atomically swappable policy
#[derive(Debug, Clone)]
pub struct PolicyHandle {
    current: Arc<RwLock<Arc<Policy>>>,
}

impl Default for PolicyHandle {
    fn default() -> Self {
        Self::new(Policy::default())
    }
}

impl PolicyHandle {
    #[must_use]
    pub fn new(policy: Policy) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(policy))),
        }
    }

    /// The policy in force right now
    #[must_use]
    pub fn snapshot(&self) -> Arc<Policy> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new policy, returning the old one
    pub fn replace(&self, policy: Policy) -> Arc<Policy> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(policy))
    }
}
