//! Game world collaborators
//!
//! The engine never touches the game directly. Everything it knows about a
//! character comes through the [`World`] trait as a [`BotObservation`], and the
//! only way it changes a character is by handing a [`Decision`] to a
//! [`ResetApplier`].
//!
//! [`SimulatedWorld`] is an in-memory implementation of both traits used by
//! the tests and by the dry-run daemon.

use crate::reset::{Decision, ResetError, ResetResult};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Level a Death Knight starts at; they cannot exist below it
pub const DEATH_KNIGHT_START_LEVEL: u8 = 55;

/// Opaque handle the host uses to identify an online character
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerHandle(pub u64);

impl fmt::Display for PlayerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Character class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Class {
    Warrior,
    Paladin,
    Hunter,
    Rogue,
    Priest,
    DeathKnight,
    Shaman,
    Mage,
    Warlock,
    Druid,
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warrior => write!(f, "Warrior"),
            Self::Paladin => write!(f, "Paladin"),
            Self::Hunter => write!(f, "Hunter"),
            Self::Rogue => write!(f, "Rogue"),
            Self::Priest => write!(f, "Priest"),
            Self::DeathKnight => write!(f, "Death Knight"),
            Self::Shaman => write!(f, "Shaman"),
            Self::Mage => write!(f, "Mage"),
            Self::Warlock => write!(f, "Warlock"),
            Self::Druid => write!(f, "Druid"),
        }
    }
}

/// Read-only snapshot of a character taken at decision time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BotObservation {
    /// Character name
    pub name: String,
    /// Current level
    pub level: u8,
    /// Character class
    pub class: Class,
    /// Controlled by the bot AI rather than a human
    pub is_bot: bool,
    /// Part of the server-managed random bot roster
    pub is_managed_bot: bool,
    /// Seconds played since reaching the current level
    pub level_played_seconds: u32,
    /// Guild id, 0 when the character has no guild
    pub guild_id: u32,
    /// Character is in the world (not loading or teleporting)
    pub in_world: bool,
    /// Character is mounted
    pub mounted: bool,
}

impl Default for BotObservation {
    fn default() -> Self {
        Self {
            name: String::new(),
            level: 1,
            class: Class::Warrior,
            is_bot: true,
            is_managed_bot: true,
            level_played_seconds: 0,
            guild_id: 0,
            in_world: true,
            mounted: false,
        }
    }
}

/// Read access to the online population
#[cfg_attr(test, mockall::automock)]
pub trait World: Send + Sync {
    /// Handles of every character currently online
    fn online_players(&self) -> Vec<PlayerHandle>;

    /// Snapshot a character, `None` if the handle is not known
    fn observe(&self, player: PlayerHandle) -> Option<BotObservation>;
}

/// Performs the actual character rebuild for a decision
#[cfg_attr(test, mockall::automock)]
pub trait ResetApplier: Send + Sync {
    /// Rebuild `player` at the decision's target level and notify them.
    ///
    /// # Errors
    /// Returns an error if the character could not be rebuilt.
    fn apply(&self, player: PlayerHandle, decision: Decision) -> ResetResult<()>;
}

/// Population entry in the simulated world's YAML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatedPlayer {
    pub guid: u64,
    #[serde(flatten)]
    pub observation: BotObservation,
}

/// In-memory world used for tests and dry runs
#[derive(Clone, Default)]
pub struct SimulatedWorld {
    players: Arc<DashMap<PlayerHandle, BotObservation>>,
}

impl SimulatedWorld {
    /// Create an empty world
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a population from a YAML list of [`SimulatedPlayer`]
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, crate::config::ConfigError> {
        let content = tokio::fs::read_to_string(path.as_ref()).await?;
        let players: Vec<SimulatedPlayer> = serde_yaml::from_str(&content)?;

        let world = Self::new();
        for player in players {
            world.insert(PlayerHandle(player.guid), player.observation);
        }

        info!("Loaded {} simulated players", world.len());
        Ok(world)
    }

    /// Add or replace a character
    pub fn insert(&self, player: PlayerHandle, observation: BotObservation) {
        self.players.insert(player, observation);
    }

    /// Remove a character (logout)
    pub fn remove(&self, player: PlayerHandle) -> Option<BotObservation> {
        self.players.remove(&player).map(|(_, obs)| obs)
    }

    /// Number of characters online
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Whether nobody is online
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Raise a character's level by one and return the previous level
    pub fn level_up(&self, player: PlayerHandle) -> Option<u8> {
        self.players.get_mut(&player).map(|mut obs| {
            let old_level = obs.level;
            obs.level = obs.level.saturating_add(1);
            obs.level_played_seconds = 0;
            old_level
        })
    }

    /// Add played time to every in-world character
    pub fn advance_played_time(&self, seconds: u32) {
        for mut entry in self.players.iter_mut() {
            if entry.in_world {
                entry.level_played_seconds = entry.level_played_seconds.saturating_add(seconds);
            }
        }
    }
}

impl World for SimulatedWorld {
    fn online_players(&self) -> Vec<PlayerHandle> {
        let mut handles: Vec<PlayerHandle> = self.players.iter().map(|e| *e.key()).collect();
        handles.sort_unstable();
        handles
    }

    fn observe(&self, player: PlayerHandle) -> Option<BotObservation> {
        self.players.get(&player).map(|e| e.value().clone())
    }
}

impl ResetApplier for SimulatedWorld {
    fn apply(&self, player: PlayerHandle, decision: Decision) -> ResetResult<()> {
        let Some(level) = decision.target_level() else {
            return Ok(());
        };

        let mut obs = self
            .players
            .get_mut(&player)
            .ok_or(ResetError::PlayerNotFound(player))?;

        if obs.mounted {
            obs.mounted = false;
        }
        obs.level = level;
        obs.level_played_seconds = 0;

        info!("[{}] Your level has been reset to {level}.", obs.name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(name: &str, level: u8) -> BotObservation {
        BotObservation {
            name: name.to_string(),
            level,
            ..Default::default()
        }
    }

    #[test]
    fn test_apply_dismounts_and_rebuilds() {
        let world = SimulatedWorld::new();
        let player = PlayerHandle(7);
        world.insert(
            player,
            BotObservation {
                mounted: true,
                level_played_seconds: 5000,
                ..bot("Rider", 80)
            },
        );

        world.apply(player, Decision::ResetTo(1)).unwrap();

        let obs = world.observe(player).unwrap();
        assert_eq!(obs.level, 1);
        assert!(!obs.mounted);
        assert_eq!(obs.level_played_seconds, 0);
    }

    #[test]
    fn test_apply_no_action_leaves_player_alone() {
        let world = SimulatedWorld::new();
        let player = PlayerHandle(1);
        world.insert(player, bot("Idle", 42));

        world.apply(player, Decision::NoAction).unwrap();
        assert_eq!(world.observe(player).unwrap().level, 42);
    }

    #[test]
    fn test_apply_unknown_player() {
        let world = SimulatedWorld::new();
        let result = world.apply(PlayerHandle(99), Decision::SkipTo(20));
        assert!(matches!(result, Err(ResetError::PlayerNotFound(PlayerHandle(99)))));
    }

    #[test]
    fn test_level_up_and_played_time() {
        let world = SimulatedWorld::new();
        let player = PlayerHandle(3);
        world.insert(player, bot("Grinder", 9));

        world.advance_played_time(120);
        assert_eq!(world.observe(player).unwrap().level_played_seconds, 120);

        assert_eq!(world.level_up(player), Some(9));
        let obs = world.observe(player).unwrap();
        assert_eq!(obs.level, 10);
        assert_eq!(obs.level_played_seconds, 0);

        assert_eq!(world.level_up(PlayerHandle(404)), None);
    }

    #[test]
    fn test_online_players_sorted() {
        let world = SimulatedWorld::new();
        world.insert(PlayerHandle(3), bot("C", 10));
        world.insert(PlayerHandle(1), bot("A", 10));
        world.insert(PlayerHandle(2), bot("B", 10));

        assert_eq!(
            world.online_players(),
            vec![PlayerHandle(1), PlayerHandle(2), PlayerHandle(3)]
        );
        assert!(world.remove(PlayerHandle(2)).is_some());
        assert_eq!(world.len(), 2);
    }

    #[test]
    fn test_population_yaml() {
        let yaml = r"
- guid: 11
  name: Arthas
  level: 80
  class: DeathKnight
  is_bot: true
  is_managed_bot: true
  level_played_seconds: 100
  guild_id: 4
  in_world: true
  mounted: false
";
        let players: Vec<SimulatedPlayer> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].guid, 11);
        assert_eq!(players[0].observation.class, Class::DeathKnight);
        assert_eq!(players[0].observation.guild_id, 4);
    }
}
