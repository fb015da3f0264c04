//! Guild real-player tracker
//!
//! Keeps the set of guilds known to contain at least one real (non-bot)
//! player. The set only ever grows: once a guild is flagged it stays flagged
//! for the rest of the session, even if the real player leaves.

use crate::guild::{GuildFlagStore, GuildStoreError};
use crate::world::World;
use crate::TRACKER_TARGET;
use dashmap::DashSet;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Capacity of the persistence queue
pub const PERSISTENCE_QUEUE_CAPACITY: usize = 1024;

/// Request for the guild persistence task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuildStoreRequest {
    /// Persist a guild as having real players
    Flag(u32),
    /// Drain and stop the task
    Shutdown,
}

/// Set of guilds with real players, shared between the engine and refreshes
#[derive(Clone, Default)]
pub struct GuildTracker {
    flagged: Arc<DashSet<u32>>,
    tx: Option<Sender<GuildStoreRequest>>,
}

impl GuildTracker {
    /// Create an empty tracker with no persistence
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send newly flagged guilds to a persistence task
    pub fn set_sender(&mut self, tx: Sender<GuildStoreRequest>) {
        self.tx = Some(tx);
    }

    /// Whether the guild is flagged
    #[must_use]
    pub fn contains(&self, guild_id: u32) -> bool {
        self.flagged.contains(&guild_id)
    }

    /// Flag a guild in memory only. Returns true if it was not already flagged.
    pub fn insert(&self, guild_id: u32) -> bool {
        self.flagged.insert(guild_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.flagged.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.flagged.is_empty()
    }

    /// Copy of the flagged set
    #[must_use]
    pub fn snapshot(&self) -> HashSet<u32> {
        self.flagged.iter().map(|id| *id).collect()
    }

    /// Replace the in-memory set with what durable storage holds.
    ///
    /// If storage cannot be read the set is left empty and the error is
    /// returned for the caller to log.
    pub async fn load(&self, store: &dyn GuildFlagStore) -> Result<usize, GuildStoreError> {
        self.flagged.clear();

        match store.load_flagged_guilds().await {
            Ok(guilds) => {
                for guild_id in guilds {
                    self.flagged.insert(guild_id);
                }
                info!(
                    target: TRACKER_TARGET,
                    "Loaded {} guilds with real players from storage",
                    self.flagged.len()
                );
                Ok(self.flagged.len())
            }
            Err(e) => {
                warn!(
                    target: TRACKER_TARGET,
                    "Guild storage unavailable, starting with no flagged guilds: {e}"
                );
                Err(e)
            }
        }
    }

    /// Guilds of real players who are online and in the world right now
    #[must_use]
    pub fn live_scan(world: &dyn World) -> HashSet<u32> {
        world
            .online_players()
            .into_iter()
            .filter_map(|player| world.observe(player))
            .filter(|obs| obs.in_world && !obs.is_bot && obs.guild_id != 0)
            .map(|obs| obs.guild_id)
            .collect()
    }

    /// Merge a live scan into the flagged set and queue every new guild for
    /// persistence. Returns the newly flagged guilds.
    pub fn refresh(&self, world: &dyn World) -> Vec<u32> {
        let mut newly_flagged: Vec<u32> = Self::live_scan(world)
            .into_iter()
            .filter(|guild_id| self.flagged.insert(*guild_id))
            .collect();
        newly_flagged.sort_unstable();

        for guild_id in &newly_flagged {
            self.persist(*guild_id);
        }

        debug!(
            target: TRACKER_TARGET,
            new = newly_flagged.len(),
            total = self.flagged.len(),
            "Guild tracker refreshed"
        );

        newly_flagged
    }

    /// Queue a guild for persistence without waiting
    fn persist(&self, guild_id: u32) {
        let Some(tx) = &self.tx else {
            warn!(
                target: TRACKER_TARGET,
                "No guild persistence task, guild {guild_id} flagged in memory only"
            );
            return;
        };

        match tx.try_send(GuildStoreRequest::Flag(guild_id)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                error!(target: TRACKER_TARGET, "Guild persistence queue full, dropping guild {guild_id}");
            }
            Err(TrySendError::Closed(_)) => {
                error!(target: TRACKER_TARGET, "Guild persistence task stopped, dropping guild {guild_id}");
            }
        }
    }
}

/// Create the persistence channel and start the task writing to `store`
#[must_use]
pub fn spawn_persistence_task(
    store: Arc<dyn GuildFlagStore>,
) -> (Sender<GuildStoreRequest>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel::<GuildStoreRequest>(PERSISTENCE_QUEUE_CAPACITY);
    let handle = tokio::spawn(persistence_task(store, rx));
    (tx, handle)
}

/// Drain flag requests into the store. Failures are logged and not retried.
async fn persistence_task(store: Arc<dyn GuildFlagStore>, mut rx: Receiver<GuildStoreRequest>) {
    info!(target: TRACKER_TARGET, "Starting guild persistence task");

    while let Some(request) = rx.recv().await {
        match request {
            GuildStoreRequest::Flag(guild_id) => {
                if let Err(e) = store.flag_guild(guild_id).await {
                    error!(target: TRACKER_TARGET, "Failed to persist guild {guild_id}: {e}");
                }
            }
            GuildStoreRequest::Shutdown => {
                info!(target: TRACKER_TARGET, "Received shutdown request for guild persistence task");
                break;
            }
        }
    }

    info!(target: TRACKER_TARGET, "Guild persistence task shut down");
}
