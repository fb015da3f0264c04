//! Guild real-player tracking
//!
//! Bots sharing a guild with a real player are left alone. This module keeps
//! track of which guilds those are, both from live scans of the online
//! population and from durable storage.

mod store;
mod tracker;

pub use store::{
    GUILD_FLAGS_FILE, GuildFlag, GuildFlagStore, GuildStoreError, GuildStoreResult,
    MemoryGuildStore, YamlGuildStore,
};
pub use tracker::{GuildStoreRequest, GuildTracker, spawn_persistence_task};
