pub mod config;
pub mod guild;
pub mod logging;
pub mod reset;
pub mod scheduler;
pub mod world;

// Log targets
pub const BOT_NAME: &str = "player_bot_reset";
pub const DECISION_TARGET: &str = "player_bot_reset::decision";
pub const TRACKER_TARGET: &str = "player_bot_reset::tracker";
pub const ERROR_TARGET: &str = "player_bot_reset::error";
pub const CONSOLE_TARGET: &str = "player_bot_reset";

pub use config::{ConfigSource, YamlConfig};
pub use guild::{GuildTracker, YamlGuildStore};
pub use reset::{Decision, Policy, ResetService, Trigger};
pub use world::{BotObservation, PlayerHandle, ResetApplier, SimulatedWorld, World};
pub type Error = Box<dyn std::error::Error + Send + Sync>;
