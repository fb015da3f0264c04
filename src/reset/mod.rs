//! Bot level reset engine
//!
//! This module decides whether a managed bot should be reset to a lower level,
//! skipped ahead to a higher one, or left alone, and drives those decisions
//! from the host's login, level change and tick events.

mod chance;
mod decision;
mod eligibility;
mod error;
mod ledger;
mod policy;
mod record;
mod service;

pub use chance::{RngRoller, Roller, compute_chance};
pub use decision::{Decision, Trigger, adjust_for_class, decide};
pub use eligibility::{Ineligible, check_eligibility, is_eligible};
pub use error::{ResetError, ResetResult};
pub use ledger::ResetLedger;
pub use policy::{
    DEFAULT_GUILD_TRACKER_INTERVAL, DEFAULT_MAX_LEVEL, DEFAULT_MIN_TIME_PLAYED,
    DEFAULT_RESCAN_INTERVAL, DEFAULT_RESET_CHANCE, DEFAULT_RESET_TO_LEVEL,
    DEFAULT_SKIP_FROM_LEVEL, DEFAULT_SKIP_TO_LEVEL, LEVEL_CAP, Policy, PolicyHandle, ResetPair,
    ThresholdRule, parse_reset_pairs,
};
pub use record::ResetRecord;
pub use service::ResetService;
