//! Reset service
//!
//! This module wires the decision engine to the host's event hooks. The host
//! calls [`ResetService::on_login`], [`ResetService::on_level_changed`] and
//! [`ResetService::on_tick`] from its game loop, one call at a time.

use crate::config::ConfigSource;
use crate::guild::GuildTracker;
use crate::logging::{LogControl, log_scan_summary};
use crate::reset::{
    Decision, Policy, PolicyHandle, ResetLedger, ResetRecord, Roller, Trigger, check_eligibility,
    decide,
};
use crate::scheduler::RescanScheduler;
use crate::world::{BotObservation, PlayerHandle, ResetApplier, World};
use crate::{DECISION_TARGET, ERROR_TARGET};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Service driving resets for the online population
pub struct ResetService {
    /// Policy in force, swappable on reload
    policy: PolicyHandle,
    /// Guilds with real players
    tracker: GuildTracker,
    /// Rescan and guild refresh timers
    scheduler: RescanScheduler,
    /// Applied decisions
    ledger: ResetLedger,
    world: Box<dyn World>,
    applier: Box<dyn ResetApplier>,
    roller: Box<dyn Roller>,
    /// Installed log filter, switched by `DebugMode` on reload
    log_control: Option<LogControl>,
}

impl ResetService {
    /// Create a new reset service
    pub fn new(
        policy: Policy,
        world: Box<dyn World>,
        applier: Box<dyn ResetApplier>,
        roller: Box<dyn Roller>,
    ) -> Self {
        let scheduler = RescanScheduler::from_policy(&policy);
        Self {
            policy: PolicyHandle::new(policy),
            tracker: GuildTracker::new(),
            scheduler,
            ledger: ResetLedger::new(),
            world,
            applier,
            roller,
            log_control: None,
        }
    }

    /// Use an already loaded guild tracker
    #[must_use]
    pub fn with_tracker(mut self, tracker: GuildTracker) -> Self {
        self.tracker = tracker;
        self
    }

    /// Let reloads switch the log filter
    #[must_use]
    pub fn with_log_control(mut self, log_control: LogControl) -> Self {
        self.log_control = Some(log_control);
        self
    }

    /// Policy in force right now
    #[must_use]
    pub fn policy(&self) -> Arc<Policy> {
        self.policy.snapshot()
    }

    /// Shared handle to the policy
    #[must_use]
    pub fn policy_handle(&self) -> &PolicyHandle {
        &self.policy
    }

    #[must_use]
    pub fn tracker(&self) -> &GuildTracker {
        &self.tracker
    }

    #[must_use]
    pub fn ledger(&self) -> &ResetLedger {
        &self.ledger
    }

    #[must_use]
    pub fn scheduler(&self) -> &RescanScheduler {
        &self.scheduler
    }

    /// Rebuild the policy from configuration and swap it in
    pub fn reload(&mut self, source: &dyn ConfigSource) {
        let policy = Policy::from_source(source);
        self.scheduler.reconfigure(&policy);
        if let Some(log_control) = &self.log_control {
            if let Err(e) = log_control.set_debug(policy.debug) {
                error!(target: ERROR_TARGET, "Failed to update log filter: {e}");
            }
        }
        self.policy.replace(policy);
        info!("Reset policy reloaded");
    }

    /// Host hook: a character logged in
    pub fn on_login(&mut self, player: PlayerHandle) {
        self.handle_event(player, Trigger::Login);
    }

    /// Handle many logins at once, e.g. everyone online at startup.
    /// The live guild scan is shared by the whole batch.
    /// Returns the number of decisions applied.
    pub fn on_login_batch(&mut self, players: &[PlayerHandle]) -> usize {
        let policy = self.policy.snapshot();
        let live_guilds = self.live_guilds(&policy);
        let mut applied = 0;

        for &player in players {
            let Some(obs) = self.world.observe(player) else {
                error!(target: ERROR_TARGET, %player, trigger = %Trigger::Login, "Event for unknown player");
                continue;
            };
            if self.evaluate(player, &obs, &policy, &live_guilds, Trigger::Login) {
                applied += 1;
            }
        }

        log_scan_summary("login", players.len(), applied);
        applied
    }

    /// Host hook: a character's level changed
    pub fn on_level_changed(&mut self, player: PlayerHandle, old_level: u8) {
        debug!(target: DECISION_TARGET, %player, old_level, "Level changed");
        self.handle_event(player, Trigger::LevelChanged);
    }

    /// Host hook: time has passed. Runs whichever scans are due.
    pub fn on_tick(&mut self, elapsed_ms: u32) {
        let due = self.scheduler.tick(elapsed_ms);
        let policy = self.policy.snapshot();

        if due.guild_refresh && policy.ignore_guilds_with_real_players {
            self.refresh_guilds();
        }

        if due.rescan && policy.restrict_by_played_time {
            self.rescan();
        }
    }

    /// Merge the online real players' guilds into the tracker
    pub fn refresh_guilds(&mut self) -> Vec<u32> {
        let newly_flagged = self.tracker.refresh(self.world.as_ref());
        if !newly_flagged.is_empty() {
            info!(
                "Flagged {} new guilds with real players: {newly_flagged:?}",
                newly_flagged.len()
            );
        }
        newly_flagged
    }

    /// Evaluate every online bot at or above its reset threshold.
    /// Returns the number of decisions applied.
    pub fn rescan(&mut self) -> usize {
        let policy = self.policy.snapshot();
        debug!(target: DECISION_TARGET, "Starting time-based reset check");

        let live_guilds = self.live_guilds(&policy);
        let mut evaluated = 0;
        let mut applied = 0;

        for player in self.world.online_players() {
            let Some(obs) = self.world.observe(player) else {
                continue;
            };
            if !obs.in_world || !policy.is_rescan_candidate(obs.level) {
                continue;
            }

            evaluated += 1;
            if self.evaluate(player, &obs, &policy, &live_guilds, Trigger::Rescan) {
                applied += 1;
            }
        }

        log_scan_summary("rescan", evaluated, applied);
        applied
    }

    fn handle_event(&mut self, player: PlayerHandle, trigger: Trigger) {
        let Some(obs) = self.world.observe(player) else {
            error!(target: ERROR_TARGET, %player, %trigger, "Event for unknown player");
            return;
        };

        let policy = self.policy.snapshot();
        let live_guilds = if obs.guild_id != 0 {
            self.live_guilds(&policy)
        } else {
            HashSet::new()
        };

        self.evaluate(player, &obs, &policy, &live_guilds, trigger);
    }

    fn live_guilds(&self, policy: &Policy) -> HashSet<u32> {
        if policy.ignore_guilds_with_real_players {
            GuildTracker::live_scan(self.world.as_ref())
        } else {
            HashSet::new()
        }
    }

    /// Check, decide and apply for one bot. Returns true if a decision was applied.
    fn evaluate(
        &mut self,
        player: PlayerHandle,
        obs: &BotObservation,
        policy: &Policy,
        live_guilds: &HashSet<u32>,
        trigger: Trigger,
    ) -> bool {
        if let Err(reason) = check_eligibility(obs, policy, live_guilds, &self.tracker) {
            debug!(
                target: DECISION_TARGET,
                %player,
                bot = %obs.name,
                %trigger,
                %reason,
                "Skipping reset check"
            );
            return false;
        }

        let decision = decide(obs, policy, trigger, self.roller.as_mut());
        if decision == Decision::NoAction {
            return false;
        }

        self.apply(player, obs, decision, trigger)
    }

    fn apply(
        &mut self,
        player: PlayerHandle,
        obs: &BotObservation,
        decision: Decision,
        trigger: Trigger,
    ) -> bool {
        if let Err(e) = self.applier.apply(player, decision) {
            error!(
                target: ERROR_TARGET,
                %player,
                bot = %obs.name,
                %decision,
                "Failed to apply decision: {e}"
            );
            return false;
        }

        info!(
            target: DECISION_TARGET,
            %player,
            bot = %obs.name,
            class = %obs.class,
            from_level = obs.level,
            %decision,
            %trigger,
            "Decision applied"
        );
        self.ledger
            .add(ResetRecord::new(player, obs, decision, trigger));
        true
    }
}
