//! Which characters the engine may touch at all

use crate::guild::GuildTracker;
use crate::reset::Policy;
use crate::world::BotObservation;
use std::collections::HashSet;
use std::fmt;

/// Why a character was left alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligible {
    /// A real player, or a bot that is not part of the managed roster
    NotManagedBot,
    /// Name is on the exclusion list
    Excluded,
    /// Guild has, or has had, a real player in it
    RealPlayerGuild(u32),
}

impl fmt::Display for Ineligible {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotManagedBot => write!(f, "not a managed random bot"),
            Self::Excluded => write!(f, "name is excluded"),
            Self::RealPlayerGuild(guild_id) => write!(f, "guild {guild_id} has real players"),
        }
    }
}

/// Run the eligibility checks in order, stopping at the first failure.
///
/// `live_guilds` holds the guilds of real players online right now; only
/// consulted when the policy ignores guilds with real players.
///
/// # Errors
/// Returns the first check that failed.
pub fn check_eligibility(
    obs: &BotObservation,
    policy: &Policy,
    live_guilds: &HashSet<u32>,
    tracker: &GuildTracker,
) -> Result<(), Ineligible> {
    if !obs.is_bot || !obs.is_managed_bot {
        return Err(Ineligible::NotManagedBot);
    }

    if policy.excluded_names.contains(&obs.name) {
        return Err(Ineligible::Excluded);
    }

    if policy.ignore_guilds_with_real_players
        && obs.guild_id != 0
        && (live_guilds.contains(&obs.guild_id) || tracker.contains(obs.guild_id))
    {
        return Err(Ineligible::RealPlayerGuild(obs.guild_id));
    }

    Ok(())
}

/// Whether the engine may reset or skip this character
#[must_use]
pub fn is_eligible(
    obs: &BotObservation,
    policy: &Policy,
    live_guilds: &HashSet<u32>,
    tracker: &GuildTracker,
) -> bool {
    check_eligibility(obs, policy, live_guilds, tracker).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bot(name: &str, guild_id: u32) -> BotObservation {
        BotObservation {
            name: name.to_string(),
            level: 80,
            guild_id,
            ..Default::default()
        }
    }

    #[test]
    fn test_managed_bot_is_eligible() {
        let tracker = GuildTracker::new();
        assert!(is_eligible(&bot("Bot", 0), &Policy::default(), &HashSet::new(), &tracker));
    }

    #[test]
    fn test_real_players_and_companions_rejected() {
        let tracker = GuildTracker::new();
        let policy = Policy::default();

        let human = BotObservation {
            is_bot: false,
            is_managed_bot: false,
            ..bot("Human", 0)
        };
        let companion = BotObservation {
            is_managed_bot: false,
            ..bot("Companion", 0)
        };

        assert_eq!(
            check_eligibility(&human, &policy, &HashSet::new(), &tracker),
            Err(Ineligible::NotManagedBot)
        );
        assert_eq!(
            check_eligibility(&companion, &policy, &HashSet::new(), &tracker),
            Err(Ineligible::NotManagedBot)
        );
    }

    #[test]
    fn test_check_order() {
        // Excluded and in a real-player guild: the exclusion is reported first
        let tracker = GuildTracker::new();
        tracker.insert(9);
        let mut policy = Policy::default();
        policy.excluded_names.insert("Both".to_string());

        assert_eq!(
            check_eligibility(&bot("Both", 9), &policy, &HashSet::new(), &tracker),
            Err(Ineligible::Excluded)
        );
    }

    #[test]
    fn test_exclusion_is_exact_match() {
        let tracker = GuildTracker::new();
        let mut policy = Policy::default();
        policy.excluded_names.insert("Thrall".to_string());

        assert!(!is_eligible(&bot("Thrall", 0), &policy, &HashSet::new(), &tracker));
        assert!(is_eligible(&bot("thrall", 0), &policy, &HashSet::new(), &tracker));
        assert!(is_eligible(&bot("Thrallson", 0), &policy, &HashSet::new(), &tracker));
    }

    #[test]
    fn test_exclusion_is_monotonic() {
        let tracker = GuildTracker::new();
        let names = ["Ana", "Bo", "Cy", "Di"];
        let bots: Vec<BotObservation> = names.iter().map(|n| bot(n, 0)).collect();

        let mut policy = Policy::default();
        let mut previous: Vec<bool> = bots
            .iter()
            .map(|b| is_eligible(b, &policy, &HashSet::new(), &tracker))
            .collect();

        for name in names {
            policy.excluded_names.insert(name.to_string());
            let current: Vec<bool> = bots
                .iter()
                .map(|b| is_eligible(b, &policy, &HashSet::new(), &tracker))
                .collect();
            for (before, after) in previous.iter().zip(&current) {
                assert!(*before || !*after, "exclusion made a bot eligible");
            }
            previous = current;
        }
        assert!(previous.iter().all(|eligible| !eligible));
    }

    #[test]
    fn test_live_guild_or_tracker_excludes() {
        let tracker = GuildTracker::new();
        tracker.insert(5);
        let policy = Policy::default();
        let live: HashSet<u32> = [3].into_iter().collect();

        assert_eq!(
            check_eligibility(&bot("Live", 3), &policy, &live, &tracker),
            Err(Ineligible::RealPlayerGuild(3))
        );
        assert_eq!(
            check_eligibility(&bot("Flagged", 5), &policy, &live, &tracker),
            Err(Ineligible::RealPlayerGuild(5))
        );
        assert!(is_eligible(&bot("Clean", 4), &policy, &live, &tracker));
        assert!(is_eligible(&bot("Guildless", 0), &policy, &live, &tracker));
    }

    #[test]
    fn test_guild_check_disabled() {
        let tracker = GuildTracker::new();
        tracker.insert(5);
        let policy = Policy {
            ignore_guilds_with_real_players: false,
            ..Policy::default()
        };
        let live: HashSet<u32> = [5].into_iter().collect();

        assert!(is_eligible(&bot("Flagged", 5), &policy, &live, &tracker));
    }
}
