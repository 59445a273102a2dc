//! Worker rosters handed to the dispatcher.

use std::sync::Arc;

use crate::config::parse_var;
use crate::error::ConfigError;
use crate::worker::{Tier, Worker};

/// Environment variable with the number of first-line workers.
pub const ENV_FIRST_LINE: &str = "CALL_DISPATCH_FIRST_LINE";
/// Environment variable with the number of second-line workers.
pub const ENV_SECOND_LINE: &str = "CALL_DISPATCH_SECOND_LINE";
/// Environment variable with the number of third-line workers.
pub const ENV_THIRD_LINE: &str = "CALL_DISPATCH_THIRD_LINE";

/// The three worker collections. Any of them may be absent.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    pub first_line: Option<Vec<Arc<Worker>>>,
    pub second_line: Option<Vec<Arc<Worker>>>,
    pub third_line: Option<Vec<Arc<Worker>>>,
}

impl Roster {
    /// A roster with every tier absent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Staff each tier with `n` fresh workers numbered from 1. A count of
    /// zero leaves the tier absent.
    pub fn from_counts(first_line: usize, second_line: usize, third_line: usize) -> Self {
        Self {
            first_line: staff(first_line),
            second_line: staff(second_line),
            third_line: staff(third_line),
        }
    }

    /// Roster sizes from the environment; defaults to 5/5/3.
    pub fn from_env() -> Result<Self, ConfigError> {
        let lookup = |key: &str| std::env::var(key).ok();
        Ok(Self::from_counts(
            parse_var(&lookup, ENV_FIRST_LINE)?.unwrap_or(5),
            parse_var(&lookup, ENV_SECOND_LINE)?.unwrap_or(5),
            parse_var(&lookup, ENV_THIRD_LINE)?.unwrap_or(3),
        ))
    }

    /// Replace one tier's collection.
    pub fn with_tier(mut self, tier: Tier, workers: Vec<Arc<Worker>>) -> Self {
        *self.slot_mut(tier) = Some(workers);
        self
    }

    /// Workers of one tier, if that tier is present.
    pub fn tier(&self, tier: Tier) -> Option<&[Arc<Worker>]> {
        match tier {
            Tier::FirstLine => self.first_line.as_deref(),
            Tier::SecondLine => self.second_line.as_deref(),
            Tier::ThirdLine => self.third_line.as_deref(),
        }
    }

    /// Total workers across all tiers.
    pub fn len(&self) -> usize {
        Tier::ESCALATION
            .iter()
            .map(|&tier| self.tier(tier).map_or(0, <[_]>::len))
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(&mut self, tier: Tier) -> &mut Option<Vec<Arc<Worker>>> {
        match tier {
            Tier::FirstLine => &mut self.first_line,
            Tier::SecondLine => &mut self.second_line,
            Tier::ThirdLine => &mut self.third_line,
        }
    }
}

fn staff(count: usize) -> Option<Vec<Arc<Worker>>> {
    if count == 0 {
        return None;
    }
    Some((1..=count as u32).map(|id| Arc::new(Worker::new(id))).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_build_numbered_workers() {
        let roster = Roster::from_counts(5, 5, 3);
        assert_eq!(roster.len(), 13);

        let third = roster.tier(Tier::ThirdLine).unwrap();
        let ids: Vec<u32> = third.iter().map(|w| w.id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(third.iter().all(|w| !w.is_busy()));
    }

    #[test]
    fn zero_count_means_absent() {
        let roster = Roster::from_counts(0, 2, 0);
        assert!(roster.first_line.is_none());
        assert!(roster.third_line.is_none());
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn empty_roster() {
        let roster = Roster::new();
        assert!(roster.is_empty());
        assert!(roster.tier(Tier::FirstLine).is_none());
    }

    #[test]
    fn with_tier_replaces_collection() {
        let busy = Arc::new(Worker::new(1));
        busy.set_busy(true);
        let roster = Roster::from_counts(3, 0, 0).with_tier(Tier::FirstLine, vec![busy]);

        let first = roster.tier(Tier::FirstLine).unwrap();
        assert_eq!(first.len(), 1);
        assert!(first[0].is_busy());
    }
}
