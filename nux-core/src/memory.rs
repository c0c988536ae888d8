//! Bounded, time-windowed interaction history.
//!
//! Capacity and recency are independent: eviction is strictly FIFO at
//! `max_history`, while the context window only filters what "recent" reads
//! return.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::command::CommandResult;

/// Count cap for the in-window statistic; large enough to count everything.
const STATS_WINDOW_CAP: usize = 50;
/// Entries shown by `context_summary`.
const SUMMARY_COUNT: usize = 5;

/// Configuration for `ContextMemory`.
#[derive(Debug, Clone, Copy)]
pub struct MemoryConfig {
    /// Maximum retained interactions. Default: 50.
    pub max_history: usize,
    /// Default recency window in minutes. Default: 30.
    pub context_window_minutes: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_history: 50,
            context_window_minutes: 30,
        }
    }
}

/// One completed command → response exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub result: CommandResult,
    pub response: Option<String>,
}

/// Snapshot returned by `ContextMemory::get_statistics`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextStats {
    pub total_interactions: usize,
    pub session_duration_minutes: f64,
    pub commands_in_window: usize,
}

#[derive(Debug, Clone)]
pub struct ContextMemory {
    config: MemoryConfig,
    history: VecDeque<Interaction>,
    session_start: DateTime<Utc>,
}

impl ContextMemory {
    pub fn new(config: MemoryConfig) -> Self {
        let config = MemoryConfig {
            max_history: config.max_history.max(1),
            ..config
        };
        Self {
            config,
            history: VecDeque::with_capacity(config.max_history),
            session_start: Utc::now(),
        }
    }

    pub fn config(&self) -> MemoryConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Record an interaction stamped with the current time.
    pub fn add_interaction(
        &mut self,
        command: impl Into<String>,
        result: CommandResult,
        response: Option<String>,
    ) {
        self.add_interaction_at(Utc::now(), command, result, response);
    }

    /// Record an interaction with an explicit timestamp.
    pub fn add_interaction_at(
        &mut self,
        timestamp: DateTime<Utc>,
        command: impl Into<String>,
        result: CommandResult,
        response: Option<String>,
    ) {
        let command = command.into();
        while self.history.len() >= self.config.max_history {
            self.history.pop_front();
        }
        debug!(command = %command, "added to context");
        self.history.push_back(Interaction {
            timestamp,
            command,
            result,
            response,
        });
    }

    /// Up to `max_count` interactions newer than `now − window_minutes`,
    /// oldest first.
    pub fn get_recent(&self, window_minutes: i64, max_count: usize) -> Vec<Interaction> {
        self.get_recent_at(Utc::now(), window_minutes, max_count)
    }

    pub fn get_recent_at(
        &self,
        now: DateTime<Utc>,
        window_minutes: i64,
        max_count: usize,
    ) -> Vec<Interaction> {
        // A window too large to represent reaches back past every entry.
        let cutoff = Duration::try_minutes(window_minutes.max(0))
            .and_then(|window| now.checked_sub_signed(window));
        let mut recent: Vec<Interaction> = Vec::new();
        if max_count == 0 {
            return recent;
        }
        for interaction in self.history.iter().rev() {
            if cutoff.is_some_and(|cutoff| interaction.timestamp < cutoff) {
                break;
            }
            recent.push(interaction.clone());
            if recent.len() >= max_count {
                break;
            }
        }
        recent.reverse();
        recent
    }

    /// `get_recent` over the configured default window.
    pub fn recent_context(&self, count: usize) -> Vec<Interaction> {
        self.get_recent(self.config.context_window_minutes, count)
    }

    /// Newest-first, case-insensitive substring match on command text.
    pub fn search(&self, keyword: &str, limit: usize) -> Vec<Interaction> {
        let keyword = keyword.to_lowercase();
        self.history
            .iter()
            .rev()
            .filter(|i| i.command.to_lowercase().contains(&keyword))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn last_command(&self) -> Option<&str> {
        self.history.back().map(|i| i.command.as_str())
    }

    pub fn last_result(&self) -> Option<&CommandResult> {
        self.history.back().map(|i| &i.result)
    }

    /// Numbered list of the most recent in-window commands.
    pub fn context_summary(&self) -> String {
        let recent = self.recent_context(SUMMARY_COUNT);
        if recent.is_empty() {
            return "No recent context".to_string();
        }
        let mut summary = String::from("Recent commands:\n");
        for (i, interaction) in recent.iter().enumerate() {
            summary.push_str(&format!("{}. {}\n", i + 1, interaction.command));
        }
        summary
    }

    pub fn get_statistics(&self) -> ContextStats {
        self.get_statistics_at(Utc::now())
    }

    pub fn get_statistics_at(&self, now: DateTime<Utc>) -> ContextStats {
        let elapsed = now.signed_duration_since(self.session_start);
        ContextStats {
            total_interactions: self.history.len(),
            session_duration_minutes: elapsed.num_milliseconds().max(0) as f64 / 60_000.0,
            commands_in_window: self
                .get_recent_at(now, self.config.context_window_minutes, STATS_WINDOW_CAP)
                .len(),
        }
    }

    /// Drop all interactions and restart the session clock.
    pub fn clear(&mut self) {
        self.history.clear();
        self.session_start = Utc::now();
        info!("context cleared");
    }

    pub fn iter(&self) -> impl Iterator<Item = &Interaction> {
        self.history.iter()
    }
}

impl Default for ContextMemory {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(max_history: usize) -> ContextMemory {
        ContextMemory::new(MemoryConfig {
            max_history,
            context_window_minutes: 30,
        })
    }

    fn ok(text: &str) -> CommandResult {
        CommandResult::ok(text)
    }

    #[test]
    fn overflow_evicts_oldest() {
        let mut mem = memory(3);
        for cmd in ["one", "two", "three", "four"] {
            mem.add_interaction(cmd, ok(cmd), None);
        }
        assert_eq!(mem.len(), 3);
        let commands: Vec<&str> = mem.iter().map(|i| i.command.as_str()).collect();
        assert_eq!(commands, vec!["two", "three", "four"]);
    }

    #[test]
    fn recent_stops_at_first_entry_outside_window() {
        let now = Utc::now();
        let mut mem = memory(10);
        mem.add_interaction_at(now - Duration::minutes(90), "ancient", ok("a"), None);
        mem.add_interaction_at(now - Duration::minutes(20), "older", ok("b"), None);
        mem.add_interaction_at(now - Duration::minutes(5), "newer", ok("c"), None);
        mem.add_interaction_at(now, "newest", ok("d"), None);

        let recent = mem.get_recent_at(now, 30, 10);
        let commands: Vec<&str> = recent.iter().map(|i| i.command.as_str()).collect();
        assert_eq!(commands, vec!["older", "newer", "newest"]);
    }

    #[test]
    fn recent_caps_count_but_keeps_chronological_order() {
        let now = Utc::now();
        let mut mem = memory(10);
        for (i, cmd) in ["a", "b", "c", "d"].iter().enumerate() {
            mem.add_interaction_at(now - Duration::minutes(4 - i as i64), *cmd, ok(cmd), None);
        }
        let recent = mem.get_recent_at(now, 30, 2);
        let commands: Vec<&str> = recent.iter().map(|i| i.command.as_str()).collect();
        assert_eq!(commands, vec!["c", "d"]);
    }

    #[test]
    fn zero_window_returns_only_entries_stamped_now() {
        let now = Utc::now();
        let mut mem = memory(10);
        mem.add_interaction_at(now - Duration::seconds(1), "earlier", ok("a"), None);
        mem.add_interaction_at(now, "exactly now", ok("b"), None);

        let recent = mem.get_recent_at(now, 0, 10);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].command, "exactly now");

        // Wall-clock call: anything added before "now" is already out of window.
        let later = now + Duration::milliseconds(5);
        assert!(mem.get_recent_at(later, 0, 10).is_empty());
    }

    #[test]
    fn huge_window_is_unbounded() {
        let now = Utc::now();
        let mut mem = memory(10);
        mem.add_interaction_at(now - Duration::days(400), "last year", ok("a"), None);
        mem.add_interaction_at(now, "today", ok("b"), None);

        for window in [i64::MAX, 1_000_000_000_000] {
            let recent = mem.get_recent_at(now, window, 5);
            let commands: Vec<&str> = recent.iter().map(|i| i.command.as_str()).collect();
            assert_eq!(commands, vec!["last year", "today"]);
        }
        assert_eq!(mem.get_recent(i64::MAX, 5).len(), 2);
    }

    #[test]
    fn window_does_not_affect_eviction() {
        let now = Utc::now();
        let mut mem = memory(5);
        mem.add_interaction_at(now - Duration::days(2), "stale", ok("s"), None);
        mem.add_interaction_at(now, "fresh", ok("f"), None);
        assert_eq!(mem.len(), 2);
        assert_eq!(mem.get_recent_at(now, 30, 10).len(), 1);
    }

    #[test]
    fn search_is_newest_first_case_insensitive_and_limited() {
        let mut mem = memory(10);
        mem.add_interaction("Open Firefox", ok("1"), None);
        mem.add_interaction("take screenshot", ok("2"), None);
        mem.add_interaction("open terminal", ok("3"), None);
        mem.add_interaction("OPEN calculator", ok("4"), None);

        let hits = mem.search("open", 2);
        let commands: Vec<&str> = hits.iter().map(|i| i.command.as_str()).collect();
        assert_eq!(commands, vec!["OPEN calculator", "open terminal"]);
        assert!(mem.search("weather", 10).is_empty());
    }

    #[test]
    fn statistics_count_window_entries() {
        let now = Utc::now();
        let mut mem = memory(10);
        mem.add_interaction_at(now - Duration::hours(3), "old", ok("o"), None);
        mem.add_interaction_at(now - Duration::minutes(1), "a", ok("a"), None);
        mem.add_interaction_at(now, "b", ok("b"), None);

        let stats = mem.get_statistics_at(now);
        assert_eq!(stats.total_interactions, 3);
        assert_eq!(stats.commands_in_window, 2);
        assert!(stats.session_duration_minutes >= 0.0);
    }

    #[test]
    fn last_accessors_and_summary() {
        let mut mem = memory(10);
        assert_eq!(mem.last_command(), None);
        assert_eq!(mem.context_summary(), "No recent context");

        mem.add_interaction("open browser", ok("Opening firefox"), Some("Done!".into()));
        mem.add_interaction("what time is it", ok("The time is 09:15 AM"), None);

        assert_eq!(mem.last_command(), Some("what time is it"));
        assert_eq!(
            mem.last_result().map(|r| r.result_text()),
            Some("The time is 09:15 AM".to_string())
        );
        assert_eq!(
            mem.context_summary(),
            "Recent commands:\n1. open browser\n2. what time is it\n"
        );
    }

    #[test]
    fn clear_empties_and_resets_session() {
        let mut mem = memory(10);
        mem.add_interaction("one", ok("1"), None);
        mem.clear();
        assert!(mem.is_empty());
        assert_eq!(mem.get_statistics().total_interactions, 0);
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut mem = memory(0);
        mem.add_interaction("a", ok("a"), None);
        mem.add_interaction("b", ok("b"), None);
        assert_eq!(mem.len(), 1);
        assert_eq!(mem.last_command(), Some("b"));
    }
}
