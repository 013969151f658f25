// SPDX-FileCopyrightText: 2026 Deskpilot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-session cancellation of in-flight turns.
//!
//! A new user message cancels the previous turn's generation for that
//! session: the cancelled turn discards its partial output and never
//! appends to history. Tokens are tracked per session with a generation
//! counter so a finished turn only cleans up its own entry.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Handle for one turn's lifetime.
pub struct TurnGuard {
    pub token: CancellationToken,
    session_id: String,
    generation: u64,
}

/// Registry of the in-flight turn per session.
#[derive(Default)]
pub struct CancelRegistry {
    turns: DashMap<String, (u64, CancellationToken)>,
}

impl CancelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a turn for the session, cancelling any in-flight one.
    pub fn begin(&self, session_id: &str) -> TurnGuard {
        let token = CancellationToken::new();
        let mut generation = 0;

        self.turns
            .entry(session_id.to_string())
            .and_modify(|(current, existing)| {
                debug!(session_id, "cancelling in-flight turn");
                existing.cancel();
                *current += 1;
                generation = *current;
                *existing = token.clone();
            })
            .or_insert_with(|| (0, token.clone()));

        TurnGuard {
            token,
            session_id: session_id.to_string(),
            generation,
        }
    }

    /// Drops the registry entry when the finishing turn is still current.
    pub fn finish(&self, guard: &TurnGuard) {
        self.turns.remove_if(&guard.session_id, |_, (current, _)| {
            *current == guard.generation
        });
    }

    /// Number of sessions with an in-flight turn (for tests/observability).
    pub fn in_flight(&self) -> usize {
        self.turns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_turn_cancels_previous() {
        let registry = CancelRegistry::new();
        let first = registry.begin("s-1");
        assert!(!first.token.is_cancelled());

        let second = registry.begin("s-1");
        assert!(first.token.is_cancelled(), "older turn must be cancelled");
        assert!(!second.token.is_cancelled());
    }

    #[test]
    fn sessions_are_independent() {
        let registry = CancelRegistry::new();
        let a = registry.begin("s-a");
        let _b = registry.begin("s-b");
        assert!(!a.token.is_cancelled());
    }

    #[test]
    fn finish_only_removes_current_generation() {
        let registry = CancelRegistry::new();
        let first = registry.begin("s-1");
        let second = registry.begin("s-1");

        // The superseded turn must not clean up the newer one's entry.
        registry.finish(&first);
        assert_eq!(registry.in_flight(), 1);

        registry.finish(&second);
        assert_eq!(registry.in_flight(), 0);
    }
}
