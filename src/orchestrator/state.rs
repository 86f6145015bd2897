//! Per-turn state machine
//!
//! Deterministic phase tracking for one orchestration call:
//! Received -> Routed -> Dispatched -> Synthesized -> Persisted, with
//! FailedTerminal as the all-agents-failed terminal (the turn is still
//! persisted, but marked). Invalid transitions are programming errors and
//! surface as `InvalidTurnTransition`.

use crate::errors::{AdvisorError, Result};
use serde::{Deserialize, Serialize};

/// Turn phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Query accepted, session loaded
    Received,

    /// Routing decision computed
    Routed,

    /// Specialist agents dispatched
    Dispatched,

    /// At least one agent succeeded; answer synthesized
    Synthesized,

    /// Every agent failed; fallback answer synthesized
    FallbackSynthesized,

    /// Turn persisted (terminal, success path)
    Persisted,

    /// Turn persisted with all agents failed (terminal, marked)
    FailedTerminal,
}

/// Events that advance a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnEvent {
    /// Router produced a decision
    RoutingComplete,

    /// All target agents dispatched
    AgentsDispatched,

    /// Synthesis finished with at least one successful agent
    SynthesisComplete,

    /// Every dispatched agent failed or timed out
    AllAgentsFailed,

    /// Session saved to the store
    SessionSaved,
}

impl TurnPhase {
    /// Check if this is a terminal phase
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnPhase::Persisted | TurnPhase::FailedTerminal)
    }

    /// Attempt a phase transition
    ///
    /// Valid transitions:
    /// 1. Received            -> Routed              (RoutingComplete)
    /// 2. Routed              -> Dispatched          (AgentsDispatched)
    /// 3. Dispatched          -> Synthesized         (SynthesisComplete)
    /// 4. Dispatched          -> FallbackSynthesized (AllAgentsFailed)
    /// 5. Synthesized         -> Persisted           (SessionSaved)
    /// 6. FallbackSynthesized -> FailedTerminal      (SessionSaved)
    ///
    /// Terminal phases self-loop.
    pub fn transition(&self, event: TurnEvent) -> Result<TurnPhase> {
        use TurnEvent::*;
        use TurnPhase::*;

        let next = match (self, event) {
            (Received, RoutingComplete) => Routed,
            (Routed, AgentsDispatched) => Dispatched,
            (Dispatched, SynthesisComplete) => Synthesized,
            (Dispatched, AllAgentsFailed) => FallbackSynthesized,
            (Synthesized, SessionSaved) => Persisted,
            (FallbackSynthesized, SessionSaved) => FailedTerminal,

            (Persisted, _) => Persisted,
            (FailedTerminal, _) => FailedTerminal,

            (from, event) => {
                return Err(AdvisorError::InvalidTurnTransition {
                    from: format!("{:?}", from),
                    to: format!("(via {:?})", event),
                    reason: format!("no valid transition from {:?} on {:?}", from, event),
                });
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_path() {
        let mut phase = TurnPhase::Received;
        phase = phase.transition(TurnEvent::RoutingComplete).unwrap();
        phase = phase.transition(TurnEvent::AgentsDispatched).unwrap();
        phase = phase.transition(TurnEvent::SynthesisComplete).unwrap();
        phase = phase.transition(TurnEvent::SessionSaved).unwrap();

        assert_eq!(phase, TurnPhase::Persisted);
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_total_failure_path() {
        let mut phase = TurnPhase::Received;
        phase = phase.transition(TurnEvent::RoutingComplete).unwrap();
        phase = phase.transition(TurnEvent::AgentsDispatched).unwrap();
        phase = phase.transition(TurnEvent::AllAgentsFailed).unwrap();
        assert_eq!(phase, TurnPhase::FallbackSynthesized);

        phase = phase.transition(TurnEvent::SessionSaved).unwrap();
        assert_eq!(phase, TurnPhase::FailedTerminal);
        assert!(phase.is_terminal());
    }

    #[test]
    fn test_invalid_transition() {
        let phase = TurnPhase::Received;
        let err = phase.transition(TurnEvent::SessionSaved).unwrap_err();
        assert!(matches!(err, AdvisorError::InvalidTurnTransition { .. }));
    }

    #[test]
    fn test_terminal_self_loop() {
        let phase = TurnPhase::Persisted;
        assert_eq!(
            phase.transition(TurnEvent::RoutingComplete).unwrap(),
            TurnPhase::Persisted
        );
    }
}
