//! Modality-agnostic drag session state machine.
//!
//! Pointer, simulated-mouse and keyboard adapters all feed the same three
//! signals (pick up, hover, release/cancel). The session records which
//! modality owns it and events from any other modality are refused, so a
//! stray mouse move cannot corrupt a keyboard-driven drag.

use crate::errors::GestureRejection;
use crate::flex_id::ChannelId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    /// Terminal mouse events (press on the grip, drag, release)
    Pointer,
    /// Raw coordinates injected by an automation harness
    SimulatedMouse,
    /// Pick up / arrow / drop keys
    Keyboard,
}

impl Modality {
    pub fn display_name(&self) -> &'static str {
        match self {
            Modality::Pointer => "mouse",
            Modality::SimulatedMouse => "simulated mouse",
            Modality::Keyboard => "keyboard",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragSession {
    pub modality: Modality,
    pub dragged: ChannelId,
    /// Index of the dragged row in the displayed sequence at pick-up
    pub origin_index: usize,
    pub target: Option<ChannelId>,
    /// Keyboard sessions track the lifted row separately from focus
    pub picked_up: Option<ChannelId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragState {
    #[default]
    Idle,
    Dragging(DragSession),
}

/// Result of a release signal. Either way the machine is back to Idle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Valid, distinct target: the caller dispatches the reorder
    Drop {
        modality: Modality,
        dragged: ChannelId,
        origin_index: usize,
        target: ChannelId,
    },
    Cancelled {
        modality: Modality,
        dragged: ChannelId,
        origin_index: usize,
        reason: GestureRejection,
    },
}

#[derive(Debug, Clone, Default)]
pub struct DragMachine {
    state: DragState,
}

impl DragMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn session(&self) -> Option<&DragSession> {
        match &self.state {
            DragState::Idle => None,
            DragState::Dragging(session) => Some(session),
        }
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn owner(&self) -> Option<Modality> {
        self.session().map(|s| s.modality)
    }

    /// Idle -> Dragging
    pub fn pick_up(
        &mut self,
        modality: Modality,
        id: ChannelId,
        origin_index: usize,
    ) -> Result<&DragSession, GestureRejection> {
        if self.is_dragging() {
            return Err(GestureRejection::SessionActive);
        }
        self.state = DragState::Dragging(DragSession {
            modality,
            dragged: id,
            origin_index,
            target: None,
            picked_up: (modality == Modality::Keyboard).then_some(id),
        });
        match &self.state {
            DragState::Dragging(session) => Ok(session),
            DragState::Idle => Err(GestureRejection::NoSession),
        }
    }

    /// Update the hovered row. Returns whether the target changed.
    pub fn hover(&mut self, modality: Modality, target: Option<ChannelId>) -> Result<bool, GestureRejection> {
        let DragState::Dragging(session) = &mut self.state else {
            return Err(GestureRejection::NoSession);
        };
        if session.modality != modality {
            return Err(GestureRejection::ForeignModality);
        }
        if session.target == target {
            return Ok(false);
        }
        session.target = target;
        Ok(true)
    }

    /// Commit signal from the owning modality
    pub fn release(&mut self, modality: Modality) -> Result<ReleaseOutcome, GestureRejection> {
        match &self.state {
            DragState::Idle => return Err(GestureRejection::NoSession),
            DragState::Dragging(session) if session.modality != modality => {
                return Err(GestureRejection::ForeignModality)
            }
            DragState::Dragging(_) => {}
        }

        let DragState::Dragging(session) = std::mem::take(&mut self.state) else {
            return Err(GestureRejection::NoSession);
        };
        let outcome = match session.target {
            Some(target) if target != session.dragged => ReleaseOutcome::Drop {
                modality,
                dragged: session.dragged,
                origin_index: session.origin_index,
                target,
            },
            Some(_) => ReleaseOutcome::Cancelled {
                modality,
                dragged: session.dragged,
                origin_index: session.origin_index,
                reason: GestureRejection::SelfDrop,
            },
            None => ReleaseOutcome::Cancelled {
                modality,
                dragged: session.dragged,
                origin_index: session.origin_index,
                reason: GestureRejection::NoTarget,
            },
        };
        Ok(outcome)
    }

    /// Explicit cancel. Honoured whatever modality owns the session.
    pub fn cancel(&mut self) -> Option<DragSession> {
        match std::mem::take(&mut self.state) {
            DragState::Idle => None,
            DragState::Dragging(session) => Some(session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: ChannelId = ChannelId(1);
    const B: ChannelId = ChannelId(2);
    const C: ChannelId = ChannelId(3);

    #[test]
    fn pick_hover_release_drops() {
        let mut machine = DragMachine::new();
        machine.pick_up(Modality::Pointer, A, 0).unwrap();
        assert!(machine.hover(Modality::Pointer, Some(C)).unwrap());
        let outcome = machine.release(Modality::Pointer).unwrap();
        assert_eq!(
            outcome,
            ReleaseOutcome::Drop {
                modality: Modality::Pointer,
                dragged: A,
                origin_index: 0,
                target: C
            }
        );
        assert_eq!(machine.state(), &DragState::Idle);
    }

    #[test]
    fn foreign_hover_never_changes_target() {
        for owner in [Modality::Pointer, Modality::SimulatedMouse, Modality::Keyboard] {
            for other in [Modality::Pointer, Modality::SimulatedMouse, Modality::Keyboard] {
                if owner == other {
                    continue;
                }
                let mut machine = DragMachine::new();
                machine.pick_up(owner, A, 0).unwrap();
                machine.hover(owner, Some(B)).unwrap();
                assert_eq!(machine.hover(other, Some(C)), Err(GestureRejection::ForeignModality));
                assert_eq!(machine.session().unwrap().target, Some(B));
                assert_eq!(machine.release(other), Err(GestureRejection::ForeignModality));
                assert!(machine.is_dragging());
            }
        }
    }

    #[test]
    fn second_pick_up_is_rejected() {
        let mut machine = DragMachine::new();
        machine.pick_up(Modality::Keyboard, A, 0).unwrap();
        assert_eq!(
            machine.pick_up(Modality::Pointer, B, 1).unwrap_err(),
            GestureRejection::SessionActive
        );
        assert_eq!(machine.session().unwrap().picked_up, Some(A));
    }

    #[test]
    fn release_without_target_cancels() {
        let mut machine = DragMachine::new();
        machine.pick_up(Modality::SimulatedMouse, A, 0).unwrap();
        machine.hover(Modality::SimulatedMouse, Some(B)).unwrap();
        machine.hover(Modality::SimulatedMouse, None).unwrap();
        match machine.release(Modality::SimulatedMouse).unwrap() {
            ReleaseOutcome::Cancelled { reason, .. } => assert_eq!(reason, GestureRejection::NoTarget),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!machine.is_dragging());
    }

    #[test]
    fn release_on_self_cancels() {
        let mut machine = DragMachine::new();
        machine.pick_up(Modality::Pointer, A, 0).unwrap();
        machine.hover(Modality::Pointer, Some(A)).unwrap();
        match machine.release(Modality::Pointer).unwrap() {
            ReleaseOutcome::Cancelled { reason, .. } => assert_eq!(reason, GestureRejection::SelfDrop),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn cancel_works_for_any_owner() {
        let mut machine = DragMachine::new();
        machine.pick_up(Modality::Pointer, A, 4).unwrap();
        let session = machine.cancel().unwrap();
        assert_eq!(session.origin_index, 4);
        assert!(machine.cancel().is_none());
    }

    #[test]
    fn signals_without_session_are_rejected() {
        let mut machine = DragMachine::new();
        assert_eq!(machine.hover(Modality::Pointer, Some(A)), Err(GestureRejection::NoSession));
        assert_eq!(machine.release(Modality::Keyboard), Err(GestureRejection::NoSession));
    }
}
