//! The ordered set of controls currently offered to the user.
//!
//! The controller pushes its full control list on every config message; the
//! registry never patches individual entries.  Each registered control owns
//! its own [`GestureConfirmer`], so a drag on one slider can never leak into
//! another.

use std::collections::HashSet;

use tracing::debug;

use super::control::{Control, ControlId};
use super::gesture::{GestureConfirmer, SliderView, TrackGeometry};

/// Emitted when a drag on a control ends armed.
///
/// This is the only event the registry produces; the command protocol turns
/// it into an outgoing frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedCommand {
    pub control_id: ControlId,
}

#[derive(Debug, Clone)]
struct Slot {
    control: Control,
    confirmer: GestureConfirmer,
}

/// Ordered controls, each paired with its own confirmer.
#[derive(Debug, Default)]
pub struct ControlRegistry {
    slots: Vec<Slot>,
}

impl ControlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every control in one step.
    ///
    /// The new slot list is built completely before it is swapped in, so a
    /// caller never observes a half-populated registry.  All previous
    /// confirmers, including any mid-drag state, are dropped.
    ///
    /// Ids are unique: when the list repeats an id, the first entry wins and
    /// later ones are skipped.
    pub fn replace_all<I>(&mut self, controls: I)
    where
        I: IntoIterator<Item = Control>,
    {
        let mut seen = HashSet::new();
        let slots: Vec<Slot> = controls
            .into_iter()
            .filter(|control| {
                let fresh = seen.insert(control.id.clone());
                if !fresh {
                    debug!("skipping duplicate control {}", control.id);
                }
                fresh
            })
            .map(|control| Slot {
                confirmer: GestureConfirmer::new(control.id.clone()),
                control,
            })
            .collect();

        debug!(
            "control registry replaced: {} -> {} controls",
            self.slots.len(),
            slots.len()
        );
        self.slots = slots;
    }

    /// Controls in display order.
    pub fn controls(&self) -> impl Iterator<Item = &Control> {
        self.slots.iter().map(|slot| &slot.control)
    }

    pub fn get(&self, id: &ControlId) -> Option<&Control> {
        self.slot(id).map(|slot| &slot.control)
    }

    pub fn confirmer(&self, id: &ControlId) -> Option<&GestureConfirmer> {
        self.slot(id).map(|slot| &slot.confirmer)
    }

    pub fn contains(&self, id: &ControlId) -> bool {
        self.slot(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Render models for every control, in display order.
    pub fn views(&self) -> Vec<(&Control, SliderView)> {
        self.slots
            .iter()
            .map(|slot| (&slot.control, slot.confirmer.view()))
            .collect()
    }

    /// Routes a pointer-down to the control's confirmer.
    pub fn drag_start(&mut self, id: &ControlId, origin: f64) {
        match self.slot_mut(id) {
            Some(slot) => slot.confirmer.on_drag_start(origin),
            None => debug!("drag start on unknown control {id}"),
        }
    }

    /// Routes a pointer-move to the control's confirmer.
    pub fn drag_move(&mut self, id: &ControlId, current: f64, geometry: TrackGeometry) {
        match self.slot_mut(id) {
            Some(slot) => slot.confirmer.on_drag_move(current, geometry),
            None => debug!("drag move on unknown control {id}"),
        }
    }

    /// Routes a pointer-up and reports the confirmation, if any.
    pub fn drag_end(&mut self, id: &ControlId) -> Option<ConfirmedCommand> {
        let Some(slot) = self.slot_mut(id) else {
            debug!("drag end on unknown control {id}");
            return None;
        };
        slot.confirmer
            .on_drag_end()
            .map(|control_id| ConfirmedCommand { control_id })
    }

    fn slot(&self, id: &ControlId) -> Option<&Slot> {
        self.slots.iter().find(|slot| &slot.control.id == id)
    }

    fn slot_mut(&mut self, id: &ControlId) -> Option<&mut Slot> {
        self.slots.iter_mut().find(|slot| &slot.control.id == id)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
