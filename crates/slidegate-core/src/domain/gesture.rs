//! Per-control drag gesture state machine.
//!
//! A [`GestureConfirmer`] converts a continuous one-dimensional drag into a
//! binary decision: released past the arming threshold means *confirmed*,
//! released anywhere else means *cancelled*.
//!
//! # States
//!
//! ```text
//!            drag start + forward move (progress <= 0.9)
//!   Idle ───────────────────────────────────────────────▶ Tracking
//!    ▲                                                     │    ▲
//!    │ drag end (confirm iff Armed)       progress > 0.9   ▼    │ progress <= 0.9
//!    └──────────────────────────────────────────────────── Armed
//! ```
//!
//! Backward or zero moves are ignored entirely: they never disarm a thumb
//! that already crossed the threshold and never pull it back.
//!
//! # Live geometry
//!
//! The track and thumb lengths are passed in on every move rather than
//! captured at drag start, so resizing the surface mid-drag moves the
//! effective threshold.  That is accepted behaviour.

use super::control::ControlId;

/// Progress ratio above which a release confirms the command.
pub const ARM_THRESHOLD: f64 = 0.9;

/// Caption shown on the thumb while it can still be released without effect.
pub const CAPTION_DRAG: &str = ">>";

/// Caption shown on the thumb once releasing it will confirm.
pub const CAPTION_CONFIRM: &str = "OK";

/// Live layout measurements of a slider, in the same unit as pointer
/// coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackGeometry {
    /// Length of the whole track.
    pub track_length: f64,
    /// Length of the draggable thumb.
    pub thumb_length: f64,
}

impl TrackGeometry {
    pub fn new(track_length: f64, thumb_length: f64) -> Self {
        Self {
            track_length,
            thumb_length,
        }
    }

    /// Distance the thumb can travel before it hits the end of the track.
    pub fn travel(&self) -> f64 {
        self.track_length - self.thumb_length
    }

    /// Maps a forward delta onto `[0, 1]`.
    ///
    /// A track with no room to travel reports zero progress so that a
    /// degenerate layout can never arm a control.
    pub fn progress(&self, delta: f64) -> f64 {
        let travel = self.travel();
        if travel <= 0.0 {
            return 0.0;
        }
        (delta / travel).clamp(0.0, 1.0)
    }
}

impl Default for TrackGeometry {
    fn default() -> Self {
        Self::new(300.0, 60.0)
    }
}

/// Where the confirmer currently is in its drag cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GesturePhase {
    /// No forward movement since the last release.
    Idle,
    /// Dragging forward, below the arming threshold.
    Tracking,
    /// Dragged past the threshold; releasing now confirms.
    Armed,
}

/// Render model of a slider thumb.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliderView {
    /// Thumb offset from the start of the track.
    pub offset: f64,
    pub caption: &'static str,
    pub phase: GesturePhase,
}

/// Drag state owned by exactly one control.
#[derive(Debug, Clone)]
pub struct GestureConfirmer {
    control_id: ControlId,
    drag_origin: Option<f64>,
    current_offset: f64,
    phase: GesturePhase,
}

impl GestureConfirmer {
    pub fn new(control_id: ControlId) -> Self {
        Self {
            control_id,
            drag_origin: None,
            current_offset: 0.0,
            phase: GesturePhase::Idle,
        }
    }

    pub fn control_id(&self) -> &ControlId {
        &self.control_id
    }

    pub fn phase(&self) -> GesturePhase {
        self.phase
    }

    pub fn is_armed(&self) -> bool {
        self.phase == GesturePhase::Armed
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// Records where the pointer went down.
    pub fn on_drag_start(&mut self, origin: f64) {
        self.drag_origin = Some(origin);
    }

    /// Tracks a pointer move.
    ///
    /// Ignored when no drag is in progress or when the pointer is not ahead
    /// of the origin.
    pub fn on_drag_move(&mut self, current: f64, geometry: TrackGeometry) {
        let Some(origin) = self.drag_origin else {
            return;
        };

        let delta = current - origin;
        if delta.is_nan() || delta <= 0.0 {
            return;
        }

        if geometry.progress(delta) > ARM_THRESHOLD {
            self.current_offset = geometry.travel();
            self.phase = GesturePhase::Armed;
        } else {
            self.current_offset = delta;
            self.phase = GesturePhase::Tracking;
        }
    }

    /// Ends the drag.
    ///
    /// Returns the control id when the thumb was armed, which is the one and
    /// only confirmation this drag produces.  The thumb always snaps back.
    pub fn on_drag_end(&mut self) -> Option<ControlId> {
        let confirmed = self.is_armed().then(|| self.control_id.clone());
        self.drag_origin = None;
        self.current_offset = 0.0;
        self.phase = GesturePhase::Idle;
        confirmed
    }

    pub fn view(&self) -> SliderView {
        SliderView {
            offset: self.current_offset,
            caption: if self.is_armed() {
                CAPTION_CONFIRM
            } else {
                CAPTION_DRAG
            },
            phase: self.phase,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Track of 300 with a 60 thumb: 240 units of travel, threshold at 216.
    fn geometry() -> TrackGeometry {
        TrackGeometry::new(300.0, 60.0)
    }

    fn confirmer() -> GestureConfirmer {
        GestureConfirmer::new(ControlId::new("d1"))
    }

    #[test]
    fn test_new_confirmer_is_idle() {
        let c = confirmer();
        assert_eq!(c.phase(), GesturePhase::Idle);
        assert!(!c.is_dragging());
        assert_eq!(c.view().offset, 0.0);
        assert_eq!(c.view().caption, CAPTION_DRAG);
    }

    #[test]
    fn test_drag_start_only_records_origin() {
        // Arrange
        let mut c = confirmer();

        // Act
        c.on_drag_start(10.0);

        // Assert
        assert!(c.is_dragging());
        assert_eq!(c.phase(), GesturePhase::Idle);
        assert_eq!(c.view().offset, 0.0);
    }

    #[test]
    fn test_move_without_start_is_ignored() {
        // Arrange
        let mut c = confirmer();

        // Act
        c.on_drag_move(500.0, geometry());

        // Assert
        assert_eq!(c.phase(), GesturePhase::Idle);
        assert_eq!(c.on_drag_end(), None);
    }

    #[test]
    fn test_forward_move_below_threshold_tracks_proportionally() {
        // Arrange
        let mut c = confirmer();
        c.on_drag_start(10.0);

        // Act
        c.on_drag_move(110.0, geometry());

        // Assert
        assert_eq!(c.phase(), GesturePhase::Tracking);
        assert_eq!(c.view().offset, 100.0);
        assert_eq!(c.view().caption, CAPTION_DRAG);
    }

    #[test]
    fn test_forward_move_past_threshold_arms_at_full_travel() {
        // Arrange
        let mut c = confirmer();
        c.on_drag_start(0.0);

        // Act – 217 / 240 ≈ 0.904
        c.on_drag_move(217.0, geometry());

        // Assert
        assert_eq!(c.phase(), GesturePhase::Armed);
        assert_eq!(c.view().offset, 240.0);
        assert_eq!(c.view().caption, CAPTION_CONFIRM);
    }

    #[test]
    fn test_progress_exactly_at_threshold_does_not_arm() {
        // Arrange
        let mut c = confirmer();
        c.on_drag_start(0.0);

        // Act – 216 / 240 == 0.9 exactly
        c.on_drag_move(216.0, geometry());

        // Assert
        assert_eq!(c.phase(), GesturePhase::Tracking);
    }

    #[test]
    fn test_backward_move_does_not_disarm() {
        // Arrange
        let mut c = confirmer();
        c.on_drag_start(50.0);
        c.on_drag_move(290.0, geometry());
        assert!(c.is_armed());

        // Act – pointer returns behind the origin
        c.on_drag_move(20.0, geometry());

        // Assert
        assert!(c.is_armed());
        assert_eq!(c.view().offset, 240.0);
    }

    #[test]
    fn test_zero_delta_move_is_ignored() {
        let mut c = confirmer();
        c.on_drag_start(50.0);
        c.on_drag_move(100.0, geometry());

        c.on_drag_move(50.0, geometry());

        assert_eq!(c.view().offset, 50.0);
        assert_eq!(c.phase(), GesturePhase::Tracking);
    }

    #[test]
    fn test_forward_move_back_below_threshold_returns_to_tracking() {
        // Arrange
        let mut c = confirmer();
        c.on_drag_start(0.0);
        c.on_drag_move(230.0, geometry());
        assert!(c.is_armed());

        // Act – still ahead of the origin, but below the threshold
        c.on_drag_move(120.0, geometry());

        // Assert
        assert_eq!(c.phase(), GesturePhase::Tracking);
        assert_eq!(c.view().offset, 120.0);
    }

    #[test]
    fn test_release_while_armed_confirms_once() {
        // Arrange
        let mut c = confirmer();
        c.on_drag_start(0.0);
        c.on_drag_move(240.0, geometry());

        // Act
        let first = c.on_drag_end();
        let second = c.on_drag_end();

        // Assert
        assert_eq!(first, Some(ControlId::new("d1")));
        assert_eq!(second, None);
    }

    #[test]
    fn test_release_while_tracking_cancels_and_resets() {
        // Arrange
        let mut c = confirmer();
        c.on_drag_start(0.0);
        c.on_drag_move(100.0, geometry());

        // Act
        let confirmed = c.on_drag_end();

        // Assert
        assert_eq!(confirmed, None);
        assert_eq!(c.phase(), GesturePhase::Idle);
        assert!(!c.is_dragging());
        assert_eq!(c.view().offset, 0.0);
    }

    #[test]
    fn test_release_resets_visuals_after_confirmation() {
        let mut c = confirmer();
        c.on_drag_start(0.0);
        c.on_drag_move(300.0, geometry());

        c.on_drag_end();

        assert_eq!(c.view().offset, 0.0);
        assert_eq!(c.view().caption, CAPTION_DRAG);
    }

    #[test]
    fn test_threshold_uses_geometry_supplied_at_move_time() {
        // Arrange – 200 units is only 0.83 of the original 240 travel
        let mut c = confirmer();
        c.on_drag_start(0.0);
        c.on_drag_move(200.0, geometry());
        assert_eq!(c.phase(), GesturePhase::Tracking);

        // Act – the track shrinks mid-drag to 200 travel
        c.on_drag_move(199.0, TrackGeometry::new(260.0, 60.0));

        // Assert – 199 / 200 > 0.9 under the new layout
        assert!(c.is_armed());
    }

    #[test]
    fn test_degenerate_track_never_arms() {
        let mut c = confirmer();
        c.on_drag_start(0.0);

        c.on_drag_move(1_000.0, TrackGeometry::new(60.0, 60.0));

        assert!(!c.is_armed());
    }

    #[test]
    fn test_nan_coordinate_is_ignored() {
        let mut c = confirmer();
        c.on_drag_start(0.0);

        c.on_drag_move(f64::NAN, geometry());

        assert_eq!(c.phase(), GesturePhase::Idle);
    }

    #[test]
    fn test_armed_iff_final_forward_progress_exceeds_threshold() {
        // Every forward sequence: armed on release iff the last forward
        // progress ratio was above 0.9.
        let travel = geometry().travel();
        for step in 1..=48 {
            let target = travel * f64::from(step) / 40.0;
            let mut c = confirmer();
            c.on_drag_start(0.0);
            let mut last_progress = 0.0;
            let mut x = 0.0;
            while x < target {
                x = (x + 7.0).min(target);
                c.on_drag_move(x, geometry());
                last_progress = geometry().progress(x);
            }

            let expected = last_progress > ARM_THRESHOLD;
            assert_eq!(
                c.on_drag_end().is_some(),
                expected,
                "target {target} progress {last_progress}"
            );
        }
    }
}
