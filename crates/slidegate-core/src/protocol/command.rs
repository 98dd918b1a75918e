//! CommandProtocol: the message-level state machine of a session.
//!
//! The protocol owns the control registry, the single pending-challenge slot,
//! the crypto panel and the visible surface state.  It never touches a
//! socket: every operation that wants to talk to the controller returns an
//! [`OutboundFrame`] which the caller hands to the transport.
//!
//! # Two-phase flow
//!
//! ```text
//! Client                                   Controller
//! ──────                                   ──────────
//! slider released armed on "d1"
//!   pending = d1
//!   {"type":"fetch","door":"d1"}  ───────▶
//!                                 ◀───────  {"type":"challenge","challenge":"c1"}
//! solver.solve_challenge(c1) → r1
//!   pending = none
//!   {"type":"solve","door":"d1","code":"r1"} ─▶
//! ```
//!
//! # Pending-challenge policy
//!
//! - Only one request waits for a challenge at a time.  A new `fetch` while
//!   another is pending **supersedes** it: the slot is overwritten and the
//!   next challenge is answered for the newer control.
//! - A challenge with nothing pending is ignored.
//! - A failed solve **clears** the slot; the user has to drag again.
//! - A transport close clears the slot before the surface goes offline, so a
//!   late challenge can never produce a `solve` on the next connection.

use tracing::{debug, info, warn};

use super::messages::{ClientMessage, DoorEntry, OutboundFrame, ServerMessage};
use super::solver::{ChallengeSolver, CryptoPanel};
use super::ProtocolError;
use crate::domain::control::{Control, ControlId};
use crate::domain::gesture::TrackGeometry;
use crate::domain::registry::{ConfirmedCommand, ControlRegistry};
use crate::domain::surface::{CryptoStatus, Surface};

/// Deployment profile: how a confirmed gesture reaches the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolProfile {
    /// Send the raw control id; no challenge phase.
    Direct,
    /// `fetch`, then answer the controller's challenge with `solve`.
    #[default]
    ChallengeResponse,
}

/// The one request currently waiting for a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChallenge {
    pub control_id: ControlId,
}

/// Message-level state machine.  See the module docs for the flow.
pub struct CommandProtocol {
    profile: ProtocolProfile,
    registry: ControlRegistry,
    pending: Option<PendingChallenge>,
    panel: CryptoPanel,
    surface: Surface,
    online: bool,
    solver: Box<dyn ChallengeSolver>,
}

impl CommandProtocol {
    pub fn new(profile: ProtocolProfile, solver: Box<dyn ChallengeSolver>) -> Self {
        Self {
            profile,
            registry: ControlRegistry::new(),
            pending: None,
            panel: CryptoPanel::default(),
            surface: Surface::default(),
            online: false,
            solver,
        }
    }

    pub fn profile(&self) -> ProtocolProfile {
        self.profile
    }

    pub fn registry(&self) -> &ControlRegistry {
        &self.registry
    }

    pub fn pending(&self) -> Option<&PendingChallenge> {
        self.pending.as_ref()
    }

    pub fn panel(&self) -> &CryptoPanel {
        &self.panel
    }

    pub fn public_key(&self) -> Option<&str> {
        self.panel.public_key.as_deref()
    }

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    // ── Transport lifecycle ───────────────────────────────────────────────────

    /// The transport reached the open state.
    pub fn on_transport_opened(&mut self) {
        self.online = true;
        self.surface.offline = false;
    }

    /// The transport closed or failed.
    ///
    /// The pending challenge is discarded first: it cannot be answered on a
    /// connection that no longer exists.
    pub fn on_transport_closed(&mut self) {
        if let Some(stale) = self.pending.take() {
            info!(
                "connection lost; discarding pending challenge for {}",
                stale.control_id
            );
        }
        self.online = false;
        self.surface.offline = true;
    }

    // ── Inbound ───────────────────────────────────────────────────────────────

    /// Parses and handles one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Parse`] for malformed frames.  The protocol
    /// state is unchanged in that case.
    pub fn handle_frame(&mut self, text: &str) -> Result<Option<OutboundFrame>, ProtocolError> {
        let msg = ServerMessage::parse(text)?;
        self.handle_message(msg)
    }

    /// Handles one decoded controller message.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if the reply cannot be serialized.
    pub fn handle_message(
        &mut self,
        msg: ServerMessage,
    ) -> Result<Option<OutboundFrame>, ProtocolError> {
        debug!("controller → client: {}", msg.kind());
        match msg {
            ServerMessage::Config { public_key, doors } => {
                self.apply_config(public_key, doors);
                Ok(None)
            }
            ServerMessage::Challenge { challenge } => self.answer_challenge(challenge),
            ServerMessage::Unknown => Ok(None),
        }
    }

    fn apply_config(&mut self, public_key: Option<String>, doors: Vec<DoorEntry>) {
        info!(
            "config received: {} controls, public key {}",
            doors.len(),
            if public_key.is_some() { "present" } else { "absent" }
        );
        self.panel.public_key = public_key;
        self.registry.replace_all(doors.into_iter().map(Control::from));
        self.surface.offline = false;
    }

    fn answer_challenge(&mut self, challenge: String) -> Result<Option<OutboundFrame>, ProtocolError> {
        let Some(pending) = self.pending.take() else {
            debug!("ignoring challenge: no request is waiting for one");
            return Ok(None);
        };

        self.panel.challenge = challenge;
        self.panel.response.clear();

        if !self.solver.solve_challenge(&mut self.panel) {
            warn!(
                "failed to solve challenge for {}; drag the control again to retry",
                pending.control_id
            );
            return Ok(None);
        }

        let frame = ClientMessage::Solve {
            door: pending.control_id,
            code: self.panel.response.clone(),
        }
        .encode()?;
        Ok(Some(frame))
    }

    // ── Outbound ──────────────────────────────────────────────────────────────

    /// Turns a confirmed gesture into the frame for the current profile.
    ///
    /// In the challenge-response profile the request becomes the pending
    /// challenge, replacing any earlier one.  While offline the frame is
    /// still produced (the transport drops it) but nothing is recorded as
    /// pending, since no challenge can come back for a frame that was never
    /// delivered.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if the frame cannot be serialized.
    pub fn dispatch(&mut self, command: ConfirmedCommand) -> Result<OutboundFrame, ProtocolError> {
        let id = command.control_id;
        match self.profile {
            ProtocolProfile::Direct => {
                info!("sending command {id}");
                Ok(OutboundFrame::direct(&id))
            }
            ProtocolProfile::ChallengeResponse => {
                let frame = ClientMessage::Fetch { door: id.clone() }.encode()?;
                if !self.online {
                    debug!("offline; fetch for {id} will be dropped");
                    return Ok(frame);
                }
                if let Some(previous) = self.pending.replace(PendingChallenge {
                    control_id: id.clone(),
                }) {
                    debug!("fetch for {id} supersedes pending request for {}", previous.control_id);
                }
                info!("requesting challenge for {id}");
                Ok(frame)
            }
        }
    }

    // ── Pointer routing ───────────────────────────────────────────────────────

    pub fn drag_start(&mut self, id: &ControlId, origin: f64) {
        self.registry.drag_start(id, origin);
    }

    pub fn drag_move(&mut self, id: &ControlId, current: f64, geometry: TrackGeometry) {
        self.registry.drag_move(id, current, geometry);
    }

    /// Ends a drag, dispatching the command when the slider was armed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Encode`] if the frame cannot be serialized.
    pub fn drag_end(&mut self, id: &ControlId) -> Result<Option<OutboundFrame>, ProtocolError> {
        match self.registry.drag_end(id) {
            Some(confirmed) => self.dispatch(confirmed).map(Some),
            None => Ok(None),
        }
    }

    // ── Surface ───────────────────────────────────────────────────────────────

    /// Validates new key material (e.g. a changed URL fragment).
    pub fn validate_key(&mut self, key_material: &str) -> bool {
        self.panel.key_material = key_material.to_string();
        let ok = self.solver.validate_key(key_material);
        self.surface.crypto_status = if ok {
            CryptoStatus::Ok
        } else {
            CryptoStatus::MissingKey
        };
        info!("{}", self.surface.crypto_status);
        ok
    }

    pub fn toggle_panel(&mut self) {
        self.surface.toggle_panel();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::solver::MockChallengeSolver;

    const CONFIG_D1: &str =
        r#"{"type":"config","publicKey":"pk","doors":[{"id":"d1","label":"Front"}]}"#;
    const CONFIG_D1_D2: &str = r#"{"type":"config","publicKey":"pk","doors":[{"id":"d1","label":"Front"},{"id":"d2","label":"Garage"}]}"#;

    fn geometry() -> TrackGeometry {
        TrackGeometry::new(300.0, 60.0)
    }

    /// A solver that answers every challenge with `r-<challenge>`.
    fn echo_solver() -> MockChallengeSolver {
        let mut solver = MockChallengeSolver::new();
        solver.expect_validate_key().returning(|_| true);
        solver.expect_solve_challenge().returning(|panel| {
            panel.response = format!("r-{}", panel.challenge);
            true
        });
        solver
    }

    fn online_protocol(solver: MockChallengeSolver, config: &str) -> CommandProtocol {
        let mut proto = CommandProtocol::new(ProtocolProfile::ChallengeResponse, Box::new(solver));
        proto.on_transport_opened();
        proto.handle_frame(config).unwrap();
        proto
    }

    fn slide(proto: &mut CommandProtocol, id: &str) -> Option<OutboundFrame> {
        let id = ControlId::new(id);
        proto.drag_start(&id, 0.0);
        proto.drag_move(&id, 240.0, geometry());
        proto.drag_end(&id).unwrap()
    }

    // ── Config ────────────────────────────────────────────────────────────────

    #[test]
    fn test_config_replaces_registry_and_public_key() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1_D2);

        // Act
        proto
            .handle_frame(r#"{"type":"config","publicKey":"pk2","doors":[{"id":"d9","label":"Shed"}]}"#)
            .unwrap();

        // Assert
        let labels: Vec<&str> = proto.registry().controls().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Shed"]);
        assert_eq!(proto.public_key(), Some("pk2"));
    }

    #[test]
    fn test_config_clears_offline_marker() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        proto.on_transport_closed();
        assert!(proto.surface().offline);

        // Act
        proto.handle_frame(CONFIG_D1).unwrap();

        // Assert
        assert!(!proto.surface().offline);
    }

    #[test]
    fn test_unknown_type_changes_nothing() {
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);

        let out = proto.handle_frame(r#"{"type":"weather","sunny":true}"#).unwrap();

        assert_eq!(out, None);
        assert_eq!(proto.registry().len(), 1);
    }

    #[test]
    fn test_malformed_frame_is_an_error_and_keeps_state() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        slide(&mut proto, "d1");

        // Act
        let result = proto.handle_frame("{\"type\":");

        // Assert
        assert!(matches!(result, Err(ProtocolError::Parse(_))));
        assert_eq!(proto.registry().len(), 1);
        assert!(proto.pending().is_some());
    }

    // ── Fetch / challenge / solve ────────────────────────────────────────────

    #[test]
    fn test_confirmed_gesture_sends_fetch_and_sets_pending() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);

        // Act
        let frame = slide(&mut proto, "d1").unwrap();

        // Assert
        assert_eq!(frame.as_str(), r#"{"type":"fetch","door":"d1"}"#);
        assert_eq!(
            proto.pending(),
            Some(&PendingChallenge {
                control_id: ControlId::new("d1")
            })
        );
    }

    #[test]
    fn test_cancelled_gesture_sends_nothing() {
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        let id = ControlId::new("d1");

        proto.drag_start(&id, 0.0);
        proto.drag_move(&id, 100.0, geometry());
        let out = proto.drag_end(&id).unwrap();

        assert_eq!(out, None);
        assert!(proto.pending().is_none());
    }

    #[test]
    fn test_challenge_is_answered_with_solve_and_clears_pending() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        slide(&mut proto, "d1");

        // Act
        let out = proto
            .handle_frame(r#"{"type":"challenge","challenge":"c1"}"#)
            .unwrap()
            .unwrap();

        // Assert
        assert_eq!(out.as_str(), r#"{"type":"solve","door":"d1","code":"r-c1"}"#);
        assert!(proto.pending().is_none());
        assert_eq!(proto.panel().challenge, "c1");
        assert_eq!(proto.panel().response, "r-c1");
    }

    #[test]
    fn test_challenge_without_pending_request_never_reaches_solver() {
        // Arrange – the solver must not be asked at all
        let mut solver = MockChallengeSolver::new();
        solver.expect_solve_challenge().times(0);
        let mut proto = online_protocol(solver, CONFIG_D1);

        // Act
        let out = proto
            .handle_frame(r#"{"type":"challenge","challenge":"stray"}"#)
            .unwrap();

        // Assert
        assert_eq!(out, None);
        assert!(proto.panel().challenge.is_empty());
    }

    #[test]
    fn test_second_challenge_after_solve_is_ignored() {
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        slide(&mut proto, "d1");
        proto
            .handle_frame(r#"{"type":"challenge","challenge":"c1"}"#)
            .unwrap();

        let out = proto
            .handle_frame(r#"{"type":"challenge","challenge":"c2"}"#)
            .unwrap();

        assert_eq!(out, None);
    }

    #[test]
    fn test_second_fetch_supersedes_pending_request() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1_D2);
        slide(&mut proto, "d1");

        // Act
        let frame = slide(&mut proto, "d2").unwrap();
        let answer = proto
            .handle_frame(r#"{"type":"challenge","challenge":"c7"}"#)
            .unwrap()
            .unwrap();

        // Assert – one slot, now owned by d2
        assert_eq!(frame.as_str(), r#"{"type":"fetch","door":"d2"}"#);
        assert_eq!(answer.as_str(), r#"{"type":"solve","door":"d2","code":"r-c7"}"#);
        assert!(proto.pending().is_none());
    }

    #[test]
    fn test_failed_solve_clears_pending_and_sends_nothing() {
        // Arrange
        let mut solver = MockChallengeSolver::new();
        solver.expect_solve_challenge().times(1).returning(|_| false);
        let mut proto = online_protocol(solver, CONFIG_D1);
        slide(&mut proto, "d1");

        // Act
        let out = proto
            .handle_frame(r#"{"type":"challenge","challenge":"c1"}"#)
            .unwrap();
        let retry = proto
            .handle_frame(r#"{"type":"challenge","challenge":"c1"}"#)
            .unwrap();

        // Assert – no solve, and the repeated challenge is no longer accepted
        assert_eq!(out, None);
        assert_eq!(retry, None);
        assert!(proto.pending().is_none());
    }

    #[test]
    fn test_transport_close_clears_pending_and_late_challenge_is_ignored() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        slide(&mut proto, "d1");

        // Act
        proto.on_transport_closed();
        let late = proto
            .handle_frame(r#"{"type":"challenge","challenge":"c1"}"#)
            .unwrap();

        // Assert
        assert!(proto.pending().is_none());
        assert!(proto.surface().offline);
        assert_eq!(late, None);
    }

    #[test]
    fn test_fetch_while_offline_is_not_recorded_as_pending() {
        // Arrange
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        proto.on_transport_closed();

        // Act
        let frame = slide(&mut proto, "d1");

        // Assert – the frame exists (the transport drops it) but nothing waits
        assert!(frame.is_some());
        assert!(proto.pending().is_none());
    }

    // ── Direct profile ────────────────────────────────────────────────────────

    #[test]
    fn test_direct_profile_sends_raw_id_without_pending() {
        // Arrange
        let mut proto = CommandProtocol::new(ProtocolProfile::Direct, Box::new(echo_solver()));
        proto.on_transport_opened();
        proto.handle_frame(r#"[{"id":"home","label":"Home"}]"#).unwrap();

        // Act
        let frame = slide(&mut proto, "home").unwrap();

        // Assert
        assert_eq!(frame.as_str(), "home");
        assert!(proto.pending().is_none());
    }

    #[test]
    fn test_direct_profile_ignores_challenges() {
        let mut solver = MockChallengeSolver::new();
        solver.expect_solve_challenge().times(0);
        let mut proto = CommandProtocol::new(ProtocolProfile::Direct, Box::new(solver));
        proto.on_transport_opened();
        proto.handle_frame(CONFIG_D1).unwrap();
        slide(&mut proto, "d1");

        let out = proto
            .handle_frame(r#"{"type":"challenge","challenge":"c1"}"#)
            .unwrap();

        assert_eq!(out, None);
    }

    // ── Surface ───────────────────────────────────────────────────────────────

    #[test]
    fn test_validate_key_updates_crypto_status() {
        // Arrange
        let mut solver = MockChallengeSolver::new();
        solver
            .expect_validate_key()
            .returning(|key| key == "good");
        let mut proto = CommandProtocol::new(ProtocolProfile::ChallengeResponse, Box::new(solver));
        assert_eq!(proto.surface().crypto_status, CryptoStatus::Starting);

        // Act / Assert
        assert!(!proto.validate_key("bad"));
        assert_eq!(proto.surface().crypto_status, CryptoStatus::MissingKey);
        assert!(proto.validate_key("good"));
        assert_eq!(proto.surface().crypto_status, CryptoStatus::Ok);
        assert_eq!(proto.panel().key_material, "good");
    }

    #[test]
    fn test_transport_open_clears_offline_marker() {
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);
        proto.on_transport_closed();

        proto.on_transport_opened();

        assert!(!proto.surface().offline);
        assert!(proto.is_online());
    }

    #[test]
    fn test_toggle_panel_hides_controls() {
        let mut proto = online_protocol(echo_solver(), CONFIG_D1);

        proto.toggle_panel();

        assert!(!proto.surface().controls_visible());
    }
}
