//! Session use case: the single event loop of the client.
//!
//! # Event loop (for beginners)
//!
//! Everything happens on one task.  Each turn of the loop waits for
//! whichever comes first:
//!
//! - a **transport event** (`Opened`, `Closed`, or an inbound text frame),
//!   which is fed to the [`CommandProtocol`];
//! - a **UI event** (pointer down/move/up on a control, a new key, a panel
//!   toggle), which is routed to the protocol as well.
//!
//! Whatever frames the protocol produces are queued on the transport and
//! flushed before the next turn, then the surface is redrawn if anything
//! visible changed.  Because no two handlers ever run concurrently, the
//! pending-challenge slot and the registry need no locking.
//!
//! The transport close is always handled before any late frame: the socket
//! is gone by the time `Closed` is delivered, so no frame can follow it.

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use slidegate_core::{CommandProtocol, ControlId, OutboundFrame, TrackGeometry};

use crate::infrastructure::transport::{
    ConnectionState, Connector, SessionTransport, TransportEvent,
};

/// Number of pointer moves a [`UiEvent::Slide`] is expanded into.
const SLIDE_STEPS: u32 = 10;

/// Input from whatever front end drives the session.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    PointerDown { control: ControlId, x: f64 },
    PointerMove { control: ControlId, x: f64 },
    PointerUp { control: ControlId },
    /// Drag `control` from the start of its track to `fraction` of its
    /// travel and release.
    Slide { control: ControlId, fraction: f64 },
    /// New key material (the URL fragment changed).
    KeyChanged(String),
    TogglePanel,
    /// Live layout measurements changed.
    Resize(TrackGeometry),
    Redraw,
    Help,
    Quit,
}

/// Everything a renderer needs to draw the surface.
pub struct SessionView<'a> {
    pub protocol: &'a CommandProtocol,
    pub state: ConnectionState,
    pub geometry: TrackGeometry,
}

/// Draws the session surface.
pub trait SurfaceRenderer {
    fn render(&mut self, view: &SessionView<'_>) -> std::io::Result<()>;

    fn help(&mut self) -> std::io::Result<()>;
}

impl<R: SurfaceRenderer + ?Sized> SurfaceRenderer for &mut R {
    fn render(&mut self, view: &SessionView<'_>) -> std::io::Result<()> {
        (**self).render(view)
    }

    fn help(&mut self) -> std::io::Result<()> {
        (**self).help()
    }
}

enum Step {
    Transport(TransportEvent),
    Ui(Option<UiEvent>),
}

/// One client session: transport, protocol and the current track layout.
pub struct Session<C: Connector> {
    transport: SessionTransport<C>,
    protocol: CommandProtocol,
    geometry: TrackGeometry,
}

impl<C: Connector> Session<C> {
    pub fn new(
        transport: SessionTransport<C>,
        protocol: CommandProtocol,
        geometry: TrackGeometry,
    ) -> Self {
        Self {
            transport,
            protocol,
            geometry,
        }
    }

    pub fn protocol(&self) -> &CommandProtocol {
        &self.protocol
    }

    pub fn transport(&self) -> &SessionTransport<C> {
        &self.transport
    }

    pub fn geometry(&self) -> TrackGeometry {
        self.geometry
    }

    pub fn view(&self) -> SessionView<'_> {
        SessionView {
            protocol: &self.protocol,
            state: self.transport.state(),
            geometry: self.geometry,
        }
    }

    // ── Event handling ────────────────────────────────────────────────────────

    /// Feeds one transport event into the protocol.
    ///
    /// Returns `true` when the surface needs to be redrawn.
    pub fn on_transport_event(&mut self, event: TransportEvent) -> bool {
        match event {
            TransportEvent::Opened => {
                self.protocol.on_transport_opened();
                true
            }
            TransportEvent::Closed => {
                self.protocol.on_transport_closed();
                true
            }
            TransportEvent::MessageReceived(text) => match self.protocol.handle_frame(&text) {
                Ok(Some(frame)) => {
                    self.send(frame);
                    true
                }
                Ok(None) => true,
                Err(e) => {
                    warn!("dropping inbound frame: {e}");
                    false
                }
            },
        }
    }

    /// Routes one UI event.
    ///
    /// Returns `true` when the surface needs to be redrawn.  `Help` and
    /// `Quit` are handled by [`step`](Self::step) and ignored here.
    pub fn on_ui_event(&mut self, event: UiEvent) -> bool {
        match event {
            UiEvent::PointerDown { control, x } => {
                self.protocol.drag_start(&control, x);
                true
            }
            UiEvent::PointerMove { control, x } => {
                self.protocol.drag_move(&control, x, self.geometry);
                true
            }
            UiEvent::PointerUp { control } => {
                self.release(&control);
                true
            }
            UiEvent::Slide { control, fraction } => {
                self.slide(&control, fraction);
                true
            }
            UiEvent::KeyChanged(material) => {
                self.protocol.validate_key(&material);
                true
            }
            UiEvent::TogglePanel => {
                self.protocol.toggle_panel();
                true
            }
            UiEvent::Resize(geometry) => {
                self.geometry = geometry;
                true
            }
            UiEvent::Redraw => true,
            UiEvent::Help | UiEvent::Quit => false,
        }
    }

    fn release(&mut self, control: &ControlId) {
        match self.protocol.drag_end(control) {
            Ok(Some(frame)) => self.send(frame),
            Ok(None) => {}
            Err(e) => error!("failed to encode command for {control}: {e}"),
        }
    }

    fn slide(&mut self, control: &ControlId, fraction: f64) {
        let target = fraction.clamp(0.0, 1.0) * self.geometry.travel();
        self.protocol.drag_start(control, 0.0);
        for step in 1..=SLIDE_STEPS {
            let x = target * f64::from(step) / f64::from(SLIDE_STEPS);
            self.protocol.drag_move(control, x, self.geometry);
        }
        self.release(control);
    }

    fn send(&mut self, frame: OutboundFrame) {
        self.transport.send(frame.into_string());
    }

    /// Writes queued frames; a failed write is handled as a close.
    ///
    /// Returns `true` when that close changed the surface.
    pub async fn flush(&mut self) -> bool {
        match self.transport.flush().await {
            Some(event) => self.on_transport_event(event),
            None => false,
        }
    }

    /// Waits for the next transport or UI event, handles it and redraws
    /// the surface if anything visible changed.
    ///
    /// Returns `false` once the UI channel closes or sends `Quit`.
    pub async fn step<R: SurfaceRenderer>(
        &mut self,
        ui: &mut mpsc::Receiver<UiEvent>,
        renderer: &mut R,
    ) -> bool {
        let step = tokio::select! {
            event = self.transport.next_event() => Step::Transport(event),
            input = ui.recv() => Step::Ui(input),
        };
        let redraw = match step {
            Step::Transport(event) => self.on_transport_event(event),
            Step::Ui(None | Some(UiEvent::Quit)) => return false,
            Step::Ui(Some(UiEvent::Help)) => {
                if let Err(e) = renderer.help() {
                    warn!("failed to write help: {e}");
                }
                false
            }
            Step::Ui(Some(event)) => self.on_ui_event(event),
        };
        if self.flush().await || redraw {
            draw(renderer, &self.view());
        }
        true
    }

    /// Runs the session until the UI channel closes or sends `Quit`.
    pub async fn run<R: SurfaceRenderer>(mut self, mut ui: mpsc::Receiver<UiEvent>, mut renderer: R) {
        info!("session started for {}", self.transport.url());
        draw(&mut renderer, &self.view());
        while self.step(&mut ui, &mut renderer).await {}
        info!("session ended");
    }
}

fn draw<R: SurfaceRenderer>(renderer: &mut R, view: &SessionView<'_>) {
    if let Err(e) = renderer.render(view) {
        warn!("failed to draw surface: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
