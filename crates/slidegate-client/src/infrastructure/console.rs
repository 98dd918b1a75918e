//! Text console front end.
//!
//! Reads one command per line from an async reader (stdin in production)
//! and turns it into [`UiEvent`]s; draws the surface as plain text to any
//! [`std::io::Write`].
//!
//! # Commands
//!
//! | Command                 | Effect                                         |
//! |-------------------------|------------------------------------------------|
//! | `list`                  | redraw the surface                             |
//! | `slide <id> [percent]`  | drag `<id>` to `percent` of its travel (100)   |
//! | `drag <id> <x> [x ...]` | pointer down at the first `x`, move through the rest, release |
//! | `key <material>`        | load new key material                          |
//! | `resize <track> <thumb>`| change the track measurements                  |
//! | `panel`                 | toggle the key/challenge inspection panel      |
//! | `status`                | redraw the surface                             |
//! | `help`                  | show this table                                |
//! | `quit`                  | end the session                                |

use std::io::Write;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use slidegate_core::{ControlId, SliderView, TrackGeometry};

use crate::application::session::{SessionView, SurfaceRenderer, UiEvent};
use crate::infrastructure::transport::ConnectionState;

const HELP: &str = "\
commands:
  list                     show the controls
  slide <id> [percent]     slide a control (default 100)
  drag <id> <x> [x ...]    press at the first x, move through the rest, release
  key <material>           load new key material
  resize <track> <thumb>   change the track measurements
  panel                    toggle the key/challenge panel
  status                   redraw
  help                     this text
  quit                     exit";

/// Width of a drawn slider track, in characters.
const TRACK_CELLS: usize = 20;

/// A console line that could not be turned into events.
#[derive(Debug, Error, PartialEq)]
pub enum ConsoleError {
    #[error("unknown command {0:?}")]
    UnknownCommand(String),

    #[error("{command}: missing {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("{0:?} is not a number")]
    InvalidNumber(String),
}

fn number(token: &str) -> Result<f64, ConsoleError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ConsoleError::InvalidNumber(token.to_string()))
}

fn missing(command: &'static str, what: &'static str) -> ConsoleError {
    ConsoleError::MissingArgument { command, what }
}

/// Parses one console line.
///
/// Blank lines yield no events.
///
/// # Errors
///
/// Returns a [`ConsoleError`] describing the first problem in the line.
pub fn parse_command(line: &str) -> Result<Vec<UiEvent>, ConsoleError> {
    let mut tokens = line.split_whitespace();
    let Some(command) = tokens.next() else {
        return Ok(Vec::new());
    };

    let events = match command {
        "list" | "status" => vec![UiEvent::Redraw],
        "panel" => vec![UiEvent::TogglePanel],
        "help" | "?" => vec![UiEvent::Help],
        "quit" | "exit" => vec![UiEvent::Quit],
        "key" => {
            let material = tokens.next().unwrap_or_default();
            vec![UiEvent::KeyChanged(material.to_string())]
        }
        "slide" => {
            let control = ControlId::new(tokens.next().ok_or(missing("slide", "control id"))?);
            let percent = tokens.next().map(number).transpose()?.unwrap_or(100.0);
            vec![UiEvent::Slide {
                control,
                fraction: percent / 100.0,
            }]
        }
        "drag" => {
            let control = ControlId::new(tokens.next().ok_or(missing("drag", "control id"))?);
            let xs = tokens.map(number).collect::<Result<Vec<_>, _>>()?;
            let (first, rest) = xs.split_first().ok_or(missing("drag", "coordinates"))?;

            let mut events = vec![UiEvent::PointerDown {
                control: control.clone(),
                x: *first,
            }];
            events.extend(rest.iter().map(|&x| UiEvent::PointerMove {
                control: control.clone(),
                x,
            }));
            events.push(UiEvent::PointerUp { control });
            events
        }
        "resize" => {
            let track = number(tokens.next().ok_or(missing("resize", "track length"))?)?;
            let thumb = number(tokens.next().ok_or(missing("resize", "thumb length"))?)?;
            vec![UiEvent::Resize(TrackGeometry::new(track, thumb))]
        }
        other => return Err(ConsoleError::UnknownCommand(other.to_string())),
    };
    Ok(events)
}

/// Reads commands from `input` until EOF or until the session stops
/// listening.  EOF ends the session.
pub async fn read_commands<R>(input: R, tx: mpsc::Sender<UiEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(input).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                debug!("console input closed");
                break;
            }
            Err(e) => {
                warn!("failed to read console input: {e}");
                break;
            }
        };

        match parse_command(&line) {
            Ok(events) => {
                for event in events {
                    if tx.send(event).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => warn!("{e} (type \"help\" for commands)"),
        }
    }
    let _ = tx.send(UiEvent::Quit).await;
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// Draws one slider as `[====>>      ]`.
pub fn slider_bar(view: &SliderView, geometry: TrackGeometry) -> String {
    let travel = geometry.travel();
    let fraction = if travel > 0.0 {
        (view.offset / travel).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let filled = (fraction * TRACK_CELLS as f64).round() as usize;
    format!(
        "[{}{}{}]",
        "=".repeat(filled),
        view.caption,
        " ".repeat(TRACK_CELLS - filled)
    )
}

fn connection_label(state: ConnectionState, offline: bool) -> &'static str {
    match state {
        ConnectionState::Open if !offline => "online",
        ConnectionState::Open => "online (no config)",
        ConnectionState::Connecting => "connecting",
        ConnectionState::Closed => "offline",
    }
}

/// [`SurfaceRenderer`] writing plain text.
pub struct ConsoleRenderer<W: Write> {
    out: W,
}

impl<W: Write> ConsoleRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SurfaceRenderer for ConsoleRenderer<W> {
    fn render(&mut self, view: &SessionView<'_>) -> std::io::Result<()> {
        let protocol = view.protocol;
        let surface = protocol.surface();

        writeln!(
            self.out,
            "── slidegate ── {} | {}",
            connection_label(view.state, surface.offline),
            surface.crypto_status
        )?;

        if surface.panel_visible {
            let panel = protocol.panel();
            writeln!(
                self.out,
                "  public key: {}",
                panel.public_key.as_deref().unwrap_or("-")
            )?;
            writeln!(self.out, "  key:        {}", panel.key_material)?;
            writeln!(self.out, "  challenge:  {}", panel.challenge)?;
            writeln!(self.out, "  response:   {}", panel.response)?;
        } else if surface.offline {
            writeln!(self.out, "  (controls hidden while offline)")?;
        } else {
            for (control, slider) in protocol.registry().views() {
                writeln!(
                    self.out,
                    "  {:<16} {} {}",
                    control.label,
                    slider_bar(&slider, view.geometry),
                    control.id
                )?;
            }
            if let Some(pending) = protocol.pending() {
                writeln!(self.out, "  waiting for challenge: {}", pending.control_id)?;
            }
        }
        self.out.flush()
    }

    fn help(&mut self) -> std::io::Result<()> {
        writeln!(self.out, "{HELP}")?;
        self.out.flush()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
