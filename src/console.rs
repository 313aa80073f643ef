use std::fmt::Write as _;
use std::future::Future;

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::core::metrics;
use crate::core::time::format_offset;
use crate::grading::marks::Nudge;
use crate::grading::models::{QuestionId, Session, StepId};
use crate::viewer::freehand::{PointerEvent, PointerKind, PointerOutcome, PointerSource, ScreenBox};
use crate::workspace::{FinalizeOutcome, ReviewWorkspace};

const HELP: &str = "\
commands:
  show                         session, marks and view state
  mark <q> <value>             set an atomic mark
  step <q> <step> <value>      set a step mark
  inc <q> [step] | dec <q> [step]
  zoom in|out | rotate | bright | reset
  select <q>                   select from the question list
  click <x%> <y%>              click the page
  layer regions|ink            toggle an overlay layer
  draw                         toggle drawing mode
  ink <x%> <y%> <x%> <y%> ...  drag a stroke across the page
  clear                        wipe the ink layer
  finalize | metrics | help | quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Regions,
    Ink,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Mark { question_id: QuestionId, value: f64 },
    Step { question_id: QuestionId, step_id: StepId, value: f64 },
    Nudge { question_id: QuestionId, step_id: Option<StepId>, direction: Nudge },
    ZoomIn,
    ZoomOut,
    Rotate,
    Bright,
    Reset,
    Select(QuestionId),
    Click { x: f64, y: f64 },
    Toggle(Layer),
    Draw,
    Ink(Vec<(f64, f64)>),
    Clear,
    Finalize,
    Metrics,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command `{0}`, try `help`")]
    UnknownCommand(String),
    #[error("`{command}` needs {argument}")]
    MissingArgument { command: &'static str, argument: &'static str },
    #[error("`{value}` is not a number")]
    InvalidNumber { value: String },
    #[error("`{command}` does not accept `{value}`")]
    InvalidArgument { command: &'static str, value: String },
}

fn required<'a>(
    args: &mut impl Iterator<Item = &'a str>,
    command: &'static str,
    argument: &'static str,
) -> Result<&'a str, ParseError> {
    args.next().ok_or(ParseError::MissingArgument { command, argument })
}

fn number(value: &str) -> Result<f64, ParseError> {
    value.parse::<f64>().map_err(|_| ParseError::InvalidNumber { value: value.to_string() })
}

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
    let mut args = line.split_whitespace();
    let name = args.next().ok_or(ParseError::Empty)?;

    let command = match name.to_ascii_lowercase().as_str() {
        "show" => Command::Show,
        "mark" => Command::Mark {
            question_id: required(&mut args, "mark", "a question id")?.into(),
            value: number(required(&mut args, "mark", "a value")?)?,
        },
        "step" => Command::Step {
            question_id: required(&mut args, "step", "a question id")?.into(),
            step_id: required(&mut args, "step", "a step id")?.into(),
            value: number(required(&mut args, "step", "a value")?)?,
        },
        "inc" | "dec" => {
            let direction = if name.eq_ignore_ascii_case("inc") { Nudge::Up } else { Nudge::Down };
            Command::Nudge {
                question_id: required(&mut args, "inc/dec", "a question id")?.into(),
                step_id: args.next().map(StepId::from),
                direction,
            }
        }
        "zoom" => match required(&mut args, "zoom", "`in` or `out`")? {
            "in" | "+" => Command::ZoomIn,
            "out" | "-" => Command::ZoomOut,
            other => return Err(ParseError::InvalidArgument { command: "zoom", value: other.to_string() }),
        },
        "rotate" => Command::Rotate,
        "bright" => Command::Bright,
        "reset" => Command::Reset,
        "select" => Command::Select(required(&mut args, "select", "a question id")?.into()),
        "click" => Command::Click {
            x: number(required(&mut args, "click", "x and y")?)?,
            y: number(required(&mut args, "click", "x and y")?)?,
        },
        "layer" => match required(&mut args, "layer", "`regions` or `ink`")? {
            "regions" => Command::Toggle(Layer::Regions),
            "ink" => Command::Toggle(Layer::Ink),
            other => return Err(ParseError::InvalidArgument { command: "layer", value: other.to_string() }),
        },
        "draw" => Command::Draw,
        "ink" => {
            let values = args.map(number).collect::<Result<Vec<_>, _>>()?;
            if values.len() < 2 || values.len() % 2 != 0 {
                return Err(ParseError::MissingArgument { command: "ink", argument: "x y pairs" });
            }
            Command::Ink(values.chunks(2).map(|pair| (pair[0], pair[1])).collect())
        }
        "clear" => Command::Clear,
        "finalize" | "finalise" => Command::Finalize,
        "metrics" => Command::Metrics,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::UnknownCommand(other.to_string())),
    };
    Ok(command)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Continue(String),
    Quit,
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

pub fn render_session(workspace: &ReviewWorkspace) -> String {
    let session = workspace.session();
    let summary = session.summary();
    let active = workspace.selection().active();
    let mut out = String::new();

    let _ = writeln!(
        out,
        "{} ({}) | {} | {} | {}/{} ({}%)",
        session.student_name,
        session.roll_no.as_deref().unwrap_or("-"),
        session.exam_title.as_deref().unwrap_or(&session.subject),
        session.status().as_str(),
        summary.obtained_marks,
        summary.total_marks,
        summary.percentage,
    );
    if workspace.is_offline() {
        let _ = writeln!(out, "offline: showing sample data");
    }
    if let Some(at) = session.finalized_at() {
        let _ = writeln!(out, "finalised at {}", format_offset(at));
    }
    if summary.awaiting_entry > 0 {
        let _ = writeln!(out, "{} question(s) awaiting manual entry", summary.awaiting_entry);
    }
    render_questions(&mut out, session, active.as_ref());

    let view = workspace.transform().composed();
    let _ = write!(
        out,
        "view: {} filter {} | drawing {} | ink strokes {} | pending writes {}",
        view,
        view.css_filter(),
        on_off(workspace.freehand().is_drawing()),
        workspace.freehand().stroke_count(),
        workspace.pending_writes(),
    );
    out
}

fn render_questions(out: &mut String, session: &Session, active: Option<&QuestionId>) {
    for (idx, question) in session.questions().iter().enumerate() {
        let marker = if active == Some(&question.id) { '>' } else { ' ' };
        let obtained = question.obtained_marks().map_or("_".to_string(), |value| value.to_string());
        let _ = writeln!(
            out,
            "{marker} Q{} [{}] {} {}/{} {:?}{}",
            idx + 1,
            question.id,
            question.kind().as_str(),
            obtained,
            question.max_marks,
            question.status(),
            if question.needs_manual_entry() { " needs entry" } else { "" },
        );
        for step in question.steps().unwrap_or_default() {
            let obtained = step.obtained_marks().map_or("_".to_string(), |value| value.to_string());
            let _ = writeln!(out, "    {} {} {}/{}", step.id, step.label, obtained, step.max_marks);
        }
    }
}

/// Screen box the ink layer occupies at the current zoom and rotation,
/// anchored at the origin.
fn ink_screen_box(workspace: &ReviewWorkspace) -> ScreenBox {
    let (width, height) = workspace.freehand().dimensions();
    let zoom = workspace.transform().zoom();
    let (width, height) = if workspace.transform().rotation().is_sideways() {
        (f64::from(height), f64::from(width))
    } else {
        (f64::from(width), f64::from(height))
    };
    ScreenBox { left: 0.0, top: 0.0, width: width * zoom, height: height * zoom }
}

fn drag_stroke(workspace: &mut ReviewWorkspace, points: &[(f64, f64)]) -> PointerOutcome {
    let screen = ink_screen_box(workspace);
    let rotation = workspace.transform().rotation();
    let mut outcome = PointerOutcome::PassThrough;

    let last = points.len().saturating_sub(1);
    for (idx, (x, y)) in points.iter().enumerate() {
        let (u, v) = rotation.rotate_unit(x / 100.0, y / 100.0);
        let kind = if idx == 0 { PointerKind::Down } else { PointerKind::Move };
        let event = PointerEvent {
            kind,
            source: PointerSource::Mouse,
            client_x: u * screen.width,
            client_y: v * screen.height,
        };
        outcome = workspace.pointer(event, &screen);
        if idx == last {
            workspace.pointer(PointerEvent { kind: PointerKind::Up, ..event }, &screen);
        }
    }
    outcome
}

pub async fn execute(workspace: &mut ReviewWorkspace, command: Command) -> Flow {
    let message = match command {
        Command::Show => render_session(workspace),
        Command::Mark { question_id, value } => match workspace.set_mark(&question_id, None, value) {
            Ok(session) => mark_message(&session, &question_id),
            Err(err) => format!("error: {err}"),
        },
        Command::Step { question_id, step_id, value } => {
            match workspace.set_mark(&question_id, Some(&step_id), value) {
                Ok(session) => mark_message(&session, &question_id),
                Err(err) => format!("error: {err}"),
            }
        }
        Command::Nudge { question_id, step_id, direction } => {
            match workspace.nudge(&question_id, step_id.as_ref(), direction) {
                Ok(session) => mark_message(&session, &question_id),
                Err(err) => format!("error: {err}"),
            }
        }
        Command::ZoomIn => {
            let changed = workspace.transform_mut().zoom_in();
            zoom_message(workspace, changed)
        }
        Command::ZoomOut => {
            let changed = workspace.transform_mut().zoom_out();
            zoom_message(workspace, changed)
        }
        Command::Rotate => format!("rotation {}deg", workspace.transform_mut().rotate().degrees()),
        Command::Bright => format!("brightness boost {}", on_off(workspace.transform_mut().toggle_brightness())),
        Command::Reset => {
            workspace.transform_mut().reset();
            format!("view {}", workspace.transform().composed())
        }
        Command::Select(question_id) => match workspace.select_from_list(&question_id) {
            Ok(Some(selected)) => format!("selected {selected}"),
            Ok(None) => "selection cleared".to_string(),
            Err(err) => format!("error: {err}"),
        },
        Command::Click { x, y } => match workspace.click_page(x, y) {
            Some(selected) => format!("selected {selected}"),
            None if workspace.freehand().is_drawing() => "click taken by the ink layer".to_string(),
            None => "nothing selected".to_string(),
        },
        Command::Toggle(Layer::Regions) => format!("regions {}", on_off(workspace.regions_mut().toggle())),
        Command::Toggle(Layer::Ink) => format!("ink layer {}", on_off(workspace.freehand_mut().toggle_visible())),
        Command::Draw => format!("drawing {}", on_off(workspace.freehand_mut().toggle_drawing())),
        Command::Ink(points) => match drag_stroke(workspace, &points) {
            PointerOutcome::Captured => format!("{} pixels inked", workspace.freehand().inked_pixels()),
            PointerOutcome::PassThrough => "drawing is off, stroke ignored".to_string(),
        },
        Command::Clear => {
            workspace.freehand_mut().clear();
            "ink cleared".to_string()
        }
        Command::Finalize => match workspace.finalize().await {
            Ok(FinalizeOutcome::Finalized { acknowledged: true }) => "session finalised".to_string(),
            Ok(FinalizeOutcome::Finalized { acknowledged: false }) => {
                "session finalised locally; the service did not confirm".to_string()
            }
            Ok(FinalizeOutcome::FinalizedLocally) => {
                "session finalised locally; sample data is not sent to the service".to_string()
            }
            Ok(FinalizeOutcome::AlreadyCompleted) => "session already completed".to_string(),
            Err(err) => format!("error: {err}"),
        },
        Command::Metrics => {
            metrics::render().unwrap_or_else(|| "prometheus exporter disabled".to_string())
        }
        Command::Help => HELP.to_string(),
        Command::Quit => return Flow::Quit,
    };
    Flow::Continue(message)
}

fn zoom_message(workspace: &ReviewWorkspace, changed: bool) -> String {
    let suffix = if changed { "" } else { " (limit)" };
    format!("zoom {}{suffix}", workspace.transform().zoom())
}

fn mark_message(session: &Session, question_id: &QuestionId) -> String {
    let question_total = session
        .question(question_id)
        .and_then(|question| question.obtained_marks())
        .map_or("_".to_string(), |value| value.to_string());
    format!(
        "{question_id}: {question_total} | total {}/{}",
        session.obtained_marks(),
        session.total_marks
    )
}

/// Reads commands until `quit`, end of input or `shutdown` resolves.
pub async fn run_console<R, W, S>(
    workspace: &mut ReviewWorkspace,
    reader: R,
    mut writer: W,
    shutdown: S,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
    S: Future<Output = ()>,
{
    let mut lines = reader.lines();
    tokio::pin!(shutdown);

    writer.write_all(render_session(workspace).as_bytes()).await.context("Failed to write to console")?;
    writer.write_all(b"\n").await.context("Failed to write to console")?;

    loop {
        writer.flush().await.context("Failed to flush console")?;
        let line = tokio::select! {
            _ = &mut shutdown => break,
            line = lines.next_line() => line.context("Failed to read console input")?,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match parse_command(&line) {
            Ok(command) => match execute(workspace, command).await {
                Flow::Continue(reply) => reply,
                Flow::Quit => break,
            },
            Err(err) => format!("error: {err}"),
        };
        writer.write_all(reply.as_bytes()).await.context("Failed to write to console")?;
        writer.write_all(b"\n").await.context("Failed to write to console")?;
    }

    writer.flush().await.context("Failed to flush console")?;
    Ok(())
}
