use crate::timing::{PlaybackStatus, SequencerSnapshot, TrackSnapshot};
use crossterm::event::{Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::style::{Print, PrintStyledContent, Stylize};
use crossterm::{cursor, queue, terminal};
use std::io::{self, Write};

const GLOBAL_BAR_CELLS: usize = 16;
const LINE_NAME_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    TogglePlay,
    Stop,
    Quit,
}

/// Maps a terminal event to what the front end should do about it.
pub fn action_for(event: &TermEvent) -> Option<Action> {
    let TermEvent::Key(KeyEvent {
        code,
        modifiers,
        kind: KeyEventKind::Press,
        ..
    }) = event
    else {
        return None;
    };

    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePlay),
        KeyCode::Char('s') => Some(Action::Stop),
        KeyCode::Char('q') | KeyCode::Esc => Some(Action::Quit),
        _ => None,
    }
}

/// One screen row. `highlight` is a char index drawn reversed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub text: String,
    pub highlight: Option<usize>,
}

impl Row {
    fn plain(text: String) -> Self {
        Self {
            text,
            highlight: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct SequencerView;

impl SequencerView {
    pub fn new() -> Self {
        Self
    }

    pub fn rows(&self, snapshot: &SequencerSnapshot) -> Vec<Row> {
        let mut rows = vec![
            caption(snapshot),
            global_bar(snapshot.current_beat),
            Row::plain(String::new()),
        ];
        for (index, track) in snapshot.tracks.iter().enumerate() {
            rows.extend(track_rows(index, track));
            rows.push(Row::plain(String::new()));
        }
        rows
    }

    /// Clears the screen, draws every row clipped to `width`, and flushes.
    pub fn draw<W: Write>(
        &self,
        out: &mut W,
        snapshot: &SequencerSnapshot,
        width: u16,
    ) -> io::Result<()> {
        queue!(out, terminal::Clear(terminal::ClearType::All))?;

        for (y, row) in self.rows(snapshot).iter().enumerate() {
            queue!(out, cursor::MoveTo(0, y as u16))?;
            for (x, c) in row.text.chars().take(width as usize).enumerate() {
                if row.highlight == Some(x) {
                    queue!(out, PrintStyledContent(c.reverse()))?;
                } else {
                    queue!(out, Print(c))?;
                }
            }
        }

        out.flush()
    }
}

fn status_label(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Stopped => "stopped",
        PlaybackStatus::Playing => "playing",
        PlaybackStatus::Paused => "paused",
    }
}

fn caption(snapshot: &SequencerSnapshot) -> Row {
    let outputs = if snapshot.outputs.is_empty() {
        "none".to_string()
    } else {
        snapshot.outputs.join(", ")
    };
    Row::plain(format!(
        "{}  [{}]  beat {}  pending {}  outputs: {}  (space play/pause, s stop, q quit)",
        snapshot.name,
        status_label(snapshot.status),
        snapshot.current_beat,
        snapshot.pending,
        outputs
    ))
}

fn global_bar(current_beat: u64) -> Row {
    let cells: String = std::iter::repeat_n('.', GLOBAL_BAR_CELLS).collect();
    // current_beat is the next beat to play; the last one played is lit
    let highlight = current_beat
        .checked_sub(1)
        .map(|beat| LINE_NAME_WIDTH + (beat % GLOBAL_BAR_CELLS as u64) as usize);
    Row {
        text: format!("{:<width$}{}", "clock", cells, width = LINE_NAME_WIDTH),
        highlight,
    }
}

fn track_rows(index: usize, track: &TrackSnapshot) -> Vec<Row> {
    let mut rows = vec![Row::plain(format!(
        "{} {}  1/{}  {}x{}",
        index, track.name, track.beat_divisor, track.beats_per_bar, track.num_bars
    ))];

    for line in &track.lines {
        let name: String = line.name.chars().take(LINE_NAME_WIDTH - 1).collect();
        let cells: String = line
            .cells
            .iter()
            .map(|&set| if set { 'o' } else { '.' })
            .collect();
        rows.push(Row {
            text: format!("{:<width$}{}", name, cells, width = LINE_NAME_WIDTH),
            highlight: track.position.map(|p| LINE_NAME_WIDTH + p),
        });
    }
    rows
}
