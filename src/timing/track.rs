use crate::error::{Error, Result};
use crate::events::{Event, FiredEvent};
use crossbeam::channel::{Receiver, Sender, bounded, select};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, trace};

/// What a track loop sends back to the sequencer.
#[derive(Debug)]
pub(crate) enum TrackOutput {
    Fired(FiredEvent),
    /// The track has finished with this global beat.
    Done { beat: u64 },
}

/// One lane of a track: a grid of optional events, one slot per local tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackLine {
    name: String,
    default_param: i32,
    events: Vec<Option<Event>>,
}

impl TrackLine {
    fn new(name: String, default_param: i32, len: usize) -> Self {
        Self {
            name,
            default_param,
            events: vec![None; len],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn default_param(&self) -> i32 {
        self.default_param
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn event_at(&self, beat: usize) -> Option<&Event> {
        self.events.get(beat).and_then(Option::as_ref)
    }

    pub fn events(&self) -> &[Option<Event>] {
        &self.events
    }

    /// Keeps existing cells left-aligned, truncating or padding with empties.
    fn resize(&mut self, len: usize) {
        self.events.resize(len, None);
    }
}

#[derive(Debug)]
struct TrackState {
    name: String,
    default_event: Event,
    lines: Vec<TrackLine>,
    beats_per_bar: usize,
    num_bars: usize,
    beat_divisor: u64,
    divided_beat_count: u64,
}

impl TrackState {
    fn grid_len(&self) -> usize {
        self.beats_per_bar * self.num_bars
    }

    fn resize_lines(&mut self) {
        let len = self.grid_len();
        for line in &mut self.lines {
            line.resize(len);
        }
    }

    fn line_mut(&mut self, index: usize) -> Result<&mut TrackLine> {
        let len = self.lines.len();
        self.lines
            .get_mut(index)
            .ok_or(Error::InvalidLine { index, len })
    }

    /// Events due on this global beat, each stamped with that beat.
    fn fire(&mut self, beat: u64) -> Vec<FiredEvent> {
        if beat % self.beat_divisor != 0 {
            return Vec::new();
        }

        let slot = (self.divided_beat_count % self.grid_len() as u64) as usize;
        let fired = self
            .lines
            .iter()
            .filter_map(|line| line.events[slot].as_ref())
            .map(|event| {
                let mut event = event.clone();
                event.play_at_beat = beat;
                FiredEvent {
                    event,
                    beat_divisor: self.beat_divisor,
                }
            })
            .collect();

        self.divided_beat_count += 1;
        fired
    }
}

/// Both dimensions must be non-zero and their product must fit a `usize`.
fn check_geometry(beats_per_bar: usize, num_bars: usize) -> Result<()> {
    match beats_per_bar.checked_mul(num_bars) {
        Some(len) if len > 0 => Ok(()),
        _ => Err(Error::InvalidGeometry {
            beats_per_bar,
            num_bars,
        }),
    }
}

struct TrackInner {
    state: Arc<Mutex<TrackState>>,
    beat_tx: Sender<u64>,
    outbox_rx: Receiver<TrackOutput>,
    shutdown_tx: Sender<()>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TrackInner {
    fn shutdown(&self) {
        let _ = self.shutdown_tx.try_send(());
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
    }
}

impl Drop for TrackInner {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A beat subdivider with its own loop thread. Handles are cheap to clone
/// and all refer to the same track.
#[derive(Clone)]
pub struct Track {
    inner: Arc<TrackInner>,
}

impl Track {
    pub(crate) fn spawn(
        default_event: Event,
        beats_per_bar: usize,
        beat_divisor: u64,
        num_bars: usize,
        beat_capacity: usize,
        outbox_capacity: usize,
    ) -> Result<Self> {
        check_geometry(beats_per_bar, num_bars)?;
        if beat_divisor < 1 {
            return Err(Error::InvalidBeatDivisor(beat_divisor));
        }

        let state = Arc::new(Mutex::new(TrackState {
            name: "Track".to_string(),
            default_event,
            lines: Vec::new(),
            beats_per_bar,
            num_bars,
            beat_divisor,
            divided_beat_count: 0,
        }));

        let (beat_tx, beat_rx) = bounded(beat_capacity);
        let (outbox_tx, outbox_rx) = bounded(outbox_capacity);
        let (shutdown_tx, shutdown_rx) = bounded(1);

        let loop_state = state.clone();
        let worker = std::thread::spawn(move || {
            track_loop(loop_state, beat_rx, outbox_tx, shutdown_rx);
        });

        Ok(Self {
            inner: Arc::new(TrackInner {
                state,
                beat_tx,
                outbox_rx,
                shutdown_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    pub(crate) fn beat_sender(&self) -> &Sender<u64> {
        &self.inner.beat_tx
    }

    pub(crate) fn outbox(&self) -> &Receiver<TrackOutput> {
        &self.inner.outbox_rx
    }

    /// Stops the loop thread and waits for it. Idempotent.
    pub fn shutdown(&self) {
        self.inner.shutdown();
    }

    pub(crate) fn rewind(&self) {
        self.inner.state.lock().divided_beat_count = 0;
    }

    pub fn name(&self) -> String {
        self.inner.state.lock().name.clone()
    }

    pub fn set_name(&self, name: impl Into<String>) {
        self.inner.state.lock().name = name.into();
    }

    pub fn default_event(&self) -> Event {
        self.inner.state.lock().default_event.clone()
    }

    pub fn beats_per_bar(&self) -> usize {
        self.inner.state.lock().beats_per_bar
    }

    pub fn num_bars(&self) -> usize {
        self.inner.state.lock().num_bars
    }

    pub fn grid_len(&self) -> usize {
        self.inner.state.lock().grid_len()
    }

    pub fn beat_divisor(&self) -> u64 {
        self.inner.state.lock().beat_divisor
    }

    pub fn divided_beat_count(&self) -> u64 {
        self.inner.state.lock().divided_beat_count
    }

    pub fn set_beats_per_bar(&self, beats_per_bar: usize) -> Result<()> {
        let mut state = self.inner.state.lock();
        check_geometry(beats_per_bar, state.num_bars)?;
        state.beats_per_bar = beats_per_bar;
        state.resize_lines();
        Ok(())
    }

    pub fn set_num_bars(&self, num_bars: usize) -> Result<()> {
        let mut state = self.inner.state.lock();
        check_geometry(state.beats_per_bar, num_bars)?;
        state.num_bars = num_bars;
        state.resize_lines();
        Ok(())
    }

    pub fn set_beat_divisor(&self, beat_divisor: u64) -> Result<()> {
        let mut state = self.inner.state.lock();
        if beat_divisor < 1 {
            return Err(Error::InvalidBeatDivisor(beat_divisor));
        }
        state.beat_divisor = beat_divisor;
        Ok(())
    }

    /// Appends an empty line and returns its index.
    pub fn add_line(&self, name: impl Into<String>, default_param: i32) -> usize {
        let mut state = self.inner.state.lock();
        let line = TrackLine::new(name.into(), default_param, state.grid_len());
        state.lines.push(line);
        state.lines.len() - 1
    }

    pub fn remove_line(&self, index: usize) -> Result<()> {
        let mut state = self.inner.state.lock();
        let len = state.lines.len();
        if index >= len {
            return Err(Error::InvalidLine { index, len });
        }
        state.lines.remove(index);
        Ok(())
    }

    pub fn line_count(&self) -> usize {
        self.inner.state.lock().lines.len()
    }

    pub fn line(&self, index: usize) -> Option<TrackLine> {
        self.inner.state.lock().lines.get(index).cloned()
    }

    pub fn lines(&self) -> Vec<TrackLine> {
        self.inner.state.lock().lines.clone()
    }

    pub fn set_event_at(&self, line: usize, beat: usize, event: Event) -> Result<()> {
        self.replace_event_at(line, beat, Some(event)).map(|_| ())
    }

    /// Empties a cell, returning what was there.
    pub fn clear_event_at(&self, line: usize, beat: usize) -> Result<Option<Event>> {
        self.replace_event_at(line, beat, None)
    }

    pub fn event_at(&self, line: usize, beat: usize) -> Result<Option<Event>> {
        let state = self.inner.state.lock();
        let track_line = state.lines.get(line).ok_or(Error::InvalidLine {
            index: line,
            len: state.lines.len(),
        })?;
        if beat >= track_line.len() {
            return Err(Error::InvalidBeat {
                index: beat,
                len: track_line.len(),
            });
        }
        Ok(track_line.event_at(beat).cloned())
    }

    fn replace_event_at(
        &self,
        line: usize,
        beat: usize,
        event: Option<Event>,
    ) -> Result<Option<Event>> {
        let mut state = self.inner.state.lock();
        let track_line = state.line_mut(line)?;
        let len = track_line.len();
        let cell = track_line
            .events
            .get_mut(beat)
            .ok_or(Error::InvalidBeat { index: beat, len })?;
        Ok(std::mem::replace(cell, event))
    }

    pub fn snapshot(&self) -> TrackSnapshot {
        let state = self.inner.state.lock();
        let position = match state.divided_beat_count {
            0 => None,
            n => Some(((n - 1) % state.grid_len() as u64) as usize),
        };
        TrackSnapshot {
            name: state.name.clone(),
            beats_per_bar: state.beats_per_bar,
            num_bars: state.num_bars,
            beat_divisor: state.beat_divisor,
            divided_beat_count: state.divided_beat_count,
            position,
            lines: state
                .lines
                .iter()
                .map(|line| LineSnapshot {
                    name: line.name.clone(),
                    cells: line.events.iter().map(Option::is_some).collect(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineSnapshot {
    pub name: String,
    pub cells: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackSnapshot {
    pub name: String,
    pub beats_per_bar: usize,
    pub num_bars: usize,
    pub beat_divisor: u64,
    pub divided_beat_count: u64,
    /// Grid slot of the last local tick, if any has fired
    pub position: Option<usize>,
    pub lines: Vec<LineSnapshot>,
}

fn track_loop(
    state: Arc<Mutex<TrackState>>,
    beat_rx: Receiver<u64>,
    outbox_tx: Sender<TrackOutput>,
    shutdown_rx: Receiver<()>,
) {
    let forward = |output: TrackOutput| -> bool {
        select! {
            send(outbox_tx, output) -> res => res.is_ok(),
            recv(shutdown_rx) -> _ => false,
        }
    };

    loop {
        let beat = select! {
            recv(beat_rx) -> beat => match beat {
                Ok(beat) => beat,
                Err(_) => break,
            },
            recv(shutdown_rx) -> _ => break,
        };

        // Collect under the lock, send after releasing it so a full outbox
        // never holds the track lock.
        let fired = state.lock().fire(beat);
        if !fired.is_empty() {
            trace!(beat, count = fired.len(), "track fired");
        }

        for event in fired {
            if !forward(TrackOutput::Fired(event)) {
                return;
            }
        }
        if !forward(TrackOutput::Done { beat }) {
            return;
        }
    }

    debug!("track loop stopped");
}
