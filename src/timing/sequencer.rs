use super::scheduler::{self, DispatchRule, Outputs};
use super::track::{Track, TrackOutput, TrackSnapshot};
use crate::config::Config;
use crate::error::{Error, Result, TransportError};
use crate::events::{Event, MidiMessage};
use crate::filter::EventFilter;
use crate::transport::Transport;
use crossbeam::channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Play,
    Pause,
    Stop,
    Shutdown,
}

/// Everything behind the structural lock.
struct SequencerState {
    name: String,
    status: PlaybackStatus,
    tracks: Vec<Track>,
    pending: Vec<Event>,
    outputs: Outputs,
    current_beat: u64,
    filter: EventFilter,
}

struct Core {
    state: Mutex<SequencerState>,
    config: Config,
    transport: Box<dyn Transport>,
}

impl Core {
    /// Broadcasts the current beat, advances it and gathers what the
    /// tracks fired. Returns the beat that was broadcast.
    fn collect(&self, state: &mut SequencerState) -> u64 {
        let deadline = Instant::now() + self.config.beat_duration();
        let beat = state.current_beat;

        for track in &state.tracks {
            if track.beat_sender().send(beat).is_err() {
                debug!(beat, track = %track.name(), "track loop is gone, beat not delivered");
            }
        }
        state.current_beat += 1;

        for track in &state.tracks {
            if !collect_track(track, beat, deadline, &mut state.pending) {
                warn!(beat, track = %track.name(), "track did not finish the beat in time");
            }
        }
        beat
    }

    fn dispatch(&self, state: &mut SequencerState) -> usize {
        scheduler::dispatch_due(
            &mut state.pending,
            state.current_beat,
            self.config.dispatch_rule,
            &mut state.outputs,
        )
    }

    fn advance(&self) -> u64 {
        let mut state = self.state.lock();
        let beat = self.collect(&mut state);
        self.dispatch(&mut state);
        trace!(beat, pending = state.pending.len(), "tick");
        beat
    }

    /// Back to beat zero. Pending releases go out now so no note is left
    /// hanging; everything else queued is dropped.
    fn rewind(&self) {
        let mut state = self.state.lock();
        let state = &mut *state;

        let mut releases: Vec<Event> = state
            .pending
            .drain(..)
            .filter(|event| {
                event.is_tone()
                    && event
                        .messages()
                        .iter()
                        .all(|m| m.status & 0xf0 == MidiMessage::NOTE_OFF)
            })
            .collect();
        scheduler::dispatch_due(
            &mut releases,
            0,
            DispatchRule::NotBeforeCurrent,
            &mut state.outputs,
        );

        state.current_beat = 0;
        for track in &state.tracks {
            track.rewind();
        }
    }

    fn attempt_open_output(&self, state: &mut SequencerState, device_name: &str) -> Result<()> {
        if state.outputs.contains_key(device_name) {
            return Ok(());
        }

        let mut found = false;
        for output in self.transport.outputs()? {
            if !output.available || output.name != device_name {
                continue;
            }
            found = true;
            if state.outputs.contains_key(device_name) {
                continue;
            }
            let stream = self.transport.open(&output)?;
            state.outputs.insert(device_name.to_string(), stream);
            info!(device = device_name, "opened output");
        }

        if !found {
            return Err(TransportError::Open {
                name: device_name.to_string(),
                reason: "no such output".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

/// Receives from a track until it reports `beat` done or the deadline
/// passes. Returns false when the track did not report in time.
fn collect_track(track: &Track, beat: u64, deadline: Instant, pending: &mut Vec<Event>) -> bool {
    loop {
        match track.outbox().recv_deadline(deadline) {
            Ok(TrackOutput::Fired(fired)) => scheduler::queue_event(pending, fired),
            Ok(TrackOutput::Done { beat: done }) if done == beat => return true,
            Ok(TrackOutput::Done { .. }) => {}
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => return true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencerSnapshot {
    pub name: String,
    pub status: PlaybackStatus,
    pub current_beat: u64,
    pub pending: usize,
    pub outputs: Vec<String>,
    pub tracks: Vec<TrackSnapshot>,
}

/// The global clock. Owns the tracks and runs one loop thread that ticks
/// once per beat while playing.
pub struct Sequencer {
    core: Arc<Core>,
    control_tx: Sender<Control>,
    worker: Option<JoinHandle<()>>,
}

impl Sequencer {
    pub fn new(config: Config, transport: Box<dyn Transport>) -> Self {
        let core = Arc::new(Core {
            state: Mutex::new(SequencerState {
                name: config.name.clone(),
                status: PlaybackStatus::Stopped,
                tracks: Vec::with_capacity(8),
                pending: Vec::new(),
                outputs: Outputs::new(),
                current_beat: 0,
                filter: EventFilter::new(),
            }),
            config,
            transport,
        });

        let (control_tx, control_rx) = crossbeam::channel::unbounded();
        let loop_core = core.clone();
        let worker = std::thread::spawn(move || {
            sequencer_loop(loop_core, control_rx);
        });

        Self {
            core,
            control_tx,
            worker: Some(worker),
        }
    }

    pub fn config(&self) -> &Config {
        &self.core.config
    }

    pub fn name(&self) -> String {
        self.core.state.lock().name.clone()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.core.state.lock().status
    }

    pub fn is_playing(&self) -> bool {
        self.status() == PlaybackStatus::Playing
    }

    pub fn current_beat(&self) -> u64 {
        self.core.state.lock().current_beat
    }

    pub fn play(&self) {
        self.request(PlaybackStatus::Playing, Control::Play);
    }

    /// Suspends after the beat in flight. Does nothing unless playing.
    pub fn pause(&self) {
        let mut state = self.core.state.lock();
        if state.status != PlaybackStatus::Playing {
            return;
        }
        state.status = PlaybackStatus::Paused;
        let _ = self.control_tx.send(Control::Pause);
    }

    /// Halts playback; the next `play` starts again from beat zero.
    pub fn stop(&self) {
        self.request(PlaybackStatus::Stopped, Control::Stop);
    }

    pub fn toggle(&self) {
        if self.is_playing() {
            self.pause();
        } else {
            self.play();
        }
    }

    fn request(&self, status: PlaybackStatus, control: Control) {
        let mut state = self.core.state.lock();
        if state.status == status {
            return;
        }
        state.status = status;
        let _ = self.control_tx.send(control);
    }

    /// Runs a single tick right now, without sleeping. Returns the beat
    /// that was broadcast.
    pub fn advance(&self) -> u64 {
        self.core.advance()
    }

    /// Registers a new track and opens its default event's output. The
    /// track stays registered when the output fails to open; it can be
    /// fetched with `track`.
    pub fn add_track(
        &self,
        default_event: Event,
        beats_per_bar: usize,
        beat_divisor: u64,
        num_bars: usize,
    ) -> Result<Track> {
        let mut state = self.core.state.lock();
        let device_name = default_event.device_name.clone();
        let track = Track::spawn(
            default_event,
            beats_per_bar,
            beat_divisor,
            num_bars,
            self.core.config.beat_capacity(),
            self.core.config.outbox_capacity(),
        )?;
        state.tracks.push(track.clone());
        info!(index = state.tracks.len() - 1, device = %device_name, "added track");

        self.core.attempt_open_output(&mut state, &device_name)?;
        Ok(track)
    }

    pub fn remove_track(&self, index: usize) -> Result<()> {
        let track = {
            let mut state = self.core.state.lock();
            let len = state.tracks.len();
            if index >= len {
                return Err(Error::InvalidTrack { index, len });
            }
            state.tracks.remove(index)
        };
        track.shutdown();
        info!(index, "removed track");
        Ok(())
    }

    pub fn track(&self, index: usize) -> Option<Track> {
        self.core.state.lock().tracks.get(index).cloned()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.core.state.lock().tracks.clone()
    }

    pub fn track_count(&self) -> usize {
        self.core.state.lock().tracks.len()
    }

    /// Opens every available output named `device_name` that is not open yet.
    pub fn attempt_open_output(&self, device_name: &str) -> Result<()> {
        let mut state = self.core.state.lock();
        self.core.attempt_open_output(&mut state, device_name)
    }

    pub fn is_output_open(&self, device_name: &str) -> bool {
        self.core.state.lock().outputs.contains_key(device_name)
    }

    pub fn pending(&self) -> Vec<Event> {
        self.core.state.lock().pending.clone()
    }

    pub fn event_filter(&self) -> EventFilter {
        self.core.state.lock().filter.clone()
    }

    pub fn set_event_filter(&self, filter: EventFilter) {
        self.core.state.lock().filter = filter;
    }

    /// Copies what a view needs, taken under the structural lock.
    pub fn snapshot(&self) -> SequencerSnapshot {
        let state = self.core.state.lock();
        let mut outputs: Vec<String> = state.outputs.keys().cloned().collect();
        outputs.sort();
        SequencerSnapshot {
            name: state.name.clone(),
            status: state.status,
            current_beat: state.current_beat,
            pending: state.pending.len(),
            outputs,
            tracks: state.tracks.iter().map(Track::snapshot).collect(),
        }
    }

    /// Stops the clock thread and every track thread. Idempotent.
    pub fn shutdown(&mut self) {
        let _ = self.control_tx.send(Control::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            let tracks = std::mem::take(&mut self.core.state.lock().tracks);
            for track in &tracks {
                track.shutdown();
            }
            info!("sequencer shut down");
        }
    }
}

impl Drop for Sequencer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn sequencer_loop(core: Arc<Core>, control_rx: Receiver<Control>) {
    let beat_duration = core.config.beat_duration();
    let mut status = PlaybackStatus::Stopped;

    loop {
        if status != PlaybackStatus::Playing {
            match control_rx.recv() {
                Ok(Control::Play) => {
                    if status == PlaybackStatus::Stopped {
                        core.rewind();
                    }
                    info!(from = ?status, "playing");
                    status = PlaybackStatus::Playing;
                }
                Ok(Control::Stop) => {
                    core.rewind();
                    info!("stopped");
                    status = PlaybackStatus::Stopped;
                }
                Ok(Control::Pause) => {}
                Ok(Control::Shutdown) | Err(_) => break,
            }
            continue;
        }

        let tick_start = Instant::now();
        core.advance();

        // Sleep out the rest of the beat; controls cut it short.
        let wake = tick_start + beat_duration;
        loop {
            match control_rx.recv_deadline(wake) {
                Ok(Control::Play) => {}
                Ok(Control::Pause) => {
                    info!("paused");
                    status = PlaybackStatus::Paused;
                    break;
                }
                Ok(Control::Stop) => {
                    core.rewind();
                    info!("stopped");
                    status = PlaybackStatus::Stopped;
                    break;
                }
                Ok(Control::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                Err(RecvTimeoutError::Timeout) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::testing::{MemoryTransport, Written};
    use std::time::Duration;

    fn tone() -> Event {
        Event::tone("synth", 0, vec![60], 100, 1)
    }

    fn sequencer(transport: &MemoryTransport, config: Config) -> Sequencer {
        Sequencer::new(config, Box::new(transport.clone()))
    }

    fn wait_for(what: &str, mut done: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !done() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn note_on() -> Written {
        Written::Short {
            device: "synth".to_string(),
            message: MidiMessage::new(0x90, 60, 100),
        }
    }

    fn note_off() -> Written {
        Written::Short {
            device: "synth".to_string(),
            message: MidiMessage::new(0x80, 60, 0),
        }
    }

    /// One track, divisor 1, 4 beats, 1 bar, a tone at slot 0.
    fn single_tone_sequencer(transport: &MemoryTransport, config: Config) -> Sequencer {
        let seq = sequencer(transport, config);
        let track = seq.add_track(tone(), 4, 1, 1).unwrap();
        let line = track.add_line("lead", 0);
        track.set_event_at(line, 0, tone()).unwrap();
        seq
    }

    #[test]
    fn first_beat_queues_note_on_and_release() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = single_tone_sequencer(&transport, Config::default());

        let mut state = seq.core.state.lock();
        let beat = seq.core.collect(&mut state);

        assert_eq!(beat, 0);
        assert_eq!(state.current_beat, 1);
        assert_eq!(state.pending.len(), 2);
        let on = &state.pending[0];
        let off = &state.pending[1];
        assert_eq!(on.play_at_beat, 0);
        assert_eq!(on.messages(), &[MidiMessage::new(0x90, 60, 100)]);
        assert_eq!(off.play_at_beat, 1);
        assert_eq!(off.messages(), &[MidiMessage::new(0x80, 60, 0)]);
    }

    // The literal rule sends everything at or after the current beat, so
    // the note-on stamped with beat 0 is left behind once the scan runs
    // at beat 1.
    #[test]
    fn literal_rule_dispatches_release_and_strands_note_on() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = single_tone_sequencer(&transport, Config::default());

        let mut state = seq.core.state.lock();
        seq.core.collect(&mut state);
        let sent = seq.core.dispatch(&mut state);

        assert_eq!(sent, 1);
        assert_eq!(transport.writes(), vec![note_off()]);
        assert_eq!(state.pending.len(), 1);
        assert_eq!(state.pending[0].play_at_beat, 0);
    }

    #[test]
    fn due_rule_dispatches_both_at_beat_one() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let config = Config {
            dispatch_rule: DispatchRule::Due,
            ..Config::default()
        };
        let seq = single_tone_sequencer(&transport, config);

        let mut state = seq.core.state.lock();
        seq.core.collect(&mut state);
        let sent = seq.core.dispatch(&mut state);

        assert_eq!(sent, 2);
        assert_eq!(transport.writes(), vec![note_on(), note_off()]);
        assert!(state.pending.is_empty());
    }

    #[test]
    fn due_rule_holds_release_until_its_beat() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let config = Config {
            dispatch_rule: DispatchRule::Due,
            ..Config::default()
        };
        let seq = sequencer(&transport, config);
        let track = seq.add_track(tone(), 4, 2, 1).unwrap();
        let line = track.add_line("lead", 0);
        let tone = Event::tone("synth", 0, vec![60], 100, 2);
        track.set_event_at(line, 0, tone).unwrap();

        // release lands at beat 0 + 2 * 2
        seq.advance();
        assert_eq!(transport.writes(), vec![note_on()]);
        seq.advance();
        seq.advance();
        assert_eq!(transport.writes().len(), 1);
        seq.advance();
        assert_eq!(transport.writes(), vec![note_on(), note_off()]);
    }

    #[test]
    fn huge_tone_length_does_not_stop_the_clock() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = sequencer(&transport, Config::default());
        let track = seq.add_track(tone(), 4, 2, 1).unwrap();
        let line = track.add_line("lead", 0);
        let tone = Event::tone("synth", 0, vec![60], 100, u64::MAX / 2 + 1);
        track.set_event_at(line, 0, tone).unwrap();

        seq.advance();
        seq.advance();
        seq.advance();

        assert_eq!(seq.current_beat(), 3);
        assert_eq!(transport.writes(), vec![note_off()]);
        assert!(seq.pending().iter().all(|e| e.play_at_beat == 0));
    }

    #[test]
    fn stop_flushes_releases_and_rewinds_tracks() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = sequencer(&transport, Config::default());
        let track = seq.add_track(tone(), 4, 1, 1).unwrap();
        let line = track.add_line("lead", 0);
        let control = Event::control("synth", 0, 1, 1);
        let long_tone = Event::tone("synth", 0, vec![60], 100, 4);
        track.set_event_at(line, 0, control).unwrap();
        track.set_event_at(line, 1, long_tone).unwrap();

        // control at 0, note-on at 1, release at 5, none dispatched yet
        {
            let mut state = seq.core.state.lock();
            seq.core.collect(&mut state);
            seq.core.collect(&mut state);
            assert_eq!(state.pending.len(), 3);
        }
        assert_eq!(track.divided_beat_count(), 2);

        // paused, so stopping runs no further tick
        seq.core.state.lock().status = PlaybackStatus::Paused;
        seq.stop();
        wait_for("the rewind", || seq.current_beat() == 0);

        assert_eq!(seq.status(), PlaybackStatus::Stopped);
        assert!(seq.pending().is_empty());
        assert_eq!(track.divided_beat_count(), 0);
        assert_eq!(transport.writes(), vec![note_off()]);
    }

    #[test]
    fn tracks_with_different_divisors_fire_independently() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = sequencer(&transport, Config::default());
        let every = seq.add_track(tone(), 1, 1, 1).unwrap();
        let third = seq.add_track(tone(), 1, 3, 1).unwrap();
        for track in [&every, &third] {
            let line = track.add_line("a", 0);
            let event = Event::control("synth", 0, 1, 1);
            track.set_event_at(line, 0, event).unwrap();
        }

        let mut state = seq.core.state.lock();
        for _ in 0..6 {
            seq.core.collect(&mut state);
        }
        drop(state);

        assert_eq!(every.divided_beat_count(), 6);
        assert_eq!(third.divided_beat_count(), 2);
        assert_eq!(seq.pending().len(), 8);
    }

    #[test]
    fn add_track_opens_each_output_once() {
        let transport = MemoryTransport::with_outputs(&["synth", "drums"]);
        let seq = sequencer(&transport, Config::default());

        seq.add_track(tone(), 4, 1, 1).unwrap();
        seq.add_track(tone(), 4, 1, 1).unwrap();
        seq.add_track(Event::percussion("drums", 9, vec![36], 100), 4, 1, 1)
            .unwrap();

        assert_eq!(
            transport.opens(),
            vec!["synth".to_string(), "drums".to_string()]
        );
        assert!(seq.is_output_open("synth"));
        assert_eq!(
            seq.snapshot().outputs,
            vec!["drums".to_string(), "synth".to_string()]
        );
    }

    #[test]
    fn add_track_keeps_track_when_output_fails() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        transport.fail_open("synth");
        let seq = sequencer(&transport, Config::default());

        let err = seq.add_track(tone(), 4, 1, 1).err().unwrap();
        assert!(matches!(
            err,
            Error::Transport(TransportError::Open { .. })
        ));
        assert_eq!(seq.track_count(), 1);
        assert!(!seq.is_output_open("synth"));

        let missing = seq
            .add_track(Event::control("ghost", 0, 1, 1), 4, 1, 1)
            .err()
            .unwrap();
        assert!(matches!(
            missing,
            Error::Transport(TransportError::Open { .. })
        ));
        assert_eq!(seq.track_count(), 2);
    }

    #[test]
    fn add_track_with_bad_divisor_registers_nothing() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = sequencer(&transport, Config::default());

        assert!(matches!(
            seq.add_track(tone(), 4, 0, 1),
            Err(Error::InvalidBeatDivisor(0))
        ));
        assert_eq!(seq.track_count(), 0);
    }

    #[test]
    fn events_for_unopened_outputs_are_consumed() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        transport.fail_open("synth");
        let config = Config {
            dispatch_rule: DispatchRule::Due,
            ..Config::default()
        };
        let seq = sequencer(&transport, config);
        assert!(seq.add_track(tone(), 1, 1, 1).is_err());
        let track = seq.track(0).unwrap();
        let line = track.add_line("a", 0);
        let event = Event::control("synth", 0, 1, 1);
        track.set_event_at(line, 0, event).unwrap();

        seq.advance();
        assert!(seq.pending().is_empty());
        assert!(transport.writes().is_empty());
    }

    #[test]
    fn remove_track_checks_index() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = sequencer(&transport, Config::default());
        seq.add_track(tone(), 4, 1, 1).unwrap();

        assert!(matches!(
            seq.remove_track(1),
            Err(Error::InvalidTrack { index: 1, len: 1 })
        ));
        assert_eq!(seq.track_count(), 1);

        seq.remove_track(0).unwrap();
        assert_eq!(seq.track_count(), 0);
        assert!(seq.tracks().is_empty());
    }

    #[test]
    fn removed_track_no_longer_fires() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = sequencer(&transport, Config::default());
        let track = seq.add_track(tone(), 1, 1, 1).unwrap();
        let line = track.add_line("a", 0);
        track.set_event_at(line, 0, tone()).unwrap();

        seq.remove_track(0).unwrap();
        seq.advance();
        assert!(seq.pending().is_empty());
        assert_eq!(seq.current_beat(), 1);
    }

    #[test]
    fn play_and_pause_are_idempotent() {
        let transport = MemoryTransport::default();
        let seq = sequencer(&transport, Config::default());

        assert_eq!(seq.status(), PlaybackStatus::Stopped);
        seq.pause();
        assert_eq!(seq.status(), PlaybackStatus::Stopped);

        seq.play();
        seq.play();
        assert!(seq.is_playing());

        seq.pause();
        seq.pause();
        assert_eq!(seq.status(), PlaybackStatus::Paused);

        seq.toggle();
        assert!(seq.is_playing());
        seq.stop();
        assert_eq!(seq.status(), PlaybackStatus::Stopped);
    }

    #[test]
    fn clock_runs_while_playing_and_holds_while_paused() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let config = Config {
            beat_duration_ms: 5,
            dispatch_rule: DispatchRule::Due,
            ..Config::default()
        };
        let seq = single_tone_sequencer(&transport, config);

        seq.play();
        wait_for("a few beats", || seq.current_beat() >= 5);
        seq.pause();
        wait_for("writes", || transport.writes().len() >= 2);

        std::thread::sleep(Duration::from_millis(30));
        let held = seq.current_beat();
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(seq.current_beat(), held);

        let writes = transport.writes();
        assert_eq!(writes[0], note_on());
        assert_eq!(writes[1], note_off());

        // resume keeps counting from where it paused
        seq.play();
        wait_for("resumed beats", || seq.current_beat() > held);
    }

    #[test]
    fn restart_after_stop_begins_at_beat_zero() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let config = Config {
            beat_duration_ms: 2,
            ..Config::default()
        };
        let seq = single_tone_sequencer(&transport, config);

        seq.play();
        wait_for("many beats", || seq.current_beat() >= 200);
        seq.stop();
        std::thread::sleep(Duration::from_millis(20));

        seq.play();
        std::thread::sleep(Duration::from_millis(20));
        assert!(seq.current_beat() < 200);
    }

    #[test]
    fn snapshot_reflects_tracks_and_queue() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let seq = single_tone_sequencer(&transport, Config::default());
        seq.advance();

        let snapshot = seq.snapshot();
        assert_eq!(snapshot.name, "Untitled");
        assert_eq!(snapshot.status, PlaybackStatus::Stopped);
        assert_eq!(snapshot.current_beat, 1);
        assert_eq!(snapshot.pending, 1);
        assert_eq!(snapshot.tracks.len(), 1);
        assert_eq!(
            snapshot.tracks[0].lines[0].cells,
            vec![true, false, false, false]
        );
        assert_eq!(snapshot.tracks[0].position, Some(0));
    }

    #[test]
    fn event_filter_defaults_to_identity() {
        let seq = sequencer(&MemoryTransport::default(), Config::default());
        let mut filter = seq.event_filter();
        assert_eq!(filter.map_note(64), 64);

        filter.set_note_mapping(64, 65);
        seq.set_event_filter(filter);
        assert_eq!(seq.event_filter().map_note(64), 65);
    }

    #[test]
    fn shutdown_stops_tracks() {
        let transport = MemoryTransport::with_outputs(&["synth"]);
        let mut seq = single_tone_sequencer(&transport, Config::default());
        let track = seq.track(0).unwrap();
        seq.play();

        seq.shutdown();
        seq.shutdown();
        assert_eq!(seq.track_count(), 0);
        assert!(track.beat_sender().send(0).is_err());
    }
}
