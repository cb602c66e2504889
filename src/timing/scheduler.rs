use crate::error::TransportError;
use crate::events::{Event, EventKind, FiredEvent};
use crate::transport::OutputStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

pub type Outputs = HashMap<String, Box<dyn OutputStream>>;

/// Which pending entries a dispatch scan sends out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DispatchRule {
    /// Everything not strictly before the current beat, future entries included.
    /// Entries stamped with an earlier beat never go out, so the pending queue
    /// keeps growing during play until the next stop.
    #[default]
    NotBeforeCurrent,
    /// Only entries whose beat has been reached; later ones wait.
    Due,
}

impl DispatchRule {
    pub fn should_dispatch(self, play_at_beat: u64, current_beat: u64) -> bool {
        match self {
            DispatchRule::NotBeforeCurrent => play_at_beat >= current_beat,
            DispatchRule::Due => play_at_beat <= current_beat,
        }
    }
}

/// Expands a fired event into the pending queue. Tones also queue their
/// release.
pub fn queue_event(pending: &mut Vec<Event>, fired: FiredEvent) {
    let FiredEvent {
        mut event,
        beat_divisor,
    } = fired;

    match event.kind() {
        EventKind::Tone { .. } => {
            event.expand();
            let release = event.derive_release(beat_divisor);
            pending.push(event);
            pending.push(release);
        }
        EventKind::Percussion { .. } | EventKind::Control { .. } => {
            event.expand();
            pending.push(event);
        }
        EventKind::Raw | EventKind::Code { .. } => pending.push(event),
    }
}

/// Removes every entry the rule selects and writes it out. Entries for
/// unknown devices or failed writes are logged and still consumed.
/// Selected entries go out in beat order. Returns how many entries were
/// taken off the queue.
pub fn dispatch_due(
    pending: &mut Vec<Event>,
    current_beat: u64,
    rule: DispatchRule,
    outputs: &mut Outputs,
) -> usize {
    let (mut due, waiting): (Vec<Event>, Vec<Event>) = pending
        .drain(..)
        .partition(|event| rule.should_dispatch(event.play_at_beat, current_beat));
    *pending = waiting;
    due.sort_by_key(|event| event.play_at_beat);

    for event in &due {
        if event.has_output() {
            if let Err(e) = write_event(event, outputs) {
                warn!(beat = current_beat, device = %event.device_name, "dispatch failed: {}", e);
            }
        }
        if let EventKind::Code { code } = event.kind() {
            debug!(
                beat = current_beat,
                len = code.len(),
                "code payload not executed"
            );
        }
    }

    if !due.is_empty() {
        debug!(
            beat = current_beat,
            count = due.len(),
            "dispatched events"
        );
    }
    due.len()
}

fn write_event(event: &Event, outputs: &mut Outputs) -> Result<(), TransportError> {
    let stream = outputs
        .get_mut(&event.device_name)
        .ok_or_else(|| TransportError::Unregistered(event.device_name.clone()))?;

    // Later messages are still attempted after a failed write
    let mut first_error = None;
    for message in event.messages() {
        if let Err(e) = stream.write_short(*message) {
            first_error.get_or_insert(e);
        }
    }
    if !event.sysex_bytes().is_empty() {
        if let Err(e) = stream.write_sysex(0, event.sysex_bytes()) {
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
