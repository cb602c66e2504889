/// A three-byte channel message as written to an output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiMessage {
    pub status: u8,
    pub data1: u8,
    pub data2: u8,
}

impl MidiMessage {
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xb0;

    pub const fn new(status: u8, data1: u8, data2: u8) -> Self {
        Self {
            status,
            data1,
            data2,
        }
    }

    pub fn note_on(channel: u8, note: u8, velocity: u8) -> Self {
        Self {
            status: Self::NOTE_ON | (channel & 0x0f),
            data1: note,
            data2: velocity,
        }
    }

    pub fn control_change(channel: u8, number: u8, value: u8) -> Self {
        Self {
            status: Self::CONTROL_CHANGE | (channel & 0x0f),
            data1: number,
            data2: value,
        }
    }

    /// Same channel and data1, note-off status, zero velocity.
    pub fn to_note_off(self) -> Self {
        Self {
            status: Self::NOTE_OFF | (self.status & 0x0f),
            data1: self.data1,
            data2: 0,
        }
    }

    pub fn channel(&self) -> u8 {
        self.status & 0x0f
    }

    pub fn bytes(&self) -> [u8; 3] {
        [self.status, self.data1, self.data2]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Tone {
        notes: Vec<u8>,
        volume: u8,
        /// Length in track-local beats before the release fires
        beat_len: u64,
    },
    Percussion {
        notes: Vec<u8>,
        volume: u8,
    },
    Control {
        number: u8,
        value: u8,
    },
    /// Carries precomputed messages and/or a sysex payload.
    Raw,
    /// Opaque payload, never turned into messages.
    Code {
        code: String,
    },
}

/// A message template bound to a device and channel, due at `play_at_beat`.
///
/// `messages` and the sysex bytes are derived: `expand` rebuilds the
/// messages from the kind, and `set_sysex_payload` keeps the numeric
/// values and the packed bytes together. Cloning copies every sequence
/// into fresh storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub play_at_beat: u64,
    pub device_name: String,
    pub description: String,
    channel: u8,
    kind: EventKind,
    messages: Vec<MidiMessage>,
    sysex_values: Vec<u32>,
    sysex_bytes: Vec<u8>,
}

impl Event {
    pub fn new(device_name: impl Into<String>, channel: u8, kind: EventKind) -> Self {
        let mut event = Self {
            play_at_beat: 0,
            device_name: device_name.into(),
            description: String::new(),
            channel: channel & 0x0f,
            kind,
            messages: Vec::new(),
            sysex_values: Vec::new(),
            sysex_bytes: Vec::new(),
        };
        event.expand();
        event
    }

    pub fn tone(
        device_name: impl Into<String>,
        channel: u8,
        notes: Vec<u8>,
        volume: u8,
        beat_len: u64,
    ) -> Self {
        Self::new(
            device_name,
            channel,
            EventKind::Tone {
                notes,
                volume,
                beat_len,
            },
        )
    }

    pub fn percussion(
        device_name: impl Into<String>,
        channel: u8,
        notes: Vec<u8>,
        volume: u8,
    ) -> Self {
        let kind = EventKind::Percussion { notes, volume };
        Self::new(device_name, channel, kind)
    }

    pub fn control(device_name: impl Into<String>, channel: u8, number: u8, value: u8) -> Self {
        Self::new(device_name, channel, EventKind::Control { number, value })
    }

    pub fn raw(device_name: impl Into<String>, messages: Vec<MidiMessage>) -> Self {
        let mut event = Self::new(device_name, 0, EventKind::Raw);
        event.messages = messages;
        event
    }

    pub fn code(device_name: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(device_name, 0, EventKind::Code { code: code.into() })
    }

    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    pub fn set_kind(&mut self, kind: EventKind) {
        self.kind = kind;
        self.expand();
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn set_channel(&mut self, channel: u8) {
        self.channel = channel & 0x0f;
        self.expand();
    }

    pub fn notes(&self) -> &[u8] {
        match &self.kind {
            EventKind::Tone { notes, .. } | EventKind::Percussion { notes, .. } => notes,
            _ => &[],
        }
    }

    pub fn beat_len(&self) -> u64 {
        match self.kind {
            EventKind::Tone { beat_len, .. } => beat_len,
            _ => 0,
        }
    }

    pub fn messages(&self) -> &[MidiMessage] {
        &self.messages
    }

    pub fn sysex_values(&self) -> &[u32] {
        &self.sysex_values
    }

    pub fn sysex_bytes(&self) -> &[u8] {
        &self.sysex_bytes
    }

    pub fn is_tone(&self) -> bool {
        matches!(self.kind, EventKind::Tone { .. })
    }

    /// True when dispatching this event writes anything to a device.
    pub fn has_output(&self) -> bool {
        !self.messages.is_empty() || !self.sysex_bytes.is_empty()
    }

    /// Rebuilds `messages` from the kind. Raw events keep the messages
    /// they were built with.
    pub fn expand(&mut self) {
        match &self.kind {
            EventKind::Tone { notes, volume, .. } | EventKind::Percussion { notes, volume, .. } => {
                self.messages = notes
                    .iter()
                    .map(|&note| MidiMessage::note_on(self.channel, note, *volume))
                    .collect();
            }
            EventKind::Control { number, value } => {
                self.messages = vec![MidiMessage::control_change(self.channel, *number, *value)];
            }
            EventKind::Raw => {}
            EventKind::Code { .. } => self.messages.clear(),
        }
    }

    /// Copy of this event with every message turned into a note-off,
    /// due `beat_len * beat_divisor` global beats later. The due beat
    /// saturates at `u64::MAX`.
    pub fn derive_release(&self, beat_divisor: u64) -> Event {
        let mut release = self.clone();
        for message in &mut release.messages {
            *message = message.to_note_off();
        }
        release.play_at_beat = release
            .play_at_beat
            .saturating_add(self.beat_len().saturating_mul(beat_divisor));
        release
    }

    /// Stores the values and their packed byte form. Each value keeps
    /// only its low byte.
    pub fn set_sysex_payload(&mut self, values: Vec<u32>) {
        self.sysex_bytes = values.iter().map(|v| (v & 0xff) as u8).collect();
        self.sysex_values = values;
    }
}

/// An event forwarded by a track, along with the divisor it fired under.
#[derive(Debug, Clone)]
pub struct FiredEvent {
    pub event: Event,
    pub beat_divisor: u64,
}
