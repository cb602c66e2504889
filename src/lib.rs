pub mod config;
pub mod error;
pub mod events;
pub mod filter;
pub mod timing;
pub mod transport;
pub mod ui;

pub use config::Config;
pub use error::{ConfigError, Error, Result, TransportError};
pub use events::{Event, EventKind, FiredEvent, MidiMessage};
pub use filter::EventFilter;
pub use timing::{
    DispatchRule, PlaybackStatus, Sequencer, SequencerSnapshot, Track, TrackLine, TrackSnapshot,
};
pub use transport::{MidirTransport, OutputInfo, OutputStream, Transport};
pub use ui::{Action, SequencerView};
