mod scheduler;
mod sequencer;
mod track;

pub use scheduler::{DispatchRule, Outputs, dispatch_due, queue_event};
pub use sequencer::{PlaybackStatus, Sequencer, SequencerSnapshot};
pub use track::{LineSnapshot, Track, TrackLine, TrackSnapshot};
