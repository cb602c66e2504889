use std::collections::HashMap;

/// Remapping stage between authored events and emitted messages.
///
/// Both tables start as identity maps over 0..=127. Nothing in dispatch
/// consults the filter yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    note_map: HashMap<u8, u8>,
    control_map: HashMap<u8, u8>,
}

impl EventFilter {
    pub fn new() -> Self {
        let identity: HashMap<u8, u8> = (0..128).map(|i| (i, i)).collect();
        Self {
            note_map: identity.clone(),
            control_map: identity,
        }
    }

    pub fn map_note(&self, note: u8) -> u8 {
        self.note_map.get(&note).copied().unwrap_or(note)
    }

    pub fn map_control(&self, control: u8) -> u8 {
        self.control_map.get(&control).copied().unwrap_or(control)
    }

    pub fn set_note_mapping(&mut self, from: u8, to: u8) {
        self.note_map.insert(from, to);
    }

    pub fn set_control_mapping(&mut self, from: u8, to: u8) {
        self.control_map.insert(from, to);
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::new()
    }
}
