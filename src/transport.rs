use crate::error::TransportError;
use crate::events::MidiMessage;
use midir::{MidiOutput, MidiOutputConnection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputInfo {
    pub index: usize,
    pub name: String,
    pub available: bool,
}

/// Source of output devices.
pub trait Transport: Send + Sync {
    fn outputs(&self) -> Result<Vec<OutputInfo>, TransportError>;

    fn open(&self, output: &OutputInfo) -> Result<Box<dyn OutputStream>, TransportError>;
}

/// An open output device.
pub trait OutputStream: Send {
    fn write_short(&mut self, message: MidiMessage) -> Result<(), TransportError>;

    fn write_sysex(&mut self, timestamp: u64, payload: &[u8]) -> Result<(), TransportError>;
}

pub struct MidirTransport {
    client_name: String,
}

impl MidirTransport {
    pub fn new(client_name: impl Into<String>) -> Self {
        Self {
            client_name: client_name.into(),
        }
    }

    fn client(&self) -> Result<MidiOutput, TransportError> {
        MidiOutput::new(&self.client_name)
            .map_err(|e| TransportError::Init(e.to_string()))
    }
}

impl Transport for MidirTransport {
    fn outputs(&self) -> Result<Vec<OutputInfo>, TransportError> {
        let midi_out = self.client()?;
        Ok(midi_out
            .ports()
            .iter()
            .enumerate()
            .map(|(index, port)| match midi_out.port_name(port) {
                Ok(name) => OutputInfo {
                    index,
                    name,
                    available: true,
                },
                Err(_) => OutputInfo {
                    index,
                    name: String::new(),
                    available: false,
                },
            })
            .collect())
    }

    fn open(&self, output: &OutputInfo) -> Result<Box<dyn OutputStream>, TransportError> {
        let open_error = |reason: String| TransportError::Open {
            name: output.name.clone(),
            reason,
        };

        let midi_out = self.client()?;
        let ports = midi_out.ports();
        let port = ports
            .get(output.index)
            .filter(|p| midi_out.port_name(p).is_ok_and(|name| name == output.name))
            .ok_or_else(|| open_error("port disappeared".to_string()))?;

        let connection = midi_out
            .connect(port, &self.client_name)
            .map_err(|e| open_error(e.to_string()))?;

        Ok(Box::new(MidirStream {
            name: output.name.clone(),
            connection,
        }))
    }
}

struct MidirStream {
    name: String,
    connection: MidiOutputConnection,
}

impl MidirStream {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.connection
            .send(bytes)
            .map_err(|e| TransportError::Write {
                name: self.name.clone(),
                reason: e.to_string(),
            })
    }
}

impl OutputStream for MidirStream {
    fn write_short(&mut self, message: MidiMessage) -> Result<(), TransportError> {
        self.send(&message.bytes())
    }

    // midir sends immediately, so the timestamp has nowhere to go
    fn write_sysex(&mut self, _timestamp: u64, payload: &[u8]) -> Result<(), TransportError> {
        self.send(payload)
    }
}
