use crate::SmfError;

/// Largest tempo storable in the 3 byte payload of a set tempo meta event.
pub const MAX_TEMPO: u32 = 0x00FF_FFFF;

/// Highest MIDI channel number (channels are 0 based).
pub const MAX_CHANNEL: u8 = 0x0F;

/// Default tempo of a MIDI file (120 BPM).
pub const DEFAULT_TEMPO: u32 = 500_000;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Song {
    /// Time resolution declared in the file header.
    pub ticks_per_beat: u16,
    pub tracks: Vec<Track>,
}

impl Song {
    pub const fn new(ticks_per_beat: u16, tracks: Vec<Track>) -> Self {
        Self {
            ticks_per_beat,
            tracks,
        }
    }

    pub fn event_count(&self) -> usize {
        self.tracks.iter().map(|t| t.events.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Track {
    /// Events in playback order.
    pub events: Vec<Event>,
}

impl Track {
    pub const fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    /// Sum of all the delays of the track.
    pub fn duration(&self) -> u64 {
        self.events.iter().map(|e| u64::from(e.delay)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Ticks since the previous event of the same track.
    pub delay: u32,
    pub kind: EventKind,
}

impl Event {
    pub const fn new(delay: u32, kind: EventKind) -> Self {
        Self { delay, kind }
    }

    pub const fn delay(delay: u32) -> Self {
        Self::new(delay, EventKind::Delay)
    }

    pub const fn note_on(delay: u32, channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(
            delay,
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            },
        )
    }

    pub const fn note_off(delay: u32, channel: u8, key: u8, velocity: u8) -> Self {
        Self::new(
            delay,
            EventKind::NoteOff {
                channel,
                key,
                velocity,
            },
        )
    }

    pub const fn set_tempo(delay: u32, micros_per_quarter: u32) -> Self {
        Self::new(delay, EventKind::SetTempo { micros_per_quarter })
    }
}

/// Every kind of event the model retains.
///
/// Meta events other than the tempo, system exclusive messages and channel mode
/// messages are all collapsed into [`EventKind::Delay`], only their timing survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    KeyPressure { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// The value is not clamped to 14 bits.
    PitchBend { channel: u8, value: u16 },
    SetTempo { micros_per_quarter: u32 },
    Delay,
}

impl EventKind {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NoteOn { .. } => "NoteOn",
            Self::NoteOff { .. } => "NoteOff",
            Self::KeyPressure { .. } => "KeyPressure",
            Self::ControlChange { .. } => "ControlChange",
            Self::ProgramChange { .. } => "ProgramChange",
            Self::ChannelPressure { .. } => "ChannelPressure",
            Self::PitchBend { .. } => "PitchBend",
            Self::SetTempo { .. } => "SetTempo",
            Self::Delay => "Delay",
        }
    }

    pub const fn channel(&self) -> Option<u32> {
        match *self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::KeyPressure { channel, .. }
            | Self::ControlChange { channel, .. }
            | Self::ProgramChange { channel, .. }
            | Self::ChannelPressure { channel, .. }
            | Self::PitchBend { channel, .. } => Some(channel as u32),
            Self::SetTempo { .. } | Self::Delay => None,
        }
    }

    /// First payload field.
    pub const fn value(&self) -> Option<u32> {
        match *self {
            Self::NoteOn { key, .. } | Self::NoteOff { key, .. } | Self::KeyPressure { key, .. } => {
                Some(key as u32)
            }
            Self::ControlChange { controller, .. } => Some(controller as u32),
            Self::ProgramChange { program, .. } => Some(program as u32),
            Self::ChannelPressure { pressure, .. } => Some(pressure as u32),
            Self::PitchBend { value, .. } => Some(value as u32),
            Self::SetTempo { micros_per_quarter } => Some(micros_per_quarter),
            Self::Delay => None,
        }
    }

    /// Second payload field, only for the two data bytes messages.
    pub const fn value2(&self) -> Option<u32> {
        match *self {
            Self::NoteOn { velocity, .. } | Self::NoteOff { velocity, .. } => Some(velocity as u32),
            Self::KeyPressure { pressure, .. } => Some(pressure as u32),
            Self::ControlChange { value, .. } => Some(value as u32),
            Self::ProgramChange { .. }
            | Self::ChannelPressure { .. }
            | Self::PitchBend { .. }
            | Self::SetTempo { .. }
            | Self::Delay => None,
        }
    }

    /// Build an event kind from its generic attributes.
    ///
    /// Fails on an unknown name, a missing attribute or an out of range value.
    /// Attributes not used by the variant are ignored.
    pub fn from_parts(
        name: &str,
        channel: Option<u32>,
        value: Option<u32>,
        value2: Option<u32>,
    ) -> Result<Self, SmfError> {
        let parse_channel = || -> Result<u8, SmfError> {
            let c = required(name, "channel", channel)?;
            narrow(name, "channel", c, u32::from(MAX_CHANNEL))
        };
        let data = |field: &str, v: Option<u32>| -> Result<u8, SmfError> {
            narrow(name, field, required(name, field, v)?, 0x7F)
        };
        let kind = match name {
            "NoteOn" => Self::NoteOn {
                channel: parse_channel()?,
                key: data("value", value)?,
                velocity: data("value2", value2)?,
            },
            "NoteOff" => Self::NoteOff {
                channel: parse_channel()?,
                key: data("value", value)?,
                velocity: data("value2", value2)?,
            },
            "KeyPressure" => Self::KeyPressure {
                channel: parse_channel()?,
                key: data("value", value)?,
                pressure: data("value2", value2)?,
            },
            "ControlChange" => Self::ControlChange {
                channel: parse_channel()?,
                controller: data("value", value)?,
                value: data("value2", value2)?,
            },
            "ProgramChange" => Self::ProgramChange {
                channel: parse_channel()?,
                program: data("value", value)?,
            },
            "ChannelPressure" => Self::ChannelPressure {
                channel: parse_channel()?,
                pressure: data("value", value)?,
            },
            "PitchBend" => {
                let v = required(name, "value", value)?;
                let value = u16::try_from(v).map_err(|_| out_of_range(name, "value", v))?;
                Self::PitchBend {
                    channel: parse_channel()?,
                    value,
                }
            }
            "SetTempo" => {
                let v = required(name, "value", value)?;
                if v > MAX_TEMPO {
                    return Err(out_of_range(name, "value", v));
                }
                Self::SetTempo {
                    micros_per_quarter: v,
                }
            }
            "Delay" => Self::Delay,
            unknown => {
                return Err(SmfError::ParsingError(format!(
                    "Unknown event type '{unknown}'"
                )))
            }
        };
        Ok(kind)
    }
}

fn required(name: &str, field: &str, v: Option<u32>) -> Result<u32, SmfError> {
    v.ok_or_else(|| SmfError::ParsingError(format!("{name} event requires a '{field}'")))
}

fn narrow(name: &str, field: &str, v: u32, max: u32) -> Result<u8, SmfError> {
    if v > max {
        return Err(out_of_range(name, field, v));
    }
    u8::try_from(v).map_err(|_| out_of_range(name, field, v))
}

fn out_of_range(name: &str, field: &str, v: u32) -> SmfError {
    SmfError::ParsingError(format!("{name} event has out of range '{field}': {v}"))
}
