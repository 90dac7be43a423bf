use crate::parser::primitive_parser::{
    make_string, parse_be_u16, parse_be_u32, parse_chunk_tag, parse_u8, parse_vlq, peek_u8,
    take_bytes,
};
use crate::song::{Event, EventKind, Song, Track};
use crate::SmfError;
use nom::combinator::map;
use nom::error::{Error, ErrorKind};
use nom::{IResult, Offset, Parser};

// SMF docs at <https://www.midi.org/specifications/file-format-specifications/standard-midi-files>

pub const HEADER_SIGNATURE: &[u8; 4] = b"MThd";
pub const TRACK_SIGNATURE: &[u8; 4] = b"MTrk";
pub const HEADER_LENGTH: u32 = 6;

pub const META_EVENT: u8 = 0xFF;
pub const SYSEX_EVENT: u8 = 0xF0;

pub const META_SEQUENCE_NUMBER: u8 = 0x00;
pub const META_TEXT: u8 = 0x01;
pub const META_COPYRIGHT: u8 = 0x02;
pub const META_TRACK_NAME: u8 = 0x03;
pub const META_INSTRUMENT_NAME: u8 = 0x04;
pub const META_LYRIC: u8 = 0x05;
pub const META_MARKER: u8 = 0x06;
pub const META_CUE_POINT: u8 = 0x07;
pub const META_CHANNEL_PREFIX: u8 = 0x20;
pub const META_PORT_PREFIX: u8 = 0x21;
pub const META_END_OF_TRACK: u8 = 0x2F;
pub const META_SET_TEMPO: u8 = 0x51;
pub const META_SMPTE_OFFSET: u8 = 0x54;
pub const META_TIME_SIGNATURE: u8 = 0x58;
pub const META_KEY_SIGNATURE: u8 = 0x59;
pub const META_SEQUENCER_SPECIFIC: u8 = 0x7F;

/// Controllers 0x78..=0x7F are channel mode messages.
pub const FIRST_CHANNEL_MODE_CONTROLLER: u8 = 0x78;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MidiHeader {
    pub length: u32,
    /// Only logged, the writer always produces format 1.
    pub format: u16,
    pub track_count: u16,
    pub ticks_per_beat: u16,
}

pub fn meta_event_name(meta_type: u8) -> &'static str {
    match meta_type {
        META_SEQUENCE_NUMBER => "Sequence Number",
        META_TEXT => "Text",
        META_COPYRIGHT => "Copyright Notice",
        META_TRACK_NAME => "Sequence/Track Name",
        META_INSTRUMENT_NAME => "Instrument Name",
        META_LYRIC => "Lyric",
        META_MARKER => "Marker",
        META_CUE_POINT => "Cue Point",
        META_CHANNEL_PREFIX => "MIDI Channel Prefix",
        META_PORT_PREFIX => "MIDI Port Prefix",
        META_END_OF_TRACK => "End Of Track",
        META_SET_TEMPO => "Set Tempo",
        META_SMPTE_OFFSET => "SMPTE Offset",
        META_TIME_SIGNATURE => "Time Signature",
        META_KEY_SIGNATURE => "Key Signature",
        META_SEQUENCER_SPECIFIC => "Sequencer Specific",
        _ => "Unknown",
    }
}

/// Parse the `MThd` chunk.
///
/// The length is not validated, header bytes beyond the standard 6 are skipped.
pub fn parse_header(i: &[u8]) -> IResult<&[u8], MidiHeader> {
    log::debug!("Parsing header chunk");
    let (i, (_tag, length, format, track_count, ticks_per_beat)) = (
        parse_chunk_tag(HEADER_SIGNATURE),
        parse_be_u32,
        parse_be_u16,
        parse_be_u16,
        parse_be_u16,
    )
        .parse(i)?;
    if length != HEADER_LENGTH {
        log::debug!("Unusual header length {length}");
    }
    let (i, _extra) = take_bytes(length.saturating_sub(HEADER_LENGTH) as usize)(i)?;
    let header = MidiHeader {
        length,
        format,
        track_count,
        ticks_per_beat,
    };
    log::debug!("{header:?}");
    Ok((i, header))
}

/// Parse a `MTrk` chunk header and return exactly its payload.
pub fn parse_track_chunk(i: &[u8]) -> IResult<&[u8], &[u8]> {
    let (i, (_tag, length)) = (parse_chunk_tag(TRACK_SIGNATURE), parse_be_u32).parse(i)?;
    log::debug!("Track chunk of {length} bytes");
    take_bytes(length as usize)(i)
}

/// Parse a channel voice message whose status byte is already consumed.
pub fn parse_channel_message(status: u8) -> impl Fn(&[u8]) -> IResult<&[u8], EventKind> {
    move |i: &[u8]| {
        let channel = status & 0x0F;
        match status >> 4 {
            0x8 => map((parse_u8, parse_u8), |(key, velocity)| EventKind::NoteOff {
                channel,
                key,
                velocity,
            })
            .parse(i),
            0x9 => map((parse_u8, parse_u8), |(key, velocity)| EventKind::NoteOn {
                channel,
                key,
                velocity,
            })
            .parse(i),
            0xA => map((parse_u8, parse_u8), |(key, pressure)| {
                EventKind::KeyPressure {
                    channel,
                    key,
                    pressure,
                }
            })
            .parse(i),
            0xB => map((parse_u8, parse_u8), |(controller, value)| {
                if controller >= FIRST_CHANNEL_MODE_CONTROLLER {
                    // all sound off, reset, local control, all notes off, omni & mono/poly
                    log::trace!("Dropping channel mode message {controller:#04X}");
                    EventKind::Delay
                } else {
                    EventKind::ControlChange {
                        channel,
                        controller,
                        value,
                    }
                }
            })
            .parse(i),
            0xC => map(parse_u8, |program| EventKind::ProgramChange { channel, program }).parse(i),
            0xD => map(parse_u8, |pressure| EventKind::ChannelPressure { channel, pressure })
                .parse(i),
            // LSB first
            0xE => map((parse_u8, parse_u8), |(lsb, msb)| EventKind::PitchBend {
                channel,
                value: u16::from(lsb) | (u16::from(msb) << 8),
            })
            .parse(i),
            _ => {
                log::error!("Unsupported MIDI message with status {status:#04X}");
                Err(nom::Err::Failure(Error::new(i, ErrorKind::Switch)))
            }
        }
    }
}

/// Parse a meta event whose `0xFF` status is already consumed.
///
/// Only the tempo is retained, every other meta event becomes a [`EventKind::Delay`].
/// An end of track without delay yields nothing, the writer appends its own.
pub fn parse_meta_event(delay: u32) -> impl Fn(&[u8]) -> IResult<&[u8], Option<Event>> {
    move |i: &[u8]| {
        let (i, (meta_type, length)) = (parse_u8, parse_vlq).parse(i)?;
        let (i, data) = take_bytes(length as usize)(i)?;
        let event = match meta_type {
            META_SET_TEMPO => {
                if data.len() < 3 {
                    log::error!("Set tempo payload too short: {} bytes", data.len());
                    return Err(nom::Err::Failure(Error::new(data, ErrorKind::LengthValue)));
                }
                let tempo =
                    u32::from(data[0]) << 16 | u32::from(data[1]) << 8 | u32::from(data[2]);
                log::trace!("Set tempo {tempo} at delay {delay}");
                Some(Event::set_tempo(delay, tempo))
            }
            META_END_OF_TRACK if delay == 0 => None,
            META_TEXT..=META_CUE_POINT => {
                log::debug!("{}: {}", meta_event_name(meta_type), make_string(data));
                Some(Event::delay(delay))
            }
            _ => {
                log::debug!(
                    "Discarding meta event {meta_type:#04X} ({}) of {length} bytes",
                    meta_event_name(meta_type)
                );
                Some(Event::delay(delay))
            }
        };
        Ok((i, event))
    }
}

/// Parse a system exclusive event whose `0xF0` status is already consumed.
pub fn parse_sysex_event(delay: u32) -> impl Fn(&[u8]) -> IResult<&[u8], Option<Event>> {
    move |i: &[u8]| {
        let (i, length) = parse_vlq(i)?;
        log::debug!("Discarding system exclusive message of {length} bytes");
        let (i, _payload) = take_bytes(length as usize)(i)?;
        Ok((i, Some(Event::delay(delay))))
    }
}

/// Track level parser holding the running status.
pub struct MidiParser {
    running_status: u8,
}

impl Default for MidiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiParser {
    pub const fn new() -> Self {
        Self { running_status: 0 }
    }

    /// Status of the last decoded event, explicit or inherited.
    pub const fn running_status(&self) -> u8 {
        self.running_status
    }

    /// Decode all the events of a track payload.
    ///
    /// The payload must end exactly on an event boundary.
    pub fn parse_track_events<'a>(&mut self, i: &'a [u8]) -> IResult<&'a [u8], Track> {
        self.running_status = 0;
        let mut i = i;
        let mut events = Vec::new();
        while !i.is_empty() {
            let (rest, event) = self.parse_event(i)?;
            i = rest;
            if let Some(event) = event {
                log::trace!("{event:?}");
                events.push(event);
            }
        }
        log::debug!("Parsed {} events", events.len());
        Ok((i, Track::new(events)))
    }

    pub fn parse_event<'a>(&mut self, i: &'a [u8]) -> IResult<&'a [u8], Option<Event>> {
        let (i, delay) = parse_vlq(i)?;
        let (i, status) = self.parse_status(i)?;
        match status {
            META_EVENT => parse_meta_event(delay)(i),
            SYSEX_EVENT => parse_sysex_event(delay)(i),
            _ => map(parse_channel_message(status), |kind| {
                Some(Event::new(delay, kind))
            })
            .parse(i),
        }
    }

    /// A byte without the high bit is the first data byte of an event
    /// reusing the previous status, it is left in the input.
    ///
    /// An unsupported status fails on its own position, before it is consumed.
    fn parse_status<'a>(&mut self, i: &'a [u8]) -> IResult<&'a [u8], u8> {
        let (_, byte) = peek_u8(i)?;
        if byte & 0x80 == 0 {
            log::trace!("Running status {:#04X}", self.running_status);
            return Ok((i, self.running_status));
        }
        self.running_status = byte;
        if !is_supported_status(byte) {
            log::error!("Unsupported MIDI message with status {byte:#04X}");
            return Err(nom::Err::Failure(Error::new(i, ErrorKind::Switch)));
        }
        parse_u8(i)
    }
}

/// Meta, system exclusive and channel voice messages are the only statuses decoded.
const fn is_supported_status(status: u8) -> bool {
    matches!(status, META_EVENT | SYSEX_EVENT | 0x80..=0xEF)
}

fn parsing_error(
    file_data: &[u8],
    context: &str,
    status: u8,
    err: nom::Err<Error<&[u8]>>,
) -> SmfError {
    match err {
        nom::Err::Error(e) | nom::Err::Failure(e) => {
            let offset = file_data.offset(e.input);
            if e.code == ErrorKind::Switch {
                return SmfError::UnsupportedMessage { status, offset };
            }
            log::error!("Failed to parse {context} at offset {offset}: {:?}", e.code);
            SmfError::ParsingError(format!(
                "Failed to parse {context} at offset {offset}: {:?}",
                e.code
            ))
        }
        nom::Err::Incomplete(_) => {
            SmfError::ParsingError(format!("Failed to parse {context}: incomplete data"))
        }
    }
}

/// Parse a whole Standard MIDI File held in memory.
pub fn parse_midi_data(file_data: &[u8]) -> Result<Song, SmfError> {
    let (mut i, header) =
        parse_header(file_data).map_err(|e| parsing_error(file_data, "header", 0, e))?;
    log::debug!(
        "Format {} with {} tracks at {} ticks per beat",
        header.format,
        header.track_count,
        header.ticks_per_beat
    );

    let mut parser = MidiParser::new();
    let mut tracks = Vec::with_capacity(usize::from(header.track_count));
    for index in 0..header.track_count {
        log::debug!("Parsing track {index}");
        let context = format!("track {index}");
        let (rest, chunk) =
            parse_track_chunk(i).map_err(|e| parsing_error(file_data, &context, 0, e))?;
        let (_, track) = parser
            .parse_track_events(chunk)
            .map_err(|e| parsing_error(file_data, &context, parser.running_status(), e))?;
        tracks.push(track);
        i = rest;
    }

    if !i.is_empty() {
        log::debug!("Ignoring {} trailing bytes", i.len());
    }
    Ok(Song::new(header.ticks_per_beat, tracks))
}
