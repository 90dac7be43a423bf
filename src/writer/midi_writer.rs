use crate::parser::midi_parser::{
    HEADER_LENGTH, HEADER_SIGNATURE, META_END_OF_TRACK, META_EVENT, META_MARKER, META_SET_TEMPO,
    TRACK_SIGNATURE,
};
use crate::song::{Event, EventKind, Song, Track, MAX_CHANNEL, MAX_TEMPO};
use crate::writer::primitive_writer::{patch_be_u32, write_be_u16, write_be_u32, write_vlq};
use crate::SmfError;

/// Multi track, the only format written.
pub const FORMAT_MULTI_TRACK: u16 = 1;

const NOTE_OFF: u8 = 0x80;
const NOTE_ON: u8 = 0x90;
const CONTROL_CHANGE: u8 = 0xB0;
const PROGRAM_CHANGE: u8 = 0xC0;
const PITCH_BEND: u8 = 0xE0;

const MAX_DATA_BYTE: u8 = 0x7F;

fn status_byte(message: u8, channel: u8) -> Result<u8, SmfError> {
    if channel > MAX_CHANNEL {
        return Err(SmfError::EncodingError(format!(
            "channel {channel} does not fit in a status byte"
        )));
    }
    Ok(message | channel)
}

/// Data bytes of the 7 bit fields must not look like a status.
fn data_byte(field: &str, value: u8) -> Result<u8, SmfError> {
    if value > MAX_DATA_BYTE {
        return Err(SmfError::EncodingError(format!(
            "{field} {value} does not fit in 7 bits"
        )));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy)]
pub struct MidiWriter {
    running_status: bool,
}

impl Default for MidiWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MidiWriter {
    pub const fn new() -> Self {
        Self {
            running_status: true,
        }
    }

    /// Omit repeated status bytes (enabled by default).
    pub const fn with_running_status(mut self, enabled: bool) -> Self {
        self.running_status = enabled;
        self
    }

    pub fn write_song(&self, song: &Song) -> Result<Vec<u8>, SmfError> {
        let mut out = Vec::with_capacity(14 + song.event_count() * 4);
        write_header(&mut out, song.tracks.len(), song.ticks_per_beat)?;
        for (index, track) in song.tracks.iter().enumerate() {
            log::debug!(
                "Writing track {index} with {} events over {} ticks",
                track.events.len(),
                track.duration()
            );
            self.write_track(&mut out, track)?;
        }
        Ok(out)
    }

    /// Write a `MTrk` chunk, its length is patched once all the events are written.
    pub fn write_track(&self, out: &mut Vec<u8>, track: &Track) -> Result<(), SmfError> {
        out.extend_from_slice(TRACK_SIGNATURE);
        let length_position = out.len();
        write_be_u32(out, 0);
        let start = out.len();

        // no status can match before the first event
        let mut last = None;
        for event in &track.events {
            self.write_event(out, event, &mut last)?;
        }

        // end of track
        write_vlq(out, 0)?;
        out.extend_from_slice(&[META_EVENT, META_END_OF_TRACK]);
        write_vlq(out, 0)?;

        let end = out.len();
        let length = u32::try_from(end - start).map_err(|_| {
            SmfError::EncodingError("track chunk size exceeds 32 bit range".to_string())
        })?;
        log::debug!("Track chunk of {length} bytes");
        patch_be_u32(out, length_position, length);
        Ok(())
    }

    fn write_event(
        &self,
        out: &mut Vec<u8>,
        event: &Event,
        last: &mut Option<u8>,
    ) -> Result<(), SmfError> {
        write_vlq(out, event.delay)?;
        match event.kind {
            EventKind::NoteOn {
                channel,
                key,
                velocity,
            } => {
                let status = status_byte(NOTE_ON, channel)?;
                let data = [data_byte("key", key)?, data_byte("velocity", velocity)?];
                self.write_channel_message(out, last, status, &data);
            }
            EventKind::NoteOff {
                channel,
                key,
                velocity,
            } => {
                let status = status_byte(NOTE_OFF, channel)?;
                let data = [data_byte("key", key)?, data_byte("velocity", velocity)?];
                self.write_channel_message(out, last, status, &data);
            }
            EventKind::ControlChange {
                channel,
                controller,
                value,
            } => {
                let status = status_byte(CONTROL_CHANGE, channel)?;
                let data = [
                    data_byte("controller", controller)?,
                    data_byte("value", value)?,
                ];
                self.write_channel_message(out, last, status, &data);
            }
            EventKind::ProgramChange { channel, program } => {
                let status = status_byte(PROGRAM_CHANGE, channel)?;
                let data = [data_byte("program", program)?];
                self.write_channel_message(out, last, status, &data);
            }
            // LSB first, not limited to 14 bits
            EventKind::PitchBend { channel, value } => {
                let status = status_byte(PITCH_BEND, channel)?;
                self.write_channel_message(out, last, status, &value.to_le_bytes());
            }
            EventKind::SetTempo { micros_per_quarter } => {
                if micros_per_quarter > MAX_TEMPO {
                    return Err(SmfError::EncodingError(format!(
                        "tempo {micros_per_quarter} does not fit in 3 bytes"
                    )));
                }
                out.extend_from_slice(&[META_EVENT, META_SET_TEMPO]);
                write_vlq(out, 3)?;
                out.extend_from_slice(&micros_per_quarter.to_be_bytes()[1..]);
                *last = Some(META_EVENT);
            }
            EventKind::Delay | EventKind::KeyPressure { .. } | EventKind::ChannelPressure { .. } => {
                // empty marker keeps the delay
                out.extend_from_slice(&[META_EVENT, META_MARKER]);
                write_vlq(out, 0)?;
                *last = Some(META_EVENT);
            }
        }
        Ok(())
    }

    fn write_channel_message(
        &self,
        out: &mut Vec<u8>,
        last: &mut Option<u8>,
        status: u8,
        data: &[u8],
    ) {
        // a leading data byte with the high bit set would read as a status
        let needs_status = data.first().is_some_and(|byte| byte & 0x80 != 0);
        if !self.running_status || *last != Some(status) || needs_status {
            out.push(status);
        }
        out.extend_from_slice(data);
        *last = Some(status);
    }
}

/// Write the `MThd` chunk.
pub fn write_header(
    out: &mut Vec<u8>,
    track_count: usize,
    ticks_per_beat: u16,
) -> Result<(), SmfError> {
    let track_count = u16::try_from(track_count).map_err(|_| {
        SmfError::EncodingError(format!("track count {track_count} exceeds 16 bit range"))
    })?;
    out.extend_from_slice(HEADER_SIGNATURE);
    write_be_u32(out, HEADER_LENGTH);
    write_be_u16(out, FORMAT_MULTI_TRACK);
    write_be_u16(out, track_count);
    write_be_u16(out, ticks_per_beat);
    Ok(())
}

/// Serialize a song into a Standard MIDI File using running status.
pub fn write_midi_data(song: &Song) -> Result<Vec<u8>, SmfError> {
    MidiWriter::new().write_song(song)
}
