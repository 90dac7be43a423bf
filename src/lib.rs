//! Smfxml - Standard MIDI File codec and XML converter
//!
//! This library provides:
//! - Parsing of Standard MIDI Files into a simple event model
//! - Writing the event model back into a Standard MIDI File
//! - An editable XML representation of the same model
//!
//! # Example
//!
//! ```no_run
//! use smfxml::{parse_midi_data, write_xml_data};
//!
//! let file_data = std::fs::read("song.mid").unwrap();
//! let song = parse_midi_data(&file_data).unwrap();
//! let xml = write_xml_data(&song);
//! std::fs::write("song.xml", xml).unwrap();
//! ```

pub mod error;
pub mod parser;
pub mod song;
pub mod writer;

// Re-export main types for convenience
pub use error::SmfError;
pub use parser::{midi_parser::parse_midi_data, xml_parser::parse_xml_data};
pub use song::{Event, EventKind, Song, Track, DEFAULT_TEMPO, MAX_TEMPO};
pub use writer::{
    midi_writer::{write_midi_data, MidiWriter},
    primitive_writer::MAX_QUANTITY,
    xml_writer::{write_xml_data, write_xml_data_with_indent, XmlDocument},
};
