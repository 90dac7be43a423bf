use crate::song::{Event, Song};
use std::fmt;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

pub const DEFAULT_INDENT: &str = "\t";

/// Textual rendering of a song.
///
/// ```text
/// <midi ticksPerBeat="480">
///     <track>
///         <event delay="0" type="NoteOn" channel="0" value="60" value2="100" />
///     </track>
/// </midi>
/// ```
pub struct XmlDocument<'a> {
    song: &'a Song,
    indent: &'a str,
}

impl<'a> XmlDocument<'a> {
    pub const fn new(song: &'a Song, indent: &'a str) -> Self {
        Self { song, indent }
    }

    fn fmt_event(&self, f: &mut fmt::Formatter, event: &Event) -> fmt::Result {
        let kind = &event.kind;
        write!(
            f,
            "{0}{0}<event delay=\"{1}\" type=\"{2}\"",
            self.indent,
            event.delay,
            kind.name()
        )?;
        // absent fields are not written at all
        let fields = [
            ("channel", kind.channel()),
            ("value", kind.value()),
            ("value2", kind.value2()),
        ];
        for (name, value) in fields {
            if let Some(value) = value {
                write!(f, " {name}=\"{value}\"")?;
            }
        }
        writeln!(f, " />")
    }
}

impl fmt::Display for XmlDocument<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{XML_DECLARATION}")?;
        let ticks_per_beat = self.song.ticks_per_beat;
        if self.song.tracks.is_empty() {
            return writeln!(f, "<midi ticksPerBeat=\"{ticks_per_beat}\" />");
        }
        writeln!(f, "<midi ticksPerBeat=\"{ticks_per_beat}\">")?;
        for track in &self.song.tracks {
            if track.events.is_empty() {
                writeln!(f, "{}<track />", self.indent)?;
                continue;
            }
            writeln!(f, "{}<track>", self.indent)?;
            for event in &track.events {
                self.fmt_event(f, event)?;
            }
            writeln!(f, "{}</track>", self.indent)?;
        }
        writeln!(f, "</midi>")
    }
}

/// Render a song as XML with the given indentation.
pub fn write_xml_data_with_indent(song: &Song, indent: &str) -> String {
    XmlDocument::new(song, indent).to_string()
}

/// Render a song as tab indented XML.
pub fn write_xml_data(song: &Song) -> String {
    write_xml_data_with_indent(song, DEFAULT_INDENT)
}
