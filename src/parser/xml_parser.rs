use crate::song::{Event, EventKind, Song, Track};
use crate::SmfError;
use roxmltree::{Document, Node};

pub const ROOT_ELEMENT: &str = "midi";
pub const TRACK_ELEMENT: &str = "track";
pub const EVENT_ELEMENT: &str = "event";

fn position(node: Node) -> String {
    node.document().text_pos_at(node.range().start).to_string()
}

fn invalid(node: Node, message: &str) -> SmfError {
    let message = format!("{message} at {}", position(node));
    log::error!("{message}");
    SmfError::ParsingError(message)
}

/// Unsigned attribute, `None` when absent.
fn parse_attribute(node: Node, name: &str) -> Result<Option<u32>, SmfError> {
    node.attribute(name)
        .map(|raw| {
            raw.trim()
                .parse::<u32>()
                .map_err(|_| invalid(node, &format!("Invalid '{name}' value '{raw}'")))
        })
        .transpose()
}

/// A missing delay means no delay.
fn parse_event(node: Node) -> Result<Event, SmfError> {
    let delay = parse_attribute(node, "delay")?.unwrap_or(0);
    let Some(name) = node.attribute("type") else {
        return Err(invalid(node, "Event without 'type'"));
    };
    let kind = EventKind::from_parts(
        name.trim(),
        parse_attribute(node, "channel")?,
        parse_attribute(node, "value")?,
        parse_attribute(node, "value2")?,
    )
    .map_err(|err| invalid(node, &err.to_string()))?;
    Ok(Event::new(delay, kind))
}

fn parse_track(node: Node) -> Result<Track, SmfError> {
    let events = node
        .children()
        .filter(|n| n.has_tag_name(EVENT_ELEMENT))
        .map(parse_event)
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("Parsed track with {} events", events.len());
    Ok(Track::new(events))
}

/// Parse the textual representation of a song.
///
/// Elements other than `track` and `event` are ignored.
pub fn parse_xml_data(text: &str) -> Result<Song, SmfError> {
    let document = Document::parse(text).map_err(|err| {
        log::error!("Failed to parse XML: {err}");
        SmfError::ParsingError(format!("Invalid XML: {err}"))
    })?;
    let root = document.root_element();
    if !root.has_tag_name(ROOT_ELEMENT) {
        return Err(invalid(
            root,
            &format!("Expected root element '{ROOT_ELEMENT}'"),
        ));
    }

    let Some(ticks_per_beat) = parse_attribute(root, "ticksPerBeat")? else {
        return Err(invalid(root, "Missing 'ticksPerBeat'"));
    };
    let ticks_per_beat = u16::try_from(ticks_per_beat)
        .map_err(|_| invalid(root, &format!("ticksPerBeat {ticks_per_beat} out of range")))?;

    let tracks = root
        .children()
        .filter(|n| n.has_tag_name(TRACK_ELEMENT))
        .map(parse_track)
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("Parsed {} tracks", tracks.len());
    Ok(Song::new(ticks_per_beat, tracks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::xml_writer::{write_xml_data, write_xml_data_with_indent};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_xml() {
        let text = r#"<?xml version="1.0" encoding="utf-8"?>
<midi ticksPerBeat="480">
    <track>
        <event delay="0" type="SetTempo" value="500000" />
        <event delay="0" type="NoteOn" channel="0" value="60" value2="100" />
        <event delay="480" type="NoteOff" channel="0" value="60" value2="0" />
    </track>
    <track />
</midi>"#;
        let song = parse_xml_data(text).unwrap();
        assert_eq!(
            song,
            Song::new(
                480,
                vec![
                    Track::new(vec![
                        Event::set_tempo(0, 500_000),
                        Event::note_on(0, 0, 60, 100),
                        Event::note_off(480, 0, 60, 0),
                    ]),
                    Track::default(),
                ]
            )
        );
    }

    #[test]
    fn test_xml_round_trip() {
        let song = Song::new(
            96,
            vec![Track::new(vec![
                Event::new(
                    0,
                    EventKind::ControlChange {
                        channel: 9,
                        controller: 7,
                        value: 0,
                    },
                ),
                Event::new(
                    12,
                    EventKind::KeyPressure {
                        channel: 1,
                        key: 40,
                        pressure: 3,
                    },
                ),
                Event::new(
                    0,
                    EventKind::ChannelPressure {
                        channel: 1,
                        pressure: 90,
                    },
                ),
                Event::new(
                    0,
                    EventKind::ProgramChange {
                        channel: 15,
                        program: 0,
                    },
                ),
                Event::delay(0x1F_FFFF),
            ])],
        );
        assert_eq!(parse_xml_data(&write_xml_data(&song)).unwrap(), song);
        assert_eq!(
            parse_xml_data(&write_xml_data_with_indent(&song, "  ")).unwrap(),
            song
        );
    }

    #[test]
    fn test_missing_delay_defaults_to_zero() {
        let song = parse_xml_data(r#"<midi ticksPerBeat="1"><track><event type="Delay"/></track></midi>"#)
            .unwrap();
        assert_eq!(song.tracks[0].events, vec![Event::delay(0)]);
    }

    #[test]
    fn test_invalid_documents() {
        let cases = [
            "<midi>",
            r#"<song ticksPerBeat="480" />"#,
            "<midi />",
            r#"<midi ticksPerBeat="70000" />"#,
            r#"<midi ticksPerBeat="480"><track><event delay="0" /></track></midi>"#,
            r#"<midi ticksPerBeat="480"><track><event delay="-1" type="Delay" /></track></midi>"#,
            r#"<midi ticksPerBeat="480"><track><event type="Bogus" /></track></midi>"#,
            r#"<midi ticksPerBeat="480"><track><event type="NoteOn" channel="0" value="60" /></track></midi>"#,
        ];
        for text in cases {
            let res = parse_xml_data(text);
            assert!(
                matches!(res, Err(SmfError::ParsingError(_))),
                "{text} -> {res:?}"
            );
        }
    }
}
