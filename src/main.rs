use crate::AppError::{EncodingError, OtherError, ParsingError};
use clap::Parser;
use config::Config;
use smfxml::{parse_midi_data, parse_xml_data, write_xml_data_with_indent, MidiWriter};
use smfxml::SmfError as LibSmfError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

mod config;

const USAGE: &str = "usage: smfxml input [output]";

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("smfxml=info"))
        .init();

    // args
    let args = CliArgs::parse();
    let Some(input) = args.input.map(PathBuf::from) else {
        println!("{USAGE}");
        return Ok(());
    };

    // nothing to convert, not an error
    if !input.exists() {
        println!("File not found.");
        log::debug!("Input file not found {input:?}");
        return Ok(());
    }

    // read local config, flags take precedence
    let local_config = Config::read_config()?;
    let running_status = local_config.running_status() && !args.no_running_status;
    let indent = args
        .indent_spaces
        .map_or_else(|| local_config.indent().to_string(), |n| " ".repeat(n));

    let conversion = Conversion::for_input(&input);
    let output = args
        .output
        .map_or_else(|| conversion.default_output(&input), PathBuf::from);
    log::info!("Converting {input:?} to {output:?}");

    let bytes = match conversion {
        Conversion::XmlToMidi => {
            let text = fs::read_to_string(&input)?;
            let song = parse_xml_data(&text)?;
            log::info!(
                "Read {} tracks with {} events",
                song.tracks.len(),
                song.event_count()
            );
            MidiWriter::new()
                .with_running_status(running_status)
                .write_song(&song)?
        }
        Conversion::MidiToXml => {
            let file_data = fs::read(&input)?;
            let song = parse_midi_data(&file_data)?;
            log::info!(
                "Read {} tracks with {} events",
                song.tracks.len(),
                song.event_count()
            );
            write_xml_data_with_indent(&song, &indent).into_bytes()
        }
    };

    write_atomically(&output, &bytes)?;
    log::info!("Wrote {} bytes to {output:?}", bytes.len());
    Ok(())
}

/// Write next to the target then rename, a failure never leaves a partial output.
fn write_atomically(output: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut tmp = output.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    let result = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, output));
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    XmlToMidi,
    MidiToXml,
}

impl Conversion {
    fn for_input(input: &Path) -> Self {
        match input.extension() {
            Some(ext) if ext.eq_ignore_ascii_case("xml") => Self::XmlToMidi,
            _ => Self::MidiToXml,
        }
    }

    fn default_output(self, input: &Path) -> PathBuf {
        match self {
            Self::XmlToMidi => input.with_extension("mid"),
            Self::MidiToXml => input.with_extension("xml"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// MIDI file to export, or XML file to import.
    input: Option<String>,
    /// Optional output path, defaults to the input with the other extension.
    output: Option<String>,
    /// Always write status bytes instead of using running status.
    #[arg(long, default_value_t = false)]
    no_running_status: bool,
    /// Indent the XML output with spaces instead of the configured indent.
    #[arg(long)]
    indent_spaces: Option<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("parsing error: {0}")]
    ParsingError(String),
    #[error("encoding error: {0}")]
    EncodingError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<LibSmfError> for AppError {
    fn from(error: LibSmfError) -> Self {
        match error {
            LibSmfError::ParsingError(s) => ParsingError(s),
            err @ LibSmfError::UnsupportedMessage { .. } => ParsingError(err.to_string()),
            err @ LibSmfError::QuantityOverflow(_) => EncodingError(err.to_string()),
            LibSmfError::EncodingError(s) => EncodingError(s),
            LibSmfError::ConfigError(s) => Self::ConfigError(s),
            LibSmfError::IoError(s) => OtherError(s),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        OtherError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_direction() {
        assert_eq!(
            Conversion::for_input(Path::new("song.xml")),
            Conversion::XmlToMidi
        );
        assert_eq!(
            Conversion::for_input(Path::new("song.mid")),
            Conversion::MidiToXml
        );
        assert_eq!(
            Conversion::for_input(Path::new("song")),
            Conversion::MidiToXml
        );
    }

    #[test]
    fn test_default_output_swaps_extension() {
        let xml = Path::new("dir/song.xml");
        assert_eq!(
            Conversion::for_input(xml).default_output(xml),
            PathBuf::from("dir/song.mid")
        );
        let mid = Path::new("dir/song.midi");
        assert_eq!(
            Conversion::for_input(mid).default_output(mid),
            PathBuf::from("dir/song.xml")
        );
    }

    #[test]
    fn test_write_atomically_replaces_output() {
        let dir = std::env::temp_dir().join(format!("smfxml-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let output = dir.join("out.xml");
        fs::write(&output, b"old").unwrap();
        write_atomically(&output, b"new").unwrap();
        assert_eq!(fs::read(&output).unwrap(), b"new");
        assert!(!dir.join("out.xml.tmp").exists());
        fs::remove_dir_all(&dir).unwrap();
    }
}
