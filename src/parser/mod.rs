pub mod midi_parser;
pub mod primitive_parser;
pub mod xml_parser;
