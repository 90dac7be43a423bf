pub mod midi_writer;
pub mod primitive_writer;
pub mod xml_writer;
