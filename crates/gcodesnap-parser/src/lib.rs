//! # gcodesnap parser
//!
//! Converts raw G-code text lines into structured [`Command`] values.
//!
//! The tokenizer is a pure function with no state beyond two static word
//! tables. It never fails: blank lines, comments, unsupported words and
//! malformed input come back as ignored commands so a long print file is
//! never interrupted by one odd line.

pub mod command;
pub mod parser;

pub use command::{Command, Parameter, ParameterValue};
pub use parser::{is_parsable, is_text_only, parse, PARSABLE_COMMANDS, TEXT_ONLY_COMMANDS};
