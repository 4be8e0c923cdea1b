//! G-code line tokenizer
//!
//! Grammar, per line:
//! - everything from the first `;` is the comment
//! - the first word must be `G`, `M` or `T`; anything else is ignored
//! - `G`/`M` words take a numeric address (`G1`, `M104`, `G29.1`), leading
//!   zeros stripped; `T` is a bare word whose tool number is a parameter
//! - only words in [`PARSABLE_COMMANDS`] get their parameters parsed
//! - words in [`TEXT_ONLY_COMMANDS`] carry the rest of the raw line as `TEXT`
//!
//! ASCII letters are case folded and whitespace inside the code portion is
//! skipped, so `g 1 x - 5` reads as `G1 X-5`. A command number is the one
//! exception: it ends at the first space after its digits.

use crate::command::{Command, Parameter, TEXT_PARAMETER};
use gcodesnap_core::logging::PARSER_TARGET;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Command words whose parameters are parsed.
pub const PARSABLE_COMMANDS: &[&str] = &[
    "G0", "G1", "G2", "G3", "G10", "G11", "G20", "G21", "G28", "G29", "G80", "G90", "G91",
    "G92", "M82", "M83", "M104", "M105", "M106", "M109", "M114", "M116", "M140", "M141",
    "M190", "M191", "M207", "M208", "M240", "M400", "T",
];

/// Command words whose remainder is free text.
pub const TEXT_ONLY_COMMANDS: &[&str] = &["M117"];

/// Fractional digits beyond this carry no information for an `f64`.
const MAX_FRACTION_DIGITS: u32 = 18;

fn parsable_set() -> &'static HashSet<&'static str> {
    static PARSABLE: OnceLock<HashSet<&'static str>> = OnceLock::new();
    PARSABLE.get_or_init(|| PARSABLE_COMMANDS.iter().copied().collect())
}

/// True when the tokenizer parses parameters for `word`.
pub fn is_parsable(word: &str) -> bool {
    parsable_set().contains(word)
}

/// True when `word` carries free text instead of parameters.
pub fn is_text_only(word: &str) -> bool {
    TEXT_ONLY_COMMANDS.contains(&word)
}

/// Parse one line of G-code.
///
/// Never fails. Lines that are blank, comment-only, start with an
/// unsupported letter or have a malformed address yield a command with an
/// empty word; unknown words keep their word but get no parameters.
pub fn parse(line: &str) -> Command {
    let line = line.trim_end_matches(['\r', '\n']);
    let (code_end, comment) = match line.find(';') {
        Some(index) => (index, line[index + 1..].trim()),
        None => (line.len(), ""),
    };

    let mut cursor = Cursor::new(line.as_bytes(), code_end);
    cursor.skip_spaces();

    let letter = match cursor.peek_upper() {
        Some(letter @ (b'G' | b'M' | b'T')) => letter,
        _ => return Command::ignored(line, comment),
    };
    cursor.bump();

    let word = if letter == b'T' {
        "T".to_string()
    } else {
        match read_address(&mut cursor, letter) {
            Some(word) => word,
            None => {
                tracing::trace!(target: PARSER_TARGET, line, "command letter without address");
                return Command::ignored(line, comment);
            }
        }
    };

    if is_text_only(&word) {
        // Taken from the raw line so a `;` inside the message survives.
        let rest = &line[cursor.pos..];
        let text = rest.strip_prefix(' ').unwrap_or(rest);
        return Command {
            word,
            parameters: vec![Parameter::text(TEXT_PARAMETER, text)],
            raw_text: line.to_string(),
            comment: comment.to_string(),
        };
    }

    if !is_parsable(&word) {
        return Command {
            word,
            parameters: Vec::new(),
            raw_text: line.to_string(),
            comment: comment.to_string(),
        };
    }

    let parameters = read_parameters(&mut cursor, line, word == "T");
    Command {
        word,
        parameters,
        raw_text: line.to_string(),
        comment: comment.to_string(),
    }
}

/// Byte cursor over the code portion of a line.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], end: usize) -> Self {
        Self { bytes, pos: 0, end }
    }

    fn peek(&self) -> Option<u8> {
        (self.pos < self.end).then(|| self.bytes[self.pos])
    }

    fn peek_upper(&self) -> Option<u8> {
        self.peek().map(|b| b.to_ascii_uppercase())
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn skip_spaces(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    /// Consume a contiguous run of digits.
    fn take_digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(b) = self.peek().filter(u8::is_ascii_digit) {
            digits.push(char::from(b));
            self.bump();
        }
        digits
    }

    /// Consume the next digit, looking past whitespace. Whitespace is only
    /// consumed when a digit follows it.
    fn next_digit(&mut self) -> Option<u8> {
        let saved = self.pos;
        self.skip_spaces();
        match self.peek() {
            Some(b) if b.is_ascii_digit() => {
                self.bump();
                Some(b - b'0')
            }
            _ => {
                self.pos = saved;
                None
            }
        }
    }

    /// Consume `expected`, looking past whitespace.
    fn next_is(&mut self, expected: u8) -> bool {
        let saved = self.pos;
        self.skip_spaces();
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            self.pos = saved;
            false
        }
    }
}

/// Read a `G`/`M` address and build the normalized word.
///
/// Spaces may separate the letter from the number, but the number itself
/// ends at the first character that is not a digit or the point, so
/// `M117 50%` stays `M117`.
fn read_address(cursor: &mut Cursor<'_>, letter: u8) -> Option<String> {
    cursor.skip_spaces();
    let integer = cursor.take_digits();

    let mut fraction = String::new();
    if !integer.is_empty() && cursor.peek() == Some(b'.') {
        cursor.bump();
        fraction = cursor.take_digits();
    }

    if integer.is_empty() {
        return None;
    }

    let trimmed = integer.trim_start_matches('0');
    let mut word = String::with_capacity(1 + integer.len() + fraction.len() + 1);
    word.push(char::from(letter));
    word.push_str(if trimmed.is_empty() { "0" } else { trimmed });
    if !fraction.is_empty() {
        word.push('.');
        word.push_str(&fraction);
    }
    Some(word)
}

fn read_parameters(cursor: &mut Cursor<'_>, line: &str, is_tool_change: bool) -> Vec<Parameter> {
    let mut parameters = Vec::new();

    if is_tool_change {
        cursor.skip_spaces();
        match cursor.peek_upper() {
            Some(value @ (b'C' | b'X' | b'?')) => {
                cursor.bump();
                parameters.push(Parameter::text("T", char::from(value).to_string()));
            }
            Some(b) if b.is_ascii_digit() => {
                let mut tool: u64 = 0;
                while let Some(digit) = cursor.next_digit() {
                    tool = tool.saturating_mul(10).saturating_add(u64::from(digit));
                }
                parameters.push(Parameter::unsigned("T", tool));
            }
            _ => {}
        }
    }

    loop {
        cursor.skip_spaces();
        let Some(letter) = cursor.peek() else {
            break;
        };
        if !letter.is_ascii_alphabetic() {
            break;
        }
        cursor.bump();
        let name = char::from(letter.to_ascii_uppercase()).to_string();

        cursor.skip_spaces();
        match cursor.peek() {
            None => {
                parameters.push(Parameter::flag(name));
                break;
            }
            Some(next) if next.is_ascii_alphabetic() => {
                parameters.push(Parameter::flag(name));
                continue;
            }
            Some(_) => {}
        }

        match read_number(cursor) {
            Some(value) => parameters.push(Parameter::float(name, value)),
            None => {
                let text = line[cursor.pos..cursor.end].trim();
                tracing::trace!(target: PARSER_TARGET, parameter = %name, text, "non-numeric parameter");
                parameters.push(Parameter::text(name, text));
                break;
            }
        }
    }

    parameters
}

/// Signed decimal: optional sign, digits, optional `.` and digits.
///
/// At least one digit is required on either side of the point, so `5`, `+5.`
/// and `.5` parse while a bare sign does not. Whitespace between the parts is
/// skipped.
fn read_number(cursor: &mut Cursor<'_>) -> Option<f64> {
    let start = cursor.pos;

    let negative = match cursor.peek() {
        Some(b'-') => {
            cursor.bump();
            true
        }
        Some(b'+') => {
            cursor.bump();
            false
        }
        _ => false,
    };

    let mut value = 0.0_f64;
    let mut digits = 0u32;
    while let Some(digit) = cursor.next_digit() {
        value = value * 10.0 + f64::from(digit);
        digits += 1;
    }

    if cursor.next_is(b'.') {
        let mut fraction = 0.0_f64;
        let mut scale = 1.0_f64;
        let mut fraction_digits = 0u32;
        while let Some(digit) = cursor.next_digit() {
            if fraction_digits < MAX_FRACTION_DIGITS {
                fraction = fraction * 10.0 + f64::from(digit);
                scale *= 10.0;
            }
            fraction_digits += 1;
        }
        value += fraction / scale;
        digits += fraction_digits;
    }

    if digits == 0 {
        cursor.pos = start;
        return None;
    }

    Some(if negative { -value } else { value })
}
