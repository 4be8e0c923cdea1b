//! Parsed G-code command representation

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the synthetic parameter carrying the text of text-only commands.
pub const TEXT_PARAMETER: &str = "TEXT";

/// Value carried by a parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    /// Signed decimal number
    Float(f64),
    /// Free text, or a value that did not parse as a number
    Text(String),
    /// Tool number of a `T` command
    UnsignedInt(u64),
    /// Letter present without a value, e.g. the axes of `G28 X Y`
    None,
}

/// One parameter of a command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Uppercase parameter letter, or `TEXT` for text-only commands
    pub name: String,
    pub value: ParameterValue,
}

impl Parameter {
    pub fn float(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::Float(value),
        }
    }

    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::Text(value.into()),
        }
    }

    pub fn unsigned(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::UnsignedInt(value),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: ParameterValue::None,
        }
    }

    /// Numeric value, if the parameter holds one
    pub fn as_f64(&self) -> Option<f64> {
        match self.value {
            ParameterValue::Float(value) => Some(value),
            ParameterValue::UnsignedInt(value) => Some(value as f64),
            _ => None,
        }
    }

    /// Text value, if the parameter holds one
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            ParameterValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

/// A parsed G-code line
///
/// Immutable once produced by the tokenizer. `word` is empty for blank lines,
/// comments and anything that does not start with a `G`, `M` or `T` word.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Command {
    /// Normalized command word such as `G1`, `M104` or `T`
    pub word: String,
    /// Parameters in textual order
    pub parameters: Vec<Parameter>,
    /// The line as read, without its line terminator
    pub raw_text: String,
    /// Text after the first `;`, trimmed
    pub comment: String,
}

impl Command {
    /// A command with no word, carrying only the line text and comment
    pub fn ignored(raw_text: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            word: String::new(),
            parameters: Vec::new(),
            raw_text: raw_text.into(),
            comment: comment.into(),
        }
    }

    /// True when the line produced no command word
    pub fn is_empty(&self) -> bool {
        self.word.is_empty()
    }

    /// True when the word belongs to the tokenizer's known command tables
    pub fn is_known(&self) -> bool {
        crate::parser::is_parsable(&self.word) || crate::parser::is_text_only(&self.word)
    }

    /// First parameter with the given name
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Numeric value of the named parameter
    pub fn float(&self, name: &str) -> Option<f64> {
        self.parameter(name).and_then(Parameter::as_f64)
    }

    /// True when the named parameter appears, with or without a value
    pub fn has(&self, name: &str) -> bool {
        self.parameter(name).is_some()
    }

    /// Text of a text-only command such as `M117`
    pub fn text(&self) -> Option<&str> {
        self.parameter(TEXT_PARAMETER).and_then(Parameter::as_text)
    }
}

/// Renders the command portion as canonical G-code, e.g. `G1 X10 Y-2.5`.
///
/// The comment is not rendered.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.word)?;
        for parameter in &self.parameters {
            if parameter.name == TEXT_PARAMETER {
                if let ParameterValue::Text(text) = &parameter.value {
                    write!(f, " {}", text)?;
                }
                continue;
            }

            // Tool numbers attach to the word: `T1`, `T?`
            if self.word == "T" && parameter.name == "T" {
                match &parameter.value {
                    ParameterValue::UnsignedInt(tool) => write!(f, "{}", tool)?,
                    ParameterValue::Text(text) => write!(f, "{}", text)?,
                    _ => {}
                }
                continue;
            }

            match &parameter.value {
                ParameterValue::Float(value) => write!(f, " {}{}", parameter.name, value)?,
                ParameterValue::UnsignedInt(value) => write!(f, " {}{}", parameter.name, value)?,
                ParameterValue::Text(text) => write!(f, " {}{}", parameter.name, text)?,
                ParameterValue::None => write!(f, " {}", parameter.name)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_accessors() {
        let command = Command {
            word: "G1".to_string(),
            parameters: vec![
                Parameter::float("X", 10.0),
                Parameter::flag("Y"),
                Parameter::text("Z", "abc"),
            ],
            raw_text: "G1 X10 Y Zabc".to_string(),
            comment: String::new(),
        };

        assert_eq!(command.float("X"), Some(10.0));
        assert_eq!(command.float("Y"), None);
        assert!(command.has("Y"));
        assert_eq!(command.float("Z"), None);
        assert!(!command.has("E"));
        assert!(command.is_known());
    }

    #[test]
    fn test_display_renders_canonical_gcode() {
        let command = Command {
            word: "G1".to_string(),
            parameters: vec![Parameter::float("X", 10.0), Parameter::float("Y", -2.5)],
            ..Default::default()
        };
        assert_eq!(command.to_string(), "G1 X10 Y-2.5");

        let tool = Command {
            word: "T".to_string(),
            parameters: vec![Parameter::unsigned("T", 1)],
            ..Default::default()
        };
        assert_eq!(tool.to_string(), "T1");

        let message = Command {
            word: "M117".to_string(),
            parameters: vec![Parameter::text(TEXT_PARAMETER, "Printing layer 3")],
            ..Default::default()
        };
        assert_eq!(message.to_string(), "M117 Printing layer 3");
        assert_eq!(message.text(), Some("Printing layer 3"));
    }

    #[test]
    fn test_ignored_command_is_empty() {
        let command = Command::ignored("; just a comment", "just a comment");
        assert!(command.is_empty());
        assert!(!command.is_known());
        assert!(command.parameters.is_empty());
    }
}
