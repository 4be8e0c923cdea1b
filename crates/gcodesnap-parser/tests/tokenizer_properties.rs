//! Property tests for the G-code tokenizer

use gcodesnap_parser::{parse, Command, Parameter, PARSABLE_COMMANDS};
use proptest::prelude::*;

fn numeric_word() -> impl Strategy<Value = String> {
    let words: Vec<String> = PARSABLE_COMMANDS
        .iter()
        .filter(|word| **word != "T")
        .map(|word| word.to_string())
        .collect();
    prop::sample::select(words)
}

fn parameter() -> impl Strategy<Value = Parameter> {
    let letters = vec!["X", "Y", "Z", "E", "F", "S", "P", "R"];
    (prop::sample::select(letters), -10_000.0f64..10_000.0)
        .prop_map(|(name, value)| Parameter::float(name, value))
}

fn command() -> impl Strategy<Value = Command> {
    (numeric_word(), prop::collection::vec(parameter(), 0..6)).prop_map(|(word, parameters)| {
        Command {
            word,
            parameters,
            ..Default::default()
        }
    })
}

proptest! {
    #[test]
    fn rendered_commands_parse_back(original in command()) {
        let rendered = original.to_string();
        let parsed = parse(&rendered);

        prop_assert_eq!(&parsed.word, &original.word);
        prop_assert_eq!(parsed.parameters.len(), original.parameters.len());
        for (expected, actual) in original.parameters.iter().zip(&parsed.parameters) {
            prop_assert_eq!(&expected.name, &actual.name);
            let expected = expected.as_f64().unwrap_or(f64::NAN);
            let actual = actual.as_f64().unwrap_or(f64::NAN);
            prop_assert!((expected - actual).abs() < 1e-9, "{} vs {} in {}", expected, actual, rendered);
        }
    }

    #[test]
    fn tool_changes_parse_back(tool in 0u64..64) {
        let parsed = parse(&format!("T{}", tool));
        prop_assert_eq!(parsed.word.as_str(), "T");
        prop_assert_eq!(parsed.parameter("T").and_then(|p| p.as_f64()), Some(tool as f64));
    }

    #[test]
    fn lines_without_command_letter_are_ignored(
        padding in " {0,3}",
        first in "[A-FH-LN-SU-Za-fh-ln-su-z0-9;@*(%]",
        rest in "[ -~]{0,24}",
    ) {
        let line = format!("{}{}{}", padding, first, rest);
        let parsed = parse(&line);
        prop_assert!(parsed.word.is_empty(), "{:?} produced {:?}", line, parsed.word);
        prop_assert!(parsed.parameters.is_empty());
    }

    #[test]
    fn parse_never_panics(line in "\\PC{0,64}") {
        let _ = parse(&line);
    }
}
