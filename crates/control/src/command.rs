use params::BlendStrength;
use tracing::{debug, warn};

/// Command that replaces the blend-strength coefficient.
pub const CHANGE_BLEND_STRENGTH: &str = "change_blend_strength";

/// A successfully parsed control message.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    ChangeBlendStrength(f32),
    /// Well-formed message whose command this build does not know about.
    Unrecognized { command: String },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("expected '<command>:<value>', got {0:?}")]
    Malformed(String),
    #[error("invalid value {value:?} for {command}")]
    InvalidValue { command: String, value: String },
}

/// What happened to a single inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    Applied(f32),
    Ignored,
    Rejected(CommandError),
}

/// Parses a `<command>:<value>` message.
///
/// The message must contain exactly one `:`. Values for unrecognised commands
/// are not inspected.
pub fn parse_command(message: &str) -> Result<ControlCommand, CommandError> {
    let mut parts = message.split(':');
    let (command, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(command), Some(value), None) => (command, value),
        _ => return Err(CommandError::Malformed(message.to_string())),
    };

    match command {
        CHANGE_BLEND_STRENGTH => {
            let parsed = value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|parsed| parsed.is_finite())
                .ok_or_else(|| CommandError::InvalidValue {
                    command: command.to_string(),
                    value: value.to_string(),
                })?;
            Ok(ControlCommand::ChangeBlendStrength(parsed))
        }
        other => Ok(ControlCommand::Unrecognized {
            command: other.to_string(),
        }),
    }
}

/// Parses `message` and applies it to `store`.
///
/// Malformed messages are logged and dropped; they never surface as errors to
/// the caller so a bad message cannot tear down the connection it arrived on.
pub fn apply_message(message: &str, store: &BlendStrength) -> MessageOutcome {
    match parse_command(message) {
        Ok(ControlCommand::ChangeBlendStrength(value)) => {
            store.set(value);
            debug!(value, "blend strength updated");
            MessageOutcome::Applied(value)
        }
        Ok(ControlCommand::Unrecognized { .. }) => MessageOutcome::Ignored,
        Err(err) => {
            warn!(error = %err, "invalid control message received");
            MessageOutcome::Rejected(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blend_strength() {
        assert_eq!(
            parse_command("change_blend_strength:3.5"),
            Ok(ControlCommand::ChangeBlendStrength(3.5))
        );
        assert_eq!(
            parse_command("change_blend_strength: -0.25 "),
            Ok(ControlCommand::ChangeBlendStrength(-0.25))
        );
        assert_eq!(
            parse_command("change_blend_strength:1e1"),
            Ok(ControlCommand::ChangeBlendStrength(10.0))
        );
    }

    #[test]
    fn rejects_wrong_shape() {
        for message in ["", "change_blend_strength", "change_blend_strength:1:2"] {
            assert!(
                matches!(parse_command(message), Err(CommandError::Malformed(_))),
                "{message:?} should be malformed"
            );
        }
    }

    #[test]
    fn rejects_non_numeric_and_non_finite_values() {
        for message in [
            "change_blend_strength:abc",
            "change_blend_strength:",
            "change_blend_strength:NaN",
            "change_blend_strength:inf",
        ] {
            assert!(
                matches!(
                    parse_command(message),
                    Err(CommandError::InvalidValue { .. })
                ),
                "{message:?} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_commands_are_not_errors() {
        assert_eq!(
            parse_command("change_speed:fast"),
            Ok(ControlCommand::Unrecognized {
                command: "change_speed".into()
            })
        );
    }

    #[test]
    fn malformed_value_leaves_store_unchanged() {
        let store = BlendStrength::new(2.0);
        let outcome = apply_message("change_blend_strength:abc", &store);
        assert!(matches!(outcome, MessageOutcome::Rejected(_)));
        assert_eq!(store.get(), 2.0);
    }

    #[test]
    fn unknown_command_leaves_store_unchanged() {
        let store = BlendStrength::new(2.0);
        assert_eq!(apply_message("rotate:1.0", &store), MessageOutcome::Ignored);
        assert_eq!(store.get(), 2.0);
    }

    #[test]
    fn valid_command_updates_store() {
        let store = BlendStrength::new(2.0);
        assert_eq!(
            apply_message("change_blend_strength:0.75", &store),
            MessageOutcome::Applied(0.75)
        );
        assert_eq!(store.get(), 0.75);
    }
}
