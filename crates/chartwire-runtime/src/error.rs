#![forbid(unsafe_code)]

//! Errors surfaced by linking and stabilizing a chart directive.
//!
//! # Failure Modes
//!
//! | Variant | When | Recoverable |
//! |---------|------|-------------|
//! | `MissingKind` | host element lacks the kind attribute | no, at link time |
//! | `UnknownKind` | the chart library has no factory for the kind | no, at link time |
//! | `Unresolved` | attribute still undefined after the escalation window | no, watcher broken |
//! | `Evaluation` | attribute still erroring after the escalation window | no, watcher broken |
//! | `Callback` | the post-setup hook failed | no, watcher broken |
//! | `DigestInProgress` | a digest was requested from inside a digest | yes, retry later |
//! | `Config` | policy file did not parse | no |
//!
//! Evaluation failures inside the escalation window never reach this type:
//! the watcher logs them and stays pending.

use std::fmt;

use chartwire_core::EvalError;

#[derive(Debug, Clone, PartialEq)]
pub enum DirectiveError {
    MissingKind {
        attribute: String,
    },
    UnknownKind {
        kind: String,
    },
    Unresolved {
        attribute: String,
        expression: String,
    },
    Evaluation {
        attribute: String,
        expression: String,
        source: EvalError,
    },
    Callback {
        hook: String,
        source: EvalError,
    },
    DigestInProgress,
    Config(String),
}

impl fmt::Display for DirectiveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingKind { attribute } => {
                write!(f, "host element has no '{attribute}' attribute")
            }
            Self::UnknownKind { kind } => write!(f, "unknown chart kind '{kind}'"),
            Self::Unresolved {
                attribute,
                expression,
            } => write!(f, "{attribute}: '{expression}' is undefined"),
            Self::Evaluation {
                attribute,
                expression,
                source,
            } => write!(f, "unable to eval {attribute}: '{expression}': {source}"),
            Self::Callback { hook, source } => write!(f, "{hook} failed: {source}"),
            Self::DigestInProgress => f.write_str("digest already in progress"),
            Self::Config(msg) => write!(f, "invalid directive config: {msg}"),
        }
    }
}

impl std::error::Error for DirectiveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Evaluation { source, .. } | Self::Callback { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn evaluation_error_chains_source() {
        let err = DirectiveError::Evaluation {
            attribute: "dcDimension".into(),
            expression: "dims.day".into(),
            source: EvalError::Unresolved("dims".into()),
        };
        assert_eq!(
            err.to_string(),
            "unable to eval dcDimension: 'dims.day': dims is not defined"
        );
        assert!(err.source().is_some());
    }

    #[test]
    fn unresolved_message_names_expression() {
        let err = DirectiveError::Unresolved {
            attribute: "dcGroup".into(),
            expression: "groups.byDay".into(),
        };
        assert_eq!(err.to_string(), "dcGroup: 'groups.byDay' is undefined");
        assert!(err.source().is_none());
    }
}
