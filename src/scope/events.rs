//! Events reported while a scope is assembled.

use std::fmt;

/// Something a caller selecting API elements should know about.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Event {
    /// A requested name does not denote an element of the requested kind.
    InvalidArgument {
        /// Name of the selection the value was given for, e.g. `structs`
        argument: String,
        /// The offending name
        value: String,
        /// Human readable explanation
        reason: String,
        /// Element that was probably meant
        suggestion: Option<String>,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::InvalidArgument {
                argument, reason, ..
            } => write!(f, "invalid value for '{argument}': {reason}"),
        }
    }
}

/// Receives [`Event`]s. Implemented for every `FnMut(&Event)` closure.
///
/// # Examples
///
/// ```rust
/// use winmdscope::scope::{Event, EventListener};
///
/// let mut count = 0;
/// let mut listener = |_: &Event| count += 1;
/// listener.on_event(&Event::InvalidArgument {
///     argument: "structs".to_string(),
///     value: "POINTX".to_string(),
///     reason: "Struct/union \"POINTX\" does not exist.".to_string(),
///     suggestion: None,
/// });
/// assert_eq!(count, 1);
/// ```
pub trait EventListener {
    /// Handle one event.
    fn on_event(&mut self, event: &Event);
}

impl<F> EventListener for F
where
    F: FnMut(&Event),
{
    fn on_event(&mut self, event: &Event) {
        self(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        let event = Event::InvalidArgument {
            argument: "functions".to_string(),
            value: "MessageBox".to_string(),
            reason: "Function \"MessageBox\" does not exist.".to_string(),
            suggestion: Some("MessageBoxW".to_string()),
        };
        assert_eq!(
            event.to_string(),
            "invalid value for 'functions': Function \"MessageBox\" does not exist."
        );
    }
}
