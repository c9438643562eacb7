//! Field extraction from tracing events.
use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};

/// The `message` of an event plus any structured fields attached to it,
/// e.g. `manager = "brew"` or `stage = "push"`.
#[derive(Debug, Default)]
pub(super) struct EventFields {
    pub(super) message: String,
    pub(super) extra: Vec<(&'static str, String)>,
}

impl EventFields {
    pub(super) fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    /// Structured fields rendered as ` key=value` pairs, or an empty string.
    pub(super) fn suffix(&self) -> String {
        self.extra.iter().fold(String::new(), |mut out, (key, value)| {
            let _ = write!(out, " {key}={value}");
            out
        })
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let rendered = format!("{value:?}");
        if field.name() == "message" {
            self.message = rendered;
        } else {
            self.extra.push((field.name(), rendered));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.extra.push((field.name(), value.to_string()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_empty_without_fields() {
        assert_eq!(EventFields::default().suffix(), "");
    }

    #[test]
    fn suffix_keeps_field_order() {
        let fields = EventFields {
            message: "brew install jq".to_string(),
            extra: vec![
                ("manager", "brew".to_string()),
                ("operation", "install".to_string()),
            ],
        };
        assert_eq!(fields.suffix(), " manager=brew operation=install");
    }
}
