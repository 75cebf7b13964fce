//! Redaction of personally identifiable fields before they reach the logs.

use std::{collections::HashSet, sync::Arc};

use serde_json::Value;

/// Replacement written in place of a sensitive value.
pub const REDACTED: &str = "***REDACTED***";

/// Recursively replaces the values of configured keys in JSON-shaped data.
///
/// Keys are compared case-insensitively. Cloning is cheap: the field set is shared.
#[derive(Debug, Clone, Default)]
pub struct PiiScrubber {
    fields: Arc<HashSet<String>>,
}

impl PiiScrubber {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            fields: Arc::new(
                fields
                    .into_iter()
                    .map(|f| f.as_ref().trim().to_ascii_lowercase())
                    .filter(|f| !f.is_empty())
                    .collect(),
            ),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        !self.fields.is_empty() && self.fields.contains(&key.to_ascii_lowercase())
    }

    /// Scrub a JSON value in place.
    pub fn scrub_in_place(&self, value: &mut Value) {
        if self.fields.is_empty() {
            return;
        }
        match value {
            Value::Object(map) => {
                for (key, nested) in map.iter_mut() {
                    if self.is_sensitive(key) {
                        *nested = Value::String(REDACTED.to_string());
                    } else {
                        self.scrub_in_place(nested);
                    }
                }
            }
            Value::Array(items) => items.iter_mut().for_each(|item| self.scrub_in_place(item)),
            Value::String(text) => {
                if let Some(scrubbed) = self.scrub_embedded_json(text) {
                    *text = scrubbed;
                }
            }
            _ => {}
        }
    }

    pub fn scrub(&self, value: &Value) -> Value {
        let mut copy = value.clone();
        self.scrub_in_place(&mut copy);
        copy
    }

    /// Scrub free text that may itself be a JSON document.
    ///
    /// Text that does not parse as a JSON object or array is returned unchanged.
    pub fn scrub_text(&self, text: &str) -> String {
        self.scrub_embedded_json(text)
            .unwrap_or_else(|| text.to_string())
    }

    fn scrub_embedded_json(&self, text: &str) -> Option<String> {
        let trimmed = text.trim_start();
        if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
            return None;
        }
        let mut parsed: Value = serde_json::from_str(text).ok()?;
        self.scrub_in_place(&mut parsed);
        serde_json::to_string(&parsed).ok()
    }
}
