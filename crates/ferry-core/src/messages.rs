//! Localized status messages.
//!
//! The engine never hardcodes user-facing text. It asks a [`MessageSource`]
//! for a template by key and passes positional arguments, so callers can plug
//! in whatever localization backend they already have.

use std::collections::HashMap;

use strum::IntoEnumIterator;

use crate::{Action, TransferError, TransferResult};

/// Key of the placeholder message shown while a step is being prepared.
pub const PREPARING_KEY: &str = "transfer.preparing";

/// Source of localized, formatted messages.
pub trait MessageSource: Send + Sync {
    /// Format the message registered under `key` with positional `args`.
    fn format(&self, key: &str, args: &[&str]) -> String;
}

/// A key to template catalog using `{0}`, `{1}`, ... placeholders.
#[derive(Debug, Clone, Default)]
pub struct Messages {
    templates: HashMap<String, String>,
}

impl Messages {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in English catalog.
    ///
    /// Action templates receive the source summary, the formatted size and the
    /// target name, in that order.
    pub fn english() -> Self {
        let mut messages = Self::new();
        messages.insert(PREPARING_KEY, "Preparing...");
        for action in Action::iter() {
            let template = match action {
                Action::Copy => "Copying {0} to {2}  ({1})",
                Action::Move => "Moving {0} to {2}  ({1})",
                Action::Archive => "Archiving {0} into {2}  ({1})",
                Action::Unarchive => "Extracting {0} to {2}  ({1})",
                Action::MakeDirectory => "Creating {0}",
                Action::Remove => "Removing {0}",
            };
            messages.insert(action.message_key(), template);
        }
        messages
    }

    /// Build a catalog from key/template pairs.
    pub fn from_map(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }

    /// Parse a catalog from a flat JSON object of strings.
    pub fn from_json_str(json: &str) -> TransferResult<Self> {
        let templates: HashMap<String, String> =
            serde_json::from_str(json).map_err(|e| TransferError::InvalidCatalog {
                message: e.to_string(),
            })?;
        Ok(Self { templates })
    }

    /// Add or replace a template.
    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    /// Overlay `other` on top of this catalog.
    pub fn merged(mut self, other: Messages) -> Self {
        self.templates.extend(other.templates);
        self
    }

    /// Check whether a key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.templates.contains_key(key)
    }
}

impl MessageSource for Messages {
    fn format(&self, key: &str, args: &[&str]) -> String {
        let Some(template) = self.templates.get(key) else {
            tracing::warn!(key, "missing message key");
            return key.to_string();
        };

        substitute(template, args)
    }
}

/// Replace each `{n}` in one pass; inserted arguments are never rescanned.
/// Placeholders without a matching argument are left as written.
fn substitute(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let resolved = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            args.get(index).map(|arg| (*arg, close))
        });

        match resolved {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_covers_every_action() {
        let messages = Messages::english();
        assert!(messages.contains(PREPARING_KEY));
        for action in Action::iter() {
            assert!(messages.contains(&action.message_key()), "{action}");
        }
    }

    #[test]
    fn test_format_positional_args() {
        let messages = Messages::english();
        let text = messages.format("transfer.copy", &["a.txt", "1 KiB", "dest"]);
        assert_eq!(text, "Copying a.txt to dest  (1 KiB)");
    }

    #[test]
    fn test_format_does_not_rescan_arguments() {
        let messages = Messages::english();
        let text = messages.format("transfer.copy", &["{2}.txt", "1 KiB", "dest"]);
        assert_eq!(text, "Copying {2}.txt to dest  (1 KiB)");
    }

    #[test]
    fn test_format_leaves_unknown_placeholders() {
        let mut messages = Messages::new();
        messages.insert("k", "{0} {5} {x} {");
        assert_eq!(messages.format("k", &["a"]), "a {5} {x} {");
    }

    #[test]
    fn test_missing_key_returns_key() {
        let messages = Messages::new();
        assert_eq!(messages.format("transfer.nope", &[]), "transfer.nope");
    }

    #[test]
    fn test_from_json_and_merge() {
        let custom = Messages::from_json_str(r#"{"transfer.preparing": "Préparation..."}"#).unwrap();
        let messages = Messages::english().merged(custom);
        assert_eq!(messages.format(PREPARING_KEY, &[]), "Préparation...");
        assert!(Messages::from_json_str("[1, 2]").is_err());
    }
}
