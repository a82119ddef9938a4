//! Label map: the optional trace prelude mapping source line numbers to
//! `(function, label)` pairs.
//!
//! The builder only stores the map; downstream passes use it to attach
//! loop labels to nodes by line number.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One labelmap entry: the function and label a source line belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub function: String,
    pub label_name: String,
}

/// Mapping from source line number to its `(function, label)` pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelMap {
    entries: HashMap<u32, Label>,
}

impl LabelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one prelude line of the form `FUNC/LABEL NUMBER` and insert it.
    /// Malformed lines are skipped; the prelude is advisory.
    pub fn parse_line(&mut self, line: &str) {
        let Some((function, rest)) = line.split_once('/') else {
            return;
        };
        let mut fields = rest.split_whitespace();
        let (Some(label_name), Some(number)) = (fields.next(), fields.next()) else {
            return;
        };
        let Ok(line_number) = number.parse::<u32>() else {
            return;
        };
        self.entries.insert(
            line_number,
            Label {
                function: function.trim().to_string(),
                label_name: label_name.to_string(),
            },
        );
    }

    /// Look up the label for a source line.
    pub fn get(&self, line_number: u32) -> Option<&Label> {
        self.entries.get(&line_number)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
