//! Domain warnings attached to functions and ports.
//!
//! Warnings are non-fatal and value-compared: a warning list holds each kind
//! at most once.

use serde::{Deserialize, Serialize};

/// A user-visible, non-fatal problem on a function or port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warning {
    NoDataSourceForPort,
    NoDataFromInput,
    ModelIncomplete,
    ModelTooManyPaths,
    ModelContainsNonLayerBlock,
    CouldNotLoadImageData,
    NoDataFound,
    CodeInvalid,
    CodeNotInterpretableToBlock,
    CustomFunctionNotSupported,
    IncompatiblePorts,
}

impl Warning {
    /// The message shown next to the affected block, port or code line.
    pub fn message(&self) -> &'static str {
        match self {
            Warning::NoDataSourceForPort => "No data source connected to this port.",
            Warning::NoDataFromInput => "Data missing from inputs.",
            Warning::ModelIncomplete => "Model is incomplete.",
            Warning::ModelTooManyPaths => {
                "Model contains more than one path from input to output."
            }
            Warning::ModelContainsNonLayerBlock => "Model contains a block that is not a layer.",
            Warning::CouldNotLoadImageData => "Could not load image data.",
            Warning::NoDataFound => "No data found.",
            Warning::CodeInvalid => "Code is invalid.",
            Warning::CodeNotInterpretableToBlock => "Code can not be interpreted as a block.",
            Warning::CustomFunctionNotSupported => "Custom functions are not supported yet.",
            Warning::IncompatiblePorts => "Connected ports have incompatible types.",
        }
    }
}

/// An ordered, de-duplicated list of warnings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Warnings(Vec<Warning>);

impl Warnings {
    pub fn new() -> Self {
        Warnings(Vec::new())
    }

    /// Adds `warning` unless already present. Returns whether it was added.
    pub fn add(&mut self, warning: Warning) -> bool {
        if self.0.contains(&warning) {
            return false;
        }
        self.0.push(warning);
        true
    }

    /// Removes `warning`. Returns whether it was present.
    pub fn remove(&mut self, warning: &Warning) -> bool {
        let before = self.0.len();
        self.0.retain(|w| w != warning);
        self.0.len() != before
    }

    pub fn contains(&self, warning: &Warning) -> bool {
        self.0.contains(warning)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Warning> {
        self.0.iter()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// The display messages in insertion order.
    pub fn messages(&self) -> Vec<&'static str> {
        self.0.iter().map(Warning::message).collect()
    }
}

impl FromIterator<Warning> for Warnings {
    fn from_iter<I: IntoIterator<Item = Warning>>(iter: I) -> Self {
        let mut warnings = Warnings::new();
        for w in iter {
            warnings.add(w);
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_deduplicated() {
        let mut w = Warnings::new();
        assert!(w.add(Warning::NoDataFound));
        assert!(!w.add(Warning::NoDataFound));
        assert!(w.add(Warning::CodeInvalid));
        assert_eq!(w.len(), 2);
        assert_eq!(w.messages(), vec!["No data found.", "Code is invalid."]);
    }

    #[test]
    fn remove_reports_presence() {
        let mut w: Warnings = [Warning::ModelIncomplete].into_iter().collect();
        assert!(w.remove(&Warning::ModelIncomplete));
        assert!(!w.remove(&Warning::ModelIncomplete));
        assert!(w.is_empty());
    }
}
