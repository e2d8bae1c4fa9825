//! Shared state handed to every handler.

use crate::hub::RelayHub;

#[derive(Debug, Clone, Default)]
pub struct AppState {
    pub hub: RelayHub,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}
