//! Load state shared by source images and reprojected images.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Load state of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadState {
    Idle,
    Loading,
    Loaded,
    Error,
    /// Nothing to load: the requested region has no source data.
    Empty,
}

impl LoadState {
    /// LOADED and ERROR are terminal; EMPTY never leaves its state either.
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoadState::Loaded | LoadState::Error)
    }
}

impl Default for LoadState {
    fn default() -> Self {
        LoadState::Idle
    }
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Idle => "idle",
            LoadState::Loading => "loading",
            LoadState::Loaded => "loaded",
            LoadState::Error => "error",
            LoadState::Empty => "empty",
        };
        write!(f, "{}", name)
    }
}
