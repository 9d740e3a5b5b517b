use serde::{Deserialize, Serialize};

/// Semantic state of a row that determines its height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowState {
    pub expanded: bool,
    pub match_count: usize,
}

impl RowState {
    pub fn collapsed() -> Self {
        Self {
            expanded: false,
            match_count: 0,
        }
    }
}

/// Row heights in terminal rows.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RowGeometry {
    pub collapsed_height: u32,
    /// Extra rows for the match-list header of an expanded channel
    pub header_allowance: u32,
    pub per_match_height: u32,
}

impl Default for RowGeometry {
    fn default() -> Self {
        Self {
            collapsed_height: 1,
            header_allowance: 1,
            per_match_height: 1,
        }
    }
}

impl RowGeometry {
    pub fn height(&self, state: RowState) -> u32 {
        if !state.expanded {
            return self.collapsed_height;
        }
        let matches = u32::try_from(state.match_count).unwrap_or(u32::MAX);
        self.collapsed_height
            .saturating_add(self.header_allowance)
            .saturating_add(matches.saturating_mul(self.per_match_height))
    }
}
