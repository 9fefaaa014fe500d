//! Import summary

use serde::{Deserialize, Serialize};

/// Counts reported by a committed import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub datasets_created: usize,
    pub locations_created: usize,
    pub params_created: usize,
    pub columns_created: usize,

    /// Data whose x parsed as a point in time
    pub data_created: usize,

    /// Data whose x was kept verbatim
    pub raw_data_created: usize,

    pub datasets_reused: usize,
    pub locations_reused: usize,
    pub params_reused: usize,
    pub columns_reused: usize,

    /// Data rows read across all five tables
    pub rows_read: usize,
}

impl ImportSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_created(&self) -> usize {
        self.datasets_created
            + self.locations_created
            + self.params_created
            + self.columns_created
            + self.data_created
            + self.raw_data_created
    }

    pub fn total_reused(&self) -> usize {
        self.datasets_reused + self.locations_reused + self.params_reused + self.columns_reused
    }

    pub fn total_data(&self) -> usize {
        self.data_created + self.raw_data_created
    }
}
