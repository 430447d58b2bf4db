//! Volume index — pair neighborhoods by volume rank
//!
//! The reference list is loaded once per run, ascending by traded volume, and
//! shared read-only by every concurrent optimization. A pair's "neighbors"
//! are the pairs within ±radius positions of it in that order; the window is
//! clipped at the ends of the distribution, never wrapped or padded.

use crate::types::VolumeRecord;
use rust_decimal::Decimal;

/// A named volume bucket with a half-open `[min, max)` range in USDT
#[derive(Debug, Clone, Copy)]
pub struct VolumeFamily {
    pub name: &'static str,
    pub label: &'static str,
    pub min: i64,
    pub max: i64,
}

/// The five fixed volume families, ordered ascending
pub const VOLUME_FAMILIES: &[VolumeFamily] = &[
    VolumeFamily {
        name: "xs",
        label: "Micro",
        min: 0,
        max: 800_000,
    },
    VolumeFamily {
        name: "s",
        label: "Small",
        min: 800_000,
        max: 2_000_000,
    },
    VolumeFamily {
        name: "m",
        label: "Medium",
        min: 2_000_000,
        max: 5_000_000,
    },
    VolumeFamily {
        name: "l",
        label: "Large",
        min: 5_000_000,
        max: 10_000_000,
    },
    VolumeFamily {
        name: "xl",
        label: "X-Large",
        min: 10_000_000,
        max: 2_000_000_000_000,
    },
];

/// The volume-ascending pair order, materialized for one run
#[derive(Debug, Clone)]
pub struct VolumeIndex {
    records: Vec<VolumeRecord>,
}

impl VolumeIndex {
    /// Build the index from records already ordered ascending by volume
    /// (the repository query provides that order)
    pub fn new(records: Vec<VolumeRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The pairs at positions `[pos-radius, pos+radius]` around `pair` in the
    /// volume order, clipped to valid indices. Empty if `pair` is unknown.
    /// Includes `pair` itself (offset 0), so the result has between 1 and
    /// `2*radius + 1` members.
    pub fn neighbors(&self, pair: &str, radius: u32) -> Vec<String> {
        let Some(position) = self.records.iter().position(|v| v.pair == pair) else {
            return Vec::new();
        };

        let radius = radius as usize;
        let start = position.saturating_sub(radius);
        let end = (position + radius).min(self.records.len() - 1);

        self.records[start..=end]
            .iter()
            .map(|v| v.pair.clone())
            .collect()
    }

    /// Whether `pair`'s volume falls in the named family's `[min, max)` range.
    /// False for an unknown pair or an unknown family name.
    pub fn is_in_family(&self, pair: &str, family: &str) -> bool {
        let Some(record) = self.records.iter().find(|v| v.pair == pair) else {
            return false;
        };
        let Some(family) = VOLUME_FAMILIES.iter().find(|f| f.name == family) else {
            return false;
        };

        record.vol_usdt >= Decimal::from(family.min) && record.vol_usdt < Decimal::from(family.max)
    }
}
