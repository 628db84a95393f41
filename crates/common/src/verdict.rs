//! Oracle verdicts and the SAFE/THREAT classification derived from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-bucket detector counts reported by the oracle.
///
/// Unknown buckets (`timeout`, `type-unsupported`, ...) are ignored on input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionStats {
    #[serde(default)]
    pub malicious: u32,
    #[serde(default)]
    pub suspicious: u32,
    #[serde(default)]
    pub harmless: u32,
    #[serde(default)]
    pub undetected: u32,
}

impl DetectionStats {
    /// Detectors that flagged the content in any way.
    pub fn flagged(&self) -> u32 {
        self.malicious.saturating_add(self.suspicious)
    }

    pub fn total(&self) -> u32 {
        self.flagged()
            .saturating_add(self.harmless)
            .saturating_add(self.undetected)
    }
}

/// One engine's opinion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineResult {
    pub engine_name: String,
    /// Bucket name as reported (`malicious`, `undetected`, ...).
    pub category: String,
    /// Signature name, when the engine produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Client-visible state of a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    /// `malicious + suspicious == 0`.
    Safe,
    /// At least one detector flagged the content.
    Threat,
}

/// The oracle's classification of one fingerprint. Immutable once produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    pub stats: DetectionStats,
    /// Keyed by engine name; a `BTreeMap` keeps serialized output stable.
    #[serde(default)]
    pub engines: BTreeMap<String, EngineResult>,
}

impl Verdict {
    pub fn from_stats(stats: DetectionStats) -> Self {
        Self {
            stats,
            engines: BTreeMap::new(),
        }
    }

    pub fn classification(&self) -> Classification {
        if self.stats.flagged() == 0 {
            Classification::Safe
        } else {
            Classification::Threat
        }
    }

    pub fn is_threat(&self) -> bool {
        self.classification() == Classification::Threat
    }

    /// Engines that put the content in the malicious or suspicious bucket.
    pub fn flagging_engines(&self) -> impl Iterator<Item = &EngineResult> {
        self.engines
            .values()
            .filter(|e| e.category == "malicious" || e.category == "suspicious")
    }
}
