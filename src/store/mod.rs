// Persistent store boundary

pub mod database;

pub use database::AlignmentDatabase;

use crate::features::{ChannelScores, Entity, FeatureChannel};
use std::collections::HashMap;

/// Which collection a run compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Segment,
    Score,
}

/// Score-to-score comparison level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Note,
    Structure,
    SharedSegments,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Note => "note",
            Level::Structure => "structure",
            Level::SharedSegments => "shared_segments",
        }
    }

    pub fn parse(s: &str) -> Option<Level> {
        match s {
            "note" => Some(Level::Note),
            "structure" => Some(Level::Structure),
            "shared_segments" => Some(Level::SharedSegments),
            _ => None,
        }
    }
}

/// What feature data a run loads for its entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityMode {
    /// Raw feature sequences of every segment.
    SegmentFeatures,
    /// Raw feature sequences of every score.
    ScoreFeatures,
    /// Per-score segment group-id sequences, used as feature sequences.
    ScoreStructure,
}

/// Scores for one unordered entity pair. Ids are canonicalized so each pair
/// is stored exactly once with `id_lower < id_higher`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentResult {
    pub id_lower: i64,
    pub id_higher: i64,
    /// Level tag for score-granularity results; segment results carry none.
    pub level: Option<Level>,
    pub scores: ChannelScores,
}

impl AlignmentResult {
    pub fn new(id_a: i64, id_b: i64, level: Option<Level>, scores: ChannelScores) -> Self {
        Self {
            id_lower: id_a.min(id_b),
            id_higher: id_a.max(id_b),
            level,
            scores,
        }
    }
}

/// Store adapter the orchestrator drives. Persistence is append-only;
/// repeated runs append duplicate rows.
pub trait Store: Sync {
    /// Load all entities of a collection with their feature sequences.
    fn load_entities(&self, mode: EntityMode) -> anyhow::Result<Vec<Entity>>;

    /// All score ids, for the shared-segments phase.
    fn load_score_ids(&self) -> anyhow::Result<Vec<i64>>;

    /// Sparse group-id -> occurrence-count map for one score and channel.
    fn load_group_occurrences(
        &self,
        score_id: i64,
        channel: FeatureChannel,
    ) -> anyhow::Result<HashMap<i64, u32>>;

    /// Maximum group id across the whole collection for one channel.
    fn load_max_group_id(&self, channel: FeatureChannel) -> anyhow::Result<i64>;

    /// Persist one batch of results as a single grouped transactional write.
    fn persist(&self, results: &[AlignmentResult], granularity: Granularity) -> anyhow::Result<()>;
}
