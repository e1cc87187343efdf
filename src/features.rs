// Feature sequences and channels

/// One musical attribute over time. `None` marks a rest or undefined value.
pub type FeatureSequence = Vec<Option<i32>>;

/// The five feature channels, in the fixed order used everywhere:
/// engines, persisted columns, and score tuples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureChannel {
    Diatonic,
    Chromatic,
    Rhythmic,
    DiatonicRhythmic,
    ChromaticRhythmic,
}

impl FeatureChannel {
    pub const ALL: [FeatureChannel; 5] = [
        FeatureChannel::Diatonic,
        FeatureChannel::Chromatic,
        FeatureChannel::Rhythmic,
        FeatureChannel::DiatonicRhythmic,
        FeatureChannel::ChromaticRhythmic,
    ];

    /// Channel name as stored in the SegmentToGroup feature_type column.
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureChannel::Diatonic => "diatonic",
            FeatureChannel::Chromatic => "chromatic",
            FeatureChannel::Rhythmic => "rhythmic",
            FeatureChannel::DiatonicRhythmic => "diatonic_rhythmic",
            FeatureChannel::ChromaticRhythmic => "chromatic_rhythmic",
        }
    }

    pub fn index(&self) -> usize {
        *self as usize
    }
}

/// Fixed-order per-channel values: one slot per feature channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelValues<T>(pub [T; 5]);

impl<T> ChannelValues<T> {
    pub fn get(&self, channel: FeatureChannel) -> &T {
        &self.0[channel.index()]
    }

    pub fn get_mut(&mut self, channel: FeatureChannel) -> &mut T {
        &mut self.0[channel.index()]
    }

    /// Build by evaluating `f` once per channel, in channel order.
    pub fn from_fn(mut f: impl FnMut(FeatureChannel) -> T) -> Self {
        ChannelValues(FeatureChannel::ALL.map(&mut f))
    }
}

/// A segment or score with its five parallel feature sequences.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: i64,
    pub features: ChannelValues<FeatureSequence>,
}

/// Per-pair scores for the five channels, in channel order.
pub type ChannelScores = ChannelValues<i64>;

/// Parse a `;`-delimited feature string into a sequence of optional tokens.
///
/// `r` is the rest token. Empty fields between delimiters are skipped, not
/// counted as rests. An unparsable token is substituted with a rest so the
/// batch can continue.
pub fn parse_feature(feature: &str) -> FeatureSequence {
    let mut result = Vec::new();

    for value in feature.split(';') {
        if value.is_empty() {
            continue;
        }

        if value == "r" {
            result.push(None);
        } else {
            match value.parse::<i32>() {
                Ok(v) => result.push(Some(v)),
                Err(e) => {
                    log::warn!("Invalid value in feature: '{}' ({}), treating as rest", value, e);
                    result.push(None);
                }
            }
        }
    }

    result
}
