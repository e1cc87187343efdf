// Pairwise batch orchestrator

use crate::alignment::{global_alignment, occurrence_vector, scaled_distance, ScoringParams};
use crate::features::{ChannelScores, ChannelValues, Entity, FeatureChannel};
use crate::store::{AlignmentResult, EntityMode, Granularity, Level, Store};
use ndarray::Array1;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Sizing knobs for a batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Results accumulated per worker before a transactional flush.
    pub batch_size: usize,
    /// Pairs between progress reports.
    pub progress_interval: usize,
    /// Worker thread count; 0 uses available parallelism.
    pub worker_threads: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            batch_size: 10_000,
            progress_interval: 100,
            worker_threads: 0,
        }
    }
}

/// Run one full pairwise comparison batch and persist the results.
///
/// Every unordered pair of distinct entities in the collection is processed
/// exactly once. A failed store read yields an empty collection, a failed
/// store write drops that batch; neither aborts the run.
pub fn run(
    store: &dyn Store,
    granularity: Granularity,
    level: Option<Level>,
    params: &ScoringParams,
    opts: &BatchOptions,
) {
    match (granularity, level) {
        (Granularity::Score, Some(Level::SharedSegments)) => {
            run_shared_segments(store, opts);
        }
        _ => {
            let mode = match (granularity, level) {
                (Granularity::Segment, _) => EntityMode::SegmentFeatures,
                (Granularity::Score, Some(Level::Structure)) => EntityMode::ScoreStructure,
                (Granularity::Score, _) => EntityMode::ScoreFeatures,
            };
            let entities = or_empty(store.load_entities(mode), "entities");
            log::info!(
                "Aligning {} {} entities",
                entities.len(),
                match granularity {
                    Granularity::Segment => "segment",
                    Granularity::Score => "score",
                }
            );

            process_pairs(store, &entities, granularity, level, opts, |e| e.id, |a, b| {
                ChannelValues::from_fn(|channel| {
                    global_alignment(a.features.get(channel), b.features.get(channel), params)
                })
            });
        }
    }
}

/// Dense group-occurrence vectors of one score, cached for the whole run.
struct ScoreProfile {
    id: i64,
    vectors: ChannelValues<Array1<f64>>,
}

/// Compare all score pairs by how similarly they draw on the segment-group
/// vocabulary: Euclidean distance between group-occurrence count vectors.
fn run_shared_segments(store: &dyn Store, opts: &BatchOptions) {
    let score_ids = or_empty(store.load_score_ids(), "score ids");

    // One shared maximum per channel; computed once, reused for every pair.
    let max_group_ids: ChannelValues<i64> = ChannelValues::from_fn(|channel| {
        let max = or_zero(store.load_max_group_id(channel), channel);
        log::info!("Max group ID for {}: {}", channel.as_str(), max);
        max
    });

    // Occurrence vectors are built once per (score, channel) and reused
    // across all O(N^2) comparisons.
    log::info!("Building group occurrence cache for {} scores", score_ids.len());
    let profiles: Vec<ScoreProfile> = score_ids
        .iter()
        .map(|&id| ScoreProfile {
            id,
            vectors: ChannelValues::from_fn(|channel| {
                let occurrences = store
                    .load_group_occurrences(id, channel)
                    .unwrap_or_else(|e| {
                        log::warn!(
                            "Failed to load group occurrences for score {} ({}): {}",
                            id,
                            channel.as_str(),
                            e
                        );
                        Default::default()
                    });
                occurrence_vector(&occurrences, *max_group_ids.get(channel))
            }),
        })
        .collect();

    process_pairs(
        store,
        &profiles,
        Granularity::Score,
        Some(Level::SharedSegments),
        opts,
        |p| p.id,
        |a, b| {
            ChannelValues::from_fn(|channel| {
                scaled_distance(a.vectors.get(channel), b.vectors.get(channel))
            })
        },
    );
}

/// Drive a scorer over all unordered pairs of `entities`.
///
/// The (i, j) index space is split across worker threads by row; each worker
/// owns its DP state and a private batch buffer it flushes independently, so
/// the store write is the only serialization point.
fn process_pairs<E: Sync>(
    store: &dyn Store,
    entities: &[E],
    granularity: Granularity,
    level: Option<Level>,
    opts: &BatchOptions,
    id_of: impl Fn(&E) -> i64 + Sync,
    score: impl Fn(&E, &E) -> ChannelScores + Sync,
) {
    let n = entities.len();
    let total = n * n.saturating_sub(1) / 2;
    if total == 0 {
        log::info!("Nothing to compare (fewer than two entities)");
        return;
    }

    let workers = match opts.worker_threads {
        0 => std::thread::available_parallelism().map(|p| p.get()).unwrap_or(1),
        w => w,
    }
    .min(n - 1);

    let completed = AtomicUsize::new(0);
    let batch_size = opts.batch_size.max(1);
    let interval = opts.progress_interval.max(1);

    let (row_tx, row_rx) = crossbeam_channel::unbounded::<usize>();
    for i in 0..n - 1 {
        // Channel is unbounded and receivers outlive this loop
        let _ = row_tx.send(i);
    }
    drop(row_tx);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            let row_rx = row_rx.clone();
            let completed = &completed;
            let id_of = &id_of;
            let score = &score;
            scope.spawn(move || {
                let mut batch: Vec<AlignmentResult> = Vec::with_capacity(batch_size);

                while let Ok(i) = row_rx.recv() {
                    for j in i + 1..n {
                        let scores = score(&entities[i], &entities[j]);
                        batch.push(AlignmentResult::new(
                            id_of(&entities[i]),
                            id_of(&entities[j]),
                            level,
                            scores,
                        ));

                        let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                        if done % interval == 0 {
                            log::info!(
                                "Progress: {}/{} comparisons ({:.2}%)",
                                done,
                                total,
                                done as f64 * 100.0 / total as f64
                            );
                        }

                        if batch.len() >= batch_size {
                            flush(store, &mut batch, granularity);
                        }
                    }
                }

                flush(store, &mut batch, granularity);
            });
        }
    });

    log::info!("Progress: {}/{} comparisons (100.00%)", total, total);
}

/// Persist one worker's buffered results. A failed write drops the batch
/// with a warning; the run continues without retrying.
fn flush(store: &dyn Store, batch: &mut Vec<AlignmentResult>, granularity: Granularity) {
    if batch.is_empty() {
        return;
    }
    if let Err(e) = store.persist(batch, granularity) {
        log::warn!("Dropping batch of {} results after failed write: {}", batch.len(), e);
    }
    batch.clear();
}

fn or_empty<T>(result: anyhow::Result<Vec<T>>, what: &str) -> Vec<T> {
    result.unwrap_or_else(|e| {
        log::warn!("Failed to load {}: {}", what, e);
        Vec::new()
    })
}

fn or_zero(result: anyhow::Result<i64>, channel: FeatureChannel) -> i64 {
    result.unwrap_or_else(|e| {
        log::warn!("Failed to load max group id for {}: {}", channel.as_str(), e);
        0
    })
}
