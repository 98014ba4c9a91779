//! K-ward clustering engine.
//!
//! Partitions records into groups of at least `k` members under a pluggable
//! [`DistanceMetric`]. Each group is collapsed to a single representative,
//! which is what gets published for every member.
//!
//! # Algorithm
//!
//! Greedy agglomeration over an arena of proto-groups:
//! 1. Seed one proto-group per distinct vector (bit-identical vectors share a
//!    seed). Seeds with at least `k` members close immediately.
//! 2. While the open proto-groups hold at least `k` records, merge the two
//!    closest open proto-groups (ties by ascending `(min id, max id)`) into a
//!    new slot. A merged slot with at least `k` members closes.
//! 3. Each leftover open proto-group joins the closed group with the nearest
//!    representative (snapshot taken before absorption, ties to the lowest id).
//!
//! Closest-pair search uses a per-slot nearest-neighbour cache that is only
//! recomputed for slots whose cached partner was consumed.
//!
//! Re-clustering a sanitized dataset reproduces its partition: every group
//! is a run of bit-identical vectors of size >= k and seeds as closed.

mod arena;
mod representative;


pub use representative::RepMode;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{PadError, PadResult};
use crate::metric::DistanceMetric;
use crate::types::{Dataset, RecordGroup};

use arena::{Arena, SlotState};

/// Stage name reported by [`PadError::Timeout`].
pub const MERGE_STAGE: &str = "k-ward merge loop";

/// Optional limits on the merge loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusteringBudget {
    /// Wall-clock limit for one clustering call.
    pub max_duration: Option<Duration>,
    /// Maximum number of merges for one clustering call.
    pub max_merge_steps: Option<usize>,
}

impl ClusteringBudget {
    /// No limits.
    pub fn unlimited() -> Self {
        Self::default()
    }

    fn check(&self, started: Instant, steps: usize) -> PadResult<()> {
        let elapsed = started.elapsed();
        let over_steps = self.max_merge_steps.is_some_and(|max| steps >= max);
        let over_time = self.max_duration.is_some_and(|max| elapsed > max);
        if over_steps || over_time {
            return Err(PadError::timeout(MERGE_STAGE, elapsed.as_millis(), steps));
        }
        Ok(())
    }
}

/// Result of sanitizing a dataset.
#[derive(Debug, Clone)]
pub struct Sanitized {
    /// Same keys, order and metadata as the input; values replaced by
    /// group representatives.
    pub dataset: Dataset,
    /// The partition that produced it.
    pub groups: Vec<RecordGroup>,
}

/// The K-ward clustering engine.
#[derive(Debug, Clone)]
pub struct KWard {
    k: usize,
    rep_mode: RepMode,
    budget: ClusteringBudget,
}

#[derive(Debug, Clone, Copy)]
struct Neighbor {
    distance: f64,
    partner: usize,
}

impl KWard {
    /// Create an engine for anonymity level `k`.
    pub fn new(k: usize, rep_mode: RepMode) -> Self {
        Self {
            k,
            rep_mode,
            budget: ClusteringBudget::unlimited(),
        }
    }

    /// Bound the merge loop.
    #[must_use]
    pub fn with_budget(mut self, budget: ClusteringBudget) -> Self {
        self.budget = budget;
        self
    }

    /// Anonymity level.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Representative aggregator.
    pub fn rep_mode(&self) -> RepMode {
        self.rep_mode
    }

    /// Partition `vectors` into groups of at least `k` members.
    ///
    /// Groups are returned ordered by their smallest member index.
    ///
    /// # Errors
    ///
    /// - `PadError::Validation` if `k == 0` or the vectors differ in length
    /// - `PadError::InsufficientData` if fewer than `k` vectors are given
    /// - `PadError::Timeout` if the budget is exhausted
    pub fn cluster<V: AsRef<[f64]>>(
        &self,
        vectors: &[V],
        metric: &dyn DistanceMetric,
    ) -> PadResult<Vec<RecordGroup>> {
        let k = self.k;
        let n = vectors.len();
        if k == 0 {
            return Err(PadError::validation("anonymity level k must be >= 1"));
        }
        if n < k {
            return Err(PadError::insufficient_data(k, n));
        }
        if let Some(first) = vectors.first() {
            let dimension = first.as_ref().len();
            if let Some(pos) = vectors.iter().position(|v| v.as_ref().len() != dimension) {
                return Err(PadError::validation(format!(
                    "vector {} has dimension {}, expected {}",
                    pos,
                    vectors[pos].as_ref().len(),
                    dimension
                )));
            }
        }

        let started = Instant::now();
        let mut arena = seed(vectors, k);
        let seeded = arena.len();
        let seeded_closed = arena.ids_in(SlotState::Closed).len();

        let steps = self.merge_loop(&mut arena, vectors, metric, started)?;
        absorb_leftovers(&mut arena, vectors, metric, self.rep_mode, k, n)?;

        let mut groups: Vec<RecordGroup> = arena
            .into_closed()
            .map(|slot| RecordGroup::new(slot.members, slot.rep))
            .collect();
        groups.sort_by_key(|g| g.members.first().copied().unwrap_or(usize::MAX));

        info!(
            metric = metric.name(),
            records = n,
            k,
            seeds = seeded,
            seeded_closed,
            merges = steps,
            groups = groups.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "k-ward clustering complete"
        );

        Ok(groups)
    }

    /// Cluster a dataset and publish every record as its group representative.
    pub fn sanitize(&self, dataset: &Dataset, metric: &dyn DistanceMetric) -> PadResult<Sanitized> {
        let vectors = dataset.vectors();
        let groups = self.cluster(&vectors, metric)?;

        let mut values = vec![Vec::new(); dataset.len()];
        for group in &groups {
            for &m in &group.members {
                values[m] = group.representative.clone();
            }
        }

        Ok(Sanitized {
            dataset: dataset.with_values(values)?,
            groups,
        })
    }

    fn merge_loop<V: AsRef<[f64]>>(
        &self,
        arena: &mut Arena,
        vectors: &[V],
        metric: &dyn DistanceMetric,
        started: Instant,
    ) -> PadResult<usize> {
        let k = self.k;
        // Indexed by slot id; grows by one per merge.
        let mut nearest: Vec<Option<Neighbor>> = vec![None; arena.len()];
        let open = arena.ids_in(SlotState::Open);
        for &id in &open {
            nearest[id] = find_nearest(arena, &open, id, metric);
        }

        let mut steps = 0;
        while arena.open_population() >= k {
            self.budget.check(started, steps)?;

            let Some((a, b, distance)) = closest_pair(arena, &nearest) else {
                break;
            };
            let merged = arena.merge(a, b, vectors, self.rep_mode, k);
            nearest[a] = None;
            nearest[b] = None;
            nearest.push(None);
            steps += 1;

            let open = arena.ids_in(SlotState::Open);
            for &id in &open {
                if id == merged {
                    continue;
                }
                let stale = nearest[id].map_or(true, |nb| nb.partner == a || nb.partner == b);
                if stale {
                    nearest[id] = find_nearest(arena, &open, id, metric);
                } else if arena.is_open(merged) {
                    let d = finite_or_inf(metric.distance(&arena.get(id).rep, &arena.get(merged).rep));
                    if let Some(nb) = nearest[id] {
                        // Equal distance keeps the older, lower-id partner.
                        if d.total_cmp(&nb.distance) == Ordering::Less {
                            nearest[id] = Some(Neighbor {
                                distance: d,
                                partner: merged,
                            });
                        }
                    }
                }
            }
            if arena.is_open(merged) {
                nearest[merged] = find_nearest(arena, &open, merged, metric);
            }

            debug!(
                step = steps,
                left = a,
                right = b,
                merged,
                distance,
                closed = !arena.is_open(merged),
                "k-ward merge"
            );
        }

        Ok(steps)
    }
}

/// Check that `groups` partition `0..n` exactly and every group has at least
/// `k` members.
///
/// # Errors
///
/// - `PadError::Validation` if an index is missing, repeated or out of range
/// - `PadError::InsufficientData` if a group is smaller than `k`
pub fn verify_partition(groups: &[RecordGroup], n: usize, k: usize) -> PadResult<()> {
    let mut seen = vec![false; n];
    for group in groups {
        if group.len() < k {
            return Err(PadError::insufficient_data(k, group.len()));
        }
        for &m in &group.members {
            if m >= n {
                return Err(PadError::validation(format!(
                    "group member {} out of range for {} records",
                    m, n
                )));
            }
            if std::mem::replace(&mut seen[m], true) {
                return Err(PadError::validation(format!(
                    "record {} assigned to more than one group",
                    m
                )));
            }
        }
    }
    if let Some(missing) = seen.iter().position(|s| !s) {
        return Err(PadError::validation(format!(
            "record {} not assigned to any group",
            missing
        )));
    }
    Ok(())
}

/// k-anonymity level of published vectors: the smallest number of times any
/// distinct vector occurs. Zero for an empty input.
pub fn kanonymity_level<V: AsRef<[f64]>>(vectors: &[V]) -> usize {
    let mut counts: HashMap<Vec<u64>, usize> = HashMap::new();
    for v in vectors {
        *counts.entry(bit_key(v.as_ref())).or_insert(0) += 1;
    }
    counts.values().copied().min().unwrap_or(0)
}

/// Exact-equality key; `-0.0` keys as `0.0` and every NaN alike.
fn bit_key(values: &[f64]) -> Vec<u64> {
    values
        .iter()
        .map(|&v| {
            if v == 0.0 {
                0
            } else if v.is_nan() {
                f64::NAN.to_bits()
            } else {
                v.to_bits()
            }
        })
        .collect()
}

fn finite_or_inf(d: f64) -> f64 {
    if d.is_finite() {
        d
    } else {
        f64::INFINITY
    }
}

/// One proto-group per distinct vector, ids in order of first occurrence.
fn seed<V: AsRef<[f64]>>(vectors: &[V], k: usize) -> Arena {
    let mut slot_of: HashMap<Vec<u64>, usize> = HashMap::new();
    let mut members: Vec<Vec<usize>> = Vec::new();
    for (i, v) in vectors.iter().enumerate() {
        let next = members.len();
        let slot = *slot_of.entry(bit_key(v.as_ref())).or_insert(next);
        if slot == next {
            members.push(Vec::new());
        }
        members[slot].push(i);
    }

    let mut arena = Arena::with_capacity(2 * members.len());
    for m in members {
        // Members are bit-identical, so the first vector is the representative.
        let rep = vectors[m[0]].as_ref().to_vec();
        arena.push(m, rep, k);
    }
    arena
}

/// Nearest open neighbour of `id` among `open`, ties to the lower id.
fn find_nearest(
    arena: &Arena,
    open: &[usize],
    id: usize,
    metric: &dyn DistanceMetric,
) -> Option<Neighbor> {
    let rep = &arena.get(id).rep;
    let mut best: Option<Neighbor> = None;
    // `open` is ascending, so strict improvement keeps the lowest id on ties.
    for &other in open {
        if other == id {
            continue;
        }
        let distance = finite_or_inf(metric.distance(rep, &arena.get(other).rep));
        if best.map_or(true, |b| distance.total_cmp(&b.distance) == Ordering::Less) {
            best = Some(Neighbor {
                distance,
                partner: other,
            });
        }
    }
    best
}

/// Globally closest open pair by `(distance, min id, max id)`.
fn closest_pair(arena: &Arena, nearest: &[Option<Neighbor>]) -> Option<(usize, usize, f64)> {
    arena
        .ids_in(SlotState::Open)
        .into_iter()
        .filter_map(|id| {
            nearest[id].map(|nb| (id.min(nb.partner), id.max(nb.partner), nb.distance))
        })
        .min_by(|x, y| {
            x.2.total_cmp(&y.2)
                .then(x.0.cmp(&y.0))
                .then(x.1.cmp(&y.1))
        })
}

fn absorb_leftovers<V: AsRef<[f64]>>(
    arena: &mut Arena,
    vectors: &[V],
    metric: &dyn DistanceMetric,
    rep_mode: RepMode,
    k: usize,
    n: usize,
) -> PadResult<()> {
    let leftovers = arena.ids_in(SlotState::Open);
    if leftovers.is_empty() {
        return Ok(());
    }
    let closed = arena.ids_in(SlotState::Closed);
    if closed.is_empty() {
        return Err(PadError::insufficient_data(k, n));
    }

    let snapshot: Vec<(usize, Vec<f64>)> = closed
        .iter()
        .map(|&id| (id, arena.get(id).rep.clone()))
        .collect();

    let mut touched = Vec::new();
    for &left in &leftovers {
        let rep = &arena.get(left).rep;
        let mut target = snapshot[0].0;
        let mut best = f64::INFINITY;
        let mut first = true;
        for (id, closed_rep) in &snapshot {
            let d = finite_or_inf(metric.distance(rep, closed_rep));
            if first || d.total_cmp(&best) == Ordering::Less {
                best = d;
                target = *id;
                first = false;
            }
        }

        let moved = std::mem::take(&mut arena.get_mut(left).members);
        arena.get_mut(left).state = SlotState::Retired;
        let slot = arena.get_mut(target);
        slot.members.extend(moved);
        slot.members.sort_unstable();
        if !touched.contains(&target) {
            touched.push(target);
        }
        debug!(leftover = left, target, distance = best, "absorbed leftover proto-group");
    }

    for id in touched {
        let rep = rep_mode.aggregate(vectors, &arena.get(id).members);
        arena.get_mut(id).rep = rep;
    }
    Ok(())
}
