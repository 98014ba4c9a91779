//! End-to-end tests for the publication pipeline.
//!
//! Every test builds seeded synthetic profiles, runs `Publisher::run` and
//! checks the published dataset against the anonymity guarantee.

use std::collections::BTreeMap;

use pad_core::kward::{kanonymity_level, KWard, RepMode};
use pad_core::learner::{LearnerKind, MetricLearner};
use pad_core::metric::{DistanceMetric, VectorMetric};
use pad_core::pipeline::{argmin_loss, PipelineStage};
use pad_core::{
    Dataset, InterestSpec, PadConfig, PadError, PadResult, Publisher, Record, RecordPair,
    SimilarityLabel,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

// =========================================================================
// FIXTURES
// =========================================================================

/// `clusters` blobs of `per_cluster` daily profiles with `dimension` slots.
fn profile_blobs(clusters: usize, per_cluster: usize, dimension: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut records = Vec::with_capacity(clusters * per_cluster);
    for c in 0..clusters {
        let level = 1.0 + c as f64 * 20.0;
        for i in 0..per_cluster {
            let values = (0..dimension)
                .map(|_| level + rng.gen_range(0.0..1.0))
                .collect();
            records.push(
                Record::new(format!("house-{}-{:02}", c, i), values)
                    .with_metadata("cluster", c.to_string()),
            );
        }
    }
    Dataset::new(records)
}

fn uniform_profiles(n: usize, dimension: usize, seed: u64) -> Dataset {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Dataset::new(
        (0..n)
            .map(|i| {
                let values = (0..dimension).map(|_| rng.gen_range(0.0..4.0)).collect();
                Record::new(format!("meter-{}", i), values)
            })
            .collect(),
    )
}

fn seeded_config(k: usize, seed: u64) -> PadConfig {
    let mut config = PadConfig::default();
    config.anonymity.k = k;
    config.sampling.seed = Some(seed);
    config
}

/// Assert the published vectors form groups of at least `k` identical rows.
fn assert_k_anonymous(dataset: &Dataset, k: usize) {
    let level = kanonymity_level(&dataset.vectors());
    assert!(level >= k, "published data is only {}-anonymous, wanted {}", level, k);
}

/// Assert every block of `width` columns occurs at least `k` times.
fn assert_k_anonymous_blocks(dataset: &Dataset, width: usize, k: usize) {
    let mut counts: BTreeMap<Vec<u64>, usize> = BTreeMap::new();
    for record in &dataset.records {
        for block in record.values.chunks(width) {
            let bits = block.iter().map(|v| v.to_bits()).collect();
            *counts.entry(bits).or_default() += 1;
        }
    }
    assert!(
        counts.values().all(|&c| c >= k),
        "some block occurs fewer than {} times",
        k
    );
}

// =========================================================================
// DIRECT RUNS
// =========================================================================

#[test]
fn test_publish_separated_profiles() {
    let dataset = profile_blobs(4, 10, 8, 11);
    let publisher = Publisher::new(seeded_config(3, 42)).unwrap();

    let publication = publisher.run(&dataset).unwrap();

    assert_eq!(publication.requested_k, 3);
    assert_eq!(publication.effective_k, 3);
    assert!(publication.resampled.is_none());
    assert_eq!(publication.dataset.keys(), dataset.keys());
    for (original, published) in dataset.records.iter().zip(&publication.dataset.records) {
        assert_eq!(original.metadata, published.metadata);
    }
    assert!(publication.groups.iter().all(|g| g.len() >= 3));
    assert_k_anonymous(&publication.dataset, 3);

    let keyed: usize = publication.group_keys.iter().map(Vec::len).sum();
    assert_eq!(keyed, 40);

    assert_eq!(publication.candidates.len(), 2);
    assert!(["diagonal", "blockwise"].contains(&publication.metric.as_str()));
    assert!(publication.loss.aggregate.is_finite());
    assert!(publication.loss.aggregate >= 0.0);
    assert!(publication.labeling_attempts >= 1);
    println!(
        "[VERIFIED] 40 profiles published with metric {} at loss {:.4}",
        publication.metric, publication.loss.aggregate
    );
}

#[test]
fn test_publish_is_deterministic_for_a_seed() {
    let dataset = uniform_profiles(60, 6, 3);
    let publisher = Publisher::new(seeded_config(4, 99)).unwrap();

    let first = publisher.run(&dataset).unwrap();
    let second = publisher.run(&dataset).unwrap();

    assert_eq!(first.dataset, second.dataset);
    assert_eq!(first.groups, second.groups);
    assert_eq!(first.metric, second.metric);
    assert_eq!(first.seed, 99);
}

#[test]
fn test_generated_seed_is_reported_and_reproducible() {
    let dataset = uniform_profiles(50, 4, 8);
    let mut config = seeded_config(3, 0);
    config.sampling.seed = None;

    let first = Publisher::new(config.clone()).unwrap().run(&dataset).unwrap();

    config.sampling.seed = Some(first.seed);
    let replay = Publisher::new(config).unwrap().run(&dataset).unwrap();
    assert_eq!(first.dataset, replay.dataset);
}

#[test]
fn test_sequential_and_parallel_selection_agree() {
    let dataset = uniform_profiles(55, 6, 21);
    let mut config = seeded_config(3, 5);

    config.selection.parallel = true;
    let parallel = Publisher::new(config.clone()).unwrap().run(&dataset).unwrap();
    config.selection.parallel = false;
    let sequential = Publisher::new(config).unwrap().run(&dataset).unwrap();

    assert_eq!(parallel.candidates, sequential.candidates);
    assert_eq!(parallel.dataset, sequential.dataset);
}

#[test]
fn test_report_summarizes_run() {
    let dataset = profile_blobs(3, 10, 6, 4);
    let publication = Publisher::new(seeded_config(3, 1))
        .unwrap()
        .run(&dataset)
        .unwrap();
    let report = publication.report();

    assert_eq!(report.records, 30);
    assert_eq!(report.group_count, publication.groups.len());
    assert!(report.smallest_group >= 3);
    assert_eq!(report.loss.per_interest.len(), 1);

    let json = serde_json::to_value(&report).unwrap();
    assert!(json.get("resampled").is_none());
    assert_eq!(json["effective_k"], 3);
}

#[test]
fn test_multiple_interests() {
    let dataset = uniform_profiles(50, 24, 17);
    let mut config = seeded_config(3, 12);
    config.interests = vec![
        InterestSpec::usage(),
        InterestSpec::window_usage(17, 21),
        InterestSpec::new(pad_core::InterestMode::Arrival),
    ];

    let publication = Publisher::new(config).unwrap().run(&dataset).unwrap();

    let losses = &publication.loss.per_interest;
    assert_eq!(losses.len(), 3);
    let mean = losses.iter().map(|l| l.loss).sum::<f64>() / 3.0;
    assert!((publication.loss.aggregate - mean).abs() < 1e-9);
    assert_k_anonymous(&publication.dataset, 3);
}

// =========================================================================
// RESAMPLING
// =========================================================================

#[test]
fn test_small_dataset_is_resampled() {
    let dataset = uniform_profiles(8, 24, 5);
    let publication = Publisher::new(seeded_config(5, 7))
        .unwrap()
        .run(&dataset)
        .unwrap();

    let plan = publication.resampled.expect("8 records cannot carry 5-anonymity");
    assert_eq!(plan.factor, 6);
    assert_eq!(plan.block_width, 4);
    assert!(8 * plan.factor >= 45);
    assert_eq!(publication.effective_k, 5);

    assert_eq!(publication.dataset.len(), 8);
    assert_eq!(publication.dataset.keys(), dataset.keys());
    assert!(publication.dataset.records.iter().all(|r| r.values.len() == 24));

    // The partition covers the 48 blocks, each group keyed by block.
    let covered: usize = publication.groups.iter().map(|g| g.len()).sum();
    assert_eq!(covered, 48);
    assert!(publication.groups.iter().all(|g| g.len() >= 5));
    assert!(publication.group_keys.iter().flatten().all(|k| k.contains('#')));
    println!("[VERIFIED] n=8, k=5 resampled with factor {}", plan.factor);
}

#[test]
fn test_resampled_blocks_are_k_anonymous() {
    let dataset = uniform_profiles(8, 24, 9);
    let publication = Publisher::new(seeded_config(5, 3))
        .unwrap()
        .run(&dataset)
        .unwrap();
    let width = publication.resampled.unwrap().block_width;
    assert_k_anonymous_blocks(&publication.dataset, width, publication.effective_k);
}

#[test]
fn test_resampling_impossible() {
    // 5 columns admit no factor that lifts 3 records to 45 blocks.
    let dataset = uniform_profiles(3, 5, 1);
    let err = Publisher::new(seeded_config(5, 1))
        .unwrap()
        .run(&dataset)
        .unwrap_err();
    assert!(matches!(err, PadError::InsufficientData { .. }));
    assert!(err.is_anonymity_failure());
}

#[test]
fn test_window_across_blocks_is_measured_per_block() {
    // Evening window on 24 hourly slots; no split of 8 records keeps it whole.
    let dataset = uniform_profiles(8, 24, 1);
    let mut config = seeded_config(5, 1);
    config.interests = vec![InterestSpec::window_usage(17, 21)];

    let publication = Publisher::new(config).unwrap().run(&dataset).unwrap();

    let plan = publication.resampled.expect("8 records cannot carry 5-anonymity");
    assert_eq!(plan.factor, 6);
    assert_eq!(plan.block_width, 4);
    assert_eq!(publication.effective_k, 5);
    assert_eq!(publication.dataset.len(), 8);
    assert_eq!(publication.dataset.keys(), dataset.keys());

    assert_k_anonymous_blocks(&publication.dataset, plan.block_width, 5);

    assert_eq!(publication.loss.per_interest.len(), 1);
    assert_eq!(
        publication.loss.per_interest[0].interest,
        InterestSpec::window_usage(17, 21)
    );
    assert!(publication.loss.aggregate.is_finite());
    println!(
        "[VERIFIED] window [17, 21) over blocks of width {}: loss {:.3}",
        plan.block_width, publication.loss.aggregate
    );
}

#[test]
fn test_resampling_prefers_split_keeping_window_whole() {
    let dataset = uniform_profiles(8, 24, 2);
    let mut config = seeded_config(5, 2);
    config.interests = vec![InterestSpec::window_usage(3, 5)];

    let publication = Publisher::new(config).unwrap().run(&dataset).unwrap();
    let plan = publication.resampled.unwrap();
    assert_eq!(plan.factor, 8);
    assert_eq!(plan.block_width, 3);
    assert_eq!(publication.dataset.len(), 8);
    assert_k_anonymous_blocks(&publication.dataset, plan.block_width, publication.effective_k);
}

// =========================================================================
// FAILURE MODES
// =========================================================================

#[test]
fn test_identical_profiles_exhaust_retry_budget() {
    let dataset = Dataset::from_vectors(vec![vec![1.0, 2.0, 3.0]; 50]);
    let mut config = seeded_config(3, 4);
    config.sampling.max_retries = 2;

    let err = Publisher::new(config).unwrap().run(&dataset).unwrap_err();
    match err {
        PadError::RetryBudgetExceeded {
            attempts,
            last_fraction,
        } => {
            assert_eq!(attempts, 3);
            assert!((last_fraction - 0.3).abs() < 1e-9);
        }
        other => panic!("expected RetryBudgetExceeded, got {:?}", other),
    }
}

#[test]
fn test_labelling_retries_with_larger_sample() {
    // Attempt 0 draws 2 records: a single pair cannot be labelled.
    // Attempt 1 draws every record and succeeds.
    let dataset = uniform_profiles(50, 4, 6);
    let mut config = seeded_config(3, 6);
    config.sampling.initial_fraction = 0.01;
    config.sampling.fraction_step = 0.99;

    let publication = Publisher::new(config).unwrap().run(&dataset).unwrap();
    assert_eq!(publication.labeling_attempts, 2);
    assert_eq!(publication.dataset.len(), 50);
    assert_k_anonymous(&publication.dataset, 3);
    println!("[VERIFIED] labelling succeeded on attempt 2");
}

#[test]
fn test_invalid_dataset_is_rejected() {
    let dataset = Dataset::new(vec![
        Record::new("a", vec![1.0, 2.0]),
        Record::new("b", vec![1.0]),
    ]);
    let err = Publisher::new(seeded_config(2, 0))
        .unwrap()
        .run(&dataset)
        .unwrap_err();
    assert!(matches!(err, PadError::Validation { .. }));
    assert!(!err.is_anonymity_failure());
}

#[test]
fn test_window_outside_profile_is_rejected() {
    let dataset = uniform_profiles(50, 4, 2);
    let mut config = seeded_config(3, 2);
    config.interests = vec![InterestSpec::window_usage(2, 9)];

    let err = Publisher::new(config).unwrap().run(&dataset).unwrap_err();
    assert!(matches!(err, PadError::Validation { .. }));
}

#[test]
fn test_merge_budget_times_out() {
    let dataset = uniform_profiles(50, 4, 6);
    let mut config = seeded_config(3, 6);
    config.clustering.max_merge_steps = Some(0);

    let err = Publisher::new(config).unwrap().run(&dataset).unwrap_err();
    assert!(matches!(err, PadError::Timeout { .. }));
}

// =========================================================================
// CANDIDATE SELECTION
// =========================================================================

/// Learner returning a fixed metric.
struct FixedLearner(VectorMetric);

impl MetricLearner for FixedLearner {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn train(
        &self,
        _pairs: &[RecordPair],
        _labels: &[SimilarityLabel],
    ) -> PadResult<Box<dyn DistanceMetric>> {
        Ok(Box::new(self.0))
    }
}

/// Learner that never finds a signal.
struct SilentLearner;

impl MetricLearner for SilentLearner {
    fn name(&self) -> &'static str {
        "silent"
    }

    fn train(
        &self,
        _pairs: &[RecordPair],
        _labels: &[SimilarityLabel],
    ) -> PadResult<Box<dyn DistanceMetric>> {
        Err(PadError::insufficient_signal("labels carry no signal"))
    }
}

/// Learner failing with a hard error.
struct BrokenLearner;

impl MetricLearner for BrokenLearner {
    fn name(&self) -> &'static str {
        "broken"
    }

    fn train(
        &self,
        _pairs: &[RecordPair],
        _labels: &[SimilarityLabel],
    ) -> PadResult<Box<dyn DistanceMetric>> {
        Err(PadError::validation("pair dimension mismatch"))
    }
}

#[test]
fn test_lower_loss_wins() {
    assert_eq!(argmin_loss(&[3.2, 1.1]), Some(1));
}

#[test]
fn test_skipped_candidate_is_reported() {
    let dataset = uniform_profiles(50, 4, 13);
    let publisher = Publisher::new(seeded_config(3, 13))
        .unwrap()
        .with_learners(vec![
            Box::new(SilentLearner),
            Box::new(FixedLearner(VectorMetric::Manhattan)),
        ]);
    assert_eq!(publisher.learner_names(), vec!["silent", "fixed"]);

    let publication = publisher.run(&dataset).unwrap();

    assert_eq!(publication.metric, "manhattan");
    assert!(publication.candidates[0].skipped.is_some());
    assert!(publication.candidates[0].loss.is_none());
    assert!(publication.candidates[1].loss.is_some());
    assert_k_anonymous(&publication.dataset, 3);
}

#[test]
fn test_hard_learner_error_aborts_run() {
    let dataset = uniform_profiles(50, 4, 14);
    let publisher = Publisher::new(seeded_config(3, 14))
        .unwrap()
        .with_learners(vec![
            Box::new(FixedLearner(VectorMetric::Euclidean)),
            Box::new(BrokenLearner),
        ]);

    let err = publisher.run(&dataset).unwrap_err();
    assert!(matches!(err, PadError::Validation { .. }));
}

#[test]
fn test_no_trainable_candidate() {
    let dataset = uniform_profiles(50, 4, 15);
    let publisher = Publisher::new(seeded_config(3, 15))
        .unwrap()
        .with_learners(vec![Box::new(SilentLearner)]);

    let err = publisher.run(&dataset).unwrap_err();
    assert!(matches!(err, PadError::InsufficientSignal { .. }));
}

#[test]
fn test_single_learner_from_config() {
    let dataset = uniform_profiles(50, 6, 16);
    let mut config = seeded_config(3, 16);
    config.learner.candidates = vec![LearnerKind::Blockwise];

    let publication = Publisher::new(config).unwrap().run(&dataset).unwrap();
    assert_eq!(publication.metric, "blockwise");
    assert_eq!(publication.candidates.len(), 1);
}

// =========================================================================
// ENGINE PROPERTIES
// =========================================================================

#[test]
fn test_twenty_records_four_clusters() {
    let dataset = profile_blobs(4, 5, 3, 10);
    let groups = KWard::new(5, RepMode::Mean)
        .cluster(&dataset.vectors(), &VectorMetric::Euclidean)
        .unwrap();

    assert_eq!(groups.len(), 4);
    for (c, group) in groups.iter().enumerate() {
        assert_eq!(group.members, (c * 5..c * 5 + 5).collect::<Vec<_>>());
    }
}

#[test]
fn test_resanitizing_keeps_the_partition() {
    let dataset = uniform_profiles(40, 5, 31);
    let engine = KWard::new(4, RepMode::Median);

    let once = engine.sanitize(&dataset, &VectorMetric::Euclidean).unwrap();
    let twice = engine
        .sanitize(&once.dataset, &VectorMetric::Euclidean)
        .unwrap();

    let members = |groups: &[pad_core::RecordGroup]| {
        groups.iter().map(|g| g.members.clone()).collect::<Vec<_>>()
    };
    assert_eq!(members(&once.groups), members(&twice.groups));
    assert_eq!(once.dataset, twice.dataset);
}

#[test]
fn test_stage_order() {
    let stages = PipelineStage::all();
    assert_eq!(stages.first(), Some(&PipelineStage::Verify));
    assert_eq!(stages.last(), Some(&PipelineStage::Report));
}
