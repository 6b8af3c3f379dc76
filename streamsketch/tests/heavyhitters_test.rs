mod common;

use common::true_counts;
use common::zipf_ranks;
use streamsketch::heavyhitters::HeavyHitters;
use streamsketch::heavyhitters::HhConfig;
use streamsketch::ErrorKind;

#[test]
fn test_init_defaults() {
    let sketch = HeavyHitters::new(HhConfig::new(128)).unwrap();
    assert_eq!(sketch.width(), 128);
    assert_eq!(sketch.depth(), 4);
    assert_eq!(sketch.config().max_key_len, 16);
    assert_eq!(sketch.config().phi, 1.0 / 128.0);
    assert_eq!(sketch.n_added(), 0);
    assert!(sketch.query(10, 0).is_empty());
    assert_eq!(sketch.estimate(b"missing"), 0);
}

#[test]
fn test_single_heavy_key() {
    let mut sketch = HeavyHitters::new(HhConfig::new(64)).unwrap();
    for _ in 0..3 {
        sketch.add(b"apple");
    }
    sketch.add(b"banana");

    assert_eq!(sketch.n_added(), 4);
    assert_eq!(sketch.estimate(b"apple"), 3);
    assert_eq!(sketch.query(1, 0), vec![(b"apple".to_vec(), 3)]);
}

// A multi-count add must land exactly where the same number of unit adds
// would: the takeover crosses zero in one step.
#[test]
fn test_add_count_equals_unit_adds() {
    // Width 1 forces every key into the same cell per row
    let config = HhConfig::new(1).with_depth(1).with_phi(0.01);
    let mut multi = HeavyHitters::new(config.clone()).unwrap();
    let mut units = HeavyHitters::new(config).unwrap();

    for sketch in [&mut multi, &mut units] {
        for _ in 0..3 {
            sketch.add(b"a");
        }
    }
    multi.add_count(b"b", 5);
    for _ in 0..5 {
        units.add(b"b");
    }

    // Three a-votes, then five b-votes: b ends owning the cell with 2
    for sketch in [&multi, &units] {
        assert_eq!(sketch.estimate(b"b"), 2);
        assert_eq!(sketch.estimate(b"a"), 0);
        assert_eq!(sketch.n_added(), 8);
    }

    // An exact tie empties the cell but keeps the old key
    let mut tie = HeavyHitters::new(HhConfig::new(1).with_depth(1).with_phi(0.01)).unwrap();
    tie.add_count(b"a", 4);
    tie.add_count(b"b", 4);
    assert_eq!(tie.estimate(b"a"), 0);
    assert_eq!(tie.estimate(b"b"), 0);
    tie.add(b"c");
    assert_eq!(tie.estimate(b"c"), 1);
}

#[test]
fn test_long_keys_truncated() {
    let mut sketch = HeavyHitters::new(HhConfig::new(64).with_max_key_len(4)).unwrap();
    sketch.add(b"longer-key");
    sketch.add(b"longer-key-still");

    // Both share the prefix "long" and count as one key
    assert_eq!(sketch.estimate(b"longer-key"), 2);
    assert_eq!(sketch.query(1, 0), vec![(b"long".to_vec(), 2)]);
}

// Zipf(1) stream of 100k over a 10k vocabulary: everything the sketch
// reports above phi = 0.01 must be a genuinely frequent element.
#[test]
fn test_zipf_top_k_recovery() {
    let ranks = zipf_ranks(100_000, 10_000, 42);
    let truth = true_counts(&ranks);
    let top20: Vec<Vec<u8>> = truth
        .iter()
        .take(20)
        .map(|(r, _)| format!("id-{r:05}").into_bytes())
        .collect();

    let config = HhConfig::new(100).with_phi(0.01);
    let mut sketch = HeavyHitters::new(config).unwrap();
    for r in &ranks {
        sketch.add(format!("id-{r:05}").as_bytes());
    }
    assert_eq!(sketch.n_added(), 100_000);

    let top10 = sketch.query(10, 0);
    assert!(top10.len() >= 5, "expected at least 5 candidates above phi * n");
    for (key, count) in &top10 {
        assert!(top20.contains(key), "reported key outside the true top-20");
        assert!(*count as f64 >= 0.01 * 100_000.0);
    }
    // The clear leaders come back in order
    for (i, (key, _)) in top10.iter().take(5).enumerate() {
        assert_eq!(key, &top20[i], "rank {} out of order", i + 1);
    }
}

#[test]
fn test_query_threshold_filters() {
    let mut sketch = HeavyHitters::new(HhConfig::new(64).with_phi(0.001)).unwrap();
    for _ in 0..100 {
        sketch.add(b"big");
    }
    for _ in 0..10 {
        sketch.add(b"small");
    }

    let all = sketch.query(10, 0);
    assert_eq!(all.len(), 2);
    let filtered = sketch.query(10, 50);
    assert_eq!(filtered, vec![(b"big".to_vec(), 100)]);
}

#[test]
fn test_query_orders_ties_by_key() {
    let mut sketch = HeavyHitters::new(HhConfig::new(64).with_phi(0.001)).unwrap();
    for key in [b"cc".as_slice(), b"aa", b"bb"] {
        for _ in 0..5 {
            sketch.add(key);
        }
    }
    let top = sketch.query(3, 0);
    assert_eq!(
        top,
        vec![
            (b"aa".to_vec(), 5),
            (b"bb".to_vec(), 5),
            (b"cc".to_vec(), 5),
        ]
    );
}

// Merging a sketch with itself-shaped content doubles every matching cell,
// so n_added and the top counts double exactly.
#[test]
fn test_merge_doubles() {
    let ranks = zipf_ranks(20_000, 1_000, 9);
    let config = HhConfig::new(128).with_phi(0.001);
    let mut a = HeavyHitters::new(config.clone()).unwrap();
    let mut b = HeavyHitters::new(config).unwrap();
    for r in &ranks {
        a.add(format!("id-{r:04}").as_bytes());
        b.add(format!("id-{r:04}").as_bytes());
    }

    let before = a.query(5, 0);
    a.merge(&b).unwrap();
    assert_eq!(a.n_added(), 40_000);

    let after = a.query(5, 0);
    assert_eq!(after.len(), before.len());
    for ((key_a, count_a), (key_b, count_b)) in after.iter().zip(before.iter()) {
        assert_eq!(key_a, key_b);
        assert_eq!(*count_a, 2 * count_b);
    }
}

#[test]
fn test_merge_competing_cells() {
    // Width 1, depth 1: a single contested cell
    let config = HhConfig::new(1).with_depth(1).with_phi(0.01);
    let mut a = HeavyHitters::new(config.clone()).unwrap();
    let mut b = HeavyHitters::new(config).unwrap();
    a.add_count(b"x", 7);
    b.add_count(b"y", 3);

    let mut winner = a.clone();
    winner.merge(&b).unwrap();
    assert_eq!(winner.estimate(b"x"), 4);
    assert_eq!(winner.estimate(b"y"), 0);

    // The larger counter wins regardless of merge direction
    b.merge(&a).unwrap();
    assert_eq!(b.estimate(b"x"), 4);
    assert_eq!(b.estimate(b"y"), 0);
}

#[test]
fn test_merge_incompatible() {
    let mut a = HeavyHitters::new(HhConfig::new(64)).unwrap();
    let b = HeavyHitters::new(HhConfig::new(128)).unwrap();
    assert_eq!(a.merge(&b).unwrap_err().kind(), ErrorKind::IncompatibleSketch);

    // phi must match even when the grids agree
    let c = HeavyHitters::new(HhConfig::new(64).with_phi(0.5)).unwrap();
    assert_eq!(a.merge(&c).unwrap_err().kind(), ErrorKind::IncompatibleSketch);

    let d = HeavyHitters::new(HhConfig::new(64).with_max_key_len(8)).unwrap();
    assert_eq!(a.merge(&d).unwrap_err().kind(), ErrorKind::IncompatibleSketch);
}

#[test]
fn test_saturation_flag() {
    let mut sketch = HeavyHitters::new(HhConfig::new(4).with_depth(1)).unwrap();
    sketch.add_count(b"hot", u64::from(u32::MAX));
    assert!(!sketch.saturated());
    sketch.add(b"hot");
    assert!(sketch.saturated());
    assert_eq!(sketch.estimate(b"hot"), u64::from(u32::MAX));
}

#[test]
fn test_add_ngram() {
    let mut sketch = HeavyHitters::new(HhConfig::new(64).with_phi(0.001)).unwrap();
    sketch.add_ngram(b"ababa", 2);
    // Windows ab, ba, ab, ba
    assert_eq!(sketch.n_added(), 4);
    assert_eq!(sketch.estimate(b"ab"), 2);
    assert_eq!(sketch.estimate(b"ba"), 2);
}

#[test]
fn test_invalid_configs() {
    assert_eq!(
        HeavyHitters::new(HhConfig::new(0)).unwrap_err().kind(),
        ErrorKind::InvalidConfig
    );
    assert_eq!(
        HeavyHitters::new(HhConfig::new(8).with_depth(0)).unwrap_err().kind(),
        ErrorKind::InvalidConfig
    );
    assert_eq!(
        HeavyHitters::new(HhConfig::new(8).with_max_key_len(0)).unwrap_err().kind(),
        ErrorKind::InvalidConfig
    );
    assert_eq!(
        HeavyHitters::new(HhConfig::new(8).with_phi(0.0)).unwrap_err().kind(),
        ErrorKind::InvalidConfig
    );
    assert_eq!(
        HeavyHitters::new(HhConfig::new(8).with_phi(1.5)).unwrap_err().kind(),
        ErrorKind::InvalidConfig
    );
}
