//! Shared helpers for the integration tests.

/// Deterministic Zipf(1) rank stream: inverse-CDF sampling driven by an LCG
/// so every run (and every implementation of the test) sees the same
/// stream. Ranks are 1-based.
#[allow(dead_code)] // false-positive
pub fn zipf_ranks(n: usize, vocab: usize, mut state: u64) -> Vec<usize> {
    let total: f64 = (1..=vocab).map(|r| 1.0 / r as f64).sum();
    let mut cdf = Vec::with_capacity(vocab);
    let mut acc = 0.0;
    for r in 1..=vocab {
        acc += 1.0 / r as f64 / total;
        cdf.push(acc);
    }

    let mut out = Vec::with_capacity(n);
    for _ in 0..n {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let u = (state >> 11) as f64 * (1.0 / (1u64 << 53) as f64);
        let idx = cdf.partition_point(|&c| c < u).min(vocab - 1);
        out.push(idx + 1);
    }
    out
}

/// Exact counts of each rank in a stream, descending, ties by rank.
#[allow(dead_code)] // false-positive
pub fn true_counts(ranks: &[usize]) -> Vec<(usize, u64)> {
    let mut counts = std::collections::HashMap::new();
    for &r in ranks {
        *counts.entry(r).or_insert(0u64) += 1;
    }
    let mut sorted: Vec<_> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    sorted
}

/// One-sample t statistic of the errors against a zero mean; 0 when the
/// sample has no spread.
#[allow(dead_code)] // false-positive
pub fn t_statistic(errors: &[f64]) -> f64 {
    let n = errors.len() as f64;
    let mean = errors.iter().sum::<f64>() / n;
    let var = errors.iter().map(|e| (e - mean) * (e - mean)).sum::<f64>() / (n - 1.0);
    if var == 0.0 {
        return 0.0;
    }
    mean.abs() / (var.sqrt() / n.sqrt())
}
