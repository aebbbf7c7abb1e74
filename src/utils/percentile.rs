/// Nearest-rank percentile over the first `n` values of an ascending slice.
///
/// `index = ceil(p / 100 * n) - 1`, clamped into `[0, n - 1]`.
/// An empty sample yields 0 for every `p`.
pub fn percentile(p: f64, sorted: &[u64], n: usize) -> u64 {
    let n = n.min(sorted.len());
    if n == 0 {
        return 0;
    }
    let rank = (p * n as f64 / 100.0).ceil() as i64 - 1;
    let index = rank.clamp(0, n as i64 - 1) as usize;
    sorted[index]
}

/// Nearest-rank quantile (`q` in `[0, 1]`) over an ascending slice.
///
/// The rank is computed in parts-per-million integers so that `q * n`
/// landing on a whole number is never pushed one rank up by float error.
pub fn quantile(q: f64, sorted: &[u64]) -> u64 {
    let n = sorted.len() as u64;
    if n == 0 {
        return 0;
    }
    let ppm = (q * 1_000_000.0).round().max(0.0) as u64;
    let rank = ppm.saturating_mul(n).div_ceil(1_000_000);
    let index = rank.saturating_sub(1).min(n - 1);
    sorted[index as usize]
}
