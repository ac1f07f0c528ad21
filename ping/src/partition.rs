/// Split `total` probes across `workers`.
///
/// Every worker gets `total / workers`; the first `total % workers` workers
/// get one more. Returns an empty split for zero workers.
pub fn partition(total: u64, workers: usize) -> Vec<u64> {
    if workers == 0 {
        return Vec::new();
    }
    let base = total / workers as u64;
    let remainder = (total % workers as u64) as usize;
    (0..workers)
        .map(|index| base + u64::from(index < remainder))
        .collect()
}
