#![cfg(feature = "metrics")]

use once_cell::sync::Lazy;
use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Instant,
};
use tracing::info;

/* ───────────── Raw latencies ────────────────────────── */

static TIMES: Lazy<Mutex<Vec<(&'static str, u128)>>> = Lazy::new(|| Mutex::new(Vec::new()));

/// Records the time elapsed since `start` under `name`.
pub fn record(name: &'static str, start: Instant) {
    let dur = start.elapsed().as_micros();
    if let Ok(mut times) = TIMES.lock() {
        times.push((name, dur));
    }
}

/* ───────────── Live buffer allocations ──────────────── */

pub static ALLOCS: AtomicUsize = AtomicUsize::new(0);
pub static ALLOC_BYTES: AtomicUsize = AtomicUsize::new(0);

/// Mean and 95th percentile of a sorted, non-empty sample.
fn stats(sorted: &[u128]) -> (u128, u128) {
    let mean = sorted.iter().sum::<u128>() / sorted.len() as u128;
    let p95 = sorted[((sorted.len() * 95) / 100).saturating_sub(1)];
    (mean, p95)
}

/// Logs per-operation latencies and drains the samples.
pub fn summary() {
    let mut map: BTreeMap<&str, Vec<u128>> = BTreeMap::new();
    if let Ok(mut times) = TIMES.lock() {
        for (name, us) in times.drain(..) {
            map.entry(name).or_default().push(us);
        }
    }

    for (name, mut v) in map {
        v.sort_unstable();
        let (mean, p95) = stats(&v);
        info!("{name:<18} n={:>3} mean={mean:>6} µs p95={p95:>6} µs", v.len());
    }

    let allocs = ALLOCS.load(Ordering::Relaxed);
    let bytes = ALLOC_BYTES.load(Ordering::Relaxed);
    info!("live buffers: {allocs} ({} MiB)", bytes / 1024 / 1024);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_of_small_sample() {
        assert_eq!(stats(&[10]), (10, 10));
        assert_eq!(stats(&[1, 2, 3, 4, 10]), (4, 4));
    }

    #[test]
    fn record_then_summary_drains() {
        record("test_op", Instant::now());
        summary();
        assert!(TIMES.lock().unwrap().iter().all(|(n, _)| *n != "test_op"));
    }
}
