// Shared helpers for the hardware-backed tests.
#![allow(dead_code)]

use cl_samples::{select, Selection, Session};

/// Every (platform, device) index pair on this machine.
pub fn device_pairs() -> Vec<(usize, usize)> {
    let platforms = select::platforms().unwrap();
    let mut pairs = Vec::new();
    for (p, platform) in platforms.iter().enumerate() {
        for d in 0..select::devices(platform).unwrap().len() {
            pairs.push((p, d));
        }
    }
    pairs
}

/// Session on the first device, or `None` when no OpenCL device exists.
pub fn first_session() -> Option<Session> {
    if device_pairs().is_empty() {
        eprintln!("no OpenCL device found, skipping");
        return None;
    }
    Some(Selection::resolve(0, 0).unwrap().open().unwrap())
}
