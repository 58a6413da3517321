//! Test data generators for synthetic precipitation fields.
//!
//! Values are whole millimetres so sums and differences are exact in `f32`,
//! which lets tests compare results with `assert_eq!`.

/// Creates one interval's worth of precipitation in whole millimetres.
///
/// Roughly a quarter of the cells get rain (1 to 20 mm), the rest stay dry.
/// The same `seed` always produces the same grid.
pub fn create_precipitation_grid(width: usize, height: usize, seed: u32) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            let hash = simple_hash(col as u32, row as u32, seed);
            let precip = if hash % 4 == 0 {
                (1 + hash % 20) as f32
            } else {
                0.0
            };
            data.push(precip);
        }
    }
    data
}

/// Creates `steps` snapshots of running precipitation totals.
///
/// Snapshot 0 is all zeros; snapshot `i` adds
/// `create_precipitation_grid(width, height, seed + i)` to snapshot `i - 1`,
/// mirroring how WRF accumulates rain from the start of a run.
pub fn create_accumulated_series(width: usize, height: usize, steps: usize, seed: u32) -> Vec<Vec<f32>> {
    let mut series = Vec::with_capacity(steps);
    let mut total = vec![0.0f32; width * height];
    for step in 0..steps {
        if step > 0 {
            let increment = create_precipitation_grid(width, height, seed.wrapping_add(step as u32));
            for (t, inc) in total.iter_mut().zip(&increment) {
                *t += inc;
            }
        }
        series.push(total.clone());
    }
    series
}

/// Elementwise `current - previous`.
pub fn difference(previous: &[f32], current: &[f32]) -> Vec<f32> {
    previous.iter().zip(current).map(|(p, c)| c - p).collect()
}

/// Creates a grid filled with a constant value.
pub fn create_constant_grid(width: usize, height: usize, value: f32) -> Vec<f32> {
    vec![value; width * height]
}

/// Simple deterministic hash for reproducible test data.
fn simple_hash(x: u32, y: u32, seed: u32) -> u32 {
    let mut h = seed;
    h = h.wrapping_mul(31).wrapping_add(x);
    h = h.wrapping_mul(31).wrapping_add(y);
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;
    h
}
