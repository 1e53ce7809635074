//! Pixel values for synthetic analysis grids.
//!
//! Every value encodes where it came from, so a test can check any output
//! pixel against its source.

/// Value stored at `(col, row)` of a band in one timestep of the synthetic
/// archive.
///
/// Values stay below 65535 for up to five timesteps so they survive 16-bit
/// encoding unchanged.
pub fn fixture_value(timestep: usize, band: usize, col: usize, row: usize) -> f32 {
    (timestep * 10_000 + (band - 1) * 1_000 + col * 100 + row) as f32
}

/// Creates a band plane of [`fixture_value`]s.
pub fn create_fixture_band(width: usize, height: usize, timestep: usize, band: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push(fixture_value(timestep, band, col, row));
        }
    }
    data
}
