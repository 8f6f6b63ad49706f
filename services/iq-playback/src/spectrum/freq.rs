//! FFT bin frequencies

/// Frequency of each FFT bin, in FFT output order.
///
/// Bin `i` sits at `i * fs / len`; bins at or above `fs / 2` wrap to the
/// negative side, so the axis runs 0 up to just below `+fs/2`, then from
/// `-fs/2` back towards 0.
///
/// The wrap is decided on the bin index, not the rounded frequency, so bin
/// `len / 2` always lands on `-fs/2` whatever the rate.
pub fn frequency_axis(len: usize, sample_rate: f64) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let freq = i as f64 * sample_rate / len as f64;
            if 2 * i >= len {
                freq - sample_rate
            } else {
                freq
            }
        })
        .collect()
}

/// Index of the first negative-frequency bin, i.e. the rotation that puts
/// the axis in ascending order.
pub fn wrap_index(len: usize) -> usize {
    (len + 1) / 2
}
