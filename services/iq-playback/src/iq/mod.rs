//! Recorded I/Q file handling
//!
//! Files hold raw interleaved little-endian i16 pairs (I, Q) with no
//! header, the layout UHD's `rx_samples_to_file` writes for `sc16`.

mod loader;

pub use loader::load_cs16;
