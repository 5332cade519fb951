//! Fixed-size histogram of an intensity curve and its flat float32 wire format.

pub mod bins;
pub mod packer;

pub use bins::downsample;
