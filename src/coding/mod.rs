//! Entropy coders and the histogram helpers they are built on.

pub mod hist;
pub mod simple;
