//! A collection of modules that implement Lempel–Ziv matching.

pub mod matcher;
pub mod window;

pub use window::HistoryWindow;
