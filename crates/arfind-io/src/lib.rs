//! arfind-io: Filesystem raster I/O for arfind.
//!
//! Loads source images, saves annotated output and debug masks. All
//! detection logic lives in `arfind-pipeline`; this crate only moves
//! pixels between disk and memory.

pub mod raster;

pub use raster::{IoError, load, load_grayscale, render_and_save, save, save_mask};
