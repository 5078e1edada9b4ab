#![allow(clippy::needless_range_loop)]

pub mod detectors;
pub mod utilities;
