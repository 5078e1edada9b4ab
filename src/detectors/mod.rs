pub mod divergence;
pub mod extrema;
pub mod score;
