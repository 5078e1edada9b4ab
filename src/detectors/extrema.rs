//! # Local Extrema (Peaks / Troughs)
//!
//! Identifies strict local maxima and minima over a symmetric `order`
//! neighborhood. A sample qualifies as a peak when it strictly exceeds every
//! neighbor within `order` positions on each side, and as a trough when it
//! strictly undercuts them. Plateau samples never qualify, and a `NaN`
//! anywhere in the window disqualifies the candidate.
//!
//! ## Parameters
//! - **order**: Neighborhood range on each side (defaults to 3)
//!
//! ## Errors
//! - **InvalidOrder**: extrema: `order` is zero.
//!
//! ## Returns
//! - **`Ok(ExtremaOutput)`** on success, containing ascending peak and trough
//!   indices. Series too short to hold a full window produce empty vectors.
//! - **`Err(ExtremaError)`** otherwise.

use crate::utilities::data_loader::{source_type, Candles};
#[cfg(feature = "wasm")]
use serde::{Deserialize, Serialize};
use thiserror::Error;
#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

// --- DATA TYPES ---

#[derive(Debug, Clone)]
pub enum ExtremaData<'a> {
    Candles {
        candles: &'a Candles,
        source: &'a str,
    },
    Slice(&'a [f64]),
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "wasm", derive(Serialize, Deserialize))]
pub struct ExtremaOutput {
    pub peaks: Vec<usize>,
    pub troughs: Vec<usize>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "wasm", derive(Serialize, Deserialize))]
pub struct ExtremaParams {
    pub order: Option<usize>,
}

impl Default for ExtremaParams {
    fn default() -> Self {
        Self { order: Some(3) }
    }
}

#[derive(Debug, Clone)]
pub struct ExtremaInput<'a> {
    pub data: ExtremaData<'a>,
    pub params: ExtremaParams,
}

impl<'a> ExtremaInput<'a> {
    pub fn from_candles(candles: &'a Candles, source: &'a str, params: ExtremaParams) -> Self {
        Self {
            data: ExtremaData::Candles { candles, source },
            params,
        }
    }

    pub fn from_slice(slice: &'a [f64], params: ExtremaParams) -> Self {
        Self {
            data: ExtremaData::Slice(slice),
            params,
        }
    }

    pub fn with_default_candles(candles: &'a Candles) -> Self {
        Self {
            data: ExtremaData::Candles {
                candles,
                source: "close",
            },
            params: ExtremaParams::default(),
        }
    }

    pub fn get_order(&self) -> usize {
        self.params
            .order
            .unwrap_or_else(|| ExtremaParams::default().order.unwrap())
    }
}

#[derive(Debug, Error)]
pub enum ExtremaError {
    #[error("extrema: Invalid order: order = {order}, data length = {data_len}")]
    InvalidOrder { order: usize, data_len: usize },
}

#[inline(always)]
pub fn extrema(input: &ExtremaInput) -> Result<ExtremaOutput, ExtremaError> {
    let data: &[f64] = match &input.data {
        ExtremaData::Candles { candles, source } => source_type(candles, source),
        ExtremaData::Slice(slice) => slice,
    };

    let order = input.get_order();
    if order == 0 {
        return Err(ExtremaError::InvalidOrder {
            order,
            data_len: data.len(),
        });
    }

    Ok(ExtremaOutput {
        peaks: local_peaks(data, order),
        troughs: local_troughs(data, order),
    })
}

/// Indices of strict local maxima over a symmetric `order` neighborhood.
///
/// A candidate at `i` qualifies only when `data[i] > data[i ± j]` for every
/// `j` in `[1, order]`, so reported indices always sit at least `order`
/// samples away from either edge. `order == 0` confirms nothing and yields an
/// empty vector, as does a series too short to hold a full window.
#[inline]
pub fn local_peaks(data: &[f64], order: usize) -> Vec<usize> {
    let mut peaks = Vec::new();
    if order == 0 || data.len() <= 2 * order {
        return peaks;
    }
    for i in order..data.len() - order {
        let center = data[i];
        let mut qualifies = true;
        for j in 1..=order {
            if !(center > data[i - j] && center > data[i + j]) {
                qualifies = false;
                break;
            }
        }
        if qualifies {
            peaks.push(i);
        }
    }
    peaks
}

/// Indices of strict local minima; mirror image of [`local_peaks`].
#[inline]
pub fn local_troughs(data: &[f64], order: usize) -> Vec<usize> {
    let mut troughs = Vec::new();
    if order == 0 || data.len() <= 2 * order {
        return troughs;
    }
    for i in order..data.len() - order {
        let center = data[i];
        let mut qualifies = true;
        for j in 1..=order {
            if !(center < data[i - j] && center < data[i + j]) {
                qualifies = false;
                break;
            }
        }
        if qualifies {
            troughs.push(i);
        }
    }
    troughs
}

/// Nearest candidate to `target` by absolute index distance.
///
/// Distances equal to or beyond `window` are rejected, and the first
/// candidate wins a distance tie. Returns `None` when nothing qualifies.
#[inline]
pub fn closest_extremum(candidates: &[usize], target: usize, window: usize) -> Option<usize> {
    let mut best: Option<usize> = None;
    let mut best_dist = usize::MAX;
    for &candidate in candidates {
        let dist = candidate.abs_diff(target);
        if dist < window && dist < best_dist {
            best = Some(candidate);
            best_dist = dist;
        }
    }
    best
}

// --- WASM BINDINGS ---

#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn extrema_js(data: &[f64], order: usize) -> Result<JsValue, JsValue> {
    let input = ExtremaInput::from_slice(data, ExtremaParams { order: Some(order) });

    let out = extrema(&input).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&out).map_err(|e| JsValue::from_str(&e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::data_loader::read_candles_from_csv;

    #[test]
    fn test_extrema_params_with_default_params() {
        let default_params = ExtremaParams::default();
        assert_eq!(
            default_params.order,
            Some(3),
            "Expected order to be Some(3) in default parameters"
        );
    }

    #[test]
    fn test_extrema_input_with_default_candles() {
        let file_path = "src/data/eurusd_4h.csv";
        let candles = read_candles_from_csv(file_path).expect("Failed to load test candles");

        let input = ExtremaInput::with_default_candles(&candles);
        match input.data {
            ExtremaData::Candles { source, .. } => {
                assert_eq!(source, "close", "Expected default source to be 'close'");
            }
            _ => panic!("Expected ExtremaData::Candles variant"),
        }
    }

    #[test]
    fn test_extrema_basic_slice() {
        let data = [50.0, 55.0, 60.0, 55.0, 50.0, 45.0, 50.0, 55.0];

        let params = ExtremaParams { order: Some(1) };
        let input = ExtremaInput::from_slice(&data, params);
        let output = extrema(&input).expect("Failed extrema with order=1");
        assert_eq!(output.peaks, vec![2], "Unexpected peaks for order=1");
        assert_eq!(output.troughs, vec![5], "Unexpected troughs for order=1");

        let params = ExtremaParams { order: Some(2) };
        let input = ExtremaInput::from_slice(&data, params);
        let output = extrema(&input).expect("Failed extrema with order=2");
        assert_eq!(output.peaks, vec![2], "Unexpected peaks for order=2");
        assert_eq!(output.troughs, vec![5], "Unexpected troughs for order=2");
    }

    #[test]
    fn test_extrema_monotone_series_has_none() {
        let increasing: Vec<f64> = (0..32).map(|i| i as f64).collect();
        let decreasing: Vec<f64> = (0..32).map(|i| -(i as f64)).collect();

        for data in [&increasing, &decreasing] {
            let input = ExtremaInput::from_slice(data, ExtremaParams { order: Some(2) });
            let output = extrema(&input).expect("Failed extrema on monotone data");
            assert!(output.peaks.is_empty(), "Monotone series produced peaks");
            assert!(output.troughs.is_empty(), "Monotone series produced troughs");
        }
    }

    #[test]
    fn test_extrema_plateau_never_qualifies() {
        let data = [1.0, 2.0, 3.0, 3.0, 3.0, 2.0, 1.0];
        for order in [1, 2] {
            let input = ExtremaInput::from_slice(&data, ExtremaParams { order: Some(order) });
            let output = extrema(&input).expect("Failed extrema on plateau data");
            assert!(
                output.peaks.is_empty(),
                "Plateau reported as peak with order={}",
                order
            );
            assert!(
                output.troughs.is_empty(),
                "Plateau reported as trough with order={}",
                order
            );
        }
    }

    #[test]
    fn test_extrema_with_zero_order() {
        let data = [10.0, 20.0, 10.0];
        let input = ExtremaInput::from_slice(&data, ExtremaParams { order: Some(0) });

        let result = extrema(&input);
        assert!(result.is_err(), "Expected an error for zero order");
        if let Err(e) = result {
            assert!(
                e.to_string().contains("Invalid order"),
                "Expected 'Invalid order' error message, got: {}",
                e
            );
        }
    }

    #[test]
    fn test_extrema_short_data_is_empty() {
        let data = [1.0, 5.0, 1.0];
        let input = ExtremaInput::from_slice(&data, ExtremaParams { order: Some(3) });
        let output = extrema(&input).expect("Failed extrema on short data");
        assert!(output.peaks.is_empty());
        assert!(output.troughs.is_empty());

        let empty: [f64; 0] = [];
        let input = ExtremaInput::from_slice(&empty, ExtremaParams::default());
        let output = extrema(&input).expect("Failed extrema on empty data");
        assert!(output.peaks.is_empty());
        assert!(output.troughs.is_empty());

        // exactly one candidate slot at len == 2 * order + 1
        let data = [1.0, 2.0, 5.0, 2.0, 1.0];
        let input = ExtremaInput::from_slice(&data, ExtremaParams { order: Some(2) });
        let output = extrema(&input).expect("Failed extrema on minimal window");
        assert_eq!(output.peaks, vec![2]);
        assert!(output.troughs.is_empty());
    }

    #[test]
    fn test_extrema_nan_never_qualifies() {
        let data = [1.0, f64::NAN, 3.0, 2.0, 1.0];
        let input = ExtremaInput::from_slice(&data, ExtremaParams { order: Some(1) });
        let output = extrema(&input).expect("Failed extrema on NaN data");
        assert!(output.peaks.is_empty(), "NaN window produced a peak");
        assert!(output.troughs.is_empty(), "NaN window produced a trough");

        let all_nan = [f64::NAN; 12];
        let input = ExtremaInput::from_slice(&all_nan, ExtremaParams::default());
        let output = extrema(&input).expect("Failed extrema on all-NaN data");
        assert!(output.peaks.is_empty());
        assert!(output.troughs.is_empty());
    }

    #[test]
    fn test_extrema_csv_accuracy() {
        let file_path = "src/data/eurusd_4h.csv";
        let candles = read_candles_from_csv(file_path).expect("Failed to load test candles");

        let input = ExtremaInput::with_default_candles(&candles);
        let output = extrema(&input).expect("Failed extrema with default params");

        assert_eq!(output.peaks.len(), 14, "Peak count mismatch");
        assert_eq!(output.troughs.len(), 15, "Trough count mismatch");
        assert_eq!(&output.peaks[..5], &[13, 25, 40, 54, 65]);
        assert_eq!(&output.troughs[..5], &[6, 22, 34, 45, 59]);
        assert_eq!(*output.peaks.last().unwrap(), 183);
        assert_eq!(*output.troughs.last().unwrap(), 188);

        let input = ExtremaInput::from_candles(&candles, "close", ExtremaParams { order: Some(2) });
        let output = extrema(&input).expect("Failed extrema with order=2");
        assert_eq!(output.peaks.len(), 15, "Peak count mismatch for order=2");
        assert_eq!(output.peaks[0], 2);
    }

    #[test]
    fn test_extrema_csv_structure() {
        let file_path = "src/data/eurusd_4h.csv";
        let candles = read_candles_from_csv(file_path).expect("Failed to load test candles");
        let close = candles
            .select_candle_field("close")
            .expect("Failed to extract close prices");

        let order = 3;
        let input = ExtremaInput::from_slice(close, ExtremaParams { order: Some(order) });
        let output = extrema(&input).expect("Failed extrema on close prices");

        for w in output.peaks.windows(2) {
            assert!(w[0] < w[1], "Peak indices not strictly ascending");
        }
        for &p in &output.peaks {
            assert!(p >= order && p + order < close.len(), "Peak too close to edge");
            for j in 1..=order {
                assert!(
                    close[p] > close[p - j] && close[p] > close[p + j],
                    "Peak at {} does not dominate its window",
                    p
                );
            }
        }
        for &t in &output.troughs {
            for j in 1..=order {
                assert!(
                    close[t] < close[t - j] && close[t] < close[t + j],
                    "Trough at {} does not undercut its window",
                    t
                );
            }
        }
    }

    #[test]
    fn test_closest_extremum_matching() {
        let candidates = [2usize, 9, 14];
        assert_eq!(closest_extremum(&candidates, 10, 5), Some(9));
        assert_eq!(closest_extremum(&candidates, 2, 5), Some(2));
        assert_eq!(closest_extremum(&candidates, 100, 5), None);
        assert_eq!(closest_extremum(&[], 10, 5), None);
    }

    #[test]
    fn test_closest_extremum_tie_keeps_first() {
        let candidates = [8usize, 12];
        assert_eq!(
            closest_extremum(&candidates, 10, 5),
            Some(8),
            "Equal distances should keep the first candidate"
        );
    }

    #[test]
    fn test_closest_extremum_window_is_exclusive() {
        let candidates = [15usize];
        assert_eq!(
            closest_extremum(&candidates, 10, 5),
            None,
            "Distance equal to the window must be rejected"
        );
        assert_eq!(closest_extremum(&candidates, 11, 5), Some(15));
        assert_eq!(closest_extremum(&candidates, 10, 0), None);
    }

    #[cfg(feature = "proptest")]
    #[test]
    fn proptest_extrema_windows_hold() {
        use proptest::prelude::*;

        let strat = (1usize..=5).prop_flat_map(|order| {
            (
                prop::collection::vec(
                    (-1e6f64..1e6f64).prop_filter("finite", |x| x.is_finite()),
                    0..200,
                ),
                Just(order),
            )
        });

        proptest::test_runner::TestRunner::default()
            .run(&strat, |(data, order)| {
                let peaks = local_peaks(&data, order);
                let troughs = local_troughs(&data, order);

                for w in peaks.windows(2) {
                    prop_assert!(w[0] < w[1]);
                }
                for &p in &peaks {
                    prop_assert!(p >= order && p + order < data.len());
                    for j in 1..=order {
                        prop_assert!(data[p] > data[p - j] && data[p] > data[p + j]);
                    }
                }
                for &t in &troughs {
                    prop_assert!(t >= order && t + order < data.len());
                    for j in 1..=order {
                        prop_assert!(data[t] < data[t - j] && data[t] < data[t + j]);
                    }
                }
                Ok(())
            })
            .unwrap();
    }
}
