//! # Divergence (Price / Indicator)
//!
//! Scans a price series against an aligned oscillator series for classic
//! divergence setups. A bearish divergence pairs two consecutive price peaks
//! making higher highs with matched indicator peaks making lower highs; a
//! bullish divergence pairs two consecutive price troughs making lower lows
//! with matched indicator troughs making higher lows. Each price extremum is
//! matched to the nearest same-kind indicator extremum within `window_size`
//! bars, and a pair that fails either match is skipped whole. Qualifying
//! pairs are kept when their combined move, relative to the pair's start
//! price and start indicator value, exceeds `min_strength`.
//!
//! ## Parameters
//! - **order**: Extremum neighborhood range on each side (defaults to 3)
//! - **min_strength**: Exclusive lower bound on pattern strength (defaults to 0.01)
//! - **window_size**: Exclusive index-distance bound for extremum matching (defaults to 5)
//!
//! ## Errors
//! - **InvalidOrder**: divergence: `order` is zero.
//! - **InvalidWindow**: divergence: `window_size` is zero.
//! - **DatesTooShort**: divergence: fewer date labels than scanned samples.
//!
//! ## Returns
//! - **`Ok(DivergenceOutput)`** on success, containing patterns sorted by
//!   start index. Series with no qualifying pairs produce an empty vector.
//! - **`Err(DivergenceError)`** otherwise.

use crate::detectors::extrema::{closest_extremum, local_peaks, local_troughs};
use crate::detectors::score::{classify_strength, confidence, Strength};
use crate::utilities::data_loader::{source_type, Candles};
#[cfg(feature = "wasm")]
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

// --- DATA TYPES ---

#[derive(Debug, Clone)]
pub enum DivergenceData<'a> {
    Candles {
        candles: &'a Candles,
        source: &'a str,
        indicator: &'a [f64],
    },
    Slices {
        prices: &'a [f64],
        indicator: &'a [f64],
        dates: &'a [String],
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "wasm", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "wasm", serde(rename_all = "lowercase"))]
pub enum DivergenceKind {
    Bullish,
    Bearish,
}

impl fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DivergenceKind::Bullish => write!(f, "bullish"),
            DivergenceKind::Bearish => write!(f, "bearish"),
        }
    }
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "wasm", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "wasm", serde(rename_all = "camelCase"))]
pub struct DivergencePattern {
    pub start_index: usize,
    pub end_index: usize,
    #[cfg_attr(feature = "wasm", serde(rename = "type"))]
    pub kind: DivergenceKind,
    pub start_date: String,
    pub end_date: String,
    pub start_price: f64,
    pub end_price: f64,
    pub start_indicator: f64,
    pub end_indicator: f64,
    pub strength: Strength,
    pub confidence: f64,
    pub price_change: f64,
    pub indicator_change: f64,
    pub duration: usize,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "wasm", derive(Serialize, Deserialize))]
pub struct DivergenceOutput {
    pub patterns: Vec<DivergencePattern>,
}

#[derive(Debug, Clone)]
#[cfg_attr(feature = "wasm", derive(Serialize, Deserialize))]
pub struct DivergenceParams {
    pub order: Option<usize>,
    pub min_strength: Option<f64>,
    pub window_size: Option<usize>,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            order: Some(3),
            min_strength: Some(0.01),
            window_size: Some(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DivergenceInput<'a> {
    pub data: DivergenceData<'a>,
    pub params: DivergenceParams,
}

impl<'a> DivergenceInput<'a> {
    pub fn from_candles(
        candles: &'a Candles,
        source: &'a str,
        indicator: &'a [f64],
        params: DivergenceParams,
    ) -> Self {
        Self {
            data: DivergenceData::Candles {
                candles,
                source,
                indicator,
            },
            params,
        }
    }

    pub fn from_slices(
        prices: &'a [f64],
        indicator: &'a [f64],
        dates: &'a [String],
        params: DivergenceParams,
    ) -> Self {
        Self {
            data: DivergenceData::Slices {
                prices,
                indicator,
                dates,
            },
            params,
        }
    }

    pub fn with_default_candles(candles: &'a Candles, indicator: &'a [f64]) -> Self {
        Self {
            data: DivergenceData::Candles {
                candles,
                source: "close",
                indicator,
            },
            params: DivergenceParams::default(),
        }
    }

    pub fn get_order(&self) -> usize {
        self.params
            .order
            .unwrap_or_else(|| DivergenceParams::default().order.unwrap())
    }

    pub fn get_min_strength(&self) -> f64 {
        self.params
            .min_strength
            .unwrap_or_else(|| DivergenceParams::default().min_strength.unwrap())
    }

    pub fn get_window_size(&self) -> usize {
        self.params
            .window_size
            .unwrap_or_else(|| DivergenceParams::default().window_size.unwrap())
    }
}

#[derive(Debug, Clone, Default)]
pub struct DivergenceBuilder {
    order: Option<usize>,
    min_strength: Option<f64>,
    window_size: Option<usize>,
}

impl DivergenceBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    pub fn order(mut self, n: usize) -> Self {
        self.order = Some(n);
        self
    }

    #[inline(always)]
    pub fn min_strength(mut self, s: f64) -> Self {
        self.min_strength = Some(s);
        self
    }

    #[inline(always)]
    pub fn window_size(mut self, n: usize) -> Self {
        self.window_size = Some(n);
        self
    }

    #[inline(always)]
    pub fn apply_candles(
        self,
        candles: &Candles,
        source: &str,
        indicator: &[f64],
    ) -> Result<DivergenceOutput, DivergenceError> {
        let params = DivergenceParams {
            order: self.order,
            min_strength: self.min_strength,
            window_size: self.window_size,
        };
        let input = DivergenceInput::from_candles(candles, source, indicator, params);
        divergence(&input)
    }

    #[inline(always)]
    pub fn apply_slices(
        self,
        prices: &[f64],
        indicator: &[f64],
        dates: &[String],
    ) -> Result<DivergenceOutput, DivergenceError> {
        let params = DivergenceParams {
            order: self.order,
            min_strength: self.min_strength,
            window_size: self.window_size,
        };
        let input = DivergenceInput::from_slices(prices, indicator, dates, params);
        divergence(&input)
    }
}

#[derive(Debug, Error)]
pub enum DivergenceError {
    #[error("divergence: Invalid order: order = {order}, data length = {data_len}")]
    InvalidOrder { order: usize, data_len: usize },
    #[error("divergence: Invalid window size: window_size = {window_size}")]
    InvalidWindow { window_size: usize },
    #[error("divergence: Dates shorter than the scanned range: needed = {needed}, have = {have}")]
    DatesTooShort { needed: usize, have: usize },
}

#[inline(always)]
pub fn divergence(input: &DivergenceInput) -> Result<DivergenceOutput, DivergenceError> {
    let order = input.get_order();
    let min_strength = input.get_min_strength();
    let window_size = input.get_window_size();

    let patterns = match &input.data {
        DivergenceData::Candles {
            candles,
            source,
            indicator,
        } => {
            let prices = source_type(candles, source);
            let dates = candles.date_labels();
            scan_divergences(prices, indicator, &dates, order, min_strength, window_size)?
        }
        DivergenceData::Slices {
            prices,
            indicator,
            dates,
        } => scan_divergences(prices, indicator, dates, order, min_strength, window_size)?,
    };

    Ok(DivergenceOutput { patterns })
}

/// Low-level scan over pre-aligned series.
///
/// Extrema are taken over each full series; adjacent price-extremum pairs
/// with an index at or beyond `min(prices.len(), indicator.len())` are
/// skipped. `dates` must cover at least that effective range.
pub fn scan_divergences(
    prices: &[f64],
    indicator: &[f64],
    dates: &[String],
    order: usize,
    min_strength: f64,
    window_size: usize,
) -> Result<Vec<DivergencePattern>, DivergenceError> {
    if order == 0 {
        return Err(DivergenceError::InvalidOrder {
            order,
            data_len: prices.len(),
        });
    }
    if window_size == 0 {
        return Err(DivergenceError::InvalidWindow { window_size });
    }

    let effective = prices.len().min(indicator.len());
    if effective == 0 {
        return Ok(Vec::new());
    }
    if dates.len() < effective {
        return Err(DivergenceError::DatesTooShort {
            needed: effective,
            have: dates.len(),
        });
    }

    let price_peaks = local_peaks(prices, order);
    let price_troughs = local_troughs(prices, order);
    let indicator_peaks = local_peaks(indicator, order);
    let indicator_troughs = local_troughs(indicator, order);

    let mut patterns = Vec::new();
    scan_family(
        DivergenceKind::Bearish,
        &price_peaks,
        &indicator_peaks,
        prices,
        indicator,
        dates,
        effective,
        min_strength,
        window_size,
        &mut patterns,
    );
    scan_family(
        DivergenceKind::Bullish,
        &price_troughs,
        &indicator_troughs,
        prices,
        indicator,
        dates,
        effective,
        min_strength,
        window_size,
        &mut patterns,
    );

    patterns.sort_by_key(|p| p.start_index);
    Ok(patterns)
}

#[allow(clippy::too_many_arguments)]
fn scan_family(
    kind: DivergenceKind,
    price_extrema: &[usize],
    indicator_extrema: &[usize],
    prices: &[f64],
    indicator: &[f64],
    dates: &[String],
    effective: usize,
    min_strength: f64,
    window_size: usize,
    out: &mut Vec<DivergencePattern>,
) {
    for pair in price_extrema.windows(2) {
        let (p0, p1) = (pair[0], pair[1]);
        if p0 >= effective || p1 >= effective {
            continue;
        }

        let m0 = match closest_extremum(indicator_extrema, p0, window_size) {
            Some(idx) => idx,
            None => continue,
        };
        let m1 = match closest_extremum(indicator_extrema, p1, window_size) {
            Some(idx) => idx,
            None => continue,
        };

        let price_change = prices[p1] - prices[p0];
        let indicator_change = indicator[m1] - indicator[m0];
        let diverges = match kind {
            DivergenceKind::Bearish => price_change > 0.0 && indicator_change < 0.0,
            DivergenceKind::Bullish => price_change < 0.0 && indicator_change > 0.0,
        };
        if !diverges {
            continue;
        }

        // a NaN strength fails this comparison and is discarded with the pair
        let strength = price_change.abs() / prices[p0] + indicator_change.abs() / indicator[m0];
        if strength > min_strength {
            out.push(DivergencePattern {
                start_index: p0,
                end_index: p1,
                kind,
                start_date: dates[p0].clone(),
                end_date: dates[p1].clone(),
                start_price: prices[p0],
                end_price: prices[p1],
                start_indicator: indicator[m0],
                end_indicator: indicator[m1],
                strength: classify_strength(strength),
                confidence: confidence(price_change, indicator_change),
                price_change,
                indicator_change,
                duration: p1 - p0,
            });
        }
    }
}

// --- WASM BINDINGS ---

#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub fn divergence_js(
    prices: &[f64],
    indicator: &[f64],
    dates: JsValue,
    order: usize,
    min_strength: f64,
    window_size: usize,
) -> Result<JsValue, JsValue> {
    let dates: Vec<String> =
        serde_wasm_bindgen::from_value(dates).map_err(|e| JsValue::from_str(&e.to_string()))?;

    let params = DivergenceParams {
        order: Some(order),
        min_strength: Some(min_strength),
        window_size: Some(window_size),
    };
    let input = DivergenceInput::from_slices(prices, indicator, &dates, params);

    let out = divergence(&input).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&out).map_err(|e| JsValue::from_str(&e.to_string()))
}
