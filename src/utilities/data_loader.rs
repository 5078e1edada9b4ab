use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use std::fs::File;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data_loader: I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("data_loader: CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("data_loader: Failed to parse integer field: {0}")]
    ParseInt(#[from] std::num::ParseIntError),
    #[error("data_loader: Failed to parse float field: {0}")]
    ParseFloat(#[from] std::num::ParseFloatError),
    #[error("data_loader: Invalid field: {0}")]
    InvalidField(String),
    #[error("data_loader: Invalid calculated field: {0}")]
    InvalidCalculatedField(String),
}

#[derive(Debug, Clone)]
pub struct Candles {
    pub timestamp: Vec<i64>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Candles {
    pub fn new(
        timestamp: Vec<i64>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Self {
        Candles {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn get_timestamp(&self) -> Result<&[i64], DataError> {
        Ok(&self.timestamp)
    }

    pub fn select_candle_field(&self, field: &str) -> Result<&[f64], DataError> {
        match field.to_lowercase().as_str() {
            "open" => Ok(&self.open),
            "high" => Ok(&self.high),
            "low" => Ok(&self.low),
            "close" => Ok(&self.close),
            "volume" => Ok(&self.volume),
            _ => Err(DataError::InvalidField(field.to_string())),
        }
    }

    pub fn get_calculated_field(&self, field: &str) -> Result<Vec<f64>, DataError> {
        match field.to_lowercase().as_str() {
            "hl2" => Ok(self.hl2()),
            "hlc3" => Ok(self.hlc3()),
            "ohlc4" => Ok(self.ohlc4()),
            "hlcc4" => Ok(self.hlcc4()),
            _ => Err(DataError::InvalidCalculatedField(field.to_string())),
        }
    }

    pub fn hl2(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(self.low.iter())
            .map(|(&high, &low)| (high + low) / 2.0)
            .collect()
    }

    pub fn hlc3(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(self.low.iter())
            .zip(self.close.iter())
            .map(|((&high, &low), &close)| (high + low + close) / 3.0)
            .collect()
    }

    pub fn ohlc4(&self) -> Vec<f64> {
        self.open
            .iter()
            .zip(self.high.iter())
            .zip(self.low.iter())
            .zip(self.close.iter())
            .map(|(((&open, &high), &low), &close)| (open + high + low + close) / 4.0)
            .collect()
    }

    pub fn hlcc4(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(self.low.iter())
            .zip(self.close.iter())
            .map(|((&high, &low), &close)| (high + low + 2.0 * close) / 4.0)
            .collect()
    }

    /// One `YYYY-MM-DD` label per candle, derived from `timestamp`.
    pub fn date_labels(&self) -> Vec<String> {
        self.timestamp.iter().map(|&ts| date_label(ts)).collect()
    }
}

/// Resolves a source name to the matching candle field.
/// Unknown sources fall back to `close`.
#[inline]
pub fn source_type<'a>(candles: &'a Candles, source: &'a str) -> &'a [f64] {
    match source.to_lowercase().as_str() {
        "open" => &candles.open,
        "high" => &candles.high,
        "low" => &candles.low,
        "close" => &candles.close,
        "volume" => &candles.volume,
        _ => &candles.close,
    }
}

/// Formats a millisecond epoch timestamp as `YYYY-MM-DD` (UTC).
/// Timestamps outside the representable range come back as the raw number.
#[inline]
pub fn date_label(timestamp_ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(timestamp_ms) {
        Some(dt) => dt.format("%Y-%m-%d").to_string(),
        None => timestamp_ms.to_string(),
    }
}

pub fn read_candles_from_csv(file_path: &str) -> Result<Candles, DataError> {
    let file = File::open(file_path)?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut timestamp = Vec::new();
    let mut open = Vec::new();
    let mut high = Vec::new();
    let mut low = Vec::new();
    let mut close = Vec::new();
    let mut volume = Vec::new();

    for result in rdr.records() {
        let record = result?;
        timestamp.push(record[0].parse::<i64>()?);
        open.push(record[1].parse::<f64>()?);
        high.push(record[3].parse::<f64>()?);
        low.push(record[4].parse::<f64>()?);
        close.push(record[2].parse::<f64>()?);
        volume.push(record[5].parse::<f64>()?);
    }

    Ok(Candles::new(timestamp, open, high, low, close, volume))
}
