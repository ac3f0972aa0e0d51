//! Signal list filter criteria.
//!
//! An empty string (or [`SignalTypeFilter::Any`]) means "no constraint on
//! this field".

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::signal::SignalSide;

/// Signal side filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SignalTypeFilter {
    #[default]
    #[serde(rename = "")]
    Any,
    #[serde(rename = "BUY")]
    Buy,
    #[serde(rename = "SELL")]
    Sell,
}

impl SignalTypeFilter {
    /// Wire value ("" for no constraint).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Any => "",
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }

    /// Parse user input; anything unrecognised means no constraint.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "BUY" => Self::Buy,
            "SELL" => Self::Sell,
            _ => Self::Any,
        }
    }

    /// Whether a signal side passes this filter.
    pub fn matches(&self, side: SignalSide) -> bool {
        match self {
            Self::Any => true,
            Self::Buy => side == SignalSide::Buy,
            Self::Sell => side == SignalSide::Sell,
        }
    }
}

/// Filter fields of the signal list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterCriteria {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub signal_type: SignalTypeFilter,
    #[serde(default)]
    pub strategy: String,
    #[serde(default)]
    pub exchange: String,
    /// ISO date (`YYYY-MM-DD`) or empty.
    #[serde(default)]
    pub start_date: String,
    /// ISO date (`YYYY-MM-DD`) or empty.
    #[serde(default)]
    pub end_date: String,
}

impl FilterCriteria {
    /// Number of constrained fields.
    pub fn active_count(&self) -> usize {
        [
            !self.search.is_empty(),
            self.signal_type != SignalTypeFilter::Any,
            !self.strategy.is_empty(),
            !self.exchange.is_empty(),
            !self.start_date.is_empty(),
            !self.end_date.is_empty(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    /// Whether any field is constrained.
    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }

    /// Set a field by its wire name. Returns `false` for unknown fields.
    pub fn set_field(&mut self, name: &str, value: &str) -> bool {
        let value = value.trim().to_string();
        match name {
            "search" => self.search = value,
            "signalType" | "signal_type" | "type" => {
                self.signal_type = SignalTypeFilter::parse(&value)
            }
            "strategy" => self.strategy = value,
            "exchange" => self.exchange = value,
            "startDate" | "start_date" | "from" => self.start_date = value,
            "endDate" | "end_date" | "to" => self.end_date = value,
            _ => return false,
        }
        true
    }

    /// Check date fields: each must be empty or an ISO date, and the range
    /// must not be inverted.
    pub fn validate(&self) -> Result<()> {
        let start = parse_optional_date("startDate", &self.start_date)?;
        let end = parse_optional_date("endDate", &self.end_date)?;

        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(CoreError::Validation(format!(
                    "startDate {start} is after endDate {end}"
                )));
            }
        }
        Ok(())
    }

    /// Non-empty fields as query-string pairs.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        [
            ("search", self.search.as_str()),
            ("signalType", self.signal_type.as_str()),
            ("strategy", self.strategy.as_str()),
            ("exchange", self.exchange.as_str()),
            ("startDate", self.start_date.as_str()),
            ("endDate", self.end_date.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (key, value.to_string()))
        .collect()
    }
}

fn parse_optional_date(field: &str, raw: &str) -> Result<Option<NaiveDate>> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|e| CoreError::Validation(format!("{field} {raw:?} is not a YYYY-MM-DD date: {e}")))
}
