//! Risk scoring
//!
//! Fixed additive model over three independent indicators. Scores are exact
//! decimals so that a score landing on the configured threshold compares
//! equal to it.

use std::fmt;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Latency at or above this many milliseconds counts as degraded
pub const LATENCY_THRESHOLD_MS: f64 = 200.0;

/// Error rate at or above this percentage counts as degraded
pub const ERROR_RATE_THRESHOLD_PCT: f64 = 1.0;

/// 0.45
const LATENCY_WEIGHT: Decimal = Decimal::from_parts(45, 0, 0, false, 2);
/// 0.45
const ERROR_RATE_WEIGHT: Decimal = Decimal::from_parts(45, 0, 0, false, 2);
/// 0.15
const NXDOMAIN_WEIGHT: Decimal = Decimal::from_parts(15, 0, 0, false, 2);

/// Normalized risk in `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RiskScore(Decimal);

impl RiskScore {
    pub const ZERO: RiskScore = RiskScore(Decimal::ZERO);
    pub const MAX: RiskScore = RiskScore(Decimal::ONE);

    /// Build a score from an arbitrary decimal, clamping into range
    pub fn new(value: Decimal) -> Self {
        Self(value.clamp(Decimal::ZERO, Decimal::ONE))
    }

    /// The underlying decimal value
    pub fn value(&self) -> Decimal {
        self.0
    }

    /// Lossy conversion for JSON output and metrics
    pub fn as_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Inclusive threshold check: a tie counts as at risk
    pub fn meets(&self, threshold: Decimal) -> bool {
        self.0 >= threshold
    }

    pub fn is_max(&self) -> bool {
        self.0 == Decimal::ONE
    }
}

impl fmt::Display for RiskScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Serialize for RiskScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

impl<'de> Deserialize<'de> for RiskScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(RiskScore::new)
    }
}

/// Score a signal from its indicators
///
/// Absent measurements skip their indicator rather than counting as healthy
/// zeros. Non-finite values never trip an indicator.
pub fn score(latency_ms: Option<f64>, error_rate_pct: Option<f64>, nxdomain_anomaly: bool) -> RiskScore {
    let mut risk = Decimal::ZERO;

    if latency_ms.is_some_and(|v| v >= LATENCY_THRESHOLD_MS) {
        risk += LATENCY_WEIGHT;
    }
    if error_rate_pct.is_some_and(|v| v >= ERROR_RATE_THRESHOLD_PCT) {
        risk += ERROR_RATE_WEIGHT;
    }
    if nxdomain_anomaly {
        risk += NXDOMAIN_WEIGHT;
    }

    RiskScore::new(risk)
}
