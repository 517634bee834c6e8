//! Trend analysis over metric value series
//!
//! Everything in this module is a pure function of its input: direction,
//! strength and confidence come from the mean and population standard
//! deviation of the series, and the forecast is a linear extrapolation of the
//! trailing window.

use crate::events::TrendDirection;
use serde::{Deserialize, Serialize};

/// Number of trailing values used to estimate the forecast step
pub const FORECAST_WINDOW: usize = 5;

/// Number of points extrapolated by the forecast
pub const FORECAST_HORIZON: usize = 12;

/// Direction, strength, confidence and forecast derived from a value series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendAnalysis {
    pub direction: TrendDirection,
    /// Relative size of the change between halves, 0-1
    pub strength: f64,
    /// How tightly the values cluster around their mean, 0-1
    pub confidence: f64,
    pub forecast: Vec<f64>,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Score band a series mean falls into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthBand {
    Excellent,
    Good,
    NeedsImprovement,
    Critical,
}

impl HealthBand {
    pub fn for_score(score: f64) -> Self {
        if score > 90.0 {
            HealthBand::Excellent
        } else if score > 80.0 {
            HealthBand::Good
        } else if score > 70.0 {
            HealthBand::NeedsImprovement
        } else {
            HealthBand::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HealthBand::Excellent => "excellent",
            HealthBand::Good => "good",
            HealthBand::NeedsImprovement => "needs improvement",
            HealthBand::Critical => "critical",
        }
    }
}

/// Analyze a value series
///
/// # Arguments
///
/// * `series` - Values in chronological order
/// * `label` - Human-readable name used in insights and recommendations
///
/// # Examples
///
/// ```
/// use archwatch::analysis::analyze;
/// use archwatch::events::TrendDirection;
///
/// let series = [80.0, 80.0, 80.0, 80.0, 80.0, 90.0, 90.0, 90.0, 90.0, 90.0];
/// let analysis = analyze(&series, "modularity");
/// assert_eq!(analysis.direction, TrendDirection::Improving);
/// ```
pub fn analyze(series: &[f64], label: &str) -> TrendAnalysis {
    if series.is_empty() {
        return TrendAnalysis {
            direction: TrendDirection::Stable,
            strength: 0.0,
            confidence: 0.0,
            forecast: Vec::new(),
            insights: vec![format!("No data available for {}", label)],
            recommendations: vec![format!("Collect {} samples to enable trend analysis", label)],
        };
    }

    let mean = mean(series);
    let stddev = std_dev(series, mean);

    let split = series.len() / 2;
    let (first, second) = series.split_at(split);
    // A single value has an empty first half; treat it as no change.
    let delta = if first.is_empty() {
        0.0
    } else {
        self::mean(second) - self::mean(first)
    };

    let direction = if delta > 0.5 * stddev {
        TrendDirection::Improving
    } else if delta < -0.5 * stddev {
        TrendDirection::Declining
    } else {
        TrendDirection::Stable
    };

    let strength = if stddev == 0.0 {
        0.0
    } else {
        (delta.abs() / stddev).min(1.0)
    };

    let confidence = if mean == 0.0 {
        0.0
    } else {
        (1.0 - stddev / mean).clamp(0.0, 1.0)
    };

    let volatile = stddev > 0.2 * mean;
    let band = HealthBand::for_score(mean);

    TrendAnalysis {
        direction,
        strength,
        confidence,
        forecast: forecast(series),
        insights: insights(label, direction, strength, mean, stddev, band, volatile),
        recommendations: recommendations(label, direction, strength, band, volatile),
    }
}

/// Linearly extrapolate the trailing window, clamped to 0-100
pub fn forecast(series: &[f64]) -> Vec<f64> {
    let Some(&last) = series.last() else {
        return Vec::new();
    };

    let window = &series[series.len().saturating_sub(FORECAST_WINDOW)..];
    // Mean of consecutive steps telescopes to (last - first) / steps
    let step = if window.len() >= 2 {
        (window[window.len() - 1] - window[0]) / (window.len() - 1) as f64
    } else {
        0.0
    };

    (1..=FORECAST_HORIZON)
        .map(|i| (last + step * i as f64).clamp(0.0, 100.0))
        .collect()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation around a precomputed mean
pub fn std_dev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

fn insights(
    label: &str,
    direction: TrendDirection,
    strength: f64,
    mean: f64,
    stddev: f64,
    band: HealthBand,
    volatile: bool,
) -> Vec<String> {
    let mut insights = Vec::new();

    match direction {
        TrendDirection::Improving => insights.push(format!(
            "{} is improving ({:.0}% trend strength)",
            label,
            strength * 100.0
        )),
        TrendDirection::Declining => insights.push(format!(
            "{} is declining ({:.0}% trend strength)",
            label,
            strength * 100.0
        )),
        TrendDirection::Stable => insights.push(format!("{} is stable", label)),
    }

    insights.push(format!(
        "Average {} score of {:.1} is {}",
        label,
        mean,
        band.as_str()
    ));

    if volatile {
        insights.push(format!(
            "{} shows high volatility (standard deviation {:.1})",
            label, stddev
        ));
    }

    insights
}

fn recommendations(
    label: &str,
    direction: TrendDirection,
    strength: f64,
    band: HealthBand,
    volatile: bool,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    match direction {
        TrendDirection::Declining if strength > 0.7 => recommendations.push(format!(
            "Prioritize remediation of the sharp decline in {}",
            label
        )),
        TrendDirection::Declining => {
            recommendations.push(format!("Investigate recent changes affecting {}", label))
        }
        TrendDirection::Improving => recommendations.push(format!(
            "Keep the practices that are improving {}",
            label
        )),
        TrendDirection::Stable => {}
    }

    match band {
        HealthBand::Critical => recommendations.push(format!(
            "Immediate action required: {} is in a critical range",
            label
        )),
        HealthBand::NeedsImprovement => {
            recommendations.push(format!("Plan targeted improvements for {}", label))
        }
        HealthBand::Good | HealthBand::Excellent => {
            if direction == TrendDirection::Stable {
                recommendations.push(format!("Maintain current {} standards", label));
            }
        }
    }

    if volatile {
        recommendations.push(format!(
            "Stabilize {} by reducing variability between changes",
            label
        ));
    }

    recommendations
}


// Property-based tests
#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// Finite series including steep slopes and values outside 0-100
    #[derive(Debug, Clone)]
    struct Series(Vec<f64>);

    impl Arbitrary for Series {
        fn arbitrary(g: &mut Gen) -> Self {
            let size = usize::arbitrary(g) % 60;
            let values = (0..size)
                .map(|_| (i16::arbitrary(g) as f64) / 10.0)
                .collect();
            Series(values)
        }
    }

    #[quickcheck]
    fn prop_forecast_within_bounds(series: Series) -> bool {
        analyze(&series.0, "prop")
            .forecast
            .iter()
            .all(|v| (0.0..=100.0).contains(v))
    }

    #[quickcheck]
    fn prop_strength_and_confidence_in_unit_range(series: Series) -> bool {
        let analysis = analyze(&series.0, "prop");
        (0.0..=1.0).contains(&analysis.strength) && (0.0..=1.0).contains(&analysis.confidence)
    }
}
