use crate::error::{ForecastError, Result};
use crate::noise::{NoiseStream, FORECAST_SEED};
use crate::signals::{AuxiliarySignals, FactorTable};
use crate::stats::{HistorySeries, HistoryStats};

/// Upper bound on the up-front allocation for a forecast; longer ones grow.
const MAX_PREALLOC: usize = 4096;

/// Largest horizon whose output vector can be allocated at all.
const MAX_REPRESENTABLE_HORIZON: usize = isize::MAX as usize / std::mem::size_of::<f64>();

/// Tunables of the heuristic generator. `Default` is the reference configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicParams {
    pub seed: u32,
    pub floor: f64,
    pub ceiling: f64,
    /// Steps `i` with `dip_start < i <= dip_end` receive `dip_depth`.
    pub dip_start: usize,
    pub dip_end: usize,
    pub dip_depth: f64,
    pub factor_gain: f64,
    pub noise_ratio: f64,
    pub reversion_rate: f64,
}

impl Default for HeuristicParams {
    fn default() -> Self {
        Self {
            seed: FORECAST_SEED,
            floor: 10.0,
            ceiling: 100.0,
            dip_start: 5,
            dip_end: 10,
            dip_depth: -5.0,
            factor_gain: 10.0,
            noise_ratio: 0.25,
            reversion_rate: 0.08,
        }
    }
}

/// Deterministic multivariate energy forecaster.
///
/// Combines a decaying short-term trend, an index-based afternoon dip, a
/// composite readiness adjustment, seeded Gaussian noise and mean reversion,
/// clamping every step to `[floor, ceiling]`.
#[derive(Debug, Clone, Default)]
pub struct HeuristicForecaster {
    params: HeuristicParams,
}

impl HeuristicForecaster {
    pub fn new(params: HeuristicParams) -> Self {
        Self { params }
    }

    /// Produces `horizon` values, earliest first.
    pub fn forecast(
        &self,
        history: &HistorySeries,
        horizon: usize,
        auxiliary: Option<&AuxiliarySignals>,
    ) -> Vec<f64> {
        let p = &self.params;
        let stats = HistoryStats::from_history(history);
        let factors = auxiliary
            .map(FactorTable::from_auxiliary)
            .unwrap_or_default();
        let factor_adjustment = (factors.composite() - 0.5) * p.factor_gain;
        let noise_scale = stats.std_dev * p.noise_ratio;

        let mut noise = NoiseStream::seeded(p.seed);
        let mut forecast = Vec::with_capacity(horizon.min(MAX_PREALLOC));
        let mut last = stats.last_value;

        for i in 0..horizon {
            let trend = stats.recent_trend * (1.0 - i as f64 / (horizon * 2) as f64);
            let dip = if p.dip_start < i && i <= p.dip_end {
                p.dip_depth
            } else {
                0.0
            };
            let jitter = noise.normal(0.0, noise_scale);
            let reversion = (stats.mean - last) * p.reversion_rate;

            let next = (last + trend + dip + factor_adjustment + jitter + reversion)
                .max(p.floor)
                .min(p.ceiling);

            forecast.push(next);
            last = next;
        }

        forecast
    }
}

/// Validates raw inputs and runs the reference heuristic forecaster.
///
/// A zero horizon yields an empty forecast; a negative one is rejected.
pub fn generate_forecast(
    history: &[f64],
    horizon: i64,
    auxiliary: Option<&AuxiliarySignals>,
) -> Result<Vec<f64>> {
    let history = HistorySeries::new(history.to_vec())?;
    let horizon = horizon_from_i64(horizon)?;
    Ok(HeuristicForecaster::default().forecast(&history, horizon, auxiliary))
}

pub fn horizon_from_i64(horizon: i64) -> Result<usize> {
    let steps = usize::try_from(horizon).map_err(|_| {
        ForecastError::invalid(format!(
            "Forecast horizon must be a non-negative integer, got {}",
            horizon
        ))
    })?;
    if steps > MAX_REPRESENTABLE_HORIZON {
        return Err(ForecastError::invalid(format!(
            "Forecast horizon {} is too large",
            horizon
        )));
    }
    Ok(steps)
}
