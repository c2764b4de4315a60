// Seeded Gaussian noise for the heuristic forecaster.
// Every forecast owns its generator, so concurrent requests never share a stream.

use rand::RngCore;
use rand_mt::Mt;

/// Seed used for every heuristic forecast.
pub const FORECAST_SEED: u32 = 42;

const TWO_POW_26: f64 = 67_108_864.0;
const TWO_POW_53: f64 = 9_007_199_254_740_992.0;

/// Uniform double in [0, 1) with 53 bits of precision, built from two 32-bit draws.
pub fn uniform_f64<R: RngCore>(rng: &mut R) -> f64 {
    let a = (rng.next_u32() >> 5) as f64;
    let b = (rng.next_u32() >> 6) as f64;
    (a * TWO_POW_26 + b) / TWO_POW_53
}

/// Standard normal deviates using the polar (Marsaglia) method.
///
/// Each accepted point yields two deviates; the second is cached and
/// returned by the next call.
#[derive(Debug, Clone, Default)]
pub struct PolarGaussian {
    cached: Option<f64>,
}

impl PolarGaussian {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn standard<R: RngCore>(&mut self, rng: &mut R) -> f64 {
        if let Some(g) = self.cached.take() {
            return g;
        }

        let (x1, x2, r2) = loop {
            let x1 = 2.0 * uniform_f64(rng) - 1.0;
            let x2 = 2.0 * uniform_f64(rng) - 1.0;
            let r2 = x1 * x1 + x2 * x2;
            if r2 < 1.0 && r2 != 0.0 {
                break (x1, x2, r2);
            }
        };

        let f = (-2.0 * r2.ln() / r2).sqrt();
        self.cached = Some(f * x1);
        f * x2
    }
}

/// Per-forecast noise source: MT19937 seeded with [`FORECAST_SEED`].
pub struct NoiseStream {
    rng: Mt,
    gauss: PolarGaussian,
}

impl Default for NoiseStream {
    fn default() -> Self {
        Self::seeded(FORECAST_SEED)
    }
}

impl NoiseStream {
    pub fn seeded(seed: u32) -> Self {
        Self {
            rng: Mt::new(seed),
            gauss: PolarGaussian::new(),
        }
    }

    /// Draws `loc + scale * N(0, 1)`. A draw is consumed even when `scale` is zero.
    pub fn normal(&mut self, loc: f64, scale: f64) -> f64 {
        loc + scale * self.gauss.standard(&mut self.rng)
    }
}
