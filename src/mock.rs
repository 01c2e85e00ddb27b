use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;

/// One sinusoidal component of a synthetic lead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub hz: f64,
    pub amplitude: f64,
    pub phase: f64,
}

impl Tone {
    pub fn new(hz: f64, amplitude: f64) -> Self {
        Tone { hz, amplitude, phase: 0.0 }
    }

    pub fn with_phase(mut self, phase: f64) -> Self {
        self.phase = phase;
        self
    }

    pub fn at(&self, t: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.hz * t + self.phase).sin()
    }
}

/// Deterministic generator for multi-lead test signals.
pub struct MockSignal {
    fs: f64,
    tones: Vec<Tone>,
    noise: f64,
    seed: u64,
}

impl MockSignal {
    pub fn new(fs: f64) -> Self {
        MockSignal {
            fs,
            tones: Vec::new(),
            noise: 0.0,
            seed: 0,
        }
    }

    pub fn tone(mut self, tone: Tone) -> Self {
        self.tones.push(tone);
        self
    }

    /// Adds uniform noise in `[-amplitude, amplitude)` drawn from a seeded rng.
    pub fn noise(mut self, amplitude: f64, seed: u64) -> Self {
        self.noise = amplitude;
        self.seed = seed;
        self
    }

    /// Lead-major samples, shaped `[leads, samples]`. Each lead gets the same
    /// tones shifted by a quarter period per lead index, plus its own noise.
    pub fn leads(&self, leads: usize, samples: usize) -> Array2<f64> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        Array2::from_shape_fn((leads, samples), |(lead, i)| {
            let t = i as f64 / self.fs;
            let shift = lead as f64 * PI / 2.0;
            let clean: f64 = self
                .tones
                .iter()
                .map(|tone| tone.with_phase(tone.phase + shift).at(t))
                .sum();
            if self.noise > 0.0 {
                clean + rng.gen_range(-self.noise..self.noise)
            } else {
                clean
            }
        })
    }

    /// Single-lead convenience.
    pub fn samples(&self, samples: usize) -> Vec<f64> {
        self.leads(1, samples).row(0).to_vec()
    }
}
