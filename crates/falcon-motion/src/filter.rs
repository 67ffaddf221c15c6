//! Butterworth filters as cascaded second-order sections, with causal and
//! zero-phase (forward-backward) application.
//!
//! Each section is a biquad in transposed direct form II. A high-order
//! filter is never collapsed into a single polynomial.

use crate::MotionError;
use nalgebra::Complex;
use std::f64::consts::PI;

/// Sample rate the bilinear transform is carried out at, after normalizing
/// the cutoff to Nyquist.
const BILINEAR_FS: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            FilterKind::LowPass => "low-pass",
            FilterKind::HighPass => "high-pass",
        })
    }
}

/// One biquad stage. `a[0]` is always 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Section {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Section {
    /// Build a stage scaled to unit gain in its passband.
    fn normalized(kind: FilterKind, b: [f64; 3], a: [f64; 3]) -> Self {
        let raw = Section { b, a };
        let gain = match kind {
            FilterKind::LowPass => raw.dc_gain(),
            FilterKind::HighPass => raw.nyquist_gain(),
        };
        Section {
            b: b.map(|c| c / gain),
            a,
        }
    }

    /// Gain at 0 Hz.
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    /// Gain at the Nyquist frequency.
    pub fn nyquist_gain(&self) -> f64 {
        (self.b[0] - self.b[1] + self.b[2]) / (self.a[0] - self.a[1] + self.a[2])
    }

    /// Largest pole magnitude.
    pub fn pole_radius(&self) -> f64 {
        if self.a[2] == 0.0 {
            self.a[1].abs()
        } else {
            self.a[2].abs().sqrt()
        }
    }

    #[inline]
    fn step(&self, x: f64, z: &mut [f64; 2]) -> f64 {
        let y = self.b[0] * x + z[0];
        z[0] = self.b[1] * x - self.a[1] * y + z[1];
        z[1] = self.b[2] * x - self.a[2] * y;
        y
    }
}

/// Cascade of second-order sections.
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<Section>,
}

impl SosFilter {
    pub fn lowpass(
        order: usize,
        cutoff_hz: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, MotionError> {
        Self::butterworth(FilterKind::LowPass, order, cutoff_hz, sample_rate_hz)
    }

    pub fn highpass(
        order: usize,
        cutoff_hz: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, MotionError> {
        Self::butterworth(FilterKind::HighPass, order, cutoff_hz, sample_rate_hz)
    }

    /// Digital Butterworth design: analog prototype poles, pre-warped
    /// cutoff, bilinear transform, then conjugate poles paired into biquads.
    /// Odd orders get one first-order stage. Stages are ordered with the
    /// poles nearest the unit circle last.
    pub fn butterworth(
        kind: FilterKind,
        order: usize,
        cutoff_hz: f64,
        sample_rate_hz: f64,
    ) -> Result<Self, MotionError> {
        if order == 0 {
            return Err(MotionError::InvalidFilterSpec(
                "filter order must be at least 1".into(),
            ));
        }
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(MotionError::InvalidFilterSpec(format!(
                "sample rate {sample_rate_hz} Hz must be positive"
            )));
        }
        let nyquist = sample_rate_hz / 2.0;
        let wn = cutoff_hz / nyquist;
        if !(wn > 0.0 && wn < 1.0) {
            return Err(MotionError::InvalidFilterSpec(format!(
                "{kind} cutoff {cutoff_hz} Hz must lie strictly between 0 and Nyquist \
                 ({nyquist} Hz)"
            )));
        }

        let warped = 2.0 * BILINEAR_FS * (PI * wn / BILINEAR_FS).tan();
        let k = Complex::new(2.0 * BILINEAR_FS, 0.0);
        let to_digital = |p: Complex<f64>| {
            let s = match kind {
                FilterKind::LowPass => p * warped,
                FilterKind::HighPass => Complex::new(warped, 0.0) / p,
            };
            (k + s) / (k - s)
        };
        // All zeros sit at z = -1 (low-pass) or z = +1 (high-pass).
        let zero = match kind {
            FilterKind::LowPass => -1.0,
            FilterKind::HighPass => 1.0,
        };

        let mut sections = Vec::with_capacity((order + 1) / 2);
        let n = order as i64;
        let mut m = 1 - n;
        while m < 0 {
            let p = to_digital(prototype_pole(order, m));
            sections.push(Section::normalized(
                kind,
                [1.0, -2.0 * zero, 1.0],
                [1.0, -2.0 * p.re, p.norm_sqr()],
            ));
            m += 2;
        }
        if order % 2 == 1 {
            let p = to_digital(prototype_pole(order, 0));
            sections.push(Section::normalized(
                kind,
                [1.0, -zero, 0.0],
                [1.0, -p.re, 0.0],
            ));
        }
        sections.sort_by(|a, b| a.pole_radius().total_cmp(&b.pole_radius()));

        tracing::trace!(
            %kind,
            order,
            cutoff_hz,
            sample_rate_hz,
            ?sections,
            "Butterworth filter designed"
        );
        Ok(Self { sections })
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Padding used by [`filtfilt`](Self::filtfilt) on long enough inputs.
    pub fn padlen(&self) -> usize {
        let trailing_b = self.sections.iter().filter(|s| s.b[2] == 0.0).count();
        let trailing_a = self.sections.iter().filter(|s| s.a[2] == 0.0).count();
        3 * (2 * self.sections.len() + 1 - trailing_b.min(trailing_a))
    }

    /// Per-section state that holds the filter at rest under a unit step.
    pub fn steady_state(&self) -> Vec<[f64; 2]> {
        let mut scale = 1.0;
        self.sections
            .iter()
            .map(|s| {
                let g = s.dc_gain();
                let zi = [scale * (g - s.b[0]), scale * (s.b[2] - s.a[2] * g)];
                scale *= g;
                zi
            })
            .collect()
    }

    /// Causal filtering from rest.
    pub fn filter(&self, x: &[f64]) -> Vec<f64> {
        let mut state = vec![[0.0; 2]; self.sections.len()];
        self.filter_with_state(x, &mut state)
    }

    /// Causal filtering from the given per-section state; `state` is left at
    /// its final value.
    pub fn filter_with_state(&self, x: &[f64], state: &mut [[f64; 2]]) -> Vec<f64> {
        let mut y = x.to_vec();
        for (section, z) in self.sections.iter().zip(state.iter_mut()) {
            for v in y.iter_mut() {
                *v = section.step(*v, z);
            }
        }
        y
    }

    /// Zero-phase filtering: forward pass, then a pass over the reversed
    /// output. The input is padded by odd reflection at both ends and each
    /// pass starts from the steady state for its first sample.
    ///
    /// Inputs no longer than [`padlen`](Self::padlen) get a shortened pad of
    /// `len - 1` samples.
    pub fn filtfilt(&self, x: &[f64]) -> Vec<f64> {
        if x.is_empty() {
            return Vec::new();
        }
        let padlen = self.padlen().min(x.len() - 1);
        let extended = odd_extend(x, padlen);
        let zi = self.steady_state();

        let mut state = scaled_state(&zi, extended[0]);
        let forward = self.filter_with_state(&extended, &mut state);

        let reversed: Vec<f64> = forward.into_iter().rev().collect();
        let mut state = scaled_state(&zi, reversed[0]);
        let mut backward = self.filter_with_state(&reversed, &mut state);
        backward.reverse();

        backward.drain(padlen..padlen + x.len()).collect()
    }
}

/// Pole `m` of the analog Butterworth prototype, `m` in `-(n-1)..=(n-1)` step 2.
fn prototype_pole(order: usize, m: i64) -> Complex<f64> {
    let theta = PI * m as f64 / (2.0 * order as f64);
    -Complex::from_polar(1.0, theta)
}

fn scaled_state(zi: &[[f64; 2]], by: f64) -> Vec<[f64; 2]> {
    zi.iter().map(|z| [z[0] * by, z[1] * by]).collect()
}

/// Reflect `pad` samples about each endpoint (point symmetry).
fn odd_extend(x: &[f64], pad: usize) -> Vec<f64> {
    let n = x.len();
    let first = x[0];
    let last = x[n - 1];
    let mut out = Vec::with_capacity(n + 2 * pad);
    out.extend((1..=pad).rev().map(|i| 2.0 * first - x[i]));
    out.extend_from_slice(x);
    out.extend((1..=pad).map(|i| 2.0 * last - x[n - 1 - i]));
    out
}
