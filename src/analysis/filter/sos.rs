use std::f64::consts::PI;
use std::fmt::Debug;

use biquad::{Biquad, Coefficients, DirectForm2Transposed};
use ndarray::{Array, ArrayBase, Axis, Data, Dimension};
use num_complex::Complex64;
use num_traits::{Float, NumCast};

use crate::analysis::filter::design::SosRow;
use crate::analysis::filter::spec::PadType;
use crate::error::{FilterError, Result};

/// Floating-point element type a filter can run in.
pub trait Sample: Float + Debug + Send + Sync + 'static {
    /// Runs `data` through the cascade in place, starting from rest.
    fn run_cascade<'a>(sections: &[Coefficients<Self>], data: impl Iterator<Item = &'a mut Self>);
}

macro_rules! impl_sample {
    ($t:ty) => {
        impl Sample for $t {
            fn run_cascade<'a>(sections: &[Coefficients<$t>], data: impl Iterator<Item = &'a mut $t>) {
                let mut stages: Vec<DirectForm2Transposed<$t>> =
                    sections.iter().map(|c| DirectForm2Transposed::<$t>::new(*c)).collect();
                for v in data {
                    *v = stages.iter_mut().fold(*v, |acc, stage| stage.run(acc));
                }
            }
        }
    };
}

impl_sample!(f32);
impl_sample!(f64);

/// How the zero-phase pass extends the signal before filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Padding {
    pub pad_type: PadType,
    /// Samples added at each end; `None` means three times the tap count.
    pub pad_length: Option<usize>,
}

impl Default for Padding {
    fn default() -> Self {
        Padding { pad_type: PadType::Odd, pad_length: None }
    }
}

/// A cascade of second-order sections ready to run on samples of type `T`.
#[derive(Debug, Clone)]
pub struct DesignedFilter<T: Sample> {
    sections: Vec<Coefficients<T>>,
    fs: f64,
}

impl<T: Sample> DesignedFilter<T> {
    /// Converts `[b0, b1, b2, 1, a1, a2]` rows into sections of type `T`.
    ///
    /// Fails when a coefficient cannot be represented in `T` or when the
    /// rounded denominators are no longer strictly stable.
    pub fn from_sos(sos: &[SosRow], fs: f64) -> Result<Self> {
        let cast = |v: f64| -> Result<T> {
            <T as NumCast>::from(v)
                .filter(|c| c.is_finite())
                .ok_or_else(|| FilterError::design(format!("coefficient {} is not representable", v)))
        };

        let mut sections = Vec::with_capacity(sos.len());
        for (i, row) in sos.iter().enumerate() {
            let a0 = row[3];
            let section = Coefficients {
                b0: cast(row[0] / a0)?,
                b1: cast(row[1] / a0)?,
                b2: cast(row[2] / a0)?,
                a1: cast(row[4] / a0)?,
                a2: cast(row[5] / a0)?,
            };
            if !is_stable(&section) {
                return Err(FilterError::design(format!(
                    "section {} is unstable at this precision (a1 = {:?}, a2 = {:?})",
                    i, section.a1, section.a2
                )));
            }
            sections.push(section);
        }
        Ok(DesignedFilter { sections, fs })
    }

    pub fn sections(&self) -> &[Coefficients<T>] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    /// Causal filtering along `axis`. The input is left untouched.
    pub fn filter<S, D>(&self, x: &ArrayBase<S, D>, axis: Axis) -> Array<T, D>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        let mut out = x.to_owned();
        for mut lane in out.lanes_mut(axis) {
            T::run_cascade(&self.sections, lane.iter_mut());
        }
        out
    }

    /// Zero-phase forward-backward filtering along `axis`.
    ///
    /// Each lane is extended at both ends, run forward and backward with
    /// steady-state initial conditions, and trimmed back to its length.
    pub fn filtfilt<S, D>(&self, x: &ArrayBase<S, D>, axis: Axis, padding: Padding) -> Result<Array<T, D>>
    where
        S: Data<Elem = T>,
        D: Dimension,
    {
        let n = x.len_of(axis);
        let edge = match padding.pad_type {
            PadType::NoPad => 0,
            _ => padding.pad_length.unwrap_or(3 * self.ntaps()),
        };
        if n <= edge {
            return Err(FilterError::invalid(format!(
                "signal length {} must exceed the padding length {}",
                n, edge
            )));
        }

        let zi = self.steady_state();
        let mut out = x.to_owned();
        let mut buffer = Vec::with_capacity(n + 2 * edge);
        for mut lane in out.lanes_mut(axis) {
            buffer.clear();
            extend_into(&mut buffer, lane.iter().copied(), n, edge, padding.pad_type);

            let x0 = buffer[0];
            self.run_with_state(&mut buffer, &zi, x0);
            buffer.reverse();
            let y0 = buffer[0];
            self.run_with_state(&mut buffer, &zi, y0);
            buffer.reverse();

            for (dst, src) in lane.iter_mut().zip(&buffer[edge..edge + n]) {
                *dst = *src;
            }
        }
        Ok(out)
    }

    /// Complex response at `hz`, evaluated in double precision.
    pub fn frequency_response(&self, hz: f64) -> Complex64 {
        let w = 2.0 * PI * hz / self.fs;
        let z1 = Complex64::from_polar(1.0, -w);
        let z2 = z1 * z1;
        let f = |v: T| v.to_f64().unwrap_or(f64::NAN);
        self.sections
            .iter()
            .map(|c| {
                let num = f(c.b0) + z1 * f(c.b1) + z2 * f(c.b2);
                let den = 1.0 + z1 * f(c.a1) + z2 * f(c.a2);
                num / den
            })
            .product()
    }

    /// Magnitude of the response at `hz`.
    pub fn gain_at(&self, hz: f64) -> f64 {
        self.frequency_response(hz).norm()
    }

    /// Filter length as counted for the default padding.
    fn ntaps(&self) -> usize {
        let zero = T::zero();
        let trailing_b = self.sections.iter().filter(|c| c.b2 == zero).count();
        let trailing_a = self.sections.iter().filter(|c| c.a2 == zero).count();
        2 * self.sections.len() + 1 - trailing_b.min(trailing_a)
    }

    /// Per-section state for a unit step that has been applied forever.
    fn steady_state(&self) -> Vec<[T; 2]> {
        let mut scale = T::one();
        self.sections
            .iter()
            .map(|c| {
                let b1 = c.b1 - c.a1 * c.b0;
                let b2 = c.b2 - c.a2 * c.b0;
                let s1 = (b1 + b2) / (T::one() + c.a1 + c.a2);
                let s2 = b2 - c.a2 * s1;
                let state = [scale * s1, scale * s2];
                scale = scale * (c.b0 + c.b1 + c.b2) / (T::one() + c.a1 + c.a2);
                state
            })
            .collect()
    }

    fn run_with_state(&self, data: &mut [T], zi: &[[T; 2]], level: T) {
        let mut state: Vec<[T; 2]> = zi.iter().map(|s| [s[0] * level, s[1] * level]).collect();
        for v in data.iter_mut() {
            let mut acc = *v;
            for (c, s) in self.sections.iter().zip(state.iter_mut()) {
                let y = c.b0 * acc + s[0];
                s[0] = c.b1 * acc - c.a1 * y + s[1];
                s[1] = c.b2 * acc - c.a2 * y;
                acc = y;
            }
            *v = acc;
        }
    }
}

fn is_stable<T: Sample>(c: &Coefficients<T>) -> bool {
    c.a2.abs() < T::one() && c.a1.abs() < T::one() + c.a2
}

/// Writes `edge` extension samples, the lane, then `edge` more samples.
/// Requires `edge < n`.
fn extend_into<T: Sample>(
    buffer: &mut Vec<T>,
    lane: impl Iterator<Item = T>,
    n: usize,
    edge: usize,
    pad_type: PadType,
) {
    let x: Vec<T> = lane.collect();
    if edge == 0 {
        buffer.extend(x);
        return;
    }
    let first = x[0];
    let last = x[n - 1];
    let two = T::one() + T::one();

    match pad_type {
        PadType::Odd => {
            buffer.extend((1..=edge).rev().map(|i| two * first - x[i]));
            buffer.extend_from_slice(&x);
            buffer.extend((1..=edge).map(|i| two * last - x[n - 1 - i]));
        }
        PadType::Even => {
            buffer.extend((1..=edge).rev().map(|i| x[i]));
            buffer.extend_from_slice(&x);
            buffer.extend((1..=edge).map(|i| x[n - 1 - i]));
        }
        PadType::Constant => {
            buffer.extend(std::iter::repeat(first).take(edge));
            buffer.extend_from_slice(&x);
            buffer.extend(std::iter::repeat(last).take(edge));
        }
        PadType::NoPad => buffer.extend_from_slice(&x),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::{array, Array1, Array2};

    // butter(2, 0.5)
    fn half_band() -> SosRow {
        [
            0.29289321881345254,
            0.5857864376269051,
            0.29289321881345254,
            1.0,
            0.0,
            0.17157287525381,
        ]
    }

    #[test]
    fn extension_modes() {
        let x = [1.0, 2.0, 4.0, 7.0, 11.0];
        let mut buf = Vec::new();
        extend_into(&mut buf, x.iter().copied(), 5, 2, PadType::Odd);
        assert_eq!(buf, vec![-2.0, 0.0, 1.0, 2.0, 4.0, 7.0, 11.0, 15.0, 18.0]);

        buf.clear();
        extend_into(&mut buf, x.iter().copied(), 5, 2, PadType::Even);
        assert_eq!(buf, vec![4.0, 2.0, 1.0, 2.0, 4.0, 7.0, 11.0, 7.0, 4.0]);

        buf.clear();
        extend_into(&mut buf, x.iter().copied(), 5, 2, PadType::Constant);
        assert_eq!(buf, vec![1.0, 1.0, 1.0, 2.0, 4.0, 7.0, 11.0, 11.0, 11.0]);
    }

    #[test]
    fn steady_state_holds_constant_input() {
        let filter = DesignedFilter::<f64>::from_sos(&[half_band(), half_band()], 2.0).unwrap();
        let zi = filter.steady_state();
        let mut data = vec![3.0; 50];
        filter.run_with_state(&mut data, &zi, 3.0);
        for v in data {
            assert_approx_eq!(v, 3.0, 1e-12);
        }
    }

    #[test]
    fn ntaps_counts_trailing_zero_coefficients() {
        let first_order = [0.5, 0.5, 0.0, 1.0, 0.0, 0.0];
        let filter = DesignedFilter::<f64>::from_sos(&[first_order], 2.0).unwrap();
        assert_eq!(filter.ntaps(), 2);
        let filter = DesignedFilter::<f64>::from_sos(&[half_band(), first_order], 2.0).unwrap();
        assert_eq!(filter.ntaps(), 4);
    }

    #[test]
    fn causal_filter_matches_direct_recursion() {
        let filter = DesignedFilter::<f64>::from_sos(&[half_band()], 2.0).unwrap();
        let x = array![1.0, 0.0, 0.0, 0.0];
        let y = filter.filter(&x, Axis(0));
        let [b0, b1, b2, _, _, a2] = half_band();
        assert_approx_eq!(y[0], b0, 1e-15);
        assert_approx_eq!(y[1], b1, 1e-15);
        assert_approx_eq!(y[2], b2 - a2 * b0, 1e-15);
        assert_approx_eq!(y[3], -a2 * b1, 1e-15);
    }

    #[test]
    fn causal_filter_matches_zero_state_recursion_in_both_precisions() {
        let x: Vec<f64> = (0..64).map(|i| (i as f64 * 0.3).sin() + if i == 5 { 1.0 } else { 0.0 }).collect();
        let sos = [half_band(), [1.0, -1.0, 0.0, 1.0, -0.5, 0.0]];

        let f64_filter = DesignedFilter::<f64>::from_sos(&sos, 2.0).unwrap();
        let mut expected = x.clone();
        f64_filter.run_with_state(&mut expected, &[[0.0; 2]; 2], 0.0);
        let y = f64_filter.filter(&Array1::from(x.clone()), Axis(0));
        for (a, b) in y.iter().zip(&expected) {
            assert_approx_eq!(*a, *b, 1e-12);
        }

        let f32_filter = DesignedFilter::<f32>::from_sos(&sos, 2.0).unwrap();
        let y32 = f32_filter.filter(&Array1::from_iter(x.iter().map(|v| *v as f32)), Axis(0));
        for (a, b) in y32.iter().zip(&expected) {
            assert_approx_eq!(*a as f64, *b, 1e-5);
        }
    }

    #[test]
    fn filters_along_the_requested_axis() {
        let filter = DesignedFilter::<f64>::from_sos(&[half_band()], 2.0).unwrap();
        let column = Array1::from_iter((0..20).map(|i| (i as f64 * 0.7).sin()));
        let mut x = Array2::zeros((20, 3));
        for mut col in x.columns_mut() {
            col.assign(&column);
        }
        let expected = filter.filter(&column, Axis(0));
        let y = filter.filter(&x, Axis(0));
        for col in y.columns() {
            assert_eq!(col, expected);
        }
    }

    #[test]
    fn half_band_gain_is_minus_three_db_at_cutoff() {
        let filter = DesignedFilter::<f64>::from_sos(&[half_band()], 2.0).unwrap();
        assert_approx_eq!(filter.gain_at(0.0), 1.0, 1e-12);
        assert_approx_eq!(filter.gain_at(0.5), 1.0 / 2f64.sqrt(), 1e-12);
        assert_approx_eq!(filter.gain_at(1.0), 0.0, 1e-12);
    }

    #[test]
    fn rejects_unstable_sections() {
        let unstable = [1.0, 0.0, 0.0, 1.0, 0.0, 1.0];
        assert!(matches!(
            DesignedFilter::<f64>::from_sos(&[unstable], 2.0),
            Err(FilterError::FilterDesign(_))
        ));
    }

    #[test]
    fn filtfilt_requires_signal_longer_than_padding() {
        let filter = DesignedFilter::<f64>::from_sos(&[half_band()], 2.0).unwrap();
        let x = Array1::<f64>::ones(9);
        let err = filter.filtfilt(&x, Axis(0), Padding::default()).unwrap_err();
        assert!(matches!(err, FilterError::InvalidParameter(_)));

        let no_pad = Padding { pad_type: PadType::NoPad, pad_length: None };
        assert!(filter.filtfilt(&x, Axis(0), no_pad).is_ok());
    }

    #[test]
    fn filtfilt_passes_constants_through() {
        let filter = DesignedFilter::<f64>::from_sos(&[half_band(), half_band()], 2.0).unwrap();
        let x = Array1::<f64>::from_elem(40, -2.5);
        let y = filter.filtfilt(&x, Axis(0), Padding::default()).unwrap();
        for v in y.iter() {
            assert_approx_eq!(*v, -2.5, 1e-12);
        }
    }
}
