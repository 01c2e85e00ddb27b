//! Digital IIR design: prototype selection, band transformation, bilinear
//! mapping and grouping into second-order sections.

use std::f64::consts::PI;

use noisy_float::prelude::*;
use num_complex::Complex64;

use crate::analysis::filter::prototype::{self, Zpk};
use crate::analysis::filter::spec::{BandType, Critical, Family, FilterPlan};
use crate::error::{FilterError, Result};

/// One section as `[b0, b1, b2, a0, a1, a2]` with `a0 == 1`.
pub type SosRow = [f64; 6];

/// Relative tolerance under which a root counts as real.
const REAL_TOL: f64 = 100.0 * f64::EPSILON;

/// Conjugate partners may differ by this much (relative) after the band
/// transforms.
const CONJ_TOL: f64 = 1e-8;

/// Sampling rate of the internal normalised design, where Nyquist is 1.
const DESIGN_FS: f64 = 2.0;

pub fn design_sos(plan: &FilterPlan) -> Result<Vec<SosRow>> {
    let proto = match plan.family {
        Family::Bessel => prototype::bessel(plan.order)?,
        Family::Butterworth => prototype::butterworth(plan.order),
        Family::Chebyshev1 { ripple_db } => prototype::chebyshev1(plan.order, ripple_db),
        Family::Chebyshev2 { attenuation_db } => prototype::chebyshev2(plan.order, attenuation_db),
        Family::Elliptic { ripple_db, attenuation_db } => {
            prototype::elliptic(plan.order, ripple_db, attenuation_db)?
        }
    };

    let warp = |hz: f64| {
        let wn = 2.0 * hz / plan.fs;
        2.0 * DESIGN_FS * (PI * wn / DESIGN_FS).tan()
    };

    let analog = match (plan.band, plan.critical) {
        (BandType::LowPass, Critical::Single(hz)) => lp2lp(&proto, warp(hz)),
        (BandType::HighPass, Critical::Single(hz)) => lp2hp(&proto, warp(hz)),
        (BandType::BandPass, Critical::Pair(lo, hi)) => {
            let (w1, w2) = (warp(lo), warp(hi));
            lp2bp(&proto, (w1 * w2).sqrt(), w2 - w1)
        }
        (BandType::BandStop, Critical::Pair(lo, hi)) => {
            let (w1, w2) = (warp(lo), warp(hi));
            lp2bs(&proto, (w1 * w2).sqrt(), w2 - w1)
        }
        (band, critical) => {
            return Err(FilterError::invalid(format!(
                "{:?} cannot be designed from {:?}",
                band, critical
            )))
        }
    };

    let digital = bilinear(&analog, DESIGN_FS);
    let roots_finite = digital.zeros.iter().chain(&digital.poles).all(|r| r.re.is_finite() && r.im.is_finite());
    if !roots_finite || !digital.gain.is_finite() {
        return Err(FilterError::design(format!(
            "order {} {:?} design produced non-finite roots",
            plan.order, plan.family
        )));
    }
    let sos = zpk_to_sos(&digital)?;

    if sos.iter().flatten().any(|c| !c.is_finite()) {
        return Err(FilterError::design(format!(
            "order {} {:?} design produced non-finite coefficients",
            plan.order, plan.family
        )));
    }
    Ok(sos)
}

fn prod(values: impl Iterator<Item = Complex64>) -> Complex64 {
    values.product()
}

pub fn lp2lp(zpk: &Zpk, wo: f64) -> Zpk {
    Zpk {
        zeros: zpk.zeros.iter().map(|z| *z * wo).collect(),
        poles: zpk.poles.iter().map(|p| *p * wo).collect(),
        gain: zpk.gain * wo.powi(zpk.degree() as i32),
    }
}

pub fn lp2hp(zpk: &Zpk, wo: f64) -> Zpk {
    let degree = zpk.degree();
    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|z| wo / *z).collect();
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    let poles = zpk.poles.iter().map(|p| wo / *p).collect();
    let ratio = prod(zpk.zeros.iter().map(|z| -z)) / prod(zpk.poles.iter().map(|p| -p));
    Zpk { zeros, poles, gain: zpk.gain * ratio.re }
}

/// Both roots of `x^2 - 2 r x + wo^2` for every scaled root `r`.
fn split_band(roots: &[Complex64], wo: f64) -> Vec<Complex64> {
    let shifted: Vec<Complex64> = roots.iter().map(|r| (r * r - wo * wo).sqrt()).collect();
    roots
        .iter()
        .zip(&shifted)
        .map(|(r, s)| r + s)
        .chain(roots.iter().zip(&shifted).map(|(r, s)| r - s))
        .collect()
}

pub fn lp2bp(zpk: &Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.degree();
    let zl: Vec<Complex64> = zpk.zeros.iter().map(|z| *z * bw / 2.0).collect();
    let pl: Vec<Complex64> = zpk.poles.iter().map(|p| *p * bw / 2.0).collect();

    let mut zeros = split_band(&zl, wo);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));
    Zpk {
        zeros,
        poles: split_band(&pl, wo),
        gain: zpk.gain * bw.powi(degree as i32),
    }
}

pub fn lp2bs(zpk: &Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.degree();
    let zh: Vec<Complex64> = zpk.zeros.iter().map(|z| (bw / 2.0) / *z).collect();
    let ph: Vec<Complex64> = zpk.poles.iter().map(|p| (bw / 2.0) / *p).collect();

    let mut zeros = split_band(&zh, wo);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, wo)).take(degree));
    zeros.extend(std::iter::repeat(Complex64::new(0.0, -wo)).take(degree));

    let ratio = prod(zpk.zeros.iter().map(|z| -z)) / prod(zpk.poles.iter().map(|p| -p));
    Zpk {
        zeros,
        poles: split_band(&ph, wo),
        gain: zpk.gain * ratio.re,
    }
}

/// Bilinear transform of an analog system to the z-plane.
pub fn bilinear(zpk: &Zpk, fs: f64) -> Zpk {
    let degree = zpk.degree();
    let fs2 = 2.0 * fs;
    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|z| (fs2 + *z) / (fs2 - *z)).collect();
    zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));
    let poles = zpk.poles.iter().map(|p| (fs2 + *p) / (fs2 - *p)).collect();

    let ratio = prod(zpk.zeros.iter().map(|z| fs2 - *z)) / prod(zpk.poles.iter().map(|p| fs2 - *p));
    Zpk { zeros, poles, gain: zpk.gain * ratio.re }
}

fn is_real(c: &Complex64) -> bool {
    c.im.abs() <= REAL_TOL * c.norm()
}

/// Splits roots into one representative (positive imaginary part) per
/// conjugate pair, followed by the real roots. Both groups are sorted.
pub fn split_conjugates(roots: &[Complex64]) -> Result<Vec<Complex64>> {
    let mut real: Vec<f64> = roots.iter().filter(|r| is_real(r)).map(|r| r.re).collect();
    let mut complex: Vec<Complex64> = roots.iter().filter(|r| !is_real(r)).copied().collect();
    real.sort_by_key(|r| n64(*r));
    complex.sort_by_key(|c| (n64(c.re), n64(c.im.abs())));

    let mut upper: Vec<Complex64> = complex.iter().filter(|c| c.im > 0.0).copied().collect();
    let mut lower: Vec<Complex64> = complex.iter().filter(|c| c.im < 0.0).copied().collect();
    if upper.len() != lower.len() {
        return Err(FilterError::design("complex roots do not come in conjugate pairs"));
    }

    let mut pairs = Vec::with_capacity(upper.len());
    for u in upper.drain(..) {
        let candidate = lower
            .iter()
            .enumerate()
            .min_by_key(|(_, l)| n64((u - l.conj()).norm()))
            .map(|(i, l)| (i, (u - l.conj()).norm()));
        match candidate {
            Some((idx, dist)) if dist <= CONJ_TOL * u.norm().max(1.0) => {
                let l = lower.remove(idx);
                pairs.push(0.5 * (u + l.conj()));
            }
            _ => return Err(FilterError::design("complex root without a matching conjugate")),
        }
    }

    pairs.extend(real.into_iter().map(|r| Complex64::new(r, 0.0)));
    Ok(pairs)
}

#[derive(Clone, Copy, PartialEq)]
enum Which {
    Any,
    Real,
    Complex,
}

fn nearest(roots: &[Complex64], to: Complex64, which: Which) -> Option<usize> {
    roots
        .iter()
        .enumerate()
        .filter(|(_, r)| match which {
            Which::Any => true,
            Which::Real => is_real(r),
            Which::Complex => !is_real(r),
        })
        .min_by_key(|(_, r)| n64((*r - to).norm()))
        .map(|(i, _)| i)
}

fn poly(roots: &[Complex64]) -> Vec<f64> {
    let mut coeffs = vec![Complex64::new(1.0, 0.0)];
    for r in roots {
        let mut next = vec![Complex64::new(0.0, 0.0); coeffs.len() + 1];
        for (i, c) in coeffs.iter().enumerate() {
            next[i] += *c;
            next[i + 1] -= *c * *r;
        }
        coeffs = next;
    }
    coeffs.iter().map(|c| c.re).collect()
}

/// A section from up to two zeros and two poles; shorter polynomials are
/// right-aligned.
fn single_section(zeros: &[Complex64], poles: &[Complex64]) -> SosRow {
    let mut row = [0.0; 6];
    let b = poly(zeros);
    let a = poly(poles);
    row[3 - b.len()..3].copy_from_slice(&b);
    row[6 - a.len()..6].copy_from_slice(&a);
    row
}

fn take(roots: &mut Vec<Complex64>, idx: usize) -> Complex64 {
    roots.remove(idx)
}

/// Groups a digital zero-pole-gain system into second-order sections,
/// pairing each pole with its nearest zero. Poles closest to the unit circle
/// end up in the last sections.
pub fn zpk_to_sos(zpk: &Zpk) -> Result<Vec<SosRow>> {
    if zpk.zeros.is_empty() && zpk.poles.is_empty() {
        return Ok(vec![[zpk.gain, 0.0, 0.0, 1.0, 0.0, 0.0]]);
    }

    let zero = Complex64::new(0.0, 0.0);
    let mut z = zpk.zeros.clone();
    let mut p = zpk.poles.clone();
    let len = z.len().max(p.len());
    z.resize(len, zero);
    p.resize(len, zero);

    let n_sections = (len + 1) / 2;
    if len % 2 == 1 {
        z.push(zero);
        p.push(zero);
    }

    let mut z = split_conjugates(&z)?;
    let mut p = split_conjugates(&p)?;
    let mut sos = vec![[0.0; 6]; n_sections];

    for si in (0..n_sections).rev() {
        let p1_idx = p
            .iter()
            .enumerate()
            .min_by_key(|(_, r)| n64((1.0 - r.norm()).abs()))
            .map(|(i, _)| i)
            .ok_or_else(|| FilterError::design("ran out of poles while pairing sections"))?;
        let p1 = take(&mut p, p1_idx);
        let real_poles_left = p.iter().filter(|r| is_real(r)).count();
        let real_zeros_left = z.iter().filter(|r| is_real(r)).count();

        sos[si] = if is_real(&p1) && real_poles_left == 0 {
            let z1 = nearest(&z, p1, Which::Real)
                .map(|i| take(&mut z, i))
                .ok_or_else(|| FilterError::design("no real zero left for the last real pole"))?;
            single_section(&[z1, zero], &[p1, zero])
        } else if p.len() + 1 == z.len() && !is_real(&p1) && real_poles_left == 1 && real_zeros_left == 1 {
            // one real pole and one real zero remain; they must end up together
            let z1 = nearest(&z, p1, Which::Complex)
                .map(|i| take(&mut z, i))
                .ok_or_else(|| FilterError::design("no complex zero left to pair"))?;
            single_section(&[z1, z1.conj()], &[p1, p1.conj()])
        } else {
            let p2 = if is_real(&p1) {
                let idx = p
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| is_real(r))
                    .min_by_key(|(_, r)| n64((r.norm() - p1.norm()).abs()))
                    .map(|(i, _)| i)
                    .ok_or_else(|| FilterError::design("no real pole left to pair"))?;
                take(&mut p, idx)
            } else {
                p1.conj()
            };

            match nearest(&z, p1, Which::Any).map(|i| take(&mut z, i)) {
                Some(z1) if !is_real(&z1) => single_section(&[z1, z1.conj()], &[p1, p2]),
                Some(z1) => match nearest(&z, p1, Which::Real).map(|i| take(&mut z, i)) {
                    Some(z2) => single_section(&[z1, z2], &[p1, p2]),
                    None => single_section(&[z1], &[p1, p2]),
                },
                None => single_section(&[], &[p1, p2]),
            }
        };
    }

    if !p.is_empty() || !z.is_empty() {
        return Err(FilterError::design("unpaired roots left after building sections"));
    }

    for c in sos[0][..3].iter_mut() {
        *c *= zpk.gain;
    }
    Ok(sos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::filter::spec::FilterPlan;
    use assert_approx_eq::assert_approx_eq;

    fn plan(family: Family, order: usize, band: BandType, critical: Critical) -> FilterPlan {
        FilterPlan { family, order, band, critical, fs: 2.0 }
    }

    fn assert_row(actual: &SosRow, expected: &[f64; 6]) {
        for (a, e) in actual.iter().zip(expected) {
            assert_approx_eq!(a, e, 1e-8);
        }
    }

    #[test]
    fn butterworth_second_order_half_band() {
        let sos = design_sos(&plan(Family::Butterworth, 2, BandType::LowPass, Critical::Single(0.5))).unwrap();
        assert_eq!(sos.len(), 1);
        assert_row(&sos[0], &[0.29289322, 0.58578644, 0.29289322, 1.0, 0.0, 0.17157288]);
    }

    #[test]
    fn first_order_section_is_right_aligned() {
        let sos = design_sos(&plan(Family::Butterworth, 1, BandType::LowPass, Critical::Single(0.5))).unwrap();
        assert_eq!(sos.len(), 1);
        assert_row(&sos[0], &[0.5, 0.5, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn highpass_rows_sum_to_zero_at_dc() {
        let sos = design_sos(&plan(Family::Butterworth, 4, BandType::HighPass, Critical::Single(0.1))).unwrap();
        assert_eq!(sos.len(), 2);
        let num_dc: f64 = sos[0][..3].iter().sum();
        assert_approx_eq!(num_dc, 0.0, 1e-12);
    }

    #[test]
    fn band_designs_double_the_order() {
        let bp = design_sos(&plan(Family::Butterworth, 3, BandType::BandPass, Critical::Pair(0.1, 0.4))).unwrap();
        assert_eq!(bp.len(), 3);
        let bs = design_sos(&plan(Family::Butterworth, 2, BandType::BandStop, Critical::Pair(0.1, 0.4))).unwrap();
        assert_eq!(bs.len(), 2);
    }

    #[test]
    fn sections_are_stable_for_every_family() {
        let families = [
            Family::Bessel,
            Family::Butterworth,
            Family::Chebyshev1 { ripple_db: 0.5 },
            Family::Chebyshev2 { attenuation_db: 40.0 },
            Family::Elliptic { ripple_db: 1.0, attenuation_db: 50.0 },
        ];
        for family in families {
            for order in 1..=6 {
                let sos = design_sos(&plan(family, order, BandType::LowPass, Critical::Single(0.3))).unwrap();
                assert_eq!(sos.len(), (order + 1) / 2);
                for row in &sos {
                    assert_eq!(row[3], 1.0);
                    assert!(row[5].abs() < 1.0, "{:?} order {}: {:?}", family, order, row);
                    assert!(row[4].abs() < 1.0 + row[5], "{:?} order {}: {:?}", family, order, row);
                }
            }
        }
    }

    #[test]
    fn split_conjugates_keeps_one_of_each_pair() {
        let roots = [
            Complex64::new(0.5, 0.0),
            Complex64::new(0.1, -0.3),
            Complex64::new(0.1, 0.3),
            Complex64::new(-0.2, 0.0),
        ];
        let split = split_conjugates(&roots).unwrap();
        assert_eq!(split, vec![Complex64::new(0.1, 0.3), Complex64::new(-0.2, 0.0), Complex64::new(0.5, 0.0)]);
    }

    #[test]
    fn split_conjugates_rejects_lone_complex_root() {
        let roots = [Complex64::new(0.1, 0.3), Complex64::new(0.2, 0.0)];
        assert!(matches!(split_conjugates(&roots), Err(FilterError::FilterDesign(_))));
    }
}
