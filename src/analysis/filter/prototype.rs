//! Analog low-pass prototypes with a cutoff of 1 rad/s, in zero-pole-gain form.

use std::f64::consts::PI;
use std::ops::{Add, Mul, Neg};

use num_complex::Complex64;

use crate::analysis::filter::elliptic::{arc_jac_sc1, ellipdeg, ellipj, ellipk};
use crate::error::{FilterError, Result};

/// Tolerance used to drop the vanishing zero/pole of odd-order elliptic
/// prototypes.
const EPSILON: f64 = 2e-16;

const ABERTH_MAX_ITER: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

impl Zpk {
    /// Number of zeros at infinity.
    pub fn degree(&self) -> usize {
        self.poles.len().saturating_sub(self.zeros.len())
    }
}

fn prod_neg(values: &[Complex64]) -> Complex64 {
    values.iter().map(|v| -v).product()
}

/// 10^x - 1 without cancellation for small x.
fn pow10m1(x: f64) -> f64 {
    (x * std::f64::consts::LN_10).exp_m1()
}

fn symmetric_indices(n: usize) -> impl Iterator<Item = f64> {
    (0..n).map(move |i| -(n as f64) + 1.0 + 2.0 * i as f64)
}

pub fn butterworth(n: usize) -> Zpk {
    let poles = symmetric_indices(n)
        .map(|m| -Complex64::from_polar(1.0, PI * m / (2.0 * n as f64)))
        .collect();
    Zpk { zeros: vec![], poles, gain: 1.0 }
}

pub fn chebyshev1(n: usize, ripple_db: f64) -> Zpk {
    let eps = pow10m1(0.1 * ripple_db).sqrt();
    let mu = (1.0 / eps).asinh() / n as f64;

    let poles: Vec<Complex64> = symmetric_indices(n)
        .map(|m| -Complex64::new(mu, PI * m / (2.0 * n as f64)).sinh())
        .collect();

    let mut gain = prod_neg(&poles).re;
    if n % 2 == 0 {
        gain /= (1.0 + eps * eps).sqrt();
    }
    Zpk { zeros: vec![], poles, gain }
}

pub fn chebyshev2(n: usize, attenuation_db: f64) -> Zpk {
    let de = 1.0 / pow10m1(0.1 * attenuation_db).sqrt();
    let mu = (1.0 / de).asinh() / n as f64;
    let nf = n as f64;

    // odd orders have no zero for m = 0
    let zeros: Vec<Complex64> = symmetric_indices(n)
        .filter(|m| *m != 0.0)
        .map(|m| -(Complex64::i() / (m * PI / (2.0 * nf)).sin()).conj())
        .collect();

    let poles: Vec<Complex64> = symmetric_indices(n)
        .map(|m| {
            let p = -Complex64::from_polar(1.0, PI * m / (2.0 * nf));
            let scaled = Complex64::new(mu.sinh() * p.re, mu.cosh() * p.im);
            scaled.inv()
        })
        .collect();

    let gain = (prod_neg(&poles) / prod_neg(&zeros)).re;
    Zpk { zeros, poles, gain }
}

pub fn elliptic(n: usize, ripple_db: f64, attenuation_db: f64) -> Result<Zpk> {
    if n == 1 {
        let p = -(1.0 / pow10m1(0.1 * ripple_db)).sqrt();
        return Ok(Zpk {
            zeros: vec![],
            poles: vec![Complex64::new(p, 0.0)],
            gain: -p,
        });
    }

    let eps_sq = pow10m1(0.1 * ripple_db);
    let eps = eps_sq.sqrt();
    let ck1_sq = eps_sq / pow10m1(0.1 * attenuation_db);
    if ck1_sq == 0.0 || !ck1_sq.is_finite() {
        return Err(FilterError::design(format!(
            "cannot design an elliptic filter with {} dB ripple and {} dB attenuation",
            ripple_db, attenuation_db
        )));
    }

    let k1 = ellipk(ck1_sq);
    let m = ellipdeg(n, ck1_sq);
    let capk = ellipk(m);

    let js: Vec<f64> = ((1 - n % 2)..n).step_by(2).map(|j| j as f64).collect();
    let jac: Vec<(f64, f64, f64)> = js
        .iter()
        .map(|j| ellipj(j * capk / n as f64, m))
        .collect();

    let mut zeros: Vec<Complex64> = jac
        .iter()
        .filter(|(s, _, _)| s.abs() > EPSILON)
        .map(|(s, _, _)| Complex64::new(0.0, 1.0 / (m.sqrt() * s)))
        .collect();
    let conj_zeros: Vec<Complex64> = zeros.iter().map(|z| z.conj()).collect();
    zeros.extend(conj_zeros);

    let r = arc_jac_sc1(1.0 / eps, ck1_sq)?;
    let v0 = capk * r / (n as f64 * k1);
    let (sv, cv, dv) = ellipj(v0, 1.0 - m);

    let mut poles: Vec<Complex64> = jac
        .iter()
        .map(|&(s, c, d)| {
            let num = Complex64::new(c * d * sv * cv, s * dv);
            -num / (1.0 - (d * sv).powi(2))
        })
        .collect();

    let conj_poles: Vec<Complex64> = if n % 2 == 1 {
        let norm = poles.iter().map(|p| p.norm_sqr()).sum::<f64>().sqrt();
        poles
            .iter()
            .filter(|p| p.im.abs() > EPSILON * norm)
            .map(|p| p.conj())
            .collect()
    } else {
        poles.iter().map(|p| p.conj()).collect()
    };
    poles.extend(conj_poles);

    let mut gain = (prod_neg(&poles) / prod_neg(&zeros)).re;
    if n % 2 == 0 {
        gain /= (1.0 + eps_sq).sqrt();
    }

    Ok(Zpk { zeros, poles, gain })
}

/// Bessel prototype normalised so the phase response reaches its midpoint
/// at 1 rad/s. Poles are the reciprocal zeros of the Bessel polynomial
/// `y_n`, scaled by `a0^(-1/n)` with `a0 = (2n)! / (2^n n!)`.
pub fn bessel(n: usize) -> Result<Zpk> {
    let zeros = bessel_polynomial_zeros(n)?;
    let ln_a0 = ((n + 1)..=(2 * n)).map(|k| (k as f64).ln()).sum::<f64>() - n as f64 * 2f64.ln();
    let scale = (-ln_a0 / n as f64).exp();
    let poles = zeros.iter().map(|x| scale / *x).collect();
    Ok(Zpk { zeros: vec![], poles, gain: 1.0 })
}

/// Campos-Calderón asymptotic estimates of the zeros of `y_n`.
fn campos_zeros(n: usize) -> Vec<Complex64> {
    if n == 1 {
        return vec![Complex64::new(-1.0, 0.0)];
    }
    let nf = n as f64;
    let s = 2.0 * nf.powi(2) - 3.0 * nf.powi(4) + nf.powi(5);
    let b3 = (16.0 - 8.0 * nf) / s;
    let b2 = (-24.0 - 12.0 * nf + 12.0 * nf.powi(2)) / s;
    let b1 = (8.0 + 24.0 * nf - 12.0 * nf.powi(2) - 2.0 * nf.powi(3)) / s;
    let b0 = (-6.0 * nf + 5.0 * nf.powi(3) - nf.powi(4)) / s;
    let r = 2.0 * nf.powi(2) + nf.powi(3);
    let a1 = (-6.0 - 6.0 * nf) / r;
    let a2 = 6.0 / r;
    (1..=n)
        .map(|k| {
            let k = k as f64;
            Complex64::new(a1 * k + a2 * k * k, b0 + b1 * k + b2 * k * k + b3 * k * k * k)
        })
        .collect()
}

/// `y_n(x)` and `y_n'(x)` from the recurrence
/// `y_k = (2k - 1) x y_{k-1} + y_{k-2}`, carried in double-double precision.
fn bessel_polynomial(n: usize, x: Complex64) -> (Complex64, Complex64) {
    if n == 0 {
        return (Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0));
    }
    let x = WideComplex::from(x);
    let one = WideComplex::from(Complex64::new(1.0, 0.0));
    let (mut y0, mut d0) = (one, WideComplex::default());
    let (mut y1, mut d1) = (one + x, one);
    for k in 2..=n {
        let m = (2 * k - 1) as f64;
        let y2 = (x * y1).scale(m) + y0;
        let d2 = (y1 + x * d1).scale(m) + d0;
        y0 = y1;
        d0 = d1;
        y1 = y2;
        d1 = d2;
    }
    (y1.value(), d1.value())
}

/// Zeros of `y_n`: Aberth–Ehrlich iteration from the Campos-Calderón
/// estimates, a Newton polish, exact conjugate symmetry and a check that
/// the zeros sum to -1.
fn bessel_polynomial_zeros(n: usize) -> Result<Vec<Complex64>> {
    if n == 0 {
        return Ok(vec![]);
    }
    let mut roots = aberth(campos_zeros(n), |x| bessel_polynomial(n, x))?;
    for root in roots.iter_mut() {
        for _ in 0..2 {
            let (p, dp) = bessel_polynomial(n, *root);
            if dp.norm() > 0.0 {
                *root -= p / dp;
            }
        }
    }

    let roots = symmetrize_conjugates(roots)?;
    let sum: Complex64 = roots.iter().sum();
    if (sum.re + 1.0).abs() > 1e-12 {
        return Err(FilterError::design(format!(
            "Bessel polynomial zeros of degree {} are inaccurate (sum {})",
            n, sum.re
        )));
    }
    Ok(roots)
}

/// Simultaneous refinement of all roots of a polynomial evaluated by `eval`
/// (value and derivative), starting from `roots`.
fn aberth<F>(mut roots: Vec<Complex64>, eval: F) -> Result<Vec<Complex64>>
where
    F: Fn(Complex64) -> (Complex64, Complex64),
{
    let n = roots.len();
    for _ in 0..ABERTH_MAX_ITER {
        let mut max_step = 0.0f64;
        for j in 0..n {
            let (p, dp) = eval(roots[j]);
            if p.norm() == 0.0 {
                continue;
            }
            let newton = p / dp;
            let repulsion: Complex64 = (0..n)
                .filter(|&k| k != j)
                .map(|k| (roots[j] - roots[k]).inv())
                .sum();
            let step = newton / (1.0 - newton * repulsion);
            if !(step.re.is_finite() && step.im.is_finite()) {
                return Err(FilterError::design(format!("root finding diverged for degree {}", n)));
            }
            roots[j] -= step;
            max_step = max_step.max(step.norm() / roots[j].norm().max(f64::MIN_POSITIVE));
        }
        if max_step < 1e-14 {
            break;
        }
    }
    Ok(roots)
}

/// `hi + lo` carried as an unevaluated sum.
#[derive(Debug, Clone, Copy, Default)]
struct DoubleDouble {
    hi: f64,
    lo: f64,
}

impl DoubleDouble {
    fn new(v: f64) -> Self {
        DoubleDouble { hi: v, lo: 0.0 }
    }

    fn renormalized(hi: f64, lo: f64) -> Self {
        let s = hi + lo;
        DoubleDouble { hi: s, lo: lo - (s - hi) }
    }

    fn value(self) -> f64 {
        self.hi + self.lo
    }
}

impl Add for DoubleDouble {
    type Output = DoubleDouble;

    fn add(self, rhs: DoubleDouble) -> DoubleDouble {
        let s = self.hi + rhs.hi;
        let bb = s - self.hi;
        let err = (self.hi - (s - bb)) + (rhs.hi - bb);
        DoubleDouble::renormalized(s, err + self.lo + rhs.lo)
    }
}

impl Neg for DoubleDouble {
    type Output = DoubleDouble;

    fn neg(self) -> DoubleDouble {
        DoubleDouble { hi: -self.hi, lo: -self.lo }
    }
}

impl Mul for DoubleDouble {
    type Output = DoubleDouble;

    fn mul(self, rhs: DoubleDouble) -> DoubleDouble {
        let p = self.hi * rhs.hi;
        let err = self.hi.mul_add(rhs.hi, -p);
        DoubleDouble::renormalized(p, err + self.hi * rhs.lo + self.lo * rhs.hi)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct WideComplex {
    re: DoubleDouble,
    im: DoubleDouble,
}

impl WideComplex {
    fn scale(self, k: f64) -> Self {
        let k = DoubleDouble::new(k);
        WideComplex { re: self.re * k, im: self.im * k }
    }

    fn value(self) -> Complex64 {
        Complex64::new(self.re.value(), self.im.value())
    }
}

impl From<Complex64> for WideComplex {
    fn from(z: Complex64) -> Self {
        WideComplex { re: DoubleDouble::new(z.re), im: DoubleDouble::new(z.im) }
    }
}

impl Add for WideComplex {
    type Output = WideComplex;

    fn add(self, rhs: WideComplex) -> WideComplex {
        WideComplex { re: self.re + rhs.re, im: self.im + rhs.im }
    }
}

impl Mul for WideComplex {
    type Output = WideComplex;

    fn mul(self, rhs: WideComplex) -> WideComplex {
        WideComplex {
            re: self.re * rhs.re + -(self.im * rhs.im),
            im: self.re * rhs.im + self.im * rhs.re,
        }
    }
}

/// Forces exact conjugate symmetry on the roots of a real polynomial.
fn symmetrize_conjugates(roots: Vec<Complex64>) -> Result<Vec<Complex64>> {
    let n = roots.len();
    let tol = 1e-9;
    let (upper, rest): (Vec<Complex64>, Vec<Complex64>) =
        roots.into_iter().partition(|r| r.im > tol * r.norm().max(1.0));
    let (mut lower, real): (Vec<Complex64>, Vec<Complex64>) =
        rest.into_iter().partition(|r| r.im < -tol * r.norm().max(1.0));

    let mut out = Vec::with_capacity(n);
    for u in upper {
        let (idx, dist) = lower
            .iter()
            .enumerate()
            .map(|(i, l)| (i, (u - l.conj()).norm()))
            .fold((usize::MAX, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
        if idx == usize::MAX || dist > 1e-6 * u.norm().max(1.0) {
            return Err(FilterError::design("complex root without a matching conjugate"));
        }
        let l = lower.swap_remove(idx);
        let mean = 0.5 * (u + l.conj());
        out.push(mean);
        out.push(mean.conj());
    }
    if !lower.is_empty() {
        return Err(FilterError::design("complex root without a matching conjugate"));
    }
    out.extend(real.into_iter().map(|r| Complex64::new(r.re, 0.0)));
    Ok(out)
}
