//! Elliptic integrals and Jacobi elliptic functions used by the elliptic
//! (Cauer) prototype. All functions take the parameter `m = k^2`.

use std::f64::consts::{FRAC_PI_2, PI};

use num_complex::Complex64;

use crate::error::{FilterError, Result};

const MACHEP: f64 = 1.11022302462515654042e-16;

/// Terms of the nome series in the degree equation.
const ELLIPDEG_TERMS: i32 = 7;

const LANDEN_MAX_ITER: usize = 10;

fn agm(mut a: f64, mut b: f64) -> f64 {
    for _ in 0..64 {
        if (a - b).abs() <= MACHEP * a {
            break;
        }
        let next_a = 0.5 * (a + b);
        b = (a * b).sqrt();
        a = next_a;
    }
    a
}

/// Complete elliptic integral of the first kind, K(m).
pub fn ellipk(m: f64) -> f64 {
    ellipkm1(1.0 - m)
}

/// K(1 - p), accurate for small `p`.
pub fn ellipkm1(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::INFINITY;
    }
    PI / (2.0 * agm(1.0, p.sqrt()))
}

/// Jacobi elliptic functions `(sn, cn, dn)` of `u` with parameter `m`,
/// computed with the descending arithmetic-geometric mean scheme.
pub fn ellipj(u: f64, m: f64) -> (f64, f64, f64) {
    if m < 1e-9 {
        let t = u.sin();
        let b = u.cos();
        let ai = 0.25 * m * (u - t * b);
        return (t - ai * b, b + ai * t, 1.0 - 0.5 * m * t * t);
    }

    if m >= 0.9999999999 {
        let ai = 0.25 * (1.0 - m);
        let b = u.cosh();
        let t = u.tanh();
        let phi = 1.0 / b;
        let twon = b * u.sinh();
        let sn = t + ai * (twon - u) / (b * b);
        let ai = ai * t * phi;
        let cn = phi - ai * (twon - u);
        let dn = phi + ai * (twon + u);
        return (sn, cn, dn);
    }

    let mut a = [0.0f64; 9];
    let mut c = [0.0f64; 9];
    a[0] = 1.0;
    c[0] = m.sqrt();
    let mut b = (1.0 - m).sqrt();
    let mut twon = 1.0;
    let mut i = 0;

    while (c[i] / a[i]).abs() > MACHEP && i < 8 {
        let ai = a[i];
        i += 1;
        c[i] = 0.5 * (ai - b);
        let t = (ai * b).sqrt();
        a[i] = 0.5 * (ai + b);
        b = t;
        twon *= 2.0;
    }

    let mut phi = twon * a[i] * u;
    while i > 0 {
        let t = c[i] * phi.sin() / a[i];
        phi = 0.5 * (t.asin() + phi);
        i -= 1;
    }

    let sn = phi.sin();
    let cn = phi.cos();
    let dn = (1.0 - m * sn * sn).sqrt();
    (sn, cn, dn)
}

/// Solves the degree equation for an order-`n` elliptic filter whose
/// discrimination parameter is `m1`; returns the selectivity parameter `m`.
pub fn ellipdeg(n: usize, m1: f64) -> f64 {
    let k1 = ellipk(m1);
    let k1p = ellipkm1(m1);
    let q1 = (-PI * k1p / k1).exp();
    let q = q1.powf(1.0 / n as f64);

    let num: f64 = (0..=ELLIPDEG_TERMS).map(|i| q.powi(i * (i + 1))).sum();
    let den: f64 = 1.0 + 2.0 * (1..=ELLIPDEG_TERMS + 1).map(|i| q.powi(i * i)).sum::<f64>();

    16.0 * q * (num / den).powi(4)
}

fn complement(kx: Complex64) -> Complex64 {
    ((Complex64::new(1.0, 0.0) - kx) * (Complex64::new(1.0, 0.0) + kx)).sqrt()
}

/// Inverse Jacobi `sn` for complex argument, via descending Landen
/// transformations.
fn arc_jac_sn(w: Complex64, m: f64) -> Result<Complex64> {
    let k = m.sqrt();
    if k > 1.0 || k.is_nan() {
        return Err(FilterError::design(format!("elliptic modulus out of range: {}", k)));
    }
    if k == 1.0 {
        return Ok(w.atanh());
    }

    let mut ks = vec![k];
    while let Some(&last) = ks.last() {
        if last == 0.0 {
            break;
        }
        if ks.len() > LANDEN_MAX_ITER {
            return Err(FilterError::design("Landen transformation not converging"));
        }
        let kp = complement(Complex64::new(last, 0.0)).re;
        ks.push((1.0 - kp) / (1.0 + kp));
    }

    let big_k = ks[1..].iter().map(|kn| 1.0 + kn).product::<f64>() * FRAC_PI_2;

    let mut wn = w;
    for pair in ks.windows(2) {
        let (kn, knext) = (pair[0], pair[1]);
        wn = 2.0 * wn / ((1.0 + knext) * (1.0 + complement(kn * wn)));
    }

    let u = 2.0 / PI * wn.asin();
    Ok(big_k * u)
}

/// Real inverse of Jacobi `sc` with complementary parameter: solves
/// `sc(z, 1 - m) = w` for real `w`.
pub fn arc_jac_sc1(w: f64, m: f64) -> Result<f64> {
    let z = arc_jac_sn(Complex64::new(0.0, w), m)?;
    if z.re.abs() > 1e-14 {
        return Err(FilterError::design("inverse Jacobi sc did not stay on the imaginary axis"));
    }
    Ok(z.im)
}
