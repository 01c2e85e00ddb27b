use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FilterError, Result};

/// Highest prototype order accepted; band designs double it.
pub const MAX_ORDER: u32 = 64;

/// Frequency-response family of an IIR filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterClass {
    #[serde(rename = "bessel")]
    Bessel,
    #[serde(rename = "butter", alias = "butterworth")]
    Butterworth,
    #[serde(rename = "ellip", alias = "elliptic")]
    Elliptic,
    #[serde(rename = "cheby1", alias = "chebyshev1")]
    Chebyshev1,
    #[serde(rename = "cheby2", alias = "chebyshev2")]
    Chebyshev2,
}

impl FilterClass {
    pub fn short_name(&self) -> &'static str {
        match self {
            FilterClass::Bessel => "bessel",
            FilterClass::Butterworth => "butter",
            FilterClass::Elliptic => "ellip",
            FilterClass::Chebyshev1 => "cheby1",
            FilterClass::Chebyshev2 => "cheby2",
        }
    }
}

impl fmt::Display for FilterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for FilterClass {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "bessel" => Ok(FilterClass::Bessel),
            "butter" | "butterworth" => Ok(FilterClass::Butterworth),
            "ellip" | "elliptic" => Ok(FilterClass::Elliptic),
            "cheby1" | "chebyshev1" => Ok(FilterClass::Chebyshev1),
            "cheby2" | "chebyshev2" => Ok(FilterClass::Chebyshev2),
            other => Err(FilterError::invalid(format!("unknown filter class '{}'", other))),
        }
    }
}

/// Edge extension used by zero-phase filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PadType {
    #[default]
    Odd,
    Even,
    Constant,
    #[serde(rename = "none")]
    NoPad,
}

/// Immutable description of the desired frequency response.
///
/// Both bounds unset is a valid, degenerate configuration: it passes the
/// signal through untouched, or (with `band_stop`) rejects everything and
/// yields zeros.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub lower_bound_hz: Option<f64>,
    #[serde(default)]
    pub upper_bound_hz: Option<f64>,
    #[serde(default)]
    pub band_stop: bool,
    pub fclass: FilterClass,
    pub order: u32,
    pub two_way: bool,
    #[serde(default)]
    pub max_ripple_db: Option<f64>,
    #[serde(default)]
    pub min_attenuation_db: Option<f64>,
    #[serde(default)]
    pub pad_type: PadType,
    #[serde(default)]
    pub pad_length: Option<u32>,
}

impl FilterSpec {
    pub fn new(fclass: FilterClass, order: u32, two_way: bool) -> Self {
        FilterSpec {
            lower_bound_hz: None,
            upper_bound_hz: None,
            band_stop: false,
            fclass,
            order,
            two_way,
            max_ripple_db: None,
            min_attenuation_db: None,
            pad_type: PadType::Odd,
            pad_length: None,
        }
    }

    pub fn with_lower_bound(mut self, hz: f64) -> Self {
        self.lower_bound_hz = Some(hz);
        self
    }

    pub fn with_upper_bound(mut self, hz: f64) -> Self {
        self.upper_bound_hz = Some(hz);
        self
    }

    pub fn with_band_stop(mut self, band_stop: bool) -> Self {
        self.band_stop = band_stop;
        self
    }

    pub fn with_ripple(mut self, max_ripple_db: f64) -> Self {
        self.max_ripple_db = Some(max_ripple_db);
        self
    }

    pub fn with_attenuation(mut self, min_attenuation_db: f64) -> Self {
        self.min_attenuation_db = Some(min_attenuation_db);
        self
    }

    pub fn with_padding(mut self, pad_type: PadType, pad_length: Option<u32>) -> Self {
        self.pad_type = pad_type;
        self.pad_length = pad_length;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| FilterError::invalid(format!("malformed filter spec: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| FilterError::invalid(format!("unserializable filter spec: {}", e)))
    }

    /// Validates the spec against `fs` and decides what the engine has to do.
    ///
    /// No design work happens here; every error the engine can raise for a
    /// bad configuration is raised by this call.
    pub fn resolve(&self, fs: f64) -> Result<Resolution> {
        validate_sampling_rate(fs)?;

        let (band, critical) = match resolve_band(self.lower_bound_hz, self.upper_bound_hz, self.band_stop) {
            BandDecision::PassAll => return Ok(Resolution::PassThrough),
            BandDecision::RejectAll => return Ok(Resolution::RejectAll),
            BandDecision::Filter(band, critical) => (band, critical),
        };

        if self.order < 1 || self.order > MAX_ORDER {
            return Err(FilterError::invalid(format!(
                "filter order must be between 1 and {}, got {}",
                MAX_ORDER, self.order
            )));
        }

        let nyquist = fs / 2.0;
        match critical {
            Critical::Single(hz) => validate_cutoff(hz, nyquist)?,
            Critical::Pair(lo, hi) => {
                validate_cutoff(lo, nyquist)?;
                validate_cutoff(hi, nyquist)?;
                if lo >= hi {
                    return Err(FilterError::invalid(format!(
                        "lower bound ({} Hz) must be below upper bound ({} Hz)",
                        lo, hi
                    )));
                }
            }
        }

        let family = self.family()?;

        Ok(Resolution::Design(FilterPlan {
            family,
            order: self.order as usize,
            band,
            critical,
            fs,
        }))
    }

    fn family(&self) -> Result<Family> {
        let ripple = || required_db(self.max_ripple_db, "max_ripple_db", self.fclass);
        let attenuation = || required_db(self.min_attenuation_db, "min_attenuation_db", self.fclass);

        Ok(match self.fclass {
            FilterClass::Bessel => Family::Bessel,
            FilterClass::Butterworth => Family::Butterworth,
            FilterClass::Chebyshev1 => Family::Chebyshev1 { ripple_db: ripple()? },
            FilterClass::Chebyshev2 => Family::Chebyshev2 { attenuation_db: attenuation()? },
            FilterClass::Elliptic => {
                let (ripple_db, attenuation_db) = (ripple()?, attenuation()?);
                if attenuation_db <= ripple_db {
                    return Err(FilterError::invalid(format!(
                        "min_attenuation_db ({} dB) must exceed max_ripple_db ({} dB)",
                        attenuation_db, ripple_db
                    )));
                }
                Family::Elliptic { ripple_db, attenuation_db }
            }
        })
    }
}

fn validate_sampling_rate(fs: f64) -> Result<()> {
    if fs.is_finite() && fs > 0.0 {
        Ok(())
    } else {
        Err(FilterError::invalid(format!("sampling rate must be finite and positive, got {}", fs)))
    }
}

fn validate_cutoff(hz: f64, nyquist: f64) -> Result<()> {
    if !hz.is_finite() || hz <= 0.0 {
        return Err(FilterError::invalid(format!("cutoff must be finite and above 0 Hz, got {}", hz)));
    }
    if hz >= nyquist {
        return Err(FilterError::invalid(format!(
            "cutoff {} Hz is not below the Nyquist frequency of {} Hz",
            hz, nyquist
        )));
    }
    Ok(())
}

fn required_db(value: Option<f64>, name: &str, fclass: FilterClass) -> Result<f64> {
    match value {
        None => Err(FilterError::invalid(format!("{} filters require {}", fclass, name))),
        Some(db) if db.is_finite() && db > 0.0 => Ok(db),
        Some(db) => Err(FilterError::invalid(format!("{} must be finite and positive, got {}", name, db))),
    }
}

/// Canonical response type after resolving the bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandType {
    LowPass,
    HighPass,
    BandPass,
    BandStop,
}

/// Critical frequencies in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Critical {
    Single(f64),
    Pair(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BandDecision {
    PassAll,
    RejectAll,
    Filter(BandType, Critical),
}

/// The band decision table. Every combination of present/absent bound and
/// `band_stop` is listed; a lone bound flips direction under `band_stop`.
pub fn resolve_band(lower: Option<f64>, upper: Option<f64>, band_stop: bool) -> BandDecision {
    use BandDecision::*;
    use BandType::*;

    match (lower, upper, band_stop) {
        (None, None, false) => PassAll,
        (None, None, true) => RejectAll,
        (Some(lo), Some(hi), false) => Filter(BandPass, Critical::Pair(lo, hi)),
        (Some(lo), Some(hi), true) => Filter(BandStop, Critical::Pair(lo, hi)),
        (None, Some(hi), false) => Filter(LowPass, Critical::Single(hi)),
        (None, Some(hi), true) => Filter(HighPass, Critical::Single(hi)),
        (Some(lo), None, false) => Filter(HighPass, Critical::Single(lo)),
        (Some(lo), None, true) => Filter(LowPass, Critical::Single(lo)),
    }
}

/// Family together with the ripple parameters it actually uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Family {
    Bessel,
    Butterworth,
    Chebyshev1 { ripple_db: f64 },
    Chebyshev2 { attenuation_db: f64 },
    Elliptic { ripple_db: f64, attenuation_db: f64 },
}

/// A validated request for a filter design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterPlan {
    pub family: Family,
    pub order: usize,
    pub band: BandType,
    pub critical: Critical,
    pub fs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    PassThrough,
    RejectAll,
    Design(FilterPlan),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn butter() -> FilterSpec {
        FilterSpec::new(FilterClass::Butterworth, 4, false)
    }

    #[test]
    fn band_table_covers_every_case() {
        use BandDecision::*;
        use BandType::*;

        assert_eq!(resolve_band(None, None, false), PassAll);
        assert_eq!(resolve_band(None, None, true), RejectAll);
        assert_eq!(resolve_band(Some(5.0), Some(15.0), false), Filter(BandPass, Critical::Pair(5.0, 15.0)));
        assert_eq!(resolve_band(Some(5.0), Some(15.0), true), Filter(BandStop, Critical::Pair(5.0, 15.0)));
        assert_eq!(resolve_band(None, Some(40.0), false), Filter(LowPass, Critical::Single(40.0)));
        assert_eq!(resolve_band(None, Some(40.0), true), Filter(HighPass, Critical::Single(40.0)));
        assert_eq!(resolve_band(Some(0.5), None, false), Filter(HighPass, Critical::Single(0.5)));
        assert_eq!(resolve_band(Some(0.5), None, true), Filter(LowPass, Critical::Single(0.5)));
    }

    #[test]
    fn degenerate_spec_skips_order_validation() {
        let spec = FilterSpec::new(FilterClass::Elliptic, 0, true);
        assert_eq!(spec.resolve(100.0), Ok(Resolution::PassThrough));
        assert_eq!(spec.with_band_stop(true).resolve(100.0), Ok(Resolution::RejectAll));
    }

    #[test]
    fn rejects_zero_order() {
        let spec = FilterSpec::new(FilterClass::Butterworth, 0, false).with_upper_bound(10.0);
        assert!(matches!(spec.resolve(100.0), Err(FilterError::InvalidParameter(_))));
    }

    #[test]
    fn rejects_orders_above_the_limit() {
        let spec = FilterSpec::new(FilterClass::Butterworth, MAX_ORDER, false).with_upper_bound(10.0);
        assert!(matches!(spec.resolve(100.0), Ok(Resolution::Design(_))));
        for order in [MAX_ORDER + 1, u32::MAX] {
            let spec = FilterSpec::new(FilterClass::Butterworth, order, false).with_upper_bound(10.0);
            assert!(matches!(spec.resolve(100.0), Err(FilterError::InvalidParameter(_))), "{}", order);
        }
    }

    #[test]
    fn elliptic_attenuation_must_exceed_ripple() {
        let base = FilterSpec::new(FilterClass::Elliptic, 4, false).with_upper_bound(10.0);
        for (rp, rs) in [(3.0, 1.0), (2.0, 2.0)] {
            let spec = base.with_ripple(rp).with_attenuation(rs);
            assert!(matches!(spec.resolve(100.0), Err(FilterError::InvalidParameter(_))), "{} {}", rp, rs);
        }
        assert!(base.with_ripple(1.0).with_attenuation(1.5).resolve(100.0).is_ok());
    }

    #[test]
    fn rejects_cutoff_at_or_above_nyquist() {
        for hz in [50.0, 60.0] {
            let spec = butter().with_upper_bound(hz);
            assert!(matches!(spec.resolve(100.0), Err(FilterError::InvalidParameter(_))));
        }
    }

    #[test]
    fn rejects_negative_zero_and_nan_cutoffs() {
        for hz in [-1.0, 0.0, f64::NAN] {
            let spec = butter().with_lower_bound(hz);
            assert!(matches!(spec.resolve(100.0), Err(FilterError::InvalidParameter(_))), "{}", hz);
        }
    }

    #[test]
    fn rejects_bad_sampling_rate() {
        let spec = butter().with_upper_bound(10.0);
        for fs in [0.0, -100.0, f64::INFINITY] {
            assert!(matches!(spec.resolve(fs), Err(FilterError::InvalidParameter(_))));
        }
    }

    #[test]
    fn rejects_inverted_band() {
        let spec = butter().with_lower_bound(20.0).with_upper_bound(10.0);
        assert!(matches!(spec.resolve(100.0), Err(FilterError::InvalidParameter(_))));
    }

    #[test]
    fn ripple_families_require_their_parameters() {
        let base = |class| FilterSpec::new(class, 4, false).with_upper_bound(10.0);

        assert!(base(FilterClass::Chebyshev1).resolve(100.0).is_err());
        assert!(base(FilterClass::Chebyshev1).with_ripple(1.0).resolve(100.0).is_ok());

        assert!(base(FilterClass::Chebyshev2).resolve(100.0).is_err());
        assert!(base(FilterClass::Chebyshev2).with_attenuation(40.0).resolve(100.0).is_ok());

        assert!(base(FilterClass::Elliptic).with_attenuation(40.0).resolve(100.0).is_err());
        assert!(base(FilterClass::Elliptic).with_ripple(1.0).resolve(100.0).is_err());
        let ok = base(FilterClass::Elliptic).with_ripple(1.0).with_attenuation(40.0).resolve(100.0);
        match ok {
            Ok(Resolution::Design(plan)) => assert_eq!(
                plan.family,
                Family::Elliptic { ripple_db: 1.0, attenuation_db: 40.0 }
            ),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn non_ripple_families_ignore_ripple_inputs() {
        let spec = butter().with_upper_bound(10.0).with_ripple(-3.0).with_attenuation(f64::NAN);
        match spec.resolve(100.0) {
            Ok(Resolution::Design(plan)) => assert_eq!(plan.family, Family::Butterworth),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn parses_class_names() {
        assert_eq!("butter".parse::<FilterClass>(), Ok(FilterClass::Butterworth));
        assert_eq!("Elliptic".parse::<FilterClass>(), Ok(FilterClass::Elliptic));
        assert_eq!("cheby2".parse::<FilterClass>(), Ok(FilterClass::Chebyshev2));
        assert!("kaiser".parse::<FilterClass>().is_err());
    }

    #[test]
    fn reads_dashboard_json() {
        let spec = FilterSpec::from_json(
            r#"{"lower_bound_hz": 0.5, "upper_bound_hz": 40.0, "fclass": "ellip", "order": 3,
                "two_way": true, "max_ripple_db": 1.0, "min_attenuation_db": 40.0, "pad_type": "even"}"#,
        )
        .unwrap();
        assert_eq!(spec.fclass, FilterClass::Elliptic);
        assert_eq!(spec.pad_type, PadType::Even);
        assert_eq!(spec.pad_length, None);
        assert!(!spec.band_stop);

        let back = FilterSpec::from_json(&spec.to_json().unwrap()).unwrap();
        assert_eq!(back, spec);

        assert!(matches!(FilterSpec::from_json("{\"order\": 2}"), Err(FilterError::InvalidParameter(_))));
    }
}
