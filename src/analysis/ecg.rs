use crate::analysis::filter::{FilterClass, FilterSpec, PadType};

/// Preset filters for reading ECG strips.
///
/// Every preset is a second-order Butterworth run forward and backward with
/// odd padding, so wave morphology and timing are kept intact.
pub struct Presets;

impl Presets {
    /// Highpass at 0.5 Hz to remove respiration and electrode drift.
    pub fn baseline_wander() -> FilterSpec {
        base().with_lower_bound(0.5)
    }

    /// 0.5 to 40 Hz, the usual bedside monitoring bandwidth.
    pub fn monitoring() -> FilterSpec {
        base().with_lower_bound(0.5).with_upper_bound(40.0)
    }

    /// 0.05 to 150 Hz, the diagnostic bandwidth. Needs `fs` above 300 Hz.
    pub fn diagnostic() -> FilterSpec {
        base().with_lower_bound(0.05).with_upper_bound(150.0)
    }

    /// Band-stop of 2 Hz around the power line frequency.
    pub fn mains_notch(mains_hz: f64) -> FilterSpec {
        base()
            .with_lower_bound(mains_hz - 1.0)
            .with_upper_bound(mains_hz + 1.0)
            .with_band_stop(true)
    }
}

fn base() -> FilterSpec {
    FilterSpec::new(FilterClass::Butterworth, 2, true).with_padding(PadType::Odd, None)
}
