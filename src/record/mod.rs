//! A loaded multi-lead recording and the views the strip viewer draws.

use ndarray::{s, Array2, ArrayView2, Axis};

use crate::analysis::filter::{FilterEngine, FilterSpec};
use crate::error::{FilterError, Result};

pub mod annotation;
pub mod window;

pub use annotation::{Annotation, AnnotationKind};
pub use window::SampleWindow;

/// Vertical offset between leads in separate mode, three big boxes in mV.
pub const LEAD_SPACING_MV: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadsMode {
    Overlay,
    Separate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    fs: f64,
    sig_name: Vec<String>,
    /// Physical samples, `[samples, leads]`.
    p_signal: Array2<f64>,
}

impl Record {
    pub fn new(fs: f64, sig_name: Vec<String>, p_signal: Array2<f64>) -> Result<Self> {
        if !(fs.is_finite() && fs > 0.0) {
            return Err(FilterError::invalid(format!("sampling rate must be finite and positive, got {}", fs)));
        }
        if sig_name.len() != p_signal.ncols() {
            return Err(FilterError::invalid(format!(
                "{} lead names for {} signal columns",
                sig_name.len(),
                p_signal.ncols()
            )));
        }
        Ok(Record { fs, sig_name, p_signal })
    }

    pub fn fs(&self) -> f64 {
        self.fs
    }

    pub fn sig_name(&self) -> &[String] {
        &self.sig_name
    }

    pub fn sig_len(&self) -> usize {
        self.p_signal.nrows()
    }

    pub fn p_signal(&self) -> ArrayView2<f64> {
        self.p_signal.view()
    }

    /// Whole seconds of signal; the slider's maximum.
    pub fn duration_secs(&self) -> f64 {
        (self.sig_len() as f64 / self.fs).floor()
    }

    pub fn window_at(&self, position_secs: f64) -> SampleWindow {
        SampleWindow::around(position_secs, self.fs, self.sig_len())
    }

    pub fn lead_indices<S: AsRef<str>>(&self, leads: &[S]) -> Result<Vec<usize>> {
        leads
            .iter()
            .map(|lead| {
                let lead = lead.as_ref();
                self.sig_name
                    .iter()
                    .position(|name| name == lead)
                    .ok_or_else(|| FilterError::invalid(format!("unknown lead {:?}", lead)))
            })
            .collect()
    }

    /// Samples of `window` for the chosen lead columns, `[samples, leads]`.
    pub fn view(&self, window: SampleWindow, leads: &[usize]) -> Result<Array2<f64>> {
        if window.end > self.sig_len() {
            return Err(FilterError::invalid(format!(
                "window ends at {} but the record has {} samples",
                window.end,
                self.sig_len()
            )));
        }
        if let Some(bad) = leads.iter().find(|&&i| i >= self.sig_name.len()) {
            return Err(FilterError::invalid(format!("lead index {} out of range", bad)));
        }
        Ok(self
            .p_signal
            .slice(s![window.start..window.end, ..])
            .select(Axis(1), leads))
    }

    /// Like [`Record::view`], filtered along the sample axis.
    pub fn filtered_view(
        &self,
        engine: &FilterEngine,
        window: SampleWindow,
        leads: &[usize],
        spec: &FilterSpec,
    ) -> Result<Array2<f64>> {
        let data = self.view(window, leads)?;
        engine.apply_along(&data, self.fs, spec, Axis(0))
    }
}

/// Shifts lead `i` down by `i * LEAD_SPACING_MV` in separate mode and
/// returns the y range `(min, max)` to display.
pub fn arrange_leads(data: &mut Array2<f64>, mode: LeadsMode) -> (f64, f64) {
    match mode {
        LeadsMode::Overlay => (-LEAD_SPACING_MV, LEAD_SPACING_MV),
        LeadsMode::Separate => {
            for (i, mut column) in data.axis_iter_mut(Axis(1)).enumerate() {
                column -= i as f64 * LEAD_SPACING_MV;
            }
            (-(data.ncols() as f64) * LEAD_SPACING_MV, LEAD_SPACING_MV)
        }
    }
}
