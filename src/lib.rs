use std::sync::OnceLock;

use ndarray::Array2;

pub mod analysis;
pub mod error;
pub mod log;
pub mod mock;
pub mod record;

pub use analysis::ecg::Presets;
pub use analysis::filter::{
    design_and_apply, design_and_apply_along, DesignCache, DesignedFilter, FilterClass, FilterEngine,
    FilterSpec, PadType, Padding, Sample,
};
pub use error::{FilterError, Result};

uniffi::include_scaffolding!("ecgcore");

// Holds only the logger; no designs are kept between calls.
static ENGINE: OnceLock<FilterEngine> = OnceLock::new();

fn shared_engine() -> &'static FilterEngine {
    ENGINE.get_or_init(FilterEngine::new)
}

/// Filters lead-major samples (`leads[lead][sample]`) along the sample axis.
pub fn filter_leads(leads: Vec<Vec<f64>>, fs: f64, spec: FilterSpec) -> Result<Vec<Vec<f64>>> {
    let n_leads = leads.len();
    let n_samples = leads.first().map(Vec::len).unwrap_or(0);
    if let Some(i) = leads.iter().position(|lead| lead.len() != n_samples) {
        return Err(FilterError::invalid(format!(
            "lead {} has {} samples, expected {}",
            i,
            leads[i].len(),
            n_samples
        )));
    }

    let flat: Vec<f64> = leads.into_iter().flatten().collect();
    let signal = Array2::from_shape_vec((n_leads, n_samples), flat)
        .map_err(|e| FilterError::invalid(format!("cannot shape leads: {}", e)))?;

    let filtered = shared_engine().apply(&signal, fs, &spec)?;
    Ok(filtered.outer_iter().map(|lead| lead.to_vec()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_leads_rejects_ragged_input() {
        let spec = FilterSpec::new(FilterClass::Butterworth, 2, false).with_upper_bound(10.0);
        let err = filter_leads(vec![vec![0.0; 10], vec![0.0; 9]], 100.0, spec).unwrap_err();
        assert!(matches!(err, FilterError::InvalidParameter(_)));
    }

    #[test]
    fn exported_engine_keeps_no_designs_between_calls() {
        let leads = vec![vec![0.25; 32]];
        for hz in [5.0, 6.0, 7.0] {
            let spec = FilterSpec::new(FilterClass::Butterworth, 2, false).with_upper_bound(hz);
            filter_leads(leads.clone(), 100.0, spec).unwrap();
        }
        assert!(shared_engine().cache().is_none());
    }

    #[test]
    fn filter_leads_keeps_lead_layout() {
        let spec = FilterSpec::new(FilterClass::Butterworth, 2, true).with_upper_bound(10.0);
        let leads = vec![vec![1.0; 64], vec![-1.0; 64], vec![0.5; 64]];
        let out = filter_leads(leads, 100.0, spec).unwrap();
        assert_eq!(out.len(), 3);
        for (lead, level) in out.iter().zip([1.0, -1.0, 0.5]) {
            assert_eq!(lead.len(), 64);
            assert!(lead.iter().all(|v| (v - level).abs() < 1e-9));
        }
    }
}
