//! Configurable IIR filtering for multi-lead signals.
//!
//! A [`FilterSpec`] is resolved against the sampling rate, designed as a
//! cascade of second-order sections and run along the time axis of an
//! n-dimensional array, either causally or forward-backward.

use std::sync::Arc;

use ndarray::{Array, ArrayBase, Axis, Data, Dimension};
use slog::{debug, o, trace, Logger};

use crate::error::{FilterError, Result};
use crate::log::{create_logger, silent_logger};

pub mod cache;
pub mod design;
mod elliptic;
mod prototype;
pub mod sos;
pub mod spec;

pub use cache::{DesignCache, DesignKey};
pub use sos::{DesignedFilter, Padding, Sample};
pub use spec::{FilterClass, FilterPlan, FilterSpec, PadType, Resolution, MAX_ORDER};

/// Designs and applies filters. Cheap to clone and safe to share between
/// threads; all per-call state lives on the stack of the call.
#[derive(Clone)]
pub struct FilterEngine {
    logger: Logger,
    cache: Option<Arc<DesignCache>>,
}

impl Default for FilterEngine {
    fn default() -> Self {
        FilterEngine {
            logger: silent_logger(),
            cache: None,
        }
    }
}

impl FilterEngine {
    /// Engine that logs to the terminal.
    pub fn new() -> Self {
        FilterEngine {
            logger: create_logger("filter"),
            cache: None,
        }
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger.new(o!("module" => "filter"));
        self
    }

    pub fn with_cache(mut self, cache: Arc<DesignCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn cache(&self) -> Option<&Arc<DesignCache>> {
        self.cache.as_ref()
    }

    /// Designs the cascade for `spec` at `fs`.
    ///
    /// Returns `Ok(None)` when both bounds are unset and there is nothing to
    /// design.
    pub fn design<T: Sample>(&self, fs: f64, spec: &FilterSpec) -> Result<Option<DesignedFilter<T>>> {
        match spec.resolve(fs)? {
            Resolution::PassThrough | Resolution::RejectAll => Ok(None),
            Resolution::Design(plan) => self.design_plan(&plan).map(Some),
        }
    }

    fn design_plan<T: Sample>(&self, plan: &FilterPlan) -> Result<DesignedFilter<T>> {
        let sos = match &self.cache {
            Some(cache) => {
                let key = DesignKey::from(plan);
                match cache.get(&key) {
                    Some(sos) => {
                        trace!(self.logger, "design cache hit"; "family" => ?plan.family, "order" => plan.order);
                        sos
                    }
                    None => cache.insert(key, design::design_sos(plan)?),
                }
            }
            None => Arc::new(design::design_sos(plan)?),
        };
        let filter = DesignedFilter::from_sos(&sos, plan.fs)?;
        debug!(self.logger, "designed filter";
            "family" => ?plan.family,
            "band" => ?plan.band,
            "order" => plan.order,
            "sections" => filter.len(),
            "fs" => plan.fs);
        Ok(filter)
    }

    /// Filters `signal` along its last axis.
    pub fn apply<T, S, D>(&self, signal: &ArrayBase<S, D>, fs: f64, spec: &FilterSpec) -> Result<Array<T, D>>
    where
        T: Sample,
        S: Data<Elem = T>,
        D: Dimension,
    {
        if signal.ndim() == 0 {
            return Err(FilterError::invalid("signal must have at least one dimension"));
        }
        self.apply_along(signal, fs, spec, Axis(signal.ndim() - 1))
    }

    /// Filters `signal` along `axis`. The input is never modified.
    pub fn apply_along<T, S, D>(
        &self,
        signal: &ArrayBase<S, D>,
        fs: f64,
        spec: &FilterSpec,
        axis: Axis,
    ) -> Result<Array<T, D>>
    where
        T: Sample,
        S: Data<Elem = T>,
        D: Dimension,
    {
        if signal.ndim() == 0 {
            return Err(FilterError::invalid("signal must have at least one dimension"));
        }
        if axis.index() >= signal.ndim() {
            return Err(FilterError::invalid(format!(
                "axis {} is out of range for a {}-dimensional signal",
                axis.index(),
                signal.ndim()
            )));
        }
        if signal.len_of(axis) == 0 {
            return Err(FilterError::invalid("time axis is empty"));
        }

        let filter = match spec.resolve(fs)? {
            Resolution::PassThrough => {
                debug!(self.logger, "no bounds set, passing signal through");
                return Ok(signal.to_owned());
            }
            Resolution::RejectAll => {
                debug!(self.logger, "no bounds set with band_stop, rejecting everything");
                return Ok(Array::zeros(signal.raw_dim()));
            }
            Resolution::Design(plan) => self.design_plan::<T>(&plan)?,
        };

        if spec.two_way {
            let padding = Padding {
                pad_type: spec.pad_type,
                pad_length: spec.pad_length.map(|len| len as usize),
            };
            debug!(self.logger, "zero-phase filtering";
                "samples" => signal.len_of(axis),
                "pad_type" => ?padding.pad_type,
                "pad_length" => ?padding.pad_length);
            filter.filtfilt(signal, axis, padding)
        } else {
            debug!(self.logger, "causal filtering"; "samples" => signal.len_of(axis));
            Ok(filter.filter(signal, axis))
        }
    }
}

/// Filters `signal` along its last axis with a default engine.
pub fn design_and_apply<T, S, D>(signal: &ArrayBase<S, D>, fs: f64, spec: &FilterSpec) -> Result<Array<T, D>>
where
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    FilterEngine::default().apply(signal, fs, spec)
}

/// Filters `signal` along `axis` with a default engine.
pub fn design_and_apply_along<T, S, D>(
    signal: &ArrayBase<S, D>,
    fs: f64,
    spec: &FilterSpec,
    axis: Axis,
) -> Result<Array<T, D>>
where
    T: Sample,
    S: Data<Elem = T>,
    D: Dimension,
{
    FilterEngine::default().apply_along(signal, fs, spec, axis)
}
