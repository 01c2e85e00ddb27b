use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use crate::analysis::filter::design::SosRow;
use crate::analysis::filter::spec::{BandType, Critical, Family, FilterPlan};

/// Bit-exact identity of a design request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DesignKey {
    family: u8,
    params: [u64; 2],
    order: usize,
    band: BandType,
    critical: [u64; 2],
    fs: u64,
}

impl From<&FilterPlan> for DesignKey {
    fn from(plan: &FilterPlan) -> Self {
        let (family, params) = match plan.family {
            Family::Bessel => (0, [0, 0]),
            Family::Butterworth => (1, [0, 0]),
            Family::Chebyshev1 { ripple_db } => (2, [ripple_db.to_bits(), 0]),
            Family::Chebyshev2 { attenuation_db } => (3, [0, attenuation_db.to_bits()]),
            Family::Elliptic { ripple_db, attenuation_db } => (4, [ripple_db.to_bits(), attenuation_db.to_bits()]),
        };
        let critical = match plan.critical {
            Critical::Single(hz) => [hz.to_bits(), 0],
            Critical::Pair(lo, hi) => [lo.to_bits(), hi.to_bits()],
        };
        DesignKey {
            family,
            params,
            order: plan.order,
            band: plan.band,
            critical,
            fs: plan.fs.to_bits(),
        }
    }
}

/// Designs kept by [`DesignCache::new`].
pub const DEFAULT_CAPACITY: usize = 128;

#[derive(Debug, Default)]
struct Designs {
    by_key: HashMap<DesignKey, Arc<Vec<SosRow>>>,
    // insertion order, oldest first
    order: VecDeque<DesignKey>,
}

/// Bounded store of finished designs, safe to use from several threads.
/// Once full, each new design evicts the oldest one.
#[derive(Debug)]
pub struct DesignCache {
    capacity: usize,
    designs: RwLock<Designs>,
}

impl Default for DesignCache {
    fn default() -> Self {
        DesignCache::with_capacity(DEFAULT_CAPACITY)
    }
}

impl DesignCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DesignCache {
            capacity: capacity.max(1),
            designs: RwLock::new(Designs::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, key: &DesignKey) -> Option<Arc<Vec<SosRow>>> {
        let designs = self.designs.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        designs.by_key.get(key).cloned()
    }

    /// Stores `sos` under `key` unless another thread got there first, and
    /// returns the stored design.
    pub fn insert(&self, key: DesignKey, sos: Vec<SosRow>) -> Arc<Vec<SosRow>> {
        let mut designs = self.designs.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = designs.by_key.get(&key) {
            return existing.clone();
        }
        while designs.order.len() >= self.capacity {
            match designs.order.pop_front() {
                Some(oldest) => {
                    designs.by_key.remove(&oldest);
                }
                None => break,
            }
        }
        let sos = Arc::new(sos);
        designs.order.push_back(key.clone());
        designs.by_key.insert(key, sos.clone());
        sos
    }

    pub fn len(&self) -> usize {
        let designs = self.designs.read().unwrap_or_else(|poisoned| poisoned.into_inner());
        designs.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut designs = self.designs.write().unwrap_or_else(|poisoned| poisoned.into_inner());
        designs.by_key.clear();
        designs.order.clear();
    }
}
