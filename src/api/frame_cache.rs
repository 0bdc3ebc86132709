use std::hash::{DefaultHasher, Hash, Hasher};

use crate::core::types::{Sample, Viewport};
use crate::interaction::HitTestScene;
use crate::render::ChartFrame;

use super::ChartInput;

/// Runtime metrics exposed by the single-entry frame cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameCacheStats {
    pub hits: u64,
    pub misses: u64,
}

/// Hash of the input content; computed once per `set_input`.
pub(super) fn input_fingerprint(input: &ChartInput) -> u64 {
    let mut hasher = DefaultHasher::new();
    input.fingerprint(&mut hasher);
    hasher.finish()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) struct FrameCacheKey {
    pub(super) input_fingerprint: u64,
    pub(super) viewport: Viewport,
    pub(super) config_generation: u64,
    pub(super) resolver_generation: u64,
}

impl FrameCacheKey {
    pub(super) fn digest(self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.hash(&mut hasher);
        hasher.finish()
    }
}

/// Last computed frame plus the normalized series it was built from. Hit
/// testing reads both, so selection always agrees with what was drawn.
#[derive(Debug, Clone)]
pub(super) struct FrameCacheEntry {
    pub(super) key: u64,
    pub(super) samples: Vec<Sample>,
    pub(super) frame: ChartFrame,
}

impl FrameCacheEntry {
    pub(super) fn hit_test_scene(&self) -> HitTestScene<'_> {
        HitTestScene {
            samples: &self.samples,
            mapper: &self.frame.mapper,
            sections: self.frame.sections,
            historical_dots: &self.frame.historical_dots,
            scheduled_dots: &self.frame.scheduled_dots,
        }
    }
}
