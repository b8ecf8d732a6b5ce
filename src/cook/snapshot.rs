//! One refresh of the engine's info records after a cook.

use tracing::debug;

use crate::engine::{AssetId, Engine, ObjectInfo};
use crate::object::ObjectSnapshot;
use crate::util::Result;

/// Info records of every cooked object, in engine order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneSnapshot {
    pub objects: Vec<ObjectSnapshot>,
}

impl SceneSnapshot {
    /// Query objects, geometries and parts of a cooked asset.
    pub fn capture(engine: &dyn Engine, asset: AssetId) -> Result<Self> {
        let objects = engine
            .object_infos(asset)?
            .into_iter()
            .map(|info| ObjectSnapshot::capture(engine, info))
            .collect::<Result<Vec<_>>>()?;
        let snapshot = Self { objects };
        debug!(objects = snapshot.objects.len(), parts = snapshot.part_count(), "scene captured");
        Ok(snapshot)
    }

    /// Object infos alone, for resolving instancer targets.
    pub fn object_infos(&self) -> Vec<ObjectInfo> {
        self.objects.iter().map(|o| o.info.clone()).collect()
    }

    pub fn part_count(&self) -> usize {
        self.objects
            .iter()
            .flat_map(|o| &o.geos)
            .map(|g| g.parts.len())
            .sum()
    }
}
