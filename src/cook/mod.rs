//! Cook orchestration.
//!
//! [`CookOrchestrator`] owns the asset handle of one node. It tracks dirty
//! parameters and time, pushes them into the engine, cooks, and walks the
//! cooked scene through the object assembler. It also decides per pass
//! whether the part cache may be reused or everything is rebuilt.
//!
//! A pass either completes and swaps in a new [`CookResult`], or fails and
//! leaves the previous one in place. No partially built result is ever
//! visible.

mod parms;
mod signature;
mod snapshot;

pub use parms::*;
pub use signature::*;
pub use snapshot::SceneSnapshot;

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

use crate::engine::{AssetId, Engine, ParmValue};
use crate::object::ObjectAssembler;
use crate::options::AssetNodeOptions;
use crate::output::CookResult;
use crate::part::{BuildPath, PartCache, PartKey, PartPass, PartState};
use crate::util::{Error, Result};

/// The live asset instance of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadedAsset {
    pub id: AssetId,
    pub library: PathBuf,
    pub name: String,
}

/// What one compute pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PassStats {
    pub generation: u64,
    pub resync: Resync,
    pub full_rebuilds: usize,
    pub refilled: usize,
    pub reused: usize,
    pub failed: usize,
    /// Parts whose kind differs from the previous pass.
    pub kind_changes: usize,
    /// The output structure changed and downstream host nodes must be rebuilt.
    pub needs_output_sync: bool,
}

impl PassStats {
    fn count(generation: u64, resync: Resync, cache: &PartCache) -> Self {
        let mut stats = Self {
            generation,
            resync,
            full_rebuilds: 0,
            refilled: 0,
            reused: 0,
            failed: 0,
            kind_changes: 0,
            needs_output_sync: false,
        };
        for (_, state) in cache.iter() {
            match state.path {
                BuildPath::Full => stats.full_rebuilds += 1,
                BuildPath::Refill => stats.refilled += 1,
                BuildPath::Reused => stats.reused += 1,
                BuildPath::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Parts translated in the pass.
    pub fn parts(&self) -> usize {
        self.full_rebuilds + self.refilled + self.reused + self.failed
    }
}

/// Drives parameter pushes, cooks and translation passes for one asset.
pub struct CookOrchestrator<E: Engine> {
    engine: E,
    asset: Option<LoadedAsset>,
    options: AssetNodeOptions,
    parms: ParmTable,
    dirty: ParmDirtySet,
    time: f32,
    time_dirty: bool,
    pending_resync: Option<ResyncReason>,
    cache: PartCache,
    signature: Option<ShapeSignature>,
    result: Option<Arc<CookResult>>,
    last_pass: Option<PassStats>,
    generation: u64,
}

impl<E: Engine> CookOrchestrator<E> {
    pub fn new(engine: E) -> Self {
        Self::with_options(engine, AssetNodeOptions::default())
    }

    pub fn with_options(engine: E, options: AssetNodeOptions) -> Self {
        Self {
            engine,
            asset: None,
            options,
            parms: ParmTable::default(),
            dirty: ParmDirtySet::new(),
            time: 0.0,
            time_dirty: false,
            pending_resync: None,
            cache: PartCache::new(),
            signature: None,
            result: None,
            last_pass: None,
            generation: 0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn asset(&self) -> Option<&LoadedAsset> {
        self.asset.as_ref()
    }

    pub fn options(&self) -> &AssetNodeOptions {
        &self.options
    }

    /// Instantiate an asset, replacing the live one if any. The parameter
    /// table is rebuilt from the asset's defaults and the next pass is a full
    /// resync.
    #[tracing::instrument(skip(self, library), fields(library = %library.as_ref().display()))]
    pub fn load_asset(&mut self, library: impl AsRef<Path>, name: &str) -> Result<AssetId> {
        self.unload_asset();
        let library = library.as_ref();
        let id = self.engine.create_asset(library, name)?;
        self.asset = Some(LoadedAsset {
            id,
            library: library.to_path_buf(),
            name: name.to_string(),
        });
        self.parms = ParmTable::from_infos(self.engine.parm_infos(id)?);
        self.time_dirty = true;
        self.pending_resync = Some(ResyncReason::AssetLoaded);
        info!(asset = %id, parms = self.parms.len(), "asset loaded");
        Ok(id)
    }

    /// Reload the current asset from the same library and name.
    pub fn rebuild_asset(&mut self) -> Result<AssetId> {
        let Some(asset) = self.asset.clone() else {
            return Err(Error::AssetInvalid);
        };
        self.load_asset(&asset.library, &asset.name)
    }

    /// Destroy the live asset. The last result stays readable.
    pub fn unload_asset(&mut self) {
        let Some(asset) = self.asset.take() else {
            return;
        };
        if self.engine.is_asset_valid(asset.id) {
            if let Err(e) = self.engine.destroy_asset(asset.id) {
                warn!(asset = %asset.id, error = %e, "asset could not be destroyed");
            }
        }
        self.parms = ParmTable::default();
        self.dirty.clear();
        self.cache.clear();
        self.signature = None;
        debug!(asset = %asset.id, "asset unloaded");
    }

    /// Flag a parameter for the next push. Idempotent.
    pub fn mark_parameter_dirty(&mut self, id: &ParmId) -> Result<()> {
        if !self.parms.contains(id) {
            return Err(Error::ParmNotFound(id.to_string()));
        }
        if self.dirty.mark(id.clone()) {
            trace!(parm = %id, "parameter dirty");
        }
        Ok(())
    }

    /// Store a host-side parameter value and flag it dirty.
    pub fn set_parameter(&mut self, id: &ParmId, value: ParmValue) -> Result<()> {
        self.parms.set(id, value)?;
        self.mark_parameter_dirty(id)
    }

    pub fn parameter(&self, id: &ParmId) -> Option<&ParmValue> {
        self.parms.get(id).map(|e| &e.value)
    }

    pub fn parameters(&self) -> &ParmTable {
        &self.parms
    }

    pub fn dirty_parameters(&self) -> &ParmDirtySet {
        &self.dirty
    }

    /// Set the cook time. It is pushed on the next recompute if it changed.
    pub fn set_time(&mut self, time: f32) {
        if time != self.time {
            self.time = time;
            self.time_dirty = true;
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    /// Replace the policy options. Returns whether the translated output is
    /// affected, in which case the next pass is a full resync.
    pub fn set_options(&mut self, options: AssetNodeOptions) -> bool {
        let affects_output = options.output_differs(&self.options);
        self.options = options;
        if affects_output {
            self.schedule_resync(ResyncReason::OptionsChanged);
        }
        affects_output
    }

    /// Make the next pass rebuild every part.
    pub fn request_full_resync(&mut self) {
        self.schedule_resync(ResyncReason::Requested);
    }

    /// A new input was connected on the host side. Returns whether this
    /// scheduled a full resync.
    pub fn input_connected(&mut self) -> bool {
        if !self.options.sync_when_input_connects {
            return false;
        }
        self.schedule_resync(ResyncReason::InputConnected);
        true
    }

    fn schedule_resync(&mut self, reason: ResyncReason) {
        if self.pending_resync.is_none() {
            self.pending_resync = Some(reason);
        }
    }

    /// Whether the next recompute has work to do.
    pub fn is_dirty(&self) -> bool {
        self.result.is_none() || !self.dirty.is_empty() || self.time_dirty || self.pending_resync.is_some()
    }

    /// Bring the cook result up to date.
    ///
    /// Returns the cached result without touching the engine when nothing is
    /// dirty or the asset is locked. Otherwise pushes dirty parameters and
    /// time, cooks, and translates the cooked scene. A failed cook keeps the
    /// previous result and returns [`Error::CookFailed`].
    #[tracing::instrument(skip(self))]
    pub fn request_recompute(&mut self, force_full_sync: bool) -> Result<Arc<CookResult>> {
        let asset = match &self.asset {
            Some(a) if self.engine.is_asset_valid(a.id) => a.id,
            _ => {
                warn!("no valid asset to cook");
                return Err(Error::AssetInvalid);
            }
        };

        if let Some(result) = &self.result {
            if self.options.lock_asset {
                debug!(generation = result.generation, "asset locked, serving cached result");
                return Ok(Arc::clone(result));
            }
            if !force_full_sync && !self.is_dirty() {
                debug!(generation = result.generation, "nothing dirty, serving cached result");
                return Ok(Arc::clone(result));
            }
        }
        if force_full_sync {
            self.schedule_resync(ResyncReason::Requested);
        }

        self.push_inputs(asset)?;
        if let Err(e) = self.engine.cook(asset) {
            warn!(error = %e, "cook failed, keeping previous result");
            return Err(e);
        }

        let snapshot = match SceneSnapshot::capture(&self.engine, asset) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "cooked scene could not be read, dropping part cache");
                self.cache.clear();
                self.signature = None;
                return Err(e);
            }
        };
        let result = self.translate(&snapshot);

        let dirty = &self.dirty;
        let engine = &self.engine;
        let pulled = self.parms.pull(dirty, |path| engine.parm_value(asset, path));
        if pulled > 0 {
            debug!(pulled, "parameters updated by the cook");
        }
        Ok(result)
    }

    fn push_inputs(&mut self, asset: AssetId) -> Result<()> {
        for id in self.dirty.iter() {
            let entry = self.parms.get(id).ok_or_else(|| Error::ParmNotFound(id.to_string()))?;
            self.engine.set_parm_value(asset, &entry.path, &entry.value)?;
        }
        if !self.dirty.is_empty() {
            debug!(count = self.dirty.len(), "parameters pushed");
            self.dirty.clear();
        }
        if self.time_dirty {
            self.engine.set_time(self.time)?;
            self.time_dirty = false;
            debug!(time = self.time, "time pushed");
        }
        Ok(())
    }

    /// Translate a cooked scene and swap the result in.
    fn translate(&mut self, snapshot: &SceneSnapshot) -> Arc<CookResult> {
        let signature = ShapeSignature::of(snapshot, self.options.split_geos_by_group);
        let resync = Resync::plan(self.pending_resync.take(), self.signature.as_ref(), &signature);
        if let Resync::Full(reason) = resync {
            debug!(%reason, parts = signature.part_count(), "full resync");
            self.cache.invalidate_all();
        }

        let infos = snapshot.object_infos();
        let assembler = ObjectAssembler::new(&self.options);
        let mut pass = PartPass::new(&self.engine, self.time, std::mem::take(&mut self.cache));
        let objects = snapshot
            .objects
            .iter()
            .map(|o| assembler.assemble(o, &infos, &mut pass))
            .collect();
        let kind_changes = pass.kind_changes();
        self.cache = pass.finish();

        self.generation += 1;
        let result = Arc::new(CookResult {
            generation: self.generation,
            objects,
        });

        let layout_changed = self
            .result
            .as_ref()
            .map_or(true, |prev| OutputLayout::of(prev) != OutputLayout::of(&result));
        let signature_changed = self.signature.as_ref() != Some(&signature);

        let mut stats = PassStats::count(self.generation, resync, &self.cache);
        stats.kind_changes = kind_changes;
        stats.needs_output_sync = signature_changed || kind_changes > 0 || layout_changed;
        debug!(
            generation = stats.generation,
            full = stats.full_rebuilds,
            refilled = stats.refilled,
            reused = stats.reused,
            failed = stats.failed,
            needs_output_sync = stats.needs_output_sync,
            "pass complete"
        );

        self.signature = Some(signature);
        self.last_pass = Some(stats);
        self.result = Some(Arc::clone(&result));
        result
    }

    /// Result of the last successful pass.
    pub fn last_result(&self) -> Option<Arc<CookResult>> {
        self.result.clone()
    }

    pub fn last_pass(&self) -> Option<&PassStats> {
        self.last_pass.as_ref()
    }

    /// Cached state of one part after the last pass.
    pub fn part_state(&self, key: &PartKey) -> Option<&PartState> {
        self.cache.get(key)
    }

    pub fn part_cache(&self) -> &PartCache {
        &self.cache
    }
}

impl<E: Engine> Drop for CookOrchestrator<E> {
    fn drop(&mut self) {
        self.unload_asset();
    }
}
