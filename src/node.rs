//! Host-facing asset node.
//!
//! [`AssetNode`] mirrors the host node's input slots. Every input change
//! enters through [`AssetNode::set_input`], which only records what became
//! dirty. Work happens lazily when the host pulls the outputs through
//! [`AssetNode::compute`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cook::{CookOrchestrator, ParmId, PassStats};
use crate::engine::{Engine, ParmValue};
use crate::options::{AssetNodeOptions, NodeToggle};
use crate::output::CookResult;
use crate::util::{Error, Result};

/// One host input slot change.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeInput {
    AssetPath(PathBuf),
    AssetName(String),
    Time(f32),
    Toggle(NodeToggle, bool),
    Parm(ParmId, ParmValue),
}

/// Request for the host to rebuild the nodes downstream of the outputs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SyncRequest {
    /// Generation of the result whose structure changed.
    pub generation: u64,
}

/// A host node driving one procedural asset.
pub struct AssetNode<E: Engine> {
    cook: CookOrchestrator<E>,
    asset_path: Option<PathBuf>,
    asset_name: Option<String>,
    asset_dirty: bool,
    sync: Option<SyncRequest>,
    error: Option<String>,
}

impl<E: Engine> AssetNode<E> {
    pub fn new(engine: E) -> Self {
        Self::with_options(engine, AssetNodeOptions::default())
    }

    pub fn with_options(engine: E, options: AssetNodeOptions) -> Self {
        Self {
            cook: CookOrchestrator::with_options(engine, options),
            asset_path: None,
            asset_name: None,
            asset_dirty: false,
            sync: None,
            error: None,
        }
    }

    /// Node with its asset inputs set. The asset loads on the first compute.
    pub fn with_asset(engine: E, path: impl Into<PathBuf>, name: &str) -> Self {
        let mut node = Self::new(engine);
        node.asset_path = Some(path.into());
        node.asset_name = Some(name.to_string());
        node.asset_dirty = true;
        node
    }

    /// The single dirty hook: record an input change.
    pub fn set_input(&mut self, input: NodeInput) -> Result<()> {
        match input {
            NodeInput::AssetPath(path) => {
                if self.asset_path.as_deref() != Some(path.as_path()) {
                    self.asset_path = Some(path);
                    self.asset_dirty = true;
                }
            }
            NodeInput::AssetName(name) => {
                if self.asset_name.as_deref() != Some(name.as_str()) {
                    self.asset_name = Some(name);
                    self.asset_dirty = true;
                }
            }
            NodeInput::Time(time) => self.cook.set_time(time),
            NodeInput::Toggle(toggle, value) => {
                let mut options = *self.cook.options();
                if options.set(toggle, value) {
                    debug!(%toggle, value, "toggle changed");
                    self.cook.set_options(options);
                }
            }
            NodeInput::Parm(id, value) => self.cook.set_parameter(&id, value)?,
        }
        Ok(())
    }

    /// Bring the outputs up to date. Loads the asset first if its path or
    /// name changed.
    ///
    /// On failure the previous result stays available through
    /// [`AssetNode::outputs`] and the reason through [`AssetNode::error`].
    pub fn compute(&mut self) -> Result<Arc<CookResult>> {
        let outcome = self.load_if_dirty().and_then(|()| self.cook.request_recompute(false));
        match &outcome {
            Ok(result) => {
                self.error = None;
                let changed = self.cook.last_pass().is_some_and(|p| p.generation == result.generation && p.needs_output_sync);
                if changed && self.cook.options().auto_sync_outputs {
                    debug!(generation = result.generation, "output structure changed, requesting sync");
                    self.sync = Some(SyncRequest {
                        generation: result.generation,
                    });
                }
            }
            Err(e) => {
                warn!(error = %e, "compute failed");
                self.error = Some(e.to_string());
            }
        }
        outcome
    }

    fn load_if_dirty(&mut self) -> Result<()> {
        if !self.asset_dirty {
            return Ok(());
        }
        let (Some(path), Some(name)) = (&self.asset_path, &self.asset_name) else {
            return Err(Error::Config("asset path and name must both be set".into()));
        };
        self.cook.load_asset(path, name)?;
        self.asset_dirty = false;
        Ok(())
    }

    /// Reload the asset and rebuild every output.
    pub fn rebuild_asset(&mut self) -> Result<()> {
        if self.asset_dirty {
            return self.load_if_dirty();
        }
        self.cook.rebuild_asset()?;
        Ok(())
    }

    /// A new input was connected on the host side.
    pub fn input_connected(&mut self) {
        if self.cook.input_connected() {
            debug!("input connected, next compute resyncs");
        }
    }

    /// Take the pending output sync request, if any.
    pub fn sync_request(&mut self) -> Option<SyncRequest> {
        self.sync.take()
    }

    /// Last good result, without computing.
    pub fn outputs(&self) -> Option<Arc<CookResult>> {
        self.cook.last_result()
    }

    /// Reason of the last failed compute.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn asset_path(&self) -> Option<&Path> {
        self.asset_path.as_deref()
    }

    pub fn asset_name(&self) -> Option<&str> {
        self.asset_name.as_deref()
    }

    pub fn options(&self) -> &AssetNodeOptions {
        self.cook.options()
    }

    pub fn parameter(&self, id: &ParmId) -> Option<&ParmValue> {
        self.cook.parameter(id)
    }

    pub fn last_pass(&self) -> Option<&PassStats> {
        self.cook.last_pass()
    }

    pub fn orchestrator(&self) -> &CookOrchestrator<E> {
        &self.cook
    }

    pub fn orchestrator_mut(&mut self) -> &mut CookOrchestrator<E> {
        &mut self.cook
    }
}
