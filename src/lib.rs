//! # Houdini asset node
//!
//! Incremental cook pipeline of a host node that drives a procedural asset.
//! The node tracks dirty inputs, pushes them into the engine, cooks, and
//! translates the cooked objects, geometries and parts into a typed output
//! tree the host can read.
//!
//! ## Modules
//!
//! - [`util`] - Attribute vocabulary, transforms, errors
//! - [`engine`] - The consumed engine boundary and an in-memory engine
//! - [`attribute`] - Typed attribute reads and the used-attribute ledger
//! - [`output`] - The output record tree
//! - [`part`] - Per-part translation and build strategies
//! - [`geometry`] - Geometry filtering and group splitting
//! - [`object`] - Object transforms, visibility and instancers
//! - [`cook`] - Dirty tracking, cooking and pass bookkeeping
//! - [`node`] - The host-facing node
//!
//! ## Example
//!
//! ```ignore
//! use houdini_asset_node::prelude::*;
//!
//! let mut node = AssetNode::with_asset(engine, "assets/rock.hda", "rock");
//! node.set_input(NodeInput::Time(1.5))?;
//! let result = node.compute()?;
//! for object in &result.objects {
//!     println!("{} ({} geometries)", object.name, object.geometries().map_or(0, |g| g.len()));
//! }
//! ```

pub mod util;
pub mod engine;
pub mod attribute;
pub mod output;
pub mod part;
pub mod geometry;
pub mod object;
pub mod cook;
pub mod options;
pub mod node;
pub mod logging;

// Re-export commonly used types
pub use util::{Error, Result};
pub use cook::{CookOrchestrator, PassStats};
pub use node::{AssetNode, NodeInput, SyncRequest};
pub use options::{AssetNodeOptions, NodeToggle};
pub use output::CookResult;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::util::{Error, Result};
    pub use crate::engine::{Engine, ParmValue};
    pub use crate::cook::{CookOrchestrator, ParmId, PassStats};
    pub use crate::node::{AssetNode, NodeInput, SyncRequest};
    pub use crate::options::{AssetNodeOptions, NodeToggle};
    pub use crate::output::*;
}
