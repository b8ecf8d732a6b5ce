//! Node policy options.
//!
//! Persisted as JSON with camelCase keys. Missing keys take their defaults and
//! unknown keys are ignored, so option files survive version changes.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::util::Result;

/// Policy toggles of an asset node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssetNodeOptions {
    /// Force a full resync when a new input is connected.
    pub sync_when_input_connects: bool,
    /// Ask the host to rebuild downstream nodes when the output structure changes.
    pub auto_sync_outputs: bool,
    /// Output engine object transforms instead of identity.
    pub use_asset_object_transform: bool,
    /// Split parts into one record per named group.
    pub split_geos_by_group: bool,
    /// Output geometry of hidden objects and non-display geometries.
    pub output_hidden_objects: bool,
    pub output_templated_geometries: bool,
    /// Hint: materialize object instancers with an instancer node.
    pub use_instancer_node: bool,
    /// Serve the cached result without pushing parameters or cooking.
    pub lock_asset: bool,
}

impl Default for AssetNodeOptions {
    fn default() -> Self {
        Self {
            sync_when_input_connects: true,
            auto_sync_outputs: false,
            use_asset_object_transform: false,
            split_geos_by_group: false,
            output_hidden_objects: false,
            output_templated_geometries: false,
            use_instancer_node: true,
            lock_asset: false,
        }
    }
}

/// Names one toggle of [`AssetNodeOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeToggle {
    SyncWhenInputConnects,
    AutoSyncOutputs,
    UseAssetObjectTransform,
    SplitGeosByGroup,
    OutputHiddenObjects,
    OutputTemplatedGeometries,
    UseInstancerNode,
    LockAsset,
}

impl NodeToggle {
    pub const ALL: [Self; 8] = [
        Self::SyncWhenInputConnects,
        Self::AutoSyncOutputs,
        Self::UseAssetObjectTransform,
        Self::SplitGeosByGroup,
        Self::OutputHiddenObjects,
        Self::OutputTemplatedGeometries,
        Self::UseInstancerNode,
        Self::LockAsset,
    ];

    /// Host attribute name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SyncWhenInputConnects => "syncWhenInputConnects",
            Self::AutoSyncOutputs => "autoSyncOutputs",
            Self::UseAssetObjectTransform => "useAssetObjectTransform",
            Self::SplitGeosByGroup => "splitGeosByGroup",
            Self::OutputHiddenObjects => "outputHiddenObjects",
            Self::OutputTemplatedGeometries => "outputTemplatedGeometries",
            Self::UseInstancerNode => "useInstancerNode",
            Self::LockAsset => "lockAsset",
        }
    }

    /// Look a toggle up by host attribute name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Whether changing the toggle changes the translated output, which then
    /// needs a full resync.
    pub const fn affects_output(self) -> bool {
        matches!(
            self,
            Self::UseAssetObjectTransform
                | Self::SplitGeosByGroup
                | Self::OutputHiddenObjects
                | Self::OutputTemplatedGeometries
                | Self::UseInstancerNode
        )
    }
}

impl std::fmt::Display for NodeToggle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl AssetNodeOptions {
    pub fn get(&self, toggle: NodeToggle) -> bool {
        match toggle {
            NodeToggle::SyncWhenInputConnects => self.sync_when_input_connects,
            NodeToggle::AutoSyncOutputs => self.auto_sync_outputs,
            NodeToggle::UseAssetObjectTransform => self.use_asset_object_transform,
            NodeToggle::SplitGeosByGroup => self.split_geos_by_group,
            NodeToggle::OutputHiddenObjects => self.output_hidden_objects,
            NodeToggle::OutputTemplatedGeometries => self.output_templated_geometries,
            NodeToggle::UseInstancerNode => self.use_instancer_node,
            NodeToggle::LockAsset => self.lock_asset,
        }
    }

    /// Set a toggle. Returns whether the value changed.
    pub fn set(&mut self, toggle: NodeToggle, value: bool) -> bool {
        let slot = match toggle {
            NodeToggle::SyncWhenInputConnects => &mut self.sync_when_input_connects,
            NodeToggle::AutoSyncOutputs => &mut self.auto_sync_outputs,
            NodeToggle::UseAssetObjectTransform => &mut self.use_asset_object_transform,
            NodeToggle::SplitGeosByGroup => &mut self.split_geos_by_group,
            NodeToggle::OutputHiddenObjects => &mut self.output_hidden_objects,
            NodeToggle::OutputTemplatedGeometries => &mut self.output_templated_geometries,
            NodeToggle::UseInstancerNode => &mut self.use_instancer_node,
            NodeToggle::LockAsset => &mut self.lock_asset,
        };
        let changed = *slot != value;
        *slot = value;
        changed
    }

    /// Whether switching from `other` to `self` changes the translated output.
    pub fn output_differs(&self, other: &Self) -> bool {
        NodeToggle::ALL
            .into_iter()
            .any(|t| t.affects_output() && self.get(t) != other.get(t))
    }

    /// Parse options from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load options from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Save options to a JSON file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let o = AssetNodeOptions::default();
        assert!(o.sync_when_input_connects);
        assert!(o.use_instancer_node);
        assert!(!o.auto_sync_outputs);
        assert!(!o.lock_asset);
    }

    #[test]
    fn test_set_reports_change() {
        let mut o = AssetNodeOptions::default();
        assert!(o.set(NodeToggle::SplitGeosByGroup, true));
        assert!(!o.set(NodeToggle::SplitGeosByGroup, true));
        assert!(o.get(NodeToggle::SplitGeosByGroup));
        assert!(o.output_differs(&AssetNodeOptions::default()));

        let mut locked = AssetNodeOptions::default();
        locked.set(NodeToggle::LockAsset, true);
        assert!(!locked.output_differs(&AssetNodeOptions::default()));
    }

    #[test]
    fn test_json_partial_and_unknown_keys() {
        let o = AssetNodeOptions::from_json(r#"{"splitGeosByGroup": true, "somethingElse": 3}"#).unwrap();
        assert!(o.split_geos_by_group);
        assert!(o.use_instancer_node);
        assert!(AssetNodeOptions::from_json("not json").is_err());
    }

    #[test]
    fn test_toggle_names() {
        for t in NodeToggle::ALL {
            assert_eq!(NodeToggle::from_name(t.name()), Some(t));
        }
        assert_eq!(NodeToggle::from_name("bogus"), None);
    }
}
