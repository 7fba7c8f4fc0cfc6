//! Rig configuration
//!
//! JSON description of what to build: the rig name, the bind-joint chains,
//! the source geometry, and which deformation layers to stack. Thin by
//! design; all real behavior lives in the rig and layer modules.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};
use crate::layers;
use crate::scene::Position;

/// Top-level rig build description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    /// Rig (and root node) name.
    pub name: String,
    /// Bind-joint chains to build control rigs over.
    pub chains: Vec<ChainConfig>,
    /// Source geometry; absent means no deformation layer stack.
    #[serde(default)]
    pub geometry: Option<GeometryConfig>,
    /// Layer classes to stack, in pipeline order.
    #[serde(default)]
    pub layers: Vec<String>,
}

/// One bind-joint chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Base name for the chain's Unit and generated nodes.
    pub base: String,
    /// Position label: "C", "L", or "R".
    pub position: String,
    /// Joints, root first.
    pub joints: Vec<JointConfig>,
}

/// One bind joint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JointConfig {
    pub name: String,
    #[serde(default)]
    pub translate: [f64; 3],
}

/// Source geometry for the deformation layer stack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryConfig {
    /// Name of the source group.
    pub group: String,
    /// Mesh names under the main mesh container.
    pub meshes: Vec<String>,
    /// Mesh names under the optional tweak sub-group.
    #[serde(default)]
    pub tweak_meshes: Vec<String>,
}

impl RigConfig {
    /// Parse a config from a JSON string and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: RigConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Reject configs the build would only trip over later.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(RigError::InvalidConfig {
                reason: "rig name is empty".to_string(),
            });
        }
        for chain in &self.chains {
            chain.position()?;
            if chain.joints.is_empty() {
                return Err(RigError::InvalidConfig {
                    reason: format!("chain '{}' has no joints", chain.base),
                });
            }
        }
        for layer in &self.layers {
            if layers::layer_ctor(layer).is_none() {
                return Err(RigError::InvalidConfig {
                    reason: format!("unknown layer class '{}'", layer),
                });
            }
        }
        if !self.layers.is_empty() && self.geometry.is_none() {
            return Err(RigError::InvalidConfig {
                reason: "layers configured without source geometry".to_string(),
            });
        }
        Ok(())
    }
}

impl ChainConfig {
    /// Parsed position label.
    pub fn position(&self) -> Result<Position> {
        Position::from_label(&self.position).ok_or_else(|| RigError::InvalidConfig {
            reason: format!(
                "chain '{}': invalid position label '{}'",
                self.base, self.position
            ),
        })
    }
}
