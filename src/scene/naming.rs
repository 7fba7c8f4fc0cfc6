//! Deterministic node naming
//!
//! Every generated node name is composed from (base name, position, role,
//! optional suffix) and parses back into those components. Names are NOT
//! stable identities: composing twice with the same inputs yields the same
//! string, so rebuilding a rig produces colliding names by design.
//!
//! Pattern: `{base}_{position}_{role}` with an optional trailing `_{suffix}`,
//! e.g. `arm_L_jnt`, `upperArm_L_ctl_ik`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RigError};

/// Body-side position of a generated node.
///
/// Carries both an index (how positions are persisted on Units) and the
/// derived one-letter label used inside names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Position {
    Center,
    Left,
    Right,
}

impl Position {
    /// Index form, as stored on persisted Units.
    pub fn index(self) -> i64 {
        match self {
            Position::Center => 0,
            Position::Left => 1,
            Position::Right => 2,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        match index {
            0 => Some(Position::Center),
            1 => Some(Position::Left),
            2 => Some(Position::Right),
            _ => None,
        }
    }

    /// One-letter label used inside composed names.
    pub fn label(self) -> &'static str {
        match self {
            Position::Center => "C",
            Position::Left => "L",
            Position::Right => "R",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "C" => Some(Position::Center),
            "L" => Some(Position::Left),
            "R" => Some(Position::Right),
            _ => None,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Role a generated node plays in the rig.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeRole {
    Joint,
    Ctrl,
    Group,
    Proxy,
    Unit,
    Set,
    Mesh,
    Deformer,
    Util,
}

impl NodeRole {
    /// Short code used inside composed names.
    pub fn code(self) -> &'static str {
        match self {
            NodeRole::Joint => "jnt",
            NodeRole::Ctrl => "ctl",
            NodeRole::Group => "grp",
            NodeRole::Proxy => "prx",
            NodeRole::Unit => "unit",
            NodeRole::Set => "set",
            NodeRole::Mesh => "msh",
            NodeRole::Deformer => "def",
            NodeRole::Util => "utl",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "jnt" => Some(NodeRole::Joint),
            "ctl" => Some(NodeRole::Ctrl),
            "grp" => Some(NodeRole::Group),
            "prx" => Some(NodeRole::Proxy),
            "unit" => Some(NodeRole::Unit),
            "set" => Some(NodeRole::Set),
            "msh" => Some(NodeRole::Mesh),
            "def" => Some(NodeRole::Deformer),
            "utl" => Some(NodeRole::Util),
            _ => None,
        }
    }
}

/// A fully resolved generated name, parseable from and composable to a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedName {
    pub base: String,
    pub position: Position,
    pub role: NodeRole,
    pub suffix: Option<String>,
}

impl GeneratedName {
    /// Compose the final string form.
    pub fn compose(&self) -> String {
        match &self.suffix {
            Some(suffix) => format!(
                "{}_{}_{}_{}",
                self.base,
                self.position.label(),
                self.role.code(),
                suffix
            ),
            None => format!(
                "{}_{}_{}",
                self.base,
                self.position.label(),
                self.role.code()
            ),
        }
    }

    /// Parse a composed name back into its components.
    ///
    /// The base may itself contain underscores, so parsing works from the
    /// right: role code, then the position label left of it; a single token
    /// right of the role code is the suffix.
    pub fn parse(name: &str) -> Result<Self> {
        let fail = || RigError::UnparseableName {
            name: name.to_string(),
        };
        let tokens: Vec<&str> = name.split('_').collect();
        if tokens.len() < 3 {
            return Err(fail());
        }

        let last = tokens[tokens.len() - 1];
        let (role, suffix, pos_index) = if let Some(role) = NodeRole::from_code(last) {
            (role, None, tokens.len() - 2)
        } else {
            let role =
                NodeRole::from_code(tokens[tokens.len() - 2]).ok_or_else(fail)?;
            (role, Some(last.to_string()), tokens.len() - 3)
        };

        // pos_index must leave at least one token for the base
        if pos_index == 0 {
            return Err(fail());
        }
        let position = Position::from_label(tokens[pos_index]).ok_or_else(fail)?;
        let base = tokens[..pos_index].join("_");

        Ok(Self {
            base,
            position,
            role,
            suffix,
        })
    }
}

impl fmt::Display for GeneratedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.compose())
    }
}

/// Value object assembling generated names piece by piece.
///
/// Defaults: center position, group role, no suffix.
#[derive(Debug, Clone)]
pub struct NameBuilder {
    name: GeneratedName,
}

impl NameBuilder {
    pub fn new(base: &str) -> Self {
        Self {
            name: GeneratedName {
                base: base.to_string(),
                position: Position::Center,
                role: NodeRole::Group,
                suffix: None,
            },
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.name.position = position;
        self
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.name.role = role;
        self
    }

    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.name.suffix = Some(suffix.to_string());
        self
    }

    /// The resolved name as a value.
    pub fn build(self) -> GeneratedName {
        self.name
    }

    /// Shorthand for `build().compose()`.
    pub fn compose(self) -> String {
        self.name.compose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test]
    fn test_compose_without_suffix() {
        let name = NameBuilder::new("arm")
            .with_position(Position::Left)
            .with_role(NodeRole::Joint)
            .compose();
        assert_eq!(name, "arm_L_jnt");
    }

    #[test]
    fn test_compose_with_suffix() {
        let name = NameBuilder::new("upperArm")
            .with_position(Position::Right)
            .with_role(NodeRole::Ctrl)
            .with_suffix("ik")
            .compose();
        assert_eq!(name, "upperArm_R_ctl_ik");
    }

    #[test_case("arm_L_jnt", "arm", Position::Left, NodeRole::Joint, None; "plain joint")]
    #[test_case("spine_C_unit", "spine", Position::Center, NodeRole::Unit, None; "unit")]
    #[test_case("arm_L_ctl_ik", "arm", Position::Left, NodeRole::Ctrl, Some("ik"); "suffixed ctrl")]
    #[test_case("lower_leg_R_prx", "lower_leg", Position::Right, NodeRole::Proxy, None; "underscored base")]
    fn test_parse(
        input: &str,
        base: &str,
        position: Position,
        role: NodeRole,
        suffix: Option<&str>,
    ) {
        let parsed = GeneratedName::parse(input).unwrap();
        assert_eq!(parsed.base, base);
        assert_eq!(parsed.position, position);
        assert_eq!(parsed.role, role);
        assert_eq!(parsed.suffix.as_deref(), suffix);
    }

    #[test_case("arm"; "too few tokens")]
    #[test_case("arm_L"; "no role")]
    #[test_case("arm_X_jnt"; "bad position")]
    #[test_case("L_jnt"; "empty base")]
    #[test_case("arm_L_xyz"; "unknown role code")]
    fn test_parse_rejects(input: &str) {
        assert!(GeneratedName::parse(input).is_err());
    }

    #[test]
    fn test_round_trip() {
        let original = NameBuilder::new("clavicle")
            .with_position(Position::Left)
            .with_role(NodeRole::Proxy)
            .with_suffix("upper")
            .build();
        let parsed = GeneratedName::parse(&original.compose()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_same_inputs_collide() {
        let a = NameBuilder::new("arm").with_role(NodeRole::Joint).compose();
        let b = NameBuilder::new("arm").with_role(NodeRole::Joint).compose();
        assert_eq!(a, b);
    }
}
