//! Error handling for Rigforge
//!
//! One error enum covers the whole construction pipeline. Nothing here is
//! retried: every error propagates unmodified to the caller, and graph
//! mutations already performed are NOT rolled back.

use thiserror::Error;

/// Result type alias for Rigforge operations
pub type Result<T> = std::result::Result<T, RigError>;

/// Main error type for Rigforge operations
#[derive(Error, Debug)]
pub enum RigError {
    // Scene Graph Errors
    #[error("Node not found: {name}")]
    NodeNotFound { name: String },

    #[error("Attribute '{attr}' missing on node '{node}'")]
    AttributeMissing { node: String, attr: String },

    #[error("Attribute '{attr}' on node '{node}' is not a {expected}")]
    AttributeType {
        node: String,
        attr: String,
        expected: &'static str,
    },

    // Naming Errors
    #[error("Name does not follow the generated-name pattern: '{name}'")]
    UnparseableName { name: String },

    /// Batched naming-contract failure: every offender is enumerated before
    /// this single aggregate error is raised.
    #[error("Naming violations under '{group}': {}", .violations.join(", "))]
    NamingViolations {
        group: String,
        violations: Vec<String>,
    },

    // Unit Errors
    #[error("Unit not found: {name}")]
    UnitNotFound { name: String },

    #[error("Unit '{unit}' has no member registered for role '{role}'")]
    MemberNotFound { unit: String, role: String },

    #[error("Role '{role}' was not declared on unit '{unit}'")]
    UndeclaredMember { unit: String, role: String },

    // Extension Errors
    #[error("Extension already installed: {name}")]
    DuplicateExtension { name: String },

    // Layer Errors
    #[error("Sub-group '{group}' not found under '{parent}'")]
    MissingSubGroup { group: String, parent: String },

    #[error("Layer operation failed: {reason}")]
    LayerError { reason: String },

    // User-facing precondition failures (nothing selected, bad config, ...)
    #[error("Precondition failed: {reason}")]
    PreconditionFailed { reason: String },

    #[error("Invalid rig configuration: {reason}")]
    InvalidConfig { reason: String },

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RigError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            RigError::NodeNotFound { .. } => "NODE_NOT_FOUND",
            RigError::AttributeMissing { .. } => "ATTRIBUTE_MISSING",
            RigError::AttributeType { .. } => "ATTRIBUTE_TYPE",
            RigError::UnparseableName { .. } => "UNPARSEABLE_NAME",
            RigError::NamingViolations { .. } => "NAMING_VIOLATIONS",
            RigError::UnitNotFound { .. } => "UNIT_NOT_FOUND",
            RigError::MemberNotFound { .. } => "MEMBER_NOT_FOUND",
            RigError::UndeclaredMember { .. } => "UNDECLARED_MEMBER",
            RigError::DuplicateExtension { .. } => "DUPLICATE_EXTENSION",
            RigError::MissingSubGroup { .. } => "MISSING_SUB_GROUP",
            RigError::LayerError { .. } => "LAYER_ERROR",
            RigError::PreconditionFailed { .. } => "PRECONDITION_FAILED",
            RigError::InvalidConfig { .. } => "INVALID_CONFIG",
            RigError::Io(_) => "IO_ERROR",
            RigError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error aborts the whole construction run.
    ///
    /// `MissingSubGroup` is the one non-fatal case: the layer that hits it
    /// logs and skips itself instead of propagating.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, RigError::MissingSubGroup { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = RigError::UnitNotFound {
            name: "arm_L_unit".to_string(),
        };
        assert_eq!(err.error_code(), "UNIT_NOT_FOUND");
    }

    #[test]
    fn test_naming_violations_message_lists_all_offenders() {
        let err = RigError::NamingViolations {
            group: "deform_grp".to_string(),
            violations: vec!["badMesh".to_string(), "alsoBad".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("badMesh"));
        assert!(msg.contains("alsoBad"));
    }

    #[test]
    fn test_missing_sub_group_is_non_fatal() {
        let err = RigError::MissingSubGroup {
            group: "tweak".to_string(),
            parent: "geo_grp".to_string(),
        };
        assert!(!err.is_fatal());
        assert!(RigError::UnitNotFound {
            name: "x".to_string()
        }
        .is_fatal());
    }
}
