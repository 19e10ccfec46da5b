use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Severity of a non-fatal finding
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WarningLevel {
    Info,
    Recommendation,
    Warning,
}

/// Stable identifier of a warning, for UIs that filter or translate them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WarningCode {
    // pricing
    AddOnIneligible,
    AddOnSuppressed,
    MissingRegionMultiplier,
    CloudInfrastructureIncluded,
    // review
    NoApplications,
    SingleControlPlane,
    SingleZoneProduction,
    ManagedDistributionHaIgnored,
    ManagedHaOnSelfManaged,
    VmControlPlaneHaIgnored,
    DrEnvironmentDoubleCount,
    BackupRestoreWithoutBackup,
    InfrequentBackups,
    HighProdOvercommit,
    MultiRegionWithoutDr,
    CloudHostingSelfManagedDistribution,
    UnlimitedUsersWithoutPacks,
    StandbyOnSingleZone,
}

/// Human-readable finding attached to a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub level: WarningLevel,
    pub code: WarningCode,
    pub message: String,
}

impl Warning {
    pub fn new(level: WarningLevel, code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            level,
            code,
            message: message.into(),
        }
    }

    pub fn info(code: WarningCode, message: impl Into<String>) -> Self {
        Self::new(WarningLevel::Info, code, message)
    }

    pub fn recommend(code: WarningCode, message: impl Into<String>) -> Self {
        Self::new(WarningLevel::Recommendation, code, message)
    }

    pub fn warn(code: WarningCode, message: impl Into<String>) -> Self {
        Self::new(WarningLevel::Warning, code, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warning_serializes_codes_as_snake_case() {
        let warning = Warning::warn(WarningCode::AddOnSuppressed, "premium_support dropped");
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["level"], "warning");
        assert_eq!(json["code"], "add_on_suppressed");
        assert_eq!(WarningCode::HighProdOvercommit.to_string(), "high_prod_overcommit");
    }

    #[test]
    fn test_levels_order_by_severity() {
        assert!(WarningLevel::Info < WarningLevel::Recommendation);
        assert!(WarningLevel::Recommendation < WarningLevel::Warning);
    }
}
