use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::catalogue::NodeSpecs;
use crate::error::EstimatorResult;
use crate::growth::{GrowthConfig, YearProjection, project_growth};
use crate::ha_dr::HaDrConfig;
use crate::pricing::{DeploymentConfig, PricingResult, compute_pricing};
use crate::review::{ReviewContext, review};
use crate::sizing::{SizingResult, compute_sizing};
use crate::tables::PricingTables;
use crate::warnings::Warning;
use crate::workload::{OvercommitConfig, WorkloadConfig};

/// Everything needed for a full estimate
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimateRequest {
    pub workload: WorkloadConfig,
    pub node_specs: NodeSpecs,
    pub overcommit: OvercommitConfig,
    pub ha_dr: HaDrConfig,
    pub deployment: DeploymentConfig,
    pub growth: Option<GrowthConfig>,
}

/// Sizing, pricing and projections of one request, plus every warning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimateReport {
    pub sizing: SizingResult,
    pub pricing: PricingResult,
    pub projections: Vec<YearProjection>,
    pub warnings: Vec<Warning>,
}

/// Estimator facade over a fixed set of pricing tables.
///
/// Holds no state besides the tables, so one instance can serve concurrent
/// callers.
#[derive(Debug, Clone)]
pub struct EstimatorService {
    tables: PricingTables,
}

impl EstimatorService {
    /// Create a service, rejecting malformed tables up front
    pub fn new(tables: PricingTables) -> EstimatorResult<Self> {
        tables.validate()?;
        Ok(Self { tables })
    }

    pub fn tables(&self) -> &PricingTables {
        &self.tables
    }

    pub fn size(&self, request: &EstimateRequest) -> EstimatorResult<SizingResult> {
        compute_sizing(
            &request.workload,
            &request.node_specs,
            &request.overcommit,
            &request.ha_dr,
        )
    }

    pub fn price(&self, sizing: &SizingResult, deployment: &DeploymentConfig) -> EstimatorResult<PricingResult> {
        compute_pricing(sizing, deployment, &self.tables)
    }

    pub fn project(
        &self,
        sizing: &SizingResult,
        pricing: &PricingResult,
        growth: &GrowthConfig,
    ) -> EstimatorResult<Vec<YearProjection>> {
        project_growth(sizing, pricing, growth)
    }

    /// Run sizing, pricing, optional projection and the review rules.
    #[instrument(skip_all, fields(distribution = %request.workload.distribution))]
    pub fn estimate(&self, request: &EstimateRequest) -> EstimatorResult<EstimateReport> {
        // Validate growth before doing any work
        if let Some(growth) = &request.growth {
            growth.validate_config()?;
        }

        let sizing = self.size(request)?;
        let pricing = self.price(&sizing, &request.deployment)?;
        let projections = match &request.growth {
            Some(growth) => self.project(&sizing, &pricing, growth)?,
            None => Vec::new(),
        };

        let mut warnings = pricing.warnings.clone();
        warnings.extend(review(&ReviewContext {
            workload: &request.workload,
            overcommit: &request.overcommit,
            ha_dr: &request.ha_dr,
            deployment: &request.deployment,
        }));

        info!(
            nodes = sizing.total_nodes(),
            net = %pricing.totals.net,
            years = projections.len(),
            warnings = warnings.len(),
            "Estimate complete"
        );

        Ok(EstimateReport {
            sizing,
            pricing,
            projections,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EstimatorError;
    use crate::growth::GrowthPattern;
    use crate::models::{AppCount, EnvironmentKind};
    use crate::warnings::WarningCode;
    use crate::workload::EnvironmentWorkload;

    fn request() -> EstimateRequest {
        EstimateRequest {
            workload: WorkloadConfig::default()
                .with_environment(
                    EnvironmentKind::Dev,
                    EnvironmentWorkload::new(AppCount::new(10, 5, 0, 0)),
                )
                .with_environment(
                    EnvironmentKind::Prod,
                    EnvironmentWorkload::new(AppCount::new(20, 10, 4, 1)),
                ),
            deployment: DeploymentConfig {
                application_objects: 450,
                ..Default::default()
            },
            growth: Some(GrowthConfig::default()),
            ..Default::default()
        }
    }

    #[test]
    fn test_estimate_combines_all_stages() {
        let service = EstimatorService::new(PricingTables::standard()).unwrap();
        let report = service.estimate(&request()).unwrap();

        assert_eq!(report.sizing.environments.len(), 2);
        assert_eq!(report.projections.len(), 3);
        assert!(report.pricing.totals.net > crate::models::Money::ZERO);
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.code == WarningCode::CloudInfrastructureIncluded)
        );
        assert!(
            report
                .warnings
                .iter()
                .any(|w| w.code == WarningCode::SingleZoneProduction)
        );
    }

    #[test]
    fn test_cloud_hosting_notes_do_not_repeat_each_other() {
        let service = EstimatorService::new(PricingTables::standard()).unwrap();
        let report = service.estimate(&request()).unwrap();

        let message = |code| {
            let matching: Vec<_> = report.warnings.iter().filter(|w| w.code == code).collect();
            assert_eq!(matching.len(), 1, "{code}");
            matching[0].message.clone()
        };
        let infrastructure = message(WarningCode::CloudInfrastructureIncluded);
        let distribution = message(WarningCode::CloudHostingSelfManagedDistribution);

        assert_ne!(infrastructure, distribution);
        assert!(infrastructure.contains("not priced"));
        assert!(!distribution.contains("priced"));
        assert!(distribution.starts_with("Upstream Kubernetes"));
    }

    #[test]
    fn test_estimate_is_deterministic() {
        let service = EstimatorService::new(PricingTables::standard()).unwrap();
        let first = service.estimate(&request()).unwrap();
        let second = service.estimate(&request()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_growth_stops_the_estimate() {
        let service = EstimatorService::new(PricingTables::standard()).unwrap();
        let mut request = request();
        request.growth = Some(GrowthConfig {
            pattern: GrowthPattern::Custom { rates: vec![5.0] },
            ..Default::default()
        });
        let err = service.estimate(&request).unwrap_err();
        assert_eq!(err.field(), Some("growth.pattern.rates"));
    }

    #[test]
    fn test_malformed_tables_are_rejected() {
        let mut tables = PricingTables::standard();
        tables.license.ao_pack_size = 0;
        assert!(matches!(
            EstimatorService::new(tables),
            Err(EstimatorError::InvalidPricingTable { .. })
        ));
    }

    #[test]
    fn test_request_deserializes_from_partial_json() {
        let request: EstimateRequest = serde_json::from_str(
            r#"{
                "workload": {
                    "distribution": "openshift",
                    "environments": {"prod": {"apps": {"small": 2, "medium": 2, "large": 1}}}
                },
                "deployment": {"hosting": "self_managed", "application_objects": 300},
                "growth": {"years": 5, "pattern": {"kind": "s_curve"}}
            }"#,
        )
        .unwrap();

        assert_eq!(request.workload.total_applications(), 5);
        assert_eq!(request.deployment.region, "us-east");
        assert_eq!(request.growth.unwrap().years.years(), 5);
    }
}
