//! Estimator Domain
//!
//! Pure sizing, tiered-pricing and growth-projection engine for Kubernetes,
//! VM and low-code platform TCO estimates. No I/O, no global state: every
//! entry point takes plain data and returns a fresh result.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │ EstimatorService │  ← Facade: size → price → project → review
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐     ┌────────────────┐
//! │  compute_sizing  │────►│ project_growth │  ← Year-by-year demand / cost
//! └────────┬─────────┘     └───────▲────────┘
//!          │                       │
//! ┌────────▼─────────┐             │
//! │ compute_pricing  │─────────────┘  ← Brackets, add-ons, discount, totals
//! └────────┬─────────┘
//!          │
//! ┌────────▼─────────┐
//! │ Tables & Models  │  ← Tier catalogue, distribution profiles, pricing tables
//! └──────────────────┘
//! ```

pub mod addons;
pub mod brackets;
pub mod catalogue;
pub mod discount;
pub mod error;
pub mod growth;
pub mod ha_dr;
pub mod models;
pub mod pricing;
pub mod review;
pub mod service;
pub mod sizing;
pub mod tables;
pub mod warnings;
pub mod workload;

// Re-export commonly used types
pub use addons::{AddOnDefinition, AddOnPricing, AddOnSelection, Eligibility, TierBasis};
pub use brackets::{BracketPrice, BracketResolution, TierBracket, resolve_bracket, validate_brackets};
pub use catalogue::{Distribution, DistributionProfile, NodeSpecs, Runtime, TierCatalogue, TierFootprint};
pub use discount::{Discount, DiscountKind, DiscountScope, Subtotals, Totals, apply_discount};
pub use error::{EstimatorError, EstimatorResult};
pub use growth::{
    CapacityResource, CapacityWarning, CostSnapshot, GrowthConfig, GrowthPattern, ProjectionHorizon,
    SizingSnapshot, YearProjection, project_growth,
};
pub use ha_dr::{BackupConfig, BackupStrategy, ControlPlaneHa, DrPattern, HaDrConfig, NodeDistribution};
pub use models::{
    AppCount, CloudProvider, Currency, EnvironmentClass, EnvironmentKind, Hosting, Money, NodeCounts,
    NodeRole, NodeRoleSpec, ResourceTotals, SizeTier,
};
pub use pricing::{
    CostCategory, DeploymentConfig, LineItem, LineItemStatus, PricingResult, ServiceSelection,
    compute_pricing,
};
pub use review::{ReviewContext, review};
pub use service::{EstimateReport, EstimateRequest, EstimatorService};
pub use sizing::{EnvironmentSizing, ResourceDemand, SizingResult, compute_sizing};
pub use tables::{PricingTables, ServiceRate};
pub use warnings::{Warning, WarningCode, WarningLevel};
pub use workload::{EnvironmentWorkload, OvercommitConfig, OvercommitRatios, WorkloadConfig};
