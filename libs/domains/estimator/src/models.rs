use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};
use strum::{Display, EnumIter, EnumString};
use validator::Validate;

/// Cloud provider behind a managed distribution
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

/// Where the platform runs: vendor cloud subscription or customer-managed
/// infrastructure
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Hosting {
    #[default]
    Cloud,
    SelfManaged,
}

/// Currency enumeration
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Usd,
    Eur,
    Gbp,
}

/// Money amount held in the smallest currency unit (cents).
///
/// Serialized as a decimal number of currency units so pricing tables stay
/// human-editable (`18150.0` is stored as `1_815_000` cents). The currency
/// itself lives on the pricing tables and is echoed into every result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Money {
    pub amount: i64,
}

impl Money {
    pub const ZERO: Money = Money { amount: 0 };

    pub const fn from_cents(amount: i64) -> Self {
        Self { amount }
    }

    /// Create Money from a decimal value (e.g., 1.99)
    pub fn from_decimal(value: f64) -> Self {
        Self {
            amount: (value * 100.0).round() as i64,
        }
    }

    /// Convert to decimal value
    pub fn to_decimal(self) -> f64 {
        self.amount as f64 / 100.0
    }

    /// Multiply by an integer quantity
    pub fn times(self, quantity: u64) -> Self {
        Self {
            amount: self.amount.saturating_mul(i64::try_from(quantity).unwrap_or(i64::MAX)),
        }
    }

    /// Multiply by a fraction, rounding half away from zero to the cent
    pub fn scale(self, factor: f64) -> Self {
        Self {
            amount: (self.amount as f64 * factor).round() as i64,
        }
    }

    /// Divide evenly, rounding to the nearest cent
    pub fn divide(self, parts: u32) -> Self {
        self.scale(1.0 / f64::from(parts.max(1)))
    }

    pub fn is_zero(self) -> bool {
        self.amount == 0
    }
}

impl From<f64> for Money {
    fn from(value: f64) -> Self {
        Self::from_decimal(value)
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> Self {
        money.to_decimal()
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money::from_cents(self.amount.saturating_add(rhs.amount))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        *self = *self + rhs;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money::from_cents(self.amount.saturating_sub(rhs.amount))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Money {
        iter.copied().sum()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Application size tier
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SizeTier {
    Small,
    Medium,
    Large,
    #[serde(rename = "xlarge")]
    #[strum(serialize = "xlarge")]
    XLarge,
}

/// Deployment environment a workload runs in
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnvironmentKind {
    Dev,
    Test,
    Stage,
    Prod,
    Dr,
    SharedNamespace,
}

impl EnvironmentKind {
    /// Prod and DR are sized with production specs, ratios and HA spread
    pub fn class(self) -> EnvironmentClass {
        match self {
            EnvironmentKind::Prod | EnvironmentKind::Dr => EnvironmentClass::Prod,
            _ => EnvironmentClass::NonProd,
        }
    }
}

/// Production / non-production bucket used for specs and overcommit
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EnvironmentClass {
    Prod,
    NonProd,
}

/// Node role inside a cluster
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeRole {
    ControlPlane,
    Worker,
    Infra,
}

/// Number of applications per size tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppCount {
    pub small: u32,
    pub medium: u32,
    pub large: u32,
    pub xlarge: u32,
}

impl AppCount {
    pub fn new(small: u32, medium: u32, large: u32, xlarge: u32) -> Self {
        Self {
            small,
            medium,
            large,
            xlarge,
        }
    }

    pub fn get(&self, tier: SizeTier) -> u32 {
        match tier {
            SizeTier::Small => self.small,
            SizeTier::Medium => self.medium,
            SizeTier::Large => self.large,
            SizeTier::XLarge => self.xlarge,
        }
    }

    pub fn set(&mut self, tier: SizeTier, count: u32) {
        match tier {
            SizeTier::Small => self.small = count,
            SizeTier::Medium => self.medium = count,
            SizeTier::Large => self.large = count,
            SizeTier::XLarge => self.xlarge = count,
        }
    }

    /// Saturates at `u32::MAX`
    pub fn total(&self) -> u32 {
        self.small
            .saturating_add(self.medium)
            .saturating_add(self.large)
            .saturating_add(self.xlarge)
    }
}

/// CPU / RAM / disk footprint of a node role
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, Validate)]
pub struct NodeRoleSpec {
    #[validate(range(min = 0.0, message = "CPU cores cannot be negative"))]
    pub cpu_cores: f64,
    #[validate(range(min = 0.0, message = "RAM cannot be negative"))]
    pub ram_gb: f64,
    #[validate(range(min = 0.0, message = "disk cannot be negative"))]
    pub disk_gb: f64,
}

impl NodeRoleSpec {
    pub const fn new(cpu_cores: f64, ram_gb: f64, disk_gb: f64) -> Self {
        Self {
            cpu_cores,
            ram_gb,
            disk_gb,
        }
    }
}

/// Node counts by role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeCounts {
    pub control_plane: u32,
    pub worker: u32,
    pub infra: u32,
}

impl NodeCounts {
    pub fn total(&self) -> u32 {
        self.control_plane
            .saturating_add(self.worker)
            .saturating_add(self.infra)
    }

    pub fn get(&self, role: NodeRole) -> u32 {
        match role {
            NodeRole::ControlPlane => self.control_plane,
            NodeRole::Worker => self.worker,
            NodeRole::Infra => self.infra,
        }
    }
}

impl Add for NodeCounts {
    type Output = NodeCounts;

    fn add(self, rhs: NodeCounts) -> NodeCounts {
        NodeCounts {
            control_plane: self.control_plane.saturating_add(rhs.control_plane),
            worker: self.worker.saturating_add(rhs.worker),
            infra: self.infra.saturating_add(rhs.infra),
        }
    }
}

/// Aggregated CPU / RAM / disk
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceTotals {
    pub cpu_cores: f64,
    pub ram_gb: f64,
    pub disk_gb: f64,
}

impl ResourceTotals {
    /// Provisioned resources of `count` nodes with the given spec
    pub fn of_nodes(spec: &NodeRoleSpec, count: u32) -> Self {
        let count = f64::from(count);
        Self {
            cpu_cores: spec.cpu_cores * count,
            ram_gb: spec.ram_gb * count,
            disk_gb: spec.disk_gb * count,
        }
    }
}

impl Add for ResourceTotals {
    type Output = ResourceTotals;

    fn add(self, rhs: ResourceTotals) -> ResourceTotals {
        ResourceTotals {
            cpu_cores: self.cpu_cores + rhs.cpu_cores,
            ram_gb: self.ram_gb + rhs.ram_gb,
            disk_gb: self.disk_gb + rhs.disk_gb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_money_decimal_conversion() {
        let money = Money::from_decimal(18_150.0);
        assert_eq!(money.amount, 1_815_000);
        assert_eq!(money.to_decimal(), 18_150.0);
        assert_eq!(money.to_string(), "18150.00");
        assert_eq!(Money::from_cents(-1_05).to_string(), "-1.05");
    }

    #[test]
    fn test_money_scale_rounds_half_away_from_zero() {
        assert_eq!(Money::from_cents(5).scale(0.5), Money::from_cents(3));
        assert_eq!(Money::from_cents(100).scale(0.333), Money::from_cents(33));
        assert_eq!(Money::from_cents(1_200).divide(12), Money::from_cents(100));
    }

    #[test]
    fn test_money_serializes_as_decimal() {
        let money = Money::from_decimal(60_500.25);
        let json = serde_json::to_string(&money).unwrap();
        assert_eq!(json, "60500.25");

        let back: Money = serde_json::from_str("121000").unwrap();
        assert_eq!(back, Money::from_decimal(121_000.0));
    }

    #[test]
    fn test_environment_class() {
        assert_eq!(EnvironmentKind::Prod.class(), EnvironmentClass::Prod);
        assert_eq!(EnvironmentKind::Dr.class(), EnvironmentClass::Prod);
        assert_eq!(EnvironmentKind::Stage.class(), EnvironmentClass::NonProd);
        assert_eq!(
            EnvironmentKind::SharedNamespace.class(),
            EnvironmentClass::NonProd
        );
    }

    #[test]
    fn test_app_count_accessors() {
        let mut apps = AppCount::new(2, 2, 1, 0);
        assert_eq!(apps.total(), 5);
        apps.set(SizeTier::XLarge, 3);
        assert_eq!(apps.get(SizeTier::XLarge), 3);
        assert_eq!(apps.total(), 8);
    }

    #[test]
    fn test_counts_saturate_instead_of_overflowing() {
        let apps = AppCount::new(3_000_000_000, 3_000_000_000, 0, 0);
        assert_eq!(apps.total(), u32::MAX);

        let nodes = NodeCounts {
            control_plane: 3,
            worker: u32::MAX - 1,
            infra: 2,
        };
        assert_eq!(nodes.total(), u32::MAX);
        assert_eq!((nodes + nodes).worker, u32::MAX);
        assert_eq!(
            Money::from_cents(100).times(u64::MAX),
            Money::from_cents(i64::MAX)
        );
    }

    #[test]
    fn test_hosting_round_trips_snake_case() {
        assert_eq!(Hosting::SelfManaged.to_string(), "self_managed");
        assert_eq!("cloud".parse::<Hosting>().unwrap(), Hosting::Cloud);
    }

    #[test]
    fn test_size_tier_parses_xlarge() {
        assert_eq!("xlarge".parse::<SizeTier>().unwrap(), SizeTier::XLarge);
        assert_eq!(SizeTier::XLarge.to_string(), "xlarge");
    }
}
