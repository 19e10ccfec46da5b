//! Report rendering: JSON envelope and plain-text summary

use chrono::{DateTime, Utc};
use domain_estimator::{DrPattern, EstimateReport, SizingResult};
use serde::Serialize;
use std::fmt::Write;

/// Engine output stamped with the time it was produced
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub body: &'a T,
}

impl<'a, T: Serialize> Envelope<'a, T> {
    pub fn new(body: &'a T, generated_at: DateTime<Utc>) -> Self {
        Self { generated_at, body }
    }
}

pub fn to_json<T: Serialize>(value: &T, pretty: bool) -> serde_json::Result<String> {
    if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
}

fn write_sizing(out: &mut String, sizing: &SizingResult) -> std::fmt::Result {
    writeln!(
        out,
        "Sizing ({} on {}, {} cluster(s))",
        sizing.distribution, sizing.runtime, sizing.clusters
    )?;
    for env in &sizing.environments {
        writeln!(
            out,
            "  {:<8} {:>4} apps  {:>7.1} vCPU  {:>8.1} GB  nodes cp={} worker={} infra={}",
            env.environment.to_string(),
            env.applications,
            env.effective.cpu_cores,
            env.effective.ram_gb,
            env.nodes.control_plane,
            env.nodes.worker,
            env.nodes.infra,
        )?;
    }
    writeln!(
        out,
        "  total    {:>4} nodes {:>7.1} vCPU  {:>8.1} GB capacity",
        sizing.total_nodes(),
        sizing.capacity.cpu_cores,
        sizing.capacity.ram_gb,
    )?;
    if sizing.backup_storage_gb > 0.0 {
        writeln!(out, "  backup storage {:.0} GB", sizing.backup_storage_gb)?;
    }
    if sizing.dr_pattern != DrPattern::None {
        write!(
            out,
            "  DR {}: x{:.2} production capacity",
            sizing.dr_pattern, sizing.dr_cost_multiplier
        )?;
        match sizing.rto_minutes {
            Some(rto) => writeln!(out, ", RTO {rto} min")?,
            None => writeln!(out)?,
        }
    }
    Ok(())
}

/// Render a sizing result on its own
pub fn render_sizing(sizing: &SizingResult, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Generated {}", generated_at.to_rfc3339());
    let _ = write_sizing(&mut out, sizing);
    out
}

fn write_report(out: &mut String, report: &EstimateReport) -> std::fmt::Result {
    write_sizing(out, &report.sizing)?;

    let pricing = &report.pricing;
    writeln!(
        out,
        "\nPricing ({} hosting, {}, {} AO pack(s), {})",
        pricing.hosting, pricing.region, pricing.ao_packs, pricing.currency
    )?;
    for (label, amount) in [
        ("license", pricing.subtotals.license),
        ("add-ons", pricing.subtotals.add_ons),
        ("services", pricing.subtotals.services),
        ("infrastructure", pricing.subtotals.infrastructure),
    ] {
        writeln!(out, "  {:<16}{:>14}", label, amount.to_string())?;
    }
    if !pricing.discount.amount.is_zero() {
        write!(out, "  {:<16}{:>14}", "discount", format!("-{}", pricing.discount.amount))?;
        match &pricing.discount.description {
            Some(description) => writeln!(out, "  ({description})")?,
            None => writeln!(out)?,
        }
    }
    let totals = &pricing.totals;
    writeln!(out, "  {:<16}{:>14}", "net / year", totals.net.to_string())?;
    writeln!(out, "  {:<16}{:>14}", "per month", totals.per_month.to_string())?;
    writeln!(out, "  {:<16}{:>14}", "3 years", totals.three_year.to_string())?;
    writeln!(out, "  {:<16}{:>14}", "5 years", totals.five_year.to_string())?;

    if !report.projections.is_empty() {
        writeln!(out, "\nGrowth")?;
        for year in &report.projections {
            write!(
                out,
                "  year {}  x{:.3}  {:>7.1} vCPU  {:>3} workers",
                year.year,
                year.growth_factor,
                year.sizing.effective_cpu_cores,
                year.sizing.worker_nodes_required,
            )?;
            if let Some(cost) = &year.cost {
                write!(out, "  net {}", cost.net)?;
            }
            if !year.capacity_warnings.is_empty() {
                write!(out, "  ({} capacity warning(s))", year.capacity_warnings.len())?;
            }
            writeln!(out)?;
        }
    }

    if !report.warnings.is_empty() {
        writeln!(out, "\nWarnings")?;
        for warning in &report.warnings {
            writeln!(out, "  [{}] {}", warning.level, warning.message)?;
        }
    }
    Ok(())
}

/// Render a full estimate as a plain-text overview
pub fn render_summary(report: &EstimateReport, generated_at: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Generated {}", generated_at.to_rfc3339());
    // Writing into a String cannot fail.
    let _ = write_report(&mut out, report);
    out
}
