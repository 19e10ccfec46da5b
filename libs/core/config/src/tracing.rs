use crate::Environment;
use ::tracing::debug;
use tracing_subscriber::{EnvFilter, prelude::*};

/// Install color-eyre with the project-standard configuration.
///
/// Call early in `main()`, before any fallible work. Safe to call more
/// than once; later calls are ignored.
pub fn install_color_eyre() {
    let _ = color_eyre::config::HookBuilder::default()
        .display_location_section(true)
        .display_env_section(false)
        .install();
}

/// Default filter directive when `RUST_LOG` is unset
pub fn default_directive(environment: &Environment) -> &'static str {
    if environment.is_production() {
        "warn"
    } else {
        "info"
    }
}

/// Initialize tracing with environment-aware formatting and span capture.
///
/// All output goes to stderr so stdout stays reserved for reports.
///
/// - **Production** (`APP_ENV=production`): JSON lines, no module targets
/// - **Development** (default): pretty, human-readable events
///
/// `RUST_LOG` overrides the level (e.g. `domain_estimator=debug`).
/// Repeated calls are no-ops, which keeps tests that share a process happy.
pub fn init_tracing(environment: &Environment) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(environment)));

    let result = if environment.is_production() {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .flatten_event(true),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_file(false)
                    .with_line_number(false)
                    .pretty(),
            )
            .with(tracing_error::ErrorLayer::default())
            .with(filter)
            .try_init()
    };

    match result {
        Ok(()) => debug!(?environment, "tracing initialized"),
        Err(_) => debug!("tracing already initialized, skipping"),
    }
}
