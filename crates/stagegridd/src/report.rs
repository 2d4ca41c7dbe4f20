//! Config loading and the JSON reports printed by `check` and `solve`.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde_json::{Value, json};

use stagegrid_alloc::build_strategy;
use stagegrid_core::{StageCatalog, StageGridConfig};

/// Load and validate `stagegrid.toml`, then build its stage catalog.
pub fn load(path: &Path) -> anyhow::Result<(StageGridConfig, Arc<StageCatalog>)> {
    let config = StageGridConfig::from_file(path)
        .with_context(|| format!("loading {}", path.display()))?;
    config.validate()?;
    let catalog = Arc::new(config.catalog()?);
    Ok((config, catalog))
}

/// Effective strategy, cadence, tuning and catalog.
pub fn check_report(config: &StageGridConfig, catalog: &StageCatalog) -> anyhow::Result<Value> {
    Ok(json!({
        "strategy": config.control.strategy.as_str(),
        "cadence_ms": config.cadence()?.as_millis() as u64,
        "tuning": config.tuning,
        "stages": catalog.stages(),
        "ceiling": catalog.ceiling(),
    }))
}

/// One application of the configured strategy.
pub fn solve_report(
    config: &StageGridConfig,
    catalog: Arc<StageCatalog>,
    target: f64,
    previous: f64,
) -> Value {
    let strategy = build_strategy(config.control.strategy, catalog.clone(), &config.tuning);
    let residual = strategy.residual_target(target, previous);
    let allocation = strategy.compute_allocation(target, previous);
    json!({
        "strategy": strategy.name(),
        "target": target,
        "previous": previous,
        "residual": residual,
        "stages": catalog.stages().iter().map(|s| s.value).collect::<Vec<_>>(),
        "quantities": allocation.quantities(),
        "achieved": allocation.achieved(&catalog),
        "modeled_output": allocation.modeled_output(&catalog),
    })
}
