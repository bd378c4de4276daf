use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tracing::{debug, info};

use super::model::Blueprint;
use super::parse::parse_blueprint;

pub fn load_blueprint(path: &Path) -> Result<Blueprint> {
    debug!(path = %path.display(), "reading blueprint");
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read blueprint file {}", path.display()))?;

    let loaded_at = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default();

    let blueprint = parse_blueprint(&raw, loaded_at)
        .with_context(|| format!("failed to parse blueprint file {}", path.display()))?;

    info!(
        path = %path.display(),
        nodes = blueprint.nodes.len(),
        edges = blueprint.edges.len(),
        timestamp = blueprint.identity(),
        "blueprint loaded"
    );
    Ok(blueprint)
}
