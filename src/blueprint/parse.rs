use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;

use super::model::Blueprint;

const WRAPPER_KEYS: [&str; 2] = ["blueprint", "result"];

/// Parses a blueprint document. Accepts either the bare record or a history
/// entry that nests it under `blueprint` / `result`.
pub(super) fn parse_blueprint(raw: &str, fallback_timestamp: i64) -> Result<Blueprint> {
    let parsed: Value = serde_json::from_str(raw).context("invalid blueprint JSON")?;
    let object = parsed
        .as_object()
        .ok_or_else(|| anyhow!("unexpected JSON type for blueprint; expected an object"))?;

    let outer_timestamp = object.get("timestamp").and_then(Value::as_i64);
    let body = WRAPPER_KEYS
        .iter()
        .find_map(|key| object.get(*key).filter(|value| value.is_object()))
        .unwrap_or(&parsed);

    let mut blueprint =
        Blueprint::deserialize(body).context("blueprint does not match the expected shape")?;

    if blueprint.timestamp.is_none() {
        blueprint.timestamp = Some(outer_timestamp.unwrap_or(fallback_timestamp));
    }

    for edge in &mut blueprint.edges {
        if !edge.latency.is_finite() || edge.latency < 0.0 {
            edge.latency = 0.0;
        }
    }

    Ok(blueprint)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blueprint::{NodeKind, NodeStatus};

    const SAMPLE: &str = r#"{
        "nodes": [
            {"id": "web", "label": "Web", "type": "client", "tech": "React", "status": "optimal"},
            {"id": "api", "label": "API", "type": "gateway", "tech": "Envoy", "status": "warning",
             "details": "rate limited"}
        ],
        "edges": [
            {"source": "web", "target": "api", "protocol": "HTTPS", "latency": 42},
            {"source": "api", "target": "ghost", "protocol": "gRPC", "latency": -5}
        ],
        "metrics": {"throughput": 1200},
        "securityReport": {"score": 72, "vulnerabilities": [
            {"severity": "high", "title": "Open admin port"}
        ]}
    }"#;

    #[test]
    fn parses_bare_record_and_fills_timestamp() {
        let blueprint = parse_blueprint(SAMPLE, 99).expect("sample parses");

        assert_eq!(blueprint.timestamp, Some(99));
        assert_eq!(blueprint.nodes.len(), 2);
        assert_eq!(blueprint.nodes[0].kind, NodeKind::Client);
        assert_eq!(blueprint.nodes[1].status, NodeStatus::Warning);
        assert_eq!(blueprint.nodes[1].details.as_deref(), Some("rate limited"));
        assert_eq!(blueprint.edges[1].latency, 0.0);
        assert!(blueprint.metrics.contains_key("throughput"));

        let report = blueprint.security_report.expect("report present");
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].severity, "high");
    }

    #[test]
    fn unwraps_history_entries() {
        let raw = format!(r#"{{"id": "run-1", "timestamp": 1700, "blueprint": {SAMPLE}}}"#);
        let blueprint = parse_blueprint(&raw, 5).expect("wrapped sample parses");

        assert_eq!(blueprint.timestamp, Some(1700));
        assert_eq!(blueprint.nodes.len(), 2);
    }

    #[test]
    fn explicit_timestamp_wins_over_fallback() {
        let raw = r#"{"nodes": [], "edges": [], "timestamp": 12}"#;
        let blueprint = parse_blueprint(raw, 99).expect("parses");

        assert_eq!(blueprint.identity(), 12);
    }

    #[test]
    fn rejects_non_object_documents() {
        assert!(parse_blueprint("[1, 2, 3]", 0).is_err());
        assert!(parse_blueprint("not json", 0).is_err());
    }
}
