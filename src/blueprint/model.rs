use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Service,
    Database,
    Gateway,
    Queue,
    Cache,
    Client,
}

impl NodeKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Service => "service",
            Self::Database => "database",
            Self::Gateway => "gateway",
            Self::Queue => "queue",
            Self::Cache => "cache",
            Self::Client => "client",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    Optimal,
    Warning,
    Critical,
}

impl NodeStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Optimal => "optimal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: NodeKind,
    #[serde(default)]
    pub tech: String,
    pub status: NodeStatus,
    #[serde(default)]
    pub details: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub protocol: String,
    /// Milliseconds; negative or non-finite values are clamped to zero on parse.
    #[serde(default)]
    pub latency: f32,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct SecurityFinding {
    #[serde(default)]
    pub severity: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct SecurityReport {
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, alias = "vulnerabilities")]
    pub findings: Vec<SecurityFinding>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blueprint {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
    /// Identity of one analysis run. Filled in by the parser when absent.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub metrics: BTreeMap<String, Value>,
    #[serde(default)]
    pub security_report: Option<SecurityReport>,
}

impl Blueprint {
    pub fn identity(&self) -> i64 {
        self.timestamp.unwrap_or_default()
    }

    pub fn tech_values(&self) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|node| !node.tech.is_empty())
            .map(|node| node.tech.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn node(&self, id: &str) -> Option<&GraphNode> {
        self.nodes.iter().rev().find(|node| node.id == id)
    }

    pub fn edges_touching<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a GraphEdge> + 'a {
        self.edges
            .iter()
            .filter(move |edge| edge.source == id || edge.target == id)
    }
}
