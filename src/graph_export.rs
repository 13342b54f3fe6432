//! Graph export of compiled factories for visualization and debugging.
//!
//! [`GraphBuilder`] turns a set of [`FactoryUnit`]s into a
//! [`DependencyGraph`]: one node per class, one edge per binding,
//! provider, dependency, lazy dependency or aspect relation. The graph
//! exports as DOT, Mermaid, JSON and, with the `graph-export` feature,
//! YAML.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;

use crate::compiler::{CompilationOutput, EdgeKind, FactoryUnit, UnitBody};
use crate::error::{DiError, DiResult};
use crate::key::ClassName;
use crate::lifetime::Lifetime;

/// A class in the dependency graph.
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    /// Identifier safe for DOT and Mermaid
    pub id: String,
    pub class: String,
    /// `Transient`, `Singleton`, `Service`, or empty when the unit does not build
    pub lifetime: String,
    /// `build`, `alias`, `provider`, `reflective`, or `external` for classes
    /// referenced but not compiled
    pub unit: String,
    pub dependencies: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// A relation between two classes.
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
    /// Parameter, `$property` or `method.parameter` the edge comes from
    pub label: String,
}

/// Complete dependency graph of a compilation.
#[derive(Debug, Clone, Serialize)]
pub struct DependencyGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
    pub metadata: GraphMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct GraphMetadata {
    pub unit_count: usize,
    pub singleton_count: usize,
    pub service_count: usize,
    pub transient_count: usize,
    pub external_count: usize,
    /// Cycles through lazy edges; eager cycles never compile
    pub has_cycles: bool,
    pub exported_at: String,
    pub version: String,
}

/// Graph export configuration options.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Include edges from method parameters and aspects
    pub include_methods: bool,
    /// Include classes referenced by edges but not compiled
    pub include_external: bool,
    /// Restrict nodes to these classes (empty = all)
    pub class_filter: HashSet<String>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_methods: true,
            include_external: true,
            class_filter: HashSet::new(),
        }
    }
}

/// Export formats supported for dependency graphs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    /// Requires the `graph-export` feature
    Yaml,
    /// Graphviz
    Dot,
    Mermaid,
}

/// Renders a [`DependencyGraph`] in some format.
pub trait GraphExporter {
    fn export(&self, graph: &DependencyGraph, format: ExportFormat, options: &ExportOptions) -> DiResult<String>;
}

/// Exporter for the built-in formats.
#[derive(Debug, Default)]
pub struct DefaultGraphExporter;

impl GraphExporter for DefaultGraphExporter {
    fn export(&self, graph: &DependencyGraph, format: ExportFormat, options: &ExportOptions) -> DiResult<String> {
        match format {
            ExportFormat::Json => Ok(serde_json::to_string_pretty(graph)?),
            ExportFormat::Yaml => self.export_yaml(graph),
            ExportFormat::Dot => Ok(self.export_dot(graph, options)),
            ExportFormat::Mermaid => Ok(self.export_mermaid(graph, options)),
        }
    }
}

impl DefaultGraphExporter {
    fn export_yaml(&self, graph: &DependencyGraph) -> DiResult<String> {
        #[cfg(feature = "graph-export")]
        {
            serde_yaml::to_string(graph).map_err(|e| DiError::Serialization(e.to_string()))
        }
        #[cfg(not(feature = "graph-export"))]
        {
            let _ = graph;
            Err(DiError::Serialization(
                "YAML export requires the `graph-export` feature".to_string(),
            ))
        }
    }

    fn export_dot(&self, graph: &DependencyGraph, options: &ExportOptions) -> String {
        let mut output = String::new();
        output.push_str("digraph DependencyGraph {\n");
        output.push_str("  rankdir=TB;\n");
        output.push_str("  node [shape=box];\n\n");

        let shown = visible(graph, options);
        for node in graph.nodes.iter().filter(|n| shown.contains(n.id.as_str())) {
            let shape = match node.unit.as_str() {
                "alias" | "provider" => "ellipse",
                "external" => "note",
                _ => "box",
            };
            let color = match node.lifetime.as_str() {
                "Singleton" => "lightblue",
                "Service" => "lightgreen",
                "Transient" => "lightyellow",
                _ => "white",
            };
            output.push_str(&format!(
                "  \"{}\" [label=\"{}\\n({})\", shape={}, fillcolor={}, style=filled];\n",
                node.id, node.class, node.unit, shape, color
            ));
        }

        output.push('\n');

        for edge in graph.edges.iter().filter(|e| shown_edge(e, &shown, options)) {
            let style = match edge.kind {
                EdgeKind::Lazy => "dashed",
                EdgeKind::Binding => "bold",
                EdgeKind::Aspect => "dotted",
                EdgeKind::Provider | EdgeKind::Dependency => "solid",
            };
            output.push_str(&format!(
                "  \"{}\" -> \"{}\" [style={}, label=\"{}\"];\n",
                edge.from, edge.to, style, edge.label
            ));
        }

        output.push_str("}\n");
        output
    }

    fn export_mermaid(&self, graph: &DependencyGraph, options: &ExportOptions) -> String {
        let mut output = String::new();
        output.push_str("graph TD\n");

        let shown = visible(graph, options);
        for node in graph.nodes.iter().filter(|n| shown.contains(n.id.as_str())) {
            let label = node.class.replace('"', "'");
            let shape = match node.unit.as_str() {
                "alias" | "provider" => format!("{}([\"{}\"])", node.id, label),
                _ => format!("{}[\"{}\"]", node.id, label),
            };
            output.push_str(&format!("  {}\n", shape));
        }

        for edge in graph.edges.iter().filter(|e| shown_edge(e, &shown, options)) {
            let arrow = match edge.kind {
                EdgeKind::Lazy | EdgeKind::Aspect => "-.->",
                EdgeKind::Binding => "==>",
                EdgeKind::Provider | EdgeKind::Dependency => "-->",
            };
            output.push_str(&format!("  {} {} {}\n", edge.from, arrow, edge.to));
        }

        output.push_str("\n  classDef singleton fill:#e1f5fe\n");
        output.push_str("  classDef service fill:#e8f5e8\n");
        output.push_str("  classDef transient fill:#fff3e0\n");

        for node in graph.nodes.iter().filter(|n| shown.contains(n.id.as_str())) {
            let class = match node.lifetime.as_str() {
                "Singleton" => "singleton",
                "Service" => "service",
                "Transient" => "transient",
                _ => continue,
            };
            output.push_str(&format!("  class {} {}\n", node.id, class));
        }

        output
    }
}

fn visible<'g>(graph: &'g DependencyGraph, options: &ExportOptions) -> HashSet<&'g str> {
    graph
        .nodes
        .iter()
        .filter(|n| options.include_external || n.unit != "external")
        .filter(|n| options.class_filter.is_empty() || options.class_filter.contains(&n.class))
        .map(|n| n.id.as_str())
        .collect()
}

fn shown_edge(edge: &GraphEdge, shown: &HashSet<&str>, options: &ExportOptions) -> bool {
    if !options.include_methods && (edge.kind == EdgeKind::Aspect || edge.label.contains('.')) {
        return false;
    }
    shown.contains(edge.from.as_str()) && shown.contains(edge.to.as_str())
}

/// Builds dependency graphs from compiled units.
pub struct GraphBuilder {
    options: ExportOptions,
    exporter: Box<dyn GraphExporter>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self {
            options: ExportOptions::default(),
            exporter: Box::new(DefaultGraphExporter),
        }
    }

    pub fn with_options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_exporter(mut self, exporter: Box<dyn GraphExporter>) -> Self {
        self.exporter = exporter;
        self
    }

    /// Graph of `units`, in their order; referenced classes without a unit
    /// are appended as external nodes.
    pub fn build_graph(&self, units: &[Arc<FactoryUnit>]) -> DependencyGraph {
        let mut nodes: Vec<GraphNode> = Vec::with_capacity(units.len());
        let mut ids: HashMap<ClassName, String> = HashMap::new();
        let mut counts: HashMap<Lifetime, usize> = HashMap::new();

        for unit in units {
            let id = format!("n{}", nodes.len());
            ids.insert(unit.class().clone(), id.clone());
            if let Some(lifetime) = unit.lifetime() {
                *counts.entry(lifetime).or_default() += 1;
            }

            let mut metadata = BTreeMap::new();
            if let UnitBody::Build(plan) = unit.body() {
                metadata.insert("method".to_string(), plan.method.clone());
            }
            if unit.proxy().is_some() {
                metadata.insert("proxy".to_string(), "true".to_string());
            }
            if unit.has_lazy_proxy() {
                metadata.insert("lazy".to_string(), "true".to_string());
            }
            let methods: Vec<&str> = unit.methods().map(|m| m.name.as_str()).collect();
            if !methods.is_empty() {
                metadata.insert("methods".to_string(), methods.join(","));
            }

            nodes.push(GraphNode {
                id,
                class: unit.class().to_string(),
                lifetime: unit.lifetime().map(|l| l.as_str().to_string()).unwrap_or_default(),
                unit: unit.body().kind().to_string(),
                dependencies: Vec::new(),
                metadata,
            });
        }

        let mut edges = Vec::new();
        let mut external = 0;
        for (index, unit) in units.iter().enumerate() {
            for edge in unit.edges() {
                let to = match ids.get(&edge.to) {
                    Some(id) => id.clone(),
                    None => {
                        let id = format!("n{}", nodes.len());
                        ids.insert(edge.to.clone(), id.clone());
                        external += 1;
                        nodes.push(GraphNode {
                            id: id.clone(),
                            class: edge.to.to_string(),
                            lifetime: String::new(),
                            unit: "external".to_string(),
                            dependencies: Vec::new(),
                            metadata: BTreeMap::new(),
                        });
                        id
                    }
                };
                let dependency = edge.to.to_string();
                if !nodes[index].dependencies.contains(&dependency) {
                    nodes[index].dependencies.push(dependency);
                }
                edges.push(GraphEdge {
                    from: nodes[index].id.clone(),
                    to,
                    kind: edge.kind,
                    label: edge.label,
                });
            }
        }

        let metadata = GraphMetadata {
            unit_count: units.len(),
            singleton_count: counts.get(&Lifetime::Singleton).copied().unwrap_or(0),
            service_count: counts.get(&Lifetime::Service).copied().unwrap_or(0),
            transient_count: counts.get(&Lifetime::Transient).copied().unwrap_or(0),
            external_count: external,
            has_cycles: has_cycles(&nodes, &edges),
            exported_at: exported_at(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        DependencyGraph { nodes, edges, metadata }
    }

    pub fn export(&self, graph: &DependencyGraph, format: ExportFormat) -> DiResult<String> {
        self.exporter.export(graph, format, &self.options)
    }

    pub fn build_and_export(&self, output: &CompilationOutput, format: ExportFormat) -> DiResult<String> {
        let graph = self.build_graph(&output.units);
        self.export(&graph, format)
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn exported_at() -> String {
    #[cfg(feature = "graph-export")]
    {
        chrono::Utc::now().to_rfc3339()
    }
    #[cfg(not(feature = "graph-export"))]
    {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string()
    }
}

/// Depth-first search for a back edge, ignoring aspect edges.
fn has_cycles(nodes: &[GraphNode], edges: &[GraphEdge]) -> bool {
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    for edge in edges.iter().filter(|e| e.kind != EdgeKind::Aspect) {
        adjacency.entry(edge.from.as_str()).or_default().push(edge.to.as_str());
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Open,
        Done,
    }
    let mut marks: HashMap<&str, Mark> = HashMap::new();

    fn visit<'a>(node: &'a str, adjacency: &HashMap<&'a str, Vec<&'a str>>, marks: &mut HashMap<&'a str, Mark>) -> bool {
        match marks.get(node) {
            Some(Mark::Open) => return true,
            Some(Mark::Done) => return false,
            None => {}
        }
        marks.insert(node, Mark::Open);
        for next in adjacency.get(node).into_iter().flatten() {
            if visit(next, adjacency, marks) {
                return true;
            }
        }
        marks.insert(node, Mark::Done);
        false
    }

    nodes.iter().any(|n| visit(n.id.as_str(), &adjacency, &mut marks))
}

/// Convenience functions for quick graph exports.
pub mod exports {
    use super::*;

    pub fn to_json(output: &CompilationOutput) -> DiResult<String> {
        GraphBuilder::new().build_and_export(output, ExportFormat::Json)
    }

    pub fn to_yaml(output: &CompilationOutput) -> DiResult<String> {
        GraphBuilder::new().build_and_export(output, ExportFormat::Yaml)
    }

    pub fn to_dot(output: &CompilationOutput) -> DiResult<String> {
        GraphBuilder::new().build_and_export(output, ExportFormat::Dot)
    }

    pub fn to_mermaid(output: &CompilationOutput) -> DiResult<String> {
        GraphBuilder::new().build_and_export(output, ExportFormat::Mermaid)
    }

    pub fn with_options(output: &CompilationOutput, format: ExportFormat, options: ExportOptions) -> DiResult<String> {
        GraphBuilder::new().with_options(options).build_and_export(output, format)
    }
}
