//! The downstream graph sink.
//!
//! [`Datapath`] is the narrow interface the builder drives: node creation,
//! edge insertion, and the registries (function names, array base
//! addresses, cross-call register mappings) that later scheduling passes
//! consult. [`SimDatapath`] is the standard implementation, keeping the
//! dependence structure in a petgraph [`DiGraph`] so downstream passes get
//! traversal and ordering algorithms for free.

use crate::microop::Microop;
use crate::types::{Addr, GraphNode, NodeId};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};

/// Edge parameter id marking a memory-order edge.
pub const MEMORY_EDGE: i32 = -1;

/// Sink interface the builder pushes the graph into.
pub trait Datapath {
    /// Create the node at `nid` and return it for attribute population.
    /// Node ids arrive densely in increasing order.
    fn insert_node(&mut self, nid: NodeId, microop: Microop) -> &mut GraphNode;

    /// Append a directed dependence edge. `par_id` is the consuming operand
    /// slot for register-flow edges, or [`MEMORY_EDGE`] for memory-order
    /// edges.
    fn add_dddg_edge(&mut self, source: NodeId, sink: NodeId, par_id: i32);

    /// Register a static function name. Idempotent.
    fn add_function_name(&mut self, name: &str);

    /// Register or refine the base address of a symbolic array.
    fn add_array_base_address(&mut self, label: &str, base: Addr);

    /// Record that a callee-side register receives a caller-side register's
    /// value across a call boundary.
    fn add_call_argument_mapping(&mut self, callee_reg: String, caller_reg: String);

    /// Look up an already-inserted node.
    fn node_from_node_id(&self, nid: NodeId) -> &GraphNode;

    /// Mutable lookup of an already-inserted node.
    fn node_from_node_id_mut(&mut self, nid: NodeId) -> &mut GraphNode;

    /// Whether loads/stores issue as soon as their data is ready. Ready
    /// mode suppresses DMA-load ordering edges.
    fn is_ready_mode(&self) -> bool;

    fn num_of_nodes(&self) -> usize;

    fn num_of_edges(&self) -> usize;
}

/// One dependence edge in snapshot form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub source: NodeId,
    pub sink: NodeId,
    /// Operand slot on the sink, or [`MEMORY_EDGE`].
    pub par_id: i32,
}

/// Serializable snapshot of an accumulated dependence graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<EdgeRecord>,
    pub function_names: Vec<String>,
    pub array_base_addresses: HashMap<String, Addr>,
    pub call_argument_mappings: HashMap<String, String>,
}

/// Standard dependence-graph sink backed by a petgraph [`DiGraph`].
///
/// Node weights are node ids and edge weights are operand slots, so the
/// graph mirrors the builder's output one-to-one. Parallel edges between a
/// pair are allowed (the same producer can feed several operand slots of
/// one consumer); memory edges are deduplicated by the builder before they
/// reach the sink.
pub struct SimDatapath {
    nodes: Vec<GraphNode>,
    graph: DiGraph<NodeId, i32>,
    indices: Vec<NodeIndex>,
    function_names: Vec<String>,
    array_base_addresses: HashMap<String, Addr>,
    call_argument_mappings: HashMap<String, String>,
    ready_mode: bool,
}

impl SimDatapath {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            graph: DiGraph::new(),
            indices: Vec::new(),
            function_names: Vec::new(),
            array_base_addresses: HashMap::new(),
            call_argument_mappings: HashMap::new(),
            ready_mode: false,
        }
    }

    /// Enable or disable ready mode (full/empty-bit scheduling downstream).
    pub fn set_ready_mode(&mut self, ready: bool) {
        self.ready_mode = ready;
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> Vec<EdgeRecord> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| EdgeRecord {
                source: self.graph[edge.source()],
                sink: self.graph[edge.target()],
                par_id: edge.weight,
            })
            .collect()
    }

    pub fn function_names(&self) -> &[String] {
        &self.function_names
    }

    pub fn array_base_addresses(&self) -> &HashMap<String, Addr> {
        &self.array_base_addresses
    }

    pub fn call_argument_mappings(&self) -> &HashMap<String, String> {
        &self.call_argument_mappings
    }

    /// Direct access to the underlying graph for downstream passes.
    pub fn graph(&self) -> &DiGraph<NodeId, i32> {
        &self.graph
    }

    /// Snapshot the accumulated graph for serialization.
    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot {
            nodes: self.nodes.clone(),
            edges: self.edges(),
            function_names: self.function_names.clone(),
            array_base_addresses: self.array_base_addresses.clone(),
            call_argument_mappings: self.call_argument_mappings.clone(),
        }
    }

    /// Export the graph as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.snapshot())
    }

    /// Export the graph as compact JSON.
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.snapshot())
    }

    /// Write the graph in Graphviz DOT form.
    pub fn write_dot<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "digraph dddg {{")?;
        for node in &self.nodes {
            writeln!(
                writer,
                "  n{} [label=\"{}: {}\"];",
                node.nid, node.nid, node.microop
            )?;
        }
        for edge in self.graph.raw_edges() {
            let label = if edge.weight == MEMORY_EDGE {
                "mem".to_string()
            } else {
                edge.weight.to_string()
            };
            writeln!(
                writer,
                "  n{} -> n{} [label=\"{}\"];",
                self.graph[edge.source()],
                self.graph[edge.target()],
                label
            )?;
        }
        writeln!(writer, "}}")
    }
}

impl Default for SimDatapath {
    fn default() -> Self {
        Self::new()
    }
}

impl Datapath for SimDatapath {
    fn insert_node(&mut self, nid: NodeId, microop: Microop) -> &mut GraphNode {
        assert_eq!(nid as usize, self.nodes.len(), "node ids must be dense");
        self.nodes.push(GraphNode::new(nid, microop));
        self.indices.push(self.graph.add_node(nid));
        self.nodes.last_mut().unwrap()
    }

    fn add_dddg_edge(&mut self, source: NodeId, sink: NodeId, par_id: i32) {
        assert!((source as usize) < self.nodes.len());
        assert!((sink as usize) < self.nodes.len());
        self.graph
            .add_edge(self.indices[source as usize], self.indices[sink as usize], par_id);
    }

    fn add_function_name(&mut self, name: &str) {
        if !self.function_names.iter().any(|n| n == name) {
            self.function_names.push(name.to_string());
        }
    }

    fn add_array_base_address(&mut self, label: &str, base: Addr) {
        self.array_base_addresses.insert(label.to_string(), base);
    }

    fn add_call_argument_mapping(&mut self, callee_reg: String, caller_reg: String) {
        self.call_argument_mappings.insert(callee_reg, caller_reg);
    }

    fn node_from_node_id(&self, nid: NodeId) -> &GraphNode {
        &self.nodes[nid as usize]
    }

    fn node_from_node_id_mut(&mut self, nid: NodeId) -> &mut GraphNode {
        &mut self.nodes[nid as usize]
    }

    fn is_ready_mode(&self) -> bool {
        self.ready_mode
    }

    fn num_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn num_of_edges(&self) -> usize {
        self.graph.edge_count()
    }
}
