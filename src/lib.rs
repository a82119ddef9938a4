//! Dynamic data dependence graph construction for trace-driven accelerator
//! simulation.
//!
//! This crate consumes the per-dynamic-instruction execution trace emitted
//! by an instrumented compiler backend and materializes a directed acyclic
//! graph in which nodes are dynamic instruction instances and edges are
//! data dependences:
//!
//! - Register-flow edges, recovered from SSA-style liveness tracking scoped
//!   per dynamic function invocation
//! - Memory-order edges, recovered from byte-granular last-writer tracking,
//!   with variable-latency DMA transfers ordered specially
//!
//! The graph lands in a [`Datapath`] sink; [`SimDatapath`] is the standard
//! petgraph-backed implementation used by downstream scheduling and
//! resource-allocation passes.
//!
//! # Example
//!
//! ```no_run
//! use dddg::{DddgBuilder, SimDatapath};
//!
//! let trace = dddg::open_trace("bench/trace.gz".as_ref()).unwrap();
//! let mut datapath = SimDatapath::new();
//! let mut builder = DddgBuilder::new(&mut datapath);
//! builder.build(trace).unwrap();
//! println!("{} nodes, {} edges", builder.num_nodes(), builder.num_edges());
//! ```

pub mod builder;
pub mod datapath;
pub mod error;
pub mod labelmap;
pub mod microop;
pub mod reader;
pub mod types;

pub use builder::DddgBuilder;
pub use datapath::{Datapath, EdgeRecord, GraphSnapshot, SimDatapath, MEMORY_EDGE};
pub use error::BuildError;
pub use labelmap::{Label, LabelMap};
pub use microop::Microop;
pub use reader::open_trace;
pub use types::{value_to_bits, Addr, GraphNode, MemAccess, NodeId, ADDR_MASK, BYTE_SIZE};
