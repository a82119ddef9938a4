//! Data structures for dynamic dependence graph nodes.
//!
//! One [`GraphNode`] is created per dynamic instruction instance in trace
//! order. Nodes carry everything downstream scheduling passes need: source
//! position, the static/dynamic function context, the micro-op, and an
//! optional memory-access descriptor for loads, stores, and DMA transfers.

use crate::error::BuildError;
use crate::microop::Microop;
use serde::{Deserialize, Serialize};

/// A byte address in the instrumented program's address space.
pub type Addr = u64;

/// Node identifier: dense, contiguous, assigned in trace order.
pub type NodeId = u32;

/// Pointer-width mask applied to every address parsed from the trace.
/// The instrumentor emits canonical 48-bit user-space pointers.
pub const ADDR_MASK: Addr = 0x0000_ffff_ffff_ffff;

/// Bits per byte, for converting trace bit-widths to byte sizes.
pub const BYTE_SIZE: u32 = 8;

/// Memory access descriptor attached to load/store/DMA nodes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemAccess {
    /// Base address of the access.
    pub addr: Addr,
    /// Byte offset from the base (nonzero only for DMA transfers).
    pub offset: u32,
    /// Access size in bytes.
    pub size: u32,
    /// Whether the transferred value is floating-point.
    pub is_float: bool,
    /// The transferred value's bit pattern (IEEE-754 for floats, a plain
    /// integer cast otherwise).
    pub bits: u64,
}

/// A dynamic instruction instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphNode {
    /// Dense node id, assigned in trace order.
    pub nid: NodeId,
    /// Micro-op of the instruction.
    pub microop: Microop,
    /// Source line number from the instrumentor.
    pub line_num: u32,
    /// Textual instruction id (the SSA name of the produced value).
    pub inst_id: String,
    /// Static function containing the instruction.
    pub static_method: String,
    /// Which dynamic invocation of `static_method` this instance ran in.
    pub dynamic_invocation: u32,
    /// Symbolic name of the referenced array, for memory ops.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub array_label: Option<String>,
    /// Memory access descriptor, for memory ops.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mem_access: Option<MemAccess>,
    /// Set when an FP op produced a 64-bit result.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    #[serde(default)]
    pub is_double_precision: bool,
}

impl GraphNode {
    /// Create a bare node; the builder fills in attributes as the
    /// instruction's records stream in.
    pub fn new(nid: NodeId, microop: Microop) -> Self {
        Self {
            nid,
            microop,
            line_num: 0,
            inst_id: String::new(),
            static_method: String::new(),
            dynamic_invocation: 0,
            array_label: None,
            mem_access: None,
            is_double_precision: false,
        }
    }

    pub fn set_line_num(&mut self, line_num: u32) {
        self.line_num = line_num;
    }

    pub fn set_inst_id(&mut self, inst_id: String) {
        self.inst_id = inst_id;
    }

    pub fn set_static_method(&mut self, method: String) {
        self.static_method = method;
    }

    pub fn set_dynamic_invocation(&mut self, count: u32) {
        self.dynamic_invocation = count;
    }

    pub fn set_array_label(&mut self, label: String) {
        self.array_label = Some(label);
    }

    pub fn set_double_precision(&mut self, dp: bool) {
        self.is_double_precision = dp;
    }

    /// Attach a memory access without value information (DMA transfers).
    pub fn set_mem_access(&mut self, addr: Addr, offset: u32, size: u32) {
        self.mem_access = Some(MemAccess {
            addr,
            offset,
            size,
            is_float: false,
            bits: 0,
        });
    }

    /// Attach a memory access carrying the transferred value's bit pattern.
    pub fn set_mem_access_with_value(
        &mut self,
        addr: Addr,
        offset: u32,
        size: u32,
        is_float: bool,
        bits: u64,
    ) {
        self.mem_access = Some(MemAccess {
            addr,
            offset,
            size,
            is_float,
            bits,
        });
    }

    pub fn is_fp_op(&self) -> bool {
        self.microop.is_fp_op()
    }

    pub fn is_dma_op(&self) -> bool {
        self.microop.is_dma_op()
    }

    pub fn is_dma_load(&self) -> bool {
        self.microop.is_dma_load()
    }

    pub fn is_call_op(&self) -> bool {
        self.microop.is_call()
    }

    pub fn is_trig_op(&self) -> bool {
        self.microop.is_trig_op()
    }
}

/// Convert a trace value into the bit pattern stored on memory-access
/// descriptors.
///
/// Floating-point values are re-encoded through their IEEE-754
/// representation at the access width; a float occupies the low 32 bits of
/// the result. Non-float values are cast to an integer as-is, regardless of
/// width — downstream consumers treat the bits as raw.
pub fn value_to_bits(value: f64, size: u32, is_float: bool) -> Result<u64, BuildError> {
    if !is_float {
        return Ok(value as u64);
    }
    match size {
        4 => Ok((value as f32).to_bits() as u64),
        8 => Ok(value.to_bits()),
        _ => Err(BuildError::UnsupportedFpSize { size }),
    }
}
