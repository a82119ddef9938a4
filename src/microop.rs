//! Micro-op codes as emitted by the instrumented compiler backend.
//!
//! Each dynamic instruction record carries a numeric opcode following the
//! LLVM instruction numbering, extended above the LLVM range with the
//! accelerator-specific operations (DMA transfers, fast trigonometry).
//! The builder only branches on a small subset; everything else is treated
//! as a generic operation distinguished by the classification predicates.

use serde::{Deserialize, Serialize};

/// Function return.
pub const RET: u8 = 1;
/// Conditional or unconditional branch.
pub const BR: u8 = 2;
/// Integer addition.
pub const ADD: u8 = 8;
/// Floating-point addition.
pub const FADD: u8 = 9;
/// Integer subtraction.
pub const SUB: u8 = 10;
/// Floating-point subtraction.
pub const FSUB: u8 = 11;
/// Integer multiplication.
pub const MUL: u8 = 12;
/// Floating-point multiplication.
pub const FMUL: u8 = 13;
/// Unsigned division.
pub const UDIV: u8 = 14;
/// Signed division.
pub const SDIV: u8 = 15;
/// Floating-point division.
pub const FDIV: u8 = 16;
/// Floating-point remainder.
pub const FREM: u8 = 19;
/// Stack allocation.
pub const ALLOCA: u8 = 26;
/// Memory load.
pub const LOAD: u8 = 27;
/// Memory store.
pub const STORE: u8 = 28;
/// Address computation.
pub const GET_ELEMENT_PTR: u8 = 29;
/// Integer compare.
pub const ICMP: u8 = 46;
/// Floating-point compare.
pub const FCMP: u8 = 47;
/// SSA phi node.
pub const PHI: u8 = 48;
/// Function call.
pub const CALL: u8 = 49;

/// DMA channel fence.
pub const DMA_FENCE: u8 = 97;
/// DMA transfer out of accelerator-visible memory.
pub const DMA_STORE: u8 = 98;
/// DMA transfer into accelerator-visible memory.
pub const DMA_LOAD: u8 = 99;
/// Hardware sine unit.
pub const SINE: u8 = 102;
/// Hardware cosine unit.
pub const COSINE: u8 = 103;

/// A micro-op: the normalized low-level opcode of one dynamic instruction.
///
/// Wraps the raw numeric code so the encoding stays bit-compatible with the
/// instrumentor while giving the builder typed classification predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Microop(pub u8);

impl Microop {
    /// Placeholder before the first instruction header is seen.
    pub const NONE: Microop = Microop(0);

    /// Raw numeric code.
    pub fn code(self) -> u8 {
        self.0
    }

    pub fn is_ret(self) -> bool {
        self.0 == RET
    }

    pub fn is_load(self) -> bool {
        self.0 == LOAD
    }

    pub fn is_store(self) -> bool {
        self.0 == STORE
    }

    pub fn is_gep(self) -> bool {
        self.0 == GET_ELEMENT_PTR
    }

    pub fn is_alloca(self) -> bool {
        self.0 == ALLOCA
    }

    pub fn is_phi(self) -> bool {
        self.0 == PHI
    }

    pub fn is_call(self) -> bool {
        self.0 == CALL
    }

    pub fn is_dma_load(self) -> bool {
        self.0 == DMA_LOAD
    }

    pub fn is_dma_store(self) -> bool {
        self.0 == DMA_STORE
    }

    /// Any DMA transfer or fence. DMA ops have variable latency and their
    /// memory-ordering edges are handled separately from plain loads/stores.
    pub fn is_dma_op(self) -> bool {
        matches!(self.0, DMA_FENCE | DMA_STORE | DMA_LOAD)
    }

    /// Trigonometric unit ops. Like calls, they receive operands through
    /// forward records.
    pub fn is_trig_op(self) -> bool {
        matches!(self.0, SINE | COSINE)
    }

    /// Floating-point arithmetic, including the trig units.
    pub fn is_fp_op(self) -> bool {
        matches!(self.0, FADD | FSUB | FMUL | FDIV | FREM | FCMP) || self.is_trig_op()
    }

    /// Ops whose parameters carry memory addresses the builder must track.
    pub fn accesses_memory(self) -> bool {
        self.is_load() || self.is_store() || self.is_gep() || self.is_dma_op()
    }
}

impl From<u8> for Microop {
    fn from(code: u8) -> Self {
        Microop(code)
    }
}

impl std::fmt::Display for Microop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self.0 {
            RET => "ret",
            BR => "br",
            ADD => "add",
            FADD => "fadd",
            SUB => "sub",
            FSUB => "fsub",
            MUL => "mul",
            FMUL => "fmul",
            UDIV => "udiv",
            SDIV => "sdiv",
            FDIV => "fdiv",
            FREM => "frem",
            ALLOCA => "alloca",
            LOAD => "load",
            STORE => "store",
            GET_ELEMENT_PTR => "getelementptr",
            ICMP => "icmp",
            FCMP => "fcmp",
            PHI => "phi",
            CALL => "call",
            DMA_FENCE => "dmaFence",
            DMA_STORE => "dmaStore",
            DMA_LOAD => "dmaLoad",
            SINE => "sin",
            COSINE => "cos",
            _ => return write!(f, "op{}", self.0),
        };
        f.write_str(name)
    }
}
