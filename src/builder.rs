//! Dynamic data dependence graph construction.
//!
//! [`DddgBuilder`] consumes a linear per-dynamic-instruction trace and
//! materializes the dependence graph in a [`Datapath`] sink:
//!
//! - Register-flow edges from SSA-style liveness tracking, scoped per
//!   dynamic function invocation so re-entries get disjoint namespaces
//! - Memory-order edges from a byte-granular last-writer table, with
//!   special ordering rules for variable-latency DMA transfers
//! - Caller/callee argument mappings so dataflow crosses call boundaries
//!
//! The trace is streamed once; nothing but the accumulated tables is held
//! in memory. The build stops after the first function observed in the
//! trace returns.

use crate::datapath::{Datapath, MEMORY_EDGE};
use crate::error::BuildError;
use crate::labelmap::LabelMap;
use crate::microop::Microop;
use crate::types::{value_to_bits, Addr, NodeId, ADDR_MASK, BYTE_SIZE};
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::io::BufRead;

/// Sentinel opening the optional labelmap prelude.
const LABEL_MAP_START: &str = "%%%% LABEL MAP START %%%%";
/// Sentinel closing the labelmap prelude.
const LABEL_MAP_END: &str = "%%%% LABEL MAP END %%%%";

/// One dynamic activation of a static function.
///
/// The invocation count distinguishes re-entries of the same static
/// function; register names are scoped under the pair so recursive
/// activations live in disjoint namespaces.
#[derive(Debug, Clone, PartialEq, Eq)]
struct DynamicFunction {
    name: String,
    count: u32,
}

impl DynamicFunction {
    fn none() -> Self {
        Self {
            name: String::new(),
            count: 0,
        }
    }

    /// Scope a local register label under this activation.
    fn scoped_reg(&self, label: &str) -> String {
        format!("{}-{}-{}", self.name, self.count, label)
    }
}

impl fmt::Display for DynamicFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.count)
    }
}

/// Parsed instruction header record (tag `0`).
#[derive(Debug, Clone)]
struct InstructionRecord {
    line_num: u32,
    static_function: String,
    bblock_id: String,
    inst_id: String,
    microop: Microop,
}

/// Parsed operand-shaped record (parameter, result, or forward).
#[derive(Debug, Clone)]
struct OperandRecord {
    size: u32,
    value: f64,
    is_float: bool,
    is_reg: bool,
    label: String,
    /// Predecessor basic block, present only on phi parameters.
    prev_bbid: Option<String>,
}

/// A pending register-flow edge.
#[derive(Debug, Clone, Copy)]
struct EdgeInfo {
    sink: NodeId,
    par_id: i32,
}

/// Streaming builder that turns one execution trace into a dependence
/// graph pushed into a [`Datapath`].
///
/// # Example
///
/// ```no_run
/// use dddg::{DddgBuilder, SimDatapath};
///
/// let trace = dddg::open_trace("bench/trace.gz".as_ref()).unwrap();
/// let mut datapath = SimDatapath::new();
/// let mut builder = DddgBuilder::new(&mut datapath);
/// builder.build(trace).unwrap();
/// ```
pub struct DddgBuilder<'a, D: Datapath> {
    datapath: &'a mut D,
    labelmap: LabelMap,

    /// Next node id to mint; node ids are dense in trace order.
    next_nid: NodeId,
    /// Node currently being populated, if any header has been seen.
    curr_nid: Option<NodeId>,

    prev_microop: Microop,
    curr_microop: Microop,
    /// Basic block left at the last non-phi -> phi transition.
    prev_bblock: String,
    curr_bblock: String,

    /// Activation the current instruction runs in.
    curr_dynamic_function: DynamicFunction,
    /// Stack of live activations, innermost last.
    active_method: Vec<DynamicFunction>,
    /// Per-static-function invocation counters.
    function_counter: HashMap<String, u32>,

    /// Callee named by the most recent call's function-pointer parameter.
    callee_function: String,
    /// Activation the callee will run in, precomputed at the call site.
    callee_dynamic_function: DynamicFunction,
    /// Caller-side scoped register of the most recent call argument.
    unique_reg_in_caller_func: Option<String>,
    /// Producer of the most recent call argument, if it had one.
    last_call_source: Option<NodeId>,

    /// Whether any parameter record has been seen for the current node.
    last_parameter: bool,
    /// Operand count of the current node (first parameter's tag).
    num_of_parameters: i32,
    /// Masked address values of this node's parameters, in record order.
    parameter_value_per_inst: Vec<Addr>,
    parameter_size_per_inst: Vec<u32>,
    parameter_label_per_inst: Vec<String>,

    /// Scoped register -> last defining node.
    register_last_written: HashMap<String, NodeId>,
    /// Byte address -> last writing node.
    address_last_written: HashMap<Addr, NodeId>,

    /// Register-flow edges, keyed by source node.
    register_edge_table: BTreeMap<NodeId, Vec<EdgeInfo>>,
    /// Memory-order edges, keyed by source node; sinks are unique per source.
    memory_edge_table: BTreeMap<NodeId, Vec<NodeId>>,
    num_of_reg_dep: usize,
    num_of_mem_dep: usize,
}

impl<'a, D: Datapath> DddgBuilder<'a, D> {
    pub fn new(datapath: &'a mut D) -> Self {
        Self {
            datapath,
            labelmap: LabelMap::new(),
            next_nid: 0,
            curr_nid: None,
            prev_microop: Microop::NONE,
            curr_microop: Microop::NONE,
            prev_bblock: "-1".to_string(),
            curr_bblock: "-1".to_string(),
            curr_dynamic_function: DynamicFunction::none(),
            active_method: Vec::new(),
            function_counter: HashMap::new(),
            callee_function: String::new(),
            callee_dynamic_function: DynamicFunction::none(),
            unique_reg_in_caller_func: None,
            last_call_source: None,
            last_parameter: false,
            num_of_parameters: 0,
            parameter_value_per_inst: Vec::new(),
            parameter_size_per_inst: Vec::new(),
            parameter_label_per_inst: Vec::new(),
            register_last_written: HashMap::new(),
            address_last_written: HashMap::new(),
            register_edge_table: BTreeMap::new(),
            memory_edge_table: BTreeMap::new(),
            num_of_reg_dep: 0,
            num_of_mem_dep: 0,
        }
    }

    /// Consume the trace and push the accumulated graph into the sink.
    ///
    /// The stream is read once. Reading stops after the first function
    /// observed in the trace returns (epilogue noise is ignored); an early
    /// EOF is treated as normal termination and the partial graph is
    /// emitted.
    pub fn build<R: BufRead>(&mut self, trace: R) -> Result<(), BuildError> {
        info!("generating dynamic data dependence graph");

        let mut first_function: Option<String> = None;
        let mut first_function_returned = false;
        let mut in_labelmap_section = false;
        let mut labelmap_done = false;
        let mut line_no: u64 = 0;

        for line in trace.lines() {
            let line = line?;
            line_no += 1;

            // The labelmap prelude, if present, precedes all records.
            if !labelmap_done {
                if in_labelmap_section {
                    if line.contains(LABEL_MAP_END) {
                        labelmap_done = true;
                        in_labelmap_section = false;
                    } else {
                        self.labelmap.parse_line(&line);
                    }
                    continue;
                } else if line.contains(LABEL_MAP_START) {
                    in_labelmap_section = true;
                    continue;
                }
            }

            let Some((tag, payload)) = line.split_once(',') else {
                if first_function_returned {
                    break;
                }
                continue;
            };
            // Any record line means the labelmap is over or absent.
            labelmap_done = true;

            match tag {
                "0" => {
                    let header = parse_instruction_record(payload, line_no)?;
                    let first = first_function
                        .get_or_insert_with(|| header.static_function.clone());
                    if header.microop.is_ret() && header.static_function == *first {
                        first_function_returned = true;
                    }
                    self.handle_instruction(header, line_no)?;
                }
                "r" => self.handle_result(payload, line_no)?,
                "f" => self.handle_forward(payload, line_no)?,
                tag => {
                    let param_tag: i32 = tag.parse().map_err(|_| {
                        BuildError::corrupt(line_no, format!("unrecognized record tag '{tag}'"))
                    })?;
                    self.handle_parameter(payload, param_tag, line_no)?;
                }
            }
        }

        self.output_dddg();

        info!("num of nodes: {}", self.datapath.num_of_nodes());
        info!("num of edges: {}", self.datapath.num_of_edges());
        info!("num of reg edges: {}", self.num_of_reg_dep);
        info!("num of mem edges: {}", self.num_of_mem_dep);
        Ok(())
    }

    /// Nodes minted so far.
    pub fn num_nodes(&self) -> usize {
        self.next_nid as usize
    }

    /// Edges accumulated so far (register + memory).
    pub fn num_edges(&self) -> usize {
        self.num_of_reg_dep + self.num_of_mem_dep
    }

    pub fn num_of_register_dependency(&self) -> usize {
        self.num_of_reg_dep
    }

    pub fn num_of_memory_dependency(&self) -> usize {
        self.num_of_mem_dep
    }

    /// The labelmap parsed from the trace prelude, for downstream passes.
    pub fn labelmap(&self) -> &LabelMap {
        &self.labelmap
    }

    /// Operand count of the instruction currently being parsed (the tag of
    /// its first parameter record; parameters arrive highest slot first).
    pub fn num_of_parameters(&self) -> i32 {
        self.num_of_parameters
    }

    /// Instruction header: mint a node, resolve the dynamic function
    /// activation, and reset per-instruction state.
    fn handle_instruction(
        &mut self,
        record: InstructionRecord,
        line_no: u64,
    ) -> Result<(), BuildError> {
        let nid = self.next_nid;
        self.next_nid += 1;
        self.curr_nid = Some(nid);
        self.prev_microop = self.curr_microop;
        self.curr_microop = record.microop;

        let node = self.datapath.insert_node(nid, record.microop);
        node.set_line_num(record.line_num);
        node.set_inst_id(record.inst_id);
        node.set_static_method(record.static_function.clone());
        self.datapath.add_function_name(&record.static_function);

        let mut invocation_count = 0;
        let mut curr_func_found = false;

        if let Some(top) = self.active_method.last().cloned() {
            if top.name == record.static_function {
                if self.prev_microop.is_call() && self.callee_function == record.static_function
                {
                    // The function called itself: a fresh activation.
                    let counter = self
                        .function_counter
                        .get_mut(&record.static_function)
                        .ok_or_else(|| {
                            BuildError::invariant(
                                line_no,
                                "recursive entry into a function never activated",
                            )
                        })?;
                    *counter += 1;
                    invocation_count = *counter;
                    self.curr_dynamic_function = DynamicFunction {
                        name: record.static_function.clone(),
                        count: invocation_count,
                    };
                    self.active_method.push(self.curr_dynamic_function.clone());
                    debug!("recursive entry into {}", self.curr_dynamic_function);
                } else {
                    invocation_count = top.count;
                    self.curr_dynamic_function = top.clone();
                }
                curr_func_found = true;
            }
            if record.microop.is_ret() {
                let innermost = self.active_method.last().expect("checked non-empty");
                if innermost.name != record.static_function {
                    return Err(BuildError::invariant(
                        line_no,
                        format!(
                            "ret from '{}' but active function is '{}'",
                            record.static_function, innermost
                        ),
                    ));
                }
                self.active_method.pop();
            }
        }

        if !curr_func_found {
            let counter = self
                .function_counter
                .entry(record.static_function.clone())
                .and_modify(|c| *c += 1)
                .or_insert(0);
            invocation_count = *counter;
            self.curr_dynamic_function = DynamicFunction {
                name: record.static_function,
                count: invocation_count,
            };
            self.active_method.push(self.curr_dynamic_function.clone());
        }

        // Latch the block we are leaving when a phi run starts, so phi
        // parameters can be filtered by taken predecessor.
        if record.microop.is_phi() && !self.prev_microop.is_phi() {
            self.prev_bblock = std::mem::replace(&mut self.curr_bblock, record.bblock_id);
        } else {
            self.curr_bblock = record.bblock_id;
        }

        self.datapath
            .node_from_node_id_mut(nid)
            .set_dynamic_invocation(invocation_count);

        self.last_parameter = false;
        self.parameter_value_per_inst.clear();
        self.parameter_size_per_inst.clear();
        self.parameter_label_per_inst.clear();
        Ok(())
    }

    /// Parameter record for operand slot `param_tag`.
    fn handle_parameter(
        &mut self,
        payload: &str,
        param_tag: i32,
        line_no: u64,
    ) -> Result<(), BuildError> {
        let nid = self.curr_nid.ok_or_else(|| {
            BuildError::invariant(line_no, "parameter record before any instruction header")
        })?;
        let is_phi = self.curr_microop.is_phi();
        let record = parse_operand_record(payload, is_phi, line_no)?;

        if is_phi {
            let prev_bbid = record.prev_bbid.as_deref().unwrap_or_default();
            if prev_bbid != self.prev_bblock {
                // Value flowed from a predecessor that was not taken.
                return Ok(());
            }
        }

        if !self.last_parameter {
            // Parameters arrive highest slot first; the first record's tag
            // is the operand count.
            self.num_of_parameters = param_tag;
            if self.curr_microop.is_call() {
                self.callee_function = record.label.clone();
            }
            let next_count = self
                .function_counter
                .get(&self.callee_function)
                .map(|count| count + 1)
                .unwrap_or(0);
            self.callee_dynamic_function = DynamicFunction {
                name: self.callee_function.clone(),
                count: next_count,
            };
        }
        self.last_parameter = true;
        self.last_call_source = None;

        if record.is_reg {
            let unique_reg_id = self.curr_dynamic_function.scoped_reg(&record.label);
            if self.curr_microop.is_call() {
                self.unique_reg_in_caller_func = Some(unique_reg_id.clone());
            }
            if let Some(&writer) = self.register_last_written.get(&unique_reg_id) {
                self.insert_register_edge(writer, nid, param_tag);
                if self.curr_microop.is_call() {
                    self.last_call_source = Some(writer);
                }
            } else if (self.curr_microop.is_store() && param_tag == 2)
                || (self.curr_microop.is_load() && param_tag == 1)
            {
                // Address register with no defining instruction in the
                // trace: the load/store subsumes an elided address
                // computation, so it defines the register itself.
                self.register_last_written.insert(unique_reg_id, nid);
            }
        }

        if self.curr_microop.accesses_memory() {
            let masked = (record.value as Addr) & ADDR_MASK;
            self.parameter_value_per_inst.push(masked);
            self.parameter_size_per_inst.push(record.size);
            self.parameter_label_per_inst.push(record.label.clone());

            if param_tag == 1 && self.curr_microop.is_load() {
                self.handle_post_write_dependency(masked, nid);
                self.datapath
                    .node_from_node_id_mut(nid)
                    .set_array_label(record.label.clone());
                self.datapath.add_array_base_address(&record.label, masked);
            } else if param_tag == 2 && self.curr_microop.is_store() {
                // Slot 2 is the pointer and arrives first, so the address
                // is accumulator[0].
                let mem_address = self.parameter_value_per_inst[0];
                if let Some(&last_writer) = self.address_last_written.get(&mem_address) {
                    // A DMA load is variable-latency; a store overwriting
                    // its bytes must be ordered after it.
                    if self.datapath.node_from_node_id(last_writer).is_dma_load() {
                        self.handle_post_write_dependency(mem_address, nid);
                    }
                }
                self.address_last_written.insert(mem_address, nid);

                let base_label = self.parameter_label_per_inst[0].clone();
                self.datapath
                    .node_from_node_id_mut(nid)
                    .set_array_label(base_label.clone());
                self.datapath.add_array_base_address(&base_label, mem_address);
            } else if param_tag == 1 && self.curr_microop.is_store() {
                let mem_address = self.parameter_value_per_inst[0];
                let mem_size = record.size / BYTE_SIZE;
                let bits = value_to_bits(record.value, mem_size, record.is_float)?;
                self.datapath
                    .node_from_node_id_mut(nid)
                    .set_mem_access_with_value(mem_address, 0, mem_size, record.is_float, bits);
            } else if param_tag == 1 && self.curr_microop.is_gep() {
                self.datapath
                    .node_from_node_id_mut(nid)
                    .set_array_label(record.label.clone());
                self.datapath.add_array_base_address(&record.label, masked);
            } else if param_tag == 1 && self.curr_microop.is_dma_op() {
                self.datapath
                    .node_from_node_id_mut(nid)
                    .set_array_label(record.label.clone());
                // Ordering edges wait for the result record, which sees
                // the full argument list.
            }
        }
        Ok(())
    }

    /// Result record: update liveness for the produced register and attach
    /// memory-access descriptors.
    fn handle_result(&mut self, payload: &str, line_no: u64) -> Result<(), BuildError> {
        let nid = self.curr_nid.ok_or_else(|| {
            BuildError::invariant(line_no, "result record before any instruction header")
        })?;
        let record = parse_operand_record(payload, false, line_no)?;
        if !record.is_reg {
            return Err(BuildError::invariant(
                line_no,
                "result record must name a register",
            ));
        }

        if self.datapath.node_from_node_id(nid).is_fp_op() && record.size == 64 {
            self.datapath
                .node_from_node_id_mut(nid)
                .set_double_precision(true);
        }

        let unique_reg_id = self.curr_dynamic_function.scoped_reg(&record.label);
        self.register_last_written.insert(unique_reg_id, nid);

        if self.curr_microop.is_alloca() {
            self.datapath
                .node_from_node_id_mut(nid)
                .set_array_label(record.label.clone());
            self.datapath
                .add_array_base_address(&record.label, (record.value as Addr) & ADDR_MASK);
        } else if self.curr_microop.is_load() {
            let mem_address = *self.parameter_value_per_inst.last().ok_or_else(|| {
                BuildError::corrupt(line_no, "load result without an address parameter")
            })?;
            let mem_size = record.size / BYTE_SIZE;
            let bits = value_to_bits(record.value, mem_size, record.is_float)?;
            self.datapath
                .node_from_node_id_mut(nid)
                .set_mem_access_with_value(mem_address, 0, mem_size, record.is_float, bits);
        } else if self.curr_microop.is_dma_op() {
            // Arguments in record order: [target, base, offset, size].
            if self.parameter_value_per_inst.len() < 4 {
                return Err(BuildError::corrupt(
                    line_no,
                    "DMA result with fewer than four parameters",
                ));
            }
            let mem_address = self.parameter_value_per_inst[1];
            let mem_offset = self.parameter_value_per_inst[2] as u32;
            let mem_size = self.parameter_value_per_inst[3] as u32;
            self.datapath
                .node_from_node_id_mut(nid)
                .set_mem_access(mem_address, mem_offset, mem_size);

            let start = mem_address + mem_offset as Addr;
            let end = start + mem_size as Addr;
            if self.curr_microop.is_dma_load() {
                // A DMA load is a bulk store into accelerator-visible
                // memory: it becomes the last writer of every byte. In
                // ready mode loads issue as soon as data is present and
                // the ordering edge would not be honored, so skip.
                if !self.datapath.is_ready_mode() {
                    for addr in start..end {
                        self.address_last_written.insert(addr, nid);
                    }
                }
            } else {
                // A DMA store reads accelerator-visible memory: order it
                // after every producer of the bytes it transfers out.
                for addr in start..end {
                    self.handle_post_write_dependency(addr, nid);
                }
            }
        }
        Ok(())
    }

    /// Forward record: a caller-side argument value landing in a callee
    /// parameter register.
    fn handle_forward(&mut self, payload: &str, line_no: u64) -> Result<(), BuildError> {
        let nid = self.curr_nid.ok_or_else(|| {
            BuildError::invariant(line_no, "forward record before any instruction header")
        })?;
        let record = parse_operand_record(payload, false, line_no)?;
        if !record.is_reg {
            return Err(BuildError::invariant(
                line_no,
                "forward record must name a register",
            ));
        }
        let node = self.datapath.node_from_node_id(nid);
        if !(node.is_call_op() || node.is_dma_op() || node.is_trig_op()) {
            return Err(BuildError::invariant(
                line_no,
                "forward record outside a call, DMA, or trig instruction",
            ));
        }

        // The register lives in the callee's scope.
        let unique_reg_id = self.callee_dynamic_function.scoped_reg(&record.label);
        if let Some(caller_reg) = self.unique_reg_in_caller_func.take() {
            self.datapath
                .add_call_argument_mapping(unique_reg_id.clone(), caller_reg);
        }

        // Credit the caller-side producer when one exists, so the callee's
        // uses link to the real definition rather than the call node.
        let written_inst = self.last_call_source.unwrap_or(nid);
        self.register_last_written.insert(unique_reg_id, written_inst);
        Ok(())
    }

    /// Add a memory-order edge from the last writer of `addr` to `nid`,
    /// unless one already exists for the pair.
    fn handle_post_write_dependency(&mut self, addr: Addr, nid: NodeId) {
        if let Some(&source) = self.address_last_written.get(&addr) {
            let sinks = self.memory_edge_table.entry(source).or_default();
            if !sinks.contains(&nid) {
                sinks.push(nid);
                self.num_of_mem_dep += 1;
            }
        }
    }

    fn insert_register_edge(&mut self, source: NodeId, sink: NodeId, par_id: i32) {
        self.register_edge_table
            .entry(source)
            .or_default()
            .push(EdgeInfo { sink, par_id });
        self.num_of_reg_dep += 1;
    }

    /// Push every accumulated edge into the sink.
    fn output_dddg(&mut self) {
        for (&source, edges) in &self.register_edge_table {
            for edge in edges {
                self.datapath.add_dddg_edge(source, edge.sink, edge.par_id);
            }
        }
        for (&source, sinks) in &self.memory_edge_table {
            for &sink in sinks {
                self.datapath.add_dddg_edge(source, sink, MEMORY_EDGE);
            }
        }
    }
}

/// Parse the payload of an instruction header:
/// `<line_num>,<static_function>,<bblockid>,<instid>,<microop>,<dyn_inst_count>`.
fn parse_instruction_record(payload: &str, line_no: u64) -> Result<InstructionRecord, BuildError> {
    let fields: Vec<&str> = payload.split(',').collect();
    if fields.len() < 6 {
        return Err(BuildError::corrupt(
            line_no,
            format!("instruction header has {} fields, expected 6", fields.len()),
        ));
    }
    let line_num = fields[0]
        .parse()
        .map_err(|_| BuildError::corrupt(line_no, format!("bad line number '{}'", fields[0])))?;
    let microop = fields[4]
        .parse::<u8>()
        .map(Microop)
        .map_err(|_| BuildError::corrupt(line_no, format!("bad microop '{}'", fields[4])))?;
    // The trailing dynamic-instruction count is validated but unused; the
    // builder derives invocation counts itself.
    fields[5]
        .parse::<u64>()
        .map_err(|_| BuildError::corrupt(line_no, format!("bad instance count '{}'", fields[5])))?;
    Ok(InstructionRecord {
        line_num,
        static_function: fields[1].to_string(),
        bblock_id: fields[2].to_string(),
        inst_id: fields[3].to_string(),
        microop,
    })
}

/// Parse the payload of a parameter/result/forward record:
/// `<size>,<value>,<is_reg>,<label>[,<prev_bbid>]` with a trailing comma.
fn parse_operand_record(
    payload: &str,
    is_phi: bool,
    line_no: u64,
) -> Result<OperandRecord, BuildError> {
    let fields: Vec<&str> = payload.split(',').collect();
    let expected = if is_phi { 5 } else { 4 };
    if fields.len() < expected {
        return Err(BuildError::corrupt(
            line_no,
            format!("operand record has {} fields, expected {expected}", fields.len()),
        ));
    }
    let size = fields[0]
        .parse()
        .map_err(|_| BuildError::corrupt(line_no, format!("bad size '{}'", fields[0])))?;
    let (value, is_float) = parse_value(fields[1])
        .ok_or_else(|| BuildError::corrupt(line_no, format!("bad value '{}'", fields[1])))?;
    let is_reg = match fields[2] {
        "0" => false,
        "1" => true,
        other => {
            return Err(BuildError::corrupt(
                line_no,
                format!("bad is_reg flag '{other}'"),
            ))
        }
    };
    Ok(OperandRecord {
        size,
        value,
        is_float,
        is_reg,
        label: fields[3].to_string(),
        prev_bbid: is_phi.then(|| fields[4].to_string()),
    })
}

/// Parse a textual trace value. Accepts decimal integers, decimal floats,
/// and `0x` hex integers; a `.` in the text marks the value floating-point.
fn parse_value(field: &str) -> Option<(f64, bool)> {
    let is_float = field.contains('.');
    let value = if let Some(hex) = field.strip_prefix("0x").or_else(|| field.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()? as f64
    } else {
        field.parse::<f64>().ok()?
    };
    Some((value, is_float))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datapath::SimDatapath;
    use crate::microop;

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value("42"), Some((42.0, false)));
        assert_eq!(parse_value("0x1000"), Some((4096.0, false)));
        assert_eq!(parse_value("1.5"), Some((1.5, true)));
        assert_eq!(parse_value("-3"), Some((-3.0, false)));
        assert_eq!(parse_value("bogus"), None);
    }

    #[test]
    fn test_parse_instruction_record() {
        let record = parse_instruction_record("12,top,bb1,i7,27,3", 1).unwrap();
        assert_eq!(record.line_num, 12);
        assert_eq!(record.static_function, "top");
        assert_eq!(record.bblock_id, "bb1");
        assert_eq!(record.inst_id, "i7");
        assert_eq!(record.microop, Microop(microop::LOAD));

        assert!(parse_instruction_record("12,top,bb1,i7,27", 1).is_err());
        assert!(parse_instruction_record("12,top,bb1,i7,load,3", 1).is_err());
    }

    #[test]
    fn test_parse_operand_record() {
        let record = parse_operand_record("64,0x2000,1,r5,", false, 1).unwrap();
        assert_eq!(record.size, 64);
        assert_eq!(record.value, 0x2000 as f64);
        assert!(record.is_reg);
        assert!(!record.is_float);
        assert_eq!(record.label, "r5");
        assert_eq!(record.prev_bbid, None);

        let record = parse_operand_record("32,2.5,0,c,bb3,", true, 1).unwrap();
        assert!(record.is_float);
        assert!(!record.is_reg);
        assert_eq!(record.prev_bbid.as_deref(), Some("bb3"));

        assert!(parse_operand_record("32,1,1,x", true, 1).is_err());
        assert!(parse_operand_record("32,1,2,x,", false, 1).is_err());
    }

    #[test]
    fn test_scoped_register_names() {
        let f = DynamicFunction {
            name: "foo".to_string(),
            count: 2,
        };
        assert_eq!(f.to_string(), "foo-2");
        assert_eq!(f.scoped_reg("%r5"), "foo-2-%r5");
    }

    #[test]
    fn test_register_raw_chain() {
        let trace = "\
0,10,top,bb0,i1,8,0
r,32,1,1,r1,
0,11,top,bb0,i2,8,1
1,32,1,1,r1,
r,32,2,1,r2,
";
        let mut datapath = SimDatapath::new();
        let mut builder = DddgBuilder::new(&mut datapath);
        builder.build(trace.as_bytes()).unwrap();

        assert_eq!(builder.num_nodes(), 2);
        assert_eq!(builder.num_of_register_dependency(), 1);
        assert_eq!(builder.num_of_memory_dependency(), 0);
        let edges = datapath.edges();
        assert_eq!(edges.len(), 1);
        assert_eq!((edges[0].source, edges[0].sink, edges[0].par_id), (0, 1, 1));
    }

    #[test]
    fn test_liveness_is_scoped_per_invocation() {
        // Same register label in two different activations must not link.
        let trace = "\
0,10,top,bb0,i1,8,0
r,32,1,1,r1,
0,20,leaf,bb0,i2,8,0
1,32,1,1,r1,
r,32,2,1,r2,
";
        let mut datapath = SimDatapath::new();
        let mut builder = DddgBuilder::new(&mut datapath);
        builder.build(trace.as_bytes()).unwrap();

        assert_eq!(builder.num_of_register_dependency(), 0);
    }

    #[test]
    fn test_labelmap_prelude() {
        let trace = "\
%%%% LABEL MAP START %%%%
top/loop_i 14
top/loop_j 15
%%%% LABEL MAP END %%%%
0,10,top,bb0,i1,8,0
r,32,1,1,r1,
";
        let mut datapath = SimDatapath::new();
        let mut builder = DddgBuilder::new(&mut datapath);
        builder.build(trace.as_bytes()).unwrap();

        assert_eq!(builder.labelmap().len(), 2);
        assert_eq!(builder.labelmap().get(14).unwrap().label_name, "loop_i");
        assert_eq!(builder.num_nodes(), 1);
    }

    #[test]
    fn test_memory_edge_dedup() {
        // Two loads of the same byte from one writer: one edge each sink,
        // and repeated queries for one sink collapse.
        let mut datapath = SimDatapath::new();
        let mut builder = DddgBuilder::new(&mut datapath);
        builder.address_last_written.insert(0x100, 0);
        builder.handle_post_write_dependency(0x100, 3);
        builder.handle_post_write_dependency(0x100, 3);
        builder.handle_post_write_dependency(0x100, 4);
        assert_eq!(builder.num_of_memory_dependency(), 2);
    }

    #[test]
    fn test_corrupt_trace_is_fatal() {
        let trace = "0,10,top,bb0,i1,8,0\nr,32,notanumber,1,r1,\n";
        let mut datapath = SimDatapath::new();
        let mut builder = DddgBuilder::new(&mut datapath);
        let err = builder.build(trace.as_bytes()).unwrap_err();
        assert!(matches!(err, BuildError::TraceCorrupt { line: 2, .. }));
    }

    #[test]
    fn test_result_must_be_register() {
        let trace = "0,10,top,bb0,i1,8,0\nr,32,7,0,r1,\n";
        let mut datapath = SimDatapath::new();
        let mut builder = DddgBuilder::new(&mut datapath);
        let err = builder.build(trace.as_bytes()).unwrap_err();
        assert!(matches!(err, BuildError::InvariantViolation { .. }));
    }
}
