use crate::{
    circuit_builder::{ops::*, BuilderHooks, Connector},
    circuit_sim::{CircuitSim, NodeType},
    Circuit, NodeId,
};

use super::{
    gate,
    mux::create_n_to_1_mux,
    wire::{select_bits, Wire},
};

pub fn create_d_latch<T: BuilderHooks>(input: Connector<T>, enable: Connector<T>) -> Connector<T> {
    let q_reset = gate!(and, gate!(nor, input), enable);
    let q_set = gate!(and, gate!(or, input), enable);

    let q = gate!(nor, q_reset);
    let q_not = gate!(nor, q_set);
    // Start from a stored 0 instead of the undefined state of the loop
    q.set(false);
    q.connect(&q_not);
    q_not.connect(&q);
    q
}

/// Cross-coupled NOR pair preset to 0. Returns `(q, q_not)`.
pub fn create_sr_latch(circuit: &mut Circuit, set: NodeId, reset: NodeId) -> (NodeId, NodeId) {
    let q = gate(circuit, NodeType::Nor, &[reset]);
    let q_not = gate(circuit, NodeType::Nor, &[set]);
    circuit.connect(q, q_not);
    circuit.connect(q_not, q);
    circuit.preset(q, false);
    circuit.preset(q_not, true);
    (q, q_not)
}

/// Transparent while `enable` is high. Returns `(q, q_not)`.
pub fn create_d_latch2(
    circuit: &mut Circuit,
    input_pos: NodeId,
    input_neg: NodeId,
    enable: NodeId,
) -> (NodeId, NodeId) {
    let q_set = gate(circuit, NodeType::And, &[input_pos, enable]);
    let q_reset = gate(circuit, NodeType::And, &[input_neg, enable]);
    create_sr_latch(circuit, q_set, q_reset)
}

/// Master-slave flip-flop capturing `input` on the rising edge of the clock.
pub fn create_d_flip_flop(
    circuit: &mut Circuit,
    input: NodeId,
    clock: NodeId,
    clock_not: NodeId,
) -> NodeId {
    let input_neg = gate(circuit, NodeType::Nor, &[input]);
    let (master, master_not) = create_d_latch2(circuit, input, input_neg, clock_not);
    let (q, _) = create_d_latch2(circuit, master, master_not, clock);
    q
}

/// Edge-triggered register. Without a write enable it loads on every rising
/// clock edge.
pub struct Register {
    pub q: Wire,
}

impl Register {
    pub fn new(circuit: &mut Circuit, input: &Wire, clock: NodeId, enable: Option<NodeId>) -> Self {
        let clock_not = gate(circuit, NodeType::Nor, &[clock]);
        let data = match enable {
            Some(_) => Wire::new(circuit, input.width()),
            None => input.clone(),
        };
        let q = data.map(|bit| create_d_flip_flop(circuit, bit, clock, clock_not));
        if let Some(enable) = enable {
            let enable_not = gate(circuit, NodeType::Nor, &[enable]);
            let load = input.enable(circuit, enable);
            let hold = q.enable(circuit, enable_not);
            load.connect(circuit, &data);
            hold.connect(circuit, &data);
        }
        Register { q }
    }
}

pub struct RegFilePorts<'a> {
    pub rs1: &'a Wire,
    pub rs2: &'a Wire,
    pub rd: &'a Wire,
    pub wdata: &'a Wire,
    pub wen: NodeId,
    pub clock: NodeId,
}

/// Two combinational read ports, one write port clocked on the rising edge.
/// Register 0 always reads as zero.
pub struct RegFile {
    pub rd1: Wire,
    pub rd2: Wire,
    pub registers: Vec<Wire>,
}

impl RegFile {
    pub fn address_width(registers: usize) -> usize {
        select_bits(registers)
    }

    pub fn new(circuit: &mut Circuit, ports: RegFilePorts, registers: usize) -> Self {
        assert!(registers >= 2);
        let width = ports.wdata.width();
        let write_select = ports.rd.decode(circuit, registers);
        let mut regs = Vec::with_capacity(registers);
        regs.push(Wire::constant(circuit, width, 0));
        for select in write_select.into_iter().skip(1) {
            let write = gate(circuit, NodeType::And, &[select, ports.wen]);
            let register = Register::new(circuit, ports.wdata, ports.clock, Some(write));
            regs.push(register.q);
        }
        let rd1 = create_n_to_1_mux(circuit, &regs, ports.rs1);
        let rd2 = create_n_to_1_mux(circuit, &regs, ports.rs2);
        RegFile {
            rd1,
            rd2,
            registers: regs,
        }
    }
}
