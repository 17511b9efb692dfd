use crate::{
    circuit_sim::{CircuitSim, NodeType},
    Circuit, NodeId,
};

use super::wire::{select_bits, Wire};

pub fn create_n_to_1_mux(circuit: &mut Circuit, inputs: &[Wire], select: &Wire) -> Wire {
    assert!(!inputs.is_empty());
    assert!(select.width() >= select_bits(inputs.len()));
    let width = inputs[0].width();
    let decoded = select.decode(circuit, inputs.len());
    let enabled: Vec<Wire> = inputs
        .iter()
        .zip(decoded)
        .map(|(input, enable)| input.enable(circuit, enable))
        .collect();
    Wire::merge(circuit, &enabled, width)
}

/// `a` while `select` is low, `b` while it is high.
pub fn mux2(circuit: &mut Circuit, select: NodeId, a: &Wire, b: &Wire) -> Wire {
    let select_not = circuit.create_node(NodeType::Nor);
    circuit.connect(select, select_not);
    let a = a.enable(circuit, select_not);
    let b = b.enable(circuit, select);
    a.or(circuit, &b)
}
