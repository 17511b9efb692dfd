use crate::{
    circuit_sim::{CircuitSim, NodeType},
    Circuit, NodeId,
};

pub mod adder;
pub mod alu;
pub mod memory;
pub mod mux;
pub mod rom;
pub mod wire;

/// One gate fed by every node of `inputs`.
pub(crate) fn gate(circuit: &mut Circuit, node_type: NodeType, inputs: &[NodeId]) -> NodeId {
    let node = circuit.create_node(node_type);
    for input in inputs {
        circuit.connect(*input, node);
    }
    node
}
