use std::ops::{Index, IndexMut};

use tracing::{debug, trace};

use crate::circuit_sim::*;
use crate::error::{Error, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    const NULL: Self = NodeId(u32::MAX);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> Index<NodeId> for Vec<T> {
    type Output = T;

    fn index(&self, index: NodeId) -> &Self::Output {
        &self[index.0 as usize]
    }
}

impl<T> IndexMut<NodeId> for Vec<T> {
    fn index_mut(&mut self, index: NodeId) -> &mut Self::Output {
        &mut self[index.0 as usize]
    }
}

#[derive(Clone, Debug, Default)]
struct NodeData {
    node_type: NodeType,
    output: bool,
    // What the fan-out currently counts for this node
    propagated: bool,
    active_inputs: u32,
    num_inputs: u32,
    next_update: NodeId,
    next_changed: NodeId,
}

/// Unit-delay, event-driven gate simulator.
///
/// A tick first propagates every output change of the previous tick into the
/// input counters of the fan-out, then re-evaluates the nodes whose counters
/// moved. Both work lists are singly linked through the node data so that
/// queueing never allocates.
#[derive(Default, Debug)]
pub struct Circuit {
    tick: Tick,
    node_children: Vec<Vec<NodeId>>,
    node_data: Vec<NodeData>,
    update_head: NodeId,
    changed_head: NodeId,
}

fn enqueue_changed(node_data: &mut [NodeData], changed_head: &mut NodeId, node_id: NodeId) {
    let data = &mut node_data[node_id.index()];
    if data.next_changed == NodeId::NULL {
        data.next_changed = *changed_head;
        *changed_head = node_id;
    }
}

impl Circuit {
    fn enqueue_update(&mut self, node_id: NodeId) {
        let node_data = &mut self.node_data[node_id];
        if node_data.next_update == NodeId::NULL {
            node_data.next_update = self.update_head;
            self.update_head = node_id;
        }
    }

    fn mark_changed(&mut self, node_id: NodeId) {
        enqueue_changed(&mut self.node_data, &mut self.changed_head, node_id);
    }

    fn propagate(&mut self) {
        let Self {
            node_children,
            node_data,
            update_head,
            changed_head,
            ..
        } = self;
        let mut node_id = std::mem::replace(update_head, NodeId::NULL);
        while node_id != NodeId::NULL {
            let data = &mut node_data[node_id.index()];
            let next_update = std::mem::replace(&mut data.next_update, NodeId::NULL);
            let output = data.output;
            if output != data.propagated {
                data.propagated = output;
                for child in node_children[node_id.index()].iter().copied() {
                    let child_data = &mut node_data[child.index()];
                    if output {
                        child_data.active_inputs += 1;
                    } else {
                        child_data.active_inputs -= 1;
                    }
                    enqueue_changed(node_data, changed_head, child);
                }
            }
            node_id = next_update;
        }
    }

    fn evaluate(&mut self) {
        let mut node_id = std::mem::replace(&mut self.changed_head, NodeId::NULL);
        while node_id != NodeId::NULL {
            let data = &mut self.node_data[node_id];
            let next_changed = std::mem::replace(&mut data.next_changed, NodeId::NULL);
            if data.node_type != NodeType::Input {
                let new_output = data.node_type.eval(data.active_inputs, data.num_inputs);
                if new_output != data.output {
                    data.output = new_output;
                    self.enqueue_update(node_id);
                }
            }
            node_id = next_changed;
        }
    }

    /// Run until no work is left, failing if that takes more than `max_ticks`.
    pub fn settle(&mut self, max_ticks: Ticks) -> Result<Ticks> {
        match self.run(max_ticks) {
            RunResult::Finished { after_ticks } => {
                trace!(after_ticks, tick = self.tick, "settled");
                Ok(after_ticks)
            }
            RunResult::ReachedMaxTicks { max_ticks } => {
                debug!(max_ticks, tick = self.tick, "circuit did not settle");
                Err(Error::Oscillation { max_ticks })
            }
        }
    }

    pub fn node_type(&self, node_id: NodeId) -> NodeType {
        self.node_data[node_id].node_type
    }
}

impl CircuitSim for Circuit {
    type NodeId = NodeId;

    fn new() -> Self {
        Self::default()
    }

    fn tick(&self) -> Tick {
        self.tick
    }

    fn num_nodes(&self) -> usize {
        self.node_data.len()
    }

    fn get_output(&self, node_id: NodeId) -> bool {
        self.node_data[node_id].output
    }

    fn work_left(&self) -> bool {
        self.update_head != NodeId::NULL || self.changed_head != NodeId::NULL
    }

    fn update(&mut self) {
        self.propagate();
        self.evaluate();
        self.tick += 1;
    }

    fn connect(&mut self, input: NodeId, output: NodeId) {
        assert!(
            self.node_data[output].node_type != NodeType::Input,
            "cannot drive input node {output:?}"
        );
        self.node_children[input].push(output);
        let active = self.node_data[input].propagated;
        let output_data = &mut self.node_data[output];
        output_data.num_inputs += 1;
        if active {
            output_data.active_inputs += 1;
        }
        self.mark_changed(output);
    }

    fn create_node(&mut self, node_type: NodeType) -> NodeId {
        let index = self.node_data.len();
        assert!(index < NodeId::NULL.index(), "reached null node id");
        let output = node_type.eval(0, 0);
        self.node_data.push(NodeData {
            node_type,
            output,
            propagated: output,
            ..Default::default()
        });
        self.node_children.push(Vec::new());
        NodeId(index as u32)
    }

    fn set_input(&mut self, node_id: NodeId, val: bool) {
        let node_data = &mut self.node_data[node_id];
        assert!(
            node_data.node_type == NodeType::Input,
            "{node_id:?} is not an input node"
        );
        if node_data.output != val {
            node_data.output = val;
            self.enqueue_update(node_id);
        }
    }

    fn preset(&mut self, node_id: NodeId, val: bool) {
        let node_data = &mut self.node_data[node_id];
        if node_data.output != val {
            node_data.output = val;
            self.enqueue_update(node_id);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn gate(circuit: &mut Circuit, node_type: NodeType, inputs: &[NodeId]) -> NodeId {
        let node = circuit.create_node(node_type);
        for input in inputs {
            circuit.connect(*input, node);
        }
        node
    }

    #[test]
    fn gate_truth_tables() {
        let cases = [
            (NodeType::Or, [false, true, true, true]),
            (NodeType::Nor, [true, false, false, false]),
            (NodeType::And, [false, false, false, true]),
            (NodeType::Nand, [true, true, true, false]),
            (NodeType::Xor, [false, true, true, false]),
            (NodeType::Xnor, [true, false, false, true]),
        ];
        for (node_type, expecteds) in cases {
            let mut circuit = Circuit::new();
            let a = circuit.create_input();
            let b = circuit.create_input();
            let out = gate(&mut circuit, node_type, &[a, b]);
            for (i, expected) in expecteds.into_iter().enumerate() {
                circuit.set_input(a, i & 2 != 0);
                circuit.set_input(b, i & 1 != 0);
                circuit.settle(100).unwrap();
                assert_eq!(circuit.get_output(out), expected, "{node_type:?} case {i}");
            }
        }
    }

    #[test]
    fn one_tick_per_gate() {
        let mut circuit = Circuit::new();
        let input = circuit.create_input();
        let mut last = input;
        for _ in 0..4 {
            last = gate(&mut circuit, NodeType::Or, &[last]);
        }
        circuit.settle(10).unwrap();
        circuit.set_input(input, true);
        // Four gate delays plus the tick that drains the last change
        assert_eq!(circuit.settle(10).unwrap(), 5);
        assert!(circuit.get_output(last));
    }

    #[test]
    fn odd_inverter_ring_oscillates() {
        let mut circuit = Circuit::new();
        let first = circuit.nor();
        let second = gate(&mut circuit, NodeType::Nor, &[first]);
        let third = gate(&mut circuit, NodeType::Nor, &[second]);
        circuit.connect(third, first);
        assert!(matches!(
            circuit.settle(1000),
            Err(Error::Oscillation { max_ticks: 1000 })
        ));
    }

    #[test]
    fn preset_latch_holds() {
        let mut circuit = Circuit::new();
        let set = circuit.create_input();
        let reset = circuit.create_input();
        let q = gate(&mut circuit, NodeType::Nor, &[reset]);
        let q_not = gate(&mut circuit, NodeType::Nor, &[set, q]);
        circuit.connect(q_not, q);
        circuit.preset(q, false);
        circuit.preset(q_not, true);
        circuit.settle(100).unwrap();
        assert!(!circuit.get_output(q));

        circuit.set_input(set, true);
        circuit.settle(100).unwrap();
        circuit.set_input(set, false);
        circuit.settle(100).unwrap();
        assert!(circuit.get_output(q));

        circuit.set_input(reset, true);
        circuit.settle(100).unwrap();
        circuit.set_input(reset, false);
        circuit.settle(100).unwrap();
        assert!(!circuit.get_output(q));
        assert!(circuit.get_output(q_not));
    }

    #[test]
    fn and_counts_late_connections() {
        let mut circuit = Circuit::new();
        let a = circuit.create_input();
        circuit.set_input(a, true);
        circuit.settle(10).unwrap();
        let out = gate(&mut circuit, NodeType::And, &[a]);
        circuit.settle(10).unwrap();
        assert!(circuit.get_output(out));
        let b = circuit.create_input();
        circuit.connect(b, out);
        circuit.settle(10).unwrap();
        assert!(!circuit.get_output(out));
    }

    #[test]
    fn unchanged_input_is_no_work() {
        let mut circuit = Circuit::new();
        let a = circuit.create_input();
        circuit.set_input(a, false);
        assert!(!circuit.work_left());
        assert_eq!(circuit.num_nodes(), 1);
    }
}
