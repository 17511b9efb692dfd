use std::fmt::Debug;
use std::hash::Hash;

pub type Tick = u64;
pub type Ticks = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunResult {
    Finished { after_ticks: Ticks },
    ReachedMaxTicks { max_ticks: Ticks },
}

/// Gate kinds understood by the engine. Every gate is symmetric in its inputs,
/// so a node only needs to know how many of its inputs are active.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum NodeType {
    #[default]
    Or,
    Nor,
    And,
    Nand,
    Xor,
    Xnor,
    /// Driven from outside the circuit with [`CircuitSim::set_input`].
    Input,
}

impl NodeType {
    /// Output of a gate of this type given `active` of its `inputs` are high.
    pub fn eval(self, active: u32, inputs: u32) -> bool {
        match self {
            NodeType::Or => active != 0,
            NodeType::Nor => active == 0,
            NodeType::And => inputs != 0 && active == inputs,
            NodeType::Nand => !(inputs != 0 && active == inputs),
            NodeType::Xor => active % 2 == 1,
            NodeType::Xnor => active % 2 == 0,
            NodeType::Input => false,
        }
    }
}

pub trait CircuitSim {
    type NodeId: Clone + Copy + Eq + Hash + Debug;

    fn new() -> Self;

    fn tick(&self) -> Tick;
    fn num_nodes(&self) -> usize;
    fn get_output(&self, node_id: Self::NodeId) -> bool;
    fn work_left(&self) -> bool;

    fn update(&mut self);
    fn connect(&mut self, input: Self::NodeId, output: Self::NodeId);

    fn create_node(&mut self, node_type: NodeType) -> Self::NodeId;
    fn create_input(&mut self) -> Self::NodeId {
        self.create_node(NodeType::Input)
    }

    fn set_input(&mut self, node_id: Self::NodeId, val: bool);
    /// Force the output of a gate. Used to give feedback loops a defined
    /// starting state; the next evaluation of the gate may override it.
    fn preset(&mut self, node_id: Self::NodeId, val: bool);

    fn or(&mut self) -> Self::NodeId {
        self.create_node(NodeType::Or)
    }
    fn nor(&mut self) -> Self::NodeId {
        self.create_node(NodeType::Nor)
    }
    fn and(&mut self) -> Self::NodeId {
        self.create_node(NodeType::And)
    }
    fn nand(&mut self) -> Self::NodeId {
        self.create_node(NodeType::Nand)
    }
    fn xor(&mut self) -> Self::NodeId {
        self.create_node(NodeType::Xor)
    }
    fn xnor(&mut self) -> Self::NodeId {
        self.create_node(NodeType::Xnor)
    }

    fn run(&mut self, max_ticks: Ticks) -> RunResult {
        for ticks in 0..max_ticks {
            if self.work_left() {
                self.update();
            } else {
                return RunResult::Finished { after_ticks: ticks };
            };
        }
        if self.work_left() {
            RunResult::ReachedMaxTicks { max_ticks }
        } else {
            RunResult::Finished {
                after_ticks: max_ticks,
            }
        }
    }

    /// Never returns for a circuit that oscillates; prefer [`CircuitSim::run`].
    fn run_until_done(&mut self) {
        while self.work_left() {
            self.update();
        }
    }
}
