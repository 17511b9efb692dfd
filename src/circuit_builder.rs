use std::{cell::RefCell, rc::Rc};

use crate::circuit_sim::*;
use crate::{Circuit, InputId, NodeId};

pub trait BuilderHooks: Default {
    fn create_node_hook(&mut self, _node_id: NodeId) {}
    fn create_input_hook(&mut self, _input_id: InputId) {}
    fn connect_hook(&mut self, _input: NodeId, _output: NodeId) {}

    type MarkNodeArgs;
    fn mark_node(&mut self, _node_id: NodeId, _args: Self::MarkNodeArgs) {}
}

#[derive(Default)]
pub struct NoHooks;
impl BuilderHooks for NoHooks {
    type MarkNodeArgs = ();
}

pub type CircuitBuilder = CircuitBuilderWithHooks<NoHooks>;
pub type SharedBuilder<T> = Rc<RefCell<CircuitBuilderWithHooks<T>>>;

#[derive(Default)]
pub struct CircuitBuilderWithHooks<T: BuilderHooks> {
    pub circuit: Circuit,
    hooks: T,
}

impl<T: BuilderHooks> CircuitBuilderWithHooks<T> {
    pub fn shared() -> SharedBuilder<T> {
        Rc::new(RefCell::new(Self::default()))
    }

    fn create_node(&mut self, node_type: NodeType) -> NodeId {
        let node_id = self.circuit.create_node(node_type);
        self.hooks.create_node_hook(node_id);
        node_id
    }

    fn create_input(&mut self) -> InputId {
        let input_id = self.circuit.create_input();
        self.hooks.create_node_hook(input_id);
        self.hooks.create_input_hook(input_id);
        input_id
    }

    fn connect(&mut self, input: NodeId, output: NodeId) {
        self.circuit.connect(input, output);
        self.hooks.connect_hook(input, output);
    }

    fn mark_node(&mut self, node_id: NodeId, args: T::MarkNodeArgs) {
        self.hooks.mark_node(node_id, args);
    }

    pub fn build(&mut self) -> (&mut Circuit, &mut T) {
        (&mut self.circuit, &mut self.hooks)
    }
}

pub struct Connector<T: BuilderHooks> {
    builder: SharedBuilder<T>,
    pub output: NodeId,
}

impl<T: BuilderHooks> Connector<T> {
    fn from_output(builder: SharedBuilder<T>, output: NodeId) -> Self {
        Connector { builder, output }
    }

    /// A plain buffer node, low until something drives it.
    pub fn new(builder: SharedBuilder<T>) -> Self {
        let output = builder.borrow_mut().create_node(NodeType::Or);
        Self::from_output(builder, output)
    }

    pub fn input(builder: SharedBuilder<T>) -> (Self, InputId) {
        let input_id = builder.borrow_mut().create_input();
        (Self::from_output(builder, input_id), input_id)
    }

    pub fn input_ignore(builder: SharedBuilder<T>) -> Self {
        let (connector, _input_id) = Self::input(builder);
        connector
    }

    fn gate_gen(node_type: NodeType, inputs: &[&Self]) -> Self {
        assert!(!inputs.is_empty(), "{node_type:?} gate without inputs");
        let builder = inputs[0].builder.clone();
        let output = {
            let mut builder_mut = builder.borrow_mut();
            let output = builder_mut.create_node(node_type);
            for input in inputs {
                assert!(Rc::ptr_eq(&builder, &input.builder));
                builder_mut.connect(input.output, output);
            }
            output
        };
        Self::from_output(builder, output)
    }

    pub fn mark(&self, args: T::MarkNodeArgs) -> &Self {
        self.builder.borrow_mut().mark_node(self.output, args);
        self
    }

    pub fn invert(&self) -> Self {
        let inverter = {
            let mut builder_mut = self.builder.borrow_mut();
            let inverter = builder_mut.create_node(NodeType::Nor);
            builder_mut.connect(self.output, inverter);
            inverter
        };
        Self::from_output(self.builder.clone(), inverter)
    }

    pub fn connect(&self, output: &Connector<T>) {
        self.builder
            .borrow_mut()
            .connect(self.output, output.output);
    }

    /// Drive an input node, or preset the output of any other node.
    pub fn set(&self, val: bool) {
        let mut builder_mut = self.builder.borrow_mut();
        let circuit = &mut builder_mut.circuit;
        if circuit.node_type(self.output) == NodeType::Input {
            circuit.set_input(self.output, val);
        } else {
            circuit.preset(self.output, val);
        }
    }

    pub fn get_output(&self) -> bool {
        self.builder.borrow().circuit.get_output(self.output)
    }
}

/// Gate constructors over connectors. `gate!(kind, a, b, ...)` builds a gate
/// of any fan-in from connector expressions.
pub mod ops {
    use crate::circuit_sim::NodeType;

    use super::{BuilderHooks, Connector};

    pub use crate::gate;

    macro_rules! gate_fns {
        ( $( $name:ident => $node_type:ident ),+ ) => {
            $(
                pub fn $name<T: BuilderHooks>(inputs: Vec<&Connector<T>>) -> Connector<T> {
                    Connector::gate_gen(NodeType::$node_type, &inputs)
                }
            )+
        };
    }

    gate_fns!(or => Or, nor => Nor, and => And, nand => Nand, xor => Xor, xnor => Xnor);

    #[macro_export]
    macro_rules! gate {
        ( $kind:ident, $( $inputs:expr ),+ $(,)? ) => {
            $crate::circuit_builder::ops::$kind(vec![$( &$inputs ),+])
        };
    }
}
