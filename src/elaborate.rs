//! Flattens a netlist, subcircuits included, into one gate-level [`Circuit`].

use std::{collections::HashMap, path::Path};

use tracing::{debug, trace};

use crate::{
    circuit_sim::{CircuitSim, NodeType, Ticks},
    components::{
        adder::ripple_carry,
        alu::create_alu,
        memory::{RegFile, RegFilePorts, Register},
        mux::create_n_to_1_mux,
        rom::create_rom,
        wire::{mask, Wire},
    },
    error::{Error, Result},
    netlist::{ComponentKind, Definition, Dir, Gate, Library},
    Circuit, NodeId,
};

struct Elaborator<'a> {
    circuit: &'a mut Circuit,
    clock: Option<NodeId>,
}

#[derive(Default)]
struct Instance {
    inputs: Vec<(String, Wire)>,
    outputs: Vec<(String, Wire)>,
}

impl Elaborator<'_> {
    fn clock(&mut self) -> NodeId {
        match self.clock {
            Some(clock) => clock,
            None => {
                let clock = self.circuit.create_input();
                self.clock = Some(clock);
                clock
            }
        }
    }

    /// Builds one instance of `definition`. Input pins read from `bindings`
    /// when given, otherwise they become engine inputs.
    fn instance(&mut self, definition: &Definition, bindings: Option<&HashMap<String, Wire>>) -> Instance {
        let components = &definition.netlist.components;
        let sinks: Vec<Vec<Wire>> = definition
            .ports
            .iter()
            .map(|ports| {
                ports
                    .iter()
                    .map(|port| match port.dir {
                        Dir::In => Wire::new(self.circuit, port.width),
                        Dir::Out => Wire::default(),
                    })
                    .collect()
            })
            .collect();

        let mut instance = Instance::default();
        let mut sources: Vec<Vec<Wire>> = Vec::with_capacity(components.len());
        for (index, component) in components.iter().enumerate() {
            let ins = &sinks[index];
            let outs = match &component.kind {
                ComponentKind::Input { width } => {
                    let wire = match bindings.and_then(|b| b.get(&component.name)) {
                        Some(wire) => wire.clone(),
                        None => Wire::inputs(self.circuit, *width),
                    };
                    instance.inputs.push((component.name.clone(), wire.clone()));
                    vec![wire]
                }
                ComponentKind::Output { .. } => {
                    instance
                        .outputs
                        .push((component.name.clone(), ins[0].clone()));
                    vec![Wire::default()]
                }
                ComponentKind::Clock => vec![Wire::from_nodes(vec![self.clock()])],
                ComponentKind::Constant { width, value } => {
                    vec![Wire::constant(self.circuit, *width, *value)]
                }
                ComponentKind::Not { .. } => vec![Wire::default(), ins[0].not(self.circuit)],
                ComponentKind::Mux { inputs, .. } => {
                    let out = create_n_to_1_mux(self.circuit, &ins[..*inputs], &ins[*inputs]);
                    pad(*inputs + 1, out)
                }
                ComponentKind::Adder { .. } => {
                    let (sum, cout) = ripple_carry(self.circuit, &ins[0], &ins[1], ins[2].bit(0));
                    vec![
                        Wire::default(),
                        Wire::default(),
                        Wire::default(),
                        sum,
                        Wire::from_nodes(vec![cout]),
                    ]
                }
                ComponentKind::Register { .. } => {
                    let register =
                        Register::new(self.circuit, &ins[0], ins[1].bit(0), Some(ins[2].bit(0)));
                    pad(3, register.q)
                }
                ComponentKind::Regfile { registers, .. } => {
                    let regfile = RegFile::new(
                        self.circuit,
                        RegFilePorts {
                            rs1: &ins[0],
                            rs2: &ins[1],
                            rd: &ins[2],
                            wdata: &ins[3],
                            wen: ins[4].bit(0),
                            clock: ins[5].bit(0),
                        },
                        *registers,
                    );
                    let mut outs = vec![Wire::default(); 6];
                    outs.push(regfile.rd1);
                    outs.push(regfile.rd2);
                    outs.extend(regfile.registers);
                    outs
                }
                ComponentKind::Alu { .. } => {
                    pad(3, create_alu(self.circuit, &ins[0], &ins[1], &ins[2]))
                }
                ComponentKind::Extend { to, signed, .. } => {
                    pad(1, ins[0].extend(self.circuit, *to, *signed))
                }
                ComponentKind::Rom {
                    width, contents, ..
                } => pad(1, create_rom(self.circuit, &ins[0], *width, contents)),
                ComponentKind::Subcircuit { .. } => {
                    let sub = &definition.subcircuits[&index];
                    let ports = &definition.ports[index];
                    let bindings: HashMap<String, Wire> = ports
                        .iter()
                        .zip(ins)
                        .filter(|(port, _)| port.dir == Dir::In)
                        .map(|(port, wire)| (port.name.clone(), wire.clone()))
                        .collect();
                    let mut child = self.instance(sub, Some(&bindings));
                    ports
                        .iter()
                        .map(|port| match port.dir {
                            Dir::In => Wire::default(),
                            Dir::Out => child
                                .outputs
                                .iter_mut()
                                .find(|(name, _)| *name == port.name)
                                .map(|(_, wire)| std::mem::take(wire))
                                .unwrap_or_default(),
                        })
                        .collect()
                }
                ComponentKind::And(gate) => self.gates(NodeType::And, gate, ins),
                ComponentKind::Or(gate) => self.gates(NodeType::Or, gate, ins),
                ComponentKind::Xor(gate) => self.gates(NodeType::Xor, gate, ins),
                ComponentKind::Nand(gate) => self.gates(NodeType::Nand, gate, ins),
                ComponentKind::Nor(gate) => self.gates(NodeType::Nor, gate, ins),
                ComponentKind::Xnor(gate) => self.gates(NodeType::Xnor, gate, ins),
            };
            sources.push(outs);
        }

        let mut driven: HashMap<(usize, usize), u64> = HashMap::new();
        for connection in &definition.connections {
            let (from, to) = (connection.from, connection.to);
            let source = sources[from.component][from.port].slice(from.lo, from.width);
            let sink = sinks[to.component][to.port].slice(to.lo, to.width);
            source.connect(self.circuit, &sink);
            *driven.entry((to.component, to.port)).or_default() |= mask(to.width) << to.lo;
        }

        for (component, ports) in definition.ports.iter().enumerate() {
            for (port, spec) in ports.iter().enumerate() {
                if !spec.floating_high {
                    continue;
                }
                let seen = driven.get(&(component, port)).copied().unwrap_or(0);
                let wire = &sinks[component][port];
                for bit in (0..spec.width).filter(|bit| seen >> bit & 1 == 0) {
                    let high = self.circuit.create_node(NodeType::Nor);
                    self.circuit.connect(high, wire.bit(bit));
                }
            }
        }
        trace!(netlist = definition.name(), "instantiated");
        instance
    }

    /// One gate per bit, fed by the same bit of every input port.
    fn gates(&mut self, node_type: NodeType, gate: &Gate, ins: &[Wire]) -> Vec<Wire> {
        let out = Wire::from_nodes(
            (0..gate.width)
                .map(|bit| {
                    let node = self.circuit.create_node(node_type);
                    for input in &ins[..gate.inputs] {
                        self.circuit.connect(input.bit(bit), node);
                    }
                    node
                })
                .collect(),
        );
        pad(gate.inputs, out)
    }
}

/// Output wires of a primitive sit after its `inputs` sink ports.
fn pad(inputs: usize, out: Wire) -> Vec<Wire> {
    let mut outs = vec![Wire::default(); inputs];
    outs.push(out);
    outs
}

/// A netlist elaborated into a running circuit, driven and sampled by pin name.
pub struct Design {
    name: String,
    circuit: Circuit,
    inputs: Vec<(String, Wire)>,
    outputs: Vec<(String, Wire)>,
    clock: Option<NodeId>,
    max_ticks: Ticks,
}

impl Design {
    pub fn load(path: &Path, max_ticks: Ticks) -> Result<Design> {
        let definition = Library::new().load(path)?;
        Design::elaborate(&definition, max_ticks)
    }

    /// Builds the circuit and lets it settle into its power-on state.
    pub fn elaborate(definition: &Definition, max_ticks: Ticks) -> Result<Design> {
        let mut circuit = Circuit::new();
        let mut elaborator = Elaborator {
            circuit: &mut circuit,
            clock: None,
        };
        let instance = elaborator.instance(definition, None);
        let clock = elaborator.clock;
        let mut design = Design {
            name: definition.name().to_string(),
            circuit,
            inputs: instance.inputs,
            outputs: instance.outputs,
            clock,
            max_ticks,
        };
        let ticks = design.settle()?;
        debug!(
            design = %design.name,
            nodes = design.circuit.num_nodes(),
            ticks,
            "elaborated"
        );
        Ok(design)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn input_names(&self) -> Vec<&str> {
        self.inputs.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|(name, _)| name.as_str()).collect()
    }

    fn pin(&self, name: &str) -> Result<&Wire> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .find(|(pin, _)| pin == name)
            .map(|(_, wire)| wire)
            .ok_or_else(|| Error::UnknownPin(name.to_string()))
    }

    pub fn is_input(&self, name: &str) -> bool {
        self.inputs.iter().any(|(pin, _)| pin == name)
    }

    pub fn width_of(&self, name: &str) -> Result<usize> {
        Ok(self.pin(name)?.width())
    }

    /// Drives an input pin. Bits above the pin width are ignored.
    pub fn set_input(&mut self, name: &str, value: u64) -> Result<()> {
        let wire = match self.inputs.iter().find(|(pin, _)| pin == name) {
            Some((_, wire)) => wire,
            None if self.outputs.iter().any(|(pin, _)| pin == name) => {
                return Err(Error::NotAnInput(name.to_string()))
            }
            None => return Err(Error::UnknownPin(name.to_string())),
        };
        wire.set(&mut self.circuit, value & mask(wire.width()));
        Ok(())
    }

    /// Current value of any pin.
    pub fn read_output(&self, name: &str) -> Result<u64> {
        Ok(self.pin(name)?.read::<u64>(&self.circuit))
    }

    pub fn has_clock(&self) -> bool {
        self.clock.is_some()
    }

    pub fn settle(&mut self) -> Result<Ticks> {
        self.circuit.settle(self.max_ticks)
    }

    /// One full clock period: rising edge, settle, falling edge, settle.
    pub fn pulse_clock(&mut self) -> Result<Ticks> {
        let Some(clock) = self.clock else {
            return Ok(0);
        };
        self.circuit.set_input(clock, true);
        let high = self.settle()?;
        self.circuit.set_input(clock, false);
        let low = self.settle()?;
        Ok(high + low)
    }
}
