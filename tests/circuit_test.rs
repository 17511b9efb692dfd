#[cfg(test)]
mod test {
    use std::collections::BTreeMap;

    use netsim::{
        circuit_builder::{
            ops::*, BuilderHooks, CircuitBuilder, CircuitBuilderWithHooks, Connector, NoHooks,
        },
        circuit_sim::*,
        components::{
            adder::ripple_carry,
            wire::{mask, Wire},
        },
        Circuit, NodeId,
    };

    #[derive(Default, Debug)]
    struct Marks {
        marks: BTreeMap<String, NodeId>,
    }

    impl Marks {
        fn values(&self, circuit: &Circuit) -> Vec<(String, bool)> {
            self.marks
                .iter()
                .map(|(name, node_id)| (name.clone(), circuit.get_output(*node_id)))
                .collect()
        }
    }

    impl BuilderHooks for Marks {
        type MarkNodeArgs = String;

        fn mark_node(&mut self, node_id: NodeId, name: String) {
            self.marks.insert(name, node_id);
        }
    }

    #[test]
    fn inverter_series_test() {
        let builder = CircuitBuilderWithHooks::<Marks>::shared();
        Connector::new(builder.clone())
            .invert()
            .mark("1-output".to_string())
            .invert()
            .mark("2-output".to_string())
            .invert()
            .mark("3-output".to_string())
            .invert()
            .mark("4-output".to_string())
            .invert()
            .mark("5-output".to_string());
        let mut borrow = builder.borrow_mut();
        let (circuit, marks) = borrow.build();
        let ticks = circuit.settle(100).unwrap();
        assert!(ticks > 0 && ticks <= 10, "{ticks} ticks for five inverters");
        let values: Vec<bool> = marks.values(circuit).into_iter().map(|(_, v)| v).collect();
        assert_eq!(values, [true, false, true, false, true]);
    }

    fn gate_test_gen(
        name: &str,
        f: fn(Vec<&Connector<NoHooks>>) -> Connector<NoHooks>,
        expecteds: [bool; 4],
    ) {
        let builder = CircuitBuilder::shared();
        let (a, input_a) = Connector::input(builder.clone());
        let (b, input_b) = Connector::input(builder.clone());
        let out = f(vec![&a, &b]);
        let mut borrow = builder.borrow_mut();
        let (circuit, _) = borrow.build();
        let expecteds = [(false, false), (false, true), (true, false), (true, true)]
            .into_iter()
            .zip(expecteds);
        for ((in_a, in_b), expected) in expecteds {
            circuit.set_input(input_a, in_a);
            circuit.set_input(input_b, in_b);
            circuit.settle(100).unwrap();
            let result = circuit.get_output(out.output);
            assert_eq!(result, expected, "{in_a} {name} {in_b} = {expected}");
        }
    }

    #[test]
    fn gate_tests() {
        gate_test_gen("or", or, [false, true, true, true]);
        gate_test_gen("nor", nor, [true, false, false, false]);
        gate_test_gen("and", and, [false, false, false, true]);
        gate_test_gen("nand", nand, [true, true, true, false]);
        gate_test_gen("xor", xor, [false, true, true, false]);
        gate_test_gen("xnor", xnor, [true, false, false, true]);
    }

    #[test]
    fn three_input_parity() {
        let builder = CircuitBuilder::shared();
        let inputs: Vec<_> = (0..3).map(|_| Connector::input(builder.clone())).collect();
        let parity = gate!(xor, inputs[0].0, inputs[1].0, inputs[2].0);
        let mut borrow = builder.borrow_mut();
        let (circuit, _) = borrow.build();
        for value in 0..8u32 {
            for (bit, (_, input_id)) in inputs.iter().enumerate() {
                circuit.set_input(*input_id, value & (1 << bit) != 0);
            }
            circuit.settle(100).unwrap();
            assert_eq!(circuit.get_output(parity.output), value.count_ones() % 2 == 1);
        }
    }

    #[test]
    fn ignored_input_runs_until_done() {
        let builder = CircuitBuilder::shared();
        let input = Connector::input_ignore(builder.clone());
        let out = input.invert().invert();
        input.set(true);
        let mut borrow = builder.borrow_mut();
        let (circuit, _) = borrow.build();
        assert!(circuit.work_left());
        circuit.run_until_done();
        assert!(!circuit.work_left());
        assert!(circuit.get_output(out.output));
    }

    #[test]
    fn wide_adder_on_the_raw_circuit() {
        let mut circuit = Circuit::new();
        let a = Wire::inputs(&mut circuit, 32);
        let b = Wire::inputs(&mut circuit, 32);
        let cin = circuit.create_input();
        let (sum, cout) = ripple_carry(&mut circuit, &a, &b, cin);
        let cases = [
            (0u64, 0u64, false),
            (1, 2, false),
            (0xffff_ffff, 1, false),
            (0x8000_0000, 0x8000_0000, true),
            (0x1234_5678, 0x0fed_cba9, true),
        ];
        for (x, y, carry) in cases {
            a.set(&mut circuit, x);
            b.set(&mut circuit, y);
            circuit.set_input(cin, carry);
            circuit.settle(10_000).unwrap();
            let total = x + y + carry as u64;
            assert_eq!(sum.read::<u64>(&circuit), total & mask(32), "{x:#x} + {y:#x} + {carry}");
            assert_eq!(circuit.get_output(cout), total >> 32 != 0);
        }
    }
}
