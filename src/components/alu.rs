use crate::{
    circuit_sim::{CircuitSim, NodeType},
    Circuit, NodeId,
};

use super::{
    adder::{ripple_carry, subtract},
    mux::{create_n_to_1_mux, mux2},
    wire::{mask, select_bits, Wire},
};

pub const SELECT_WIDTH: usize = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluOp {
    Add = 0,
    Sll = 1,
    Slt = 2,
    Xor = 4,
    Srl = 5,
    Or = 6,
    And = 7,
    Mul = 8,
    Sub = 12,
    Sra = 13,
    BSel = 15,
}

impl AluOp {
    pub const ALL: [AluOp; 11] = [
        AluOp::Add,
        AluOp::Sll,
        AluOp::Slt,
        AluOp::Xor,
        AluOp::Srl,
        AluOp::Or,
        AluOp::And,
        AluOp::Mul,
        AluOp::Sub,
        AluOp::Sra,
        AluOp::BSel,
    ];

    pub fn from_code(code: u64) -> Option<AluOp> {
        AluOp::ALL.into_iter().find(|op| *op as u64 == code)
    }

    /// Reference result for `width`-bit operands.
    pub fn eval(self, a: u64, b: u64, width: usize) -> u64 {
        let a = a & mask(width);
        let b = b & mask(width);
        let shift = (b & mask(select_bits(width))) as u32;
        let signed = |v: u64| {
            let unused = 64 - width as u32;
            ((v << unused) as i64) >> unused
        };
        let result = match self {
            AluOp::Add => a.wrapping_add(b),
            AluOp::Sll => a.checked_shl(shift).unwrap_or(0),
            AluOp::Slt => (signed(a) < signed(b)) as u64,
            AluOp::Xor => a ^ b,
            AluOp::Srl => a.checked_shr(shift).unwrap_or(0),
            AluOp::Or => a | b,
            AluOp::And => a & b,
            AluOp::Mul => a.wrapping_mul(b),
            AluOp::Sub => a.wrapping_sub(b),
            AluOp::Sra => (signed(a) >> shift.min(63)) as u64,
            AluOp::BSel => b,
        };
        result & mask(width)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Shift {
    Left,
    RightLogical,
    RightArithmetic,
}

/// Log-depth shifter: stage `k` moves by `2^k` when bit `k` of the amount is set.
fn barrel_shift(circuit: &mut Circuit, input: &Wire, amount: &Wire, shift: Shift, zero: NodeId) -> Wire {
    let width = input.width();
    let mut current = input.clone();
    for (stage, select) in amount.nodes().iter().copied().enumerate() {
        let distance = 1usize << stage;
        let fill = match shift {
            Shift::RightArithmetic => input.msb(),
            _ => zero,
        };
        let shifted = Wire::from_nodes(
            (0..width)
                .map(|bit| match shift {
                    Shift::Left if bit >= distance => current.bit(bit - distance),
                    Shift::Left => zero,
                    _ if bit + distance < width => current.bit(bit + distance),
                    _ => fill,
                })
                .collect(),
        );
        current = mux2(circuit, select, &current, &shifted);
    }
    current
}

/// Low `width` bits of the product, one ripple-carry row per multiplier bit.
fn multiply(circuit: &mut Circuit, a: &Wire, b: &Wire, zero: NodeId) -> Wire {
    let width = a.width();
    let partial = |circuit: &mut Circuit, row: usize| {
        Wire::from_nodes(
            (0..width)
                .map(|bit| {
                    if bit < row {
                        return zero;
                    }
                    let product = circuit.create_node(NodeType::And);
                    circuit.connect(a.bit(bit - row), product);
                    circuit.connect(b.bit(row), product);
                    product
                })
                .collect(),
        )
    };
    let mut sum = partial(circuit, 0);
    for row in 1..width {
        let addend = partial(circuit, row);
        sum = ripple_carry(circuit, &sum, &addend, zero).0;
    }
    sum
}

pub struct Alu {
    pub input_a: Wire,
    pub input_b: Wire,
    pub select: Wire,
    pub result: Wire,
}

impl Alu {
    /// An ALU with its own input pins.
    pub fn new(circuit: &mut Circuit, width: usize) -> Self {
        let input_a = Wire::inputs(circuit, width);
        let input_b = Wire::inputs(circuit, width);
        let select = Wire::inputs(circuit, SELECT_WIDTH);
        let result = create_alu(circuit, &input_a, &input_b, &select);
        Alu {
            input_a,
            input_b,
            select,
            result,
        }
    }
}

pub fn create_alu(circuit: &mut Circuit, a: &Wire, b: &Wire, select: &Wire) -> Wire {
    let width = a.width();
    assert!(width > 0 && width == b.width());
    assert_eq!(select.width(), SELECT_WIDTH);
    let zero = circuit.create_node(NodeType::Or);
    let zeros = Wire::constant(circuit, width, 0);
    let amount = b.slice(0, select_bits(width));

    let (sum, _) = ripple_carry(circuit, a, b, zero);
    let (difference, _) = subtract(circuit, a, b);
    let sll = barrel_shift(circuit, a, &amount, Shift::Left, zero);
    let srl = barrel_shift(circuit, a, &amount, Shift::RightLogical, zero);
    let sra = barrel_shift(circuit, a, &amount, Shift::RightArithmetic, zero);

    let signs_differ = circuit.create_node(NodeType::Xor);
    circuit.connect(a.msb(), signs_differ);
    circuit.connect(b.msb(), signs_differ);
    // Signs differ: a < b iff a is negative. Otherwise the difference cannot
    // overflow and its sign decides.
    let b_positive = circuit.create_node(NodeType::Nor);
    circuit.connect(b.msb(), b_positive);
    let a_negative = circuit.create_node(NodeType::And);
    circuit.connect(a.msb(), a_negative);
    circuit.connect(b_positive, a_negative);
    let signs_same = circuit.create_node(NodeType::Nor);
    circuit.connect(signs_differ, signs_same);
    let difference_negative = circuit.create_node(NodeType::And);
    circuit.connect(signs_same, difference_negative);
    circuit.connect(difference.msb(), difference_negative);
    let less = circuit.create_node(NodeType::Or);
    circuit.connect(a_negative, less);
    circuit.connect(difference_negative, less);
    let slt = Wire::from_nodes(
        std::iter::once(less)
            .chain(std::iter::repeat(zero).take(width - 1))
            .collect(),
    );

    let product = multiply(circuit, a, b, zero);
    let xor = a.xor(circuit, b);
    let or = a.or(circuit, b);
    let and = a.and(circuit, b);

    let mut results = vec![zeros; 1 << SELECT_WIDTH];
    for (op, result) in [
        (AluOp::Add, sum),
        (AluOp::Sll, sll),
        (AluOp::Slt, slt),
        (AluOp::Xor, xor),
        (AluOp::Srl, srl),
        (AluOp::Or, or),
        (AluOp::And, and),
        (AluOp::Mul, product),
        (AluOp::Sub, difference),
        (AluOp::Sra, sra),
        (AluOp::BSel, b.clone()),
    ] {
        results[op as usize] = result;
    }
    create_n_to_1_mux(circuit, &results, select)
}

#[cfg(test)]
mod test {
    use rand::{Rng, SeedableRng};

    use super::*;

    fn check(circuit: &mut Circuit, alu: &Alu, op: AluOp, a: u64, b: u64) {
        let width = alu.result.width();
        alu.input_a.set(circuit, a & mask(width));
        alu.input_b.set(circuit, b & mask(width));
        alu.select.set(circuit, op as u64);
        circuit.settle(100_000).unwrap();
        assert_eq!(
            alu.result.read::<u64>(circuit),
            op.eval(a, b, width),
            "{op:?} {a:#x} {b:#x}"
        );
    }

    #[test]
    fn reference_model() {
        assert_eq!(AluOp::Sub.eval(1, 2, 32), 0xffff_ffff);
        assert_eq!(AluOp::Slt.eval(0xffff_ffff, 1, 32), 1);
        assert_eq!(AluOp::Slt.eval(1, 0xffff_ffff, 32), 0);
        assert_eq!(AluOp::Sra.eval(0x8000_0000, 31, 32), 0xffff_ffff);
        assert_eq!(AluOp::Srl.eval(0x8000_0000, 31, 32), 1);
        assert_eq!(AluOp::Sll.eval(1, 33, 32), 2);
        assert_eq!(AluOp::Mul.eval(0x10000, 0x10000, 32), 0);
        assert_eq!(AluOp::from_code(3), None);
        assert_eq!(AluOp::from_code(15), Some(AluOp::BSel));
    }

    #[test]
    fn every_operation_8_bit() {
        let mut circuit = Circuit::new();
        let alu = Alu::new(&mut circuit, 8);
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        for op in AluOp::ALL {
            for (a, b) in [(0, 0), (0xff, 1), (0x80, 7), (0x7f, 0x80)] {
                check(&mut circuit, &alu, op, a, b);
            }
            for _ in 0..30 {
                check(&mut circuit, &alu, op, rng.gen(), rng.gen());
            }
        }
    }

    #[test]
    fn unused_codes_read_zero() {
        let mut circuit = Circuit::new();
        let alu = Alu::new(&mut circuit, 8);
        alu.input_a.set(&mut circuit, 0x5au8);
        alu.input_b.set(&mut circuit, 0x3cu8);
        for code in [3u8, 9, 10, 11, 14] {
            alu.select.set(&mut circuit, code);
            circuit.settle(100_000).unwrap();
            assert_eq!(alu.result.read::<u64>(&circuit), 0, "code {code}");
        }
    }

    #[test]
    fn word_sized() {
        let mut circuit = Circuit::new();
        let alu = Alu::new(&mut circuit, 32);
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        for op in AluOp::ALL {
            for _ in 0..5 {
                let a = rng.gen::<u32>() as u64;
                let b = rng.gen::<u32>() as u64;
                check(&mut circuit, &alu, op, a, b);
            }
        }
    }
}
