use std::path::{Path, PathBuf};

use netsim::{
    components::alu::AluOp,
    harness::{self, VectorTable},
    Design, Error,
};

fn fixture(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/project")
        .join(relative)
}

/// `addi rd, rs1, imm`
fn addi(rd: u64, rs1: u64, imm: i64) -> u64 {
    ((imm as u64 & 0xfff) << 20) | (rs1 << 15) | (rd << 7) | 0x13
}

#[test]
fn stepping_the_datapath_by_hand() {
    let mut cpu = Design::load(&fixture("cpu/cpu.json"), 100_000).unwrap();
    assert_eq!(cpu.name(), "cpu");
    assert_eq!(cpu.input_names(), ["instr"]);
    assert_eq!(cpu.output_names(), ["pc", "t0", "t1", "t2", "s0"]);
    assert!(cpu.has_clock());

    let program = [addi(5, 0, 100), addi(6, 5, -101), addi(7, 6, 0), addi(8, 8, 1)];
    for instr in program {
        cpu.set_input("instr", instr).unwrap();
        cpu.settle().unwrap();
        assert!(cpu.pulse_clock().unwrap() > 0);
    }
    assert_eq!(cpu.read_output("pc").unwrap(), 16);
    assert_eq!(cpu.read_output("t0").unwrap(), 100);
    assert_eq!(cpu.read_output("t1").unwrap(), 0xffff_ffff);
    assert_eq!(cpu.read_output("t2").unwrap(), 0xffff_ffff);
    assert_eq!(cpu.read_output("s0").unwrap(), 1);

    assert!(matches!(cpu.set_input("pc", 0), Err(Error::NotAnInput(_))));
    assert!(matches!(cpu.read_output("x9"), Err(Error::UnknownPin(_))));
}

#[test]
fn alu_harness_matches_the_reference_model() {
    let mut alu = Design::load(&fixture("harnesses/alu-harness.json"), 100_000).unwrap();
    assert!(!alu.has_clock());
    let operands = [(0u64, 0u64), (7, 3), (0x8000_0000, 31), (0xdead_beef, 0x1234_5678)];
    let mut csv = String::from("A,B,ALUSel,Result\n");
    for op in AluOp::ALL {
        for (a, b) in operands {
            csv.push_str(&format!("{a},{b},{},{}\n", op as u64, op.eval(a, b, 32)));
        }
    }
    let table = VectorTable::from_reader(csv.as_bytes()).unwrap();
    let report = harness::run(&mut alu, &table).unwrap();
    assert!(report.passed(), "{}", report.diff());
    assert_eq!(report.cycles, 0);
    assert_eq!(report.actual.rows.len(), AluOp::ALL.len() * operands.len());
}

#[test]
fn regfile_reads_back_every_named_register() {
    let mut regfile = Design::load(&fixture("harnesses/regfile-harness.json"), 100_000).unwrap();
    let named = [("ra", 1), ("sp", 2), ("t0", 5), ("t1", 6), ("t2", 7), ("s0", 8), ("s1", 9), ("a0", 10)];
    for (_, index) in named {
        regfile.set_input("rd", index).unwrap();
        regfile.set_input("write_data", 0x100 + index).unwrap();
        regfile.set_input("RegWEn", 1).unwrap();
        regfile.settle().unwrap();
        regfile.pulse_clock().unwrap();
    }
    regfile.set_input("RegWEn", 0).unwrap();
    for (name, index) in named {
        assert_eq!(regfile.read_output(name).unwrap(), 0x100 + index, "{name}");
        regfile.set_input("rs1", index).unwrap();
        regfile.set_input("rs2", 31 - index).unwrap();
        regfile.settle().unwrap();
        assert_eq!(regfile.read_output("read_data1").unwrap(), 0x100 + index);
        assert_eq!(regfile.read_output("read_data2").unwrap(), 0);
    }
}
