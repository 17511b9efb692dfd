use crate::{
    circuit_sim::{CircuitSim, NodeType},
    Circuit,
};

use super::wire::{mask, Wire};

/// Read-only memory holding `contents`, one word per address.
///
/// Every data bit is an Or over the decoded word lines whose word has that bit
/// set, so addresses past the end of `contents` read 0.
pub fn create_rom(circuit: &mut Circuit, address: &Wire, width: usize, contents: &[u64]) -> Wire {
    let lines = address.decode(circuit, contents.len());
    let data = Wire::from_nodes(
        (0..width)
            .map(|_| circuit.create_node(NodeType::Or))
            .collect(),
    );
    for (line, word) in lines.iter().zip(contents) {
        let word = word & mask(width);
        for bit in 0..width {
            if word >> bit & 1 == 1 {
                circuit.connect(*line, data.bit(bit));
            }
        }
    }
    data
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn reads_words() {
        let mut circuit = Circuit::new();
        let address = Wire::inputs(&mut circuit, 3);
        let contents = [0x00500293, 0x00728313, 0xfff30393, 0x1_0000_0001];
        let data = create_rom(&mut circuit, &address, 32, &contents);
        for addr in 0..8u64 {
            address.set(&mut circuit, addr);
            circuit.settle(100).unwrap();
            let expected = contents.get(addr as usize).map_or(0, |w| w & mask(32));
            assert_eq!(data.read::<u64>(&circuit), expected, "address {addr}");
        }
    }
}
