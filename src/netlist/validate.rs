use std::collections::HashMap;

use tracing::warn;

use crate::{
    components::wire::mask,
    error::{Error, Result},
};

use super::{
    endpoint::{is_identifier, Endpoint},
    Component, ComponentKind, Dir, PortSpec, WireSpec, MAX_WIDTH,
};

/// A resolved bit range of one component port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortRef {
    pub component: usize,
    pub port: usize,
    pub lo: usize,
    pub width: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Connection {
    pub from: PortRef,
    pub to: PortRef,
}

fn bad(netlist: &str, component: &Component, reason: impl Into<String>) -> Error {
    Error::BadComponent {
        netlist: netlist.to_string(),
        name: component.name.clone(),
        reason: reason.into(),
    }
}

/// Checks names and parameters, returning the name lookup table.
pub(crate) fn check_components<'a>(
    netlist: &str,
    components: &'a [Component],
) -> Result<HashMap<&'a str, usize>> {
    let mut names = HashMap::new();
    for (index, component) in components.iter().enumerate() {
        if !is_identifier(&component.name) {
            return Err(Error::InvalidName {
                netlist: netlist.to_string(),
                name: component.name.clone(),
            });
        }
        if names.insert(component.name.as_str(), index).is_some() {
            return Err(Error::DuplicateComponent {
                netlist: netlist.to_string(),
                name: component.name.clone(),
            });
        }
        check_parameters(netlist, component)?;
    }
    Ok(names)
}

fn check_parameters(netlist: &str, component: &Component) -> Result<()> {
    let width = match &component.kind {
        ComponentKind::Clock | ComponentKind::Subcircuit { .. } => return Ok(()),
        ComponentKind::Input { width }
        | ComponentKind::Output { width }
        | ComponentKind::Constant { width, .. }
        | ComponentKind::Not { width }
        | ComponentKind::Mux { width, .. }
        | ComponentKind::Adder { width }
        | ComponentKind::Register { width }
        | ComponentKind::Regfile { width, .. }
        | ComponentKind::Alu { width }
        | ComponentKind::Extend { width, .. }
        | ComponentKind::Rom { width, .. } => *width,
        ComponentKind::And(gate)
        | ComponentKind::Or(gate)
        | ComponentKind::Xor(gate)
        | ComponentKind::Nand(gate)
        | ComponentKind::Nor(gate)
        | ComponentKind::Xnor(gate) => {
            if !(1..=MAX_WIDTH).contains(&gate.inputs) {
                return Err(bad(netlist, component, format!("{} inputs", gate.inputs)));
            }
            gate.width
        }
    };
    if !(1..=MAX_WIDTH).contains(&width) {
        return Err(Error::BadWidth {
            netlist: netlist.to_string(),
            name: component.name.clone(),
            width,
        });
    }
    match &component.kind {
        ComponentKind::Constant { value, .. } if value & !mask(width) != 0 => Err(bad(
            netlist,
            component,
            format!("value {value:#x} does not fit in {width} bits"),
        )),
        ComponentKind::Mux { inputs, .. } if !(2..=MAX_WIDTH).contains(inputs) => {
            Err(bad(netlist, component, format!("{inputs} mux inputs")))
        }
        ComponentKind::Regfile { registers, .. } if !(2..=MAX_WIDTH).contains(registers) => {
            Err(bad(netlist, component, format!("{registers} registers")))
        }
        ComponentKind::Extend { to, .. } if !(1..=MAX_WIDTH).contains(to) => {
            Err(bad(netlist, component, format!("cannot extend to {to} bits")))
        }
        ComponentKind::Rom {
            addr_width,
            contents,
            ..
        } => {
            if !(1..=16).contains(addr_width) {
                Err(bad(netlist, component, format!("address width {addr_width}")))
            } else if contents.len() > 1 << addr_width {
                Err(bad(
                    netlist,
                    component,
                    format!("{} words do not fit {addr_width} address bits", contents.len()),
                ))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

struct Resolver<'a> {
    netlist: &'a str,
    components: &'a [Component],
    ports: &'a [Vec<PortSpec>],
    names: &'a HashMap<&'a str, usize>,
}

impl Resolver<'_> {
    fn resolve(&self, text: &str, want: Dir) -> Result<PortRef> {
        let netlist = self.netlist.to_string();
        let endpoint = Endpoint::parse(text).ok_or_else(|| Error::BadEndpoint {
            netlist: netlist.clone(),
            endpoint: text.to_string(),
        })?;
        let component =
            *self
                .names
                .get(endpoint.component.as_str())
                .ok_or_else(|| Error::UnknownComponent {
                    netlist: netlist.clone(),
                    name: endpoint.component.clone(),
                })?;
        let ports = &self.ports[component];
        let port = match &endpoint.port {
            Some(name) => ports.iter().position(|p| &p.name == name).ok_or_else(|| {
                Error::UnknownPort {
                    netlist: netlist.clone(),
                    component: endpoint.component.clone(),
                    port: name.clone(),
                }
            })?,
            None if ports.len() == 1 => 0,
            None => {
                return Err(Error::AmbiguousPort {
                    netlist,
                    endpoint: text.to_string(),
                    component: self.components[component].name.clone(),
                })
            }
        };
        let spec = &ports[port];
        if spec.dir != want {
            return Err(Error::Direction {
                netlist,
                endpoint: text.to_string(),
                role: if want == Dir::Out { "source" } else { "sink" },
            });
        }
        let (hi, lo) = endpoint.bits.unwrap_or((spec.width - 1, 0));
        if hi < lo || hi >= spec.width {
            return Err(Error::BitRange {
                netlist,
                endpoint: text.to_string(),
                hi,
                lo,
                width: spec.width,
            });
        }
        Ok(PortRef {
            component,
            port,
            lo,
            width: hi - lo + 1,
        })
    }
}

/// Resolves every wire and checks directions, widths and single drivers.
pub(crate) fn resolve_wires(
    netlist: &str,
    components: &[Component],
    ports: &[Vec<PortSpec>],
    names: &HashMap<&str, usize>,
    wires: &[WireSpec],
) -> Result<Vec<Connection>> {
    let resolver = Resolver {
        netlist,
        components,
        ports,
        names,
    };
    let mut driven: HashMap<(usize, usize), u64> = HashMap::new();
    let mut connections = Vec::with_capacity(wires.len());
    for wire in wires {
        let from = resolver.resolve(&wire.from, Dir::Out)?;
        let to = resolver.resolve(&wire.to, Dir::In)?;
        if from.width != to.width {
            return Err(Error::WidthMismatch {
                netlist: netlist.to_string(),
                from: wire.from.clone(),
                to: wire.to.clone(),
                from_width: from.width,
                to_width: to.width,
            });
        }
        let bits = mask(to.width) << to.lo;
        let seen = driven.entry((to.component, to.port)).or_default();
        if *seen & bits != 0 {
            return Err(Error::MultipleDrivers {
                netlist: netlist.to_string(),
                endpoint: wire.to.clone(),
                bit: (*seen & bits).trailing_zeros() as usize,
            });
        }
        *seen |= bits;
        connections.push(Connection { from, to });
    }

    for (index, component) in components.iter().enumerate() {
        if let ComponentKind::Output { width } = component.kind {
            let seen = driven.get(&(index, 0)).copied().unwrap_or(0);
            if seen != mask(width) {
                warn!(netlist, pin = %component.name, "output pin is not fully driven");
            }
        }
    }
    Ok(connections)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::netlist::Netlist;

    fn check(json: &str) -> Result<Vec<Connection>> {
        let netlist: Netlist = serde_json::from_str(json).unwrap();
        let names = check_components("test", &netlist.components)?;
        let ports: Vec<_> = netlist.components.iter().map(|c| c.kind.ports()).collect();
        resolve_wires("test", &netlist.components, &ports, &names, &netlist.wires)
    }

    const PARTS: &str = r#"
        { "name": "a", "kind": "input", "width": 8 },
        { "name": "b", "kind": "input", "width": 4 },
        { "name": "g", "kind": "and", "width": 4 },
        { "name": "y", "kind": "output", "width": 4 }"#;

    fn with_wires(wires: &str) -> String {
        format!(r#"{{ "components": [{PARTS}], "wires": [{wires}] }}"#)
    }

    #[test]
    fn resolves_slices() {
        let connections = check(&with_wires(
            r#"{ "from": "a[7:4]", "to": "g.in0" },
               { "from": "b", "to": "g.in1" },
               { "from": "g", "to": "y" }"#,
        ))
        .unwrap();
        assert_eq!(
            connections[0].from,
            PortRef {
                component: 0,
                port: 0,
                lo: 4,
                width: 4
            }
        );
        assert_eq!(connections[2].to.component, 3);
    }

    #[test]
    fn rejects_bad_wires() {
        let cases = [
            (r#"{ "from": "a", "to": "g.in0" }"#, "WidthMismatch"),
            (r#"{ "from": "b", "to": "g" }"#, "AmbiguousPort"),
            (r#"{ "from": "y", "to": "g.in0" }"#, "Direction"),
            (r#"{ "from": "b", "to": "a" }"#, "Direction"),
            (r#"{ "from": "a[8:5]", "to": "g.in0" }"#, "BitRange"),
            (r#"{ "from": "zz", "to": "g.in0" }"#, "UnknownComponent"),
            (r#"{ "from": "b", "to": "g.in7" }"#, "UnknownPort"),
            (r#"{ "from": "b[", "to": "g.in0" }"#, "BadEndpoint"),
            (
                r#"{ "from": "b", "to": "g.in0" }, { "from": "a[3:0]", "to": "g.in0" }"#,
                "MultipleDrivers",
            ),
        ];
        for (wires, expected) in cases {
            let err = check(&with_wires(wires)).unwrap_err();
            assert!(format!("{err:?}").starts_with(expected), "{wires}: {err:?}");
        }
    }

    #[test]
    fn partial_drivers_may_share_a_port() {
        check(&with_wires(
            r#"{ "from": "a[1:0]", "to": "y[1:0]" }, { "from": "a[7:6]", "to": "y[3:2]" }"#,
        ))
        .unwrap();
    }

    #[test]
    fn rejects_bad_components() {
        let cases = [
            (r#"{ "name": "a", "kind": "input" }, { "name": "a", "kind": "output" }"#, "DuplicateComponent"),
            (r#"{ "name": "a.b", "kind": "input" }"#, "InvalidName"),
            (r#"{ "name": "w", "kind": "input", "width": 65 }"#, "BadWidth"),
            (r#"{ "name": "w", "kind": "not", "width": 0 }"#, "BadWidth"),
            (r#"{ "name": "k", "kind": "constant", "width": 4, "value": 16 }"#, "BadComponent"),
            (r#"{ "name": "m", "kind": "mux", "inputs": 1 }"#, "BadComponent"),
            (
                r#"{ "name": "r", "kind": "rom", "addr_width": 1, "contents": [1, 2, 3] }"#,
                "BadComponent",
            ),
        ];
        for (components, expected) in cases {
            let err = check(&format!(r#"{{ "components": [{components}] }}"#)).unwrap_err();
            assert!(format!("{err:?}").starts_with(expected), "{components}: {err:?}");
        }
    }
}
