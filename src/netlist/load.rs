use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use tracing::debug;

use crate::error::{Error, Result};

use super::{
    validate::{check_components, resolve_wires, Connection},
    ComponentKind, Dir, Netlist, PortSpec,
};

impl Netlist {
    pub fn from_path(path: &Path) -> Result<Netlist> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut netlist: Netlist = serde_json::from_str(&text).map_err(|source| Error::Json {
            path: path.to_path_buf(),
            source,
        })?;
        if netlist.name.is_empty() {
            netlist.name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(netlist)
    }
}

/// An external pin of a netlist: an `input` or `output` component.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pin {
    pub name: String,
    pub dir: Dir,
    pub width: usize,
}

/// A loaded and validated netlist with its subcircuits resolved.
#[derive(Debug)]
pub struct Definition {
    pub path: PathBuf,
    pub netlist: Netlist,
    /// Ports of each component, indexed like `netlist.components`.
    pub ports: Vec<Vec<PortSpec>>,
    pub subcircuits: HashMap<usize, Rc<Definition>>,
    pub connections: Vec<Connection>,
}

impl Definition {
    pub fn name(&self) -> &str {
        &self.netlist.name
    }

    pub fn pins(&self) -> Vec<Pin> {
        self.netlist
            .components
            .iter()
            .filter_map(|component| match component.kind {
                ComponentKind::Input { width } => Some(Pin {
                    name: component.name.clone(),
                    dir: Dir::In,
                    width,
                }),
                ComponentKind::Output { width } => Some(Pin {
                    name: component.name.clone(),
                    dir: Dir::Out,
                    width,
                }),
                _ => None,
            })
            .collect()
    }
}

/// Loads netlists and caches them by canonical path, so a subcircuit used
/// many times is parsed and validated once.
#[derive(Debug, Default)]
pub struct Library {
    cache: HashMap<PathBuf, Rc<Definition>>,
    loading: Vec<PathBuf>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Rc<Definition>> {
        let path = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
        if let Some(definition) = self.cache.get(&path) {
            return Ok(definition.clone());
        }
        if self.loading.contains(&path) {
            return Err(Error::ImportCycle { path });
        }
        self.loading.push(path.clone());
        let definition = self.load_uncached(&path);
        self.loading.pop();
        let definition = Rc::new(definition?);
        self.cache.insert(path, definition.clone());
        Ok(definition)
    }

    fn load_uncached(&mut self, path: &Path) -> Result<Definition> {
        debug!(path = %path.display(), "loading netlist");
        let netlist = Netlist::from_path(path)?;
        let names = check_components(&netlist.name, &netlist.components)?;

        let base = path.parent().unwrap_or(Path::new("."));
        let mut subcircuits = HashMap::new();
        let mut ports = Vec::with_capacity(netlist.components.len());
        for (index, component) in netlist.components.iter().enumerate() {
            match &component.kind {
                ComponentKind::Subcircuit { path: sub_path } => {
                    let sub = self.load(&base.join(sub_path))?;
                    ports.push(
                        sub.pins()
                            .into_iter()
                            .map(|pin| PortSpec {
                                name: pin.name,
                                dir: pin.dir,
                                width: pin.width,
                                floating_high: false,
                            })
                            .collect(),
                    );
                    subcircuits.insert(index, sub);
                }
                kind => ports.push(kind.ports()),
            }
        }

        let connections = resolve_wires(
            &netlist.name,
            &netlist.components,
            &ports,
            &names,
            &netlist.wires,
        )?;
        Ok(Definition {
            path: path.to_path_buf(),
            netlist,
            ports,
            subcircuits,
            connections,
        })
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use super::*;

    #[test]
    fn caches_and_detects_cycles() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("lib")).unwrap();
        fs::write(
            dir.path().join("lib/inv.json"),
            r#"{ "components": [
                { "name": "i", "kind": "input" },
                { "name": "n", "kind": "not" },
                { "name": "o", "kind": "output" } ],
              "wires": [ { "from": "i", "to": "n.in" }, { "from": "n.out", "to": "o" } ] }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("top.json"),
            r#"{ "name": "top", "components": [
                { "name": "u1", "kind": "subcircuit", "path": "lib/inv.json" },
                { "name": "u2", "kind": "subcircuit", "path": "lib/inv.json" } ],
              "wires": [ { "from": "u1.o", "to": "u2.i" } ] }"#,
        )
        .unwrap();

        let mut library = Library::new();
        let top = library.load(&dir.path().join("top.json")).unwrap();
        assert_eq!(top.name(), "top");
        assert!(Rc::ptr_eq(&top.subcircuits[&0], &top.subcircuits[&1]));
        assert_eq!(top.subcircuits[&0].name(), "inv");

        fs::write(
            dir.path().join("a.json"),
            r#"{ "components": [ { "name": "b", "kind": "subcircuit", "path": "b.json" } ] }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("b.json"),
            r#"{ "components": [ { "name": "a", "kind": "subcircuit", "path": "a.json" } ] }"#,
        )
        .unwrap();
        let err = library.load(&dir.path().join("a.json")).unwrap_err();
        assert!(matches!(err, Error::ImportCycle { .. }), "{err:?}");
    }

    #[test]
    fn missing_file() {
        let err = Library::new()
            .load(Path::new("/nonexistent/netsim.json"))
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
