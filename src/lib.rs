pub mod circuit_builder;
pub mod circuit_sim;
pub mod components;
pub mod config;
pub mod dispatch;
pub mod elaborate;
pub mod error;
pub mod harness;
pub mod logging;
pub mod netlist;
pub mod python;
pub mod runner;

mod circuit;
pub use circuit::Circuit;
pub use config::Config;
pub use elaborate::Design;
pub use error::{Error, Result};
pub type NodeId = <Circuit as circuit_sim::CircuitSim>::NodeId;
pub type InputId = NodeId;
