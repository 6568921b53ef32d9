use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::network::CapacityNetwork;
use crate::types::CapacityResult;

impl CapacityNetwork {
    /// Render the residual graph as a Graphviz `digraph`, one edge per arena
    /// slot labeled with its current capacity.
    pub fn dot_string(&self) -> String {
        let mut out = String::from("digraph capacity {\n");
        for node in 0..self.num_nodes() {
            let _ = writeln!(out, "  {node};");
        }
        for (from, to, weight) in self.weights() {
            let _ = writeln!(out, "  {from} -> {to} [label=\"{weight}\"];");
        }
        out.push_str("}\n");
        out
    }

    /// Write [`CapacityNetwork::dot_string`] to `path`, truncating any
    /// existing file.
    pub fn to_dot<P: AsRef<Path>>(&self, path: P) -> CapacityResult<()> {
        fs::write(path, self.dot_string())?;
        Ok(())
    }
}
