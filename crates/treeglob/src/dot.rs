//! GraphViz rendering of the compiled automaton.

use std::collections::VecDeque;
use std::io::{self, Write};

use crate::nfa::StateSet;
use crate::pattern::Pattern;

impl Pattern {
    /// Write the automaton as a GraphViz digraph.
    ///
    /// Accept states render as double circles. States in `highlights` are
    /// filled green, which makes a live state set from
    /// [`Pattern::advance`] visible mid-match. Fully literal patterns
    /// render as a single edge labelled with the path.
    pub fn write_dot(&self, w: &mut dyn Write, highlights: Option<&StateSet>) -> io::Result<()> {
        writeln!(w, "digraph {{")?;
        writeln!(w, "\trankdir=LR;")?;
        writeln!(w, "\tinitial [label=\"\", style=invis];")?;

        let Some(initial) = self.initial else {
            writeln!(w, "\tterminal [label=\"\", shape=doublecircle];")?;
            writeln!(
                w,
                "\tinitial -> terminal [label=\"{}\"];",
                escape_label(&self.root)
            )?;
            return writeln!(w, "}}");
        };

        writeln!(
            w,
            "\tinitial -> state_{} [label=\"{}\"];",
            initial.index(),
            escape_label(&self.root)
        )?;

        let mut seen = vec![false; self.nfa.len()];
        seen[initial.index()] = true;
        let mut queue = VecDeque::from([initial]);
        while let Some(id) = queue.pop_front() {
            let state = self.nfa.state(id);
            let shape = if state.accept { "doublecircle" } else { "circle" };
            let fill = match highlights {
                Some(set) if set.contains(&id) => "green",
                _ => "white",
            };
            writeln!(
                w,
                "\tstate_{} [label=\"\", shape={shape}, style=filled, fillcolor={fill}];",
                id.index()
            )?;
            for edge in &state.out {
                let label = match &edge.expr {
                    Some(expr) => expr.to_string(),
                    None => "ε".to_string(),
                };
                writeln!(
                    w,
                    "\tstate_{} -> state_{} [label=\"{}\"];",
                    id.index(),
                    edge.target.index(),
                    escape_label(&label)
                )?;
                if !seen[edge.target.index()] {
                    seen[edge.target.index()] = true;
                    queue.push_back(edge.target);
                }
            }
        }
        writeln!(w, "}}")
    }
}

fn escape_label(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}
