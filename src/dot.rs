//! Graphviz (DOT) export for visual inspection of diagrams.

use std::fmt::Write;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Render the diagrams rooted at `roots` as a DOT digraph.
    ///
    /// Solid arrows are high edges, dashed arrows are low edges, and a
    /// dot on an arrowhead marks a complemented edge.
    pub fn to_dot(&self, roots: &[Ref]) -> String {
        let mut out = String::new();
        // Writing to a String cannot fail.
        let _ = self.write_dot(&mut out, roots);
        out
    }

    fn write_dot(&self, out: &mut impl Write, roots: &[Ref]) -> std::fmt::Result {
        writeln!(out, "digraph bdd {{")?;
        writeln!(out, "  node [shape=circle];")?;

        let mut nodes: Vec<u32> = self.descendants(roots.iter().copied()).into_iter().collect();
        nodes.sort();

        for &i in &nodes {
            if i == self.one.index() {
                writeln!(out, "  n{} [shape=square, label=\"1\"];", i)?;
            } else {
                writeln!(out, "  n{} [label=\"x{}\"];", i, self.variable(i))?;
            }
        }

        for (k, &root) in roots.iter().enumerate() {
            writeln!(out, "  r{} [shape=plaintext, label=\"f{}\"];", k, k)?;
            writeln!(
                out,
                "  r{} -> n{}{};",
                k,
                root.index(),
                if root.is_negated() { " [arrowhead=odot]" } else { "" }
            )?;
        }

        for &i in &nodes {
            if i == self.one.index() {
                continue;
            }
            for (child, style) in [(self.low(i), "dashed"), (self.high(i), "solid")] {
                writeln!(
                    out,
                    "  n{} -> n{} [style={}{}];",
                    i,
                    child.index(),
                    style,
                    if child.is_negated() { ", arrowhead=odot" } else { "" }
                )?;
            }
        }

        writeln!(out, "}}")
    }
}
