//! Read-only text views over a flow's steps

use flowcore::StepNode;
use std::fmt::Write as _;

const STEP_HEADER: &str = "Step";
const DEPS_HEADER: &str = "Dependencies";

/// Two-column table of step names and their comma-separated dependencies
pub(crate) fn step_table<'a>(steps: impl Iterator<Item = &'a StepNode>) -> String {
    let rows: Vec<(&str, String)> = steps
        .map(|node| (node.name(), node.dependencies().join(", ")))
        .collect();

    let name_width = rows
        .iter()
        .map(|(name, _)| name.chars().count())
        .chain(std::iter::once(STEP_HEADER.len()))
        .max()
        .unwrap_or_default();
    let deps_width = rows
        .iter()
        .map(|(_, deps)| deps.chars().count())
        .chain(std::iter::once(DEPS_HEADER.len()))
        .max()
        .unwrap_or_default();

    let border = format!("+-{}-+-{}-+", "-".repeat(name_width), "-".repeat(deps_width));
    let mut out = String::new();
    let _ = writeln!(out, "{}", border);
    let _ = writeln!(out, "| {:<name_width$} | {:<deps_width$} |", STEP_HEADER, DEPS_HEADER);
    let _ = writeln!(out, "{}", border);
    for (name, deps) in &rows {
        let _ = writeln!(out, "| {:<name_width$} | {:<deps_width$} |", name, deps);
    }
    let _ = write!(out, "{}", border);
    out
}

/// DOT digraph: one node statement per step, one edge per dependency
pub(crate) fn dot<'a>(flow_name: &str, steps: impl Iterator<Item = &'a StepNode>) -> String {
    let mut lines = vec![format!("digraph {} {{", quote(flow_name))];
    for node in steps {
        lines.push(format!("    {};", quote(node.name())));
        for dep in node.dependencies() {
            lines.push(format!("    {} -> {};", quote(dep), quote(node.name())));
        }
    }
    lines.push("}".to_string());
    lines.join("\n")
}

fn quote(id: &str) -> String {
    format!("\"{}\"", id.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use crate::Flow;
    use flowcore::{action_fn, StepInputs, StepResult, Value};

    fn flow_ab() -> Flow {
        let mut flow = Flow::new("pipeline");
        flow.register_step("A", action_fn(|_: StepInputs| async { StepResult::Ok(Value::Null) }))
            .unwrap();
        flow.register_step("B", action_fn(|_: StepInputs| async { StepResult::Ok(Value::Null) }))
            .unwrap()
            .depends_on(["A"])
            .unwrap();
        flow
    }

    #[test]
    fn dot_has_one_node_per_step_and_one_edge_per_dependency() {
        let dot = flow_ab().to_graph_description();
        let lines: Vec<&str> = dot.lines().collect();

        assert_eq!(lines.first(), Some(&"digraph \"pipeline\" {"));
        assert_eq!(lines.last(), Some(&"}"));
        assert!(lines.contains(&"    \"A\";"));
        assert!(lines.contains(&"    \"B\";"));
        let edges: Vec<&&str> = lines.iter().filter(|l| l.contains("->")).collect();
        assert_eq!(edges, vec![&"    \"A\" -> \"B\";"]);
    }

    #[test]
    fn dot_escapes_quotes_in_identifiers() {
        let mut flow = Flow::new("say \"hi\"");
        flow.register_step("x", action_fn(|_: StepInputs| async { StepResult::Ok(Value::Null) }))
            .unwrap();
        assert!(flow.to_graph_description().starts_with("digraph \"say \\\"hi\\\"\" {"));
    }

    #[test]
    fn table_lists_steps_with_dependencies() {
        let table = flow_ab().visualize();
        let rows: Vec<&str> = table.lines().collect();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[1], "| Step | Dependencies |");
        assert_eq!(rows[3], "| A    |              |");
        assert_eq!(rows[4], "| B    | A            |");
        assert_eq!(rows[0], rows[5]);
    }
}
