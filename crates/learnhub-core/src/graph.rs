// LearnHub
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Prerequisite graph checks

use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

/// Find a dependency cycle in `edges` (node -> prerequisites).
///
/// Returns the nodes along the cycle, starting and ending with the same id,
/// or `None` when the graph is acyclic. Traversal order is sorted so the
/// reported cycle is deterministic.
pub fn find_cycle(edges: &HashMap<String, Vec<String>>) -> Option<Vec<String>> {
    let sorted: BTreeMap<&String, &Vec<String>> = edges.iter().collect();
    let mut marks: HashMap<&str, Mark> = HashMap::new();
    let mut path: Vec<&str> = Vec::new();

    for node in sorted.keys() {
        if marks.contains_key(node.as_str()) {
            continue;
        }
        if let Some(cycle) = visit(node, edges, &mut marks, &mut path) {
            return Some(cycle);
        }
    }
    None
}

fn visit<'a>(node: &'a str, edges: &'a HashMap<String, Vec<String>>, marks: &mut HashMap<&'a str, Mark>, path: &mut Vec<&'a str>) -> Option<Vec<String>> {
    marks.insert(node, Mark::Visiting);
    path.push(node);

    if let Some(next) = edges.get(node) {
        for dep in next {
            match marks.get(dep.as_str()) {
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == dep.as_str()).unwrap_or(0);
                    let mut cycle: Vec<String> = path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(dep.clone());
                    return Some(cycle);
                }
                Some(Mark::Done) => {}
                None => {
                    if let Some(cycle) = visit(dep, edges, marks, path) {
                        return Some(cycle);
                    }
                }
            }
        }
    }

    path.pop();
    marks.insert(node, Mark::Done);
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(pairs: &[(&str, &[&str])]) -> HashMap<String, Vec<String>> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.iter().map(|s| s.to_string()).collect())).collect()
    }

    #[test]
    fn test_acyclic_graph() {
        let edges = graph(&[("c", &["b", "a"]), ("b", &["a"]), ("a", &[])]);
        assert_eq!(find_cycle(&edges), None);
    }

    #[test]
    fn test_reports_cycle_path() {
        let edges = graph(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let cycle = find_cycle(&edges).unwrap();
        assert_eq!(cycle.first(), cycle.last());
        assert_eq!(cycle.len(), 4);
    }

    #[test]
    fn test_self_loop() {
        let edges = graph(&[("a", &["a"])]);
        assert_eq!(find_cycle(&edges), Some(vec!["a".to_string(), "a".to_string()]));
    }

    #[test]
    fn test_dangling_prerequisite_is_not_a_cycle() {
        let edges = graph(&[("a", &["missing"])]);
        assert_eq!(find_cycle(&edges), None);
    }
}
