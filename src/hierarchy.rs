//! Parent/child hierarchy operations.
//!
//! Tasks are stored flat with a back-reference to their parent. This module
//! rebuilds the nested forest from that flat collection, linearizes a forest
//! back into pre-order, and answers ancestry questions (descendants,
//! ancestors, cycle checks) over the flat links.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::task::{Task, TaskNode};

/// Pre-order traversal of a forest: each task is followed by its own
/// flattened subtasks, in child order.
pub fn flatten(roots: &[TaskNode]) -> Vec<&Task> {
    fn walk<'a>(nodes: &'a [TaskNode], out: &mut Vec<&'a Task>) {
        for node in nodes {
            out.push(&node.task);
            walk(&node.subtasks, out);
        }
    }

    let mut out = Vec::new();
    walk(roots, &mut out);
    out
}

/// Rebuild the nested forest from a flat collection using parent references.
///
/// Children keep the relative order of the input. A task whose parent
/// reference does not resolve is promoted to root. Tasks whose parent links
/// form a cycle are unreachable from any root; they are promoted to root
/// after the regular roots so every input task appears exactly once.
pub fn build_hierarchy(flat: &[Task]) -> Vec<TaskNode> {
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(flat.len());
    for (i, t) in flat.iter().enumerate() {
        index.entry(t.id.as_str()).or_insert(i);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); flat.len()];
    let mut roots = Vec::new();
    for (i, t) in flat.iter().enumerate() {
        match t.parent.as_deref() {
            None => roots.push(i),
            Some(pid) => match index.get(pid) {
                Some(&p) => children[p].push(i),
                None => {
                    debug!(task = %t.id, parent = %pid, "dangling parent reference, promoting to root");
                    roots.push(i);
                }
            },
        }
    }

    let mut visited = vec![false; flat.len()];
    let mut forest: Vec<TaskNode> = roots
        .iter()
        .map(|&r| assemble(r, flat, &children, &mut visited))
        .collect();

    for i in 0..flat.len() {
        if !visited[i] {
            warn!(task = %flat[i].id, "parent links form a cycle, promoting to root");
            forest.push(assemble(i, flat, &children, &mut visited));
        }
    }
    forest
}

fn assemble(i: usize, flat: &[Task], children: &[Vec<usize>], visited: &mut [bool]) -> TaskNode {
    visited[i] = true;
    let mut node = TaskNode::new(flat[i].clone());
    for &c in &children[i] {
        if !visited[c] {
            node.subtasks.push(assemble(c, flat, children, visited));
        }
    }
    node
}

/// Find a node anywhere in a forest by task ID.
pub fn find_node<'a>(nodes: &'a [TaskNode], id: &str) -> Option<&'a TaskNode> {
    for node in nodes {
        if node.id() == id {
            return Some(node);
        }
        if let Some(found) = find_node(&node.subtasks, id) {
            return Some(found);
        }
    }
    None
}

/// Build a map of parent task IDs to their children's IDs, from
/// `(id, parent)` pairs. Children keep input order.
pub fn build_children_map<'a, I>(links: I) -> HashMap<&'a str, Vec<&'a str>>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    let mut map: HashMap<&str, Vec<&str>> = HashMap::new();
    for (id, parent) in links {
        if let Some(p) = parent {
            map.entry(p).or_default().push(id);
        }
    }
    map
}

/// Recursively collect all descendant task IDs from a root task.
pub fn collect_descendants<'a>(
    root: &str,
    child_map: &HashMap<&'a str, Vec<&'a str>>,
    out: &mut HashSet<&'a str>,
) {
    if let Some(children) = child_map.get(root) {
        for &c in children {
            if out.insert(c) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Collect ancestor IDs by following parent references, closest first.
/// Stops at a dangling reference or when a cycle is detected.
pub fn collect_ancestors<'a>(id: &str, tasks: &'a [Task]) -> Vec<&'a str> {
    let parents: HashMap<&str, Option<&str>> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.parent.as_deref()))
        .collect();
    let mut chain = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut cur = parents.get(id).copied().flatten();
    while let Some(p) = cur {
        let Some((&pid, &next)) = parents.get_key_value(p) else {
            break;
        };
        if pid == id || !seen.insert(pid) {
            break;
        }
        chain.push(pid);
        cur = next;
    }
    chain
}

/// Whether making `new_parent` the parent of `task_id` would make the task
/// its own ancestor.
pub fn would_create_cycle(tasks: &[Task], task_id: &str, new_parent: &str) -> bool {
    if task_id == new_parent {
        return true;
    }
    let child_map = build_children_map(tasks.iter().map(|t| (t.id.as_str(), t.parent.as_deref())));
    let mut descendants = HashSet::new();
    collect_descendants(task_id, &child_map, &mut descendants);
    descendants.contains(new_parent)
}

/// Depth of every task in a forest, roots at 0.
pub fn depth_map(roots: &[TaskNode]) -> HashMap<&str, usize> {
    fn walk<'a>(nodes: &'a [TaskNode], depth: usize, out: &mut HashMap<&'a str, usize>) {
        for node in nodes {
            out.insert(node.id(), depth);
            walk(&node.subtasks, depth + 1, out);
        }
    }

    let mut out = HashMap::new();
    walk(roots, 0, &mut out);
    out
}
