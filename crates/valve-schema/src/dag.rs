//! Dependency graph (DAG) over foreign keys
//!
//! Orders tables so every referenced table is created and loaded before the
//! tables that reference it.

use std::collections::{HashMap, HashSet, VecDeque};
use valve_core::{CycleError, ForeignKey, TableSchema};

/// Node identifier (table name)
pub type NodeId = String;

/// Dependency graph with forward and reverse edges
#[derive(Debug, Clone)]
pub struct DependencyGraph {
    /// Forward edges: table -> tables it references (parents)
    parents: HashMap<NodeId, Vec<NodeId>>,

    /// Reverse edges: table -> tables that reference it (children)
    children: HashMap<NodeId, Vec<NodeId>>,

    /// Foreign keys declared by each table, for cycle diagnostics
    foreign_keys: HashMap<NodeId, Vec<ForeignKey>>,

    /// All nodes, in insertion order
    nodes: Vec<NodeId>,
}

impl DependencyGraph {
    /// Build a graph from table names and their foreign keys
    pub fn new<'a, I>(tables: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [ForeignKey])>,
    {
        let mut graph = Self {
            parents: HashMap::new(),
            children: HashMap::new(),
            foreign_keys: HashMap::new(),
            nodes: Vec::new(),
        };

        for (table, foreign) in tables {
            graph.add_node(table);
            for fk in foreign {
                graph.add_node(&fk.ftable);

                let parents = graph.parents.entry(table.to_string()).or_default();
                if !parents.contains(&fk.ftable) {
                    parents.push(fk.ftable.clone());
                    graph
                        .children
                        .entry(fk.ftable.clone())
                        .or_default()
                        .push(table.to_string());
                }
                graph
                    .foreign_keys
                    .entry(table.to_string())
                    .or_default()
                    .push(fk.clone());
            }
        }

        graph
    }

    /// Build a graph from derived table schemas
    pub fn from_schemas(schemas: &[TableSchema]) -> Self {
        Self::new(
            schemas
                .iter()
                .map(|s| (s.name.as_str(), s.constraints.foreign.as_slice())),
        )
    }

    fn add_node(&mut self, node: &str) {
        if !self.nodes.iter().any(|n| n == node) {
            self.nodes.push(node.to_string());
        }
    }

    /// Get all nodes in the graph
    pub fn all_nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Get immediate parents (referenced tables) of a node
    pub fn parents(&self, node_id: &str) -> Vec<&NodeId> {
        self.parents
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Get immediate children (referencing tables) of a node
    pub fn children(&self, node_id: &str) -> Vec<&NodeId> {
        self.children
            .get(node_id)
            .map(|deps| deps.iter().collect())
            .unwrap_or_default()
    }

    /// Topological sort, referenced tables first
    ///
    /// Ties keep insertion order, so the result is deterministic.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>, CycleError> {
        let mut in_degree: HashMap<&str, usize> = self
            .nodes
            .iter()
            .map(|n| (n.as_str(), self.parents.get(n).map_or(0, Vec::len)))
            .collect();

        let mut queue: VecDeque<&str> = self
            .nodes
            .iter()
            .map(String::as_str)
            .filter(|n| in_degree.get(n) == Some(&0))
            .collect();

        // Kahn's algorithm
        let mut result = Vec::with_capacity(self.nodes.len());
        while let Some(node) = queue.pop_front() {
            result.push(node.to_string());

            for child in self.children(node) {
                if let Some(degree) = in_degree.get_mut(child.as_str()) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(child.as_str());
                    }
                }
            }
        }

        if result.len() == self.nodes.len() {
            return Ok(result);
        }

        let done: HashSet<&str> = result.iter().map(String::as_str).collect();
        Err(self.cycle_error(&done))
    }

    /// Walk unresolved parent edges until a node repeats
    ///
    /// Every node left over by Kahn's algorithm has an unresolved parent, so
    /// the walk always closes a cycle.
    fn cycle_error(&self, done: &HashSet<&str>) -> CycleError {
        let start = self
            .nodes
            .iter()
            .find(|n| !done.contains(n.as_str()))
            .map(String::as_str)
            .unwrap_or_default();

        let mut path: Vec<&str> = vec![start];
        let mut current = start;
        loop {
            let next = self
                .parents
                .get(current)
                .and_then(|ps| ps.iter().find(|p| !done.contains(p.as_str())))
                .map(String::as_str);

            let Some(next) = next else { break };
            if let Some(pos) = path.iter().position(|n| *n == next) {
                path.drain(..pos);
                path.push(next);
                break;
            }
            path.push(next);
            current = next;
        }

        let cycle: Vec<String> = path.iter().map(|n| n.to_string()).collect();
        let links: Vec<String> = cycle
            .windows(2)
            .filter_map(|pair| {
                self.foreign_keys
                    .get(&pair[0])
                    .and_then(|fks| fks.iter().find(|fk| fk.ftable == pair[1]))
                    .map(|fk| {
                        format!(
                            "{}.{} depends on {}.{}",
                            pair[0], fk.column, fk.ftable, fk.fcolumn
                        )
                    })
            })
            .collect();

        let message = format!(
            "Cyclic dependency between tables {}: {}",
            cycle.join(", "),
            links.join(" and ")
        );

        CycleError { cycle, message }
    }
}
