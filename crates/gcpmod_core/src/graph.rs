//! Composed resources and the dependency graph between them.

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::{CoreError, CoreResult};
use crate::resource::{ResourceAddress, ResourceDecl, ResourceKind};

/// An ordered set of resource declarations.
///
/// Declarations keep their insertion order; [`Composition::ordered`] yields a
/// topological order that respects every `depends_on` edge.
#[derive(Debug, Clone, Default)]
pub struct Composition {
    decls: Vec<ResourceDecl>,
}

impl Composition {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Addresses must be unique.
    pub fn add(&mut self, decl: ResourceDecl) -> CoreResult<()> {
        if self.contains(&decl.address) {
            return Err(CoreError::DuplicateResource(decl.address.to_string()));
        }
        debug!("Declared {}", decl.address);
        self.decls.push(decl);
        Ok(())
    }

    /// Absorb another composition.
    ///
    /// A declaration whose address already exists is accepted only when it is
    /// identical, which is how a shared resource is composed once.
    pub fn merge(&mut self, other: Composition) -> CoreResult<()> {
        for decl in other.decls {
            match self.get(&decl.address) {
                Some(existing) if *existing == decl => continue,
                Some(_) => return Err(CoreError::DuplicateResource(decl.address.to_string())),
                None => self.decls.push(decl),
            }
        }
        Ok(())
    }

    pub fn get(&self, address: &ResourceAddress) -> Option<&ResourceDecl> {
        self.decls.iter().find(|d| d.address == *address)
    }

    pub fn contains(&self, address: &ResourceAddress) -> bool {
        self.get(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    /// Declarations in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, ResourceDecl> {
        self.decls.iter()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &ResourceDecl> {
        self.decls.iter().filter(move |d| d.kind() == kind)
    }

    /// Dependency edges as `(dependent, dependency)` pairs.
    pub fn edges(&self) -> Vec<(&ResourceAddress, &ResourceAddress)> {
        self.decls
            .iter()
            .flat_map(|d| d.depends_on.iter().map(move |dep| (&d.address, dep)))
            .collect()
    }

    /// Declarations in dependency order.
    ///
    /// Every `depends_on` edge must point at a declared address.
    pub fn ordered(&self) -> CoreResult<Vec<&ResourceDecl>> {
        let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(self.decls.len(), 0);
        let nodes: HashMap<&ResourceAddress, NodeIndex> = self
            .decls
            .iter()
            .enumerate()
            .map(|(i, d)| (&d.address, graph.add_node(i)))
            .collect();

        for (i, decl) in self.decls.iter().enumerate() {
            let dependent = NodeIndex::new(i);
            for dep in &decl.depends_on {
                let dependency = nodes.get(dep).ok_or_else(|| CoreError::UnknownDependency {
                    from: decl.address.to_string(),
                    to: dep.to_string(),
                })?;
                graph.add_edge(*dependency, dependent, ());
            }
        }

        let sorted = toposort(&graph, None).map_err(|cycle| {
            CoreError::DependencyCycle(self.decls[graph[cycle.node_id()]].address.to_string())
        })?;

        Ok(sorted.into_iter().map(|node| &self.decls[graph[node]]).collect())
    }
}

impl<'a> IntoIterator for &'a Composition {
    type Item = &'a ResourceDecl;
    type IntoIter = std::slice::Iter<'a, ResourceDecl>;

    fn into_iter(self) -> Self::IntoIter {
        self.decls.iter()
    }
}
