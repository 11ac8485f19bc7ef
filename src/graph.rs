use crate::error::Result;
use crate::models::{ForwardRef, Root, TypeId, TypeNode};
use crate::registry::{Introspect, Resolve};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet, VecDeque};
use tracing::{debug, trace};

/// A vertex waiting in the ready queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ReadyNode {
    round: usize,
    index: usize,
}

impl Ord for ReadyNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse for min-heap (earlier round, then earlier discovery, pops first)
        other
            .round
            .cmp(&self.round)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for ReadyNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Dependency graph of one root type.
///
/// Vertices are kept in discovery order; the root is always index 0. Each
/// vertex lists the indices of the predecessors that must be resolved first.
/// Structurally equal nodes share a vertex.
#[derive(Debug, Clone)]
pub struct TypeGraph {
    nodes: IndexMap<TypeNode, Vec<usize>>,
}

impl TypeGraph {
    fn with_root(root: TypeNode) -> Self {
        let mut nodes = IndexMap::new();
        nodes.insert(root, Vec::new());
        TypeGraph { nodes }
    }

    /// Insert a vertex if it isn't known yet, returning its index
    fn vertex(&mut self, node: TypeNode) -> usize {
        let entry = self.nodes.entry(node);
        let index = entry.index();
        entry.or_default();
        index
    }

    fn add(&mut self, parent: usize, predecessors: Vec<usize>) {
        if let Some((_, deps)) = self.nodes.get_index_mut(parent) {
            for index in predecessors {
                if !deps.contains(&index) {
                    deps.push(index);
                }
            }
        }
    }

    pub fn root(&self) -> &TypeNode {
        self.node(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The node at a discovery index.
    ///
    /// # Panics
    ///
    /// If `index` is out of range.
    pub fn node(&self, index: usize) -> &TypeNode {
        self.nodes
            .get_index(index)
            .map(|(node, _)| node)
            .unwrap_or_else(|| panic!("no vertex at index {index}"))
    }

    /// All vertices in discovery order
    pub fn nodes(&self) -> impl Iterator<Item = &TypeNode> {
        self.nodes.keys()
    }

    pub fn index_of(&self, node: &TypeNode) -> Option<usize> {
        self.nodes.get_index_of(node)
    }

    /// Indices of the vertices `index` depends on
    pub fn predecessors(&self, index: usize) -> &[usize] {
        self.nodes
            .get_index(index)
            .map(|(_, deps)| deps.as_slice())
            .unwrap_or(&[])
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.values().map(Vec::len).sum()
    }

    /// Edges as `(parent, predecessor)` index pairs
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.nodes
            .values()
            .enumerate()
            .flat_map(|(parent, deps)| deps.iter().map(move |&dep| (parent, dep)))
    }

    /// Linearize the graph so every predecessor comes before its dependents.
    ///
    /// Kahn's algorithm in rounds: vertices with no predecessors are round 0,
    /// and a vertex released by emitting a round `r` vertex joins round `r + 1`.
    /// Within a round, vertices come out in discovery order. The root comes out
    /// last since every other vertex is one of its transitive predecessors.
    pub fn static_order(&self) -> Vec<TypeNode> {
        self.static_order_indices()
            .into_iter()
            .map(|index| self.node(index).clone())
            .collect()
    }

    pub fn static_order_indices(&self) -> Vec<usize> {
        let n = self.nodes.len();

        let mut in_degree: Vec<usize> = vec![0; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (parent, dep) in self.edges() {
            in_degree[parent] += 1;
            dependents[dep].push(parent);
        }

        // Seed min-heap with vertices that depend on nothing
        let mut heap: BinaryHeap<ReadyNode> = (0..n)
            .filter(|&index| in_degree[index] == 0)
            .map(|index| ReadyNode { round: 0, index })
            .collect();

        let mut result = Vec::with_capacity(n);
        while let Some(ready) = heap.pop() {
            result.push(ready.index);

            for &dependent in &dependents[ready.index] {
                in_degree[dependent] -= 1;
                if in_degree[dependent] == 0 {
                    heap.push(ReadyNode {
                        round: ready.round + 1,
                        index: dependent,
                    });
                }
            }
        }

        debug_assert_eq!(result.len(), n, "type graph must be acyclic");
        result
    }
}

/// One `(field label, child type)` pair of a type's level
pub type LevelEntry = (Option<String>, TypeId);

/// Children of a type: generic arguments first, then structured members
pub fn level<I: Introspect + ?Sized>(introspector: &I, ty: TypeId) -> Result<Vec<LevelEntry>> {
    let args = introspector.type_arguments(ty)?;
    let members = introspector.structured_members(ty)?;
    Ok(args
        .into_iter()
        .map(|arg| (None, arg))
        .chain(members.into_iter().map(|(name, member)| (Some(name), member)))
        .collect())
}

/// Build the dependency graph of `root` breadth-first.
///
/// A child whose type was already visited, and which is either a
/// parameterized generic or not a builtin primitive, is a cycle. It becomes a
/// placeholder carrying a forward reference and is never expanded, which is
/// what makes the traversal finite.
pub fn build_type_graph<I: Introspect + ?Sized>(
    introspector: &I,
    root: TypeId,
) -> Result<TypeGraph> {
    let root_node = TypeNode::root(root);
    let mut graph = TypeGraph::with_root(root_node);
    let mut queue: VecDeque<usize> = VecDeque::from([0]);
    let mut visited: HashSet<TypeId> = HashSet::from([root]);

    while let Some(parent) = queue.pop_front() {
        let Some(parent_ty) = graph.node(parent).ty.concrete_id() else {
            continue;
        };

        let mut predecessors = Vec::new();
        for (field, child) in level(introspector, parent_ty)? {
            if introspector.is_unconstrained(child) {
                continue;
            }

            let can_be_cyclic = introspector.is_parameterized_generic(child)
                || !introspector.is_builtin_primitive(child);

            let index = if visited.contains(&child) && can_be_cyclic {
                let reference = ForwardRef {
                    name: introspector.qualified_name(child),
                    module: introspector.module(child),
                    is_argument: field.is_none(),
                    is_class: introspector.is_class(child),
                };
                trace!(%reference, ?field, "cycle cut with placeholder");
                graph.vertex(TypeNode::placeholder(reference, field))
            } else {
                visited.insert(child);
                let known = graph.len();
                let index = graph.vertex(TypeNode::new(child, field));
                // Equal leaf nodes collapse into one vertex; only expand new ones
                if index == known {
                    queue.push_back(index);
                }
                index
            };
            predecessors.push(index);
        }

        graph.add(parent, predecessors);
    }

    debug!(
        root = %root,
        nodes = graph.len(),
        edges = graph.edge_count(),
        "built type graph"
    );
    Ok(graph)
}

/// Resolve `root` to a concrete type, looking names up once
pub fn resolve_root<R: Resolve + ?Sized>(resolver: &R, root: Root) -> Result<TypeId> {
    match root {
        Root::Type(id) => Ok(id),
        Root::Name(name) => resolver.resolve(&name, None),
        Root::Forward(reference) => resolver.resolve_ref(&reference),
    }
}

/// Build and order the graph of `root` without any caching
pub fn iter_types<T>(
    collaborator: &T,
    root: impl Into<Root>,
) -> Result<impl Iterator<Item = TypeNode>>
where
    T: Introspect + Resolve + ?Sized,
{
    let root = resolve_root(collaborator, root.into())?;
    let graph = build_type_graph(collaborator, root)?;
    Ok(graph.static_order().into_iter())
}
