use crate::error::Result;
use crate::graph::{self, TypeGraph};
use crate::models::{Root, TypeId, TypeNode};
use crate::registry::{Introspect, Resolve, TypeRegistry};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

/// Ordered dependencies of one root, shared between callers
pub type OrderedTypes = Arc<[TypeNode]>;

/// Builds and memoizes dependency orders over a fixed set of type definitions.
///
/// Create one at startup and share it (`&self` methods, `Send + Sync` when the
/// collaborator is). The cache is keyed by the resolved root and never evicts.
pub struct TypeGraphService<C = TypeRegistry> {
    collaborator: C,
    cache: DashMap<TypeId, OrderedTypes>,
}

impl<C: Introspect + Resolve> TypeGraphService<C> {
    pub fn new(collaborator: C) -> Self {
        TypeGraphService {
            collaborator,
            cache: DashMap::new(),
        }
    }

    /// The introspection/resolution collaborator
    pub fn collaborator(&self) -> &C {
        &self.collaborator
    }

    /// Types that `root` depends on, leaves first and `root` last.
    ///
    /// Names and forward references are resolved once, then the concrete
    /// root is looked up in the cache. Concurrent misses may each compute the
    /// order; the first published value wins and is returned to everyone.
    pub fn ordered_dependencies(&self, root: impl Into<Root>) -> Result<OrderedTypes> {
        match root.into() {
            Root::Type(id) => self.ordered_for(id),
            other => {
                let id = graph::resolve_root(&self.collaborator, other)?;
                self.ordered_for(id)
            }
        }
    }

    fn ordered_for(&self, root: TypeId) -> Result<OrderedTypes> {
        if let Some(cached) = self.cache.get(&root) {
            debug!(root = %root, "type order cache hit");
            return Ok(Arc::clone(cached.value()));
        }

        debug!(root = %root, "type order cache miss");
        let order: OrderedTypes = self.type_graph(root)?.static_order().into();
        let published = self.cache.entry(root).or_insert(order);
        Ok(Arc::clone(published.value()))
    }

    /// Build the graph for `root` without consulting or filling the cache
    pub fn type_graph(&self, root: impl Into<Root>) -> Result<TypeGraph> {
        let id = graph::resolve_root(&self.collaborator, root.into())?;
        graph::build_type_graph(&self.collaborator, id)
    }

    pub fn is_cached(&self, root: TypeId) -> bool {
        self.cache.contains_key(&root)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}
