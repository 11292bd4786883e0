use crate::{
    error::ZanzibarError,
    models::*,
    repository::{tuple_stream, TupleRepository},
};
use futures::future::{BoxFuture, FutureExt};
use futures::TryStreamExt;
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Nodes visited on the current resolution path together with the depth bound.
///
/// Each branch of a traversal owns its own path, so sibling branches may visit
/// the same node without tripping the cycle guard.
#[derive(Debug, Clone)]
pub struct ResolutionPath {
    visited: HashSet<TupleKey>,
    depth: u32,
    max_depth: u32,
    // Shared by every branch of one traversal
    truncated: Arc<AtomicBool>,
}

impl ResolutionPath {
    pub fn new(max_depth: u32) -> Self {
        Self {
            visited: HashSet::new(),
            depth: 0,
            max_depth,
            truncated: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current depth; the first node entered is depth 1
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Whether any branch of this traversal ran into the depth bound
    pub fn truncated(&self) -> bool {
        self.truncated.load(Ordering::Relaxed)
    }

    /// Step into `key`, failing if it is already on the path or the path
    /// would grow beyond the depth bound.
    pub fn enter(&self, key: &TupleKey) -> Result<ResolutionPath, ZanzibarError> {
        if self.visited.contains(key) {
            return Err(ZanzibarError::CycleDetected(key.to_string()));
        }
        let depth = self.depth.saturating_add(1);
        if depth > self.max_depth {
            self.truncated.store(true, Ordering::Relaxed);
            return Err(ZanzibarError::MaxDepthExceeded(self.max_depth));
        }
        let mut next = self.clone();
        next.visited.insert(key.clone());
        next.depth = depth;
        Ok(next)
    }
}

/// Expands subject references into the direct subjects they denote
pub struct SubjectExpander {
    repository: Arc<dyn TupleRepository>,
    page_size: usize,
}

impl SubjectExpander {
    pub fn new(repository: Arc<dyn TupleRepository>, page_size: usize) -> Self {
        Self {
            repository,
            page_size,
        }
    }

    /// Resolve a subject reference into the set of subject ids it denotes.
    ///
    /// Branches that loop back onto the current path or run past `max_depth`
    /// contribute nothing; only storage failures are returned as errors.
    pub async fn resolve(
        &self,
        subject: &Subject,
        max_depth: u32,
    ) -> Result<BTreeSet<String>, ZanzibarError> {
        match subject {
            Subject::Id(id) => Ok(BTreeSet::from([id.clone()])),
            Subject::Set(set) => self.resolve_set(set, ResolutionPath::new(max_depth)).await,
        }
    }

    fn resolve_set<'a>(
        &'a self,
        set: &'a SubjectSet,
        path: ResolutionPath,
    ) -> BoxFuture<'a, Result<BTreeSet<String>, ZanzibarError>> {
        async move {
            let key = TupleKey::from(set);
            let path = match path.enter(&key) {
                Ok(path) => path,
                Err(e) if e.is_resolution_guard() => {
                    debug!("Skipping {}: {}", key, e);
                    return Ok(BTreeSet::new());
                }
                Err(e) => return Err(e),
            };

            debug!("Resolving {} at depth {}", key, path.depth());
            let mut members = BTreeSet::new();
            let mut tuples = self.node_tuples(set);
            while let Some(tuple) = tuples.try_next().await? {
                match tuple.subject {
                    Subject::Id(id) => {
                        members.insert(id);
                    }
                    Subject::Set(ref nested) => {
                        members.extend(self.resolve_set(nested, path.clone()).await?);
                    }
                }
            }
            Ok(members)
        }
        .boxed()
    }

    /// Build the subject tree rooted at `set`
    pub async fn expand(
        &self,
        set: &SubjectSet,
        max_depth: u32,
    ) -> Result<ExpandTree, ZanzibarError> {
        let path = ResolutionPath::new(max_depth);
        let tree = self.expand_node(set, path.clone()).await?;
        if path.truncated() {
            warn!("Expand of {} truncated at depth limit {}", set, max_depth);
        }
        Ok(tree)
    }

    fn expand_node<'a>(
        &'a self,
        set: &'a SubjectSet,
        path: ResolutionPath,
    ) -> BoxFuture<'a, Result<ExpandTree, ZanzibarError>> {
        async move {
            let key = TupleKey::from(set);
            let path = match path.enter(&key) {
                Ok(path) => path,
                Err(e) if e.is_resolution_guard() => {
                    debug!("Not expanding {}: {}", key, e);
                    return Ok(ExpandTree::leaf(Subject::Set(set.clone())));
                }
                Err(e) => return Err(e),
            };

            let mut children = Vec::new();
            let mut tuples = self.node_tuples(set);
            while let Some(tuple) = tuples.try_next().await? {
                let child = match tuple.subject {
                    Subject::Id(_) => ExpandTree::leaf(tuple.subject),
                    Subject::Set(ref nested) => self.expand_node(nested, path.clone()).await?,
                };
                children.push(child);
            }

            Ok(ExpandTree {
                node_type: ExpandNodeType::Union,
                subject: Subject::Set(set.clone()),
                children,
            })
        }
        .boxed()
    }

    /// List all subject ids (flattened) related to the set
    pub async fn list_subjects(
        &self,
        set: &SubjectSet,
        max_depth: u32,
    ) -> Result<Vec<String>, ZanzibarError> {
        let members = self
            .resolve_set(set, ResolutionPath::new(max_depth))
            .await?;
        Ok(members.into_iter().collect())
    }

    fn node_tuples(
        &self,
        set: &SubjectSet,
    ) -> futures::stream::BoxStream<'static, Result<RelationTuple, ZanzibarError>> {
        tuple_stream(
            self.repository.clone(),
            RelationQuery::node(&set.namespace, &set.object, &set.relation),
            self.page_size,
        )
    }
}
