use crate::{
    error::ZanzibarError,
    expand::ResolutionPath,
    models::*,
    repository::{tuple_stream, TupleRepository},
};
use futures::future::{BoxFuture, FutureExt};
use futures::{StreamExt, TryStreamExt};
use std::sync::Arc;
use tracing::{debug, warn};

/// Permission checker performs authorization checks with support for:
/// - Direct tuples naming the subject
/// - Subject-set references (e.g., "every member of a team owns the notebook")
/// - Recursive resolution through nested subject sets, bounded by depth
pub struct PermissionChecker {
    repository: Arc<dyn TupleRepository>,
    page_size: usize,
    concurrency: usize,
}

impl PermissionChecker {
    pub fn new(repository: Arc<dyn TupleRepository>, page_size: usize, concurrency: usize) -> Self {
        Self {
            repository,
            page_size,
            concurrency: concurrency.max(1),
        }
    }

    /// Check if `subject` has `relation` to `object` in `namespace`.
    ///
    /// A denial is `Ok(false)`; only storage failures surface as errors.
    pub async fn check(
        &self,
        namespace: &str,
        object: &str,
        relation: &str,
        subject: &Subject,
        max_depth: u32,
    ) -> Result<bool, ZanzibarError> {
        let key = TupleKey::new(namespace, object, relation);
        let path = ResolutionPath::new(max_depth);
        let allowed = self.check_node(key.clone(), subject, path.clone()).await?;
        if !allowed && path.truncated() {
            warn!("Check of {} for {} truncated at depth limit {}", key, subject, max_depth);
        }
        Ok(allowed)
    }

    fn check_node<'a>(
        &'a self,
        key: TupleKey,
        subject: &'a Subject,
        path: ResolutionPath,
    ) -> BoxFuture<'a, Result<bool, ZanzibarError>> {
        async move {
            let path = match path.enter(&key) {
                Ok(path) => path,
                Err(e) if e.is_resolution_guard() => {
                    debug!("Check of {} for {} stopped: {}", key, subject, e);
                    return Ok(false);
                }
                Err(e) => return Err(e),
            };

            debug!("Checking {}@{} at depth {}", key, subject, path.depth());

            // 1. Direct check: does the tuple exist?
            let direct = RelationTuple {
                namespace: key.namespace.clone(),
                object: key.object.clone(),
                relation: key.relation.clone(),
                subject: subject.clone(),
            };
            if self.repository.tuple_exists(&direct).await? {
                debug!("Direct tuple found: {}", direct);
                return Ok(true);
            }

            // 2. Subject-set references: the subject may hold the referenced
            // relation on the referenced object. Siblings run concurrently and
            // the rest are dropped on the first success.
            let candidates = tuple_stream(
                self.repository.clone(),
                RelationQuery::node(&key.namespace, &key.object, &key.relation)
                    .with_subject(SubjectFilter::SubjectSetsOnly),
                self.page_size,
            );
            let mut pending = candidates
                .map_ok(move |tuple| {
                    let path = path.clone();
                    async move {
                        match tuple.subject {
                            Subject::Set(ref set) => {
                                self.check_node(TupleKey::from(set), subject, path).await
                            }
                            Subject::Id(_) => Ok(false),
                        }
                    }
                })
                .try_buffer_unordered(self.concurrency)
                .boxed();

            while let Some(found) = pending.try_next().await? {
                if found {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        .boxed()
    }
}
