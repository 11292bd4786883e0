use crate::{error::ZanzibarError, models::*};
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::ops::Bound;
use std::sync::Arc;
use tracing::debug;

/// Page size used when a caller passes zero
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Repository interface for storing relationship tuples
#[async_trait]
pub trait TupleRepository: Send + Sync {
    /// Write a single tuple; writing an existing tuple is a no-op
    async fn write_tuple(&self, tuple: RelationTuple) -> Result<(), ZanzibarError>;

    /// Delete a single tuple; deleting an absent tuple is a no-op
    async fn delete_tuple(&self, tuple: &RelationTuple) -> Result<(), ZanzibarError>;

    /// Apply insert and delete steps in request order, atomically
    async fn batch_write(&self, request: WriteRequest) -> Result<(), ZanzibarError>;

    /// Read one page of tuples matching the query, ordered by
    /// `(namespace, object, relation, subject)`
    async fn read_tuples(
        &self,
        query: &RelationQuery,
        page: &PageRequest,
    ) -> Result<TuplePage, ZanzibarError>;

    /// Check if a specific tuple exists
    async fn tuple_exists(&self, tuple: &RelationTuple) -> Result<bool, ZanzibarError>;
}

/// Lazily walks every tuple matching `query`, fetching one page at a time.
///
/// The stream is finite and can be restarted by calling this again; each
/// page is read from a consistent snapshot of the store.
pub fn tuple_stream(
    repository: Arc<dyn TupleRepository>,
    query: RelationQuery,
    page_size: usize,
) -> BoxStream<'static, Result<RelationTuple, ZanzibarError>> {
    struct Cursor {
        repository: Arc<dyn TupleRepository>,
        query: RelationQuery,
        page_size: usize,
        buffer: VecDeque<RelationTuple>,
        // None once the last page has been fetched
        next_token: Option<String>,
    }

    let cursor = Cursor {
        repository,
        query,
        page_size,
        buffer: VecDeque::new(),
        next_token: Some(String::new()),
    };

    stream::try_unfold(cursor, |mut cursor| async move {
        loop {
            if let Some(tuple) = cursor.buffer.pop_front() {
                return Ok(Some((tuple, cursor)));
            }
            let Some(page_token) = cursor.next_token.take() else {
                return Ok(None);
            };
            let page = cursor
                .repository
                .read_tuples(
                    &cursor.query,
                    &PageRequest {
                        page_size: cursor.page_size,
                        page_token,
                    },
                )
                .await?;
            if !page.next_page_token.is_empty() {
                cursor.next_token = Some(page.next_page_token);
            }
            cursor.buffer = page.relation_tuples.into();
        }
    })
    .boxed()
}

pub(crate) fn encode_page_token(last: &RelationTuple) -> Result<String, ZanzibarError> {
    let raw = serde_json::to_vec(last).map_err(|e| ZanzibarError::InternalError(e.into()))?;
    Ok(URL_SAFE_NO_PAD.encode(raw))
}

pub(crate) fn decode_page_token(token: &str) -> Result<Option<RelationTuple>, ZanzibarError> {
    if token.is_empty() {
        return Ok(None);
    }
    let raw = URL_SAFE_NO_PAD
        .decode(token)
        .map_err(|e| ZanzibarError::InvalidPageToken(e.to_string()))?;
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| ZanzibarError::InvalidPageToken(e.to_string()))
}

/// In-memory tuple repository.
///
/// Tuples are indexed by their `(namespace, object, relation)` node, each node
/// holding the ordered set of its subjects. A single lock guards the index so
/// every read observes a consistent snapshot and batch writes apply atomically.
pub struct InMemoryTupleRepository {
    index: RwLock<BTreeMap<TupleKey, BTreeSet<Subject>>>,
}

impl InMemoryTupleRepository {
    pub fn new() -> Self {
        Self {
            index: RwLock::new(BTreeMap::new()),
        }
    }

    /// Total number of stored tuples
    pub fn len(&self) -> usize {
        self.index.read().values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    fn insert_locked(index: &mut BTreeMap<TupleKey, BTreeSet<Subject>>, tuple: RelationTuple) {
        let key = tuple.key();
        index.entry(key).or_default().insert(tuple.subject);
    }

    fn remove_locked(index: &mut BTreeMap<TupleKey, BTreeSet<Subject>>, tuple: &RelationTuple) {
        let key = tuple.key();
        if let Some(subjects) = index.get_mut(&key) {
            subjects.remove(&tuple.subject);
            if subjects.is_empty() {
                index.remove(&key);
            }
        }
    }
}

impl Default for InMemoryTupleRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TupleRepository for InMemoryTupleRepository {
    async fn write_tuple(&self, tuple: RelationTuple) -> Result<(), ZanzibarError> {
        tuple.validate()?;
        debug!("Storing tuple {}", tuple);
        Self::insert_locked(&mut self.index.write(), tuple);
        Ok(())
    }

    async fn delete_tuple(&self, tuple: &RelationTuple) -> Result<(), ZanzibarError> {
        debug!("Removing tuple {}", tuple);
        Self::remove_locked(&mut self.index.write(), tuple);
        Ok(())
    }

    async fn batch_write(&self, request: WriteRequest) -> Result<(), ZanzibarError> {
        // Reject the whole batch before anything becomes visible
        for delta in &request.deltas {
            if delta.action == PatchAction::Insert {
                delta.relation_tuple.validate()?;
            }
        }

        let mut index = self.index.write();
        for delta in request.deltas {
            match delta.action {
                PatchAction::Insert => Self::insert_locked(&mut index, delta.relation_tuple),
                PatchAction::Delete => Self::remove_locked(&mut index, &delta.relation_tuple),
            }
        }
        Ok(())
    }

    async fn read_tuples(
        &self,
        query: &RelationQuery,
        page: &PageRequest,
    ) -> Result<TuplePage, ZanzibarError> {
        let page_size = if page.page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page.page_size
        };
        let after = decode_page_token(&page.page_token)?;
        let after_key = after.as_ref().map(RelationTuple::key);

        let lower = match (query.exact_key(), after_key) {
            (Some(exact), Some(cursor)) => Bound::Included(exact.max(cursor)),
            (Some(exact), None) => Bound::Included(exact),
            (None, Some(cursor)) => Bound::Included(cursor),
            (None, None) => Bound::Unbounded,
        };
        let upper = match query.exact_key() {
            Some(exact) => Bound::Included(exact),
            None => Bound::Unbounded,
        };
        if let (Bound::Included(lo), Bound::Included(hi)) = (&lower, &upper) {
            if lo > hi {
                return Ok(TuplePage::default());
            }
        }

        let index = self.index.read();
        let mut relation_tuples = Vec::new();
        let mut has_more = false;

        'nodes: for (key, subjects) in index.range((lower, upper)) {
            if !query.matches_key(key) {
                continue;
            }
            let resume = match after {
                Some(ref last) if last.key() == *key => Bound::Excluded(&last.subject),
                _ => Bound::Unbounded,
            };
            for subject in subjects.range((resume, Bound::Unbounded)) {
                if !query.subject.matches(subject) {
                    continue;
                }
                if relation_tuples.len() == page_size {
                    has_more = true;
                    break 'nodes;
                }
                relation_tuples.push(RelationTuple {
                    namespace: key.namespace.clone(),
                    object: key.object.clone(),
                    relation: key.relation.clone(),
                    subject: subject.clone(),
                });
            }
        }
        drop(index);

        let next_page_token = match relation_tuples.last() {
            Some(last) if has_more => encode_page_token(last)?,
            _ => String::new(),
        };

        Ok(TuplePage {
            relation_tuples,
            next_page_token,
        })
    }

    async fn tuple_exists(&self, tuple: &RelationTuple) -> Result<bool, ZanzibarError> {
        Ok(self
            .index
            .read()
            .get(&tuple.key())
            .map_or(false, |subjects| subjects.contains(&tuple.subject)))
    }
}
