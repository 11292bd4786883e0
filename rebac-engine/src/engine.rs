use crate::{
    check::PermissionChecker,
    config::EngineConfig,
    error::ZanzibarError,
    expand::SubjectExpander,
    models::*,
    repository::TupleRepository,
    schema::NamespaceRegistry,
};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{debug, info};

/// Core relation-tuple authorization engine.
///
/// The engine is stateless apart from the repository it wraps and can be
/// shared freely between concurrent callers.
pub struct AuthorizationEngine {
    /// Storage for relationship tuples
    repository: Arc<dyn TupleRepository>,

    /// Namespaces accepted by writes and reads
    namespaces: Arc<NamespaceRegistry>,

    /// Permission checker for authorization queries
    checker: Arc<PermissionChecker>,

    /// Subject expander for listing subjects
    expander: Arc<SubjectExpander>,

    config: EngineConfig,
}

impl AuthorizationEngine {
    /// Create a new authorization engine with the given repository
    pub fn new(repository: Arc<dyn TupleRepository>) -> Self {
        Self::with_config(repository, EngineConfig::default())
    }

    pub fn with_config(repository: Arc<dyn TupleRepository>, config: EngineConfig) -> Self {
        let page_size = config.effective_page_size(0);
        let checker = Arc::new(PermissionChecker::new(
            repository.clone(),
            page_size,
            config.check_concurrency,
        ));
        let expander = Arc::new(SubjectExpander::new(repository.clone(), page_size));
        let namespaces = Arc::new(NamespaceRegistry::new(config.namespaces.iter().cloned()));

        Self {
            repository,
            namespaces,
            checker,
            expander,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn namespaces(&self) -> Arc<NamespaceRegistry> {
        self.namespaces.clone()
    }

    // =============================================================================
    // Tuple Management
    // =============================================================================

    /// Write a relationship tuple
    pub async fn write_tuple(&self, tuple: RelationTuple) -> Result<(), ZanzibarError> {
        self.namespaces.validate_tuple(&tuple)?;
        info!(tuple = %tuple, "Writing relation tuple");
        self.repository.write_tuple(tuple).await
    }

    /// Delete a relationship tuple
    pub async fn delete_tuple(&self, tuple: &RelationTuple) -> Result<(), ZanzibarError> {
        self.namespaces.validate_tuple(tuple)?;
        info!(tuple = %tuple, "Deleting relation tuple");
        self.repository.delete_tuple(tuple).await
    }

    /// Batch write operation (atomic)
    pub async fn batch_write(&self, request: WriteRequest) -> Result<(), ZanzibarError> {
        for tuple in request.tuples() {
            self.namespaces.validate_tuple(tuple)?;
        }
        info!(
            inserts = request.count(&PatchAction::Insert),
            deletes = request.count(&PatchAction::Delete),
            "Applying relation tuple batch"
        );
        self.repository.batch_write(request).await
    }

    /// Apply insert/delete deltas atomically
    pub async fn patch(&self, deltas: Vec<RelationTupleDelta>) -> Result<(), ZanzibarError> {
        self.batch_write(WriteRequest::from_deltas(deltas)).await
    }

    /// Read one page of tuples matching a filter
    pub async fn read_tuples(
        &self,
        query: &RelationQuery,
        page: PageRequest,
    ) -> Result<TuplePage, ZanzibarError> {
        self.namespaces.validate_query(query)?;
        if let SubjectFilter::Exact(ref subject) = query.subject {
            subject.validate()?;
        }
        let page = PageRequest {
            page_size: self.config.effective_page_size(page.page_size),
            page_token: page.page_token,
        };
        self.repository.read_tuples(query, &page).await
    }

    // =============================================================================
    // Core Authorization Operations
    // =============================================================================

    /// Check if a subject has a relation to an object
    pub async fn check(
        &self,
        namespace: &str,
        object: &str,
        relation: &str,
        subject: &Subject,
    ) -> Result<bool, ZanzibarError> {
        let request = CheckRequest::new(namespace, object, relation, subject.clone());
        self.check_request(&request).await
    }

    /// Check with a depth bound that may only tighten `max_read_depth`
    pub async fn check_with_depth(
        &self,
        namespace: &str,
        object: &str,
        relation: &str,
        subject: &Subject,
        max_depth: u32,
    ) -> Result<bool, ZanzibarError> {
        let mut request = CheckRequest::new(namespace, object, relation, subject.clone());
        request.max_depth = max_depth;
        self.check_request(&request).await
    }

    /// Check with a per-request depth bound
    pub async fn check_request(&self, request: &CheckRequest) -> Result<bool, ZanzibarError> {
        request.validate()?;
        self.namespaces.validate_namespace(&request.namespace)?;
        self.namespaces.validate_subject(&request.subject)?;

        let max_depth = self.config.effective_depth(request.max_depth);
        let allowed = self
            .checker
            .check(
                &request.namespace,
                &request.object,
                &request.relation,
                &request.subject,
                max_depth,
            )
            .await?;

        debug!(
            namespace = %request.namespace,
            object = %request.object,
            relation = %request.relation,
            subject = %request.subject,
            allowed,
            "Check completed"
        );
        Ok(allowed)
    }

    /// Batch check multiple permissions at once
    pub async fn batch_check(
        &self,
        requests: Vec<CheckRequest>,
    ) -> Result<Vec<CheckResponse>, ZanzibarError> {
        try_join_all(requests.iter().map(|request| async move {
            let allowed = self.check_request(request).await?;
            Ok::<_, ZanzibarError>(CheckResponse { allowed })
        }))
        .await
    }

    // =============================================================================
    // Subject Expansion
    // =============================================================================

    /// Expand all subjects that have a relation to an object
    pub async fn expand(
        &self,
        set: &SubjectSet,
        max_depth: u32,
    ) -> Result<ExpandTree, ZanzibarError> {
        set.validate()?;
        self.namespaces.validate_namespace(&set.namespace)?;
        self.expander
            .expand(set, self.config.effective_depth(max_depth))
            .await
    }

    /// List every subject id a subject reference resolves to
    pub async fn list_subjects(&self, subject: &Subject) -> Result<Vec<String>, ZanzibarError> {
        subject.validate()?;
        self.namespaces.validate_subject(subject)?;
        let members = self
            .expander
            .resolve(subject, self.config.max_read_depth)
            .await?;
        Ok(members.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryTupleRepository;

    #[tokio::test]
    async fn test_basic_check() {
        let repo = Arc::new(InMemoryTupleRepository::new());
        let engine = AuthorizationEngine::new(repo);
        let bob = Subject::id("bob");

        // Initially no permission
        assert!(!engine.check("notebooks", "notebook1", "owner", &bob).await.unwrap());

        engine
            .write_tuple(RelationTuple::new("notebooks", "notebook1", "owner", bob.clone()))
            .await
            .unwrap();

        assert!(engine.check("notebooks", "notebook1", "owner", &bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_namespace_rejected() {
        let repo = Arc::new(InMemoryTupleRepository::new());
        let config = EngineConfig {
            namespaces: vec!["notebooks".to_string()],
            ..Default::default()
        };
        let engine = AuthorizationEngine::with_config(repo.clone(), config);

        let err = engine
            .write_tuple(RelationTuple::new("files", "f", "owner", Subject::id("bob")))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(repo.is_empty());

        let err = engine
            .check("files", "f", "owner", &Subject::id("bob"))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn test_batch_check() {
        let repo = Arc::new(InMemoryTupleRepository::new());
        let engine = AuthorizationEngine::new(repo);
        engine
            .patch(vec![RelationTupleDelta {
                action: PatchAction::Insert,
                relation_tuple: "teams:dragonteam#member@steven".parse().unwrap(),
            }])
            .await
            .unwrap();

        let responses = engine
            .batch_check(vec![
                CheckRequest::new("teams", "dragonteam", "member", Subject::id("steven")),
                CheckRequest::new("teams", "dragonteam", "member", Subject::id("mallory")),
            ])
            .await
            .unwrap();
        assert_eq!(
            responses,
            vec![CheckResponse { allowed: true }, CheckResponse { allowed: false }]
        );
    }

    #[tokio::test]
    async fn test_request_depth_cannot_exceed_global_bound() {
        let repo = Arc::new(InMemoryTupleRepository::new());
        let config = EngineConfig {
            max_read_depth: 2,
            ..Default::default()
        };
        let engine = AuthorizationEngine::with_config(repo, config);
        for tuple in ["g:1#m@g:2#m", "g:2#m@g:3#m", "g:3#m@deep"] {
            engine.write_tuple(tuple.parse().unwrap()).await.unwrap();
        }

        let deep = Subject::id("deep");
        assert!(!engine.check_with_depth("g", "1", "m", &deep, 10).await.unwrap());
        assert!(engine.check("g", "2", "m", &deep).await.unwrap());
        assert!(!engine.check_with_depth("g", "2", "m", &deep, 1).await.unwrap());
    }
}
