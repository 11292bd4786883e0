//! End-to-end engine scenarios
//!
//! Mirrors the permission graph a client builds for shared notebooks:
//! 1. Bob owns notebook1 directly
//! 2. codeinsight1 is embedded in notebook1 (its owners inherit ownership)
//! 3. notebook1 is shared with dragonteam
//! 4. Steven joins dragonteam and so owns codeinsight1 three hops away

use rebac_engine::repository::{InMemoryTupleRepository, TupleRepository};
use rebac_engine::{
    AuthorizationEngine, EngineConfig, PageRequest, RelationQuery, RelationTuple, Subject,
    SubjectFilter, SubjectSet, ZanzibarError,
};
use async_trait::async_trait;
use std::sync::Arc;

// Helper to create test engine
fn create_test_engine() -> AuthorizationEngine {
    let repo = Arc::new(InMemoryTupleRepository::new());
    AuthorizationEngine::with_config(
        repo,
        EngineConfig {
            namespaces: vec![
                "notebooks".to_string(),
                "codeinsights".to_string(),
                "teams".to_string(),
            ],
            ..Default::default()
        },
    )
}

async fn setup_shared_notebook(engine: &AuthorizationEngine) {
    for tuple in [
        "notebooks:notebook1#owner@bob",
        "codeinsights:codeinsight1#owner@bob",
        "codeinsights:codeinsight1#owner@notebooks:notebook1#owner",
        "notebooks:notebook1#owner@teams:dragonteam#member",
        "teams:dragonteam#member@steven",
    ] {
        engine.write_tuple(tuple.parse().unwrap()).await.unwrap();
    }
}

#[tokio::test]
async fn test_direct_owner() {
    let engine = create_test_engine();
    engine
        .write_tuple(RelationTuple::new("notebooks", "notebook1", "owner", Subject::id("bob")))
        .await
        .unwrap();

    assert!(engine
        .check("notebooks", "notebook1", "owner", &Subject::id("bob"))
        .await
        .unwrap());

    // Denial is a normal value, not an error
    let alice = engine
        .check("notebooks", "notebook1", "owner", &Subject::id("alice"))
        .await;
    assert!(matches!(alice, Ok(false)));
}

#[tokio::test]
async fn test_three_hop_transitive_ownership() {
    let engine = create_test_engine();
    setup_shared_notebook(&engine).await;

    assert!(
        engine
            .check("codeinsights", "codeinsight1", "owner", &Subject::id("steven"))
            .await
            .unwrap(),
        "Steven should own codeinsight1 through notebook1 and dragonteam"
    );
    assert!(engine
        .check("codeinsights", "codeinsight1", "owner", &Subject::id("bob"))
        .await
        .unwrap());
    assert!(!engine
        .check("codeinsights", "codeinsight1", "owner", &Subject::id("mallory"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_removing_membership_revokes_access() {
    let engine = create_test_engine();
    setup_shared_notebook(&engine).await;

    let membership: RelationTuple = "teams:dragonteam#member@steven".parse().unwrap();
    engine.delete_tuple(&membership).await.unwrap();

    assert!(!engine
        .check("codeinsights", "codeinsight1", "owner", &Subject::id("steven"))
        .await
        .unwrap());
    // Bob still owns it directly
    assert!(engine
        .check("codeinsights", "codeinsight1", "owner", &Subject::id("bob"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_tuples_may_reference_objects_written_later() {
    let engine = create_test_engine();

    engine
        .write_tuple("notebooks:notebook2#owner@teams:blueteam#member".parse().unwrap())
        .await
        .unwrap();
    assert!(!engine
        .check("notebooks", "notebook2", "owner", &Subject::id("ada"))
        .await
        .unwrap());

    engine
        .write_tuple("teams:blueteam#member@ada".parse().unwrap())
        .await
        .unwrap();
    assert!(engine
        .check("notebooks", "notebook2", "owner", &Subject::id("ada"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_expand_and_list_subjects() {
    let engine = create_test_engine();
    setup_shared_notebook(&engine).await;

    let owners = engine
        .list_subjects(&Subject::set("codeinsights", "codeinsight1", "owner"))
        .await
        .unwrap();
    assert_eq!(owners, vec!["bob".to_string(), "steven".to_string()]);

    let tree = engine
        .expand(&SubjectSet::new("codeinsights", "codeinsight1", "owner"), 0)
        .await
        .unwrap();
    assert_eq!(tree.children.len(), 2);
}

#[tokio::test]
async fn test_listing_relation_tuples() {
    let engine = create_test_engine();
    setup_shared_notebook(&engine).await;

    let query = RelationQuery {
        namespace: Some("codeinsights".to_string()),
        ..Default::default()
    };
    let page = engine.read_tuples(&query, PageRequest::default()).await.unwrap();
    assert_eq!(page.relation_tuples.len(), 2);

    let by_subject = RelationQuery::default().with_subject(SubjectFilter::Exact(Subject::id("bob")));
    let page = engine.read_tuples(&by_subject, PageRequest::default()).await.unwrap();
    let rendered: Vec<String> = page.relation_tuples.iter().map(ToString::to_string).collect();
    assert_eq!(
        rendered,
        vec![
            "codeinsights:codeinsight1#owner@bob".to_string(),
            "notebooks:notebook1#owner@bob".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_concurrent_writers_and_checkers() {
    let engine = Arc::new(create_test_engine());
    engine
        .write_tuple("notebooks:notebook1#owner@teams:dragonteam#member".parse().unwrap())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..16 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move {
            let member = format!("user{}", i);
            engine
                .write_tuple(RelationTuple::new("teams", "dragonteam", "member", Subject::id(&member)))
                .await
                .unwrap();
            // Read-after-write from the same caller
            engine
                .check("notebooks", "notebook1", "owner", &Subject::id(&member))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }
}

/// Repository whose backend is down
struct UnavailableRepository;

#[async_trait]
impl TupleRepository for UnavailableRepository {
    async fn write_tuple(&self, _tuple: RelationTuple) -> Result<(), ZanzibarError> {
        Err(ZanzibarError::StorageError("backend unavailable".to_string()))
    }

    async fn delete_tuple(&self, _tuple: &RelationTuple) -> Result<(), ZanzibarError> {
        Err(ZanzibarError::StorageError("backend unavailable".to_string()))
    }

    async fn batch_write(&self, _request: rebac_engine::WriteRequest) -> Result<(), ZanzibarError> {
        Err(ZanzibarError::StorageError("backend unavailable".to_string()))
    }

    async fn read_tuples(
        &self,
        _query: &RelationQuery,
        _page: &PageRequest,
    ) -> Result<rebac_engine::TuplePage, ZanzibarError> {
        Err(ZanzibarError::StorageError("backend unavailable".to_string()))
    }

    async fn tuple_exists(&self, _tuple: &RelationTuple) -> Result<bool, ZanzibarError> {
        Err(ZanzibarError::StorageError("backend unavailable".to_string()))
    }
}

#[tokio::test]
async fn test_storage_failures_propagate() {
    let engine = AuthorizationEngine::new(Arc::new(UnavailableRepository));

    let err = engine
        .check("notebooks", "notebook1", "owner", &Subject::id("bob"))
        .await
        .unwrap_err();
    assert!(matches!(err, ZanzibarError::StorageError(_)));

    let err = engine
        .write_tuple("notebooks:notebook1#owner@bob".parse().unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, ZanzibarError::StorageError(_)));
}
