//! Property tests over randomly generated (often cyclic) tuple graphs

use proptest::prelude::*;
use rebac_engine::repository::{InMemoryTupleRepository, TupleRepository};
use rebac_engine::{
    AuthorizationEngine, EngineConfig, PageRequest, RelationQuery, RelationTuple, Subject,
    SubjectFilter,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

const GROUPS: u8 = 5;
const USERS: u8 = 3;

/// Edge from group `from` to either a user or another group
#[derive(Debug, Clone)]
enum Edge {
    User(u8, u8),
    Group(u8, u8),
}

fn edge() -> impl Strategy<Value = Edge> {
    prop_oneof![
        (0..GROUPS, 0..USERS).prop_map(|(g, u)| Edge::User(g, u)),
        (0..GROUPS, 0..GROUPS).prop_map(|(g, h)| Edge::Group(g, h)),
    ]
}

fn to_tuple(edge: &Edge) -> RelationTuple {
    match edge {
        Edge::User(g, u) => RelationTuple::new("groups", &format!("g{}", g), "member", Subject::id(&format!("u{}", u))),
        Edge::Group(g, h) => RelationTuple::new(
            "groups",
            &format!("g{}", g),
            "member",
            Subject::set("groups", &format!("g{}", h), "member"),
        ),
    }
}

/// Shortest-path reference: the start node is depth 1 and a user is reachable
/// iff some node at depth <= max_depth holds it directly.
fn reachable(edges: &[Edge], start: u8, user: u8, max_depth: u32) -> bool {
    let mut nested: HashMap<u8, Vec<u8>> = HashMap::new();
    let mut direct: HashSet<(u8, u8)> = HashSet::new();
    for edge in edges {
        match *edge {
            Edge::User(g, u) => {
                direct.insert((g, u));
            }
            Edge::Group(g, h) => nested.entry(g).or_default().push(h),
        }
    }

    let mut seen = HashSet::from([start]);
    let mut queue = VecDeque::from([(start, 1u32)]);
    while let Some((group, depth)) = queue.pop_front() {
        if depth > max_depth {
            continue;
        }
        if direct.contains(&(group, user)) {
            return true;
        }
        for &next in nested.get(&group).into_iter().flatten() {
            if seen.insert(next) {
                queue.push_back((next, depth + 1));
            }
        }
    }
    false
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn check_matches_bounded_reachability(
        edges in prop::collection::vec(edge(), 0..16),
        start in 0..GROUPS,
        user in 0..USERS,
        max_depth in 1u32..5,
    ) {
        let rt = runtime();
        let allowed = rt.block_on(async {
            let engine = AuthorizationEngine::with_config(
                Arc::new(InMemoryTupleRepository::new()),
                EngineConfig { max_read_depth: max_depth, check_concurrency: 2, ..Default::default() },
            );
            for edge in &edges {
                engine.write_tuple(to_tuple(edge)).await.unwrap();
            }
            engine
                .check("groups", &format!("g{}", start), "member", &Subject::id(&format!("u{}", user)))
                .await
                .unwrap()
        });
        prop_assert_eq!(allowed, reachable(&edges, start, user, max_depth));
    }

    #[test]
    fn insert_is_idempotent_and_readable(edges in prop::collection::vec(edge(), 1..12)) {
        let rt = runtime();
        rt.block_on(async {
            let repo = InMemoryTupleRepository::new();
            for edge in &edges {
                repo.write_tuple(to_tuple(edge)).await.unwrap();
                repo.write_tuple(to_tuple(edge)).await.unwrap();
            }
            let distinct: HashSet<RelationTuple> = edges.iter().map(to_tuple).collect();
            assert_eq!(repo.len(), distinct.len());

            for tuple in &distinct {
                let query = RelationQuery::node(&tuple.namespace, &tuple.object, &tuple.relation)
                    .with_subject(SubjectFilter::Exact(tuple.subject.clone()));
                let page = repo.read_tuples(&query, &PageRequest::default()).await.unwrap();
                assert_eq!(page.relation_tuples, vec![tuple.clone()]);
            }
        });
    }
}
