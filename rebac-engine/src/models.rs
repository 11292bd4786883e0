use crate::error::{Result, ZanzibarError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Indirect subject: every subject related to `object` via `relation` in `namespace`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectSet {
    pub namespace: String,
    pub object: String,
    pub relation: String,
}

impl SubjectSet {
    pub fn new(namespace: &str, object: &str, relation: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            object: object.to_string(),
            relation: relation.to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_field("subject_set.namespace", &self.namespace)?;
        require_field("subject_set.object", &self.object)?;
        require_field("subject_set.relation", &self.relation)
    }
}

impl fmt::Display for SubjectSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.namespace, self.object, self.relation)
    }
}

impl FromStr for SubjectSet {
    type Err = ZanzibarError;

    fn from_str(s: &str) -> Result<Self> {
        let (namespace, rest) = s
            .split_once(':')
            .ok_or_else(|| malformed(s, "expected namespace:object#relation"))?;
        let (object, relation) = rest
            .split_once('#')
            .ok_or_else(|| malformed(s, "expected namespace:object#relation"))?;
        let set = SubjectSet::new(namespace, object, relation);
        set.validate()?;
        Ok(set)
    }
}

/// The subject of a relation tuple
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
    #[serde(rename = "subject_id")]
    Id(String),
    #[serde(rename = "subject_set")]
    Set(SubjectSet),
}

impl Subject {
    pub fn id(subject_id: &str) -> Self {
        Subject::Id(subject_id.to_string())
    }

    pub fn set(namespace: &str, object: &str, relation: &str) -> Self {
        Subject::Set(SubjectSet::new(namespace, object, relation))
    }

    pub fn as_set(&self) -> Option<&SubjectSet> {
        match self {
            Subject::Set(set) => Some(set),
            Subject::Id(_) => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Subject::Id(id) => require_field("subject_id", id),
            Subject::Set(set) => set.validate(),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Id(id) => write!(f, "{}", id),
            Subject::Set(set) => write!(f, "{}", set),
        }
    }
}

impl FromStr for Subject {
    type Err = ZanzibarError;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains(':') {
            return Ok(Subject::Set(s.parse()?));
        }
        require_field("subject_id", s)?;
        Ok(Subject::id(s))
    }
}

impl From<SubjectSet> for Subject {
    fn from(set: SubjectSet) -> Self {
        Subject::Set(set)
    }
}

/// A stored fact: `subject` has `relation` to `object` in `namespace`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationTuple {
    pub namespace: String,
    pub object: String,
    pub relation: String,
    #[serde(flatten)]
    pub subject: Subject,
}

impl RelationTuple {
    pub fn new(namespace: &str, object: &str, relation: &str, subject: Subject) -> Self {
        Self {
            namespace: namespace.to_string(),
            object: object.to_string(),
            relation: relation.to_string(),
            subject,
        }
    }

    /// The `(namespace, object, relation)` node this tuple hangs off
    pub fn key(&self) -> TupleKey {
        TupleKey::new(&self.namespace, &self.object, &self.relation)
    }

    pub fn validate(&self) -> Result<()> {
        require_field("namespace", &self.namespace)?;
        require_field("object", &self.object)?;
        require_field("relation", &self.relation)?;
        self.subject.validate()
    }
}

impl fmt::Display for RelationTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}#{}@{}",
            self.namespace, self.object, self.relation, self.subject
        )
    }
}

impl FromStr for RelationTuple {
    type Err = ZanzibarError;

    /// Parses `namespace:object#relation@subject`
    fn from_str(s: &str) -> Result<Self> {
        let (node, subject) = s
            .split_once('@')
            .ok_or_else(|| malformed(s, "expected namespace:object#relation@subject"))?;
        let key: SubjectSet = node.parse()?;
        let tuple = RelationTuple {
            namespace: key.namespace,
            object: key.object,
            relation: key.relation,
            subject: subject.parse()?,
        };
        tuple.validate()?;
        Ok(tuple)
    }
}

/// Index key of the tuple graph: one node per `(namespace, object, relation)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TupleKey {
    pub namespace: String,
    pub object: String,
    pub relation: String,
}

impl TupleKey {
    pub fn new(namespace: &str, object: &str, relation: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            object: object.to_string(),
            relation: relation.to_string(),
        }
    }
}

impl From<&SubjectSet> for TupleKey {
    fn from(set: &SubjectSet) -> Self {
        TupleKey::new(&set.namespace, &set.object, &set.relation)
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.namespace, self.object, self.relation)
    }
}

/// Narrows a query by the shape or value of the tuple subject
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SubjectFilter {
    #[default]
    Any,
    DirectOnly,
    SubjectSetsOnly,
    Exact(Subject),
}

impl SubjectFilter {
    pub fn matches(&self, subject: &Subject) -> bool {
        match self {
            SubjectFilter::Any => true,
            SubjectFilter::DirectOnly => matches!(subject, Subject::Id(_)),
            SubjectFilter::SubjectSetsOnly => matches!(subject, Subject::Set(_)),
            SubjectFilter::Exact(expected) => expected == subject,
        }
    }
}

/// Tuple filter; `None` fields act as wildcards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationQuery {
    pub namespace: Option<String>,
    pub object: Option<String>,
    pub relation: Option<String>,
    pub subject: SubjectFilter,
}

impl RelationQuery {
    /// Query for every tuple hanging off a single node
    pub fn node(namespace: &str, object: &str, relation: &str) -> Self {
        Self {
            namespace: Some(namespace.to_string()),
            object: Some(object.to_string()),
            relation: Some(relation.to_string()),
            subject: SubjectFilter::Any,
        }
    }

    pub fn with_subject(mut self, subject: SubjectFilter) -> Self {
        self.subject = subject;
        self
    }

    pub fn matches_key(&self, key: &TupleKey) -> bool {
        field_matches(&self.namespace, &key.namespace)
            && field_matches(&self.object, &key.object)
            && field_matches(&self.relation, &key.relation)
    }

    pub fn matches(&self, tuple: &RelationTuple) -> bool {
        field_matches(&self.namespace, &tuple.namespace)
            && field_matches(&self.object, &tuple.object)
            && field_matches(&self.relation, &tuple.relation)
            && self.subject.matches(&tuple.subject)
    }

    /// The single node addressed by this query, if every key field is set
    pub fn exact_key(&self) -> Option<TupleKey> {
        match (&self.namespace, &self.object, &self.relation) {
            (Some(namespace), Some(object), Some(relation)) => {
                Some(TupleKey::new(namespace, object, relation))
            }
            _ => None,
        }
    }
}

fn field_matches(filter: &Option<String>, value: &str) -> bool {
    filter.as_deref().map_or(true, |expected| expected == value)
}

/// Requested page of a tuple listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero selects the configured default
    pub page_size: usize,
    /// Empty for the first page
    pub page_token: String,
}

impl PageRequest {
    pub fn first(page_size: usize) -> Self {
        Self {
            page_size,
            page_token: String::new(),
        }
    }
}

/// One page of a tuple listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuplePage {
    pub relation_tuples: Vec<RelationTuple>,
    /// Empty on the last page
    pub next_page_token: String,
}

/// Single step of an atomic batch write
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchAction {
    Insert,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTupleDelta {
    pub action: PatchAction,
    pub relation_tuple: RelationTuple,
}

/// Batch write request: insert and delete steps applied atomically, in order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    pub deltas: Vec<RelationTupleDelta>,
}

impl WriteRequest {
    pub fn from_deltas(deltas: Vec<RelationTupleDelta>) -> Self {
        Self { deltas }
    }

    pub fn insert(mut self, tuple: RelationTuple) -> Self {
        self.deltas.push(RelationTupleDelta {
            action: PatchAction::Insert,
            relation_tuple: tuple,
        });
        self
    }

    pub fn delete(mut self, tuple: RelationTuple) -> Self {
        self.deltas.push(RelationTupleDelta {
            action: PatchAction::Delete,
            relation_tuple: tuple,
        });
        self
    }

    /// Number of steps with the given action
    pub fn count(&self, action: &PatchAction) -> usize {
        self.deltas.iter().filter(|d| d.action == *action).count()
    }

    pub fn tuples(&self) -> impl Iterator<Item = &RelationTuple> {
        self.deltas.iter().map(|d| &d.relation_tuple)
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

/// Authorization check request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckRequest {
    pub namespace: String,
    pub object: String,
    pub relation: String,
    pub subject: Subject,
    /// Lowers the configured read depth for this request; zero keeps it
    #[serde(default)]
    pub max_depth: u32,
}

impl CheckRequest {
    pub fn new(namespace: &str, object: &str, relation: &str, subject: Subject) -> Self {
        Self {
            namespace: namespace.to_string(),
            object: object.to_string(),
            relation: relation.to_string(),
            subject,
            max_depth: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        require_field("namespace", &self.namespace)?;
        require_field("object", &self.object)?;
        require_field("relation", &self.relation)?;
        self.subject.validate()
    }
}

/// Authorization check response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResponse {
    pub allowed: bool,
}

/// Node kind of an expand tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandNodeType {
    /// A subject set whose members are the children
    Union,
    /// A terminal subject
    Leaf,
}

/// Subject tree returned by expand
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpandTree {
    #[serde(rename = "type")]
    pub node_type: ExpandNodeType,
    #[serde(flatten)]
    pub subject: Subject,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ExpandTree>,
}

impl ExpandTree {
    pub fn leaf(subject: Subject) -> Self {
        Self {
            node_type: ExpandNodeType::Leaf,
            subject,
            children: Vec::new(),
        }
    }
}

fn require_field(name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ZanzibarError::ValidationError(format!(
            "{} must not be empty",
            name
        )));
    }
    Ok(())
}

fn malformed(input: &str, expected: &str) -> ZanzibarError {
    ZanzibarError::ValidationError(format!("malformed tuple string {:?}: {}", input, expected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_string_form() {
        let tuple: RelationTuple = "codeinsights:codeinsight1#owner@notebooks:notebook1#owner"
            .parse()
            .unwrap();
        assert_eq!(tuple.namespace, "codeinsights");
        assert_eq!(tuple.subject, Subject::set("notebooks", "notebook1", "owner"));
        assert_eq!(
            tuple.to_string(),
            "codeinsights:codeinsight1#owner@notebooks:notebook1#owner"
        );

        let direct: RelationTuple = "teams:dragonteam#member@steven".parse().unwrap();
        assert_eq!(direct.subject, Subject::id("steven"));
    }

    #[test]
    fn test_malformed_tuple_strings() {
        for input in ["notebooks:notebook1#owner", "notebook1#owner@bob", ":a#b@c", "a:b#@c"] {
            let err = input.parse::<RelationTuple>().unwrap_err();
            assert!(err.is_validation(), "{} should be rejected", input);
        }
    }

    #[test]
    fn test_wire_format() {
        let tuple = RelationTuple::new("notebooks", "notebook1", "owner", Subject::id("bob"));
        let json = serde_json::to_value(&tuple).unwrap();
        assert_eq!(json["subject_id"], "bob");
        assert!(json.get("subject_set").is_none());

        let nested = RelationTuple::new(
            "notebooks",
            "notebook1",
            "owner",
            Subject::set("teams", "dragonteam", "member"),
        );
        let json = serde_json::to_value(&nested).unwrap();
        assert_eq!(json["subject_set"]["namespace"], "teams");
        let back: RelationTuple = serde_json::from_value(json).unwrap();
        assert_eq!(back, nested);
    }

    #[test]
    fn test_empty_fields_rejected() {
        let tuple = RelationTuple::new("notebooks", "", "owner", Subject::id("bob"));
        assert!(matches!(tuple.validate(), Err(ZanzibarError::ValidationError(_))));

        let tuple = RelationTuple::new("notebooks", "notebook1", "owner", Subject::set("teams", "", "member"));
        assert!(tuple.validate().is_err());
    }

    #[test]
    fn test_query_matching() {
        let tuple = RelationTuple::new("teams", "dragonteam", "member", Subject::id("steven"));
        let query = RelationQuery {
            namespace: Some("teams".to_string()),
            ..Default::default()
        };
        assert!(query.matches(&tuple));
        assert!(!query.clone().with_subject(SubjectFilter::SubjectSetsOnly).matches(&tuple));
        assert!(query
            .with_subject(SubjectFilter::Exact(Subject::id("steven")))
            .matches(&tuple));
    }
}
