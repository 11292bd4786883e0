use crate::{error::ZanzibarError, models::*};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of namespaces the engine accepts tuples and queries for
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamespaceRegistry {
    namespaces: BTreeSet<String>,
}

impl NamespaceRegistry {
    /// A registry that accepts every namespace
    pub fn permissive() -> Self {
        Self::default()
    }

    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_permissive(&self) -> bool {
        self.namespaces.is_empty()
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.is_permissive() || self.namespaces.contains(namespace)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.namespaces.iter().map(String::as_str)
    }

    pub fn validate_namespace(&self, namespace: &str) -> Result<(), ZanzibarError> {
        if self.contains(namespace) {
            Ok(())
        } else {
            Err(ZanzibarError::UnknownNamespace(namespace.to_string()))
        }
    }

    pub fn validate_subject(&self, subject: &Subject) -> Result<(), ZanzibarError> {
        match subject {
            Subject::Id(_) => Ok(()),
            Subject::Set(set) => self.validate_namespace(&set.namespace),
        }
    }

    /// Field and namespace validation applied before any write
    pub fn validate_tuple(&self, tuple: &RelationTuple) -> Result<(), ZanzibarError> {
        tuple.validate()?;
        self.validate_namespace(&tuple.namespace)?;
        self.validate_subject(&tuple.subject)
    }

    pub fn validate_query(&self, query: &RelationQuery) -> Result<(), ZanzibarError> {
        if let Some(ref namespace) = query.namespace {
            self.validate_namespace(namespace)?;
        }
        Ok(())
    }
}
