//! Wire shapes shared by the read and write handlers

use crate::error::ApiError;
use rebac_engine::{
    CheckRequest, PatchAction, RelationQuery, RelationTuple, RelationTupleDelta, Subject,
    SubjectFilter, SubjectSet,
};
use serde::{Deserialize, Serialize};

/// JSON body naming a tuple: exactly one of `subject_id` / `subject_set`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelationTupleBody {
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub relation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_set: Option<SubjectSet>,
}

impl TryFrom<RelationTupleBody> for RelationTuple {
    type Error = ApiError;

    fn try_from(body: RelationTupleBody) -> Result<Self, Self::Error> {
        let tuple = RelationTuple {
            namespace: body.namespace,
            object: body.object,
            relation: body.relation,
            subject: require_subject(body.subject_id, body.subject_set)?,
        };
        tuple.validate()?;
        Ok(tuple)
    }
}

impl From<RelationTuple> for RelationTupleBody {
    fn from(tuple: RelationTuple) -> Self {
        let (subject_id, subject_set) = match tuple.subject {
            Subject::Id(id) => (Some(id), None),
            Subject::Set(set) => (None, Some(set)),
        };
        Self {
            namespace: tuple.namespace,
            object: tuple.object,
            relation: tuple.relation,
            subject_id,
            subject_set,
        }
    }
}

/// One step of a `PATCH /write/relation-tuples` body
#[derive(Debug, Clone, Deserialize)]
pub struct PatchDeltaBody {
    pub action: PatchAction,
    pub relation_tuple: RelationTupleBody,
}

impl TryFrom<PatchDeltaBody> for RelationTupleDelta {
    type Error = ApiError;

    fn try_from(body: PatchDeltaBody) -> Result<Self, Self::Error> {
        Ok(RelationTupleDelta {
            action: body.action,
            relation_tuple: body.relation_tuple.try_into()?,
        })
    }
}

/// JSON body of `POST /read/check`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckBody {
    #[serde(flatten)]
    pub tuple: RelationTupleBody,
    #[serde(default)]
    pub max_depth: Option<u32>,
}

impl TryFrom<CheckBody> for CheckRequest {
    type Error = ApiError;

    fn try_from(body: CheckBody) -> Result<Self, Self::Error> {
        let tuple = RelationTuple::try_from(body.tuple)?;
        Ok(CheckRequest {
            namespace: tuple.namespace,
            object: tuple.object,
            relation: tuple.relation,
            subject: tuple.subject,
            max_depth: body.max_depth.unwrap_or(0),
        })
    }
}

/// Flat query-string form of a tuple or tuple filter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TupleQueryParams {
    pub namespace: Option<String>,
    pub object: Option<String>,
    pub relation: Option<String>,
    pub subject_id: Option<String>,
    #[serde(rename = "subject_set.namespace")]
    pub subject_set_namespace: Option<String>,
    #[serde(rename = "subject_set.object")]
    pub subject_set_object: Option<String>,
    #[serde(rename = "subject_set.relation")]
    pub subject_set_relation: Option<String>,
    pub page_size: Option<usize>,
    pub page_token: Option<String>,
    #[serde(rename = "max-depth")]
    pub max_depth: Option<u32>,
}

impl TupleQueryParams {
    /// True when no tuple field was supplied at all
    pub fn is_empty(&self) -> bool {
        self.namespace.is_none()
            && self.object.is_none()
            && self.relation.is_none()
            && self.subject_id.is_none()
            && self.subject_set_namespace.is_none()
            && self.subject_set_object.is_none()
            && self.subject_set_relation.is_none()
    }

    fn subject_set(&self) -> Result<Option<SubjectSet>, ApiError> {
        match (
            &self.subject_set_namespace,
            &self.subject_set_object,
            &self.subject_set_relation,
        ) {
            (None, None, None) => Ok(None),
            (Some(namespace), Some(object), Some(relation)) => {
                Ok(Some(SubjectSet::new(namespace, object, relation)))
            }
            _ => Err(ApiError::validation(
                "subject_set.namespace, subject_set.object and subject_set.relation must be given together",
            )),
        }
    }

    /// Interpret the parameters as one fully specified tuple
    pub fn to_tuple(&self) -> Result<RelationTuple, ApiError> {
        RelationTupleBody {
            namespace: self.namespace.clone().unwrap_or_default(),
            object: self.object.clone().unwrap_or_default(),
            relation: self.relation.clone().unwrap_or_default(),
            subject_id: self.subject_id.clone(),
            subject_set: self.subject_set()?,
        }
        .try_into()
    }

    pub fn to_check_request(&self) -> Result<CheckRequest, ApiError> {
        let tuple = self.to_tuple()?;
        Ok(CheckRequest {
            namespace: tuple.namespace,
            object: tuple.object,
            relation: tuple.relation,
            subject: tuple.subject,
            max_depth: self.max_depth.unwrap_or(0),
        })
    }

    /// Interpret the parameters as a listing filter; absent fields match anything
    pub fn to_query(&self) -> Result<RelationQuery, ApiError> {
        let subject = match (&self.subject_id, self.subject_set()?) {
            (Some(_), Some(_)) => {
                return Err(ApiError::validation(
                    "subject_id and subject_set are mutually exclusive",
                ))
            }
            (Some(id), None) => SubjectFilter::Exact(Subject::Id(id.clone())),
            (None, Some(set)) => SubjectFilter::Exact(Subject::Set(set)),
            (None, None) => SubjectFilter::Any,
        };
        Ok(RelationQuery {
            namespace: self.namespace.clone(),
            object: self.object.clone(),
            relation: self.relation.clone(),
            subject,
        })
    }
}

fn require_subject(
    subject_id: Option<String>,
    subject_set: Option<SubjectSet>,
) -> Result<Subject, ApiError> {
    match (subject_id, subject_set) {
        (Some(id), None) => Ok(Subject::Id(id)),
        (None, Some(set)) => Ok(Subject::Set(set)),
        (Some(_), Some(_)) => Err(ApiError::validation(
            "subject_id and subject_set are mutually exclusive",
        )),
        (None, None) => Err(ApiError::validation(
            "one of subject_id or subject_set is required",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_requires_exactly_one_subject() {
        let body = RelationTupleBody {
            namespace: "notebooks".into(),
            object: "notebook1".into(),
            relation: "owner".into(),
            ..Default::default()
        };
        assert!(RelationTuple::try_from(body.clone()).is_err());

        let both = RelationTupleBody {
            subject_id: Some("bob".into()),
            subject_set: Some(SubjectSet::new("teams", "dragonteam", "member")),
            ..body.clone()
        };
        assert!(RelationTuple::try_from(both).is_err());

        let ok = RelationTupleBody {
            subject_id: Some("bob".into()),
            ..body
        };
        let tuple = RelationTuple::try_from(ok).unwrap();
        assert_eq!(tuple.to_string(), "notebooks:notebook1#owner@bob");
    }

    #[test]
    fn test_partial_subject_set_params_rejected() {
        let params = TupleQueryParams {
            namespace: Some("notebooks".into()),
            subject_set_namespace: Some("teams".into()),
            ..Default::default()
        };
        assert!(params.to_query().is_err());
    }
}
