//! Relation-tuple authorization engine
//!
//! Stores `(namespace, object, relation, subject)` tuples and answers whether a
//! subject is related to an object, directly or through nested subject sets:
//! - Tuple storage with point lookups, filtered paginated scans and atomic batches
//! - Subject-set expansion into the direct subjects they denote
//! - Checks with cycle detection and a configurable depth bound
//!
//! # Core Concepts
//!
//! - **Namespace**: A partition of the tuple space (e.g., `notebooks`, `teams`)
//! - **Subject**: A subject id (`steven`) or a subject set (`teams:dragonteam#member`)
//! - **Tuple**: A stored fact `namespace:object#relation@subject`
//! - **Check**: Whether a subject holds a relation to an object, possibly transitively
//!
//! # Example
//!
//! ```rust
//! use rebac_engine::{repository::InMemoryTupleRepository, AuthorizationEngine, RelationTuple, Subject};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), rebac_engine::ZanzibarError> {
//! let engine = AuthorizationEngine::new(Arc::new(InMemoryTupleRepository::new()));
//!
//! engine.write_tuple("notebooks:notebook1#owner@teams:dragonteam#member".parse()?).await?;
//! engine.write_tuple(RelationTuple::new("teams", "dragonteam", "member", Subject::id("steven"))).await?;
//!
//! let allowed = engine.check("notebooks", "notebook1", "owner", &Subject::id("steven")).await?;
//! assert!(allowed);
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod config;
pub mod engine;
pub mod error;
pub mod expand;
pub mod models;
pub mod repository;
pub mod schema;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use models::*;
pub use schema::*;
