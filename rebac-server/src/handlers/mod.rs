pub mod check;
pub mod expand;
pub mod health;
pub mod relation_tuples;
