//! Per-statement resolution and rendering context
//!
//! One context is built per client statement and threaded through both
//! `resolve_type` and `rebuild`. Coordinator-only values (current date, time,
//! user, database, version) are captured once here so every shard sees the
//! same literal.

use crate::catalog::Catalog;
use crate::config::ConfigSnapshot;
use crate::types::TypeDescriptor;
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use std::sync::Arc;

/// Session values fixed at statement start.
#[derive(Debug, Clone)]
pub struct SessionValues {
    pub current_date: NaiveDate,
    pub current_time: NaiveTime,
    pub current_timestamp: NaiveDateTime,
    pub user: String,
    pub database: String,
    pub version: String,
}

impl SessionValues {
    /// Capture wall-clock values for a new statement.
    pub fn capture(user: &str, database: &str, version: &str) -> Self {
        let now = Local::now().naive_local();
        Self::at(now, user, database, version)
    }

    /// Build from a fixed timestamp. Tests and replay use this.
    pub fn at(now: NaiveDateTime, user: &str, database: &str, version: &str) -> Self {
        Self {
            current_date: now.date(),
            current_time: now.time(),
            current_timestamp: now,
            user: user.to_string(),
            database: database.to_string(),
            version: version.to_string(),
        }
    }
}

/// Everything resolution and rebuild may consult. Read-only; the tree is the
/// only thing mutated during a statement.
pub struct ResolveContext<'a> {
    pub catalog: &'a dyn Catalog,
    pub config: Arc<ConfigSnapshot>,
    pub session: &'a SessionValues,
    /// Declared types for prepared-statement parameters, positional. A
    /// missing entry leaves the parameter deferred (typed NULL) so a later
    /// pass can retry once analysis order makes the type available.
    pub param_types: Vec<Option<TypeDescriptor>>,
    /// Literal texts bound to parameters for rendering; unbound parameters
    /// render as `?`.
    pub bindings: Vec<String>,
    /// Optional schema qualifier prepended to table references when a
    /// fragment is shipped to a shard.
    pub shard_qualifier: Option<String>,
}

impl<'a> ResolveContext<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        config: Arc<ConfigSnapshot>,
        session: &'a SessionValues,
    ) -> Self {
        Self {
            catalog,
            config,
            session,
            param_types: Vec::new(),
            bindings: Vec::new(),
            shard_qualifier: None,
        }
    }

    pub fn with_param_types(mut self, types: Vec<Option<TypeDescriptor>>) -> Self {
        self.param_types = types;
        self
    }

    pub fn with_bindings(mut self, bindings: Vec<String>) -> Self {
        self.bindings = bindings;
        self
    }

    pub fn with_shard_qualifier(mut self, qualifier: impl Into<String>) -> Self {
        self.shard_qualifier = Some(qualifier.into());
        self
    }
}
