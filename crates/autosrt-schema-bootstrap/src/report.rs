//! Per-declaration outcomes of a bootstrap run.

use std::fmt;
use std::io::{self, Write};

use chrono::{DateTime, Utc};
use serde::Serialize;

use autosrt_schema_core::{CollectionName, IndexSpec};

/// Confirmation printed once every declaration has been applied.
pub const CONFIRMATION: &str = "✅ Collections and indexes created.";

/// One schema declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Declaration {
    /// A collection to create if absent.
    Collection {
        /// Collection name.
        name: CollectionName,
    },
    /// A unique index to create if absent.
    Index {
        /// The declared index.
        #[serde(flatten)]
        spec: IndexSpec,
    },
}

impl fmt::Display for Declaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collection { name } => write!(f, "collection {name}"),
            Self::Index { spec } => write!(f, "index {spec}"),
        }
    }
}

/// What happened (or would happen) to a declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// The object was created.
    Created,
    /// An identical object already existed.
    Unchanged,
    /// The object is missing and would be created.
    WouldCreate,
    /// An object with a different definition is in the way.
    Conflict(String),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::WouldCreate => f.write_str("would create"),
            Self::Conflict(detail) => write!(f, "conflict: {detail}"),
        }
    }
}

/// Outcome for one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeclarationOutcome {
    /// The declaration.
    pub declaration: Declaration,
    /// What happened to it.
    pub action: Action,
}

/// Summary of an `apply` or `plan` run.
#[derive(Debug, Clone, Serialize)]
pub struct BootstrapReport {
    /// Target database.
    pub database: String,
    /// Whether the run only inspected the store.
    pub dry_run: bool,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: DateTime<Utc>,
    /// Outcomes in application order.
    pub outcomes: Vec<DeclarationOutcome>,
}

impl BootstrapReport {
    pub(crate) fn new(database: &str, dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            database: database.to_string(),
            dry_run,
            started_at: now,
            finished_at: now,
            outcomes: Vec::new(),
        }
    }

    pub(crate) fn record(&mut self, declaration: Declaration, action: Action) {
        self.outcomes.push(DeclarationOutcome {
            declaration,
            action,
        });
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Utc::now();
        self
    }

    fn count(&self, predicate: impl Fn(&Action) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.action)).count()
    }

    /// Number of objects created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.count(|a| matches!(a, Action::Created))
    }

    /// Number of declarations already satisfied.
    #[must_use]
    pub fn unchanged(&self) -> usize {
        self.count(|a| matches!(a, Action::Unchanged))
    }

    /// Number of declarations a plan would create.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.count(|a| matches!(a, Action::WouldCreate))
    }

    /// Outcomes blocked by a conflicting definition.
    pub fn conflicts(&self) -> impl Iterator<Item = &DeclarationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.action, Action::Conflict(_)))
    }

    /// Whether the store already matches every declaration.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.action, Action::Unchanged))
    }
}

impl BootstrapReport {
    /// Write the report to `out`, followed by the confirmation line for a
    /// completed apply.
    ///
    /// With `json`, `out` receives only the pretty-printed JSON document and
    /// the confirmation goes to `err`.
    ///
    /// # Errors
    ///
    /// Returns an error if either writer fails.
    pub fn write_to(
        &self,
        json: bool,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<()> {
        if json {
            serde_json::to_writer_pretty(&mut *out, self)?;
            writeln!(out)?;
        } else {
            write!(out, "{self}")?;
        }

        if self.dry_run {
            Ok(())
        } else if json {
            writeln!(err, "{CONFIRMATION}")
        } else {
            writeln!(out, "{CONFIRMATION}")
        }
    }
}

impl fmt::Display for BootstrapReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.dry_run { "plan" } else { "apply" };
        writeln!(f, "{mode} for database {}:", self.database)?;
        for outcome in &self.outcomes {
            writeln!(f, "  {}: {}", outcome.declaration, outcome.action)?;
        }
        Ok(())
    }
}
