//! Query orchestration for SQLWizz.
//!
//! `sqlwizz-session` is the **orchestration layer**. The [`QueryWizzard`]
//! turns calls such as `get_all("Film", ...)` or `create("Film", ...)` into
//! statements, executes them through a [`Database`](sqlwizz_core::Database)
//! and hydrates the rows into [`Entity`](sqlwizz_core::Entity) values.
//!
//! # Role In The Architecture
//!
//! - **Registry**: models registered by name, at bootstrap or through a [`ModelObserver`].
//! - **Planning**: eager many-to-one joins and aggregate subqueries in the primary SELECT.
//! - **Follow-ups**: one extra query per entity and lazy relation.
//! - **Writes**: field, many-to-one and many-to-many resolution, junction
//!   reconciliation and transactions.
//!
//! # Example
//!
//! ```ignore
//! let mut wizzard = QueryWizzard::with_config(db, WizzardConfig::default())?;
//! wizzard.register_model(film_model());
//!
//! let page = wizzard.get_all(
//!     "Film",
//!     &FetchOptions::new()
//!         .equals("rating", "PG")
//!         .order_by("title", true)
//!         .paginate(20, Some(1)),
//! )?;
//! ```

pub mod config;
pub mod link;
pub mod options;
mod plan;
pub mod registry;
pub mod wizzard;

pub use config::WizzardConfig;
pub use link::{LinkOp, LinkPlan, diff_ids, parse_id_list};
pub use options::{FetchOptions, RelationOptions, SearchResult};
pub use registry::{ModelObserver, ModelRegistry};
pub use wizzard::QueryWizzard;
