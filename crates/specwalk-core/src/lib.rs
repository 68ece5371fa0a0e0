//! specwalk-core: test discovery and execution engine.
//!
//! This crate finds test and suite declarations in TypeScript test files,
//! keeps them in an identity-stable tree and runs them as child processes.
//!
//! ## Modules
//!
//! - [`indexer`]: syntax-tree walk producing declaration nodes
//! - [`registry`]: service / file / function tree with stable identities
//! - [`executor`]: one child process per run, verdict from diagnostic output
//! - [`coordinator`]: batches, polling and cancellation
//! - [`explorer`]: editor document events feeding the registry
//! - [`workspace`]: which paths are test files and which service owns them
//! - [`changelog`]: release bumping
//! - [`config`]: layered configuration

pub mod changelog;
pub mod config;
pub mod coordinator;
pub mod executor;
pub mod explorer;
pub mod indexer;
pub mod kind;
pub mod registry;
pub mod workspace;

pub use config::Config;
pub use coordinator::{cancel_pair, BatchOutcome, CancelSource, CancelToken, RunCoordinator};
pub use executor::{ProcessRunExecutor, RunHandle, RunLog, RunReporter, RunState};
pub use explorer::TestExplorer;
pub use indexer::{Position, SyntaxTreeIndexer, TestNode};
pub use kind::TestKind;
pub use registry::{Entity, EntityKey, Registry, TreeEdit};
pub use workspace::{Document, Workspace};
