// lectern-core/src/lib.rs
pub mod descriptions;
pub mod ignore;
pub mod install;
pub mod inventory;
pub mod reconcile;
pub mod registry;
pub mod shell;
pub mod snapshot;

pub use reconcile::{ReconcileOptions, Reconciler};
pub use registry::SourceRegistry;
pub use shell::{ProgressSender, WorkloadHandle, WorkloadOutcome};
