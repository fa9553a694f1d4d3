pub mod reconciler;

pub use reconciler::{PinnedVersions, ReconcileOutcome, Reconciler};
