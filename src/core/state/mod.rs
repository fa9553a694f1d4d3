pub mod lockfile;

pub use lockfile::{InstallState, LOCK_FILE_NAME};
