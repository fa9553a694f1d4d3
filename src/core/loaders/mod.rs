pub mod context;
pub mod forge;
pub mod installer;

pub use context::InstallContext;
pub use forge::ForgeInstaller;
pub use installer::{LoaderInstallResult, LoaderInstaller};
