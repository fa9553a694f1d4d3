pub mod duration;
pub mod model;

pub use duration::parse_duration;
pub use model::{
    AdditionalFile, FormatSpecific, InstallConfig, LaunchConfig, LicensePolicy, ModpackConfig,
    StarterConfig, CURRENT_SPEC,
};
