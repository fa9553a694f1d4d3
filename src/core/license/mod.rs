pub mod gate;

pub use gate::{
    AffirmationSource, EnvAffirmation, LicenseGate, LicenseStatus, Prompt, StdinPrompt,
};
