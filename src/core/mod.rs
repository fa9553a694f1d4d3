// ─── Server Starter Core ───
// Installs a modpack server from a setup config and supervises it.
//
// Architecture:
//   core/
//     config/      Setup config model, validation, durations
//     state/       Persisted install state (serverstarter.lock)
//     downloader/  Artifact fetcher, bounded batch downloads, zip extraction
//     pack/        Manifest, ignore patterns, overrides, component downloads
//     install/     Installation reconciler
//     loaders/     Loader installer (Forge)
//     license/     License gate
//     launch/      Launch plan, restart history, signals, supervisor

pub mod config;
pub mod downloader;
pub mod error;
pub mod http;
pub mod install;
pub mod launch;
pub mod license;
pub mod loaders;
pub mod pack;
pub mod state;
