pub mod client;
pub mod extract;

pub use client::{download_batch, ArtifactFetcher, DownloadEntry, Downloader};
pub use extract::extract_zip;
