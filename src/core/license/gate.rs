// ─── License Gate ───
// `eula.txt` must be affirmed before the server may run. The file has two
// comment lines followed by `eula=<true|false>`.

use std::io::BufRead;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::core::error::{StarterError, StarterResult};

pub const LICENSE_FILE_NAME: &str = "eula.txt";
pub const LICENSE_KEY: &str = "eula";
pub const LICENSE_URL: &str = "https://aka.ms/MinecraftEULA";

/// Environment variable that affirms the license without prompting.
pub const AFFIRMATION_ENV: &str = "EULA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseStatus {
    Affirmed,
    NotAffirmed,
}

/// Out-of-band affirmation checked before prompting.
pub trait AffirmationSource {
    fn is_affirmed(&self) -> bool;
}

/// Reads [`AFFIRMATION_ENV`].
pub struct EnvAffirmation;

impl AffirmationSource for EnvAffirmation {
    fn is_affirmed(&self) -> bool {
        std::env::var(AFFIRMATION_ENV)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    }
}

/// Interactive question, answered with one line.
pub trait Prompt {
    fn ask(&mut self) -> Option<String>;
}

/// Reads one line from stdin.
pub struct StdinPrompt;

impl Prompt for StdinPrompt {
    fn ask(&mut self) -> Option<String> {
        let mut line = String::new();
        match std::io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line),
        }
    }
}

pub struct LicenseGate {
    path: PathBuf,
}

impl LicenseGate {
    pub fn new(base_path: &Path) -> Self {
        Self {
            path: base_path.join(LICENSE_FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Make sure the marker file exists, then try to get it affirmed.
    ///
    /// Only reports the status; refusing to launch is up to the caller.
    pub fn check(
        &self,
        source: &dyn AffirmationSource,
        prompt: &mut dyn Prompt,
    ) -> StarterResult<LicenseStatus> {
        let mut lines = self.read_or_create()?;

        if is_affirmed(&lines) {
            return Ok(LicenseStatus::Affirmed);
        }

        if source.is_affirmed() {
            info!("License accepted through the {} environment variable", AFFIRMATION_ENV);
            self.affirm(&mut lines)?;
            return Ok(LicenseStatus::Affirmed);
        }

        info!("You have not accepted the eula yet.");
        info!("By typing TRUE you are indicating your agreement to the EULA of Mojang.");
        info!("Read it at {} before accepting it.", LICENSE_URL);

        let accepted = prompt
            .ask()
            .map(|answer| answer.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        if accepted {
            info!("You have accepted the EULA.");
            self.affirm(&mut lines)?;
            Ok(LicenseStatus::Affirmed)
        } else {
            Ok(LicenseStatus::NotAffirmed)
        }
    }

    fn read_or_create(&self) -> StarterResult<Vec<String>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(StarterError::io(&self.path, e)),
        };
        let lines: Vec<String> = raw.lines().map(str::to_string).collect();

        if lines.get(2).is_some_and(|line| key_value(line).is_some()) {
            return Ok(lines);
        }

        // Keep a value written in a shorter or reordered file.
        let accepted = lines
            .iter()
            .find_map(|line| key_value(line))
            .unwrap_or(false);
        let lines = default_lines(accepted);
        self.write(&lines)?;
        Ok(lines)
    }

    fn affirm(&self, lines: &mut [String]) -> StarterResult<()> {
        lines[2] = format!("{LICENSE_KEY}=true");
        self.write(lines)
    }

    fn write(&self, lines: &[String]) -> StarterResult<()> {
        let mut body = lines.join("\n");
        body.push('\n');
        std::fs::write(&self.path, body).map_err(|e| StarterError::io(&self.path, e))
    }
}

fn default_lines(accepted: bool) -> Vec<String> {
    vec![
        format!(
            "#By changing the setting below to TRUE you are indicating your agreement to our EULA ({LICENSE_URL})."
        ),
        format!("#{}", Local::now().format("%a %b %d %H:%M:%S %Z %Y")),
        format!("{LICENSE_KEY}={accepted}"),
    ]
}

/// `Some(accepted)` when `line` is the `eula=<value>` entry.
fn key_value(line: &str) -> Option<bool> {
    let (key, value) = line.split_once('=')?;
    (key.trim() == LICENSE_KEY).then(|| value.trim().eq_ignore_ascii_case("true"))
}

fn is_affirmed(lines: &[String]) -> bool {
    lines
        .get(2)
        .and_then(|line| key_value(line))
        .unwrap_or(false)
}
