//! Host-side file and wallpaper services.
//!
//! The renderer only talks to [`HostServices`]; [`DesktopHost`] is the
//! implementation used by the CLI.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;

use anyhow::{anyhow, bail, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use regex::Regex;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::error_codes::{CodedError, COMMAND_FAILED, PERMISSION_DENIED, UNSUPPORTED_PLATFORM};

pub trait HostServices {
    /// Writes image bytes to a fresh file and returns its path.
    fn save_image_bytes(&self, bytes: &[u8], extension: &str) -> Result<PathBuf>;

    /// Decodes a `data:image/<ext>;base64,` URL and saves it.
    /// Returns `Ok(None)` when the URL is malformed.
    fn save_data_url(&self, url: &str) -> Result<Option<PathBuf>> {
        match decode_image_data_url(url) {
            Some(image) => self.save_image_bytes(&image.bytes, &image.extension).map(Some),
            None => {
                warn!("ignoring malformed image data url");
                Ok(None)
            }
        }
    }

    /// Deletes a file; a file that is already gone counts as deleted.
    fn delete_file(&self, path: &Path) -> Result<bool>;

    fn set_wallpaper(&self, image_path: &Path) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrlImage {
    pub extension: String,
    pub bytes: Vec<u8>,
}

pub fn decode_image_data_url(url: &str) -> Option<DataUrlImage> {
    static DATA_URL_RE: OnceLock<Regex> = OnceLock::new();
    let re = DATA_URL_RE.get_or_init(|| {
        Regex::new(r"(?i)^data:image/([a-z]{1,20});base64,")
            .expect("data url regex should compile")
    });

    let capture = re.captures(url)?;
    let header = capture.get(0)?;
    let extension = capture.get(1)?.as_str().to_ascii_lowercase();
    let bytes = STANDARD.decode(url[header.end()..].trim()).ok()?;
    Some(DataUrlImage { extension, bytes })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Windows,
    Linux,
}

impl Platform {
    pub fn current() -> Result<Self> {
        Self::from_os(std::env::consts::OS)
    }

    pub fn from_os(os: &str) -> Result<Self> {
        match os {
            "macos" => Ok(Self::MacOs),
            "windows" => Ok(Self::Windows),
            "linux" => Ok(Self::Linux),
            other => Err(anyhow!(CodedError::environment(
                UNSUPPORTED_PLATFORM,
                format!("setting the wallpaper is not supported on '{other}'"),
            )
            .with_details(json!({
                "os": other,
                "supported": ["macos", "windows", "linux"],
            })))),
        }
    }
}

/// Builds the OS command that sets `image_path` as the desktop picture.
pub fn wallpaper_command(platform: Platform, image_path: &Path) -> Result<Command> {
    let path = image_path.to_string_lossy();
    // The path is spliced into script source below.
    if path.chars().any(|c| c.is_control() || c == '\'' || c == '"') {
        bail!(
            "wallpaper path '{}' contains quotes or control characters",
            image_path.display()
        );
    }

    let command = match platform {
        Platform::MacOs => {
            let mut command = Command::new("osascript");
            command.arg("-e").arg(format!(
                "tell application \"System Events\" to tell every desktop to set picture to \"{path}\""
            ));
            command
        }
        Platform::Windows => {
            let script = format!(
                "$signature = '[DllImport(\"user32.dll\", CharSet = CharSet.Unicode)] public static extern int SystemParametersInfo(int uAction, int uParam, string lpvParam, int fuWinIni);'; \
                 $native = Add-Type -MemberDefinition $signature -Name WavesWallpaper -Namespace Waves -PassThru; \
                 if ($native::SystemParametersInfo(20, 0, '{path}', 3) -eq 0) {{ exit 1 }}"
            );
            let mut command = Command::new("powershell");
            command.args([
                "-ExecutionPolicy",
                "Bypass",
                "-NoProfile",
                "-Command",
                &script,
            ]);
            command
        }
        Platform::Linux => {
            let script = format!(
                "if command -v gsettings >/dev/null 2>&1; then \
                   gsettings set org.gnome.desktop.background picture-uri-dark 'file://{path}' && \
                   gsettings set org.gnome.desktop.background picture-uri 'file://{path}'; \
                 elif command -v plasma-apply-wallpaperimage >/dev/null 2>&1; then \
                   plasma-apply-wallpaperimage '{path}'; \
                 else \
                   echo 'neither gsettings nor plasma-apply-wallpaperimage is available' >&2; exit 127; \
                 fi"
            );
            let mut command = Command::new("sh");
            command.arg("-c").arg(script);
            command
        }
    };
    Ok(command)
}

/// Desktop implementation: files go to `output_dir` (the downloads folder by
/// default), wallpaper changes shell out to the platform tool.
#[derive(Debug, Clone)]
pub struct DesktopHost {
    output_dir: PathBuf,
}

impl DesktopHost {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn with_default_dir() -> Self {
        let output_dir = dirs::download_dir().unwrap_or_else(std::env::temp_dir);
        Self::new(output_dir)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn fresh_path(&self, extension: &str) -> PathBuf {
        let stamp = chrono::Utc::now().timestamp_millis();
        let mut candidate = self.output_dir.join(format!("{stamp}.{extension}"));
        let mut suffix = 1;
        while candidate.exists() {
            candidate = self
                .output_dir
                .join(format!("{stamp}-{suffix}.{extension}"));
            suffix += 1;
        }
        candidate
    }
}

impl HostServices for DesktopHost {
    fn save_image_bytes(&self, bytes: &[u8], extension: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "failed to create output directory {}",
                self.output_dir.display()
            )
        })?;
        let path = self.fresh_path(extension);
        fs::write(&path, bytes)
            .with_context(|| format!("failed to write image {}", path.display()))?;
        info!(path = %path.display(), bytes = bytes.len(), "saved image");
        Ok(path)
    }

    fn delete_file(&self, path: &Path) -> Result<bool> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                debug!(path = %path.display(), "nothing to delete");
                return Ok(true);
            }
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("failed to inspect {}", path.display()));
            }
        };

        if metadata.permissions().readonly() {
            return Err(anyhow!(CodedError::environment(
                PERMISSION_DENIED,
                format!("no permission to delete {}", path.display()),
            )));
        }

        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == ErrorKind::PermissionDenied => {
                Err(anyhow!(CodedError::environment(
                    PERMISSION_DENIED,
                    format!("no permission to delete {}: {error}", path.display()),
                )))
            }
            Err(error) => {
                Err(error).with_context(|| format!("failed to delete {}", path.display()))
            }
        }
    }

    fn set_wallpaper(&self, image_path: &Path) -> Result<()> {
        let platform = Platform::current()?;
        let mut command = wallpaper_command(platform, image_path)?;
        debug!(?platform, ?command, "setting wallpaper");

        let output = command.output().map_err(|error| {
            anyhow!(CodedError::environment(
                COMMAND_FAILED,
                format!(
                    "failed to launch {:?} for {:?}: {error}",
                    command.get_program(),
                    platform
                ),
            ))
        })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() {
            return Err(anyhow!(CodedError::environment(
                COMMAND_FAILED,
                format!(
                    "setting the wallpaper failed with status {} (stderr: '{}')",
                    output.status,
                    stderr.trim()
                ),
            )
            .with_details(json!({
                "platform": format!("{platform:?}"),
                "exit_code": output.status.code(),
                "stderr": stderr.trim(),
            }))));
        }
        if !stderr.trim().is_empty() {
            warn!(stderr = %stderr.trim(), "wallpaper command wrote to stderr");
        }
        info!(path = %image_path.display(), "wallpaper set");
        Ok(())
    }
}
