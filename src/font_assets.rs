use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::typography::Typeface;

pub const FONT_ENV_VAR: &str = "WAVES_FONT";

/// Fonts with CJK coverage that commonly ship with desktop systems.
pub const SYSTEM_FONT_CANDIDATES: [&str; 8] = [
    "/System/Library/Fonts/PingFang.ttc",
    "/System/Library/Fonts/STHeiti Medium.ttc",
    "/Library/Fonts/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\simkai.ttf",
    "C:\\Windows\\Fonts\\msyh.ttc",
    "/usr/share/fonts/opentype/noto/NotoSerifCJK-Regular.ttc",
    "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
    "/usr/share/fonts/truetype/wqy/wqy-microhei.ttc",
];

/// Where the font came from, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontSource {
    Explicit(PathBuf),
    Environment(PathBuf),
    System(PathBuf),
}

impl FontSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Explicit(path) | Self::Environment(path) | Self::System(path) => path,
        }
    }
}

/// Picks a font: explicit path, then `$WAVES_FONT`, then the first existing
/// system candidate. An explicit or env path must exist.
pub fn resolve_font_source(
    explicit: Option<&Path>,
    env_value: Option<String>,
    candidates: &[&str],
) -> Result<Option<FontSource>> {
    if let Some(path) = explicit {
        if !path.is_file() {
            bail!("font file '{}' does not exist", path.display());
        }
        return Ok(Some(FontSource::Explicit(path.to_path_buf())));
    }

    if let Some(raw) = env_value.filter(|value| !value.trim().is_empty()) {
        let path = PathBuf::from(raw.trim());
        if !path.is_file() {
            bail!(
                "{FONT_ENV_VAR} points at '{}', which does not exist",
                path.display()
            );
        }
        return Ok(Some(FontSource::Environment(path)));
    }

    Ok(candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
        .map(FontSource::System))
}

/// Loads the typeface used for labels and poems. `Ok(None)` means no font was
/// found; text elements are then skipped.
pub fn load_typeface(explicit: Option<&Path>) -> Result<Option<Arc<Typeface>>> {
    let source = resolve_font_source(
        explicit,
        std::env::var(FONT_ENV_VAR).ok(),
        &SYSTEM_FONT_CANDIDATES,
    )?;
    let Some(source) = source else {
        warn!("no usable font found; label and poem text will be skipped (set {FONT_ENV_VAR} or pass --font)");
        return Ok(None);
    };

    debug!(?source, "resolved font");
    let typeface = Typeface::from_path(source.path())?;
    info!(font = typeface.name(), "loaded typeface");
    Ok(Some(Arc::new(typeface)))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn explicit_path_wins_over_env_and_system() {
        let dir = tempdir().unwrap();
        let explicit = dir.path().join("explicit.ttf");
        let from_env = dir.path().join("env.ttf");
        fs::write(&explicit, b"x").unwrap();
        fs::write(&from_env, b"x").unwrap();

        let source = resolve_font_source(
            Some(&explicit),
            Some(from_env.display().to_string()),
            &[],
        )
        .unwrap();
        assert_eq!(source, Some(FontSource::Explicit(explicit)));
    }

    #[test]
    fn env_path_is_used_before_system_candidates() {
        let dir = tempdir().unwrap();
        let from_env = dir.path().join("env.ttf");
        let system = dir.path().join("system.ttf");
        fs::write(&from_env, b"x").unwrap();
        fs::write(&system, b"x").unwrap();
        let system_str = system.display().to_string();

        let source =
            resolve_font_source(None, Some(from_env.display().to_string()), &[&system_str])
                .unwrap();
        assert_eq!(source, Some(FontSource::Environment(from_env)));
    }

    #[test]
    fn first_existing_system_candidate_is_picked() {
        let dir = tempdir().unwrap();
        let present = dir.path().join("present.ttc");
        fs::write(&present, b"x").unwrap();
        let missing = dir.path().join("missing.ttc").display().to_string();
        let present_str = present.display().to_string();

        let source = resolve_font_source(None, None, &[&missing, &present_str]).unwrap();
        assert_eq!(source, Some(FontSource::System(present)));
        assert_eq!(resolve_font_source(None, Some("  ".into()), &[&missing]).unwrap(), None);
    }

    #[test]
    fn missing_explicit_font_is_an_error() {
        let err = resolve_font_source(Some(Path::new("/nope/font.ttf")), None, &[])
            .unwrap_err()
            .to_string();
        assert!(err.contains("/nope/font.ttf"));
    }
}
