use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};

use crate::error_codes::{CodedError, INVALID_CONFIG};
use crate::schema::{SceneConfigFile, WaveSceneConfig};

pub fn load_scene_config(path: &Path) -> Result<WaveSceneConfig> {
    let file = read_scene_config_file(path)?;
    WaveSceneConfig::from_file(&file)
        .with_context(|| format!("failed validating scene config {}", path.display()))
}

/// Reads a config file; `.json` is parsed as JSON, anything else as YAML.
pub fn read_scene_config_file(path: &Path) -> Result<SceneConfigFile> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene config {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    if is_json {
        return serde_json::from_str(&contents).map_err(|error| {
            anyhow!(CodedError::input(
                INVALID_CONFIG,
                format!(
                    "failed to parse json in {} at line {}, column {}: {}",
                    path.display(),
                    error.line(),
                    error.column(),
                    error
                ),
            ))
        });
    }

    serde_yaml::from_str(&contents).map_err(|error| {
        let location = error
            .location()
            .map(|location| format!("line {}, column {}", location.line(), location.column()))
            .unwrap_or_else(|| "unknown location".to_owned());
        anyhow!(CodedError::input(
            INVALID_CONFIG,
            format!(
                "failed to parse yaml in {} at {}: {}",
                path.display(),
                location,
                error
            ),
        ))
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::color::Rgba;

    #[test]
    fn loads_yaml_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.yaml");
        fs::write(
            &path,
            r##"
isDarkMode: true
waveColor: { color: "#f9f4dc", name: "乳白" }
poem: { content: "床前明月光", title: "静夜思", author: "李白" }
"##,
        )
        .unwrap();

        let config = load_scene_config(&path).unwrap();
        assert_eq!(config.wave_color, Rgba::rgb(0xf9, 0xf4, 0xdc));
        assert_eq!(config.label(), Some("乳白"));
        assert_eq!(config.poem().unwrap().author, "李白");
    }

    #[test]
    fn loads_json_config_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.json");
        fs::write(&path, r#"{ "isDarkMode": false }"#).unwrap();

        let config = load_scene_config(&path).unwrap();
        assert!(!config.is_dark_mode);
        assert_eq!(config.label(), Some("乳白"));
        assert!(config.poem().is_none());
    }

    #[test]
    fn loads_host_props_json_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("props.json");
        fs::write(
            &path,
            r##"{"isDarkMode": true, "waveColor": {"color": "#f9f4dc", "name": "乳白"}, "poem": {"content": "床前明月光", "title": "静夜思", "author": "李白"}}"##,
        )
        .unwrap();

        let config = load_scene_config(&path).unwrap();
        assert!(config.is_dark_mode);
        assert_eq!(config.wave_color, Rgba::rgb(0xf9, 0xf4, 0xdc));
        assert_eq!(config.label(), Some("乳白"));
        let poem = config.poem().unwrap();
        assert_eq!(poem.content, "床前明月光");
        assert_eq!(poem.title, "静夜思");
    }

    #[test]
    fn unknown_fields_are_rejected_with_location() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("scene.yaml");
        fs::write(&path, "isDarkMode: true\nwaveColour: {}\n").unwrap();

        let err = format!("{:#}", load_scene_config(&path).unwrap_err());
        assert!(err.contains("waveColour"), "unexpected error: {err}");
        assert!(err.contains("failed to parse yaml"), "unexpected error: {err}");
    }
}
