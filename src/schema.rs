use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::error_codes::{CodedError, INVALID_CONFIG};

pub const DARK_BACKGROUND: Rgba = Rgba::rgb(0x32, 0x32, 0x32);
pub const LIGHT_BACKGROUND: Rgba = Rgba::rgb(0xe6, 0xe6, 0xe6);
pub const DEFAULT_WAVE_COLOR: &str = "#f9f4dc";
pub const DEFAULT_WAVE_NAME: &str = "乳白";

/// Config snapshot as the host feeds it (YAML or JSON), keyed the way the host
/// props are: `isDarkMode`, `waveColor`, `poem`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SceneConfigFile {
    #[serde(default = "default_dark_mode")]
    pub is_dark_mode: bool,
    #[serde(default)]
    pub wave_color: WaveColor,
    #[serde(default)]
    pub poem: Option<Poem>,
}

impl Default for SceneConfigFile {
    fn default() -> Self {
        Self {
            is_dark_mode: default_dark_mode(),
            wave_color: WaveColor::default(),
            poem: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct WaveColor {
    pub color: String,
    #[serde(default)]
    pub name: String,
}

impl Default for WaveColor {
    fn default() -> Self {
        Self {
            color: DEFAULT_WAVE_COLOR.to_owned(),
            name: DEFAULT_WAVE_NAME.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Poem {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
}

impl Poem {
    pub fn has_content(&self) -> bool {
        !self.content.is_empty()
    }
}

fn default_dark_mode() -> bool {
    true
}

/// Validated scene state owned by the composer.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveSceneConfig {
    pub background_color: Rgba,
    pub is_dark_mode: bool,
    pub wave_color: Rgba,
    pub wave_color_name: String,
    pub poem: Option<Poem>,
}

impl WaveSceneConfig {
    pub fn from_file(file: &SceneConfigFile) -> Result<Self> {
        let wave_color = Rgba::parse_hex(&file.wave_color.color)
            .map_err(|error| {
                anyhow!(CodedError::input(
                    INVALID_CONFIG,
                    format!("waveColor.color: {error}"),
                ))
            })
            .context("invalid scene config")?;

        Ok(Self {
            background_color: background_for(file.is_dark_mode),
            is_dark_mode: file.is_dark_mode,
            // The wave fill is always opaque; layer alpha comes from the terrain schedule.
            wave_color: wave_color.with_alpha(255),
            wave_color_name: file.wave_color.name.clone(),
            poem: file.poem.clone().filter(Poem::has_content),
        })
    }

    /// Label text, if there is any to draw.
    pub fn label(&self) -> Option<&str> {
        Some(self.wave_color_name.as_str()).filter(|name| !name.is_empty())
    }

    pub fn poem(&self) -> Option<&Poem> {
        self.poem.as_ref().filter(|poem| poem.has_content())
    }
}

impl Default for WaveSceneConfig {
    fn default() -> Self {
        Self {
            background_color: DARK_BACKGROUND,
            is_dark_mode: true,
            wave_color: Rgba::rgb(0xf9, 0xf4, 0xdc),
            wave_color_name: DEFAULT_WAVE_NAME.to_owned(),
            poem: None,
        }
    }
}

pub fn background_for(is_dark_mode: bool) -> Rgba {
    if is_dark_mode {
        DARK_BACKGROUND
    } else {
        LIGHT_BACKGROUND
    }
}
