pub mod canvas;
pub mod color;
pub mod config;
pub mod debounce;
pub mod error_codes;
pub mod font_assets;
pub mod host;
pub mod noise_field;
pub mod raster;
pub mod scene;
pub mod schema;
pub mod terrain;
pub mod typography;
