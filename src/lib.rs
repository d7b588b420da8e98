// Library exports for trendgraph

pub mod chart;
pub mod classify;
pub mod error;
pub mod loader;
pub mod plan;
pub mod session;
pub mod summary;
pub mod table;
pub mod view;
pub mod workbook;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RenderOptions {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_width() -> u32 { 800 }
fn default_height() -> u32 { 600 }

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
        }
    }
}
