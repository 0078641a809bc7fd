//! Startup options of a [`Driver`](crate::Driver).
//!
//! These are plain values, built once before [`Driver::init`](crate::Driver::init) and
//! never modified afterwards.

use std::path::PathBuf;

/// Position of the window on one axis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum WindowPos {
    #[default]
    Centered,
    At(i32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowOpts {
    pub title: String,
    pub pos_x: WindowPos,
    pub pos_y: WindowPos,
    pub width: u32,
    pub height: u32,
    /// Requests a framebuffer with the native pixel density of the display.
    pub high_dpi: bool,
}

impl Default for WindowOpts {
    fn default() -> Self {
        WindowOpts {
            title: String::from("easy-imgui-frame"),
            pos_x: WindowPos::Centered,
            pos_y: WindowPos::Centered,
            width: 800,
            height: 600,
            high_dpi: false,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct RenderOpts {
    /// Sync the buffer swap with the vertical blank.
    pub vsync: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FontOpts {
    /// Font size, in pixels.
    pub size: f32,
    /// TTF file to load. If `None` the built-in font of the toolkit is used.
    pub path: Option<PathBuf>,
}

impl Default for FontOpts {
    fn default() -> Self {
        FontOpts {
            size: 13.0,
            path: None,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum AntiAliasing {
    Off,
    #[default]
    On,
}

impl AntiAliasing {
    pub fn is_on(self) -> bool {
        self == AntiAliasing::On
    }
}

/// How the GUI output is drawn.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConvertOpts {
    /// Multiplies the alpha of everything drawn, from 0 to 1.
    pub global_alpha: f32,
    pub line_aa: AntiAliasing,
    pub shape_aa: AntiAliasing,
}

impl Default for ConvertOpts {
    fn default() -> Self {
        ConvertOpts {
            global_alpha: 1.0,
            line_aa: AntiAliasing::On,
            shape_aa: AntiAliasing::On,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DriverConfig {
    pub window: WindowOpts,
    pub render: RenderOpts,
    pub font: FontOpts,
    pub convert: ConvertOpts,
}
