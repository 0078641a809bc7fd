/*!
* An explicit frame loop for immediate-mode GUIs.
*
* The [`Driver`] owns three collaborators, given to it at construction:
*  * a [`WindowDriver`], the windowing and rendering library,
*  * a [`GuiDriver`], the immediate-mode toolkit, that also implements [`Widgets`],
*  * some [`Bindings`], that route the input of the first to the second, and the draw
*    commands of the second to the first.
*
* It creates them in that order, runs frames with [`Driver::frame_start`] and
* [`Frame::end`], and destroys them in reverse order, even if something fails half-way.
*
* The toolkit is Dear ImGui, through [`ImGuiContext`].
*
* # Features
*  * `sdl3`: the native backend, an SDL3 window with an OpenGL3 renderer.
*  * `freetype`: use `libfreetype` for TTF font loading.
*
* The [`headless`] window is always available. It needs no display and is used for
* testing.
*/

mod config;
mod driver;
mod error;
pub mod headless;
mod imgui;
mod widgets;

#[cfg(feature = "sdl3")]
pub mod native;

pub use config::*;
pub use driver::*;
pub use error::*;
pub use imgui::*;
pub use widgets::*;

// Reexport the main dependencies to simplify dependencies.
pub use easy_imgui;
pub use easy_imgui_sys;
#[cfg(feature = "sdl3")]
pub use glow;
#[cfg(feature = "sdl3")]
pub use sdl3;
