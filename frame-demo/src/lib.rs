/*!
* A small widget demo running on [`easy_imgui_frame`].
*
* The UI is declared against the [`Widgets`] trait and run against any [`Driver`], so the
* same code drives the native SDL3 backend and the headless one used in the tests.
*/

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use easy_imgui_frame::{
    Bindings, ColorFormat, Colorf, Driver, DriverConfig, EditEvents, EditFlags, Filter, FontOpts,
    GuiDriver, Rect, RenderOpts, WindowDriver, WindowFlags, WindowOpts,
};

/// Maximum length of the text field, in bytes.
pub const TEXT_CAPACITY: usize = 256;

pub const DEMO_WINDOW: Rect = Rect::new(50.0, 50.0, 230.0, 400.0);

#[derive(Parser, Debug, Clone, PartialEq)]
#[command(version, about = "Widget demo for easy-imgui-frame")]
pub struct Args {
    /// TTF font to use instead of the built-in one
    #[arg(long, value_name = "PATH")]
    pub font: Option<PathBuf>,
    /// Font size, in pixels
    #[arg(long, value_name = "PX", default_value_t = 13.0)]
    pub font_size: f32,
    /// Request a high pixel density window
    #[arg(long = "hidpi")]
    pub hidpi: bool,
    /// Sync the frames with the vertical blank
    #[arg(long)]
    pub vsync: bool,
}

impl Args {
    pub fn config(&self) -> DriverConfig {
        DriverConfig {
            window: WindowOpts {
                title: String::from("easy-imgui-frame demo"),
                high_dpi: self.hidpi,
                ..WindowOpts::default()
            },
            render: RenderOpts { vsync: self.vsync },
            font: FontOpts {
                size: self.font_size,
                path: self.font.clone(),
            },
            ..DriverConfig::default()
        }
    }
}

/// The selection of the radio group.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Choice {
    #[default]
    A,
    B,
}

/// Everything the UI remembers between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameState {
    /// Background color, also edited by the color picker.
    pub color: Colorf,
    pub checked: bool,
    pub choice: Choice,
    pub slide: f32,
    pub text: String,
}

impl Default for FrameState {
    fn default() -> Self {
        FrameState {
            color: Colorf::new(0.25, 0.25, 0.25, 1.0),
            checked: false,
            choice: Choice::A,
            slide: 0.0,
            text: String::with_capacity(TEXT_CAPACITY),
        }
    }
}

/// Something worth telling that happened in a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    ButtonPressed,
    TextCommitted(String),
    TextDeactivated(String),
}

/// Declares the demo window.
pub fn build_ui(ui: &mut impl easy_imgui_frame::Widgets, state: &mut FrameState) -> Vec<UiEvent> {
    let mut events = Vec::new();
    let flags = WindowFlags::BORDER
        | WindowFlags::MOVABLE
        | WindowFlags::SCALABLE
        | WindowFlags::MINIMIZABLE
        | WindowFlags::TITLE;
    if ui.begin_window("Demo", DEMO_WINDOW, flags) {
        ui.layout_row_static(30.0, 81.0, 1);
        if ui.button("Button") {
            events.push(UiEvent::ButtonPressed);
        }

        ui.layout_row_dynamic(20.0, 1);
        state.checked = ui.checkbox("Check me", state.checked);

        ui.layout_row_dynamic(20.0, 2);
        state.choice = ui.radio("Option A", Choice::A, state.choice);
        state.choice = ui.radio("Option B", Choice::B, state.choice);

        ui.layout_row_dynamic(20.0, 1);
        state.slide = ui.slider(0.0, state.slide, 1.0, 0.1);

        ui.layout_row_dynamic(60.0, 1);
        state.color = ui.color_picker(state.color, ColorFormat::Rgba);

        ui.layout_row_dynamic(30.0, 1);
        let ev = ui.edit_string(
            EditFlags::SIMPLE | EditFlags::SIG_ENTER,
            &mut state.text,
            TEXT_CAPACITY,
            Filter::Default,
        );
        if ev.contains(EditEvents::COMMITED) {
            events.push(UiEvent::TextCommitted(state.text.clone()));
        } else if ev.contains(EditEvents::DEACTIVATED) {
            events.push(UiEvent::TextDeactivated(state.text.clone()));
        }
    }
    ui.end_window();
    events
}

/// Runs one iteration of the loop. Returns `false` if the user asked to quit.
pub fn run_frame<W, G, B>(driver: &mut Driver<W, G, B>, state: &mut FrameState) -> Result<bool>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    driver.set_bg_color(state.color);
    let Some(mut frame) = driver.frame_start().context("in frame_start")? else {
        return Ok(false);
    };
    let events = build_ui(&mut *frame, state);
    frame.end().context("in frame_end")?;

    for ev in events {
        match ev {
            UiEvent::ButtonPressed => log::info!("button pressed"),
            UiEvent::TextCommitted(text) => log::info!("text edit committed: {text:?}"),
            UiEvent::TextDeactivated(text) => log::info!("text edit deactivated: {text:?}"),
        }
    }
    Ok(true)
}

/// Runs frames until the user quits.
pub fn run<W, G, B>(driver: &mut Driver<W, G, B>, state: &mut FrameState) -> Result<()>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    driver
        .set_render_scale(0.0)
        .context("setting the render scale")?;
    let mut frames = 0u64;
    while run_frame(driver, state)? {
        frames += 1;
    }
    log::debug!("quit after {frames} frames");
    Ok(())
}
