use std::ops::{Deref, DerefMut};

use crate::{
    Colorf, ConvertOpts, DriverConfig, Error, FontOpts, RenderOpts, Result, WindowOpts, Widgets,
};

/// The windowing and rendering library.
///
/// A window is created first, then the renderer attached to it. Both are released in
/// reverse order.
pub trait WindowDriver {
    /// A native input event.
    type Event;

    fn create_window(&mut self, opts: &WindowOpts) -> Result<()>;
    fn create_renderer(&mut self, opts: &RenderOpts) -> Result<()>;
    /// Gets the next pending event without blocking.
    fn poll_event(&mut self) -> Result<Option<Self::Event>>;
    /// Ratio between framebuffer pixels and window coordinates.
    fn display_scale(&self) -> f32;
    /// Clears the framebuffer.
    fn clear(&mut self, color: Colorf) -> Result<()>;
    /// Shows the rendered frame.
    fn present(&mut self) -> Result<()>;
    fn destroy_renderer(&mut self) -> Result<()>;
    fn destroy_window(&mut self) -> Result<()>;
}

/// The immediate-mode GUI toolkit.
pub trait GuiDriver: Widgets {
    /// Input, already translated from native events.
    type Input;
    /// The output of a frame, to be converted into draw calls.
    type Commands;

    fn create_context(&mut self, font: &FontOpts) -> Result<()>;
    fn set_scale(&mut self, scale: f32) -> Result<()>;
    fn handle_input(&mut self, input: Self::Input);
    fn begin_frame(&mut self) -> Result<()>;
    fn end_frame(&mut self, convert: &ConvertOpts) -> Result<Self::Commands>;
    fn destroy_context(&mut self) -> Result<()>;
}

/// Result of dispatching one native event.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Continue,
    Quit,
}

/// Glue between a [`WindowDriver`] and a [`GuiDriver`].
pub trait Bindings<W: WindowDriver, G: GuiDriver> {
    /// Called once the window, renderer and GUI context exist.
    fn attach(&mut self, _window: &mut W, _gui: &mut G) -> Result<()> {
        Ok(())
    }
    /// Called before the GUI context is destroyed.
    fn detach(&mut self, _window: &mut W, _gui: &mut G) -> Result<()> {
        Ok(())
    }
    /// Feeds `event` to `gui`, and tells whether it asks to quit.
    fn dispatch(&mut self, event: W::Event, gui: &mut G) -> Dispatch;
    /// Called just before [`GuiDriver::begin_frame`].
    fn new_frame(&mut self, _window: &mut W, _gui: &mut G) -> Result<()> {
        Ok(())
    }
    /// Converts `commands` into draw calls of `window`.
    fn draw(&mut self, window: &mut W, commands: G::Commands) -> Result<()>;
}

/// Native resources currently alive.
#[derive(Debug, Default)]
struct Live {
    window: bool,
    renderer: bool,
    context: bool,
    bindings: bool,
}

/// Owns the window, the renderer and the GUI context, and runs frames on them.
///
/// ```ignore
/// let mut driver = Driver::init(window, gui, bindings, config)?;
/// while let Some(mut frame) = driver.frame_start()? {
///     if frame.begin_window("Demo", Rect::new(50.0, 50.0, 230.0, 400.0), flags) {
///         frame.layout_row_dynamic(30.0, 1);
///         frame.button("Button");
///     }
///     frame.end_window();
///     frame.end()?;
/// }
/// driver.destroy()?;
/// ```
pub struct Driver<W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    window: W,
    gui: G,
    bindings: B,
    config: DriverConfig,
    bg_color: Colorf,
    live: Live,
}

impl<W, G, B> Driver<W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    /// Creates the window, the renderer and the GUI context, in that order, and then
    /// attaches the bindings.
    ///
    /// If any of them fails, the ones already created are released before returning.
    pub fn init(window: W, gui: G, bindings: B, config: DriverConfig) -> Result<Self> {
        let mut driver = Driver {
            window,
            gui,
            bindings,
            config,
            bg_color: Colorf::BLACK,
            live: Live::default(),
        };
        // From here on, an early return drops `driver`, releasing whatever is live.
        driver.window.create_window(&driver.config.window)?;
        driver.live.window = true;
        log::debug!("created window {:?}", driver.config.window.title);

        driver.window.create_renderer(&driver.config.render)?;
        driver.live.renderer = true;
        log::debug!("created renderer, vsync={}", driver.config.render.vsync);

        driver.gui.create_context(&driver.config.font)?;
        driver.live.context = true;
        log::debug!("created GUI context, font size {}", driver.config.font.size);

        driver.bindings.attach(&mut driver.window, &mut driver.gui)?;
        driver.live.bindings = true;

        Ok(driver)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }
    pub fn window(&self) -> &W {
        &self.window
    }
    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }
    /// The GUI context.
    pub fn context(&mut self) -> &mut G {
        &mut self.gui
    }
    pub fn bg_color(&self) -> Colorf {
        self.bg_color
    }
    /// Sets the color used to clear the window at the end of the next frames.
    pub fn set_bg_color(&mut self, color: Colorf) {
        self.bg_color = color;
    }
    /// Scales the GUI. A `scale` of zero or less uses the display scale of the window.
    pub fn set_render_scale(&mut self, scale: f32) -> Result<()> {
        let scale = if scale > 0.0 {
            scale
        } else {
            self.window.display_scale()
        };
        log::debug!("render scale {scale}");
        self.gui.set_scale(scale)
    }

    /// Polls all the pending input and starts a new frame.
    ///
    /// Returns `Ok(None)` if the user asked to quit. In that case no frame is started.
    pub fn frame_start(&mut self) -> Result<Option<Frame<'_, W, G, B>>> {
        let mut quit = false;
        while let Some(event) = self.window.poll_event()? {
            if self.bindings.dispatch(event, &mut self.gui) == Dispatch::Quit {
                quit = true;
            }
        }
        if quit {
            log::debug!("quit requested");
            return Ok(None);
        }
        self.bindings.new_frame(&mut self.window, &mut self.gui)?;
        self.gui.begin_frame()?;
        Ok(Some(Frame {
            driver: self,
            ended: false,
        }))
    }

    fn frame_end(&mut self) -> Result<()> {
        let commands = self.gui.end_frame(&self.config.convert)?;
        self.window.clear(self.bg_color)?;
        self.bindings.draw(&mut self.window, commands)?;
        self.window.present()
    }

    /// Releases everything, in reverse creation order.
    ///
    /// Returns the first error found; subsequent ones are only logged.
    pub fn destroy(mut self) -> Result<()> {
        self.teardown()
    }

    fn teardown(&mut self) -> Result<()> {
        let mut first: Option<Error> = None;
        let mut note = |r: Result<()>| {
            if let Err(e) = r {
                if first.is_none() {
                    first = Some(e);
                } else {
                    log::warn!("{e}");
                }
            }
        };
        if std::mem::take(&mut self.live.bindings) {
            note(self.bindings.detach(&mut self.window, &mut self.gui));
        }
        if std::mem::take(&mut self.live.context) {
            note(self.gui.destroy_context());
            log::debug!("destroyed GUI context");
        }
        if std::mem::take(&mut self.live.renderer) {
            note(self.window.destroy_renderer());
            log::debug!("destroyed renderer");
        }
        if std::mem::take(&mut self.live.window) {
            note(self.window.destroy_window());
            log::debug!("destroyed window");
        }
        match first {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<W, G, B> Drop for Driver<W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    fn drop(&mut self) {
        if let Err(e) = self.teardown() {
            log::warn!("error destroying driver: {e}");
        }
    }
}

/// A frame in progress.
///
/// It dereferences to the GUI context, so widgets are declared directly on it.
#[must_use = "a frame is only rendered by calling `Frame::end`"]
pub struct Frame<'d, W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    driver: &'d mut Driver<W, G, B>,
    ended: bool,
}

impl<W, G, B> Frame<'_, W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    /// Closes the frame: converts the commands, clears the background, draws and presents.
    pub fn end(mut self) -> Result<()> {
        self.ended = true;
        self.driver.frame_end()
    }
}

impl<W, G, B> Deref for Frame<'_, W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    type Target = G;
    fn deref(&self) -> &G {
        &self.driver.gui
    }
}

impl<W, G, B> DerefMut for Frame<'_, W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    fn deref_mut(&mut self) -> &mut G {
        &mut self.driver.gui
    }
}

impl<W, G, B> Drop for Frame<'_, W, G, B>
where
    W: WindowDriver,
    G: GuiDriver,
    B: Bindings<W, G>,
{
    fn drop(&mut self) {
        if self.ended {
            return;
        }
        // The toolkit needs its frame closed, but nothing is drawn.
        log::debug!("frame dropped without end, discarding its commands");
        if let Err(e) = self.driver.gui.end_frame(&self.driver.config.convert) {
            log::warn!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{self, HeadlessDriver, HeadlessEvent, Ledger};
    use crate::{Rect, Resource, Stage, WindowFlags};
    use easy_imgui_sys as sys;

    fn driver(ledger: &Ledger) -> Result<HeadlessDriver> {
        headless::driver(ledger, DriverConfig::default())
    }

    fn no_current_context() -> bool {
        unsafe { sys::ImGui_GetCurrentContext().is_null() }
    }

    #[test]
    fn init_then_destroy_leaks_nothing() {
        let ledger = Ledger::new();
        let d = driver(&ledger).unwrap();
        assert_eq!(
            ledger.live(),
            vec![Resource::Window, Resource::Renderer, Resource::Bindings]
        );
        assert!(!no_current_context());
        d.destroy().unwrap();
        assert!(ledger.live().is_empty());
        assert!(no_current_context());
        assert_eq!(
            ledger.history(),
            vec![
                "create window",
                "create renderer",
                "create backend bindings",
                "destroy backend bindings",
                "destroy renderer",
                "destroy window",
            ]
        );
    }

    #[test]
    fn failed_init_releases_in_reverse_order() {
        for failing in [Resource::Window, Resource::Renderer, Resource::Bindings] {
            let ledger = Ledger::new();
            ledger.fail_create(failing);
            let err = driver(&ledger).err().unwrap();
            assert!(matches!(err, Error::Init { resource, .. } if resource == failing));
            assert!(ledger.live().is_empty(), "{failing} leaked {:?}", ledger.live());
            assert!(no_current_context(), "{failing} leaked the GUI context");
        }

        let ledger = Ledger::new();
        ledger.fail_create(Resource::Bindings);
        let _ = driver(&ledger);
        assert_eq!(
            ledger.history(),
            vec![
                "create window",
                "create renderer",
                "destroy renderer",
                "destroy window"
            ]
        );

        // A font that cannot be loaded fails the GUI context.
        let ledger = Ledger::new();
        let mut config = DriverConfig::default();
        config.font.path = Some("/nonexistent/font.ttf".into());
        let err = headless::driver(&ledger, config).err().unwrap();
        assert!(matches!(
            err,
            Error::Init {
                resource: Resource::Context,
                ..
            }
        ));
        assert!(ledger.live().is_empty());
        assert!(no_current_context());
        assert_eq!(
            ledger.history(),
            vec![
                "create window",
                "create renderer",
                "destroy renderer",
                "destroy window"
            ]
        );
    }

    #[test]
    fn destroy_reports_first_failure_and_releases_the_rest() {
        let ledger = Ledger::new();
        let d = driver(&ledger).unwrap();
        ledger.fail_destroy(Resource::Bindings);
        ledger.fail_destroy(Resource::Window);
        let err = d.destroy().unwrap_err();
        assert!(matches!(
            err,
            Error::Destroy {
                resource: Resource::Bindings,
                ..
            }
        ));
        assert!(ledger.live().is_empty());
        assert!(no_current_context());
    }

    #[test]
    fn dropping_the_driver_tears_down() {
        let ledger = Ledger::new();
        drop(driver(&ledger).unwrap());
        assert!(ledger.live().is_empty());
        assert!(no_current_context());
    }

    #[test]
    fn close_event_quits_without_starting_a_frame() {
        let ledger = Ledger::new();
        let mut d = driver(&ledger).unwrap();
        let script = d.window().script();

        let frame = d.frame_start().unwrap().unwrap();
        frame.end().unwrap();
        script.push(HeadlessEvent::CloseWindow);
        assert!(d.frame_start().unwrap().is_none());
        assert_eq!(d.window().presented().len(), 1);
        assert_eq!(d.context().frame_count(), 1);
        assert!(!d.context().in_frame());
        d.destroy().unwrap();
    }

    #[test]
    fn frame_end_clears_with_bg_color_and_presents() {
        let ledger = Ledger::new();
        let mut d = driver(&ledger).unwrap();
        let bg = Colorf::new(0.25, 0.5, 0.75, 1.0);
        d.set_bg_color(bg);
        let mut frame = d.frame_start().unwrap().unwrap();
        if frame.begin_window("W", Rect::new(0.0, 0.0, 100.0, 100.0), WindowFlags::TITLE) {
            frame.layout_row_dynamic(20.0, 1);
            frame.button("B");
        }
        frame.end_window();
        frame.end().unwrap();

        let presented = d.window().presented();
        assert_eq!(presented.len(), 1);
        assert_eq!(presented[0].clear, bg.to_rgba8());
        assert!(presented[0].draw.lists > 0);
        assert!(presented[0].draw.vertices > 0);
        assert!(presented[0].draw.indices >= presented[0].draw.vertices);
    }

    #[test]
    fn dropped_frame_is_closed_but_not_presented() {
        let ledger = Ledger::new();
        let mut d = driver(&ledger).unwrap();
        {
            let _frame = d.frame_start().unwrap().unwrap();
        }
        assert!(!d.context().in_frame());
        assert_eq!(d.context().frame_count(), 1);
        assert!(d.window().presented().is_empty());
        let frame = d.frame_start().unwrap().unwrap();
        frame.end().unwrap();
        assert_eq!(d.window().presented().len(), 1);
    }

    #[test]
    fn frame_stage_failure_propagates() {
        let ledger = Ledger::new();
        let mut d = driver(&ledger).unwrap();
        d.window_mut().fail_present();
        let frame = d.frame_start().unwrap().unwrap();
        let err = frame.end().unwrap_err();
        assert!(matches!(
            err,
            Error::Frame {
                stage: Stage::Present,
                ..
            }
        ));
        drop(d);
        assert!(ledger.live().is_empty());
    }

    #[test]
    fn render_scale_zero_uses_display_scale() {
        let ledger = Ledger::new();
        let mut d = driver(&ledger).unwrap();
        d.window_mut().set_display_scale(2.0);
        d.set_render_scale(0.0).unwrap();
        assert_eq!(d.context().scale(), 2.0);
        let padding = unsafe { (*sys::ImGui_GetStyle()).WindowPadding.x };

        // Scales are absolute, not accumulated.
        d.set_render_scale(1.0).unwrap();
        d.set_render_scale(2.0).unwrap();
        assert_eq!(unsafe { (*sys::ImGui_GetStyle()).WindowPadding.x }, padding);
        d.set_render_scale(1.5).unwrap();
        assert_eq!(d.context().scale(), 1.5);
        assert_eq!(unsafe { (*sys::ImGui_GetStyle()).FontScaleDpi }, 1.5);
    }
}
