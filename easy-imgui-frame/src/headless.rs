/*!
* A backend that needs no display.
*
* [`HeadlessWindow`] plays the part of the windowing library and renderer, and
* [`HeadlessBindings`] joins it to a real [`ImGuiContext`] the way the platform and
* renderer backends would: it feeds the IO with the scripted input and accepts the font
* textures. Input is scripted with a [`Script`], and every native resource is accounted
* in a [`Ledger`], that can also be told to fail.
*/

use std::{
    cell::RefCell,
    collections::{HashSet, VecDeque},
    rc::Rc,
};

use easy_imgui::{BackendFlags, Key, MouseButton};
use easy_imgui_sys::{self as sys, ImTextureData, ImTextureStatus, ImVec2};

use crate::{
    Bindings, Colorf, Dispatch, Driver, DriverConfig, DrawData, DrawStats, Error, GuiDriver,
    GuiInput, ImGuiContext, RenderOpts, Resource, Result, Stage, Vec2, WindowDriver, WindowOpts,
};

#[derive(Debug, Default)]
struct LedgerInner {
    live: Vec<Resource>,
    history: Vec<String>,
    fail_create: HashSet<Resource>,
    fail_destroy: HashSet<Resource>,
}

/// Bookkeeping of the resources created by the headless backend.
///
/// Clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct Ledger(Rc<RefCell<LedgerInner>>);

impl Ledger {
    pub fn new() -> Ledger {
        Ledger::default()
    }
    /// Makes the creation of `resource` fail.
    pub fn fail_create(&self, resource: Resource) {
        self.0.borrow_mut().fail_create.insert(resource);
    }
    /// Makes the release of `resource` report an error. It is released anyway.
    pub fn fail_destroy(&self, resource: Resource) {
        self.0.borrow_mut().fail_destroy.insert(resource);
    }
    /// Resources currently alive, in creation order.
    pub fn live(&self) -> Vec<Resource> {
        self.0.borrow().live.clone()
    }
    /// Every successful creation and every release, in order.
    pub fn history(&self) -> Vec<String> {
        self.0.borrow().history.clone()
    }

    fn create(&self, resource: Resource) -> Result<()> {
        let mut inner = self.0.borrow_mut();
        if inner.fail_create.contains(&resource) {
            return Err(Error::init(resource, "out of resources"));
        }
        if inner.live.contains(&resource) {
            return Err(Error::init(resource, "already created"));
        }
        inner.live.push(resource);
        inner.history.push(format!("create {resource}"));
        Ok(())
    }
    fn destroy(&self, resource: Resource) -> Result<()> {
        let mut inner = self.0.borrow_mut();
        let Some(idx) = inner.live.iter().position(|r| *r == resource) else {
            return Err(Error::destroy(resource, "not alive"));
        };
        inner.live.remove(idx);
        inner.history.push(format!("destroy {resource}"));
        if inner.fail_destroy.contains(&resource) {
            return Err(Error::destroy(resource, "release reported a failure"));
        }
        Ok(())
    }
}

/// A native-like input event.
#[derive(Debug, Clone, PartialEq)]
pub enum HeadlessEvent {
    MouseMove(Vec2),
    MouseDown(Vec2),
    MouseUp(Vec2),
    Text(String),
    Key { key: Key, down: bool },
    CloseWindow,
    Quit,
}

/// Queue of input events, shared with the [`HeadlessWindow`] that will deliver them.
#[derive(Debug, Clone, Default)]
pub struct Script(Rc<RefCell<VecDeque<HeadlessEvent>>>);

impl Script {
    pub fn push(&self, event: HeadlessEvent) {
        self.0.borrow_mut().push_back(event);
    }
    /// A press and release of the left mouse button at `pos`.
    pub fn click(&self, pos: Vec2) {
        self.push(HeadlessEvent::MouseMove(pos));
        self.push(HeadlessEvent::MouseDown(pos));
        self.push(HeadlessEvent::MouseUp(pos));
    }
    pub fn type_text(&self, text: &str) {
        self.push(HeadlessEvent::Text(text.to_owned()));
    }
    /// A press and release of `key`.
    pub fn key(&self, key: Key) {
        self.push(HeadlessEvent::Key { key, down: true });
        self.push(HeadlessEvent::Key { key, down: false });
    }
    pub fn pending(&self) -> usize {
        self.0.borrow().len()
    }
    fn pop(&self) -> Option<HeadlessEvent> {
        self.0.borrow_mut().pop_front()
    }
}

/// What reached the screen in one frame.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresentedFrame {
    pub clear: [u8; 4],
    pub draw: DrawStats,
}

/// A window and renderer that only keep records of what they are asked to do.
#[derive(Debug)]
pub struct HeadlessWindow {
    ledger: Ledger,
    script: Script,
    opts: Option<WindowOpts>,
    render: Option<RenderOpts>,
    display_scale: f32,
    pending: PresentedFrame,
    presented: Vec<PresentedFrame>,
    fail_present: bool,
}

impl HeadlessWindow {
    pub fn new(ledger: &Ledger) -> HeadlessWindow {
        HeadlessWindow {
            ledger: ledger.clone(),
            script: Script::default(),
            opts: None,
            render: None,
            display_scale: 1.0,
            pending: PresentedFrame::default(),
            presented: Vec::new(),
            fail_present: false,
        }
    }
    /// A handle to feed input to this window.
    pub fn script(&self) -> Script {
        self.script.clone()
    }
    pub fn opts(&self) -> Option<&WindowOpts> {
        self.opts.as_ref()
    }
    pub fn render_opts(&self) -> Option<&RenderOpts> {
        self.render.as_ref()
    }
    pub fn set_display_scale(&mut self, scale: f32) {
        self.display_scale = scale;
    }
    /// Makes every following `present` fail.
    pub fn fail_present(&mut self) {
        self.fail_present = true;
    }
    pub fn presented(&self) -> &[PresentedFrame] {
        &self.presented
    }
    /// Records the output of the frame being rendered.
    pub fn submit(&mut self, draw: DrawStats) -> Result<()> {
        if self.render.is_none() {
            return Err(Error::frame(Stage::Draw, "no renderer"));
        }
        self.pending.draw = draw;
        Ok(())
    }
    fn size(&self) -> ImVec2 {
        self.opts.as_ref().map_or(ImVec2 { x: 0.0, y: 0.0 }, |o| ImVec2 {
            x: o.width as f32,
            y: o.height as f32,
        })
    }
}

impl WindowDriver for HeadlessWindow {
    type Event = HeadlessEvent;

    fn create_window(&mut self, opts: &WindowOpts) -> Result<()> {
        self.ledger.create(Resource::Window)?;
        self.opts = Some(opts.clone());
        Ok(())
    }
    fn create_renderer(&mut self, opts: &RenderOpts) -> Result<()> {
        if self.opts.is_none() {
            return Err(Error::init(Resource::Renderer, "no window"));
        }
        self.ledger.create(Resource::Renderer)?;
        self.render = Some(*opts);
        Ok(())
    }
    fn poll_event(&mut self) -> Result<Option<HeadlessEvent>> {
        if self.opts.is_none() {
            return Err(Error::frame(Stage::Input, "no window"));
        }
        Ok(self.script.pop())
    }
    fn display_scale(&self) -> f32 {
        self.display_scale
    }
    fn clear(&mut self, color: Colorf) -> Result<()> {
        self.pending = PresentedFrame {
            clear: color.to_rgba8(),
            draw: DrawStats::default(),
        };
        Ok(())
    }
    fn present(&mut self) -> Result<()> {
        if self.fail_present {
            return Err(Error::frame(Stage::Present, "swap failed"));
        }
        self.presented.push(std::mem::take(&mut self.pending));
        Ok(())
    }
    fn destroy_renderer(&mut self) -> Result<()> {
        self.render = None;
        self.ledger.destroy(Resource::Renderer)
    }
    fn destroy_window(&mut self) -> Result<()> {
        self.opts = None;
        self.ledger.destroy(Resource::Window)
    }
}

/// Accepts a texture request of ImGui without uploading anything.
fn update_texture(tex: &mut ImTextureData, next_id: &mut u64) {
    match tex.Status {
        ImTextureStatus::ImTextureStatus_WantCreate => {
            *next_id += 1;
            tex.TexID = *next_id;
            tex.Status = ImTextureStatus::ImTextureStatus_OK;
        }
        ImTextureStatus::ImTextureStatus_WantUpdates => {
            tex.Status = ImTextureStatus::ImTextureStatus_OK;
        }
        ImTextureStatus::ImTextureStatus_WantDestroy => {
            tex.TexID = 0;
            tex.Status = ImTextureStatus::ImTextureStatus_Destroyed;
        }
        _ => {}
    }
}

/// Joins a [`HeadlessWindow`] and an [`ImGuiContext`].
///
/// Its attachment is accounted in the ledger as [`Resource::Bindings`].
#[derive(Debug)]
pub struct HeadlessBindings {
    ledger: Ledger,
    textures: u64,
}

impl HeadlessBindings {
    pub fn new(ledger: &Ledger) -> HeadlessBindings {
        HeadlessBindings {
            ledger: ledger.clone(),
            textures: 0,
        }
    }
}

impl Bindings<HeadlessWindow, ImGuiContext> for HeadlessBindings {
    fn attach(&mut self, window: &mut HeadlessWindow, gui: &mut ImGuiContext) -> Result<()> {
        let size = window.size();
        let Some(io) = gui.io_mut() else {
            return Err(Error::init(Resource::Bindings, "no GUI context"));
        };
        self.ledger.create(Resource::Bindings)?;
        io.DisplaySize = size;
        io.BackendFlags |= BackendFlags::RendererHasTextures.bits();
        Ok(())
    }
    fn detach(&mut self, _window: &mut HeadlessWindow, gui: &mut ImGuiContext) -> Result<()> {
        if let Some(io) = gui.io_mut() {
            io.BackendFlags &= !BackendFlags::RendererHasTextures.bits();
        }
        self.ledger.destroy(Resource::Bindings)
    }
    fn dispatch(&mut self, event: HeadlessEvent, gui: &mut ImGuiContext) -> Dispatch {
        let input = match event {
            HeadlessEvent::CloseWindow | HeadlessEvent::Quit => return Dispatch::Quit,
            HeadlessEvent::MouseMove(pos) => GuiInput::MousePos(pos),
            HeadlessEvent::MouseDown(pos) | HeadlessEvent::MouseUp(pos) => {
                let down = matches!(event, HeadlessEvent::MouseDown(_));
                gui.handle_input(GuiInput::MousePos(pos));
                GuiInput::MouseButton {
                    button: MouseButton::Left,
                    down,
                }
            }
            HeadlessEvent::Text(text) => GuiInput::Text(text),
            HeadlessEvent::Key { key, down } => GuiInput::Key { key, down },
        };
        gui.handle_input(input);
        Dispatch::Continue
    }
    fn new_frame(&mut self, window: &mut HeadlessWindow, gui: &mut ImGuiContext) -> Result<()> {
        let size = window.size();
        let Some(io) = gui.io_mut() else {
            return Err(Error::frame(Stage::Begin, "no GUI context"));
        };
        io.DisplaySize = size;
        io.DeltaTime = 1.0 / 60.0;
        Ok(())
    }
    fn draw(&mut self, window: &mut HeadlessWindow, commands: DrawData) -> Result<()> {
        // The context that rendered `commands` is still the current one.
        unsafe {
            let pio = &*sys::ImGui_GetPlatformIO();
            if pio.Textures.Size > 0 {
                for tex in pio.Textures.iter() {
                    update_texture(&mut **tex, &mut self.textures);
                }
            }
        }
        window.submit(commands.stats())
    }
}

/// A [`Driver`] over the headless backend.
pub type HeadlessDriver = Driver<HeadlessWindow, ImGuiContext, HeadlessBindings>;

/// Initializes a [`HeadlessDriver`] with every resource accounted in `ledger`.
pub fn driver(ledger: &Ledger, config: DriverConfig) -> Result<HeadlessDriver> {
    Driver::init(
        HeadlessWindow::new(ledger),
        ImGuiContext::new(),
        HeadlessBindings::new(ledger),
        config,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FontOpts;

    #[test]
    fn ledger_tracks_and_fails() {
        let ledger = Ledger::new();
        ledger.create(Resource::Window).unwrap();
        assert!(ledger.create(Resource::Window).is_err());
        ledger.fail_create(Resource::Renderer);
        assert!(ledger.create(Resource::Renderer).is_err());
        ledger.fail_destroy(Resource::Window);
        assert!(ledger.destroy(Resource::Window).is_err());
        assert!(ledger.live().is_empty());
        assert!(ledger.destroy(Resource::Window).is_err());
        assert_eq!(ledger.history(), vec!["create window", "destroy window"]);
    }

    #[test]
    fn window_needs_creation_order() {
        let ledger = Ledger::new();
        let mut w = HeadlessWindow::new(&ledger);
        assert!(w.create_renderer(&RenderOpts::default()).is_err());
        assert!(w.poll_event().is_err());
        w.create_window(&WindowOpts::default()).unwrap();
        w.create_renderer(&RenderOpts { vsync: true }).unwrap();
        assert_eq!(w.render_opts(), Some(&RenderOpts { vsync: true }));
        assert_eq!(w.opts().map(|o| o.width), Some(800));
    }

    #[test]
    fn bindings_need_a_context() {
        let ledger = Ledger::new();
        let mut w = HeadlessWindow::new(&ledger);
        let mut gui = ImGuiContext::new();
        let mut b = HeadlessBindings::new(&ledger);
        w.create_window(&WindowOpts::default()).unwrap();
        assert!(b.attach(&mut w, &mut gui).is_err());
        assert!(ledger.live().iter().all(|r| *r != Resource::Bindings));

        gui.create_context(&FontOpts::default()).unwrap();
        b.attach(&mut w, &mut gui).unwrap();
        let io = gui.io_mut().unwrap();
        assert_eq!((io.DisplaySize.x, io.DisplaySize.y), (800.0, 600.0));
        assert_ne!(io.BackendFlags & BackendFlags::RendererHasTextures.bits(), 0);

        assert_eq!(b.dispatch(HeadlessEvent::CloseWindow, &mut gui), Dispatch::Quit);
        assert_eq!(b.dispatch(HeadlessEvent::Quit, &mut gui), Dispatch::Quit);
        assert_eq!(
            b.dispatch(HeadlessEvent::MouseMove(Vec2::new(3.0, 4.0)), &mut gui),
            Dispatch::Continue
        );
        b.detach(&mut w, &mut gui).unwrap();
        gui.destroy_context().unwrap();
    }

    #[test]
    fn script_is_shared() {
        let ledger = Ledger::new();
        let mut w = HeadlessWindow::new(&ledger);
        w.create_window(&WindowOpts::default()).unwrap();
        let script = w.script();
        script.click(Vec2::new(1.0, 1.0));
        script.key(Key::Enter);
        assert_eq!(script.pending(), 5);
        assert_eq!(
            w.poll_event().unwrap(),
            Some(HeadlessEvent::MouseMove(Vec2::new(1.0, 1.0)))
        );
        assert_eq!(script.pending(), 4);
    }

    #[test]
    fn font_texture_is_accepted() {
        let ledger = Ledger::new();
        let mut d = driver(&ledger, DriverConfig::default()).unwrap();
        for _ in 0..2 {
            d.frame_start().unwrap().unwrap().end().unwrap();
        }
        let pio = unsafe { &*sys::ImGui_GetPlatformIO() };
        assert!(pio.Textures.Size > 0);
        let textures: Vec<&ImTextureData> = pio.Textures.iter().map(|t| unsafe { &**t }).collect();
        assert!(textures.iter().any(|t| {
            matches!(t.Status, ImTextureStatus::ImTextureStatus_OK) && t.TexID != 0
        }));
        assert!(textures.iter().all(|t| matches!(
            t.Status,
            ImTextureStatus::ImTextureStatus_OK | ImTextureStatus::ImTextureStatus_Destroyed
        )));
        assert_eq!(d.window().presented().len(), 2);
    }
}
