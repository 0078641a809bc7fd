/*!
* The native backend: an SDL3 window with an OpenGL3 renderer, and the ImGui backends
* that join it to an [`ImGuiContext`].
*/

use std::{mem::MaybeUninit, rc::Rc};

use easy_imgui_sys::{self as sys, sdl3_sys};
use glow::HasContext;
use sdl3::{
    EventPump,
    event::{Event, WindowEvent},
    video::{GLContext, GLProfile, SwapInterval},
};
use sdl3_sys::everything::{SDL_Event, SDL_PollEvent};

use crate::{
    Bindings, Colorf, Dispatch, DrawData, Error, ImGuiContext, RenderOpts, Resource, Result,
    Stage, WindowDriver, WindowOpts, WindowPos,
};

fn to_window_pos(pos: WindowPos) -> sdl3::video::WindowPos {
    match pos {
        WindowPos::Centered => sdl3::video::WindowPos::Centered,
        WindowPos::At(p) => sdl3::video::WindowPos::Positioned(p),
    }
}

/// An SDL3 window with an OpenGL context.
pub struct Sdl3Window {
    sdl: sdl3::Sdl,
    video: sdl3::VideoSubsystem,
    window: Option<sdl3::video::Window>,
    event_pump: Option<EventPump>,
    gl_context: Option<GLContext>,
    gl: Option<Rc<glow::Context>>,
}

impl Sdl3Window {
    /// Initializes SDL3 and its video subsystem. No window is created yet.
    pub fn new() -> Result<Sdl3Window> {
        let sdl = sdl3::init().map_err(|e| Error::init(Resource::Window, e))?;
        let video = sdl.video().map_err(|e| Error::init(Resource::Window, e))?;
        Ok(Sdl3Window {
            sdl,
            video,
            window: None,
            event_pump: None,
            gl_context: None,
            gl: None,
        })
    }
    pub fn window(&self) -> Option<&sdl3::video::Window> {
        self.window.as_ref()
    }
    /// The Glow context, once the renderer exists.
    pub fn gl(&self) -> Option<&Rc<glow::Context>> {
        self.gl.as_ref()
    }
    /// Loads the OpenGL functions of the context current in this thread.
    ///
    /// # Safety
    /// An OpenGL context of this window must be current.
    unsafe fn load_gl(&self) -> glow::Context {
        let video = &self.video;
        let loader = |name: &str| match video.gl_get_proc_address(name) {
            Some(f) => f as *const std::ffi::c_void,
            None => std::ptr::null(),
        };
        unsafe { glow::Context::from_loader_function(loader) }
    }
}

impl WindowDriver for Sdl3Window {
    type Event = SDL_Event;

    fn create_window(&mut self, opts: &WindowOpts) -> Result<()> {
        let gla = self.video.gl_attr();
        gla.set_context_version(3, 2);
        gla.set_context_profile(GLProfile::Core);
        gla.set_depth_size(0);

        let mut builder = self.video.window(&opts.title, opts.width, opts.height);
        builder.opengl().resizable().hidden();
        if opts.high_dpi {
            builder.high_pixel_density();
        }
        let mut window = builder
            .build()
            .map_err(|e| Error::init(Resource::Window, e))?;
        window.set_position(to_window_pos(opts.pos_x), to_window_pos(opts.pos_y));
        window.show();

        let event_pump = self
            .sdl
            .event_pump()
            .map_err(|e| Error::init(Resource::Window, e))?;
        self.window = Some(window);
        self.event_pump = Some(event_pump);
        Ok(())
    }
    fn create_renderer(&mut self, opts: &RenderOpts) -> Result<()> {
        let Some(window) = &self.window else {
            return Err(Error::init(Resource::Renderer, "no window"));
        };
        let gl_context = window
            .gl_create_context()
            .map_err(|e| Error::init(Resource::Renderer, e))?;
        window
            .gl_make_current(&gl_context)
            .map_err(|e| Error::init(Resource::Renderer, e))?;
        let interval = if opts.vsync {
            SwapInterval::VSync
        } else {
            SwapInterval::Immediate
        };
        if let Err(e) = self.video.gl_set_swap_interval(interval) {
            log::warn!("cannot set the swap interval: {e}");
        }
        let gl = unsafe { self.load_gl() };
        self.gl = Some(Rc::new(gl));
        self.gl_context = Some(gl_context);
        Ok(())
    }
    fn poll_event(&mut self) -> Result<Option<SDL_Event>> {
        if self.event_pump.is_none() {
            return Err(Error::frame(Stage::Input, "no window"));
        }
        // `EventPump` only hands out parsed events, and the ImGui backend wants them raw.
        let mut event = MaybeUninit::<SDL_Event>::uninit();
        let pending = unsafe { SDL_PollEvent(event.as_mut_ptr()) };
        Ok(pending.then(|| unsafe { event.assume_init() }))
    }
    fn display_scale(&self) -> f32 {
        self.window.as_ref().map_or(1.0, |w| w.display_scale())
    }
    fn clear(&mut self, color: Colorf) -> Result<()> {
        let (Some(window), Some(gl)) = (&self.window, &self.gl) else {
            return Err(Error::frame(Stage::Draw, "no renderer"));
        };
        let (display_w, display_h) = window.size_in_pixels();
        unsafe {
            gl.viewport(0, 0, display_w as i32, display_h as i32);
            gl.clear_color(color.r, color.g, color.b, color.a);
            gl.clear(glow::COLOR_BUFFER_BIT);
        }
        Ok(())
    }
    fn present(&mut self) -> Result<()> {
        let Some(window) = &self.window else {
            return Err(Error::frame(Stage::Present, "no window"));
        };
        window.gl_swap_window();
        Ok(())
    }
    fn destroy_renderer(&mut self) -> Result<()> {
        self.gl = None;
        match self.gl_context.take() {
            Some(_) => Ok(()),
            None => Err(Error::destroy(Resource::Renderer, "not alive")),
        }
    }
    fn destroy_window(&mut self) -> Result<()> {
        self.event_pump = None;
        match self.window.take() {
            Some(_) => Ok(()),
            None => Err(Error::destroy(Resource::Window, "not alive")),
        }
    }
}

/// Glue for the ImGui SDL3 platform backend and OpenGL3 renderer backend.
#[derive(Debug, Default)]
pub struct Sdl3OpenGl {
    window_id: Option<u32>,
}

impl Sdl3OpenGl {
    pub fn new() -> Sdl3OpenGl {
        Sdl3OpenGl::default()
    }
}

impl Bindings<Sdl3Window, ImGuiContext> for Sdl3OpenGl {
    fn attach(&mut self, window: &mut Sdl3Window, gui: &mut ImGuiContext) -> Result<()> {
        let (Some(w), Some(gl_context)) = (&window.window, &window.gl_context) else {
            return Err(Error::init(Resource::Bindings, "no window or renderer"));
        };
        if !gui.make_current() {
            return Err(Error::init(Resource::Bindings, "no GUI context"));
        }
        unsafe {
            if !sys::ImGui_ImplSDL3_InitForOpenGL(w.raw(), gl_context.raw() as *mut _) {
                return Err(Error::init(Resource::Bindings, "SDL3 platform backend"));
            }
            if !sys::ImGui_ImplOpenGL3_Init(c"#version 150".as_ptr()) {
                sys::ImGui_ImplSDL3_Shutdown();
                return Err(Error::init(Resource::Bindings, "OpenGL3 renderer backend"));
            }
        }
        self.window_id = Some(w.id());
        log::debug!("attached SDL3 and OpenGL3 backends");
        Ok(())
    }
    fn detach(&mut self, _window: &mut Sdl3Window, gui: &mut ImGuiContext) -> Result<()> {
        if !gui.make_current() {
            return Err(Error::destroy(Resource::Bindings, "no GUI context"));
        }
        unsafe {
            sys::ImGui_ImplOpenGL3_Shutdown();
            sys::ImGui_ImplSDL3_Shutdown();
        }
        self.window_id = None;
        log::debug!("detached SDL3 and OpenGL3 backends");
        Ok(())
    }
    fn dispatch(&mut self, event: SDL_Event, gui: &mut ImGuiContext) -> Dispatch {
        if gui.make_current() {
            unsafe {
                sys::ImGui_ImplSDL3_ProcessEvent(&event);
            }
        }
        match Event::from_ll(event) {
            Event::Quit { .. } => Dispatch::Quit,
            Event::Window {
                win_event: WindowEvent::CloseRequested,
                window_id,
                ..
            } if Some(window_id) == self.window_id => Dispatch::Quit,
            _ => Dispatch::Continue,
        }
    }
    fn new_frame(&mut self, _window: &mut Sdl3Window, gui: &mut ImGuiContext) -> Result<()> {
        if !gui.make_current() {
            return Err(Error::frame(Stage::Begin, "no GUI context"));
        }
        unsafe {
            sys::ImGui_ImplOpenGL3_NewFrame();
            sys::ImGui_ImplSDL3_NewFrame();
        }
        Ok(())
    }
    fn draw(&mut self, _window: &mut Sdl3Window, commands: DrawData) -> Result<()> {
        unsafe {
            sys::ImGui_ImplOpenGL3_RenderDrawData(commands.as_ptr());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_position_maps_to_sdl() {
        assert!(matches!(
            to_window_pos(WindowPos::Centered),
            sdl3::video::WindowPos::Centered
        ));
        assert!(matches!(
            to_window_pos(WindowPos::At(-20)),
            sdl3::video::WindowPos::Positioned(-20)
        ));
    }
}
