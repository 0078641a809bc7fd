//! A Dear ImGui context as the [`GuiDriver`].
//!
//! The frame is split in two calls instead of running inside a callback, so the widgets
//! are declared with the raw `easy-imgui-sys` functions.

use std::{
    ffi::{CStr, CString, c_char},
    ptr::{NonNull, null, null_mut},
};

use easy_imgui::{ColorEditFlags, Cond, InputTextFlags, Key, MouseButton, SliderFlags};
use easy_imgui_sys::{self as sys, ImDrawData, ImDrawList, ImGuiIO, ImGuiKey, ImVec2};

use crate::{
    ColorFormat, Colorf, ConvertOpts, EditEvents, EditFlags, Error, Filter, FontOpts, GuiDriver,
    Rect, Resource, Result, Stage, Vec2, Widgets, WindowFlags, insert_filtered, snap_clamp,
};

/// Input for the GUI, already translated from native events.
#[derive(Debug, Clone, PartialEq)]
pub enum GuiInput {
    MousePos(Vec2),
    MouseButton { button: MouseButton, down: bool },
    Text(String),
    Key { key: Key, down: bool },
    Focus(bool),
}

/// Size of the output of a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DrawStats {
    pub lists: usize,
    pub commands: usize,
    pub vertices: usize,
    pub indices: usize,
}

/// The draw data of a rendered ImGui frame.
///
/// It is owned by the context and valid until the next frame starts.
pub struct DrawData(NonNull<ImDrawData>);

impl DrawData {
    pub fn as_ptr(&self) -> *mut ImDrawData {
        self.0.as_ptr()
    }
    pub fn stats(&self) -> DrawStats {
        let draw_data = unsafe { self.0.as_ref() };
        // An empty `ImVector` may have no storage at all.
        let lists: &[*mut ImDrawList] = if draw_data.CmdLists.Size > 0 {
            &draw_data.CmdLists
        } else {
            &[]
        };
        DrawStats {
            lists: lists.len(),
            commands: lists
                .iter()
                .map(|list| unsafe { (**list).CmdBuffer.Size.max(0) as usize })
                .sum(),
            vertices: draw_data.TotalVtxCount.max(0) as usize,
            indices: draw_data.TotalIdxCount.max(0) as usize,
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct Row {
    height: f32,
    item_width: f32,
    cols: usize,
    index: usize,
}

fn c_label(label: &str) -> CString {
    CString::new(label.replace('\0', "")).unwrap_or_default()
}

fn im_to_rect(min: ImVec2, max: ImVec2) -> Rect {
    Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
}

fn window_flags(flags: WindowFlags) -> easy_imgui::WindowFlags {
    use easy_imgui::WindowFlags as F;
    let mut im_flags = F::None;
    for (ours, theirs) in [
        (WindowFlags::TITLE, F::NoTitleBar),
        (WindowFlags::MOVABLE, F::NoMove),
        (WindowFlags::SCALABLE, F::NoResize),
        (WindowFlags::MINIMIZABLE, F::NoCollapse),
    ] {
        if !flags.contains(ours) {
            im_flags |= theirs;
        }
    }
    if flags.contains(WindowFlags::NO_SCROLLBAR) {
        im_flags |= F::NoScrollbar;
    }
    im_flags
}

unsafe fn load_font(fonts: *mut sys::ImFontAtlas, font: &FontOpts) -> Result<()> {
    let Some(path) = &font.path else {
        unsafe {
            sys::ImFontAtlas_AddFontDefault(fonts, null());
        }
        return Ok(());
    };
    std::fs::metadata(path)
        .map_err(|e| Error::init(Resource::Context, format!("font {}: {e}", path.display())))?;
    let c_path = path
        .to_str()
        .and_then(|p| CString::new(p).ok())
        .ok_or_else(|| {
            Error::init(
                Resource::Context,
                format!("font {}: invalid path", path.display()),
            )
        })?;
    let loaded = unsafe {
        sys::ImFontAtlas_AddFontFromFileTTF(fonts, c_path.as_ptr(), font.size, null(), null())
    };
    if loaded.is_null() {
        return Err(Error::init(
            Resource::Context,
            format!("font {}: cannot load", path.display()),
        ));
    }
    Ok(())
}

/// A Dear ImGui context.
///
/// Widgets declared in a row are placed with `SameLine` and sized with `SetNextItemWidth`.
/// The bounds of every widget of the last frame are kept, see [`ImGuiContext::widget_bounds`].
pub struct ImGuiContext {
    imgui: Option<easy_imgui::Context>,
    raw: *mut sys::ImGuiContext,
    in_frame: bool,
    scale: f32,
    row: Option<Row>,
    ids: usize,
    bounds: Vec<(String, Rect)>,
    last_bounds: Vec<(String, Rect)>,
}

impl Default for ImGuiContext {
    fn default() -> Self {
        ImGuiContext {
            imgui: None,
            raw: null_mut(),
            in_frame: false,
            scale: 1.0,
            row: None,
            ids: 0,
            bounds: Vec::new(),
            last_bounds: Vec::new(),
        }
    }
}

impl ImGuiContext {
    pub fn new() -> ImGuiContext {
        ImGuiContext::default()
    }
    pub fn is_alive(&self) -> bool {
        self.imgui.is_some()
    }
    /// Makes the context current and returns its IO.
    pub fn io_mut(&mut self) -> Option<&mut ImGuiIO> {
        if !self.make_current() {
            return None;
        }
        unsafe { Some(&mut *sys::ImGui_GetIO()) }
    }
    pub fn scale(&self) -> f32 {
        self.scale
    }
    /// Frames begun since the context was created.
    pub fn frame_count(&mut self) -> i32 {
        if !self.make_current() {
            return 0;
        }
        unsafe { sys::ImGui_GetFrameCount() }
    }
    pub fn in_frame(&self) -> bool {
        self.in_frame
    }
    /// Bounds of a widget in the last finished frame.
    ///
    /// Labeled widgets are found by their label; sliders, color pickers and text fields
    /// by `"slider"`, `"color_picker"` and `"edit_string"`. Repeated keys get a `#n`
    /// suffix, counting from 1 for the second one.
    pub fn widget_bounds(&self, key: &str) -> Option<Rect> {
        self.last_bounds
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, r)| *r)
    }

    pub(crate) fn make_current(&mut self) -> bool {
        if self.imgui.is_none() {
            return false;
        }
        unsafe {
            sys::ImGui_SetCurrentContext(self.raw);
        }
        true
    }
    /// An id for a widget without a visible label.
    fn hidden_id(&mut self, kind: &str) -> CString {
        self.ids += 1;
        c_label(&format!("##{kind}{}", self.ids))
    }
    /// Keeps the bounds of the last declared item.
    fn record(&mut self, base: &str) {
        let rect = unsafe { im_to_rect(sys::ImGui_GetItemRectMin(), sys::ImGui_GetItemRectMax()) };
        let n = self
            .bounds
            .iter()
            .filter(|(k, _)| {
                k == base || k.strip_prefix(base).is_some_and(|rest| rest.starts_with('#'))
            })
            .count();
        let key = if n == 0 {
            base.to_owned()
        } else {
            format!("{base}#{n}")
        };
        self.bounds.push((key, rect));
    }
    /// Places the next item in the current row, and returns its size.
    fn next_item(&mut self) -> ImVec2 {
        let Some(row) = &mut self.row else {
            return ImVec2 { x: 0.0, y: 0.0 };
        };
        if row.cols == 0 {
            return ImVec2 { x: 0.0, y: 0.0 };
        }
        if row.index % row.cols != 0 {
            unsafe {
                sys::ImGui_SameLine(0.0, -1.0);
            }
        }
        row.index += 1;
        unsafe {
            sys::ImGui_SetNextItemWidth(row.item_width);
        }
        ImVec2 {
            x: row.item_width,
            y: row.height,
        }
    }
}

impl GuiDriver for ImGuiContext {
    type Input = GuiInput;
    type Commands = DrawData;

    fn create_context(&mut self, font: &FontOpts) -> Result<()> {
        if self.imgui.is_some() {
            return Err(Error::init(Resource::Context, "already created"));
        }
        // A new context is left as the current one.
        let imgui = unsafe { easy_imgui::ContextBuilder::new().build() };
        let raw = unsafe { sys::ImGui_GetCurrentContext() };
        unsafe {
            let io = &mut *sys::ImGui_GetIO();
            io.IniFilename = null();
            io.ConfigDpiScaleFonts = true;
            // On error `imgui` is dropped here, destroying the context.
            load_font(io.Fonts, font)?;
            (*sys::ImGui_GetStyle()).FontSizeBase = font.size;
        }
        self.imgui = Some(imgui);
        self.raw = raw;
        self.scale = 1.0;
        Ok(())
    }
    fn set_scale(&mut self, scale: f32) -> Result<()> {
        if !self.make_current() {
            return Err(Error::frame(Stage::Begin, "no GUI context"));
        }
        if scale <= 0.0 || !scale.is_finite() {
            return Err(Error::frame(Stage::Begin, format!("invalid scale {scale}")));
        }
        unsafe {
            let style = sys::ImGui_GetStyle();
            // Sizes are scaled in place, so undo the previous scale.
            sys::ImGuiStyle_ScaleAllSizes(style, scale / self.scale);
            (*style).FontScaleDpi = scale;
        }
        self.scale = scale;
        Ok(())
    }
    fn handle_input(&mut self, input: GuiInput) {
        let Some(io) = self.io_mut() else {
            return;
        };
        unsafe {
            match input {
                GuiInput::MousePos(pos) => sys::ImGuiIO_AddMousePosEvent(io, pos.x, pos.y),
                GuiInput::MouseButton { button, down } => {
                    sys::ImGuiIO_AddMouseButtonEvent(io, button.bits(), down)
                }
                GuiInput::Text(text) => {
                    for c in text.chars() {
                        sys::ImGuiIO_AddInputCharacter(io, c as u32);
                    }
                }
                GuiInput::Key { key, down } => {
                    sys::ImGuiIO_AddKeyEvent(io, ImGuiKey(key.bits()), down)
                }
                GuiInput::Focus(focused) => sys::ImGuiIO_AddFocusEvent(io, focused),
            }
        }
    }
    fn begin_frame(&mut self) -> Result<()> {
        if !self.make_current() {
            return Err(Error::frame(Stage::Begin, "no GUI context"));
        }
        if self.in_frame {
            return Err(Error::frame(Stage::Begin, "frame already begun"));
        }
        unsafe {
            sys::ImGui_NewFrame();
        }
        self.in_frame = true;
        self.row = None;
        self.ids = 0;
        self.bounds.clear();
        Ok(())
    }
    fn end_frame(&mut self, convert: &ConvertOpts) -> Result<DrawData> {
        if !self.in_frame || !self.make_current() {
            return Err(Error::frame(Stage::Convert, "no frame to end"));
        }
        self.in_frame = false;
        self.last_bounds = std::mem::take(&mut self.bounds);
        unsafe {
            // Draw lists take these at `NewFrame`, so they apply from the next frame.
            let style = &mut *sys::ImGui_GetStyle();
            style.Alpha = convert.global_alpha.clamp(0.0, 1.0);
            style.AntiAliasedLines = convert.line_aa.is_on();
            style.AntiAliasedFill = convert.shape_aa.is_on();

            sys::ImGui_Render();
            NonNull::new(sys::ImGui_GetDrawData())
                .map(DrawData)
                .ok_or_else(|| Error::frame(Stage::Convert, "no draw data"))
        }
    }
    fn destroy_context(&mut self) -> Result<()> {
        self.in_frame = false;
        self.last_bounds.clear();
        self.raw = null_mut();
        match self.imgui.take() {
            Some(_) => Ok(()),
            None => Err(Error::destroy(Resource::Context, "not alive")),
        }
    }
}

impl Widgets for ImGuiContext {
    fn begin_window(&mut self, title: &str, bounds: Rect, flags: WindowFlags) -> bool {
        if !self.in_frame {
            return false;
        }
        let title = c_label(title);
        self.row = None;
        unsafe {
            let style = &mut *sys::ImGui_GetStyle();
            style.WindowBorderSize = if flags.contains(WindowFlags::BORDER) {
                1.0
            } else {
                0.0
            };
            sys::ImGui_SetNextWindowPos(
                &ImVec2 {
                    x: bounds.x,
                    y: bounds.y,
                },
                Cond::FirstUseEver.bits(),
                &ImVec2 { x: 0.0, y: 0.0 },
            );
            sys::ImGui_SetNextWindowSize(
                &ImVec2 {
                    x: bounds.w,
                    y: bounds.h,
                },
                Cond::FirstUseEver.bits(),
            );
            sys::ImGui_Begin(title.as_ptr(), null_mut(), window_flags(flags).bits())
        }
    }
    fn end_window(&mut self) {
        if self.in_frame {
            self.row = None;
            unsafe {
                sys::ImGui_End();
            }
        }
    }

    fn layout_row_static(&mut self, height: f32, item_width: f32, cols: usize) {
        self.row = Some(Row {
            height,
            item_width,
            cols,
            index: 0,
        });
    }
    fn layout_row_dynamic(&mut self, height: f32, cols: usize) {
        if !self.in_frame {
            return;
        }
        let item_width = unsafe {
            let avail = sys::ImGui_GetContentRegionAvail();
            let spacing = (*sys::ImGui_GetStyle()).ItemSpacing.x;
            let n = cols.max(1) as f32;
            ((avail.x - spacing * (n - 1.0)) / n).max(1.0)
        };
        self.row = Some(Row {
            height,
            item_width,
            cols,
            index: 0,
        });
    }

    fn button(&mut self, label: &str) -> bool {
        if !self.in_frame {
            return false;
        }
        let size = self.next_item();
        let c_label = c_label(label);
        let pressed = unsafe { sys::ImGui_Button(c_label.as_ptr(), &size) };
        self.record(label);
        pressed
    }
    fn checkbox(&mut self, label: &str, value: bool) -> bool {
        if !self.in_frame {
            return value;
        }
        self.next_item();
        let c_label = c_label(label);
        let mut value = value;
        unsafe {
            sys::ImGui_Checkbox(c_label.as_ptr(), &mut value);
        }
        self.record(label);
        value
    }
    fn option(&mut self, label: &str, active: bool) -> bool {
        if !self.in_frame {
            return active;
        }
        self.next_item();
        let c_label = c_label(label);
        let pressed = unsafe { sys::ImGui_RadioButton(c_label.as_ptr(), active) };
        self.record(label);
        active || pressed
    }
    fn slider(&mut self, min: f32, value: f32, max: f32, step: f32) -> f32 {
        // ImGui would keep a NaN or out of range value as is.
        let value = snap_clamp(min, value, max, 0.0);
        if !self.in_frame {
            return snap_clamp(min, value, max, step);
        }
        self.next_item();
        let id = self.hidden_id("slider");
        let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
        let mut v = value;
        unsafe {
            sys::ImGui_SliderFloat(
                id.as_ptr(),
                &mut v,
                lo,
                hi,
                c"%.2f".as_ptr(),
                SliderFlags::AlwaysClamp.bits(),
            );
        }
        self.record("slider");
        snap_clamp(min, v, max, step)
    }
    fn color_picker(&mut self, color: Colorf, format: ColorFormat) -> Colorf {
        if !self.in_frame {
            return color;
        }
        self.next_item();
        let id = self.hidden_id("color");
        let mut flags = ColorEditFlags::NoSidePreview
            | ColorEditFlags::NoInputs
            | ColorEditFlags::NoLabel
            | ColorEditFlags::PickerHueBar;
        flags |= match format {
            ColorFormat::Rgb => ColorEditFlags::NoAlpha,
            ColorFormat::Rgba => ColorEditFlags::AlphaBar,
        };
        let mut c = [color.r, color.g, color.b, color.a];
        unsafe {
            sys::ImGui_ColorPicker4(id.as_ptr(), c.as_mut_ptr(), flags.bits(), null());
        }
        self.record("color_picker");
        let a = match format {
            ColorFormat::Rgb => color.a,
            ColorFormat::Rgba => c[3],
        };
        Colorf::new(c[0], c[1], c[2], a)
    }
    fn edit_string(
        &mut self,
        flags: EditFlags,
        text: &mut String,
        max_len: usize,
        filter: Filter,
    ) -> EditEvents {
        while text.len() > max_len {
            text.pop();
        }
        if !self.in_frame {
            return EditEvents::INACTIVE;
        }
        self.next_item();
        let id = self.hidden_id("edit");

        let mut im_flags = InputTextFlags::None;
        if flags.contains(EditFlags::READ_ONLY) {
            im_flags |= InputTextFlags::ReadOnly;
        }
        if flags.contains(EditFlags::AUTO_SELECT) {
            im_flags |= InputTextFlags::AutoSelectAll;
        }
        if flags.contains(EditFlags::SIG_ENTER) {
            im_flags |= InputTextFlags::EnterReturnsTrue;
        }
        im_flags |= match filter {
            Filter::Decimal => InputTextFlags::CharsDecimal,
            Filter::Hex => InputTextFlags::CharsHexadecimal,
            Filter::Float => InputTextFlags::CharsScientific,
            _ => InputTextFlags::None,
        };

        // ImGui edits a NUL terminated buffer in place.
        let mut buf = vec![0u8; max_len + 1];
        buf[..text.len()].copy_from_slice(text.as_bytes());
        let (returned, active, activated, deactivated) = unsafe {
            let returned = sys::ImGui_InputText(
                id.as_ptr(),
                buf.as_mut_ptr() as *mut c_char,
                buf.len(),
                im_flags.bits(),
                None,
                null_mut(),
            );
            (
                returned,
                sys::ImGui_IsItemActive(),
                sys::ImGui_IsItemActivated(),
                sys::ImGui_IsItemDeactivated(),
            )
        };
        self.record("edit_string");
        let edited = CStr::from_bytes_until_nul(&buf)
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        // ImGui has no filter for some of ours.
        text.clear();
        insert_filtered(text, &edited, max_len, filter);

        let mut events = if active {
            EditEvents::ACTIVE
        } else {
            EditEvents::INACTIVE
        };
        if activated {
            events |= EditEvents::ACTIVATED;
        }
        if deactivated {
            events |= EditEvents::DEACTIVATED;
        }
        if returned && flags.contains(EditFlags::SIG_ENTER) {
            events |= EditEvents::COMMITED;
        }
        events
    }
}
