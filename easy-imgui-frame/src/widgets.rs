//! The immediate-mode widget vocabulary.
//!
//! Every widget takes the value it had in the previous frame and returns the new one.
//! Nothing is retained by the application except those values: the toolkit decides
//! hit-testing and focus.

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Vec2 {
        Vec2 { x, y }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Rect {
        Rect { x, y, w, h }
    }
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x < self.x + self.w && p.y >= self.y && p.y < self.y + self.h
    }
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.w / 2.0, self.y + self.h / 2.0)
    }
}

/// A color with floating point components in `[0, 1]`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Colorf {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colorf {
    pub const WHITE: Colorf = Colorf::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Colorf = Colorf::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Colorf {
        Colorf { r, g, b, a }
    }
    /// Converts to 8-bit channels, saturating out-of-range components.
    pub fn to_rgba8(self) -> [u8; 4] {
        let c = |v: f32| (v.clamp(0.0, 1.0) * 255.0) as u8;
        [c(self.r), c(self.g), c(self.b), c(self.a)]
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct WindowFlags: u32 {
        const BORDER = 1 << 0;
        const MOVABLE = 1 << 1;
        const SCALABLE = 1 << 2;
        const MINIMIZABLE = 1 << 3;
        const NO_SCROLLBAR = 1 << 4;
        const TITLE = 1 << 5;
    }
}

bitflags::bitflags! {
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct EditFlags: u32 {
        const READ_ONLY = 1 << 0;
        /// Pressing Enter reports [`EditEvents::COMMITED`].
        const SIG_ENTER = 1 << 1;
        const AUTO_SELECT = 1 << 2;
        /// A single line field.
        const SIMPLE = 0;
    }
}

bitflags::bitflags! {
    /// Events reported by [`Widgets::edit_string`].
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct EditEvents: u32 {
        const ACTIVE = 1 << 0;
        const INACTIVE = 1 << 1;
        const ACTIVATED = 1 << 2;
        const DEACTIVATED = 1 << 3;
        const COMMITED = 1 << 4;
    }
}

/// Which characters a text field accepts.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Filter {
    #[default]
    Default,
    Ascii,
    Float,
    Decimal,
    Hex,
    Oct,
    Binary,
}

impl Filter {
    pub fn accepts(self, c: char) -> bool {
        match self {
            Filter::Default => !c.is_control(),
            Filter::Ascii => c.is_ascii() && !c.is_ascii_control(),
            Filter::Float => c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'),
            Filter::Decimal => c.is_ascii_digit() || c == '-',
            Filter::Hex => c.is_ascii_hexdigit(),
            Filter::Oct => matches!(c, '0'..='7'),
            Filter::Binary => matches!(c, '0' | '1'),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum ColorFormat {
    Rgb,
    #[default]
    Rgba,
}

/// Appends `input` to `text` keeping only the characters `filter` accepts and never
/// growing `text` past `max_len` bytes.
pub fn insert_filtered(text: &mut String, input: &str, max_len: usize, filter: Filter) {
    for c in input.chars().filter(|&c| filter.accepts(c)) {
        if text.len() + c.len_utf8() > max_len {
            break;
        }
        text.push(c);
    }
}

/// Snaps `value` to the `step` grid starting at `min` and clamps it into `[min, max]`.
pub fn snap_clamp(min: f32, value: f32, max: f32, step: f32) -> f32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    let value = if value.is_nan() { lo } else { value };
    let value = if step > 0.0 {
        lo + ((value - lo) / step).round() * step
    } else {
        value
    };
    value.clamp(lo, hi)
}

/// The widgets a GUI toolkit offers to the application.
pub trait Widgets {
    /// Starts a window. Returns `false` if the window is collapsed or hidden, in which case
    /// no widget should be declared. [`Widgets::end_window`] must be called either way.
    fn begin_window(&mut self, title: &str, bounds: Rect, flags: WindowFlags) -> bool;
    fn end_window(&mut self);

    /// Starts a row of `cols` items, each `item_width` wide.
    fn layout_row_static(&mut self, height: f32, item_width: f32, cols: usize);
    /// Starts a row of `cols` items sharing the available width.
    fn layout_row_dynamic(&mut self, height: f32, cols: usize);

    /// Returns `true` if the button was clicked.
    fn button(&mut self, label: &str) -> bool;
    fn checkbox(&mut self, label: &str, value: bool) -> bool;
    /// A radio option. Returns `true` if it is active after this frame.
    fn option(&mut self, label: &str, active: bool) -> bool;
    /// The result is always in `[min, max]`.
    fn slider(&mut self, min: f32, value: f32, max: f32, step: f32) -> f32;
    fn color_picker(&mut self, color: Colorf, format: ColorFormat) -> Colorf;
    /// Edits `text` in place, never letting it grow past `max_len` bytes.
    fn edit_string(
        &mut self,
        flags: EditFlags,
        text: &mut String,
        max_len: usize,
        filter: Filter,
    ) -> EditEvents;

    /// One option of a radio group, modeled as a single selection.
    ///
    /// Returns `value` if this option is picked, or `selected` unchanged.
    fn radio<T: Copy + PartialEq>(&mut self, label: &str, value: T, selected: T) -> T
    where
        Self: Sized,
    {
        if self.option(label, selected == value) {
            value
        } else {
            selected
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn snap_clamp_stays_in_range() {
        for v in [-10.0, -0.01, 0.0, 0.04, 0.06, 0.5, 0.99, 1.0, 3.5, f32::NAN] {
            let r = snap_clamp(0.0, v, 1.0, 0.1);
            assert!((0.0..=1.0).contains(&r), "{v} -> {r}");
        }
        assert_relative_eq!(snap_clamp(0.0, 0.06, 1.0, 0.1), 0.1);
        assert_relative_eq!(snap_clamp(0.0, 0.33, 1.0, 0.0), 0.33);
        assert_relative_eq!(snap_clamp(1.0, 7.0, 0.0, 0.1), 1.0);
    }

    #[test]
    fn insert_respects_limit_and_filter() {
        let mut s = String::from("ab");
        insert_filtered(&mut s, "cdé\u{7}f", 5, Filter::Default);
        assert_eq!(s, "abcd");
        let mut s = String::new();
        insert_filtered(&mut s, "1a0x1", 16, Filter::Binary);
        assert_eq!(s, "101");
    }

    #[test]
    fn color_to_bytes_saturates() {
        assert_eq!(Colorf::new(0.25, 0.25, 0.25, 1.0).to_rgba8(), [63, 63, 63, 255]);
        assert_eq!(Colorf::new(-1.0, 2.0, 0.5, 1.0).to_rgba8(), [0, 255, 127, 255]);
    }

    #[test]
    fn rect_hit_testing() {
        let r = Rect::new(10.0, 10.0, 20.0, 10.0);
        assert!(r.contains(Vec2::new(10.0, 10.0)));
        assert!(!r.contains(Vec2::new(30.0, 10.0)));
        assert_eq!(r.center(), Vec2::new(20.0, 15.0));
    }
}
