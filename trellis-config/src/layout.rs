use trellis_ipc::{BorderStyle, LayoutMode};

use crate::utils::FloatOrInt;

#[derive(knuffel::Decode, Debug, Clone, PartialEq)]
pub struct Layout {
    #[knuffel(child, default)]
    pub gaps: Gaps,
    #[knuffel(child, unwrap(argument, str), default)]
    pub default_layout: LayoutMode,
    #[knuffel(child, default)]
    pub border: Border,
    #[knuffel(child, default)]
    pub floating_border: Border,
    #[knuffel(child, default)]
    pub titlebar: Titlebar,
    #[knuffel(child, default = Self::default().floating_minimum_size)]
    pub floating_minimum_size: FloatingSize,
    /// Zero components mean the floating size is bounded by the workspace.
    #[knuffel(child, default)]
    pub floating_maximum_size: FloatingSize,
    /// Title format of view containers.
    ///
    /// Supports `%title`, `%app_id`, `%class`, `%instance` and `%shell`.
    #[knuffel(child, unwrap(argument), default = Self::default().title_format)]
    pub title_format: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            gaps: Gaps::default(),
            default_layout: LayoutMode::default(),
            border: Border::default(),
            floating_border: Border::default(),
            titlebar: Titlebar::default(),
            floating_minimum_size: FloatingSize {
                width: 75,
                height: 50,
            },
            floating_maximum_size: FloatingSize::default(),
            title_format: String::from("%title"),
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Gaps {
    /// Gap between adjacent containers, also added around the workspace edges.
    #[knuffel(child, unwrap(argument), default = Self::default().inner)]
    pub inner: FloatOrInt<0, 65535>,
    /// Extra gap around the workspace edges.
    #[knuffel(child, unwrap(argument), default)]
    pub outer: FloatOrInt<0, 65535>,
}

impl Default for Gaps {
    fn default() -> Self {
        Self {
            inner: FloatOrInt(8.),
            outer: FloatOrInt(0.),
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Border {
    #[knuffel(child, unwrap(argument, str), default)]
    pub style: BorderStyle,
    #[knuffel(child, unwrap(argument), default = Self::default().width)]
    pub width: FloatOrInt<0, 65535>,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            style: BorderStyle::Normal,
            width: FloatOrInt(2.),
        }
    }
}

#[derive(knuffel::Decode, Debug, Clone, Copy, PartialEq)]
pub struct Titlebar {
    #[knuffel(child, unwrap(argument), default = Self::default().padding_x)]
    pub padding_x: FloatOrInt<0, 65535>,
    #[knuffel(child, unwrap(argument), default = Self::default().padding_y)]
    pub padding_y: FloatOrInt<0, 65535>,
    /// Height of the title text; text itself is drawn by the renderer.
    #[knuffel(child, unwrap(argument), default = Self::default().font_height)]
    pub font_height: FloatOrInt<1, 65535>,
    #[knuffel(child, unwrap(argument), default = Self::default().border_width)]
    pub border_width: FloatOrInt<0, 65535>,
}

impl Default for Titlebar {
    fn default() -> Self {
        Self {
            padding_x: FloatOrInt(5.),
            padding_y: FloatOrInt(4.),
            font_height: FloatOrInt(12.),
            border_width: FloatOrInt(1.),
        }
    }
}

impl Titlebar {
    /// Full height of a title bar.
    pub fn height(&self) -> f64 {
        self.font_height.0 + self.padding_y.0 * 2.
    }
}

#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FloatingSize {
    #[knuffel(argument)]
    pub width: i32,
    #[knuffel(argument)]
    pub height: i32,
}
