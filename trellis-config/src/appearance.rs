use std::ops::Mul;
use std::str::FromStr;

use knuffel::errors::DecodeError;
use miette::IntoDiagnostic as _;

use crate::utils::MergeWith;

/// RGB color in [0, 1] with unpremultiplied alpha.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new_unpremul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgba8_unpremul(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::from_array_unpremul([r, g, b, a].map(|x| x as f32 / 255.))
    }

    pub const fn from_array_unpremul([r, g, b, a]: [f32; 4]) -> Self {
        Self { r, g, b, a }
    }

    pub fn to_array_unpremul(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn to_array_premul(self) -> [f32; 4] {
        let [r, g, b, a] = [self.r, self.g, self.b, self.a];
        [r * a, g * a, b * a, a]
    }

    fn hex(rgb: u32) -> Self {
        let [_, r, g, b] = rgb.to_be_bytes();
        Self::from_rgba8_unpremul(r, g, b, 255)
    }
}

impl Mul<f32> for Color {
    type Output = Self;

    fn mul(mut self, rhs: f32) -> Self::Output {
        self.a *= rhs;
        self
    }
}

impl FromStr for Color {
    type Err = miette::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let color = csscolorparser::parse(s)
            .into_diagnostic()?
            .clamp()
            .to_array();
        Ok(Self::from_array_unpremul(color))
    }
}

#[derive(knuffel::Decode)]
struct ColorRgba {
    #[knuffel(argument)]
    r: u8,
    #[knuffel(argument)]
    g: u8,
    #[knuffel(argument)]
    b: u8,
    #[knuffel(argument)]
    a: u8,
}

impl From<ColorRgba> for Color {
    fn from(value: ColorRgba) -> Self {
        let ColorRgba { r, g, b, a } = value;
        Self::from_rgba8_unpremul(r, g, b, a)
    }
}

// Manual impl to allow both one-argument string and 4-argument RGBA forms.
impl<S> knuffel::Decode<S> for Color
where
    S: knuffel::traits::ErrorSpan,
{
    fn decode_node(
        node: &knuffel::ast::SpannedNode<S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        if let Some(type_name) = &node.type_name {
            ctx.emit_error(DecodeError::unexpected(
                type_name,
                "type name",
                "no type name expected for this node",
            ));
        }

        let mut iter_args = node.arguments.iter();
        let val = iter_args
            .next()
            .ok_or_else(|| DecodeError::missing(node, "additional argument is required"))?;

        let rv = match *val.literal {
            knuffel::ast::Literal::String(ref s) => {
                Color::from_str(s).map_err(|e| DecodeError::conversion(&val.literal, e))
            }
            _ => return ColorRgba::decode_node(node, ctx).map(Color::from),
        }?;

        if let Some(val) = iter_args.next() {
            ctx.emit_error(DecodeError::unexpected(
                &val.literal,
                "argument",
                "only one string argument is accepted",
            ));
        }
        for name in node.properties.keys() {
            ctx.emit_error(DecodeError::unexpected(
                name,
                "property",
                "no properties expected for this node",
            ))
        }
        for child in node.children.iter() {
            ctx.emit_error(DecodeError::unexpected(
                child,
                "child node",
                "no child nodes expected for this node",
            ))
        }

        Ok(rv)
    }
}

/// Colors used to draw the decorations of one container.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorSet {
    /// Title bar border.
    pub border: Color,
    /// Title bar background.
    pub background: Color,
    pub text: Color,
    /// Border on the side where the next window would be placed.
    pub indicator: Color,
    /// Window border.
    pub child_border: Color,
}

impl ColorSet {
    fn from_hex(border: u32, background: u32, text: u32, indicator: u32, child_border: u32) -> Self {
        Self {
            border: Color::hex(border),
            background: Color::hex(background),
            text: Color::hex(text),
            indicator: Color::hex(indicator),
            child_border: Color::hex(child_border),
        }
    }
}

#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq)]
pub struct ColorSetPart {
    #[knuffel(child)]
    pub border: Option<Color>,
    #[knuffel(child)]
    pub background: Option<Color>,
    #[knuffel(child)]
    pub text: Option<Color>,
    #[knuffel(child)]
    pub indicator: Option<Color>,
    #[knuffel(child)]
    pub child_border: Option<Color>,
}

impl MergeWith<ColorSetPart> for ColorSet {
    fn merge_with(&mut self, part: &ColorSetPart) {
        self.border.merge_with(&part.border);
        self.background.merge_with(&part.background);
        self.text.merge_with(&part.text);
        self.indicator.merge_with(&part.indicator);
        self.child_border.merge_with(&part.child_border);
    }
}

/// Decoration palettes, one per focus state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Colors {
    pub focused: ColorSet,
    pub focused_inactive: ColorSet,
    pub focused_tab_title: ColorSet,
    pub unfocused: ColorSet,
    pub urgent: ColorSet,
}

impl Default for Colors {
    fn default() -> Self {
        Self {
            focused: ColorSet::from_hex(0x4c7899, 0x285577, 0xffffff, 0x2e9ef4, 0x285577),
            focused_inactive: ColorSet::from_hex(0x333333, 0x5f676a, 0xffffff, 0x484e50, 0x5f676a),
            focused_tab_title: ColorSet::from_hex(0x333333, 0x5f676a, 0xffffff, 0x484e50, 0x5f676a),
            unfocused: ColorSet::from_hex(0x333333, 0x222222, 0x888888, 0x292d2e, 0x222222),
            urgent: ColorSet::from_hex(0x2f343a, 0x900000, 0xffffff, 0x900000, 0x900000),
        }
    }
}

#[derive(knuffel::Decode, Debug, Default, Clone, Copy, PartialEq)]
pub struct ColorsPart {
    #[knuffel(child, default)]
    pub focused: ColorSetPart,
    #[knuffel(child, default)]
    pub focused_inactive: ColorSetPart,
    #[knuffel(child, default)]
    pub focused_tab_title: ColorSetPart,
    #[knuffel(child, default)]
    pub unfocused: ColorSetPart,
    #[knuffel(child, default)]
    pub urgent: ColorSetPart,
}

impl MergeWith<ColorsPart> for Colors {
    fn merge_with(&mut self, part: &ColorsPart) {
        self.focused.merge_with(&part.focused);
        self.focused_inactive.merge_with(&part.focused_inactive);
        self.focused_tab_title.merge_with(&part.focused_tab_title);
        self.unfocused.merge_with(&part.unfocused);
        self.urgent.merge_with(&part.urgent);
    }
}

// Every palette has its own defaults, so the section is decoded as a part and merged on top.
impl<S> knuffel::Decode<S> for Colors
where
    S: knuffel::traits::ErrorSpan,
{
    fn decode_node(
        node: &knuffel::ast::SpannedNode<S>,
        ctx: &mut knuffel::decode::Context<S>,
    ) -> Result<Self, DecodeError<S>> {
        let part = ColorsPart::decode_node(node, ctx)?;
        Ok(Colors::default().merged_with(&part))
    }
}
