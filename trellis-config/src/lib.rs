#[macro_use]
extern crate tracing;

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use miette::{Context as _, IntoDiagnostic as _};

pub mod appearance;
pub mod layout;
pub mod utils;

pub use crate::appearance::*;
pub use crate::layout::*;
pub use crate::utils::FloatOrInt;

#[derive(knuffel::Decode, Debug, Default, Clone, PartialEq)]
pub struct Config {
    #[knuffel(child, default)]
    pub layout: Layout,
    #[knuffel(child, default)]
    pub colors: Colors,
}

impl Config {
    pub fn load(path: &Path) -> miette::Result<Self> {
        let contents = fs::read_to_string(path)
            .into_diagnostic()
            .with_context(|| format!("error reading {path:?}"))?;

        let config = Self::parse(
            path.file_name()
                .and_then(OsStr::to_str)
                .unwrap_or("config.kdl"),
            &contents,
        )
        .context("error parsing")?;
        debug!("loaded config from {path:?}");
        Ok(config)
    }

    pub fn parse(filename: &str, text: &str) -> Result<Self, knuffel::Error> {
        let _span = tracy_client::span!("Config::parse");
        knuffel::parse(filename, text)
    }
}

/// The commented default config shipped with trellis.
pub const DEFAULT_CONFIG: &str = include_str!("../resources/default-config.kdl");

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use trellis_ipc::{BorderStyle, LayoutMode};

    use super::*;

    #[track_caller]
    fn do_parse(text: &str) -> Config {
        Config::parse("test.kdl", text)
            .map_err(miette::Report::new)
            .unwrap()
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(do_parse(""), Config::default());
    }

    #[test]
    fn shipped_config_matches_defaults() {
        assert_eq!(do_parse(DEFAULT_CONFIG), Config::default());
    }

    #[test]
    fn parse() {
        let parsed = do_parse(
            r##"
            layout {
                gaps {
                    inner 4
                    outer 2.5
                }
                default-layout "grid"
                border {
                    style "pixel"
                    width 3
                }
                titlebar {
                    padding-y 2
                    font-height 14
                }
                floating-minimum-size 100 80
                floating-maximum-size 1200 900
                title-format "%app_id: %title"
            }

            colors {
                urgent {
                    background "#ff0000"
                }
                focused {
                    child-border 0 255 0 128
                }
            }
            "##,
        );

        let layout = &parsed.layout;
        assert_eq!(layout.gaps.inner, FloatOrInt(4.));
        assert_eq!(layout.gaps.outer, FloatOrInt(2.5));
        assert_eq!(layout.default_layout, LayoutMode::Grid);
        assert_eq!(layout.border.style, BorderStyle::Pixel);
        assert_eq!(layout.border.width, FloatOrInt(3.));
        assert_eq!(layout.floating_border, Border::default());
        assert_eq!(layout.titlebar.height(), 18.);
        assert_eq!(layout.titlebar.padding_x, FloatOrInt(5.));
        assert_eq!(
            layout.floating_minimum_size,
            FloatingSize {
                width: 100,
                height: 80
            }
        );
        assert_eq!(layout.floating_maximum_size.width, 1200);
        assert_eq!(layout.title_format, "%app_id: %title");

        let defaults = Colors::default();
        assert_eq!(
            parsed.colors.urgent.background,
            Color::new_unpremul(1., 0., 0., 1.)
        );
        assert_eq!(parsed.colors.urgent.border, defaults.urgent.border);
        assert_eq!(
            parsed.colors.focused.child_border,
            Color::from_rgba8_unpremul(0, 255, 0, 128)
        );
        assert_eq!(parsed.colors.unfocused, defaults.unfocused);
    }

    #[test]
    fn rejects_unknown_layout() {
        assert!(Config::parse("test.kdl", r#"layout { default-layout "tabbed"; }"#).is_err());
    }

    #[test]
    fn rejects_negative_gaps() {
        assert!(Config::parse("test.kdl", "layout { gaps { inner -1; }; }").is_err());
    }
}
