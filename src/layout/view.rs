//! Client windows and their life in the tree.

use std::time::Instant;

use smithay::utils::{Logical, Rectangle, Size};
use trellis_ipc::{BorderStyle, FullscreenMode};

use super::{ContainerId, NodeId, Root, ViewId};

/// Shell protocol a view comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    XdgShell,
    XWayland,
    LayerShell,
}

impl ViewKind {
    pub fn name(self) -> &'static str {
        match self {
            ViewKind::XdgShell => "xdg_shell",
            ViewKind::XWayland => "xwayland",
            ViewKind::LayerShell => "layer_shell",
        }
    }
}

/// Size limits a client asks for. Zero minimums and infinite maximums mean no limit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewConstraints {
    pub min_width: f64,
    pub max_width: f64,
    pub min_height: f64,
    pub max_height: f64,
}

impl Default for ViewConstraints {
    fn default() -> Self {
        Self {
            min_width: 0.,
            max_width: f64::INFINITY,
            min_height: 0.,
            max_height: f64::INFINITY,
        }
    }
}

impl ViewConstraints {
    pub fn clamp(&self, size: Size<f64, Logical>) -> Size<f64, Logical> {
        Size::from((
            size.w.min(self.max_width).max(self.min_width),
            size.h.min(self.max_height).max(self.min_height),
        ))
    }
}

/// A client surface managed by the tree.
///
/// Implemented by the shell glue of the compositor for each protocol.
pub trait View {
    fn kind(&self) -> ViewKind;

    /// Asks the client to take this geometry, returning the configure serial.
    fn configure(&mut self, geometry: Rectangle<f64, Logical>) -> u32;

    fn constraints(&self) -> ViewConstraints;

    fn set_activated(&mut self, activated: bool);
    fn set_tiled(&mut self, tiled: bool);
    fn set_fullscreen(&mut self, fullscreen: bool);
    fn set_resizing(&mut self, resizing: bool);

    /// Asks the client to close.
    fn close(&mut self);

    fn title(&self) -> Option<String>;
    fn app_id(&self) -> Option<String>;

    /// X11 class, only set for XWayland views.
    fn class(&self) -> Option<String> {
        None
    }

    /// X11 instance, only set for XWayland views.
    fn instance(&self) -> Option<String> {
        None
    }

    /// Whether the view should start floating: dialogs, fixed-size windows and the like.
    fn wants_floating(&self) -> bool {
        false
    }

    /// Whether this view is a transient (a dialog, a popup window) of `ancestor`.
    fn is_transient_for(&self, ancestor: &Self) -> bool {
        let _ = ancestor;
        false
    }
}

/// Tree-side state of a view.
#[derive(Debug)]
pub struct ViewState<W> {
    pub(crate) view: W,
    pub(crate) container: Option<ContainerId>,
    /// Size the client would like to have.
    pub(crate) natural_size: Size<f64, Logical>,
    pub(crate) urgent_at: Option<Instant>,
    pub(crate) using_csd: bool,
    /// Border to restore when the client stops drawing its own decorations.
    pub(crate) saved_border: BorderStyle,
    /// Content box last sent to the client.
    pub(crate) last_configure: Option<Rectangle<f64, Logical>>,
    pub(crate) configure_serial: Option<u32>,
}

impl<W> ViewState<W> {
    pub fn view(&self) -> &W {
        &self.view
    }

    pub fn container(&self) -> Option<ContainerId> {
        self.container
    }

    pub fn is_urgent(&self) -> bool {
        self.urgent_at.is_some()
    }

    pub fn configure_serial(&self) -> Option<u32> {
        self.configure_serial
    }
}

const PLACEHOLDERS: [&str; 5] = ["%title", "%app_id", "%class", "%instance", "%shell"];

/// Expands the title format placeholders for a view.
fn format_title<W: View>(format: &str, view: &W) -> Option<String> {
    let title = view.title();
    if format == "%title" {
        return title;
    }

    let mut rv = String::new();
    let mut rest = format;
    while let Some(idx) = rest.find('%') {
        rv.push_str(&rest[..idx]);
        rest = &rest[idx..];

        match PLACEHOLDERS.iter().find(|name| rest.starts_with(**name)) {
            Some(&name) => {
                let value = match name {
                    "%title" => title.clone(),
                    "%app_id" => view.app_id(),
                    "%class" => view.class(),
                    "%instance" => view.instance(),
                    _ => Some(view.kind().name().to_owned()),
                };
                if let Some(value) = value {
                    rv.push_str(&value);
                }
                rest = &rest[name.len()..];
            }
            None => {
                rv.push('%');
                rest = &rest[1..];
            }
        }
    }
    rv.push_str(rest);

    (!rv.is_empty()).then_some(rv)
}

impl<W: View> Root<W> {
    /// Starts tracking a new client surface. It's not in the tree until mapped.
    pub fn add_view(&mut self, view: W) -> ViewId {
        let border = self.options.border.style;
        self.views.insert(ViewState {
            view,
            container: None,
            natural_size: Size::default(),
            urgent_at: None,
            using_csd: false,
            saved_border: border,
            last_configure: None,
            configure_serial: None,
        })
    }

    /// Stops tracking a client surface. Refuses views that are still mapped.
    pub fn remove_view(&mut self, view: ViewId) -> Option<W> {
        let state = self.views.get(view)?;
        if let Some(con) = state.container {
            if self.containers.get(con).is_some_and(|c| !c.destroying) {
                warn!("tried to remove view {view:?} which is still mapped");
                return None;
            }
            if let Some(c) = self.containers.get_mut(con) {
                c.view = None;
            }
        }

        self.views.remove(view).map(|state| state.view)
    }

    pub fn view_state(&self, view: ViewId) -> Option<&ViewState<W>> {
        self.views.get(view)
    }

    /// Puts a view into the tree.
    ///
    /// The view goes floating if it asks for it, otherwise next to the tiling container the seat
    /// focused last, otherwise at the root of the focused workspace.
    pub fn map_view(&mut self, view: ViewId, fullscreen: bool) -> Option<ContainerId> {
        let _span = tracy_client::span!("Root::map_view");

        let state = self.views.get(view)?;
        if state.container.is_some() {
            warn!("tried to map view {view:?} which is already mapped");
            return None;
        }
        let wants_floating = state.view.wants_floating();

        let seat = self.default_seat;
        let Some(ws) = self
            .seat_get_focused_workspace(seat)
            .or_else(|| self.output_order.first().and_then(|o| self.outputs[*o].active_workspace))
        else {
            warn!("no workspace to map view {view:?} on");
            return None;
        };

        let con = self.create_container(Some(view))?;

        let target_sibling = match self.seat_get_focus_inactive(seat, NodeId::Workspace(ws)) {
            Some(NodeId::Container(focus)) if self.is_floating_or_child(focus) => {
                self.seat_get_focus_inactive_tiling(seat, ws).map(|tiling| {
                    match self.seat_get_focus_inactive(seat, NodeId::Container(tiling)) {
                        Some(NodeId::Container(leaf)) => leaf,
                        _ => tiling,
                    }
                })
            }
            Some(NodeId::Container(focus)) => Some(focus),
            _ => None,
        };

        if wants_floating {
            let border = self.options.floating_border;
            let c = &mut self.containers[con].pending;
            c.border = border.style;
            c.border_thickness = border.width.0;
        }
        if self.views[view].using_csd {
            let c = &mut self.containers[con].pending;
            self.views[view].saved_border = c.border;
            c.border = BorderStyle::Csd;
        }

        if wants_floating {
            self.workspace_add_floating(ws, con);
            self.views[view].view.set_tiled(false);
            self.container_floating_resize_and_center(con);
        } else {
            match target_sibling {
                Some(sibling) => self.container_add_sibling(sibling, con, true),
                None => self.workspace_add_tiling(ws, con),
            }
            self.views[view].view.set_tiled(true);
        }

        // A dialog of the fullscreen window is allowed to show up over it.
        let ws_fullscreen = self.workspaces[ws].pending.fullscreen;
        let transient_for_fullscreen = ws_fullscreen.is_some_and(|fs| self.is_transient_for(con, fs));

        self.view_update_title(view, true);
        self.container_update_representation(con);

        if fullscreen {
            self.container_set_fullscreen(con, FullscreenMode::Workspace);
        }

        let set_focus = match self.containers[con].pending.fullscreen_mode {
            FullscreenMode::Global => true,
            FullscreenMode::Workspace => false,
            FullscreenMode::None => {
                let global = self.fullscreen_global;
                global.is_none() && (ws_fullscreen.is_none() || transient_for_fullscreen)
            }
        };
        if set_focus {
            self.seat_set_focus(seat, Some(NodeId::Container(con)));
        }

        debug!("mapped view {view:?} into container {con:?}");
        Some(con)
    }

    /// Takes a view out of the tree, destroying its container and any parents left empty.
    pub fn unmap_view(&mut self, view: ViewId) {
        let _span = tracy_client::span!("Root::unmap_view");

        let Some(con) = self.views.get(view).and_then(|v| v.container) else {
            return;
        };

        let c = &self.containers[con];
        let parent = c.pending.parent;
        let ws = c.pending.workspace;

        self.begin_destroy_container(con);
        self.containers[con].view = None;

        let state = &mut self.views[view];
        state.container = None;
        state.urgent_at = None;
        state.last_configure = None;

        if let Some(parent) = parent {
            self.container_reap_empty(parent);
        } else if let Some(ws) = ws {
            self.workspace_consider_destroy(ws);
        }

        if let Some(ws) = ws.filter(|ws| self.workspaces.contains_key(*ws)) {
            self.workspace_detect_urgent(ws);
        }

        debug!("unmapped view {view:?}");
    }

    /// Whether the view of `con` is a transient of the view of `ancestor`.
    pub fn is_transient_for(&self, con: ContainerId, ancestor: ContainerId) -> bool {
        let view = |con: ContainerId| {
            self.containers
                .get(con)
                .and_then(|c| c.view)
                .and_then(|v| self.views.get(v))
        };
        match (view(con), view(ancestor)) {
            (Some(a), Some(b)) => a.view.is_transient_for(&b.view),
            _ => false,
        }
    }

    pub fn view_set_urgent(&mut self, view: ViewId, urgent: bool) {
        let Some(state) = self.views.get(view) else {
            return;
        };
        if state.urgent_at.is_some() == urgent {
            return;
        }

        let con = state.container;
        if urgent {
            let focus = self.seat_get_focused_container(self.default_seat);
            if con.is_some() && focus == con {
                return;
            }
            self.views[view].urgent_at = Some(Instant::now());
        } else {
            self.views[view].urgent_at = None;
        }

        if let Some(con) = con {
            self.container_update_urgent(con);
            self.node_set_dirty(NodeId::Container(con));
            if let Some(ws) = self.containers[con].pending.workspace {
                self.workspace_detect_urgent(ws);
            }
        }
    }

    /// Rebuilds the title of the view's container. Without `force`, only if the title changed.
    pub fn view_update_title(&mut self, view: ViewId, force: bool) {
        let Some(state) = self.views.get(view) else {
            return;
        };
        let Some(con) = state.container else {
            return;
        };

        let title = state.view.title();
        if !force && self.containers[con].title == title {
            return;
        }

        let formatted = format_title(&self.options.title_format, &state.view);
        let c = &mut self.containers[con];
        c.title = title;
        c.formatted_title = formatted;
        self.node_set_dirty(NodeId::Container(con));
    }

    /// Switches a view between client-side and server-side decorations.
    pub fn view_set_csd(&mut self, view: ViewId, csd: bool) {
        let Some(state) = self.views.get_mut(view) else {
            return;
        };
        state.using_csd = csd;

        let Some(con) = state.container else {
            return;
        };
        let c = &mut self.containers[con].pending;
        if !csd && c.border == BorderStyle::Csd {
            c.border = state.saved_border;
        } else if csd && c.border != BorderStyle::Csd {
            state.saved_border = c.border;
            c.border = BorderStyle::Csd;
        } else {
            return;
        }

        if self.is_floating(con) {
            self.container_set_geometry_from_content(con);
        }
        self.node_set_dirty(NodeId::Container(con));
    }

    pub fn view_set_natural_size(&mut self, view: ViewId, size: Size<f64, Logical>) {
        if let Some(state) = self.views.get_mut(view) {
            state.natural_size = size;
        }
    }

    /// Sends the content box to the client if it differs from the last one sent.
    pub(crate) fn view_configure(&mut self, view: ViewId, content: Rectangle<f64, Logical>) {
        let Some(state) = self.views.get_mut(view) else {
            return;
        };
        if state.last_configure == Some(content) {
            return;
        }

        let serial = state.view.configure(content);
        trace!("configured view {view:?} to {content:?}, serial {serial}");
        state.last_configure = Some(content);
        state.configure_serial = Some(serial);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Titled {
        title: Option<&'static str>,
        app_id: Option<&'static str>,
    }

    impl View for Titled {
        fn kind(&self) -> ViewKind {
            ViewKind::XdgShell
        }
        fn configure(&mut self, _geometry: Rectangle<f64, Logical>) -> u32 {
            0
        }
        fn constraints(&self) -> ViewConstraints {
            ViewConstraints::default()
        }
        fn set_activated(&mut self, _activated: bool) {}
        fn set_tiled(&mut self, _tiled: bool) {}
        fn set_fullscreen(&mut self, _fullscreen: bool) {}
        fn set_resizing(&mut self, _resizing: bool) {}
        fn close(&mut self) {}
        fn title(&self) -> Option<String> {
            self.title.map(String::from)
        }
        fn app_id(&self) -> Option<String> {
            self.app_id.map(String::from)
        }
    }

    #[test]
    fn title_format_placeholders() {
        let view = Titled {
            title: Some("~/src"),
            app_id: Some("foot"),
        };

        assert_eq!(format_title("%title", &view).as_deref(), Some("~/src"));
        assert_eq!(
            format_title("%app_id: %title (%shell)", &view).as_deref(),
            Some("foot: ~/src (xdg_shell)")
        );
        assert_eq!(format_title("[%class]", &view).as_deref(), Some("[]"));
        assert_eq!(format_title("100% %bogus", &view).as_deref(), Some("100% %bogus"));
    }

    #[test]
    fn missing_title_formats_to_none() {
        let view = Titled {
            title: None,
            app_id: None,
        };
        assert_eq!(format_title("%title", &view), None);
        assert_eq!(format_title("%title%app_id", &view), None);
    }

    #[test]
    fn constraints_clamp() {
        let constraints = ViewConstraints {
            min_width: 100.,
            max_width: 500.,
            ..Default::default()
        };
        assert_eq!(
            constraints.clamp(Size::from((50., 2000.))),
            Size::from((100., 2000.))
        );
        assert_eq!(
            constraints.clamp(Size::from((800., 20.))),
            Size::from((500., 20.))
        );
    }
}
