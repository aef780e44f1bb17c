use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use insta::assert_snapshot;
use proptest::prelude::*;
use proptest_derive::Arbitrary;
use smithay::utils::{Logical, Point, Rectangle, Size};
use tracing_subscriber::EnvFilter;
use trellis_config::{FloatOrInt, Gaps};
use trellis_ipc::{BorderStyle, FullscreenMode, LayoutMode};

use super::decoration::Edge;
use super::output::{Anchor, Layer, LayerSurface};
use super::scene::HeadlessScene;
use super::view::{View, ViewConstraints, ViewKind};
use super::*;


fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trellis=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn rect(x: f64, y: f64, w: f64, h: f64) -> Rectangle<f64, Logical> {
    Rectangle::new(Point::from((x, y)), Size::from((w, h)))
}

#[derive(Debug)]
struct TestViewInner {
    id: usize,
    floating: bool,
    transient_for: Option<usize>,
    title: RefCell<Option<String>>,
    constraints: ViewConstraints,
    activated: Cell<bool>,
    tiled: Cell<bool>,
    fullscreen: Cell<bool>,
    closed: Cell<bool>,
    configures: RefCell<Vec<Rectangle<f64, Logical>>>,
}

#[derive(Debug, Clone)]
struct TestView(Rc<TestViewInner>);

#[derive(Debug, Clone, Copy, Arbitrary)]
struct TestViewParams {
    #[proptest(strategy = "1..=5usize")]
    id: usize,
    floating: bool,
    fullscreen: bool,
    #[proptest(strategy = "prop::option::of(1..=5usize)")]
    transient_for: Option<usize>,
    #[proptest(strategy = "arbitrary_size()")]
    natural_size: Size<f64, Logical>,
}

impl TestViewParams {
    fn new(id: usize) -> Self {
        Self {
            id,
            floating: false,
            fullscreen: false,
            transient_for: None,
            natural_size: Size::from((400., 300.)),
        }
    }

    fn floating(mut self) -> Self {
        self.floating = true;
        self
    }

    fn transient_for(mut self, id: usize) -> Self {
        self.transient_for = Some(id);
        self
    }

    fn natural_size(mut self, w: f64, h: f64) -> Self {
        self.natural_size = Size::from((w, h));
        self
    }
}

impl TestView {
    fn new(params: TestViewParams) -> Self {
        Self(Rc::new(TestViewInner {
            id: params.id,
            floating: params.floating,
            transient_for: params.transient_for,
            title: RefCell::new(Some(format!("Window {}", params.id))),
            constraints: ViewConstraints::default(),
            activated: Cell::new(false),
            tiled: Cell::new(false),
            fullscreen: Cell::new(false),
            closed: Cell::new(false),
            configures: RefCell::new(Vec::new()),
        }))
    }

    fn configure_count(&self) -> usize {
        self.0.configures.borrow().len()
    }

    fn last_configure(&self) -> Option<Rectangle<f64, Logical>> {
        self.0.configures.borrow().last().copied()
    }
}

impl View for TestView {
    fn kind(&self) -> ViewKind {
        ViewKind::XdgShell
    }

    fn configure(&mut self, geometry: Rectangle<f64, Logical>) -> u32 {
        let mut configures = self.0.configures.borrow_mut();
        configures.push(geometry);
        configures.len() as u32
    }

    fn constraints(&self) -> ViewConstraints {
        self.0.constraints
    }

    fn set_activated(&mut self, activated: bool) {
        self.0.activated.set(activated);
    }

    fn set_tiled(&mut self, tiled: bool) {
        self.0.tiled.set(tiled);
    }

    fn set_fullscreen(&mut self, fullscreen: bool) {
        self.0.fullscreen.set(fullscreen);
    }

    fn set_resizing(&mut self, _resizing: bool) {}

    fn close(&mut self) {
        self.0.closed.set(true);
    }

    fn title(&self) -> Option<String> {
        self.0.title.borrow().clone()
    }

    fn app_id(&self) -> Option<String> {
        Some(format!("app{}", self.0.id))
    }

    fn wants_floating(&self) -> bool {
        self.0.floating
    }

    fn is_transient_for(&self, ancestor: &Self) -> bool {
        self.0.transient_for == Some(ancestor.0.id)
    }
}

/// Root with a headless scene and views addressed by small numbers.
struct TestLayout {
    root: Root<TestView>,
    scene: HeadlessScene,
    views: HashMap<usize, (ViewId, TestView)>,
}

impl TestLayout {
    fn new() -> Self {
        Self::with_options(Options::default())
    }

    fn with_options(options: Options) -> Self {
        init_logging();

        let scene = HeadlessScene::new();
        let root = Root::new(Box::new(scene.clone()), options).unwrap();
        Self {
            root,
            scene,
            views: HashMap::new(),
        }
    }

    fn output_geometry(id: usize) -> Rectangle<f64, Logical> {
        match id {
            1 => rect(0., 0., 1920., 1080.),
            2 => rect(1920., 0., 1280., 720.),
            _ => rect(3200., 0., 2560., 1440.),
        }
    }

    fn add_output(&mut self, id: usize) -> Option<OutputId> {
        let name = format!("output{id}");
        if self.root.find_output(&name).is_some() {
            return None;
        }
        self.root.add_output(name, Self::output_geometry(id))
    }

    fn output(&self, id: usize) -> OutputId {
        self.root.find_output(&format!("output{id}")).unwrap()
    }

    fn add_view(&mut self, params: TestViewParams) -> Option<ContainerId> {
        if self.views.contains_key(&params.id) {
            return None;
        }

        let view = TestView::new(params);
        let id = self.root.add_view(view.clone());
        self.root.view_set_natural_size(id, params.natural_size);

        let Some(con) = self.root.map_view(id, params.fullscreen) else {
            self.root.remove_view(id);
            return None;
        };
        self.views.insert(params.id, (id, view));
        Some(con)
    }

    fn unmap(&mut self, id: usize) {
        let Some((view, _)) = self.views.remove(&id) else {
            return;
        };
        self.root.unmap_view(view);
        self.root.remove_view(view);
    }

    fn view_id(&self, id: usize) -> Option<ViewId> {
        self.views.get(&id).map(|(view, _)| *view)
    }

    fn test_view(&self, id: usize) -> &TestView {
        &self.views[&id].1
    }

    fn container_of(&self, id: usize) -> Option<ContainerId> {
        let view = self.view_id(id)?;
        self.root.view_state(view)?.container()
    }

    fn con(&self, id: usize) -> &container::Container {
        self.root.container(self.container_of(id).unwrap()).unwrap()
    }

    fn ws(&self, name: &str) -> WorkspaceId {
        self.root.find_workspace(name).unwrap()
    }

    fn focus(&mut self, node: NodeId) {
        let seat = self.root.default_seat();
        self.root.seat_set_focus(seat, Some(node));
    }

    fn focus_view(&mut self, id: usize) {
        if let Some(con) = self.container_of(id) {
            self.focus(NodeId::Container(con));
        }
    }

    fn focused(&self) -> Option<NodeId> {
        self.root.seat_get_focus(self.root.default_seat())
    }

    fn commit(&mut self) {
        self.root.commit_dirty();
    }

    fn tree(&self) -> String {
        self.root.debug_tree()
    }

    fn verify_invariants(&self) {
        self.root.verify_invariants();
    }

    /// Workspace of the given name, created on the first output if it doesn't exist yet.
    fn find_or_create_workspace(&mut self, name: usize) -> Option<WorkspaceId> {
        let name = name.to_string();
        if let Some(ws) = self.root.find_workspace(&name) {
            return Some(ws);
        }
        let output = self.root.outputs().next()?;
        self.root.create_workspace(Some(output), &name)
    }
}

fn arbitrary_size() -> impl Strategy<Value = Size<f64, Logical>> {
    (0..=2000u16, 0..=1500u16).prop_map(|(w, h)| Size::from((f64::from(w), f64::from(h))))
}

fn arbitrary_layout_mode() -> impl Strategy<Value = LayoutMode> {
    prop_oneof![
        Just(LayoutMode::None),
        Just(LayoutMode::Horizontal),
        Just(LayoutMode::OneTwo),
        Just(LayoutMode::TwoOne),
        Just(LayoutMode::Grid),
    ]
}

fn arbitrary_border_style() -> impl Strategy<Value = BorderStyle> {
    prop_oneof![
        Just(BorderStyle::None),
        Just(BorderStyle::Normal),
        Just(BorderStyle::Pixel),
        Just(BorderStyle::Csd),
    ]
}

fn arbitrary_fullscreen_mode() -> impl Strategy<Value = FullscreenMode> {
    prop_oneof![
        Just(FullscreenMode::None),
        Just(FullscreenMode::Workspace),
        Just(FullscreenMode::Global),
    ]
}

fn arbitrary_anchor() -> impl Strategy<Value = Anchor> {
    (0..16u32).prop_map(Anchor::from_bits_truncate)
}

fn arbitrary_layer() -> impl Strategy<Value = Layer> {
    prop_oneof![
        Just(Layer::Background),
        Just(Layer::Bottom),
        Just(Layer::Top),
        Just(Layer::Overlay),
    ]
}

#[derive(Debug, Clone, Arbitrary)]
enum Op {
    AddOutput(#[proptest(strategy = "1..=3usize")] usize),
    RemoveOutput(#[proptest(strategy = "1..=3usize")] usize),
    SetOutputSize {
        #[proptest(strategy = "1..=3usize")]
        id: usize,
        #[proptest(strategy = "arbitrary_size()")]
        size: Size<f64, Logical>,
    },
    SetLayerSurface {
        #[proptest(strategy = "1..=3usize")]
        id: usize,
        #[proptest(strategy = "arbitrary_layer()")]
        layer: Layer,
        #[proptest(strategy = "arbitrary_anchor()")]
        anchor: Anchor,
        #[proptest(strategy = "-10..=200i32")]
        exclusive_zone: i32,
        #[proptest(strategy = "arbitrary_size()")]
        size: Size<f64, Logical>,
    },
    AddView {
        params: TestViewParams,
    },
    UnmapView(#[proptest(strategy = "1..=5usize")] usize),
    FocusView(#[proptest(strategy = "1..=5usize")] usize),
    SetTitle {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "prop::option::of(\"[a-z]{0,8}\")")]
        title: Option<String>,
    },
    SetUrgent {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        urgent: bool,
    },
    SetCsd {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        csd: bool,
    },
    SetFullscreen {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "arbitrary_fullscreen_mode()")]
        mode: FullscreenMode,
    },
    ToggleFloating(#[proptest(strategy = "1..=5usize")] usize),
    SetSticky {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        sticky: bool,
    },
    MoveFloating {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "-500..=6000i32")]
        x: i32,
        #[proptest(strategy = "-500..=2000i32")]
        y: i32,
    },
    Split {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "arbitrary_layout_mode()")]
        layout: LayoutMode,
    },
    SplitParent {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "arbitrary_layout_mode()")]
        layout: LayoutMode,
    },
    SetLayout {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "arbitrary_layout_mode()")]
        layout: LayoutMode,
    },
    SetBorder {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "arbitrary_border_style()")]
        style: BorderStyle,
        #[proptest(strategy = "prop::option::of(0..=10u8)")]
        thickness: Option<u8>,
    },
    MoveToWorkspace {
        #[proptest(strategy = "1..=5usize")]
        id: usize,
        #[proptest(strategy = "1..=3usize")]
        ws_name: usize,
    },
    FocusWorkspace(#[proptest(strategy = "1..=3usize")] usize),
    MoveWorkspaceToOutput {
        #[proptest(strategy = "1..=3usize")]
        ws_name: usize,
        #[proptest(strategy = "1..=3usize")]
        output_id: usize,
    },
    ScratchpadAdd(#[proptest(strategy = "1..=5usize")] usize),
    ScratchpadToggle(#[proptest(strategy = "1..=5usize")] usize),
    ScratchpadToggleAuto,
    Commit,
}

impl Op {
    fn apply(self, layout: &mut TestLayout) {
        match self {
            Op::AddOutput(id) => {
                layout.add_output(id);
            }
            Op::RemoveOutput(id) => {
                let Some(output) = layout.root.find_output(&format!("output{id}")) else {
                    return;
                };
                layout.root.remove_output(output);
            }
            Op::SetOutputSize { id, size } => {
                let Some(output) = layout.root.find_output(&format!("output{id}")) else {
                    return;
                };
                let loc = TestLayout::output_geometry(id).loc;
                layout
                    .root
                    .set_output_geometry(output, Rectangle::new(loc, size));
            }
            Op::SetLayerSurface {
                id,
                layer,
                anchor,
                exclusive_zone,
                size,
            } => {
                let Some(output) = layout.root.find_output(&format!("output{id}")) else {
                    return;
                };
                let surface = LayerSurface::new(layer, anchor, exclusive_zone, size);
                layout.root.set_layer_surfaces(output, vec![surface]);
            }
            Op::AddView { params } => {
                if let Some(parent) = params.transient_for {
                    if !layout.views.contains_key(&parent) {
                        return;
                    }
                }
                layout.add_view(params);
            }
            Op::UnmapView(id) => layout.unmap(id),
            Op::FocusView(id) => layout.focus_view(id),
            Op::SetTitle { id, title } => {
                let Some((view, test_view)) = layout.views.get(&id) else {
                    return;
                };
                *test_view.0.title.borrow_mut() = title;
                let view = *view;
                layout.root.view_update_title(view, false);
            }
            Op::SetUrgent { id, urgent } => {
                let Some(view) = layout.view_id(id) else {
                    return;
                };
                layout.root.view_set_urgent(view, urgent);
            }
            Op::SetCsd { id, csd } => {
                let Some(view) = layout.view_id(id) else {
                    return;
                };
                layout.root.view_set_csd(view, csd);
            }
            Op::SetFullscreen { id, mode } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                layout.root.container_set_fullscreen(con, mode);
            }
            Op::ToggleFloating(id) => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                let floating = layout.root.is_floating(con);
                layout.root.container_set_floating(con, !floating);
            }
            Op::SetSticky { id, sticky } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                layout.root.container_set_sticky(con, sticky);
            }
            Op::MoveFloating { id, x, y } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                if !layout.root.is_floating(con) || layout.root.is_scratchpad_hidden(con) {
                    return;
                }
                layout
                    .root
                    .container_floating_move_to(con, f64::from(x), f64::from(y));
            }
            Op::Split { id, layout: mode } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                layout.root.container_split(con, mode);
            }
            Op::SplitParent { id, layout: mode } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                let Some(parent) = layout.root.container(con).and_then(|c| c.pending().parent)
                else {
                    return;
                };
                layout.root.container_split(parent, mode);
            }
            Op::SetLayout { id, layout: mode } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                layout.root.container_set_layout(con, mode);
            }
            Op::SetBorder {
                id,
                style,
                thickness,
            } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                layout
                    .root
                    .container_set_border(con, style, thickness.map(f64::from));
            }
            Op::MoveToWorkspace { id, ws_name } => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                let Some(ws) = layout.find_or_create_workspace(ws_name) else {
                    return;
                };
                layout.root.move_container_to_workspace(con, ws);
            }
            Op::FocusWorkspace(ws_name) => {
                let Some(ws) = layout.find_or_create_workspace(ws_name) else {
                    return;
                };
                layout.focus(NodeId::Workspace(ws));
            }
            Op::MoveWorkspaceToOutput { ws_name, output_id } => {
                let Some(ws) = layout.root.find_workspace(&ws_name.to_string()) else {
                    return;
                };
                let Some(output) = layout.root.find_output(&format!("output{output_id}")) else {
                    return;
                };
                layout.root.move_workspace_to_output(ws, output);
            }
            Op::ScratchpadAdd(id) => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                layout.root.scratchpad_add(con);
            }
            Op::ScratchpadToggle(id) => {
                let Some(con) = layout.container_of(id) else {
                    return;
                };
                let con = layout.root.toplevel_ancestor(con);
                if layout.root.container(con).is_some_and(|c| c.is_scratchpad()) {
                    layout.root.scratchpad_toggle(con);
                }
            }
            Op::ScratchpadToggleAuto => layout.root.scratchpad_toggle_auto(),
            Op::Commit => layout.commit(),
        }
    }
}

#[track_caller]
fn check_ops_on_layout(layout: &mut TestLayout, ops: impl IntoIterator<Item = Op>) {
    for op in ops {
        op.apply(layout);
        layout.verify_invariants();
    }
}

#[track_caller]
fn check_ops(ops: impl IntoIterator<Item = Op>) -> TestLayout {
    let mut layout = TestLayout::new();
    check_ops_on_layout(&mut layout, ops);
    layout
}

/// One output with views 1 and 2 mapped side by side.
fn two_views() -> TestLayout {
    let mut layout = check_ops([
        Op::AddOutput(1),
        Op::AddView {
            params: TestViewParams::new(1),
        },
        Op::AddView {
            params: TestViewParams::new(2),
        },
    ]);
    layout.commit();
    layout
}

#[test]
fn no_outputs_no_workspaces() {
    let layout = TestLayout::new();
    assert_snapshot!(layout.tree(), @"(empty)");
    layout.verify_invariants();
}

#[test]
fn view_without_output_is_not_mapped() {
    let mut layout = TestLayout::new();
    assert!(layout.add_view(TestViewParams::new(1)).is_none());
    assert!(layout.views.is_empty());
    layout.verify_invariants();
}

#[test]
fn two_views_side_by_side() {
    let layout = two_views();

    assert_snapshot!(
        layout.tree(),
        @"
    Output output1
      Workspace 1 (active)
        View app1
        View app2 *
    "
    );

    let ws = layout.root.workspace(layout.ws("1")).unwrap();
    assert_eq!(ws.representation(), Some("V[app1 app2]"));

    let con1 = layout.con(1).current();
    assert_eq!(con1.geometry, rect(8., 8., 948., 1064.));
    assert_eq!(con1.content, rect(10., 30., 944., 1040.));
    assert_eq!(con1.title_bar, Some(rect(8., 8., 948., 20.)));
    assert_eq!(layout.con(2).current().geometry, rect(964., 8., 948., 1064.));

    assert_eq!(
        layout.test_view(1).last_configure(),
        Some(rect(10., 30., 944., 1040.))
    );
    assert!(layout.test_view(2).0.activated.get());
    assert!(!layout.test_view(1).0.activated.get());
    assert!(layout.test_view(1).0.tiled.get());
}

#[test]
fn pending_state_stays_pending_until_commit() {
    let mut layout = TestLayout::new();
    layout.add_output(1);
    layout.add_view(TestViewParams::new(1));

    assert!(layout.root.has_dirty());
    assert_eq!(layout.con(1).current().geometry, Rectangle::default());

    layout.commit();
    assert!(!layout.root.has_dirty());
    assert_eq!(layout.con(1).current().geometry, rect(8., 8., 1904., 1064.));
}

#[test]
fn split_into_stacked_container() {
    let mut layout = two_views();
    let con2 = layout.container_of(2).unwrap();
    let split = layout.root.container_split(con2, LayoutMode::None).unwrap();
    layout.verify_invariants();
    assert_eq!(layout.focused(), Some(NodeId::Container(con2)));

    layout.add_view(TestViewParams::new(3));
    layout.verify_invariants();

    assert_snapshot!(
        layout.tree(),
        @"
    Output output1
      Workspace 1 (active)
        View app1
        D[app2 app3]
          View app2
          View app3 *
    "
    );
    let ws = layout.root.workspace(layout.ws("1")).unwrap();
    assert_eq!(ws.representation(), Some("V[app1 D[app2 app3]]"));

    layout.commit();

    let split = layout.root.container(split).unwrap().current();
    assert_eq!(split.geometry, rect(964., 8., 948., 1064.));

    let con2 = layout.con(2).current();
    let con3 = layout.con(3).current();
    assert_eq!(con2.geometry, rect(964., 48., 948., 1024.));
    assert_eq!(con3.geometry, rect(964., 48., 948., 1024.));
    assert_eq!(con2.title_bar, Some(rect(964., 8., 948., 20.)));
    assert_eq!(con3.title_bar, Some(rect(964., 28., 948., 20.)));
    assert_eq!(con3.content, rect(966., 50., 944., 1020.));

    // Only the focused child of a stacked container shows its content.
    let scene2 = layout.con(2).scene();
    let scene3 = layout.con(3).scene();
    assert!(!layout.scene.is_enabled(scene2.content));
    assert!(layout.scene.is_visible(scene2.title_bar.tree));
    assert!(layout.scene.is_visible(scene3.content));
}

#[test]
fn unmapping_reaps_empty_parents() {
    let mut layout = two_views();
    let con2 = layout.container_of(2).unwrap();
    let split = layout.root.container_split(con2, LayoutMode::None).unwrap();
    layout.add_view(TestViewParams::new(3));
    layout.commit();

    let con3 = layout.container_of(3).unwrap();
    check_ops_on_layout(&mut layout, [Op::UnmapView(2), Op::UnmapView(3)]);

    assert_snapshot!(
        layout.tree(),
        @"
    Output output1
      Workspace 1 (active)
        View app1 *
    "
    );

    // Destroyed containers stay around until a transaction lets go of them.
    assert!(layout.root.container(split).is_some_and(|c| c.is_destroying()));
    layout.commit();
    assert!(layout.root.container(split).is_none());
    assert!(layout.root.container(con2).is_none());
    assert!(layout.root.container(con3).is_none());
    layout.verify_invariants();
}

#[test]
fn destroy_waits_for_transaction() {
    let mut layout = two_views();
    let con2 = layout.container_of(2).unwrap();
    layout.unmap(2);

    let transaction = Transaction::new(&mut layout.root);
    layout.root.destroy_container(con2);
    assert!(layout.root.container(con2).is_some());

    transaction.apply(&mut layout.root);
    assert!(layout.root.container(con2).is_none());
    layout.verify_invariants();
}

#[test]
fn remove_mapped_view_is_refused() {
    let mut layout = two_views();
    let view = layout.view_id(1).unwrap();
    assert!(layout.root.remove_view(view).is_none());
    assert!(layout.root.view_state(view).is_some());
}

#[test]
fn empty_workspace_destroyed_on_focus_change() {
    let mut layout = TestLayout::new();
    layout.add_output(1);
    layout.add_view(TestViewParams::new(1));

    let output = layout.output(1);
    let ws1 = layout.ws("1");
    let ws2 = layout.root.create_workspace(Some(output), "2").unwrap();

    layout.focus(NodeId::Workspace(ws2));
    assert_eq!(
        layout.root.output(output).unwrap().active_workspace(),
        Some(ws2)
    );

    layout.focus(NodeId::Workspace(ws1));
    layout.verify_invariants();
    assert!(layout.root.find_workspace("2").is_none());

    assert_snapshot!(
        layout.tree(),
        @"
    Output output1
      Workspace 1 (active) *
        View app1
    "
    );

    layout.commit();
    assert!(layout.root.workspace(ws2).is_none());
}

#[test]
fn workspace_is_restamped_on_whole_subtree() {
    let mut layout = TestLayout::new();
    let output = layout.add_output(1).unwrap();
    let ws1 = layout.ws("1");
    let ws2 = layout.root.create_workspace(Some(output), "2").unwrap();

    let root = &mut layout.root;
    let a = root.create_container(None).unwrap();
    let b = root.create_container(None).unwrap();
    let view = root.add_view(TestView::new(TestViewParams::new(1)));
    let c = root.create_container(Some(view)).unwrap();
    root.container_add_child(b, c);
    root.container_add_child(a, b);

    root.workspace_add_tiling(ws1, a);
    for con in [a, b, c] {
        assert_eq!(root.container(con).unwrap().pending().workspace, Some(ws1));
    }

    root.move_container_to_workspace(a, ws2);
    for con in [a, b, c] {
        assert_eq!(root.container(con).unwrap().pending().workspace, Some(ws2));
    }
    layout.verify_invariants();
}

#[test]
fn representation_length_matches_buffer() {
    let mut layout = two_views();
    let con2 = layout.container_of(2).unwrap();
    layout.root.container_split(con2, LayoutMode::Grid);
    layout.add_view(TestViewParams::new(3));

    let ws = layout.root.workspace(layout.ws("1")).unwrap();
    let children = ws.pending().tiling.to_vec();

    let len = layout
        .root
        .build_representation(LayoutMode::Horizontal, &children, None);
    let mut buf = String::new();
    let written =
        layout
            .root
            .build_representation(LayoutMode::Horizontal, &children, Some(&mut buf));

    assert_eq!(buf, "V[app1 S[app2 app3]]");
    assert_eq!(len, buf.len());
    assert_eq!(written, len);

    let mut again = String::new();
    layout
        .root
        .build_representation(LayoutMode::Horizontal, &children, Some(&mut again));
    assert_eq!(again, buf);
}

#[test]
fn title_updates_follow_the_view() {
    let mut layout = two_views();
    assert_eq!(layout.con(1).title(), Some("Window 1"));

    *layout.test_view(1).0.title.borrow_mut() = Some(String::from("editor"));
    let view = layout.view_id(1).unwrap();
    layout.root.view_update_title(view, false);
    assert_eq!(layout.con(1).title(), Some("editor"));
    assert_eq!(layout.con(1).formatted_title(), Some("editor"));
}

#[test]
fn urgency_is_ignored_for_focused_view() {
    let mut layout = two_views();
    let view1 = layout.view_id(1).unwrap();
    let view2 = layout.view_id(2).unwrap();

    layout.root.view_set_urgent(view2, true);
    assert!(!layout.root.view_state(view2).unwrap().is_urgent());

    layout.root.view_set_urgent(view1, true);
    assert!(layout.root.view_state(view1).unwrap().is_urgent());
    assert!(layout.root.workspace(layout.ws("1")).unwrap().is_urgent());

    // Focusing the view clears its urgency.
    layout.focus_view(1);
    assert!(!layout.root.view_state(view1).unwrap().is_urgent());
    assert!(!layout.root.workspace(layout.ws("1")).unwrap().is_urgent());
}

#[test]
fn decoration_colors_follow_focus() {
    let layout = two_views();
    let colors = layout.root.options().colors;

    let con1 = layout.container_of(1).unwrap();
    let con2 = layout.container_of(2).unwrap();
    assert_eq!(layout.root.get_colors(con2), colors.focused);
    assert_eq!(layout.root.get_colors(con1), colors.unfocused);

    assert_eq!(layout.root.indicator_edge(con1), None);
}

#[test]
fn lone_child_shows_indicator() {
    let mut layout = TestLayout::new();
    layout.add_output(1);
    layout.add_view(TestViewParams::new(1));
    layout.commit();

    let con = layout.container_of(1).unwrap();
    assert_eq!(layout.root.indicator_edge(con), Some(Edge::Right));
}

#[test]
fn csd_swaps_border() {
    let mut layout = two_views();
    let view = layout.view_id(1).unwrap();

    layout.root.view_set_csd(view, true);
    assert_eq!(layout.con(1).pending().border, BorderStyle::Csd);

    layout.root.view_set_csd(view, false);
    assert_eq!(layout.con(1).pending().border, BorderStyle::Normal);
    layout.verify_invariants();
}

#[test]
fn close_asks_the_client() {
    let mut layout = two_views();
    let con = layout.container_of(1).unwrap();
    layout.root.close_container(con);
    assert!(layout.test_view(1).0.closed.get());
    assert!(!layout.test_view(2).0.closed.get());
}

#[test]
fn configure_is_not_repeated() {
    let mut layout = two_views();
    let count = layout.test_view(1).configure_count();

    layout.root.arrange_root();
    layout.commit();
    assert_eq!(layout.test_view(1).configure_count(), count);
}

#[test]
fn ipc_tree_serializes() {
    let layout = two_views();
    let tree = layout.root.layout_tree();
    assert_eq!(tree.nodes[0].name.as_deref(), Some("output1"));
    serde_json::to_string(&tree).unwrap();
}

#[test]
fn removing_last_output_keeps_workspaces() {
    let mut layout = check_ops([
        Op::AddOutput(1),
        Op::AddView {
            params: TestViewParams::new(1),
        },
        Op::Commit,
        Op::RemoveOutput(1),
        Op::Commit,
    ]);
    assert_snapshot!(layout.tree(), @"(empty)");

    // The workspace comes back with the next output.
    layout.add_output(2);
    layout.verify_invariants();
    assert_snapshot!(
        layout.tree(),
        @"
    Output output2
      Workspace 1 (active)
        View app1 *
    "
    );

    layout.commit();
    let content = layout.con(1).scene().content;
    assert!(layout.scene.exists(content));
    assert!(layout.scene.is_visible(content));
}

#[test]
fn removing_output_moves_workspaces_to_next() {
    let mut layout = check_ops([
        Op::AddOutput(1),
        Op::AddOutput(2),
        Op::AddView {
            params: TestViewParams::new(1),
        },
        Op::Commit,
        Op::RemoveOutput(1),
        Op::Commit,
    ]);

    assert_snapshot!(
        layout.tree(),
        @"
    Output output2
      Workspace 2 (active)
      Workspace 1
        View app1 *
    "
    );

    // The container is still in the scene, just not visible.
    let content = layout.con(1).scene().content;
    assert!(layout.scene.exists(content));
    assert!(!layout.scene.is_visible(content));
}

#[test]
fn operations_dont_panic() {
    if std::env::var_os("RUN_SLOW_TESTS").is_none() {
        eprintln!("ignoring slow test");
        return;
    }

    let every_op = [
        Op::AddOutput(1),
        Op::AddOutput(2),
        Op::RemoveOutput(1),
        Op::SetOutputSize {
            id: 1,
            size: Size::from((800., 600.)),
        },
        Op::SetLayerSurface {
            id: 1,
            layer: Layer::Top,
            anchor: Anchor::TOP | Anchor::LEFT | Anchor::RIGHT,
            exclusive_zone: 30,
            size: Size::from((0., 30.)),
        },
        Op::AddView {
            params: TestViewParams::new(1),
        },
        Op::AddView {
            params: TestViewParams::new(2).floating(),
        },
        Op::AddView {
            params: TestViewParams::new(3).floating().transient_for(1),
        },
        Op::UnmapView(1),
        Op::UnmapView(2),
        Op::FocusView(1),
        Op::FocusView(2),
        Op::SetUrgent { id: 1, urgent: true },
        Op::SetCsd { id: 1, csd: true },
        Op::SetFullscreen {
            id: 1,
            mode: FullscreenMode::Workspace,
        },
        Op::SetFullscreen {
            id: 2,
            mode: FullscreenMode::Global,
        },
        Op::ToggleFloating(1),
        Op::SetSticky {
            id: 2,
            sticky: true,
        },
        Op::Split {
            id: 1,
            layout: LayoutMode::None,
        },
        Op::SetLayout {
            id: 1,
            layout: LayoutMode::Grid,
        },
        Op::SetBorder {
            id: 1,
            style: BorderStyle::Pixel,
            thickness: Some(3),
        },
        Op::MoveToWorkspace { id: 1, ws_name: 2 },
        Op::FocusWorkspace(2),
        Op::MoveWorkspaceToOutput {
            ws_name: 1,
            output_id: 2,
        },
        Op::ScratchpadAdd(1),
        Op::ScratchpadToggleAuto,
        Op::Commit,
    ];

    for third in every_op.iter().cloned() {
        for second in every_op.iter().cloned() {
            for first in every_op.iter().cloned() {
                let mut layout = check_ops([first, second.clone(), third.clone()]);
                layout.commit();
                layout.verify_invariants();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: if std::env::var_os("RUN_SLOW_TESTS").is_none() {
            eprintln!("ignoring slow test");
            0
        } else {
            ProptestConfig::default().cases
        },
        ..ProptestConfig::default()
    })]

    #[test]
    fn random_operations_dont_panic(ops: Vec<Op>) {
        let mut layout = check_ops(ops);
        layout.commit();
        layout.verify_invariants();
    }
}

#[test]
fn gaps_from_options() {
    let options = Options {
        gaps: Gaps {
            inner: FloatOrInt(10.),
            outer: FloatOrInt(5.),
        },
        ..Default::default()
    };
    let mut layout = TestLayout::with_options(options);
    layout.add_output(1);
    layout.add_view(TestViewParams::new(1));
    layout.commit();

    assert_eq!(layout.con(1).current().geometry, rect(15., 15., 1890., 1050.));
}
