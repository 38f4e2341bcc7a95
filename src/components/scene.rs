//! The scene graph.
//!
//! A [`Scene`] is an arena owning every screen, layer and widget. Nodes refer to each other
//! through [`NodeId`] handles, which keeps containment explicit: a parent lists the ids of its
//! direct children, and questions like "does this screen eventually contain that one" are
//! answered by a bounded traversal of those lists.
//!
//! *   **Screens** own a grid and may be drawn by a renderer. A screen can also be attached to
//!     other screens (several at once), where its tiles act as an overlay.
//! *   **Layers** own a grid and group components; children are positioned relative to the
//!     layer.
//! *   **Widgets** own their grid through the [`Widget`] trait and cannot hold children.
//!
//! Attaching a component that already contains its new parent is rejected, since drawing such
//! a graph would never terminate.

use crate::components::{RedrawRequest, Widget};
use crate::error::AttachError;
use crate::rendering::grid::TileGrid;
use crossterm::event::Event;
use smallvec::SmallVec;
use std::collections::HashSet;

/// Handle of a node in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

enum NodeKind {
    Screen(TileGrid),
    Layer(TileGrid),
    Widget(Box<dyn Widget>),
}

struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
    parents: SmallVec<[NodeId; 1]>,
    /// Whether the node receives input events.
    listening: bool,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            parents: SmallVec::new(),
            listening: false,
        }
    }

    fn grid(&self) -> &TileGrid {
        match &self.kind {
            NodeKind::Screen(grid) | NodeKind::Layer(grid) => grid,
            NodeKind::Widget(widget) => widget.tiles(),
        }
    }

    fn grid_mut(&mut self) -> &mut TileGrid {
        match &mut self.kind {
            NodeKind::Screen(grid) | NodeKind::Layer(grid) => grid,
            NodeKind::Widget(widget) => widget.tiles_mut(),
        }
    }

    fn is_screen(&self) -> bool {
        matches!(self.kind, NodeKind::Screen(_))
    }
}

/// A component's grid placed in the coordinate space of the screen being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Overlay {
    pub node: NodeId,
    /// Position of the grid's top-left corner in screen coordinates.
    pub origin: (i64, i64),
    pub width: usize,
    pub height: usize,
}

impl Overlay {
    /// Translates screen coordinates into the overlay's local coordinates.
    pub fn to_local(&self, x: i64, y: i64) -> (i64, i64) {
        (x - self.origin.0, y - self.origin.1)
    }

    pub fn covers(&self, x: i64, y: i64) -> bool {
        let (lx, ly) = self.to_local(x, y);
        lx >= 0 && ly >= 0 && (lx as usize) < self.width && (ly as usize) < self.height
    }
}

/// Arena of screens, layers and widgets.
pub struct Scene {
    nodes: Vec<Node>,
    redraw: RedrawRequest,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            redraw: RedrawRequest::new(),
        }
    }

    /// The trigger every attached widget receives.
    pub fn redraw_request(&self) -> &RedrawRequest {
        &self.redraw
    }

    fn insert(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(Node::new(kind));
        NodeId(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> Result<&Node, AttachError> {
        self.nodes.get(id.0).ok_or(AttachError::UnknownNode(id))
    }

    /// Adds a screen positioned at (0, 0).
    pub fn add_screen(&mut self, width: usize, height: usize) -> NodeId {
        self.add_screen_at(width, height, (0, 0))
    }

    /// Adds a screen. The origin only matters when the screen is attached to another screen.
    pub fn add_screen_at(&mut self, width: usize, height: usize, origin: (i64, i64)) -> NodeId {
        self.insert(NodeKind::Screen(TileGrid::new(width, height, origin)))
    }

    /// Adds a layer. The grid's origin is the layer's position in its parent.
    pub fn add_layer(&mut self, grid: TileGrid) -> NodeId {
        self.insert(NodeKind::Layer(grid))
    }

    pub fn add_widget(&mut self, widget: impl Widget + 'static) -> NodeId {
        self.insert(NodeKind::Widget(Box::new(widget)))
    }

    /// Adds `widget` to the scene and attaches it to `parent`.
    pub fn attach(&mut self, parent: NodeId, widget: impl Widget + 'static) -> Result<NodeId, AttachError> {
        self.node(parent)?;
        let id = self.add_widget(widget);
        self.add_component(parent, id)?;
        Ok(id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn is_screen(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(Node::is_screen)
    }

    pub fn grid(&self, id: NodeId) -> Option<&TileGrid> {
        self.nodes.get(id.0).map(Node::grid)
    }

    pub fn grid_mut(&mut self, id: NodeId) -> Option<&mut TileGrid> {
        self.nodes.get_mut(id.0).map(Node::grid_mut)
    }

    pub fn widget(&self, id: NodeId) -> Option<&dyn Widget> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Widget(widget) => Some(widget.as_ref()),
            _ => None,
        }
    }

    pub fn widget_mut(&mut self, id: NodeId) -> Option<&mut (dyn Widget + 'static)> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Widget(widget) => Some(widget.as_mut()),
            _ => None,
        }
    }

    /// The direct children of `id`, in attach order.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id.0).map_or(&[], |node| &node.children)
    }

    pub fn is_listening(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|node| node.listening)
    }

    /// Attaches `child` to `parent`.
    ///
    /// On success every widget below `child` receives the scene's redraw trigger and starts
    /// receiving input events, and a redraw is requested.
    ///
    /// # Errors
    ///
    /// *   [`AttachError::Cycle`] if `child` is `parent` or (transitively) contains it.
    /// *   [`AttachError::NotAContainer`] if `parent` is a widget.
    /// *   [`AttachError::AlreadyAttached`] if `child` is already a direct child of `parent`.
    /// *   [`AttachError::AlreadyOwned`] if `child` is a layer or widget that has a parent.
    /// *   [`AttachError::UnknownNode`] for ids from another scene.
    pub fn add_component(&mut self, parent: NodeId, child: NodeId) -> Result<(), AttachError> {
        let parent_node = self.node(parent)?;
        let child_node = self.node(child)?;

        if matches!(parent_node.kind, NodeKind::Widget(_)) {
            return Err(AttachError::NotAContainer(parent));
        }
        if parent_node.children.contains(&child) {
            return Err(AttachError::AlreadyAttached { parent, child });
        }
        if child == parent || self.recursively_contains(child, parent) {
            log::debug!("rejected attaching {child:?} to {parent:?}: containment cycle");
            return Err(AttachError::Cycle { parent, child });
        }
        if !child_node.is_screen() {
            if let Some(&owner) = child_node.parents.first() {
                return Err(AttachError::AlreadyOwned { child, owner });
            }
        }

        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parents.push(parent);
        self.register_subtree(child);
        log::debug!("attached {child:?} to {parent:?}");
        self.redraw.request();
        Ok(())
    }

    /// Detaches `child` from `parent` and returns whether it was attached.
    ///
    /// The child stops receiving events (unless it is a screen still attached elsewhere), and
    /// the parent's tiles under the child's former footprint are reset to their default
    /// appearance so nothing of the child lingers on screen.
    pub fn remove_component(&mut self, parent: NodeId, child: NodeId) -> bool {
        if !self.contains_component(parent, child) {
            return false;
        }
        self.nodes[parent.0].children.retain(|id| *id != child);
        self.nodes[child.0].parents.retain(|id| *id != parent);
        if self.nodes[child.0].parents.is_empty() {
            self.unregister_subtree(child);
        }

        let footprint = self.nodes[child.0].grid();
        let (x, y) = footprint.origin();
        let (width, height) = (footprint.width(), footprint.height());
        self.nodes[parent.0].grid_mut().reset_region(x, y, width, height);

        log::debug!("removed {child:?} from {parent:?}");
        self.redraw.request();
        true
    }

    /// Returns whether `child` is a direct child of `parent`.
    pub fn contains_component(&self, parent: NodeId, child: NodeId) -> bool {
        self.nodes
            .get(parent.0)
            .is_some_and(|node| node.children.contains(&child))
    }

    /// Returns whether `target` is somewhere below `ancestor`.
    pub fn recursively_contains(&self, ancestor: NodeId, target: NodeId) -> bool {
        let mut visited = HashSet::new();
        let mut stack: Vec<NodeId> = self.children(ancestor).to_vec();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if visited.insert(id) {
                stack.extend_from_slice(self.children(id));
            }
        }
        false
    }

    /// Every component grid below `root`, in drawing order, placed in `root`'s coordinates.
    ///
    /// Children are drawn after their parent and in attach order. A screen attached in several
    /// places shows up once per place.
    pub fn overlays(&self, root: NodeId) -> Vec<Overlay> {
        let mut overlays = Vec::new();
        let mut path = vec![root];
        self.collect_overlays(root, (0, 0), &mut path, &mut overlays);
        overlays
    }

    fn collect_overlays(
        &self,
        parent: NodeId,
        parent_origin: (i64, i64),
        path: &mut Vec<NodeId>,
        overlays: &mut Vec<Overlay>,
    ) {
        for &child in self.children(parent) {
            // cycles are rejected on attach; this keeps a corrupt graph from recursing forever
            if path.contains(&child) {
                continue;
            }
            let grid = self.nodes[child.0].grid();
            let (x, y) = grid.origin();
            let origin = (parent_origin.0 + x, parent_origin.1 + y);
            overlays.push(Overlay {
                node: child,
                origin,
                width: grid.width(),
                height: grid.height(),
            });
            path.push(child);
            self.collect_overlays(child, origin, path, overlays);
            path.pop();
        }
    }

    /// Routes an input event to the listening widgets below `root`.
    ///
    /// Mouse events go to the widgets under the cursor, translated into widget coordinates,
    /// topmost first. All other events go to every listening widget. A widget shown in several
    /// places still receives each event once. Returns whether any widget changed, in which case
    /// a redraw is requested.
    pub fn dispatch_event(&mut self, root: NodeId, event: &Event) -> bool {
        let mut changed = false;
        let mut delivered = HashSet::new();
        for overlay in self.overlays(root).into_iter().rev() {
            if delivered.contains(&overlay.node) {
                continue;
            }
            let node = &mut self.nodes[overlay.node.0];
            if !node.listening {
                continue;
            }
            let NodeKind::Widget(widget) = &mut node.kind else {
                continue;
            };

            let consumed = match event {
                Event::Mouse(mouse) => {
                    let (x, y) = (mouse.column as i64, mouse.row as i64);
                    if !overlay.covers(x, y) {
                        continue;
                    }
                    let (lx, ly) = overlay.to_local(x, y);
                    delivered.insert(overlay.node);
                    let mut local = *mouse;
                    local.column = lx as u16;
                    local.row = ly as u16;
                    widget.on_event(&Event::Mouse(local))
                }
                _ => {
                    delivered.insert(overlay.node);
                    widget.on_event(event)
                }
            };
            if consumed {
                widget.on_state_change();
                changed = true;
            }
        }
        if changed {
            self.redraw.request();
        }
        changed
    }

    /// Shows or hides every blinking tile of `root` and its components.
    ///
    /// Returns the number of tiles that changed.
    pub fn set_blink_phase(&mut self, root: NodeId, visible: bool) -> usize {
        let mut ids = vec![root];
        ids.extend(self.overlays(root).into_iter().map(|overlay| overlay.node));
        let mut seen = HashSet::new();
        let mut changed = 0;
        for id in ids {
            if !seen.insert(id) {
                continue;
            }
            let Some(grid) = self.grid_mut(id) else {
                continue;
            };
            for (_, _, tile) in grid.iter_mut() {
                if tile.is_blinking() && tile.is_hidden() == visible {
                    tile.set_hidden(!visible);
                    changed += 1;
                }
            }
        }
        changed
    }

    fn subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if visited.insert(id) {
                order.push(id);
                stack.extend_from_slice(self.children(id));
            }
        }
        order
    }

    fn register_subtree(&mut self, root: NodeId) {
        for id in self.subtree(root) {
            let redraw = self.redraw.clone();
            let node = &mut self.nodes[id.0];
            node.listening = true;
            if let NodeKind::Widget(widget) = &mut node.kind {
                widget.set_redraw_function(redraw);
            }
        }
    }

    fn unregister_subtree(&mut self, root: NodeId) {
        let mut stack = vec![root];
        let mut visited = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let node = &mut self.nodes[id.0];
            // a screen nested below the detached one may still be shown elsewhere
            if id != root && node.is_screen() && node.parents.len() > 1 {
                continue;
            }
            node.listening = false;
            if let NodeKind::Widget(widget) = &mut node.kind {
                widget.set_redraw_function(RedrawRequest::new());
            }
            stack.extend_from_slice(&node.children);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Panel;
    use crate::rendering::color::Color;
    use crate::rendering::tile::Tile;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
    use std::cell::Cell;
    use std::rc::Rc;

    /// Records the local position of every click and flips its tile to 'x'.
    struct ClickRecorder {
        tiles: TileGrid,
        clicks: Vec<(u16, u16)>,
        keys: usize,
    }

    impl ClickRecorder {
        fn new(width: usize, height: usize, origin: (i64, i64)) -> Self {
            Self {
                tiles: TileGrid::new(width, height, origin),
                clicks: Vec::new(),
                keys: 0,
            }
        }
    }

    impl Widget for ClickRecorder {
        fn tiles(&self) -> &TileGrid {
            &self.tiles
        }

        fn tiles_mut(&mut self) -> &mut TileGrid {
            &mut self.tiles
        }

        fn on_event(&mut self, event: &Event) -> bool {
            match event {
                Event::Mouse(mouse) => {
                    self.clicks.push((mouse.column, mouse.row));
                    if let Some(tile) = self.tiles.tile_mut(mouse.column as i64, mouse.row as i64) {
                        tile.set_character('x');
                    }
                    true
                }
                Event::Key(_) => {
                    self.keys += 1;
                    false
                }
                _ => false,
            }
        }
    }

    fn click(column: u16, row: u16) -> Event {
        Event::Mouse(MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        })
    }

    #[test]
    fn test_cycle_is_rejected() {
        crate::testing::init_logging();
        let mut scene = Scene::new();
        let a = scene.add_screen(4, 4);
        let b = scene.add_screen(4, 4);

        assert_eq!(scene.add_component(b, a), Ok(()));
        assert_eq!(
            scene.add_component(a, b),
            Err(AttachError::Cycle { parent: a, child: b })
        );
        assert!(scene.contains_component(b, a));
        assert!(!scene.contains_component(a, b));
        assert!(!scene.recursively_contains(a, b));
    }

    #[test]
    fn test_transitive_cycle_is_rejected() {
        let mut scene = Scene::new();
        let a = scene.add_screen(4, 4);
        let b = scene.add_screen(4, 4);
        let c = scene.add_screen(4, 4);
        scene.add_component(a, b).unwrap();
        scene.add_component(b, c).unwrap();

        assert!(scene.recursively_contains(a, c));
        assert_eq!(
            scene.add_component(c, a),
            Err(AttachError::Cycle { parent: c, child: a })
        );
        assert_eq!(
            scene.add_component(a, a),
            Err(AttachError::Cycle { parent: a, child: a })
        );
    }

    #[test]
    fn test_attach_errors() {
        let mut scene = Scene::new();
        let screen = scene.add_screen(4, 4);
        let other = scene.add_screen(4, 4);
        let panel = scene.attach(screen, Panel::new(1, 1, (0, 0))).unwrap();
        let loose = scene.add_widget(Panel::new(1, 1, (0, 0)));

        assert_eq!(
            scene.add_component(screen, panel),
            Err(AttachError::AlreadyAttached { parent: screen, child: panel })
        );
        assert_eq!(
            scene.add_component(other, panel),
            Err(AttachError::AlreadyOwned { child: panel, owner: screen })
        );
        assert_eq!(
            scene.add_component(panel, loose),
            Err(AttachError::NotAContainer(panel))
        );
        assert_eq!(
            scene.add_component(screen, NodeId(99)),
            Err(AttachError::UnknownNode(NodeId(99)))
        );
    }

    #[test]
    fn test_shared_screen_can_have_several_parents() {
        let mut scene = Scene::new();
        let first = scene.add_screen(4, 4);
        let second = scene.add_screen(4, 4);
        let shared = scene.add_screen_at(2, 2, (1, 1));
        scene.add_component(first, shared).unwrap();
        scene.add_component(second, shared).unwrap();

        assert!(scene.remove_component(first, shared));
        assert!(scene.is_listening(shared));
        assert!(scene.remove_component(second, shared));
        assert!(!scene.is_listening(shared));
    }

    /// Counts the events it receives.
    struct EventCounter {
        tiles: TileGrid,
        received: Rc<Cell<usize>>,
    }

    impl Widget for EventCounter {
        fn tiles(&self) -> &TileGrid {
            &self.tiles
        }

        fn tiles_mut(&mut self) -> &mut TileGrid {
            &mut self.tiles
        }

        fn on_event(&mut self, _event: &Event) -> bool {
            self.received.set(self.received.get() + 1);
            true
        }
    }

    #[test]
    fn test_shared_screen_widgets_get_each_event_once() {
        let mut scene = Scene::new();
        let root = scene.add_screen(10, 10);
        let layer = scene.add_layer(TileGrid::new(10, 10, (0, 0)));
        let shared = scene.add_screen_at(4, 4, (0, 0));
        scene.add_component(root, shared).unwrap();
        scene.add_component(root, layer).unwrap();
        scene.add_component(layer, shared).unwrap();
        let received = Rc::new(Cell::new(0));
        let counter = scene
            .attach(
                shared,
                EventCounter {
                    tiles: TileGrid::new(4, 4, (0, 0)),
                    received: Rc::clone(&received),
                },
            )
            .unwrap();
        assert_eq!(scene.overlays(root).iter().filter(|o| o.node == counter).count(), 2);

        let key = Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));
        assert!(scene.dispatch_event(root, &key));
        assert_eq!(received.get(), 1);

        assert!(scene.dispatch_event(root, &click(1, 1)));
        assert_eq!(received.get(), 2);
    }

    #[test]
    fn test_overlay_origins_are_nested() {
        let mut scene = Scene::new();
        let screen = scene.add_screen(10, 10);
        let layer = scene.add_layer(TileGrid::new(5, 5, (2, 3)));
        scene.add_component(screen, layer).unwrap();
        let panel = scene.attach(layer, Panel::new(2, 2, (1, 1))).unwrap();

        let overlays = scene.overlays(screen);
        assert_eq!(overlays.len(), 2);
        assert_eq!(overlays[0].node, layer);
        assert_eq!(overlays[0].origin, (2, 3));
        assert_eq!(overlays[1].node, panel);
        assert_eq!(overlays[1].origin, (3, 4));
        assert!(overlays[1].covers(4, 5));
        assert!(!overlays[1].covers(5, 5));
    }

    #[test]
    fn test_removal_resets_region() {
        let mut scene = Scene::new();
        let screen = scene.add_screen(5, 5);
        let colored = Tile::new('#')
            .with_foreground(Color::rgb(255, 255, 0))
            .with_background(Color::rgb(0, 0, 255));
        // the screen shows the same colors beneath the widget, as a widget drawing onto it would
        scene.grid_mut(screen).unwrap().fill(&colored);
        let panel = scene.attach(screen, Panel::filled(2, 2, (1, 1), &colored)).unwrap();

        assert!(scene.remove_component(screen, panel));
        assert!(!scene.remove_component(screen, panel));

        let grid = scene.grid(screen).unwrap();
        for y in 1..3 {
            for x in 1..3 {
                assert_eq!(grid[(x, y)].background(), Tile::DEFAULT_BACKGROUND);
                assert_eq!(grid[(x, y)].foreground(), Tile::DEFAULT_FOREGROUND);
            }
        }
        assert_eq!(grid[(0, 0)], colored);
        assert!(scene.overlays(screen).is_empty());
        assert!(!scene.is_listening(panel));
    }

    #[test]
    fn test_attach_hands_out_redraw_trigger() {
        let mut scene = Scene::new();
        let screen = scene.add_screen(4, 4);
        assert!(!scene.redraw_request().take());

        scene.attach(screen, Panel::new(1, 1, (0, 0))).unwrap();
        assert!(scene.redraw_request().take());
    }

    #[test]
    fn test_mouse_events_are_local() {
        let mut scene = Scene::new();
        let screen = scene.add_screen(10, 10);
        let recorder = scene.attach(screen, ClickRecorder::new(3, 3, (4, 4))).unwrap();
        scene.redraw_request().take();

        assert!(!scene.dispatch_event(screen, &click(0, 0)));
        assert!(scene.dispatch_event(screen, &click(5, 6)));
        assert!(scene.redraw_request().take());
        assert_eq!(scene.grid(recorder).unwrap()[(1, 2)].character(), 'x');
    }

    #[test]
    fn test_key_events_reach_listeners_only() {
        let mut scene = Scene::new();
        let screen = scene.add_screen(10, 10);
        let recorder = scene.attach(screen, ClickRecorder::new(3, 3, (0, 0))).unwrap();
        let key = Event::Key(KeyEvent::new(KeyCode::Char('a'), KeyModifiers::NONE));

        assert!(!scene.dispatch_event(screen, &key));
        scene.remove_component(screen, recorder);
        assert!(!scene.dispatch_event(screen, &click(1, 1)));
        assert_eq!(scene.grid(recorder).unwrap()[(1, 1)].character(), ' ');
    }

    #[test]
    fn test_blink_phase() {
        let mut scene = Scene::new();
        let screen = scene.add_screen(3, 1);
        scene.grid_mut(screen).unwrap()[(0, 0)].set_blinking(true);
        let panel = scene.attach(screen, Panel::new(1, 1, (2, 0))).unwrap();
        scene.grid_mut(panel).unwrap()[(0, 0)].set_blinking(true);

        assert_eq!(scene.set_blink_phase(screen, false), 2);
        assert!(scene.grid(screen).unwrap()[(0, 0)].is_hidden());
        assert!(!scene.grid(screen).unwrap()[(1, 0)].is_hidden());
        assert_eq!(scene.set_blink_phase(screen, false), 0);
        assert_eq!(scene.set_blink_phase(screen, true), 2);
        assert!(!scene.grid(panel).unwrap()[(0, 0)].is_hidden());
    }
}
