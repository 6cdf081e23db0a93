use gtk::prelude::*;
use gtk::glib;
use geo::{Coord, Polygon, Rect};
use libshumate::prelude::*;
use log::{debug, info, warn};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use crate::camera::{plan_fly_out, plan_fly_to, Camera, Flight, ViewPosition, ZoomRange};
use crate::config::Config;
use crate::features::{CountryFeature, FeatureId, FeatureStore};
use crate::selection::{FeatureStyle, SelectionMachine};

/// Pointer travel, in pixels, above which a press/release is a pan, not a click.
const DRAG_THRESHOLD: f64 = 3.0;

/// The map widget plus the pieces the shell needs to drive it.
pub struct MapView {
    pub widget: libshumate::SimpleMap,
    pub map: libshumate::Map,
    pub viewport: libshumate::Viewport,
}

pub fn create_map_view(config: &Config) -> Option<MapView> {
    let widget = libshumate::SimpleMap::new();
    let map_source = libshumate::RasterRenderer::from_url(&config.tile_url);
    widget.set_map_source(Some(&map_source));

    let map = widget.map()?;
    let viewport = map.viewport()?;

    viewport.set_min_zoom_level(config.min_zoom);
    viewport.set_max_zoom_level(config.max_zoom);
    map.go_to_full(0.0, 0.0, config.base_zoom);
    // Double click would race the selection fly-to.
    map.set_zoom_on_double_click(false);

    widget.set_vexpand(true);
    widget.set_hexpand(true);

    Some(MapView {
        widget,
        map,
        viewport,
    })
}

/// Draws hovered and selected countries as filled path layers.
pub struct HighlightLayer {
    map: libshumate::Map,
    viewport: libshumate::Viewport,
    drawn: RefCell<HashMap<FeatureId, (FeatureStyle, Vec<libshumate::PathLayer>)>>,
}

impl HighlightLayer {
    pub fn new(view: &MapView) -> Self {
        Self {
            map: view.map.clone(),
            viewport: view.viewport.clone(),
            drawn: RefCell::new(HashMap::new()),
        }
    }

    pub fn restyle(&self, store: &FeatureStore, selection: &SelectionMachine) {
        let wanted: Vec<(FeatureId, FeatureStyle)> = store
            .iter()
            .filter(|feature| feature.is_active() || feature.is_selected())
            .map(|feature| (feature.id(), selection.style_for(feature.id())))
            .filter(|(_, style)| *style != FeatureStyle::Default)
            .collect();

        let mut drawn = self.drawn.borrow_mut();
        drawn.retain(|id, (style, layers)| {
            let keep = wanted.contains(&(*id, *style));
            if !keep {
                for layer in layers.iter() {
                    self.map.remove_layer(layer);
                }
            }
            keep
        });

        for (id, style) in wanted {
            if drawn.contains_key(&id) {
                continue;
            }
            if let Some(feature) = store.get(id) {
                drawn.insert(id, (style, self.draw(feature, style)));
            }
        }
    }

    fn draw(&self, feature: &CountryFeature, style: FeatureStyle) -> Vec<libshumate::PathLayer> {
        let (fill, stroke, stroke_width) = match style {
            FeatureStyle::Hovered => (
                gdk::RGBA::new(1.0, 0.8, 0.0, 0.85),
                gdk::RGBA::new(0.0, 0.0, 0.0, 1.0),
                1.0,
            ),
            FeatureStyle::Selected => (
                gdk::RGBA::new(1.0, 0.55, 0.0, 0.9),
                gdk::RGBA::new(0.2, 0.2, 0.2, 1.0),
                2.0,
            ),
            FeatureStyle::Default => return Vec::new(),
        };

        feature
            .geometry()
            .iter()
            .flat_map(ring_paths)
            .map(|ring| {
                let layer = libshumate::PathLayer::new(&self.viewport);
                layer.set_fill(ring.fill);
                if ring.fill {
                    layer.set_fill_color(Some(&fill));
                }
                layer.set_stroke_color(Some(&stroke));
                layer.set_stroke_width(stroke_width);
                for (lat, lon) in ring.nodes {
                    layer.add_node(&libshumate::Coordinate::new_full(lat, lon));
                }
                self.map.add_layer(&layer);
                layer
            })
            .collect()
    }
}

/// One outline to draw, as `(lat, lon)` nodes.
#[derive(Debug, Clone, PartialEq)]
struct RingPath {
    nodes: Vec<(f64, f64)>,
    fill: bool,
}

/// Path layers fill with a single path, so a polygon with holes is outlined
/// only; otherwise enclaves would be painted as part of it.
fn ring_paths(polygon: &Polygon<f64>) -> Vec<RingPath> {
    let solid = polygon.interiors().is_empty();
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .enumerate()
        .map(|(index, ring)| RingPath {
            nodes: ring.coords().map(|c| (c.y, c.x)).collect(),
            fill: index == 0 && solid,
        })
        .collect()
}

/// Frame-clock driven view animation. Starting a flight cancels the previous one.
pub struct MapCamera {
    map: libshumate::Map,
    viewport: libshumate::Viewport,
    range: ZoomRange,
    base_zoom: f64,
    flight_id: Rc<Cell<u64>>,
}

impl MapCamera {
    pub fn new(view: &MapView, config: &Config) -> Self {
        Self {
            map: view.map.clone(),
            viewport: view.viewport.clone(),
            range: ZoomRange {
                min: f64::from(config.min_zoom),
                max: f64::from(config.max_zoom),
            },
            base_zoom: config.base_zoom,
            flight_id: Rc::new(Cell::new(0)),
        }
    }

    fn current(&self) -> ViewPosition {
        ViewPosition {
            lat: self.viewport.latitude(),
            lon: self.viewport.longitude(),
            zoom: self.viewport.zoom_level(),
        }
    }

    fn start(&self, flight: Flight) {
        let id = self.flight_id.get().wrapping_add(1);
        self.flight_id.set(id);

        let flight_id = self.flight_id.clone();
        let viewport = self.viewport.clone();
        let started_at: Cell<Option<i64>> = Cell::new(None);

        self.map.add_tick_callback(move |map, clock| {
            if flight_id.get() != id {
                return glib::ControlFlow::Break;
            }

            let now = clock.frame_time();
            let start = started_at.get().unwrap_or(now);
            started_at.set(Some(start));
            let elapsed = Duration::from_micros((now - start).max(0) as u64);

            let position = flight.position_at(elapsed);
            viewport.set_zoom_level(position.zoom);
            map.center_on(position.lat, position.lon);

            if flight.is_finished(elapsed) {
                glib::ControlFlow::Break
            } else {
                glib::ControlFlow::Continue
            }
        });
    }
}

impl Camera for MapCamera {
    fn fly_to(&self, bounds: Rect<f64>) {
        let size = (f64::from(self.map.width()), f64::from(self.map.height()));
        let flight = plan_fly_to(self.current(), bounds, size, self.range);
        info!(
            "Flying to ({:.2}, {:.2}) at zoom {:.2}",
            flight.to.lat, flight.to.lon, flight.to.zoom
        );
        self.start(flight);
    }

    fn fly_out(&self) {
        let flight = plan_fly_out(self.current(), self.base_zoom);
        debug!("Flying out to zoom {:.2}", flight.to.zoom);
        self.start(flight);
    }
}

/// Routes pointer motion and clicks on the map to `(lon, lat)` callbacks.
pub fn connect_pointer(
    view: &MapView,
    on_move: impl Fn(Coord<f64>) + 'static,
    on_click: impl Fn(Coord<f64>) + 'static,
) {
    let to_coord = {
        let map = view.map.clone();
        let viewport = view.viewport.clone();
        move |x: f64, y: f64| {
            let (lat, lon) = viewport.widget_coords_to_location(&map, x, y);
            Coord { x: lon, y: lat }
        }
    };
    let to_coord = Rc::new(to_coord);

    let motion = gtk::EventControllerMotion::new();
    let to_coord_for_motion = to_coord.clone();
    motion.connect_motion(move |_, x, y| {
        on_move(to_coord_for_motion(x, y));
    });
    view.map.add_controller(motion);

    let gesture = gtk::GestureClick::new();
    let pressed_at: Rc<Cell<Option<(f64, f64)>>> = Rc::new(Cell::new(None));

    let pressed_at_for_press = pressed_at.clone();
    gesture.connect_pressed(move |_, _, x, y| {
        pressed_at_for_press.set(Some((x, y)));
    });

    gesture.connect_released(move |_, n_press, x, y| {
        let Some((px, py)) = pressed_at.take() else {
            return;
        };
        if n_press > 1 {
            return;
        }
        if (x - px).hypot(y - py) > DRAG_THRESHOLD {
            debug!("Ignoring release after drag");
            return;
        }
        on_click(to_coord(x, y));
    });
    view.map.add_controller(gesture);
}

/// Loads the boundary dataset, leaving the map usable without it.
pub fn load_feature_store(config: &Config) -> FeatureStore {
    match FeatureStore::load(&config.boundaries_path) {
        Ok(store) => {
            if store.is_empty() {
                warn!("Boundary dataset {} has no countries", config.boundaries_path.display());
            }
            store
        }
        Err(e) => {
            log::error!("Country selection disabled: {:#}", e);
            FeatureStore::new()
        }
    }
}
