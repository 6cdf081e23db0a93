use geo::Rect;
use std::time::Duration;

pub const FLY_TO_DURATION: Duration = Duration::from_millis(1500);
pub const FLY_OUT_DURATION: Duration = Duration::from_millis(1000);

/// Zoom levels backed off from a tight fit, to keep neighbours in view.
pub const CONTEXT_ZOOM_OFFSET: f64 = 3.0;

const TILE_SIZE: f64 = 256.0;
const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_78;

/// Animates the map view. Overlapping calls replace the in-flight flight.
pub trait Camera {
    fn fly_to(&self, bounds: Rect<f64>);
    fn fly_out(&self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    InOut,
    Out,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::InOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
                }
            }
            Easing::Out => 1.0 - (1.0 - t).powi(3),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewPosition {
    pub lat: f64,
    pub lon: f64,
    pub zoom: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    pub min: f64,
    pub max: f64,
}

impl ZoomRange {
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Flight {
    pub from: ViewPosition,
    pub to: ViewPosition,
    pub duration: Duration,
    pub easing: Easing,
}

impl Flight {
    pub fn position_at(&self, elapsed: Duration) -> ViewPosition {
        let t = if self.duration.is_zero() {
            1.0
        } else {
            elapsed.as_secs_f64() / self.duration.as_secs_f64()
        };
        let k = self.easing.apply(t);
        let lerp = |a: f64, b: f64| a + (b - a) * k;

        ViewPosition {
            lat: lerp(self.from.lat, self.to.lat),
            lon: lerp(self.from.lon, self.to.lon),
            zoom: lerp(self.from.zoom, self.to.zoom),
        }
    }

    pub fn is_finished(&self, elapsed: Duration) -> bool {
        elapsed >= self.duration
    }
}

/// Zoom level at which `bounds` (lon/lat degrees) just fits a viewport of
/// `width` x `height` pixels in Web Mercator.
pub fn zoom_to_fit(bounds: Rect<f64>, width: f64, height: f64) -> f64 {
    let lon_span = (bounds.max().x - bounds.min().x).abs();
    let y_span = (mercator_y(bounds.max().y) - mercator_y(bounds.min().y)).abs();

    let zoom_x = if lon_span > 0.0 {
        (width * 360.0 / (TILE_SIZE * lon_span)).log2()
    } else {
        f64::INFINITY
    };
    let zoom_y = if y_span > 0.0 {
        (height * 2.0 * std::f64::consts::PI / (TILE_SIZE * y_span)).log2()
    } else {
        f64::INFINITY
    };

    zoom_x.min(zoom_y)
}

pub fn plan_fly_to(from: ViewPosition, bounds: Rect<f64>, viewport: (f64, f64), range: ZoomRange) -> Flight {
    let center = bounds.center();
    let fit = zoom_to_fit(bounds, viewport.0.max(1.0), viewport.1.max(1.0));
    let zoom = if fit.is_finite() {
        range.clamp(fit - CONTEXT_ZOOM_OFFSET)
    } else {
        range.max
    };

    Flight {
        from,
        to: ViewPosition {
            lat: center.y,
            lon: center.x,
            zoom,
        },
        duration: FLY_TO_DURATION,
        easing: Easing::InOut,
    }
}

pub fn plan_fly_out(from: ViewPosition, base_zoom: f64) -> Flight {
    Flight {
        from,
        to: ViewPosition {
            lat: 0.0,
            lon: 0.0,
            zoom: base_zoom,
        },
        duration: FLY_OUT_DURATION,
        easing: Easing::Out,
    }
}

fn mercator_y(lat: f64) -> f64 {
    let phi = lat.clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE).to_radians();
    (std::f64::consts::FRAC_PI_4 + phi / 2.0).tan().ln()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    const RANGE: ZoomRange = ZoomRange { min: 1.0, max: 6.0 };

    fn rect(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Rect<f64> {
        Rect::new(Coord { x: min_lon, y: min_lat }, Coord { x: max_lon, y: max_lat })
    }

    fn world() -> Rect<f64> {
        rect(-180.0, -MAX_MERCATOR_LATITUDE, 180.0, MAX_MERCATOR_LATITUDE)
    }

    #[test]
    fn whole_world_fits_one_tile_at_zoom_zero() {
        assert!(zoom_to_fit(world(), 256.0, 256.0).abs() < 1e-9);
        assert!((zoom_to_fit(world(), 512.0, 512.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn smaller_regions_zoom_further_in() {
        let continent = zoom_to_fit(rect(-125.0, 25.0, -67.0, 49.0), 800.0, 600.0);
        let island = zoom_to_fit(rect(-61.9, 17.0, -61.6, 17.2), 800.0, 600.0);
        assert!(island > continent);
    }

    #[test]
    fn fly_to_targets_center_with_context_offset() {
        let from = ViewPosition { lat: 0.0, lon: 0.0, zoom: 2.0 };
        let bounds = rect(-10.0, 40.0, 10.0, 50.0);
        let wide = ZoomRange { min: -10.0, max: 30.0 };

        let flight = plan_fly_to(from, bounds, (1024.0, 768.0), wide);
        let fit = zoom_to_fit(bounds, 1024.0, 768.0);

        assert_eq!(flight.to.lat, 45.0);
        assert_eq!(flight.to.lon, 0.0);
        assert!((flight.to.zoom - (fit - CONTEXT_ZOOM_OFFSET)).abs() < 1e-9);
        assert_eq!(flight.duration, FLY_TO_DURATION);
        assert_eq!(flight.easing, Easing::InOut);
    }

    #[test]
    fn fly_to_zoom_is_clamped() {
        let from = ViewPosition { lat: 0.0, lon: 0.0, zoom: 2.0 };

        let tiny = plan_fly_to(from, rect(7.41, 43.72, 7.44, 43.75), (800.0, 600.0), RANGE);
        assert_eq!(tiny.to.zoom, RANGE.max);

        let huge = plan_fly_to(from, world(), (800.0, 600.0), RANGE);
        assert_eq!(huge.to.zoom, RANGE.min);

        let point = plan_fly_to(from, rect(5.0, 5.0, 5.0, 5.0), (800.0, 600.0), RANGE);
        assert_eq!(point.to.zoom, RANGE.max);
    }

    #[test]
    fn fly_out_returns_to_origin() {
        let from = ViewPosition { lat: 45.0, lon: 10.0, zoom: 5.0 };
        let flight = plan_fly_out(from, 2.0);

        assert_eq!(flight.to, ViewPosition { lat: 0.0, lon: 0.0, zoom: 2.0 });
        assert_eq!(flight.duration, FLY_OUT_DURATION);
        assert_eq!(flight.easing, Easing::Out);
    }

    #[test]
    fn flight_interpolates_between_endpoints() {
        let flight = plan_fly_out(ViewPosition { lat: 40.0, lon: 20.0, zoom: 6.0 }, 2.0);

        assert_eq!(flight.position_at(Duration::ZERO), flight.from);
        assert_eq!(flight.position_at(FLY_OUT_DURATION), flight.to);
        assert_eq!(flight.position_at(FLY_OUT_DURATION * 3), flight.to);

        let mid = flight.position_at(FLY_OUT_DURATION / 2);
        assert!(mid.lat < 20.0, "ease-out covers most of the distance early");
        assert!(!flight.is_finished(FLY_OUT_DURATION / 2));
        assert!(flight.is_finished(FLY_OUT_DURATION));
    }

    #[test]
    fn easing_curves_are_anchored() {
        for easing in [Easing::InOut, Easing::Out] {
            assert_eq!(easing.apply(0.0), 0.0);
            assert_eq!(easing.apply(1.0), 1.0);
            assert_eq!(easing.apply(-1.0), 0.0);
            assert_eq!(easing.apply(2.0), 1.0);
        }
        assert_eq!(Easing::InOut.apply(0.5), 0.5);
    }
}
