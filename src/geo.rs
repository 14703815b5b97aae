use crate::reading::Location;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance in kilometers (spherical law of cosines).
pub fn distance_km(from: Location, to: Location) -> f64 {
    // acos near 1 amplifies rounding into ~1e-4 km for a point and itself.
    if from == to {
        return 0.0;
    }

    let lat1 = from.latitude.to_radians();
    let lon1 = from.longitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let lon2 = to.longitude.to_radians();

    // Rounding can push the cosine just past 1 for nearly identical points.
    let cos_angle = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon2 - lon1).cos();
    cos_angle.clamp(-1.0, 1.0).acos() * EARTH_RADIUS_KM
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(latitude: f64, longitude: f64) -> Location {
        Location {
            latitude,
            longitude,
        }
    }

    #[test]
    fn identical_points_are_zero_apart() {
        for p in [loc(0.0, 0.0), loc(10.0, 20.0), loc(-33.8688, 151.2093), loc(89.9, -179.9)] {
            assert_eq!(distance_km(p, p), 0.0, "{p:?}");
        }
    }

    #[test]
    fn nearly_identical_points_do_not_overshoot_acos() {
        let d = distance_km(loc(45.000_000_1, 7.0), loc(45.0, 7.0));
        assert!(d.is_finite());
        assert!(d >= 0.0 && d < 0.001);
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            (loc(10.0, 20.0), loc(10.01, 20.0)),
            (loc(51.5074, -0.1278), loc(48.8566, 2.3522)),
            (loc(-12.0, 170.0), loc(15.0, -175.0)),
        ];
        for (p, q) in pairs {
            assert!((distance_km(p, q) - distance_km(q, p)).abs() < 1e-9);
        }
    }

    #[test]
    fn hundredth_of_a_degree_of_latitude_is_about_1_11_km() {
        let d = distance_km(loc(10.0, 20.0), loc(10.01, 20.0));
        assert!((d - 1.111_949).abs() < 1e-5, "{d}");
    }

    #[test]
    fn antipodes_are_half_a_circumference_apart() {
        let d = distance_km(loc(0.0, 0.0), loc(0.0, 180.0));
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }
}
