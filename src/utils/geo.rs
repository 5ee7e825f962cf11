/// Great-circle distance in kilometres between two WGS84 points.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_for_same_point() {
        let d = haversine_km(-33.8688, 151.2093, -33.8688, 151.2093);
        assert!(d.abs() < 1e-9);
    }

    #[test]
    fn sydney_to_melbourne_is_about_714_km() {
        // Sydney CBD to Melbourne CBD
        let d = haversine_km(-33.8688, 151.2093, -37.8136, 144.9631);
        assert!((d - 714.0).abs() < 10.0, "got {d}");
    }

    #[test]
    fn short_suburban_distances_are_sensible() {
        // Parramatta to Sydney CBD, roughly 20km
        let d = haversine_km(-33.8151, 151.0011, -33.8688, 151.2093);
        assert!(d > 15.0 && d < 25.0, "got {d}");
    }
}
