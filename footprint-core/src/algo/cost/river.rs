use serde::{Deserialize, Serialize};

/// Boat travel speeds along rivers by elevation band and slope band
///
/// A value falls in the first band whose upper break it does not exceed;
/// values above the last break fall in the fifth band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverSpeeds {
    /// Upper bounds of the first four elevation bands, metres
    pub elevation_breaks: [f64; 4],
    /// Upper bounds of the first four slope bands, degrees
    pub slope_breaks: [f64; 4],
    /// Speeds in km/h, rows by elevation band, columns by slope band
    pub speeds_kmh: [[f64; 5]; 5],
    pub max_elevation: f64,
    pub max_slope: f64,
}

impl Default for RiverSpeeds {
    fn default() -> Self {
        Self {
            elevation_breaks: [450.0, 700.0, 1800.0, 2800.0],
            slope_breaks: [5.0, 10.0, 15.0, 25.0],
            speeds_kmh: [
                [15.0, 7.5, 3.8, 1.9, 1.4],
                [7.5, 3.9, 2.7, 1.9, 1.4],
                [3.8, 2.7, 2.0, 1.7, 1.4],
                [1.9, 1.9, 1.7, 1.4, 1.3],
                [1.4, 1.4, 1.4, 1.3, 1.2],
            ],
            max_elevation: 10_000.0,
            max_slope: 1000.0,
        }
    }
}

impl RiverSpeeds {
    /// `None` when either input is outside the table's domain
    pub fn lookup(&self, elevation: f64, slope: f64) -> Option<f64> {
        if !(0.0..=self.max_elevation).contains(&elevation)
            || !(0.0..=self.max_slope).contains(&slope)
        {
            return None;
        }
        let row = band(&self.elevation_breaks, elevation);
        let col = band(&self.slope_breaks, slope);
        Some(self.speeds_kmh[row][col])
    }

    pub(crate) fn is_valid(&self) -> bool {
        let ascending = |breaks: &[f64; 4]| breaks.windows(2).all(|w| w[0] < w[1]);
        ascending(&self.elevation_breaks)
            && ascending(&self.slope_breaks)
            && self
                .speeds_kmh
                .iter()
                .flatten()
                .all(|speed| speed.is_finite() && *speed > 0.0)
    }
}

fn band(breaks: &[f64; 4], value: f64) -> usize {
    breaks
        .iter()
        .position(|upper| value <= *upper)
        .unwrap_or(breaks.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_edges_are_inclusive() {
        let table = RiverSpeeds::default();
        assert_eq!(table.lookup(450.0, 5.0), Some(15.0));
        assert_eq!(table.lookup(450.1, 5.0), Some(7.5));
        assert_eq!(table.lookup(0.0, 5.1), Some(7.5));
        assert_eq!(table.lookup(2800.0, 25.0), Some(1.4));
        assert_eq!(table.lookup(9000.0, 900.0), Some(1.2));
    }

    #[test]
    fn every_constant_is_in_expected_range() {
        let table = RiverSpeeds::default();
        assert!(table.is_valid());
        assert!(
            table
                .speeds_kmh
                .iter()
                .flatten()
                .all(|s| (1.2..=15.0).contains(s))
        );
    }

    #[test]
    fn out_of_domain_has_no_speed() {
        let table = RiverSpeeds::default();
        assert_eq!(table.lookup(-1.0, 3.0), None);
        assert_eq!(table.lookup(10_001.0, 3.0), None);
        assert_eq!(table.lookup(100.0, 1000.5), None);
        assert_eq!(table.lookup(f64::NAN, 3.0), None);
    }
}
