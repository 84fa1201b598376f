/// Composes the per-lane traffic-impact indicator.
///
/// `occupancy × (avg(speeds) / max_speed)`, rounded to 4 decimal digits — how
/// much lane capacity is both physically occupied and close to saturating the
/// legal speed limit.
///
/// An empty speed window yields 0 for any occupancy; so does a non-positive
/// `max_speed`, keeping the result finite.
pub fn compose_indicator(occupancy: f64, speeds: &[f64], max_speed: f64) -> f64 {
    if speeds.is_empty() || max_speed <= 0.0 {
        return 0.0;
    }
    let avg = speeds.iter().sum::<f64>() / speeds.len() as f64;
    round4(occupancy * (avg / max_speed))
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_speed_window_is_zero_for_any_occupancy() {
        assert_eq!(compose_indicator(0.0, &[], 100.0), 0.0);
        assert_eq!(compose_indicator(0.75, &[], 100.0), 0.0);
        assert_eq!(compose_indicator(1.0, &[], 100.0), 0.0);
    }

    #[test]
    fn reference_values() {
        // occupancy=0.25, speeds=[40,60], max=100 → 0.25 × (50/100) = 0.1250
        assert_eq!(compose_indicator(0.25, &[40.0, 60.0], 100.0), 0.125);
        // occupancy=0.30, avg=50, max=100 → 0.1500
        assert_eq!(compose_indicator(0.30, &[45.0, 50.0, 55.0], 100.0), 0.15);
    }

    #[test]
    fn rounds_to_four_decimals() {
        // 0.333... × (1/3) = 0.111... → 0.1111
        assert_eq!(compose_indicator(1.0 / 3.0, &[1.0], 3.0), 0.1111);
        assert_eq!(compose_indicator(0.2, &[33.333], 100.0), 0.0667);
    }

    #[test]
    fn non_positive_max_speed_is_zero() {
        assert_eq!(compose_indicator(0.5, &[50.0], 0.0), 0.0);
        assert_eq!(compose_indicator(0.5, &[50.0], -10.0), 0.0);
    }
}
