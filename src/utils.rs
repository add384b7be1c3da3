/// Angular resolution steps per degree of the C1 (1/3 degree).
pub const ANGLE_STEPS_PER_DEGREE: f64 = 3.0;

/// Highest angle bucket. Angles just below 360 round up into it.
pub const MAX_ANGLE_BUCKET: u16 = 360;

/// Largest angle a real measurement can have. The 15-bit wire field reaches 511.98.
pub const MAX_ANGLE_DEG: f64 = 360.0;

/// Snaps an angle in degrees to the sensor's 1/3 degree grid, rounded to two decimals.
///
/// Ties on the grid go to the even step. Applying it to its own output returns the same value.
pub fn quantize_angle(angle_deg: f64) -> f64 {
    let snapped = (angle_deg * ANGLE_STEPS_PER_DEGREE).round_ties_even() / ANGLE_STEPS_PER_DEGREE;
    round_to_hundredths(snapped)
}

/// Returns `true` for angles within one revolution, `0..=360` degrees.
#[inline]
pub fn is_physical_angle(angle_deg: f64) -> bool {
    (0.0..=MAX_ANGLE_DEG).contains(&angle_deg)
}

/// Integer degree bucket used as the snapshot key, in `0..=360`.
pub fn angle_bucket(angle_deg: f64) -> u16 {
    let bucket = angle_deg.round();
    if bucket <= 0.0 {
        0
    } else if bucket >= MAX_ANGLE_BUCKET as f64 {
        MAX_ANGLE_BUCKET
    } else {
        bucket as u16
    }
}

#[inline]
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
