mod vec2;
pub use vec2::Vec2;

/// Map an angle in degrees to `[0, 360)`
#[inline]
pub(crate) fn mod360_pos(v: f64) -> f64 {
    let r = v - 360. * (v / 360.).floor();
    if r >= 360. { 0. } else { r }
}

/// Wrap a delta in degrees to `[-180, 180]`.
///
/// Assumes the input lies within one turn of that range, which holds for the
/// difference of two angles already in `[0, 360)`.
#[inline]
pub(crate) fn wrap_delta_deg(mut d: f64) -> f64 {
    if d > 180. {
        d -= 360.;
    }
    if d < -180. {
        d += 360.;
    }
    d
}
