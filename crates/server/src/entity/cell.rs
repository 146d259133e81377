//! Area and radius conversions shared by every circular entity.

use std::f32::consts::PI;

/// Area of a circle of the given radius.
#[inline]
pub fn area(radius: f32) -> f32 {
    PI * radius * radius
}

/// Radius of a circle of the given area.
#[inline]
pub fn radius_for_area(area: f32) -> f32 {
    (area / PI).sqrt()
}
