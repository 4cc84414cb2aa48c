// use crate::all::*;

// Eigen-like aliases.
pub type Vector2d = nalgebra::Vector2::<f64>;
pub type Pixel = nalgebra::Vector2::<i32>;

// Truncates toward zero, the same rounding the drawing code expects.
pub fn to_pixel(p: &Vector2d) -> Pixel {
  Pixel::new(p[0] as i32, p[1] as i32)
}
