use crate::all::*;

use nalgebra::Rotation2;

// Plane geometry on `Vector2d` points. Degenerate directions (coincident
// points) never divide by zero: the offset collapses onto the origin point.

pub fn distance(p: &Vector2d, q: &Vector2d) -> f64 {
  (p - q).norm()
}

// Point at signed `distance` from `from` on the ray through `to`.
pub fn point_along_a_line(from: &Vector2d, to: &Vector2d, distance: f64) -> Vector2d {
  match unit(from, to) {
    Some(u) => from + u * distance,
    None => *from,
  }
}

// Offset `origin` by `distance` along the normal of the baseline `p1 -> p2`.
// Positive distances land on the left of the baseline direction in image
// coordinates (y pointing down, so visually the right-hand side).
pub fn point_along_a_perpendicular(
  p1: &Vector2d,
  p2: &Vector2d,
  origin: &Vector2d,
  distance: f64,
) -> Vector2d {
  match unit(p1, p2) {
    Some(u) => origin + Vector2d::new(-u[1], u[0]) * distance,
    None => *origin,
  }
}

pub fn rotate(point: &Vector2d, pivot: &Vector2d, angle: f64) -> Vector2d {
  rotate_with(point, pivot, &Rotation2::new(angle))
}

#[inline(always)]
pub fn rotate_with(point: &Vector2d, pivot: &Vector2d, rotation: &Rotation2<f64>) -> Vector2d {
  pivot + rotation * (point - pivot)
}

// Cosine of the angle at `vertex` between the rays to `a` and `b`.
// Zero when either ray is degenerate.
pub fn cosine(a: &Vector2d, vertex: &Vector2d, b: &Vector2d) -> f64 {
  let va = a - vertex;
  let vb = b - vertex;
  let n = va.norm() * vb.norm();
  if n < f64::EPSILON { return 0. }
  va.dot(&vb) / n
}

// Frame coordinates to the padded, scaled working space.
pub fn scaled(p: &Vector2d, scale_factor: f64, border: f64) -> Vector2d {
  p * scale_factor + Vector2d::repeat(border)
}

// Inverse of `scaled()`.
pub fn affine_r(p: &Vector2d, scale_factor: f64, border: f64) -> Vector2d {
  (p - Vector2d::repeat(border)) / scale_factor
}

// Maps between frame coordinates and the working space the posture search
// runs in: resampled by `scale_factor`, padded by `border` on every side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorkingSpace {
  pub scale_factor: f64,
  pub border: f64,
}

impl WorkingSpace {
  pub fn scaled(&self, p: &Vector2d) -> Vector2d {
    scaled(p, self.scale_factor, self.border)
  }

  pub fn to_frame(&self, p: &Vector2d) -> Vector2d {
    affine_r(p, self.scale_factor, self.border)
  }
}

fn unit(from: &Vector2d, to: &Vector2d) -> Option<Vector2d> {
  let d = to - from;
  let n = d.norm();
  if n < f64::EPSILON { None } else { Some(d / n) }
}
