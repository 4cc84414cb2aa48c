use crate::all::*;

// Side of the square window a candidate posture is scored in, centered on
// the animal's current back point.
pub const MASK_SIZE: usize = 50;
const MASK_HALF: i32 = MASK_SIZE as i32 / 2;

// Foreground intensities below this count against a body pixel.
const INTENSITY_OFFSET: i32 = 100;

// +1 on the body model, -1 elsewhere. Reused for every candidate.
pub struct BodyMask {
  data: Vec<i8>,
}

impl BodyMask {
  pub fn new() -> BodyMask {
    BodyMask {
      data: vec![-1; MASK_SIZE * MASK_SIZE],
    }
  }

  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> i8 {
    self.data[y * MASK_SIZE + x]
  }

  // Draws `posture` into the window whose center pixel is `center` truncated.
  pub fn render(&mut self, posture: &Posture, center: &Vector2d, radii: &Radii) {
    self.data.iter_mut().for_each(|v| *v = -1);
    let shift = Vector2d::repeat(MASK_HALF as f64) - center;
    let local = posture.translated(&shift);
    let data = &mut self.data;
    let size = [MASK_SIZE as i32; 2];
    rasterize_body(&local, radii, size, &mut |x: i32, y: i32| {
      data[y as usize * MASK_SIZE + x as usize] = 1;
    });
  }

  // Sum of mask times (intensity - 100) over the part of the window that
  // lies inside `image`. A window entirely off the image scores zero.
  pub fn score(&self, image: &Image, center: &Vector2d) -> i64 {
    let ox = center[0] as i32 - MASK_HALF;
    let oy = center[1] as i32 - MASK_HALF;
    let x0 = (-ox).max(0);
    let y0 = (-oy).max(0);
    let x1 = (image.width as i32 - ox).min(MASK_SIZE as i32);
    let y1 = (image.height as i32 - oy).min(MASK_SIZE as i32);
    let mut sum = 0;
    for y in y0..y1 {
      let row = &image[(oy + y) as usize];
      for x in x0..x1 {
        let v = row[(ox + x) as usize] as i32 - INTENSITY_OFFSET;
        sum += (self.value(x as usize, y as usize) as i32 * v) as i64;
      }
    }
    sum
  }
}

// Calls `plot` for every pixel of the body outline of `posture`: tangent
// quadrilaterals joining consecutive joints plus a filled disk per joint.
// Pixels outside `size` are skipped.
pub fn rasterize_body<F: FnMut(i32, i32)>(
  posture: &Posture,
  radii: &Radii,
  size: [i32; 2],
  plot: &mut F,
) {
  let h = &posture.head;
  let f = &posture.front;
  let b = &posture.back;
  match posture.mode {
    BodyMode::Normal => {
      fill_convex_polygon(&tangent_quad(f, h, h, radii.head, f, radii.front), size, plot);
      fill_convex_polygon(&tangent_quad(f, b, b, radii.back, f, radii.front), size, plot);
    },
    BodyMode::Contracted => {
      fill_convex_polygon(&tangent_quad(b, h, h, radii.head, b, radii.back), size, plot);
    },
  }
  fill_circle(to_pixel(h), radii.head, size, plot);
  fill_circle(to_pixel(f), radii.front, size, plot);
  fill_circle(to_pixel(b), radii.back, size, plot);
}

// Quadrilateral spanning `r0` either side of `c0` and `r1` either side of
// `c1`, both offsets taken across the baseline `p1 -> p2`.
fn tangent_quad(
  p1: &Vector2d,
  p2: &Vector2d,
  c0: &Vector2d,
  r0: f64,
  c1: &Vector2d,
  r1: f64,
) -> [Pixel; 4] {
  [
    to_pixel(&point_along_a_perpendicular(p1, p2, c0, r0)),
    to_pixel(&point_along_a_perpendicular(p1, p2, c1, r1)),
    to_pixel(&point_along_a_perpendicular(p1, p2, c1, -r1)),
    to_pixel(&point_along_a_perpendicular(p1, p2, c0, -r0)),
  ]
}

pub fn fill_circle<F: FnMut(i32, i32)>(center: Pixel, radius: f64, size: [i32; 2], plot: &mut F) {
  if radius < 0. { return }
  let r = radius as i32;
  let r2 = radius * radius;
  for y in (center[1] - r).max(0) ..= (center[1] + r).min(size[1] - 1) {
    let dy = (y - center[1]) as f64;
    for x in (center[0] - r).max(0) ..= (center[0] + r).min(size[0] - 1) {
      let dx = (x - center[0]) as f64;
      if dx * dx + dy * dy <= r2 {
        plot(x, y);
      }
    }
  }
}

// Fills pixels on or inside a convex polygon, either winding order.
pub fn fill_convex_polygon<F: FnMut(i32, i32)>(vertices: &[Pixel], size: [i32; 2], plot: &mut F) {
  if vertices.is_empty() { return }
  let x0 = vertices.iter().map(|v| v[0]).min().unwrap_or(0).max(0);
  let x1 = vertices.iter().map(|v| v[0]).max().unwrap_or(0).min(size[0] - 1);
  let y0 = vertices.iter().map(|v| v[1]).min().unwrap_or(0).max(0);
  let y1 = vertices.iter().map(|v| v[1]).max().unwrap_or(0).min(size[1] - 1);
  let n = vertices.len();
  for y in y0..=y1 {
    for x in x0..=x1 {
      let mut positive = false;
      let mut negative = false;
      for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        let cross = (b[0] - a[0]) as i64 * (y - a[1]) as i64
          - (b[1] - a[1]) as i64 * (x - a[0]) as i64;
        if cross > 0 { positive = true }
        if cross < 0 { negative = true }
      }
      if !(positive && negative) {
        plot(x, y);
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn radii() -> Radii {
    Radii { head: 5., front: 7., back: 10. }
  }

  fn count(mask: &BodyMask) -> usize {
    mask.data.iter().filter(|&&v| v == 1).count()
  }

  #[test]
  fn test_fill_circle() {
    let mut n = 0;
    fill_circle(Pixel::new(10, 10), 1., [20, 20], &mut |_: i32, _: i32| n += 1);
    assert_eq!(n, 5);
    // Clipped at the corner.
    let mut n = 0;
    fill_circle(Pixel::new(0, 0), 1., [20, 20], &mut |_: i32, _: i32| n += 1);
    assert_eq!(n, 3);
  }

  #[test]
  fn test_fill_convex_polygon() {
    let square = [Pixel::new(2, 2), Pixel::new(5, 2), Pixel::new(5, 5), Pixel::new(2, 5)];
    let mut n = 0;
    fill_convex_polygon(&square, [10, 10], &mut |_: i32, _: i32| n += 1);
    assert_eq!(n, 16);
    let reversed: Vec<Pixel> = square.iter().rev().copied().collect();
    let mut m = 0;
    fill_convex_polygon(&reversed, [10, 10], &mut |_: i32, _: i32| m += 1);
    assert_eq!(m, 16);
  }

  #[test]
  fn test_render_covers_joints() {
    let center = Vector2d::new(100., 100.);
    let posture = Posture::new(
      Vector2d::new(120., 100.),
      Vector2d::new(110., 100.),
      Vector2d::new(100., 100.),
      BodyMode::Normal,
    );
    let mut mask = BodyMask::new();
    mask.render(&posture, &center, &radii());
    assert_eq!(mask.value(25, 25), 1);
    assert_eq!(mask.value(35, 25), 1);
    assert_eq!(mask.value(45, 25), 1);
    assert_eq!(mask.value(0, 0), -1);
    assert_eq!(mask.value(25, 10), -1);
    // Rendering again starts from a clean window.
    let n = count(&mask);
    mask.render(&posture, &center, &radii());
    assert_eq!(count(&mask), n);
  }

  #[test]
  fn test_score() {
    let center = Vector2d::new(60., 60.);
    let posture = Posture::new(center, center, center, BodyMode::Contracted);
    let mut mask = BodyMask::new();
    mask.render(&posture, &center, &radii());
    let body = count(&mask) as i64;
    let rest = (MASK_SIZE * MASK_SIZE) as i64 - body;

    let mut image = Image::new(120, 120);
    assert_eq!(mask.score(&image, &center), -100 * body + 100 * rest);
    image.data.iter_mut().for_each(|v| *v = 255);
    assert_eq!(mask.score(&image, &center), 155 * body - 155 * rest);
  }

  #[test]
  fn test_score_clips_to_image() {
    let image = Image::new(30, 30);
    let center = Vector2d::new(5., 5.);
    let posture = Posture::new(center, center, center, BodyMode::Contracted);
    let mut mask = BodyMask::new();
    mask.render(&posture, &center, &radii());
    let mut expected = 0;
    for y in 20..50 {
      for x in 20..50 {
        expected += -100 * mask.value(x, y) as i64;
      }
    }
    assert_eq!(mask.score(&image, &center), expected);
    // Window far outside the image.
    assert_eq!(mask.score(&image, &Vector2d::new(500., 500.)), 0);
    assert_eq!(mask.score(&image, &Vector2d::new(-500., 5.)), 0);
  }
}
