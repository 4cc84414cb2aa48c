use crate::all::*;

pub const WHITE: Bgr = [255, 255, 255];
pub const GREEN: Bgr = [0, 255, 0];
pub const RED: Bgr = [0, 0, 255];

// Distance of the arrowhead base from the head point, and its half width.
const ARROW_LENGTH: f64 = 4.;
const ARROW_WIDTH: f64 = 3.;
const CENTROID_RADIUS: i32 = 2;
const FRONT_DOT_RADIUS: i32 = 2;

pub fn draw_line(image: &mut ColorImage, mut p0: Pixel, mut p1: Pixel, color: Bgr) {
  let dx = p1[0] - p0[0];
  let dy = p1[1] - p0[1];
  if dx == 0 && dy == 0 {
    image.put(p0, color);
    return;
  }
  if dx.abs() < dy.abs() {
    if p0[1] > p1[1] { (p0, p1) = (p1, p0); }
    let k = dx as f64 / dy as f64;
    for y in p0[1] ..= p1[1] {
      let x = p0[0] + (k * (y - p0[1]) as f64).round() as i32;
      image.put(Pixel::new(x, y), color);
    }
  }
  else {
    if p0[0] > p1[0] { (p0, p1) = (p1, p0); }
    let k = dy as f64 / dx as f64;
    for x in p0[0] ..= p1[0] {
      let y = p0[1] + (k * (x - p0[0]) as f64).round() as i32;
      image.put(Pixel::new(x, y), color);
    }
  }
}

// One pixel wide outline, midpoint algorithm.
pub fn draw_circle(image: &mut ColorImage, center: Pixel, radius: i32, color: Bgr) {
  if radius < 0 { return }
  let mut x = radius;
  let mut y = 0;
  let mut err = 1 - radius;
  while x >= y {
    for (dx, dy) in [(x, y), (y, x), (-y, x), (-x, y), (-x, -y), (-y, -x), (y, -x), (x, -y)] {
      image.put(center + Pixel::new(dx, dy), color);
    }
    y += 1;
    if err < 0 {
      err += 2 * y + 1;
    }
    else {
      x -= 1;
      err += 2 * (y - x) + 1;
    }
  }
}

pub fn draw_centroids(image: &mut ColorImage, centroids: &[Vector2d]) {
  for c in centroids {
    draw_circle(image, to_pixel(c), CENTROID_RADIUS, RED);
  }
}

// Replaces the frame with the foreground mask: border cropped, resampled
// back to the frame size, gray to color.
pub fn draw_thresholded(image: &mut ColorImage, mask: &Image, border: usize) {
  let inner = mask.cropped(
    border,
    border,
    mask.width.saturating_sub(2 * border),
    mask.height.saturating_sub(2 * border),
  );
  *image = ColorImage::from_gray(&inner.resized(image.width, image.height));
}

// Draws the body model circles and the posture skeleton of one animal.
// `position` and `radii` are in frame coordinates.
pub fn draw_animal(image: &mut ColorImage, position: &AnimalPosition, radii: &Radii, options: &OverlayOptions) {
  let s = options.image_scale;
  let h = position.head * s;
  let f = position.front * s;
  let b = position.back * s;
  let (hr, fr, br) = (radii.head * s, radii.front * s, radii.back * s);

  if options.show_model {
    draw_circle(image, to_pixel(&b), br as i32, WHITE);
    if !position.contracted {
      draw_circle(image, to_pixel(&f), fr as i32, WHITE);
    }
    draw_circle(image, to_pixel(&h), hr as i32, WHITE);
  }

  if !options.show_posture { return }
  // The arrow starts at the front point, or at the back point when curled up.
  let root = if position.contracted { b } else { f };
  let rh = distance(&root, &h);
  let tip = point_along_a_line(&root, &h, rh + hr);
  if position.contracted {
    let tail = point_along_a_line(&h, &b, rh + br);
    draw_line(image, to_pixel(&tail), to_pixel(&tip), WHITE);
  }
  else {
    let tail = point_along_a_line(&f, &b, distance(&f, &b) + br);
    draw_line(image, to_pixel(&tail), to_pixel(&f), WHITE);
    draw_line(image, to_pixel(&f), to_pixel(&tip), WHITE);
    draw_circle(image, to_pixel(&f), FRONT_DOT_RADIUS, GREEN);
  }

  let base = point_along_a_line(&root, &h, (rh - ARROW_LENGTH).max(0.));
  for side in [ARROW_WIDTH, -ARROW_WIDTH] {
    let barb = point_along_a_perpendicular(&root, &h, &base, side);
    draw_line(image, to_pixel(&tip), to_pixel(&barb), WHITE);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn count(image: &ColorImage, color: Bgr) -> usize {
    image.data.chunks_exact(3).filter(|c| *c == color).count()
  }

  #[test]
  fn test_draw_line() {
    let mut image = ColorImage::new(10, 10);
    draw_line(&mut image, Pixel::new(1, 1), Pixel::new(8, 4), WHITE);
    assert_eq!(count(&image, WHITE), 8);
    assert_eq!(image.pixel(1, 1), WHITE);
    assert_eq!(image.pixel(8, 4), WHITE);

    let mut image = ColorImage::new(10, 10);
    draw_line(&mut image, Pixel::new(3, 9), Pixel::new(3, 0), WHITE);
    assert_eq!(count(&image, WHITE), 10);

    // Runs off the image without panicking.
    draw_line(&mut image, Pixel::new(-5, -5), Pixel::new(20, 20), GREEN);
    assert_eq!(image.pixel(5, 5), GREEN);
  }

  #[test]
  fn test_draw_circle() {
    let mut image = ColorImage::new(20, 20);
    let c = Pixel::new(10, 10);
    draw_circle(&mut image, c, 3, WHITE);
    assert_eq!(image.pixel(13, 10), WHITE);
    assert_eq!(image.pixel(10, 7), WHITE);
    assert_eq!(image.pixel(10, 10), [0, 0, 0]);
    for y in 0..20 {
      for x in 0..20 {
        if image.pixel(x, y) != WHITE { continue }
        let d = ((x as f64 - 10.).powi(2) + (y as f64 - 10.).powi(2)).sqrt();
        assert!((d - 3.).abs() < 1.);
      }
    }
  }

  #[test]
  fn test_draw_centroids() {
    let mut image = ColorImage::new(20, 20);
    draw_centroids(&mut image, &[Vector2d::new(5.5, 5.5), Vector2d::new(19., 0.)]);
    assert_eq!(image.pixel(7, 5), RED);
    assert_eq!(image.pixel(17, 0), RED);
  }

  #[test]
  fn test_draw_animal() {
    let position = AnimalPosition {
      head: Vector2d::new(60., 40.),
      front: Vector2d::new(45., 40.),
      back: Vector2d::new(30., 40.),
      contracted: false,
      speed: Vector2d::zeros(),
    };
    let radii = Radii { head: 5., front: 7., back: 10. };
    let mut image = ColorImage::new(100, 80);
    draw_animal(&mut image, &position, &radii, &OverlayOptions::default());
    // Skeleton runs from the back circle edge to the head circle edge.
    assert_eq!(image.pixel(20, 40), WHITE);
    assert_eq!(image.pixel(65, 40), WHITE);
    assert_eq!(image.pixel(47, 40), GREEN);
    // Model circles.
    assert_eq!(image.pixel(30, 30), WHITE);

    // Positions and radii both follow the display scale.
    let mut large = ColorImage::new(200, 160);
    let options = OverlayOptions { image_scale: 2., ..OverlayOptions::default() };
    draw_animal(&mut large, &position, &radii, &options);
    assert_eq!(large.pixel(60, 60), WHITE);
    assert_eq!(large.pixel(30, 30), [0, 0, 0]);

    let mut bare = ColorImage::new(100, 80);
    let options = OverlayOptions {
      show_model: false,
      show_posture: false,
      ..OverlayOptions::default()
    };
    draw_animal(&mut bare, &position, &radii, &options);
    assert_eq!(count(&bare, [0, 0, 0]), 100 * 80);
  }

  #[test]
  fn test_draw_thresholded() {
    let mut mask = Image::new(14, 12);
    mask.set_value(5, 5, 255);
    let mut image = ColorImage::filled(10, 8, [100, 100, 100]);
    draw_thresholded(&mut image, &mask, 2);
    assert_eq!((image.width, image.height), (10, 8));
    assert_eq!(image.pixel(3, 3), WHITE);
    assert_eq!(image.pixel(0, 0), [0, 0, 0]);
  }
}
