use crate::all::*;

// Neighborhood for the 8-connected component labeling.
const NEIGHBORS: [[i32; 2]; 8] = [
  [-1, -1], [ 0, -1], [ 1, -1],
  [-1,  0],           [ 1,  0],
  [-1,  1], [ 0,  1], [ 1,  1],
];

// Output of one foreground extraction.
pub struct Foreground {
  // Difference intensity inside the largest blob, zero elsewhere, resampled
  // to the working resolution and padded by the border.
  pub mask: Image,
  // Blob centroids in frame coordinates.
  pub centroids: Vec<Vector2d>,
  // Pixel count of the kept blob, in frame pixels.
  pub area: usize,
}

pub struct ForegroundExtractor {
  border: usize,
  working_size: [usize; 2],
  // Workspace.
  diff: Image,
  labels: Vec<u32>,
  stack: Vec<[usize; 2]>,
}

struct Component {
  label: u32,
  area: usize,
  sum: [f64; 2],
}

impl ForegroundExtractor {
  pub fn new(border: usize, working_size: [usize; 2]) -> ForegroundExtractor {
    ForegroundExtractor {
      border,
      working_size,
      diff: Image::new(0, 0),
      labels: vec![],
      stack: vec![],
    }
  }

  // The normalized difference image of the last call, frame resolution.
  pub fn difference(&self) -> &Image {
    &self.diff
  }

  // Returns None when nothing in the frame stands out from the background.
  pub fn process(
    &mut self,
    frame: &ColorImage,
    background: &ColorImage,
    component_threshold: f64,
  ) -> Option<Foreground> {
    if !frame.same_size(background) {
      warn!("Frame size {}x{} does not match the background {}x{}.",
        frame.width, frame.height, background.width, background.height);
      return None;
    }
    abs_diff_gray(frame, background, &mut self.diff);
    self.diff.normalize();

    let otsu = otsu_threshold(&self.diff);
    let threshold = otsu as f64 + component_threshold;
    let component = self.largest_component(threshold)?;
    debug!("Foreground blob of {} pixels, Otsu threshold {}.", component.area, otsu);

    let mut mask = Image::new(self.diff.width, self.diff.height);
    for (i, &label) in self.labels.iter().enumerate() {
      if label == component.label {
        mask.data[i] = self.diff.data[i];
      }
    }
    mask.normalize();
    let mask = mask.resized(self.working_size[0], self.working_size[1]);

    let n = component.area as f64;
    Some(Foreground {
      mask: mask.padded(self.border),
      centroids: vec![Vector2d::new(component.sum[0] / n, component.sum[1] / n)],
      area: component.area,
    })
  }

  // Labels pixels brighter than `threshold` and returns the biggest
  // 8-connected group. Ties go to the group found first in scan order.
  fn largest_component(&mut self, threshold: f64) -> Option<Component> {
    let w = self.diff.width;
    let h = self.diff.height;
    self.labels.clear();
    self.labels.resize(w * h, 0);
    let mut best: Option<Component> = None;
    let mut next_label = 1;
    for y in 0..h {
      for x in 0..w {
        if self.labels[y * w + x] != 0 { continue }
        if self.diff.value(x, y) as f64 <= threshold { continue }
        let component = self.fill(x, y, next_label, threshold);
        next_label += 1;
        if best.as_ref().map_or(true, |b| component.area > b.area) {
          best = Some(component);
        }
      }
    }
    best
  }

  fn fill(&mut self, x: usize, y: usize, label: u32, threshold: f64) -> Component {
    let w = self.diff.width;
    let h = self.diff.height;
    let mut component = Component {
      label,
      area: 0,
      sum: [0., 0.],
    };
    self.stack.clear();
    self.stack.push([x, y]);
    self.labels[y * w + x] = label;
    while let Some([px, py]) = self.stack.pop() {
      component.area += 1;
      component.sum[0] += px as f64;
      component.sum[1] += py as f64;
      for n in NEIGHBORS {
        let nx = px as i32 + n[0];
        let ny = py as i32 + n[1];
        if nx < 0 || ny < 0 || nx >= w as i32 || ny >= h as i32 { continue }
        let (nx, ny) = (nx as usize, ny as usize);
        if self.labels[ny * w + nx] != 0 { continue }
        if self.diff.value(nx, ny) as f64 <= threshold { continue }
        self.labels[ny * w + nx] = label;
        self.stack.push([nx, ny]);
      }
    }
    component
  }
}

// Otsu's method: the level maximizing the between-class variance, where
// class zero holds the values at or below the level.
pub fn otsu_threshold(image: &Image) -> u8 {
  let mut histogram = [0usize; 256];
  for &v in &image.data {
    histogram[v as usize] += 1;
  }
  let n = image.data.len() as f64;
  if n == 0. { return 0 }
  let mu = histogram.iter().enumerate()
    .map(|(i, &c)| i as f64 * c as f64)
    .sum::<f64>() / n;

  let eps = f32::EPSILON as f64;
  let mut q1 = 0.;
  let mut sum1 = 0.;
  let mut best_sigma = 0.;
  let mut best = 0;
  for (i, &c) in histogram.iter().enumerate() {
    let p = c as f64 / n;
    q1 += p;
    sum1 += i as f64 * p;
    let q2 = 1. - q1;
    if q1.min(q2) < eps || q1.max(q2) > 1. - eps { continue }
    let mu1 = sum1 / q1;
    let mu2 = (mu - sum1) / q2;
    let sigma = q1 * q2 * (mu1 - mu2) * (mu1 - mu2);
    if sigma > best_sigma {
      best_sigma = sigma;
      best = i as u8;
    }
  }
  best
}
