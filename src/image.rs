use crate::all::*;

// Row-major grayscale image storage.
// Could also have used nalgebra::DMatrix, but the per-pixel loops of the
// foreground extraction and mask scoring read more plainly on a flat buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Image {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

// Row-major interleaved color image, channel order blue, green, red.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorImage {
  pub data: Vec<u8>,
  pub width: usize,
  pub height: usize,
}

pub type Bgr = [u8; 3];

impl Image {
  pub fn new(width: usize, height: usize) -> Image {
    Image {
      data: vec![0; width * height],
      width,
      height,
    }
  }

  // Reuses the allocation when the size does not change.
  pub fn reset(&mut self, width: usize, height: usize) {
    self.data.clear();
    self.data.resize(width * height, 0);
    self.width = width;
    self.height = height;
  }

  #[inline(always)]
  pub fn value(&self, x: usize, y: usize) -> u8 {
    self.data[y * self.width + x]
  }

  #[inline(always)]
  pub fn set_value(&mut self, x: usize, y: usize, value: u8) {
    self.data[y * self.width + x] = value;
  }

  // Stretches the value range to [0, 255]. A constant image becomes all
  // zeros.
  pub fn normalize(&mut self) {
    let (min, max) = match (self.data.iter().min(), self.data.iter().max()) {
      (Some(&min), Some(&max)) => (min as i32, max as i32),
      _ => return,
    };
    if max == min {
      self.data.iter_mut().for_each(|v| *v = 0);
      return;
    }
    let range = (max - min) as f64;
    for v in self.data.iter_mut() {
      *v = ((*v as i32 - min) as f64 * 255. / range).round() as u8;
    }
  }

  // Copy surrounded by `border` pixels of zeros on every side.
  pub fn padded(&self, border: usize) -> Image {
    let mut out = Image::new(self.width + 2 * border, self.height + 2 * border);
    for y in 0..self.height {
      let dst = (y + border) * out.width + border;
      out.data[dst .. dst + self.width].copy_from_slice(&self[y]);
    }
    out
  }

  // The `width` x `height` block with top-left corner at `x0`, `y0`.
  // Clipped to the image.
  pub fn cropped(&self, x0: usize, y0: usize, width: usize, height: usize) -> Image {
    let x0 = x0.min(self.width);
    let y0 = y0.min(self.height);
    let width = width.min(self.width - x0);
    let height = height.min(self.height - y0);
    let mut out = Image::new(width, height);
    for y in 0..height {
      out.data[y * width .. (y + 1) * width].copy_from_slice(&self[y0 + y][x0 .. x0 + width]);
    }
    out
  }

  // Bilinear resampling, pixel centers aligned the usual way.
  pub fn resized(&self, width: usize, height: usize) -> Image {
    if width == self.width && height == self.height { return self.clone() }
    let mut out = Image::new(width, height);
    if self.width == 0 || self.height == 0 { return out }
    let sx = self.width as f64 / width as f64;
    let sy = self.height as f64 / height as f64;
    for y in 0..height {
      let v = ((y as f64 + 0.5) * sy - 0.5).max(0.);
      let y0 = (v as usize).min(self.height - 1);
      let y1 = (y0 + 1).min(self.height - 1);
      let ya = v - y0 as f64;
      for x in 0..width {
        let u = ((x as f64 + 0.5) * sx - 0.5).max(0.);
        let x0 = (u as usize).min(self.width - 1);
        let x1 = (x0 + 1).min(self.width - 1);
        let xa = u - x0 as f64;
        let value = (1. - xa) * (1. - ya) * self.value(x0, y0) as f64
          + xa * (1. - ya) * self.value(x1, y0) as f64
          + (1. - xa) * ya * self.value(x0, y1) as f64
          + xa * ya * self.value(x1, y1) as f64;
        out.set_value(x, y, value.round().min(255.) as u8);
      }
    }
    out
  }
}

// Element access in the manner of `image[y][x]`.
impl Index<usize> for Image {
  type Output = [u8];
  fn index(&self, y: usize) -> &Self::Output {
    &self.data[y * self.width .. (y + 1) * self.width]
  }
}

impl ColorImage {
  pub fn new(width: usize, height: usize) -> ColorImage {
    ColorImage::filled(width, height, [0, 0, 0])
  }

  pub fn filled(width: usize, height: usize, color: Bgr) -> ColorImage {
    ColorImage {
      data: color.iter().copied().cycle().take(3 * width * height).collect(),
      width,
      height,
    }
  }

  pub fn same_size(&self, other: &ColorImage) -> bool {
    self.width == other.width && self.height == other.height
  }

  #[inline(always)]
  pub fn pixel(&self, x: usize, y: usize) -> Bgr {
    let i = 3 * (y * self.width + x);
    [self.data[i], self.data[i + 1], self.data[i + 2]]
  }

  #[inline(always)]
  pub fn set_pixel(&mut self, x: usize, y: usize, color: Bgr) {
    let i = 3 * (y * self.width + x);
    self.data[i .. i + 3].copy_from_slice(&color);
  }

  // Bounds-checked write for drawing code, which happily runs off the edges.
  #[inline(always)]
  pub fn put(&mut self, p: Pixel, color: Bgr) {
    if p[0] < 0 || p[0] >= self.width as i32 { return }
    if p[1] < 0 || p[1] >= self.height as i32 { return }
    self.set_pixel(p[0] as usize, p[1] as usize, color);
  }

  pub fn from_gray(image: &Image) -> ColorImage {
    ColorImage {
      data: image.data.iter().flat_map(|&v| [v, v, v]).collect(),
      width: image.width,
      height: image.height,
    }
  }

  // Packed 0RGB words, the format the window buffer wants.
  pub fn to_rgb_words(&self, out: &mut Vec<u32>) {
    out.clear();
    out.extend(self.data.chunks_exact(3).map(|c| {
      (c[2] as u32) << 16 | (c[1] as u32) << 8 | c[0] as u32
    }));
  }
}

// Integer luma weights (BT.601) scaled by 2^14.
const LUMA_B: u32 = 1868;
const LUMA_G: u32 = 9617;
const LUMA_R: u32 = 4899;
const LUMA_SHIFT: u32 = 14;

#[inline(always)]
pub fn luma(c: Bgr) -> u8 {
  ((c[0] as u32 * LUMA_B + c[1] as u32 * LUMA_G + c[2] as u32 * LUMA_R
    + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT) as u8
}

// Per-channel absolute difference of two equally sized frames, converted to
// grayscale.
pub fn abs_diff_gray(a: &ColorImage, b: &ColorImage, out: &mut Image) {
  assert!(a.same_size(b));
  out.reset(a.width, a.height);
  for (i, (pa, pb)) in a.data.chunks_exact(3).zip(b.data.chunks_exact(3)).enumerate() {
    out.data[i] = luma([
      pa[0].abs_diff(pb[0]),
      pa[1].abs_diff(pb[1]),
      pa[2].abs_diff(pb[2]),
    ]);
  }
}

// Per-pixel, per-channel median. Even counts average the two middle values.
pub fn median_image(frames: &[ColorImage]) -> Option<ColorImage> {
  let first = frames.first()?;
  if frames.iter().any(|f| !f.same_size(first)) { return None }
  let n = frames.len();
  let mut values = Vec::with_capacity(n);
  let mut out = ColorImage::new(first.width, first.height);
  for i in 0..first.data.len() {
    values.clear();
    values.extend(frames.iter().map(|f| f.data[i]));
    values.sort_unstable();
    out.data[i] = if n % 2 == 1 {
      values[n / 2]
    }
    else {
      ((values[n / 2 - 1] as u16 + values[n / 2] as u16) / 2) as u8
    };
  }
  Some(out)
}
