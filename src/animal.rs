use crate::all::*;

// Exponential smoothing factor of the centroid velocity.
const SPEED_ALPHA: f64 = 0.92;
// Working space distance between the back point and the centroid beyond
// which the pose is dragged back onto the centroid.
const TETHER_DISTANCE: f64 = 50.;

// Body size limits in frame pixels. Recorded, not enforced.
#[derive(Clone, Copy, Debug)]
pub struct BodyLimits {
  pub max_body_length: f64,
  pub max_body_width: f64,
  pub min_body_width: f64,
}

impl Default for BodyLimits {
  fn default() -> BodyLimits {
    BodyLimits {
      max_body_length: 60.,
      max_body_width: 30.,
      min_body_width: 30.,
    }
  }
}

// Per-frame knobs of the posture search that the operator may retune live.
#[derive(Clone, Copy, Debug)]
pub struct SearchOptions {
  // Centroid speed, frame pixels per frame, above which backward motion
  // swaps head and back.
  pub speed_threshold: f64,
  pub two_step: bool,
}

// One tracked animal per frame. Pose in working space, centroid in frame
// coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Position {
  pub id: usize,
  pub time: f64,
  pub centroid_x: f64,
  pub centroid_y: f64,
  pub head_x: f64,
  pub head_y: f64,
  pub front_x: f64,
  pub front_y: f64,
  pub back_x: f64,
  pub back_y: f64,
  pub contracted: bool,
}

// Pose mapped back to frame coordinates.
#[derive(Clone, Copy, Debug)]
pub struct AnimalPosition {
  pub head: Vector2d,
  pub front: Vector2d,
  pub back: Vector2d,
  pub contracted: bool,
  pub speed: Vector2d,
}

pub struct Animal {
  pub id: usize,
  posture: Posture,
  centroid: Vector2d,
  prev_centroid: Vector2d,
  speed: Vector2d,
  space: WorkingSpace,
  // Working space radii, used by the search.
  scaled_radii: Radii,
  // Frame space radii, used for drawing.
  radii: Radii,
  scaled_max_body_length: f64,
  scaled_max_width: f64,
  scaled_min_width: f64,
  // Workspace.
  candidates: Vec<Candidate>,
  mask: BodyMask,
}

impl Animal {
  // Seeds the body along the segment `start -> end` (frame coordinates),
  // back nearest to `start`, spacing the joints in proportion to their
  // radii.
  pub fn new(
    id: usize,
    start: Vector2d,
    end: Vector2d,
    centroids: &[Vector2d],
    space: WorkingSpace,
    scaled_radii: Radii,
    limits: BodyLimits,
  ) -> Animal {
    let s = space.scale_factor;
    let (hr, fr, br) = (scaled_radii.head / s, scaled_radii.front / s, scaled_radii.back / s);
    let length = distance(&start, &end);
    let total = 2. * (br + fr + hr);
    let at = |d: f64| space.scaled(&point_along_a_line(&start, &end, length * d / total));
    let posture = Posture::new(
      at(2. * br + 2. * fr + hr),
      at(2. * br + fr),
      at(br),
      BodyMode::Normal,
    );

    let mut centroid = (start + end) / 2.;
    if let Some(i) = closest(&centroid, centroids) {
      centroid = centroids[i];
    }
    debug!("Setting centroid of animal {} at {:.1}, {:.1}.", id, centroid[0], centroid[1]);
    Animal::with_posture(id, posture, centroid, space, scaled_radii, limits)
  }

  pub fn with_posture(
    id: usize,
    posture: Posture,
    centroid: Vector2d,
    space: WorkingSpace,
    scaled_radii: Radii,
    limits: BodyLimits,
  ) -> Animal {
    let s = space.scale_factor;
    Animal {
      id,
      posture,
      centroid,
      prev_centroid: centroid,
      speed: Vector2d::zeros(),
      space,
      scaled_radii,
      radii: Radii {
        head: scaled_radii.head / s,
        front: scaled_radii.front / s,
        back: scaled_radii.back / s,
      },
      scaled_max_body_length: limits.max_body_length * s,
      scaled_max_width: limits.max_body_width * s,
      scaled_min_width: limits.min_body_width * s,
      candidates: vec![],
      mask: BodyMask::new(),
    }
  }

  pub fn posture(&self) -> &Posture {
    &self.posture
  }

  pub fn centroid(&self) -> &Vector2d {
    &self.centroid
  }

  pub fn radii(&self) -> &Radii {
    &self.radii
  }

  // Scaled body limits: maximum length, maximum width, minimum width.
  pub fn body_limits(&self) -> [f64; 3] {
    [self.scaled_max_body_length, self.scaled_max_width, self.scaled_min_width]
  }

  // Advances the posture by one frame. `image` is the padded foreground
  // mask in working space, `centroid` the blob centroid assigned to this
  // animal.
  pub fn track(
    &mut self,
    image: &Image,
    centroid: &Vector2d,
    frame_time: f64,
    options: &SearchOptions,
  ) -> Position {
    self.prev_centroid = self.centroid;
    self.centroid = *centroid;
    self.speed = SPEED_ALPHA * self.speed + (1. - SPEED_ALPHA) * (self.centroid - self.prev_centroid);
    trace!("Animal {} speed {:.2}.", self.id, self.speed.norm());

    self.tether();
    let baseline = self.baseline(options.speed_threshold);
    generate_candidates(&baseline, &self.scaled_radii, options.two_step, &mut self.candidates);
    trace!("Generated {} postures.", self.candidates.len());

    let center = self.posture.back;
    let mut best = 0;
    let mut best_score = i64::MIN;
    let mut baseline_score = 0;
    for (i, candidate) in self.candidates.iter().enumerate() {
      self.mask.render(&candidate.posture, &center, &self.scaled_radii);
      let score = self.mask.score(image, &center);
      if i == 0 { baseline_score = score }
      if score > best_score {
        best = i;
        best_score = score;
      }
    }

    if best_score > baseline_score {
      let winner = self.candidates[best];
      trace!("Animal {} takes {:?} ({} > {}).", self.id, winner.source, best_score, baseline_score);
      self.commit(winner.posture);
    }
    self.position(frame_time)
  }

  // Installs the winning posture and applies the normal to contracted
  // transition.
  fn commit(&mut self, posture: Posture) {
    self.posture = posture;
    if self.posture.is_contracted() { return }
    let r = &self.scaled_radii;
    let p = &mut self.posture;
    let d = distance(&p.back, &p.front) - r.back + r.front;
    if d <= r.front / 2. {
      debug!("Animal {} contracted.", self.id);
      let hd = distance(&p.back, &p.head);
      p.head = point_along_a_line(&p.back, &p.head, hd - d);
      p.front = p.back;
      p.mode = BodyMode::Contracted;
    }
  }

  // Drags the pose rigidly onto the centroid when the back runs away from it.
  fn tether(&mut self) {
    let target = self.space.scaled(&self.centroid);
    if distance(&self.posture.back, &target) > TETHER_DISTANCE {
      debug!("Animal {} tethered back to the centroid.", self.id);
      self.posture = self.posture.translated(&(target - self.posture.back));
    }
  }

  // The current posture carried along by the centroid displacement. An
  // animal that runs backwards fast is taken to have its head and back
  // swapped.
  fn baseline(&self, speed_threshold: f64) -> Posture {
    let disp = (self.centroid - self.prev_centroid) * self.space.scale_factor;
    let p = self.posture.translated(&disp);
    let backwards = (p.head - p.back).dot(&self.speed) < 0.
      && self.speed.norm() > speed_threshold
      && !p.is_contracted();
    if backwards {
      Posture::new(p.back, p.front, p.head, p.mode)
    }
    else {
      p
    }
  }

  pub fn position(&self, time: f64) -> Position {
    let p = &self.posture;
    Position {
      id: self.id,
      time,
      centroid_x: self.centroid[0],
      centroid_y: self.centroid[1],
      head_x: p.head[0],
      head_y: p.head[1],
      front_x: p.front[0],
      front_y: p.front[1],
      back_x: p.back[0],
      back_y: p.back[1],
      contracted: p.is_contracted(),
    }
  }

  pub fn get_position(&self) -> AnimalPosition {
    let p = &self.posture;
    AnimalPosition {
      head: self.space.to_frame(&p.head),
      front: self.space.to_frame(&p.front),
      back: self.space.to_frame(&p.back),
      contracted: p.is_contracted(),
      speed: self.speed,
    }
  }
}

fn closest(p: &Vector2d, points: &[Vector2d]) -> Option<usize> {
  points.iter()
    .enumerate()
    .min_by(|(_, a), (_, b)| (*a - p).norm_squared().total_cmp(&(*b - p).norm_squared()))
    .map(|(i, _)| i)
}
