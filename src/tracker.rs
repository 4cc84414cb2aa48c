use crate::all::*;

// Horizontal half length of the seed segment of `add_animal_auto()`.
const AUTO_SEED_OFFSET: f64 = 10.;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackerState {
  // No background yet.
  Inactive,
  Ready,
  // All animal slots are taken.
  Tracking,
  AcquiringBackground,
}

impl fmt::Display for TrackerState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let label = match self {
      TrackerState::Inactive => "Inactive",
      TrackerState::Ready => "Ready",
      TrackerState::Tracking => "Tracking",
      TrackerState::AcquiringBackground => "BG Acq.",
    };
    write!(f, "{}", label)
  }
}

// Notifications for a user interface. The tracker works the same without one.
pub trait TrackerObserver {
  fn state_changed(&mut self, state: TrackerState);
  fn animal_count_changed(&mut self, count: usize, max: usize);
}

#[derive(Debug, PartialEq)]
pub enum FrameOutcome {
  // No background to compare against.
  Inactive,
  // The frame went into the background median.
  AcquiringBackground { remaining: usize },
  // Last frame of the background median, the new background is installed.
  BackgroundInstalled,
  // Frame size differs from the one the tracker was built for.
  Rejected,
  // Nothing stands out from the background.
  NoDetection,
  Tracked(Vec<Position>),
}

pub struct Tracker {
  config: TrackerConfig,
  overlay: OverlayOptions,
  frame_size: [usize; 2],
  space: WorkingSpace,
  scaled_radii: Radii,
  state: TrackerState,
  background: Option<ColorImage>,
  background_buffer: Vec<ColorImage>,
  background_countdown: usize,
  animals: Vec<Animal>,
  centroids: Vec<Vector2d>,
  extractor: ForegroundExtractor,
  observer: Option<Box<dyn TrackerObserver>>,
}

impl Tracker {
  pub fn new(frame_size: [usize; 2], config: TrackerConfig, overlay: OverlayOptions) -> Result<Tracker> {
    config.validate().context("Invalid tracker configuration.")?;
    let (working_size, scale_factor) = config.working_size(frame_size)?;
    info!("Tracking {}x{} frames at {}x{}, scale factor {:.3}.",
      frame_size[0], frame_size[1], working_size[0], working_size[1], scale_factor);
    let scaled_radii = Radii {
      head: config.head_radius * scale_factor,
      front: config.front_radius * scale_factor,
      back: config.back_radius * scale_factor,
    };
    Ok(Tracker {
      frame_size,
      space: WorkingSpace {
        scale_factor,
        border: config.border as f64,
      },
      scaled_radii,
      state: TrackerState::Inactive,
      background: None,
      background_buffer: vec![],
      background_countdown: 0,
      animals: vec![],
      centroids: vec![],
      extractor: ForegroundExtractor::new(config.border, working_size),
      observer: None,
      config,
      overlay,
    })
  }

  pub fn state(&self) -> TrackerState {
    self.state
  }

  pub fn scale_factor(&self) -> f64 {
    self.space.scale_factor
  }

  pub fn config(&self) -> &TrackerConfig {
    &self.config
  }

  pub fn background(&self) -> Option<&ColorImage> {
    self.background.as_ref()
  }

  pub fn animals(&self) -> &[Animal] {
    &self.animals
  }

  // Blob centroids of the last processed frame, frame coordinates.
  pub fn centroids(&self) -> &[Vector2d] {
    &self.centroids
  }

  pub fn set_observer(&mut self, observer: Box<dyn TrackerObserver>) {
    self.observer = Some(observer);
  }

  pub fn set_component_threshold(&mut self, threshold: f64) {
    self.config.component_threshold = threshold;
  }

  pub fn set_speed_threshold(&mut self, threshold: f64) {
    self.config.speed_threshold = threshold;
  }

  pub fn overlay_mut(&mut self) -> &mut OverlayOptions {
    &mut self.overlay
  }

  fn set_state(&mut self, state: TrackerState) {
    if state != self.state {
      debug!("Tracker state {} -> {}.", self.state, state);
    }
    self.state = state;
    if let Some(observer) = &mut self.observer {
      observer.state_changed(state);
    }
  }

  fn notify_animal_count(&mut self) {
    let (count, max) = (self.animals.len(), self.config.max_num_animals);
    if let Some(observer) = &mut self.observer {
      observer.animal_count_changed(count, max);
    }
  }

  pub fn set_background(&mut self, frame: &ColorImage) -> Result<()> {
    if frame.width != self.frame_size[0] || frame.height != self.frame_size[1] {
      bail!("Background size {}x{} does not match the frame size {}x{}.",
        frame.width, frame.height, self.frame_size[0], self.frame_size[1]);
    }
    self.install_background(frame.clone());
    Ok(())
  }

  fn install_background(&mut self, background: ColorImage) {
    info!("Background installed.");
    self.background = Some(background);
    self.set_state(TrackerState::Ready);
  }

  // The next `background_frames` frames given to `track()` make up the
  // median background.
  pub fn grab_background(&mut self) {
    info!("Acquiring background from {} frames.", self.config.background_frames);
    self.background_countdown = self.config.background_frames;
    self.background_buffer.clear();
    self.set_state(TrackerState::AcquiringBackground);
  }

  // Seeds an animal along `start -> end` (frame coordinates), back at the
  // start. Returns the new animal's id, or None when all slots are taken.
  pub fn add_animal(&mut self, start: Vector2d, end: Vector2d) -> Option<usize> {
    if self.animals.len() >= self.config.max_num_animals {
      warn!("Attempting to create too many animals, the maximum is {}.", self.config.max_num_animals);
      return None;
    }
    let id = self.animals.len();
    info!("Adding animal {}.", id);
    self.animals.push(Animal::new(
      id,
      start,
      end,
      &self.centroids,
      self.space,
      self.scaled_radii,
      self.config.limits(),
    ));
    if self.animals.len() == self.config.max_num_animals {
      self.set_state(TrackerState::Tracking);
    }
    self.notify_animal_count();
    Some(id)
  }

  // Seeds an animal across the first detected centroid.
  pub fn add_animal_auto(&mut self) -> Option<usize> {
    if self.state == TrackerState::Inactive { return None }
    let c = match self.centroids.first() {
      Some(c) => *c,
      None => {
        debug!("No detection to seed an animal on.");
        return None;
      },
    };
    let offset = Vector2d::new(AUTO_SEED_OFFSET, 0.);
    self.add_animal(c - offset, c + offset)
  }

  pub fn delete_all_animals(&mut self) {
    info!("Deleting {} animals.", self.animals.len());
    self.animals.clear();
    self.set_state(TrackerState::Ready);
    self.notify_animal_count();
  }

  pub fn get_animal_positions(&self) -> Vec<AnimalPosition> {
    self.animals.iter().map(|a| a.get_position()).collect()
  }

  // Processes one frame and draws the detections and fitted postures into
  // it.
  pub fn track(&mut self, frame: &mut ColorImage, frame_time: f64) -> FrameOutcome {
    trace!("Start tracking {} animals.", self.animals.len());
    if frame.width != self.frame_size[0] || frame.height != self.frame_size[1] {
      warn!("Rejected a {}x{} frame, expected {}x{}.",
        frame.width, frame.height, self.frame_size[0], self.frame_size[1]);
      return FrameOutcome::Rejected;
    }

    if self.background_countdown > 0 {
      self.background_buffer.push(frame.clone());
      self.background_countdown -= 1;
      if self.background_countdown > 0 {
        return FrameOutcome::AcquiringBackground { remaining: self.background_countdown };
      }
      let frames = std::mem::take(&mut self.background_buffer);
      return match median_image(&frames) {
        Some(background) => {
          self.install_background(background);
          FrameOutcome::BackgroundInstalled
        },
        None => {
          warn!("Background acquisition failed.");
          FrameOutcome::Inactive
        },
      };
    }

    let background = match &self.background {
      Some(background) => background,
      None => return FrameOutcome::Inactive,
    };
    let foreground = match self.extractor.process(frame, background, self.config.component_threshold) {
      Some(foreground) => foreground,
      None => {
        debug!("No foreground at time {:.3}.", frame_time);
        self.centroids.clear();
        return FrameOutcome::NoDetection;
      },
    };
    self.centroids = foreground.centroids;
    let positions = self.track_animals(&foreground.mask, frame_time);

    if self.overlay.show_thresholded {
      draw_thresholded(frame, &foreground.mask, self.config.border);
    }
    draw_centroids(frame, &self.centroids);
    for animal in &self.animals {
      draw_animal(frame, &animal.get_position(), animal.radii(), &self.overlay);
    }
    FrameOutcome::Tracked(positions)
  }

  fn track_animals(&mut self, mask: &Image, frame_time: f64) -> Vec<Position> {
    let options = SearchOptions {
      speed_threshold: self.config.speed_threshold,
      two_step: self.config.two_step_postures,
    };
    let previous: Vec<Vector2d> = self.animals.iter().map(|a| *a.centroid()).collect();
    let assignment = assign_centroids(&previous, &self.centroids);
    self.animals.iter_mut()
      .zip(assignment)
      .map(|(animal, i)| match i {
        Some(i) => animal.track(mask, &self.centroids[i], frame_time, &options),
        None => animal.position(frame_time),
      })
      .collect()
  }
}

// Gives each animal, in order, the nearest centroid not taken by an earlier
// animal. Animals left over share their nearest centroid.
pub fn assign_centroids(animals: &[Vector2d], centroids: &[Vector2d]) -> Vec<Option<usize>> {
  let mut taken = vec![false; centroids.len()];
  let nearest = |a: &Vector2d, free_only: bool, taken: &[bool]| {
    centroids.iter()
      .enumerate()
      .filter(|(i, _)| !free_only || !taken[*i])
      .min_by(|(_, p), (_, q)| (*p - a).norm_squared().total_cmp(&(*q - a).norm_squared()))
      .map(|(i, _)| i)
  };
  animals.iter().map(|a| {
    let i = nearest(a, true, &taken).or_else(|| nearest(a, false, &taken))?;
    taken[i] = true;
    Some(i)
  }).collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;
  use std::rc::Rc;

  const GRAY: Bgr = [100, 100, 100];
  const BRIGHT: Bgr = [250, 250, 250];

  #[derive(Default)]
  struct Log {
    states: Vec<TrackerState>,
    counts: Vec<(usize, usize)>,
  }

  struct Recorder(Rc<RefCell<Log>>);

  impl TrackerObserver for Recorder {
    fn state_changed(&mut self, state: TrackerState) {
      self.0.borrow_mut().states.push(state);
    }

    fn animal_count_changed(&mut self, count: usize, max: usize) {
      self.0.borrow_mut().counts.push((count, max));
    }
  }

  fn tracker(config: TrackerConfig) -> Tracker {
    Tracker::new([200, 200], config, OverlayOptions::default()).unwrap()
  }

  fn ready_tracker() -> Tracker {
    let mut t = tracker(TrackerConfig::default());
    t.set_background(&ColorImage::filled(200, 200, GRAY)).unwrap();
    t
  }

  fn disk_frame(cx: i32, cy: i32, r: i32) -> ColorImage {
    let mut frame = ColorImage::filled(200, 200, GRAY);
    for y in (cy - r)..=(cy + r) {
      for x in (cx - r)..=(cx + r) {
        if (x - cx) * (x - cx) + (y - cy) * (y - cy) <= r * r {
          frame.put(Pixel::new(x, y), BRIGHT);
        }
      }
    }
    frame
  }

  fn body_frame(posture: &Posture) -> ColorImage {
    let mut frame = ColorImage::filled(200, 200, GRAY);
    let radii = Radii { head: 5., front: 7., back: 10. };
    rasterize_body(posture, &radii, [200, 200], &mut |x: i32, y: i32| {
      frame.set_pixel(x as usize, y as usize, BRIGHT);
    });
    frame
  }

  fn positions(outcome: FrameOutcome) -> Vec<Position> {
    match outcome {
      FrameOutcome::Tracked(p) => p,
      other => panic!("Expected tracked positions, got {:?}.", other),
    }
  }

  #[test]
  fn test_state_labels() {
    assert_eq!(TrackerState::Inactive.to_string(), "Inactive");
    assert_eq!(TrackerState::Ready.to_string(), "Ready");
    assert_eq!(TrackerState::Tracking.to_string(), "Tracking");
    assert_eq!(TrackerState::AcquiringBackground.to_string(), "BG Acq.");
  }

  #[test]
  fn test_new_rejects_bad_config() {
    let mut config = TrackerConfig::default();
    config.back_radius = -1.;
    assert!(Tracker::new([200, 200], config, OverlayOptions::default()).is_err());
    assert!(Tracker::new([0, 200], TrackerConfig::default(), OverlayOptions::default()).is_err());
  }

  #[test]
  fn test_scale_factor() {
    let mut config = TrackerConfig::default();
    config.working_width = Some(100);
    config.working_height = Some(100);
    let t = tracker(config);
    assert_eq!(t.scale_factor(), 0.5);
  }

  #[test]
  fn test_inactive_without_background() {
    let mut t = tracker(TrackerConfig::default());
    assert_eq!(t.state(), TrackerState::Inactive);
    let mut frame = disk_frame(100, 100, 15);
    assert_eq!(t.track(&mut frame, 0.), FrameOutcome::Inactive);
    assert_eq!(t.add_animal_auto(), None);
  }

  #[test]
  fn test_capacity_cap() {
    let mut t = ready_tracker();
    let log = Rc::new(RefCell::new(Log::default()));
    t.set_observer(Box::new(Recorder(log.clone())));
    let start = Vector2d::new(60., 100.);
    let end = Vector2d::new(140., 100.);
    assert_eq!(t.add_animal(start, end), Some(0));
    assert_eq!(t.state(), TrackerState::Tracking);
    assert_eq!(t.add_animal(start, end), None);
    assert_eq!(t.animals().len(), 1);

    t.delete_all_animals();
    assert!(t.animals().is_empty());
    assert_eq!(t.state(), TrackerState::Ready);

    let log = log.borrow();
    assert_eq!(log.states, vec![TrackerState::Tracking, TrackerState::Ready]);
    assert_eq!(log.counts, vec![(1, 1), (0, 1)]);
  }

  #[test]
  fn test_ready_until_all_slots_taken() {
    let mut config = TrackerConfig::default();
    config.max_num_animals = 2;
    let mut t = tracker(config);
    t.set_background(&ColorImage::filled(200, 200, GRAY)).unwrap();
    t.add_animal(Vector2d::new(20., 20.), Vector2d::new(60., 20.));
    assert_eq!(t.state(), TrackerState::Ready);
    assert_eq!(t.add_animal(Vector2d::new(20., 80.), Vector2d::new(60., 80.)), Some(1));
    assert_eq!(t.state(), TrackerState::Tracking);
  }

  #[test]
  fn test_background_median() {
    let mut t = tracker(TrackerConfig::default());
    t.grab_background();
    assert_eq!(t.state(), TrackerState::AcquiringBackground);
    for (i, v) in [10, 20, 30, 40, 50].iter().enumerate() {
      let mut frame = ColorImage::filled(200, 200, [*v, *v, *v]);
      let outcome = t.track(&mut frame, i as f64);
      if i < 4 {
        assert_eq!(outcome, FrameOutcome::AcquiringBackground { remaining: 4 - i });
        assert_eq!(t.state(), TrackerState::AcquiringBackground);
      }
      else {
        assert_eq!(outcome, FrameOutcome::BackgroundInstalled);
      }
    }
    assert_eq!(t.state(), TrackerState::Ready);
    assert_eq!(t.background(), Some(&ColorImage::filled(200, 200, [30, 30, 30])));
    assert!(t.background_buffer.is_empty());
  }

  #[test]
  fn test_set_background_size_mismatch() {
    let mut t = tracker(TrackerConfig::default());
    assert!(t.set_background(&ColorImage::filled(100, 200, GRAY)).is_err());
    assert_eq!(t.state(), TrackerState::Inactive);
  }

  #[test]
  fn test_rejects_wrong_frame_size() {
    let mut t = ready_tracker();
    let mut frame = ColorImage::filled(100, 100, GRAY);
    assert_eq!(t.track(&mut frame, 0.), FrameOutcome::Rejected);
  }

  #[test]
  fn test_static_scene() {
    let mut t = ready_tracker();
    let mut frame = ColorImage::filled(200, 200, GRAY);
    assert_eq!(t.track(&mut frame, 0.), FrameOutcome::NoDetection);
    assert!(t.centroids().is_empty());
    assert_eq!(frame, ColorImage::filled(200, 200, GRAY));
  }

  #[test]
  fn test_blob_keeps_animal_inside() {
    let mut t = ready_tracker();
    t.add_animal(Vector2d::new(60., 100.), Vector2d::new(140., 100.));
    let mut frame = disk_frame(100, 100, 40);
    let p = positions(t.track(&mut frame, 0.5));
    assert_eq!(p.len(), 1);
    assert_eq!(p[0].time, 0.5);
    assert!((Vector2d::new(p[0].centroid_x, p[0].centroid_y) - Vector2d::new(100., 100.)).norm() < 1e-9);

    let center = Vector2d::new(100., 100.);
    let a = &t.get_animal_positions()[0];
    for q in [a.head, a.front, a.back] {
      assert!(distance(&q, &center) < 45.);
    }
    assert!(!a.contracted);
  }

  #[test]
  fn test_follows_translation() {
    let mut t = ready_tracker();
    // Seed segment of 44 px puts the joints at 10, 27 and 39 px from the start.
    let start = Vector2d::new(60., 100.);
    let end = Vector2d::new(104., 100.);
    let truth = Posture::new(
      Vector2d::new(99., 100.),
      Vector2d::new(87., 100.),
      Vector2d::new(70., 100.),
      BodyMode::Normal,
    );
    let mut frame = body_frame(&truth);
    assert_eq!(positions(t.track(&mut frame, 0.)), vec![]);
    assert_eq!(t.add_animal(start, end), Some(0));

    for k in 1..4 {
      let shift = Vector2d::new(4. * k as f64, 0.);
      let mut frame = body_frame(&truth.translated(&shift));
      let p = positions(t.track(&mut frame, k as f64));
      assert_eq!(p.len(), 1);
      let a = &t.get_animal_positions()[0];
      assert!(distance(&a.back, &(truth.back + shift)) < 3.);
      assert!(distance(&a.front, &(truth.front + shift)) < 3.);
      assert!(distance(&a.head, &(truth.head + shift)) < 3.);
      assert!(!a.contracted);
    }
  }

  #[test]
  fn test_wide_frame_square_working_size() {
    let mut config = TrackerConfig::default();
    config.working_width = Some(100);
    config.working_height = Some(100);
    let mut t = Tracker::new([200, 100], config, OverlayOptions::default()).unwrap();
    assert_eq!(t.scale_factor(), 0.5);
    t.set_background(&ColorImage::filled(200, 100, GRAY)).unwrap();

    let truth = Posture::new(
      Vector2d::new(99., 50.),
      Vector2d::new(87., 50.),
      Vector2d::new(70., 50.),
      BodyMode::Normal,
    );
    let mut frame = ColorImage::filled(200, 100, GRAY);
    let radii = Radii { head: 5., front: 7., back: 10. };
    rasterize_body(&truth, &radii, [200, 100], &mut |x: i32, y: i32| {
      frame.set_pixel(x as usize, y as usize, BRIGHT);
    });
    let mut first = frame.clone();
    assert_eq!(positions(t.track(&mut first, 0.)), vec![]);
    assert_eq!(t.add_animal(Vector2d::new(60., 50.), Vector2d::new(104., 50.)), Some(0));

    for k in 1..9 {
      let mut f = frame.clone();
      assert_eq!(positions(t.track(&mut f, k as f64)).len(), 1);
      let a = &t.get_animal_positions()[0];
      assert!(distance(&a.back, &truth.back) < 4.);
      assert!(distance(&a.front, &truth.front) < 4.);
      assert!(distance(&a.head, &truth.head) < 4.);
      assert!(!a.contracted);
    }
  }

  #[test]
  fn test_add_animal_auto() {
    let mut t = ready_tracker();
    let mut frame = disk_frame(100, 80, 12);
    t.track(&mut frame, 0.);
    assert_eq!(t.add_animal_auto(), Some(0));
    let a = &t.animals()[0];
    assert!((a.centroid() - Vector2d::new(100., 80.)).norm() < 1e-9);
    let p = a.get_position();
    assert!((p.back - Vector2d::new(90. + 20. * 10. / 44., 80.)).norm() < 1e-9);
  }

  #[test]
  fn test_overlay_draws_into_frame() {
    let mut t = ready_tracker();
    let mut frame = disk_frame(100, 100, 20);
    t.track(&mut frame, 0.);
    assert_eq!(frame.pixel(102, 100), RED);

    t.overlay_mut().show_thresholded = true;
    let mut frame = disk_frame(100, 100, 20);
    t.track(&mut frame, 1.);
    assert_eq!(frame.pixel(0, 0), [0, 0, 0]);
    assert_eq!(frame.pixel(110, 100), WHITE);
  }

  #[test]
  fn test_live_setters() {
    let mut t = ready_tracker();
    t.set_speed_threshold(3.);
    t.set_component_threshold(10.);
    assert_eq!(t.config().speed_threshold, 3.);
    assert_eq!(t.config().component_threshold, 10.);
  }

  #[test]
  fn test_assign_centroids() {
    let animals = [Vector2d::new(0., 0.), Vector2d::new(10., 0.)];
    let centroids = [Vector2d::new(9., 0.), Vector2d::new(1., 0.)];
    assert_eq!(assign_centroids(&animals, &centroids), vec![Some(1), Some(0)]);

    // Both animals near the same blob: the second takes the other one.
    let animals = [Vector2d::new(0., 0.), Vector2d::new(1., 0.)];
    let centroids = [Vector2d::new(0., 0.), Vector2d::new(50., 0.)];
    assert_eq!(assign_centroids(&animals, &centroids), vec![Some(0), Some(1)]);

    // One blob for two animals is shared.
    assert_eq!(assign_centroids(&animals, &centroids[..1]), vec![Some(0), Some(0)]);
    assert_eq!(assign_centroids(&animals, &[]), vec![None, None]);
  }
}
