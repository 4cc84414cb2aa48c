use crate::all::*;

// Tracker settings. Radii are in frame pixels, converted to working space
// pixels through the scale factor.
#[derive(Clone, Debug, PartialEq)]
#[derive(clap::Args, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
  #[clap(long, default_value = "1")]
  pub max_num_animals: usize,
  // Added to the Otsu level of the difference image.
  #[clap(long, default_value = "40")]
  pub component_threshold: f64,
  // Centroid speed above which backward motion swaps head and back.
  #[clap(long, default_value = "1.2")]
  pub speed_threshold: f64,

  // Body model.
  #[clap(long, default_value = "5")]
  pub head_radius: f64,
  #[clap(long, default_value = "7")]
  pub front_radius: f64,
  #[clap(long, default_value = "10")]
  pub back_radius: f64,
  #[clap(long, default_value = "60")]
  pub max_body_length: f64,
  #[clap(long, default_value = "30")]
  pub max_body_width: f64,
  #[clap(long, default_value = "30")]
  pub min_body_width: f64,

  // Zero padding around the working space image.
  #[clap(long, default_value = "20")]
  pub border: usize,
  // Frames in the median background.
  #[clap(long, default_value = "5")]
  pub background_frames: usize,
  // Resolution of the posture search. Native frame size if unset.
  #[clap(long)]
  pub working_width: Option<usize>,
  #[clap(long)]
  pub working_height: Option<usize>,
  // Rotate also the translated and slid candidates.
  #[clap(long)]
  pub two_step_postures: bool,
}

#[derive(Clone, Debug, PartialEq)]
#[derive(clap::Args, Deserialize)]
#[serde(default)]
pub struct OverlayOptions {
  #[clap(long, parse(try_from_str), default_value = "true")]
  pub show_model: bool,
  #[clap(long, parse(try_from_str), default_value = "true")]
  pub show_posture: bool,
  // Replace the displayed frame with the foreground mask.
  #[clap(long)]
  pub show_thresholded: bool,
  // Display to frame size ratio. Positions and radii are multiplied by it
  // before drawing.
  #[clap(long, default_value = "1")]
  pub image_scale: f64,
}

impl Default for TrackerConfig {
  fn default() -> TrackerConfig {
    TrackerConfig {
      max_num_animals: 1,
      component_threshold: 40.,
      speed_threshold: 1.2,
      head_radius: 5.,
      front_radius: 7.,
      back_radius: 10.,
      max_body_length: 60.,
      max_body_width: 30.,
      min_body_width: 30.,
      border: 20,
      background_frames: 5,
      working_width: None,
      working_height: None,
      two_step_postures: false,
    }
  }
}

impl Default for OverlayOptions {
  fn default() -> OverlayOptions {
    OverlayOptions {
      show_model: true,
      show_posture: true,
      show_thresholded: false,
      image_scale: 1.,
    }
  }
}

impl TrackerConfig {
  pub fn validate(&self) -> Result<()> {
    if self.max_num_animals == 0 {
      bail!("max_num_animals must be at least one.");
    }
    for (name, r) in [
      ("head_radius", self.head_radius),
      ("front_radius", self.front_radius),
      ("back_radius", self.back_radius),
    ] {
      if !(r > 0.) {
        bail!("{} must be positive, got {}.", name, r);
      }
    }
    if self.background_frames == 0 {
      bail!("background_frames must be at least one.");
    }
    if !self.speed_threshold.is_finite() || !self.component_threshold.is_finite() {
      bail!("Thresholds must be finite numbers.");
    }
    match (self.working_width, self.working_height) {
      (Some(0), _) | (_, Some(0)) => bail!("Working size must not be zero."),
      (Some(_), None) | (None, Some(_)) => bail!("Set both working_width and working_height or neither."),
      _ => {},
    }
    Ok(())
  }

  // Working space size and scale factor for frames of `frame_size`. The
  // frame is scaled uniformly so that its dominant dimension fits the
  // configured working size, the other one follows the aspect ratio.
  pub fn working_size(&self, frame_size: [usize; 2]) -> Result<([usize; 2], f64)> {
    if frame_size[0] == 0 || frame_size[1] == 0 {
      bail!("Invalid frame size {}x{}.", frame_size[0], frame_size[1]);
    }
    let (w, h) = match (self.working_width, self.working_height) {
      (Some(w), Some(h)) => (w as f64, h as f64),
      _ => return Ok((frame_size, 1.)),
    };
    let (fw, fh) = (frame_size[0] as f64, frame_size[1] as f64);
    let scale_factor = (w / fw).min(h / fh);
    let size = [
      ((fw * scale_factor).round() as usize).max(1),
      ((fh * scale_factor).round() as usize).max(1),
    ];
    Ok((size, scale_factor))
  }

  pub fn limits(&self) -> BodyLimits {
    BodyLimits {
      max_body_length: self.max_body_length,
      max_body_width: self.max_body_width,
      min_body_width: self.min_body_width,
    }
  }
}

#[derive(Default, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
  pub tracker: Option<TrackerConfig>,
  pub overlay: Option<OverlayOptions>,
}

impl ConfigFile {
  pub fn load(path: &Path) -> Result<ConfigFile> {
    let s = std::fs::read_to_string(path)
      .context(format!("Failed to read file {}.", path.display()))?;
    ConfigFile::parse(&s)
      .context(format!("Failed to parse {}.", path.display()))
  }

  pub fn parse(s: &str) -> Result<ConfigFile> {
    let config: ConfigFile = serde_json::from_str(s)?;
    if let Some(tracker) = &config.tracker {
      tracker.validate()?;
    }
    Ok(config)
  }
}
