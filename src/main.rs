mod event_loop;
mod video;

use mousetrack::all::*;

use clap::Parser;
use event_loop::run_window;
use std::io::{BufWriter, Stdout, Write};
use video::VideoInput;

// Replays a recorded video through the tracker and writes one JSON line per
// animal per frame to stdout.
#[derive(Parser)]
struct Args {
  #[clap(short, long)]
  input: PathBuf,
  // Frame index at which the background acquisition starts.
  #[clap(long, default_value = "0")]
  background_frame: usize,
  // Frame index at which an animal is seeded.
  #[clap(long)]
  add_animal_frame: Option<usize>,
  // Seed segment "x,y" in frame pixels, back at the start. Without it the
  // animal is seeded on the detected centroid.
  #[clap(long, parse(try_from_str = parse_point))]
  start: Option<Vector2d>,
  #[clap(long, parse(try_from_str = parse_point))]
  end: Option<Vector2d>,
  #[clap(long)]
  show: bool,
  // JSON file with optional "tracker" and "overlay" sections. Overrides the
  // command line values.
  #[clap(long)]
  config: Option<PathBuf>,
  #[clap(long, default_value = "info")]
  log_level: LevelFilter,
  #[clap(flatten)]
  tracker: TrackerConfig,
  #[clap(flatten)]
  overlay: OverlayOptions,
}

pub struct Replay {
  video: VideoInput,
  tracker: Tracker,
  background_frame: usize,
  add_animal_frame: Option<usize>,
  seed: Option<(Vector2d, Vector2d)>,
  index: usize,
  display: ColorImage,
  out: BufWriter<Stdout>,
}

impl Replay {
  // Processes the next frame. False at the end of the video.
  pub fn step(&mut self) -> Result<bool> {
    let time = match self.video.read()? {
      Some((frame, time)) => {
        self.display.clone_from(frame);
        time
      },
      None => return Ok(false),
    };
    if self.index == self.background_frame {
      self.tracker.grab_background();
    }
    let outcome = self.tracker.track(&mut self.display, time);
    if self.add_animal_frame == Some(self.index) {
      match self.seed {
        Some((start, end)) => self.tracker.add_animal(start, end),
        None => self.tracker.add_animal_auto(),
      };
    }
    if let FrameOutcome::Tracked(positions) = outcome {
      for position in &positions {
        serde_json::to_writer(&mut self.out, position)?;
        writeln!(self.out)?;
      }
    }
    self.index += 1;
    Ok(true)
  }

  pub fn display(&self) -> &ColorImage {
    &self.display
  }
}

fn handle_error(err: &anyhow::Error) {
  eprintln!("Error:");
  for (i, e) in err.chain().enumerate() {
    eprintln!("  {}: {}", i + 1, e);
  }
}

fn main() {
  if let Err(err) = run() {
    handle_error(&err);
    std::process::exit(1);
  }
}

fn run() -> Result<()> {
  let args = Args::parse();
  init_logging(args.log_level);

  let mut tracker_config = args.tracker;
  let mut overlay = args.overlay;
  if let Some(path) = &args.config {
    let file = ConfigFile::load(path)?;
    if let Some(c) = file.tracker { tracker_config = c }
    if let Some(o) = file.overlay { overlay = o }
  }
  let seed = match (args.start, args.end) {
    (Some(start), Some(end)) => Some((start, end)),
    (None, None) => None,
    _ => bail!("Give both --start and --end, or neither."),
  };

  let video = VideoInput::new(&args.input)
    .context(format!("Failed to open video {}.", args.input.display()))?;
  let (width, height) = (video.width, video.height);
  let tracker = Tracker::new([width, height], tracker_config, overlay)?;
  let mut replay = Replay {
    video,
    tracker,
    background_frame: args.background_frame,
    add_animal_frame: args.add_animal_frame,
    seed,
    index: 0,
    display: ColorImage::new(width, height),
    out: BufWriter::new(std::io::stdout()),
  };

  if args.show {
    run_window(&mut replay, width, height)?;
  }
  else {
    while replay.step()? {}
  }
  replay.out.flush()?;
  info!("Processed {} frames.", replay.index);
  Ok(())
}
