use mousetrack::all::*;

use std::io::{ErrorKind, Read};
use std::process::{Child, ChildStdout, Command, Stdio};

// Decodes a video file into BGR frames through an ffmpeg child process.
pub struct VideoInput {
  child: Child,
  stdout: ChildStdout,
  pub width: usize,
  pub height: usize,
  pub fps: f64,
  frame: ColorImage,
  index: usize,
}

#[derive(Deserialize)]
struct Probe {
  streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
  width: usize,
  height: usize,
  r_frame_rate: String,
}

impl VideoInput {
  pub fn new(path: &Path) -> Result<VideoInput> {
    let (width, height, fps) = probe(path)?;
    info!("Video {}: {}x{} at {:.2} fps.", path.display(), width, height, fps);
    let mut child = Command::new("ffmpeg")
      .arg("-i").arg(path)
      .args(["-f", "rawvideo", "-vcodec", "rawvideo", "-vsync", "vfr", "-pix_fmt", "bgr24"])
      .args(["-loglevel", "error", "-"])
      .stdout(Stdio::piped())
      .spawn()
      .context("Failed to start ffmpeg.")?;
    let stdout = child.stdout.take().ok_or(anyhow!("ffmpeg output is not piped."))?;
    Ok(VideoInput {
      child,
      stdout,
      width,
      height,
      fps,
      frame: ColorImage::new(width, height),
      index: 0,
    })
  }

  // Next frame and its time in seconds. None at the end of the video.
  pub fn read(&mut self) -> Result<Option<(&ColorImage, f64)>> {
    match self.stdout.read_exact(&mut self.frame.data) {
      Ok(()) => {},
      Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
      Err(err) => return Err(err).context("Reading bytes from video input failed."),
    }
    let time = self.index as f64 / self.fps;
    self.index += 1;
    Ok(Some((&self.frame, time)))
  }
}

impl Drop for VideoInput {
  fn drop(&mut self) {
    // Does not matter if ffmpeg already exited.
    let _ = self.child.kill();
    let _ = self.child.wait();
  }
}

fn probe(path: &Path) -> Result<(usize, usize, f64)> {
  let output = Command::new("ffprobe")
    .args(["-v", "error", "-select_streams", "v:0"])
    .args(["-show_entries", "stream=width,height,r_frame_rate", "-of", "json"])
    .arg(path)
    .output()
    .context("Failed to run ffprobe.")?;
  if !output.status.success() {
    bail!("ffprobe failed on {}: {}", path.display(), String::from_utf8_lossy(&output.stderr).trim());
  }
  parse_probe(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe(s: &str) -> Result<(usize, usize, f64)> {
  let probe: Probe = serde_json::from_str(s).context("Failed to parse ffprobe output.")?;
  let stream = probe.streams.first().ok_or(anyhow!("No video stream found."))?;
  if stream.width == 0 || stream.height == 0 {
    bail!("Invalid video size {}x{}.", stream.width, stream.height);
  }
  Ok((stream.width, stream.height, parse_frame_rate(&stream.r_frame_rate)?))
}

// ffprobe reports rates as fractions, eg "30000/1001".
fn parse_frame_rate(s: &str) -> Result<f64> {
  let parse = |v: &str| v.trim().parse::<f64>().context(format!("Invalid frame rate `{}`.", s));
  let fps = match s.split_once('/') {
    Some((n, d)) => parse(n)? / parse(d)?,
    None => parse(s)?,
  };
  if !fps.is_finite() || fps <= 0. {
    bail!("Invalid frame rate `{}`.", s);
  }
  Ok(fps)
}
