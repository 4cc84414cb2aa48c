use crate::all::*;

// Colored log lines prefixed with the source location.
pub fn format_log(
  buf: &mut env_logger::fmt::Formatter,
  record: &log::Record,
) -> std::io::Result<()> {
  use std::io::Write;
  let mut style = buf.style();
  use env_logger::fmt::Color::*;
  use log::Level::*;
  style.set_color(match record.level() {
    Error => Red,
    Warn => Yellow,
    Info => Green,
    Debug => Magenta,
    Trace => Blue,
  });

  let location = format!("{}:{}",
    record.file().unwrap_or("?"),
    record.line().unwrap_or(0),
  );
  writeln!(buf, "{}", style.value(format!("{:30}{}", location, record.args())))
}

// Logs go to stderr, stdout is reserved for the position records.
pub fn init_logging(level: LevelFilter) {
  env_logger::Builder::new()
    .filter_level(level)
    .format(format_log)
    .target(env_logger::Target::Stderr)
    .init();
}

// Parses "x,y".
pub fn parse_point(s: &str) -> Result<Vector2d> {
  let mut it = s.split(',').map(|v| v.trim().parse::<f64>());
  match (it.next(), it.next(), it.next()) {
    (Some(Ok(x)), Some(Ok(y)), None) => Ok(Vector2d::new(x, y)),
    _ => bail!("Expected a point as x,y, got `{}`.", s),
  }
}
