// NOTE This kind of import-all file isn't a common Rust idiom.

pub use crate::{
  animal::*,
  body_mask::*,
  foreground::*,
  geometry::*,
  image::*,
  overlay::*,
  parameters::*,
  posture::*,
  tracker::*,
  types::*,
  util::*,
};

pub use {
  std::{
    fmt,
    ops::Index,
    path::{Path, PathBuf},
  },
  log::{debug, error, info, trace, warn, LevelFilter},
  anyhow::{anyhow, bail, Context as AnyhowContext, Result},
  serde::{Deserialize, Serialize},
};
