use crate::all::*;

use nalgebra::Rotation2;

// Rigid shifts along the body axis, pixels.
const SHIFTS: std::ops::RangeInclusive<i32> = -10..=10;
// Single joint slides along a body segment, pixels.
const SLIDES: std::ops::RangeInclusive<i32> = -5..=5;
// Extensions of the front point out of the contracted posture, pixels.
const EXPANSIONS: [f64; 3] = [2., 4., 6.];
// Head rotations whose back-front-head cosine exceeds this fold the head
// back over the body and are dropped.
const MAX_HEAD_FOLD_COSINE: f64 = 0.1;

lazy_static! {
  // -20 to 20 degrees in steps of 4.
  static ref ROTATIONS: Vec<Rotation2<f64>> = degrees((-20..=20).step_by(4));
  // Full circle in steps of 20 degrees, for a head curled up at the back.
  static ref COARSE_ROTATIONS: Vec<Rotation2<f64>> = degrees((20..=340).step_by(20));
  static ref FINE_ROTATIONS: Vec<Rotation2<f64>> = degrees([-20, -10, 10, 20]);
}

fn degrees<I: IntoIterator<Item = i32>>(angles: I) -> Vec<Rotation2<f64>> {
  angles.into_iter()
    .map(|a| Rotation2::new((a as f64).to_radians()))
    .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BodyMode {
  Normal,
  // Curled up: front and back coincide.
  Contracted,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Posture {
  pub head: Vector2d,
  pub front: Vector2d,
  pub back: Vector2d,
  pub mode: BodyMode,
}

// Joint radii in working space pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Radii {
  pub head: f64,
  pub front: f64,
  pub back: f64,
}

// The primitive moves, essentially the dynamics model of the animal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Move {
  // The previous posture carried along by the centroid displacement.
  Baseline,
  MoveBack,
  MoveFront,
  MoveHead,
  RotateFront,
  RotateHead,
  MoveBackContracted,
  MoveHeadContracted,
  RotateHeadContracted,
  // The only way out of the contracted mode.
  MoveFrontContracted,
}

#[derive(Clone, Copy, Debug)]
pub struct Candidate {
  pub posture: Posture,
  pub source: Move,
}

impl Posture {
  pub fn new(head: Vector2d, front: Vector2d, back: Vector2d, mode: BodyMode) -> Posture {
    Posture { head, front, back, mode }
  }

  pub fn translated(&self, d: &Vector2d) -> Posture {
    Posture {
      head: self.head + d,
      front: self.front + d,
      back: self.back + d,
      mode: self.mode,
    }
  }

  pub fn is_contracted(&self) -> bool {
    self.mode == BodyMode::Contracted
  }
}

impl Move {
  // Slides first, then rotations.
  pub const NORMAL: [Move; 5] = [
    Move::MoveBack,
    Move::MoveFront,
    Move::MoveHead,
    Move::RotateFront,
    Move::RotateHead,
  ];

  pub const CONTRACTED: [Move; 4] = [
    Move::MoveBackContracted,
    Move::MoveHeadContracted,
    Move::RotateHeadContracted,
    Move::MoveFrontContracted,
  ];

  // Appends the postures reachable from `p` with this move.
  pub fn apply(self, p: &Posture, radii: &Radii, out: &mut Vec<Candidate>) {
    let mut push = |posture: Posture| out.push(Candidate { posture, source: self });
    match self {
      Move::Baseline => push(*p),
      Move::MoveBack => {
        for d in SHIFTS {
          let moved = point_along_a_line(&p.back, &p.front, d as f64);
          push(p.translated(&(moved - p.back)));
        }
      },
      Move::MoveFront => {
        let (min, max) = (radii.back - radii.front, radii.back + radii.front);
        let cd = distance(&p.back, &p.front);
        for d in slides(cd, min, max) {
          let moved = point_along_a_line(&p.back, &p.front, d);
          push(Posture::new(p.head + (moved - p.front), moved, p.back, BodyMode::Normal));
        }
      },
      Move::MoveHead => {
        let (min, max) = (radii.front - radii.head, radii.front + radii.head);
        let cd = distance(&p.front, &p.head);
        for d in slides(cd, min, max) {
          let moved = point_along_a_line(&p.front, &p.head, d);
          push(Posture::new(moved, p.front, p.back, BodyMode::Normal));
        }
      },
      Move::RotateFront => {
        for r in ROTATIONS.iter() {
          push(Posture::new(
            rotate_with(&p.head, &p.back, r),
            rotate_with(&p.front, &p.back, r),
            p.back,
            BodyMode::Normal,
          ));
        }
      },
      Move::RotateHead => {
        for r in ROTATIONS.iter() {
          let head = rotate_with(&p.head, &p.front, r);
          if cosine(&p.back, &p.front, &head) > MAX_HEAD_FOLD_COSINE { continue }
          push(Posture::new(head, p.front, p.back, BodyMode::Normal));
        }
      },
      Move::MoveBackContracted => {
        for d in SHIFTS {
          let moved = point_along_a_line(&p.back, &p.head, d as f64);
          push(Posture::new(p.head + (moved - p.back), moved, moved, BodyMode::Contracted));
        }
      },
      Move::MoveHeadContracted => {
        let (min, max) = (radii.back - radii.head, radii.back + radii.head);
        let cd = distance(&p.back, &p.head);
        for d in slides(cd, min, max) {
          let moved = point_along_a_line(&p.back, &p.head, d);
          push(Posture::new(moved, p.back, p.back, BodyMode::Contracted));
        }
      },
      Move::RotateHeadContracted => {
        let slack = distance(&p.back, &p.head) + radii.head - radii.back;
        let rotations = if slack <= radii.head / 4. { &*COARSE_ROTATIONS } else { &*FINE_ROTATIONS };
        for r in rotations {
          push(Posture::new(rotate_with(&p.head, &p.back, r), p.back, p.back, BodyMode::Contracted));
        }
      },
      Move::MoveFrontContracted => {
        let base = radii.back - radii.front;
        let hd = distance(&p.back, &p.head);
        for d in EXPANSIONS {
          push(Posture::new(
            point_along_a_line(&p.back, &p.head, hd + d),
            point_along_a_line(&p.back, &p.head, base + d),
            p.back,
            BodyMode::Normal,
          ));
        }
      },
    }
  }
}

// Segment lengths `current + d` for the slide offsets, kept within
// `[min, max]`.
fn slides(current: f64, min: f64, max: f64) -> impl Iterator<Item = f64> {
  SLIDES
    .map(move |d| current + d as f64)
    .filter(move |&l| l >= min && l <= max)
}

// Fills `out` with the baseline followed by every candidate of the move set
// of the baseline's body mode. With `two_step` the rotations also start from
// the translated and slid candidates, not only from the baseline.
pub fn generate_candidates(
  baseline: &Posture,
  radii: &Radii,
  two_step: bool,
  out: &mut Vec<Candidate>,
) {
  out.clear();
  Move::Baseline.apply(baseline, radii, out);
  match baseline.mode {
    BodyMode::Normal => {
      let (slides, rotations) = Move::NORMAL.split_at(3);
      for m in slides {
        m.apply(baseline, radii, out);
      }
      let n = if two_step { out.len() } else { 1 };
      for m in rotations {
        for i in 0..n {
          let p = out[i].posture;
          m.apply(&p, radii, out);
        }
      }
    },
    BodyMode::Contracted => {
      for m in Move::CONTRACTED {
        m.apply(baseline, radii, out);
      }
    },
  }
}
