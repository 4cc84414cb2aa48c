// Posture tracker for rodent behavior videos. Given a background and a
// stream of frames, fits a head/front/back body model to the animal in each
// frame by local search over a small move set.

#[macro_use] extern crate lazy_static;

pub mod all;
mod animal;
mod body_mask;
mod foreground;
mod geometry;
mod image;
mod overlay;
mod parameters;
mod posture;
mod tracker;
mod types;
mod util;
