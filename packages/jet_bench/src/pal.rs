mod abstractions;
mod facade;
mod std_clock;

pub(crate) use abstractions::*;
pub(crate) use facade::*;
pub(crate) use std_clock::*;
