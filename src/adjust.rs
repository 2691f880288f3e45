use std::fmt;
use std::str::FromStr;

use crate::error::{ArgumentError, Error};
use crate::transform::Brightness;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AdjustKind {
    Brightness,
    /// Recognised on the command line but not implemented.
    Contrast,
}

impl FromStr for AdjustKind {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "brightness" => Ok(AdjustKind::Brightness),
            "contrast" => Ok(AdjustKind::Contrast),
            other => Err(ArgumentError::UnknownAdjustment(other.to_string())),
        }
    }
}

impl fmt::Display for AdjustKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjustKind::Brightness => write!(f, "brightness"),
            AdjustKind::Contrast => write!(f, "contrast"),
        }
    }
}

/// One requested adjustment: a kind and a signed percentage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Adjustment {
    pub kind: AdjustKind,
    pub percent: i32,
}

impl Adjustment {
    pub fn new(kind: AdjustKind, percent: i32) -> Self {
        Self { kind, percent }
    }

    /// Builds the brightness transform, rejecting kinds that have none.
    pub fn brightness(&self) -> Result<Brightness, Error> {
        match self.kind {
            AdjustKind::Brightness => Ok(Brightness::from_percent(self.percent)?),
            AdjustKind::Contrast => Err(Error::Unimplemented(self.kind.to_string())),
        }
    }
}
