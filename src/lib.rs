pub mod adjust;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod grid;
pub mod pipeline;
pub mod pixel;
pub mod probe;
pub mod transform;

pub use adjust::{AdjustKind, Adjustment};
pub use codec::{ImageCodec, OutputFormat, RasterCodec};
pub use config::Config;
pub use engine::{BoundedParallelMap, ConcurrencyBudget, EngineOptions, PassReport};
pub use error::{Error, Result};
pub use grid::PixelGrid;
pub use pixel::{Pixel, PixelOps, SubPixel};
pub use transform::{Brightness, FalliblePixelTransform, PixelTransform};
