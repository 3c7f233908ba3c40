pub mod generator;
pub mod replay;

pub use generator::{benchmark, RandomFeatures, DEFAULT_BENCHMARK_ITERATIONS};
pub use replay::{simulate, CsvReplay, SimulationSummary, DEFAULT_LABEL_COLUMN};
