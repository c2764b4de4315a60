pub mod heuristic;
pub mod local_model;
pub mod onnx;

pub use heuristic::{generate_forecast, HeuristicForecaster, HeuristicParams};
pub use local_model::{LocalForecaster, LocalModelHandle};
pub use onnx::OnnxForecaster;
