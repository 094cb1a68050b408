pub mod adapter;
pub mod angle;
pub mod camera;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod frame;
pub mod mask;
pub mod mesh;
pub mod oracle;
pub mod prompt;
pub mod store;

pub use adapter::RenderAdapter;
pub use angle::CameraAngle;
pub use config::{PipelineConfig, load_config_from_path};
pub use context::{ComputeContext, Device, Latents};
pub use controller::{MergeSource, ViewPipeline, ViewRunState};
pub use error::PipelineError;
pub use oracle::{InpaintOracle, InpaintRequest};
pub use store::{TransformsManifest, ViewStore};
