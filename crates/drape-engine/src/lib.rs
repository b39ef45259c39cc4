pub mod acquisition;
pub mod backend;
pub mod config;
pub mod ingest;
pub mod providers;
pub mod session;

pub use acquisition::{AcquisitionError, EncodedImage, ImageAcquisitionService, PromptSource};
pub use backend::BackendClient;
pub use config::AcquisitionConfig;
pub use ingest::{FileIngestService, IngestError, IngestLimits};
pub use providers::{ImageBytes, ImageProvider, PicsumProvider, PollinationsProvider};
pub use session::{CustomizationSession, ExportSummary, SessionError};
