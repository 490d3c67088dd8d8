//! Data models for modelscout.
//!
//! Query-side types ([`Intent`], [`ParameterBag`], [`ParsedQuery`]), catalog
//! views ([`ModelRecord`]) and the dispatcher's [`ResponseEnvelope`].

mod intent;
mod params;
mod query;
mod record;
mod response;

pub use intent::{DetectionSource, Intent};
pub use params::{ModelIds, ParameterBag, Resolution, SortOrder, SortSpec, coerce_limit};
pub use query::ParsedQuery;
pub use record::{
    ArchitectureView, BasicView, DatasetView, FrameworkView, ModelRecord, PerformanceView,
    TrainingView, resolve_path,
};
pub use response::{
    EnvelopeMetadata, HandlerOutput, NotebookRequest, NotebookResult, NotebookStatus, Payload,
    ResponseEnvelope, SearchItem, SearchKind, Timings,
};
