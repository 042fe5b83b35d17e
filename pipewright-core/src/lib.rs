// pipewright-core/src/lib.rs
// Named, priority-ordered, mergeable aggregation pipeline builder

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod expressions;
pub mod logging;
pub mod payload;
pub mod record;
pub mod registry;
pub mod repository;
pub mod stage;
pub mod store;
pub mod unwind_options;

// Public exports
pub use builder::StageBuilder;
pub use client::{Client, Database};
pub use config::ClientConfig;
pub use error::{PipelineError, Result};
pub use logging::{get_log_level, init_from_env, set_log_level, LogLevel};
pub use payload::{merge, FieldList, FieldMap, Payload, PayloadShape};
pub use record::{HasMeta, Initializable, Record, RecordId, RecordMeta, Replaceable, Updatable};
pub use registry::StageRegistry;
pub use repository::{Repository, Update};
pub use stage::{Pipeline, Stage, StageDocument, StageKind};
pub use store::{DocumentStore, Namespace};
pub use unwind_options::{include_index, preserve_null_empty, UnwindOption, UnwindOptions};
