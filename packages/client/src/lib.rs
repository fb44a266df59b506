//! Viewer-side notes persistence.
//!
//! [`NotesApi`] is the surface the viewer talks to. Behind it sit a
//! [`LocalStore`] (one JSON document on disk) and a [`RemoteStore`] (the notes
//! HTTP API guarded by a [`CircuitBreaker`]).

pub mod backend;
pub mod breaker;
pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod local;
pub mod remote;
pub mod storage;

pub use backend::{BackendKind, NotesBackend, ReportUpload, SavedDescription};
pub use breaker::{BreakerState, CircuitBreaker};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientConfig, DeploymentMode, FeatureFlags, FeatureOverrides};
pub use dispatcher::NotesApi;
pub use error::{CallError, CallResult, ClientError, DocumentError};
pub use local::LocalStore;
pub use remote::RemoteStore;
pub use storage::{DocumentStorage, FileStorage, MemoryStorage};
