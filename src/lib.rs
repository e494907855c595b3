//! School CMS - content backend for a vocational school website
//!
//! Serves the public site (landing page, news, majors, extracurriculars,
//! gallery, achievements, school profile) and an admin back office that
//! edits them. The centrepiece is the organization chart editor: a fixed
//! roster of positions whose holders, titles and portraits are edited as
//! one sequence and reconciled against the roster on every read.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_local_dir>/school-cms/
//! ├── school.db              # Content records
//! ├── media/                 # Content-addressed images
//! │   └── sha256-ab12....png
//! └── config.toml            # Configuration
//! ```

pub mod auth;
pub mod blob_store;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod services;
pub mod structure;
pub mod views;

// Re-exports
pub use auth::AdminAuth;
pub use blob_store::{BlobStore, ImageStore, ImageUpload, UploadConstraints};
pub use config::Config;
pub use db::CmsDb;
pub use error::{CmsError, FieldErrors};
pub use http::HttpServer;
pub use services::events::spawn_logging_listener;
pub use services::{Collection, ContentEvent, EventBus, Services};
pub use structure::{PositionRegistry, ReconciledPosition};
