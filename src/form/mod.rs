//! Multipart form handling.
//!
//! # Data Flow
//! ```text
//! inbound multipart body
//!     → parse.rs (axum Multipart → Form)
//!     → [rewrite engine produces a new Form]
//!     → encode.rs (Form → bytes with a fresh boundary)
//! ```

pub mod encode;
pub mod model;
pub mod parse;

pub use encode::{encode_form, EncodedForm};
pub use model::{Form, FormPart};
pub use parse::read_form;
