//! The dynamic form-field model.
//!
//! Authoring input goes through [`normalize_all`] (with [`process_table`] for
//! table fields) before it is stored; submissions are checked and coerced by
//! [`validate_submission`] against the stored fields.

mod embedded;
mod model;
mod normalize;
mod submit;
mod table;
mod values;

pub use embedded::{Embedded, decode_or_default};
pub use model::{
    Field, FieldKind, FieldOption, TableColumn, TableRow, TableSchema, ValidationRules,
};
pub use normalize::{FieldError, RawField, default_options, normalize, normalize_all};
pub use submit::validate_submission;
pub use table::process_table;
pub use values::slugify;
