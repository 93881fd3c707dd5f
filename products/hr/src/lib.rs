//! HR module: employee records.
//!
//! Raw input is normalized by [`validate`], persisted through [`repository`]
//! and looked up through [`search`]. Every operation takes the connection it
//! should run on; mutating operations open their own transaction on it.

pub mod error;
pub mod repository;
pub mod schema;
pub mod search;
pub mod validate;

pub use error::{HrError, HrResult};
pub use schema::{EmployeeChanges, EmployeeInput, EmployeeRecord, Field, NewEmployee};
pub use validate::{FieldError, Shape, ValidationErrors, validate_create, validate_update};
