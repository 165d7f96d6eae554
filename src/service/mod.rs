//! Use cases built on the data-access layer.

pub mod crud;

pub use crud::CrudService;
