//! Paykit core library.
//!
//! This library provides the request and response types, validation rules,
//! error taxonomy and telemetry codes shared by the paykit client runtime.
//! Nothing in here performs I/O.

pub mod constants;
pub mod context;
pub mod errors;
pub mod telemetry;
pub mod toggles;
pub mod types;
pub mod validator;
