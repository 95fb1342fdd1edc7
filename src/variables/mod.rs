//! Variables: reference splitting, scope storage and substitution

mod extended;
mod splitter;
mod store;

pub use splitter::{split_variable, VariableRef, DEFAULT_IDENTIFIERS};
pub use store::{is_list_var, is_scalar_var, is_var, EnvProvider, ProcessEnv, Variables};
