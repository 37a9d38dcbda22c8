//! Request history assembly: context providers, input filters and the
//! token-budgeted history selector.

pub mod filters;
pub mod history;
pub mod provider;

pub use filters::{
    apply_filters, filter_files, filter_function_calls, strip_bookkeeping, InputFilter,
};
pub use history::{assemble_history, select_within_budget, CharEstimator, TokenEstimator};
pub use provider::{gather_contexts, ContextProvider, StaticContext};
