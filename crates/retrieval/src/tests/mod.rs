//! Pipeline tests using in-crate fakes of the model and the index.

mod ordering;
