pub mod issue;
pub mod rollup;
