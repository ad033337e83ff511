//! Small reusable pieces shared by the coding stages.

pub mod tree;
