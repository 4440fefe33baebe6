//! Testing utilities and fixtures for histree.
//!
//! - **Fixtures**: temporary project trees built from a file list
//! - **Assertions**: whole-tree comparisons with readable failure output
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use histree_test_utils::{assertions::assert_tree, fixtures::TestProject};
//!
//! let project = TestProject::new()
//!     .with_file("a.txt", "A")
//!     .with_file("src/lib.rs", "")
//!     .build();
//!
//! assert_tree(project.path(), &[("a.txt", "A"), ("src/lib.rs", "")]);
//! ```

pub mod assertions;
pub mod fixtures;

pub use fixtures::TestProject;
