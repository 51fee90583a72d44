//! The grade model.
//!
//! Categories hold scored assignments and a weight; a course combines its
//! graded categories into a weighted percentage, projects the score needed on
//! the final, and supports what-if adds and drops.

pub mod category;
pub mod course;
pub mod drop;
pub mod grade;
pub mod types;
pub mod utility;
