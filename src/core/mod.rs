pub mod constraint;
pub mod document;
pub mod release;
pub mod version;

pub use constraint::{Constraint, ConstraintError, RangeSyntax};
pub use document::{Document, DocumentError, PackageRecord, VersionRecord};
pub use release::{latest_by_package, PackageRelease, ReleaseId};
pub use version::Version;
