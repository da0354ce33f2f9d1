//! Version descriptors: parsing, platform rules and inheritance merging

pub mod descriptor;
pub mod errors;
pub mod maven;
pub mod merge;
pub mod rules;

pub use descriptor::{ArgEntry, Artifact, LaunchArguments, Library, RuntimeDescriptor};
pub use errors::{MetaError, Result};
pub use maven::MavenCoordinate;
pub use merge::{DescriptorSource, StaticDescriptors, VersionsDirectory, merge, resolve};
pub use rules::{OsName, PlatformRule, RuleAction, allows};
