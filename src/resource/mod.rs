//! Resource discovery and normalization
//!
//! This module turns remote listings into [`Resource`] descriptors.
//! Generators are data: each provider ships a JSON file under
//! `src/resources/` describing its generators and their enumeration steps,
//! so adding a resource kind that follows an existing pattern needs no code.
//!
//! # Architecture
//!
//! - [`descriptor`] - The normalized resource descriptor
//! - [`cursor`] - Forward-only pagination over any page source
//! - [`composite`] - Positional composite ids for child resources
//! - [`step`] - One enumeration step: list, filter, normalize
//! - [`generator`] - Ordered, fail-fast execution of a generator's steps
//! - [`registry`] - Loads and caches generator definitions from embedded JSON
//!
//! # Example
//!
//! ```ignore
//! use stackscout::client::{connect, ClientSettings};
//! use stackscout::resource::{build_generator, get_generator_def, Generator};
//!
//! async fn list_stacks() -> stackscout::Result<()> {
//!     let def = get_generator_def("aws", "cloudformation").unwrap();
//!     let client = connect(def, &ClientSettings::default())?;
//!     let generator = build_generator("aws", "cloudformation", client)?;
//!     for resource in generator.discover().await? {
//!         println!("{} {}", resource.kind(), resource.id());
//!     }
//!     Ok(())
//! }
//! ```

pub mod composite;
pub mod cursor;
pub mod descriptor;
pub mod generator;
pub mod registry;
pub mod step;

pub use composite::{composite_id, COMPOSITE_ID_DELIMITER};
pub use cursor::{Cursor, CursorState, Page, PageSource};
pub use descriptor::Resource;
pub use generator::{
    build_generator, build_generators, DefinedGenerator, Generator, GeneratorRun, RunState,
};
pub use registry::{
    get_all_generator_keys, get_generator_def, get_registry, parse_generator_key, AwsProtocol,
    GeneratorDef, ProviderConfig, StepDef,
};
pub use step::{enumerate, ListingSource, RawObjects, StepOutput};
