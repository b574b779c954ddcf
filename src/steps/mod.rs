//! Step definitions, the unit-of-work contract, and run records.
//!
//! - [`StepDefinition`] - Declared metadata: dependencies, timeout, retry policy
//! - [`StepUnit`] - The async contract every orchestrated unit implements
//! - [`CommandStep`] - A unit that runs a shell command
//! - [`StepRunRecord`] - Per-run execution state owned by the scheduler
//! - [`StepStatus`] - Step lifecycle states
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pipewave::steps::{FnStep, StepContext, StepDefinition, StepError, StepOutput};
//!
//! let definition = StepDefinition::new("sdc_template")
//!     .depends_on(["marketing_descriptions", "popularity_codes"])
//!     .with_timeout(Duration::from_secs(600))
//!     .retryable(1);
//!
//! let unit = FnStep::new(|ctx: StepContext| async move {
//!     let rows = ctx
//!         .upstream_output("marketing_descriptions")
//!         .map_or(0, |out| out.items_processed);
//!     Ok::<_, StepError>(StepOutput::empty().with_items(rows, 0))
//! });
//! # let _ = (definition, unit);
//! ```

pub mod command;
pub mod definition;
pub mod record;
pub mod status;
pub mod unit;

pub use command::CommandStep;
pub use definition::StepDefinition;
pub use record::{SkipReason, StepRunRecord};
pub use status::StepStatus;
pub use unit::{FnStep, StepContext, StepError, StepOutput, StepUnit};
