//! Release orchestration: version bumps and ordered publication
//!
//! # Core Invariants
//!
//! 1. **Bumps are idempotent** — re-running with the current version writes
//!    nothing and says so; requirement operators are never rewritten.
//! 2. **Publication never edits the live tree** — all manifest surgery
//!    happens in a staged copy of the workspace.
//! 3. **Publish order respects non-dev edges** — dev-only dependency cycles
//!    are legal; anything else is an error, not a guess.
//!
//! # Pipeline
//!
//! - `bump`: version engine ([`bump`]) plus documentation rewriting ([`docs`])
//! - `publish`: planner ([`plan`]) → staging ([`staging`]) → pre-flight
//!   ([`preflight`], [`diagnostics`]) → executor ([`publish`])

pub mod bump;
pub mod diagnostics;
pub mod docs;
pub mod plan;
pub mod preflight;
pub mod publish;
pub mod staging;

pub use bump::BumpOutcome;
pub use plan::{PublishPlan, plan_publication};
pub use publish::{CrateOutcome, CrateStatus, PublishMode};
pub use staging::{StagingArea, StagingOptions};
