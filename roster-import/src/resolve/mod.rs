//! Identifier resolution
//!
//! Raw identifiers typed into spreadsheets are matched against the canonical
//! registry through a fixed sequence of tiers:
//!
//! 1. EXACT - case-insensitive equality
//! 2. OVERRIDE - hand-curated historical identifier table
//! 3. NORMALIZED_PREFIX - local part is a dotted/underscored prefix
//!    (compound-name aliases checked first)
//! 4. SUBSTRING - letters-only local part containment
//!
//! The first tier that matches wins. Tiers are a precedence order, not a score.

pub mod normalize;
pub mod overrides;
pub mod registry;
pub mod resolver;

pub use overrides::{CompoundAliases, OverrideEntry, OverrideTable};
pub use registry::{CanonicalRegistry, RegistrySet};
pub use resolver::{IdentifierResolver, MatchResult, MatchStatus};
