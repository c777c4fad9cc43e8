//! Descriptor matching with geometric verification.
//!
//! A [`ResultMatcher`] indexes one reference [`aif_core::Results`] and
//! matches queries against it: k=2 nearest neighbours, a ratio test, then a
//! RANSAC homography that keeps only geometrically consistent matches.
//! [`parallel_match`] runs one query against many references.

pub mod error;
pub mod homography;
pub mod index;
pub mod matcher;
pub mod parallel;

pub use error::{MatchError, MatchResult};
pub use homography::{estimate_homography_dlt, fit_homography_ransac, project, HomographyError, RansacConfig, RansacResult};
pub use index::{DescriptorIndex, Neighbor};
pub use matcher::{ratio_filter, Match, MatchOutcome, MatcherConfig, ResultMatcher, MIN_CORRESPONDENCES};
pub use parallel::parallel_match;
