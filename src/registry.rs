//! The fixed set of filters a caller may request.
//!
//! Every identifier accepted from the outside world goes through [`lookup`]
//! and either resolves to exactly one [`FilterKind`] or is rejected. After
//! that point the rest of the crate only ever sees the enum, never the raw
//! string.
//!
//! | Identifier | Kernel |
//! |---|---|
//! | `blur` | 5×5 ring, scale 16 |
//! | `contour` | 3×3 Laplacian, offset 255 |
//! | `detail` | 3×3 cross, scale 6 |
//! | `edge-enhance` | 3×3, scale 2 |
//! | `emboss` | 3×3 diagonal, offset 128 |
//! | `sharpen` | 3×3, scale 16 |
//! | `smooth` | 3×3, scale 13 |
//!
//! The legacy spelling `edge enhance` (with a space) is accepted as an alias
//! for `edge-enhance`. Artifacts and references always use the canonical form.

use crate::imaging::kernels::{self, Kernel};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when an identifier is not in the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown filter '{0}'")]
pub struct UnknownFilter(pub String);

/// One of the named image transform operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterKind {
    Blur,
    Contour,
    Detail,
    EdgeEnhance,
    Emboss,
    Sharpen,
    Smooth,
}

impl FilterKind {
    /// All filters in display order.
    pub const ALL: [FilterKind; 7] = [
        FilterKind::Blur,
        FilterKind::Contour,
        FilterKind::Detail,
        FilterKind::EdgeEnhance,
        FilterKind::Emboss,
        FilterKind::Sharpen,
        FilterKind::Smooth,
    ];

    /// Canonical identifier, used in artifact names and references.
    pub fn as_str(self) -> &'static str {
        match self {
            FilterKind::Blur => "blur",
            FilterKind::Contour => "contour",
            FilterKind::Detail => "detail",
            FilterKind::EdgeEnhance => "edge-enhance",
            FilterKind::Emboss => "emboss",
            FilterKind::Sharpen => "sharpen",
            FilterKind::Smooth => "smooth",
        }
    }

    /// The convolution this filter applies.
    pub fn kernel(self) -> &'static Kernel {
        match self {
            FilterKind::Blur => &kernels::BLUR,
            FilterKind::Contour => &kernels::CONTOUR,
            FilterKind::Detail => &kernels::DETAIL,
            FilterKind::EdgeEnhance => &kernels::EDGE_ENHANCE,
            FilterKind::Emboss => &kernels::EMBOSS,
            FilterKind::Sharpen => &kernels::SHARPEN,
            FilterKind::Smooth => &kernels::SMOOTH,
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterKind {
    type Err = UnknownFilter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "edge enhance" {
            return Ok(FilterKind::EdgeEnhance);
        }
        FilterKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownFilter(s.to_string()))
    }
}

impl Serialize for FilterKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Resolve a caller-supplied identifier.
pub fn lookup(identifier: &str) -> Result<FilterKind, UnknownFilter> {
    identifier.parse()
}

/// Canonical identifiers of every registered filter, in display order.
pub fn identifiers() -> Vec<&'static str> {
    FilterKind::ALL.iter().map(|k| k.as_str()).collect()
}
