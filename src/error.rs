//! Error type shared by the report pipeline.

use std::fmt;
use std::io;

#[cfg(feature = "bookmarks")]
use crate::bookmarks::BookmarkError;

/// Failures that abort a report-generation request.
///
/// Recoverable conditions, such as a logo or chart that disappeared before composition, never
/// surface here; the composer logs and skips them.
#[derive(Debug)]
pub enum ReportError {
    /// Referenced content exists but could not be read or decoded while composing.
    Composition(genpdf::error::Error),
    /// No usable font family could be loaded.
    FontLoad(genpdf::error::Error),
    /// The composed document could not be serialized.
    Export(genpdf::error::Error),
    /// Temporary storage could not be written, read or cleaned up.
    Scratch {
        /// What the store was doing when the failure happened.
        action: String,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// A chart could not be rasterized.
    Chart {
        /// Column the chart was requested for.
        column: String,
        /// Why rendering failed.
        reason: String,
    },
    /// The writer's identifiers and dates could not be pinned in the rendered bytes.
    Metadata(lopdf::Error),
    /// The outline could not be embedded into the rendered bytes.
    #[cfg(feature = "bookmarks")]
    Bookmarks(BookmarkError),
}

impl ReportError {
    pub(crate) fn scratch(action: impl Into<String>, source: io::Error) -> Self {
        Self::Scratch {
            action: action.into(),
            source,
        }
    }

    pub(crate) fn chart(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Chart {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Composition(err) => write!(f, "Failed to compose report: {err}"),
            Self::FontLoad(err) => write!(f, "Failed to load report fonts: {err}"),
            Self::Export(err) => write!(f, "Failed to serialize report: {err}"),
            Self::Scratch { action, source } => {
                write!(f, "Temporary storage failure while {action}: {source}")
            }
            Self::Chart { column, reason } => {
                write!(f, "Failed to render chart for column '{column}': {reason}")
            }
            Self::Metadata(err) => write!(f, "Failed to stamp report metadata: {err}"),
            #[cfg(feature = "bookmarks")]
            Self::Bookmarks(err) => write!(f, "Failed to add bookmarks: {err}"),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Composition(err) | Self::FontLoad(err) | Self::Export(err) => Some(err),
            Self::Scratch { source, .. } => Some(source),
            Self::Chart { .. } => None,
            Self::Metadata(err) => Some(err),
            #[cfg(feature = "bookmarks")]
            Self::Bookmarks(err) => Some(err),
        }
    }
}

#[cfg(feature = "bookmarks")]
impl From<BookmarkError> for ReportError {
    fn from(err: BookmarkError) -> Self {
        Self::Bookmarks(err)
    }
}
