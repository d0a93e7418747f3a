use kreg_domain::MetadataRow;

/// Where a kernel line stands with respect to its current snapshot.
///
/// Readers only trust [`SnapshotState::OneCurrent`]. A non-transactional toggle passes through
/// [`SnapshotState::Transitioning`] on purpose: the new row is made current before the old one
/// is cleared, so the line never has zero current rows mid-toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotState {
    NoCurrent,
    Transitioning { rows: Vec<MetadataRow> },
    OneCurrent(MetadataRow),
}

impl SnapshotState {
    /// Classifies the current rows of one kernel line.
    #[must_use]
    pub fn from_rows(mut rows: Vec<MetadataRow>) -> Self {
        match rows.len() {
            0 => Self::NoCurrent,
            1 => rows.pop().map_or(Self::NoCurrent, Self::OneCurrent),
            _ => Self::Transitioning { rows },
        }
    }

    #[must_use]
    pub const fn current(&self) -> Option<&MetadataRow> {
        match self {
            Self::OneCurrent(row) => Some(row),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_transitioning(&self) -> bool {
        matches!(self, Self::Transitioning { .. })
    }

    /// Number of rows flagged current.
    #[must_use]
    pub const fn current_rows(&self) -> usize {
        match self {
            Self::NoCurrent => 0,
            Self::Transitioning { rows } => rows.len(),
            Self::OneCurrent(_) => 1,
        }
    }
}
