//! Status keyword table and the rank/priority inversion.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// Closed set of workflow states the bot can address by keyword.
pub enum IssueStatus {
    New,
    InProgress,
    Feedback,
    Resolved,
    Closed,
    Rejected,
    Hold,
}

impl IssueStatus {
    pub const ALL: [IssueStatus; 7] = [
        IssueStatus::New,
        IssueStatus::InProgress,
        IssueStatus::Feedback,
        IssueStatus::Resolved,
        IssueStatus::Closed,
        IssueStatus::Rejected,
        IssueStatus::Hold,
    ];

    /// Scrum section order, most actionable first.
    pub const SCRUM_ORDER: [IssueStatus; 5] = [
        IssueStatus::InProgress,
        IssueStatus::Feedback,
        IssueStatus::Resolved,
        IssueStatus::New,
        IssueStatus::Hold,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in",
            Self::Feedback => "feed",
            Self::Resolved => "resolve",
            Self::Closed => "close",
            Self::Rejected => "reject",
            Self::Hold => "hold",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::New => "New",
            Self::InProgress => "In Progress",
            Self::Feedback => "Feedback",
            Self::Resolved => "Resolved",
            Self::Closed => "Closed",
            Self::Rejected => "Rejected",
            Self::Hold => "Hold",
        }
    }

    pub fn from_keyword(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.keyword() == normalized)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Maps each status to the tracker's numeric id, fixed at startup.
pub struct StatusTable {
    ids: BTreeMap<IssueStatus, u64>,
}

impl StatusTable {
    pub fn new(ids: impl IntoIterator<Item = (IssueStatus, u64)>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    pub fn id_for(&self, status: IssueStatus) -> Option<u64> {
        self.ids.get(&status).copied()
    }

    pub fn status_for_id(&self, id: u64) -> Option<IssueStatus> {
        self.ids
            .iter()
            .find(|(_, value)| **value == id)
            .map(|(status, _)| *status)
    }

    /// Configured statuses in declaration order.
    pub fn configured(&self) -> impl Iterator<Item = (IssueStatus, u64)> + '_ {
        IssueStatus::ALL
            .into_iter()
            .filter_map(|status| self.id_for(status).map(|id| (status, id)))
    }

    /// Backticked keyword list used in help and error texts.
    pub fn keyword_list(&self) -> String {
        self.configured()
            .map(|(status, _)| format!("`{}`", status.keyword()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One `keyword - Display Name` line per configured status.
    pub fn describe(&self) -> String {
        self.configured()
            .map(|(status, _)| format!("`{}` - {}", status.keyword(), status.display_name()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub const MIN_RANK: u8 = 1;
pub const MAX_RANK: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// User-facing rank 1-5; rank 1 is the tracker's highest priority (5).
pub struct IssueRank(u8);

impl IssueRank {
    pub fn new(value: u8) -> Option<Self> {
        (MIN_RANK..=MAX_RANK).contains(&value).then_some(Self(value))
    }

    pub fn parse(raw: &str) -> Option<Self> {
        raw.trim().parse::<u8>().ok().and_then(Self::new)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn to_priority(self) -> u64 {
        to_priority(u64::from(self.0))
    }

    pub fn from_priority(priority: u64) -> Option<Self> {
        if !(u64::from(MIN_RANK)..=u64::from(MAX_RANK)).contains(&priority) {
            return None;
        }
        Self::new(to_priority(priority) as u8)
    }
}

/// The rank/priority inversion `6 - r`; it is its own inverse on 1..=5.
pub fn to_priority(rank: u64) -> u64 {
    (u64::from(MAX_RANK) + 1).saturating_sub(rank)
}
