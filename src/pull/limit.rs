use anyhow::Result;

/// Byte budget in force for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteBudget {
    Unlimited,
    LimitBytes(u64),
}

impl ByteBudget {
    pub fn from_saved(limit_bytes: Option<u64>) -> Self {
        match limit_bytes {
            Some(limit) => ByteBudget::LimitBytes(limit),
            None => ByteBudget::Unlimited,
        }
    }

    pub fn limit(self) -> Option<u64> {
        match self {
            ByteBudget::Unlimited => None,
            ByteBudget::LimitBytes(limit) => Some(limit),
        }
    }

    pub fn is_reached(self, bytes_downloaded: u64) -> bool {
        matches!(self, ByteBudget::LimitBytes(limit) if bytes_downloaded >= limit)
    }
}

/// Where the download stands relative to a previously saved budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitSituation {
    NoPriorLimit { downloaded: u64 },
    UnderLimit { limit: u64, downloaded: u64 },
    LimitReached { limit: u64, downloaded: u64 },
}

impl LimitSituation {
    pub fn assess(downloaded: u64, saved_limit: Option<u64>) -> Self {
        match saved_limit {
            None => LimitSituation::NoPriorLimit { downloaded },
            Some(limit) if downloaded >= limit => LimitSituation::LimitReached { limit, downloaded },
            Some(limit) => LimitSituation::UnderLimit { limit, downloaded },
        }
    }

    /// Choices worth putting in front of an operator, in display order.
    pub fn offered_choices(&self) -> &'static [LimitChoice] {
        match self {
            LimitSituation::NoPriorLimit { .. } => &[LimitChoice::Unlimited, LimitChoice::NewLimit],
            LimitSituation::UnderLimit { .. } => &[
                LimitChoice::KeepCurrent,
                LimitChoice::NewLimit,
                LimitChoice::Extend,
            ],
            LimitSituation::LimitReached { .. } => &[
                LimitChoice::Extend,
                LimitChoice::Unlimited,
                LimitChoice::Abort,
            ],
        }
    }
}

/// A choice before any byte amount has been supplied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitChoice {
    KeepCurrent,
    NewLimit,
    Extend,
    Unlimited,
    Abort,
}

impl LimitChoice {
    pub fn label(self) -> &'static str {
        match self {
            LimitChoice::KeepCurrent => "Resume with the current limit",
            LimitChoice::NewLimit => "Set a new byte limit",
            LimitChoice::Extend => "Extend the limit by more bytes",
            LimitChoice::Unlimited => "Download without a limit",
            LimitChoice::Abort => "Stop here",
        }
    }

    pub fn needs_amount(self) -> bool {
        matches!(self, LimitChoice::NewLimit | LimitChoice::Extend)
    }
}

/// What the operator decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitDecision {
    ResumeAsIs,
    Replace(u64),
    Extend(u64),
    Unlimited,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitResolution {
    Proceed(ByteBudget),
    Abort,
}

/// Applies a decision to the saved limit. Extending is additive and starts
/// from zero when nothing was saved.
pub fn resolve(saved_limit: Option<u64>, decision: LimitDecision) -> LimitResolution {
    match decision {
        LimitDecision::ResumeAsIs => LimitResolution::Proceed(ByteBudget::from_saved(saved_limit)),
        LimitDecision::Replace(limit) => LimitResolution::Proceed(ByteBudget::LimitBytes(limit)),
        LimitDecision::Extend(added) => LimitResolution::Proceed(ByteBudget::LimitBytes(
            saved_limit.unwrap_or(0).saturating_add(added),
        )),
        LimitDecision::Unlimited => LimitResolution::Proceed(ByteBudget::Unlimited),
        LimitDecision::Abort => LimitResolution::Abort,
    }
}

/// Supplies the limit decision; the terminal prompt lives behind this.
pub trait LimitNegotiator: Send + Sync {
    fn negotiate(&self, situation: LimitSituation) -> Result<LimitDecision>;
}

/// Non-interactive negotiator that always answers the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub LimitDecision);

impl LimitNegotiator for FixedDecision {
    fn negotiate(&self, _situation: LimitSituation) -> Result<LimitDecision> {
        Ok(self.0)
    }
}
