//! Workflow states and the forward transition table

use std::fmt;

/// Progress of an alignment workflow, in forward order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WorkflowState {
    Start,
    MatchingDone,
    ReportsDone,
    OutputDone,
}

impl WorkflowState {
    /// Terminal state; stepping here is a no-op
    pub const FINISH: WorkflowState = WorkflowState::OutputDone;

    pub const ALL: [WorkflowState; 4] = [
        WorkflowState::Start,
        WorkflowState::MatchingDone,
        WorkflowState::ReportsDone,
        WorkflowState::OutputDone,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowState::Start => "Start",
            WorkflowState::MatchingDone => "MatchingDone",
            WorkflowState::ReportsDone => "ReportsDone",
            WorkflowState::OutputDone => "OutputDone",
        }
    }

    pub fn is_finish(&self) -> bool {
        *self == Self::FINISH
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Work performed when leaving a state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageAction {
    FindMatches,
    GenerateReports,
    GenerateOutput,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: WorkflowState,
    pub action: StageAction,
    pub next: WorkflowState,
}

pub const TRANSITIONS: [Transition; 4] = [
    Transition {
        from: WorkflowState::Start,
        action: StageAction::FindMatches,
        next: WorkflowState::MatchingDone,
    },
    Transition {
        from: WorkflowState::MatchingDone,
        action: StageAction::GenerateReports,
        next: WorkflowState::ReportsDone,
    },
    Transition {
        from: WorkflowState::ReportsDone,
        action: StageAction::GenerateOutput,
        next: WorkflowState::OutputDone,
    },
    Transition {
        from: WorkflowState::OutputDone,
        action: StageAction::None,
        next: WorkflowState::OutputDone,
    },
];

pub fn transition(state: WorkflowState) -> Transition {
    // One entry per state, in enum order
    TRANSITIONS[state as usize]
}

/// Start is always reachable; otherwise only states already passed
pub fn can_rewind_to(current: WorkflowState, target: WorkflowState) -> bool {
    target == WorkflowState::Start || target <= current
}

pub fn legal_rewind_targets(current: WorkflowState) -> Vec<WorkflowState> {
    WorkflowState::ALL
        .into_iter()
        .filter(|&target| can_rewind_to(current, target))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_enum_order() {
        for (i, t) in TRANSITIONS.iter().enumerate() {
            assert_eq!(t.from as usize, i);
            assert!(t.next >= t.from);
        }
        assert_eq!(transition(WorkflowState::FINISH).action, StageAction::None);
        assert_eq!(transition(WorkflowState::FINISH).next, WorkflowState::FINISH);
    }

    #[test]
    fn test_rewind_targets() {
        assert_eq!(legal_rewind_targets(WorkflowState::Start), vec![WorkflowState::Start]);
        assert_eq!(
            legal_rewind_targets(WorkflowState::ReportsDone),
            vec![
                WorkflowState::Start,
                WorkflowState::MatchingDone,
                WorkflowState::ReportsDone
            ]
        );
        assert!(!can_rewind_to(WorkflowState::MatchingDone, WorkflowState::OutputDone));
        assert_eq!(legal_rewind_targets(WorkflowState::FINISH).len(), 4);
    }
}
