use std::fmt;

use tracing::debug;

/// 서브커맨드 진행 단계
///
/// 예치: `Idle → ParsingArgs → Approving → AwaitingApproval → Depositing → Done`
/// 조회: `Idle → ParsingArgs → Reading → Done`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStage {
    Idle,
    ParsingArgs,
    Reading,
    Approving,
    AwaitingApproval,
    Depositing,
    Done,
}

impl fmt::Display for CommandStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CommandStage::Idle => "idle",
            CommandStage::ParsingArgs => "parsing-args",
            CommandStage::Reading => "reading",
            CommandStage::Approving => "approving",
            CommandStage::AwaitingApproval => "awaiting-approval",
            CommandStage::Depositing => "depositing",
            CommandStage::Done => "done",
        };
        write!(f, "{}", name)
    }
}

/// 현재 단계 + 전이 로그
#[derive(Debug, Clone)]
pub(crate) struct StageTracker {
    command: &'static str,
    current: CommandStage,
}

impl StageTracker {
    pub(crate) fn new(command: &'static str) -> Self {
        Self {
            command,
            current: CommandStage::Idle,
        }
    }

    pub(crate) fn current(&self) -> CommandStage {
        self.current
    }

    pub(crate) fn advance(&mut self, next: CommandStage) {
        debug!("🔄 {} 단계: {} → {}", self.command, self.current, next);
        self.current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_starts_idle_and_follows_advance() {
        let mut tracker = StageTracker::new("total");
        assert_eq!(tracker.current(), CommandStage::Idle);

        tracker.advance(CommandStage::ParsingArgs);
        tracker.advance(CommandStage::Reading);
        assert_eq!(tracker.current(), CommandStage::Reading);
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(CommandStage::Reading.to_string(), "reading");
        assert_eq!(CommandStage::AwaitingApproval.to_string(), "awaiting-approval");
    }
}
