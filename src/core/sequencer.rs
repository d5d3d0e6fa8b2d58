//! 예치 시퀀서
//!
//! approve → Approval 이벤트 대기 → deposit. 어느 단계든 실패하면 즉시 중단하고
//! 되돌리지 않는다. 구독은 approve 전에 열어 두어 이벤트를 놓치지 않으며,
//! 모든 경로에서 deposit 전에 해제된다. 각 단계의 결과는 일어나는 즉시
//! 진행 싱크로 전달된다.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use ethers::types::U256;
use ethers::utils::{format_units, to_checksum};
use tracing::{info, warn};

use super::gateway::DepositGateway;
use super::stage::{CommandStage, StageTracker};
use crate::blockchain::events::ApprovalFilter;
use crate::types::{ClientError, ClientResult, EventRecord, PendingTx};
use crate::utils::to_base_units;

/// 예치 진행 상황 (stdout 한 줄씩)
#[derive(Debug, Clone)]
pub enum DepositProgress {
    ApproveSent(PendingTx),
    ApprovalReceived(EventRecord<ApprovalFilter>),
    DepositSent(PendingTx),
}

impl fmt::Display for DepositProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepositProgress::ApproveSent(tx) => write!(f, "Approve transaction sent, tx hash: {:?}", tx.hash),
            DepositProgress::ApprovalReceived(record) => write!(
                f,
                "Received Approval event: owner={}, spender={}, value={}",
                to_checksum(&record.event.owner, None),
                to_checksum(&record.event.spender, None),
                record.event.value
            ),
            DepositProgress::DepositSent(tx) => write!(f, "Deposit transaction sent, tx hash: {:?}", tx.hash),
        }
    }
}

/// 진행 상황을 받는 콜백
pub type ProgressSink = Arc<dyn Fn(&DepositProgress) + Send + Sync>;

/// 예치 결과
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    /// 최소 단위 금액
    pub amount: U256,
    pub approve_tx: PendingTx,
    pub approval: EventRecord<ApprovalFilter>,
    pub deposit_tx: PendingTx,
}

impl DepositOutcome {
    /// 진행 순서대로의 세 단계
    pub fn progress(&self) -> [DepositProgress; 3] {
        [
            DepositProgress::ApproveSent(self.approve_tx.clone()),
            DepositProgress::ApprovalReceived(self.approval.clone()),
            DepositProgress::DepositSent(self.deposit_tx.clone()),
        ]
    }
}

pub struct DepositSequencer<G> {
    gateway: G,
    decimals: u32,
    approval_timeout: Duration,
    stages: StageTracker,
    progress: Option<ProgressSink>,
}

impl<G: DepositGateway> DepositSequencer<G> {
    pub fn new(gateway: G, decimals: u32, approval_timeout: Duration) -> Self {
        Self {
            gateway,
            decimals,
            approval_timeout,
            stages: StageTracker::new("deposit"),
            progress: None,
        }
    }

    /// 단계 결과를 받을 싱크 등록
    pub fn with_progress(mut self, sink: ProgressSink) -> Self {
        self.progress = Some(sink);
        self
    }

    pub fn stage(&self) -> CommandStage {
        self.stages.current()
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// 정수 금액 문자열로 예치 실행
    ///
    /// 금액 변환 실패는 네트워크 접근 전에 설정 에러로 끝난다.
    pub async fn run(&mut self, amount: &str) -> ClientResult<DepositOutcome> {
        self.stages.advance(CommandStage::ParsingArgs);
        let amount = to_base_units(amount, self.decimals)?;
        info!(
            "💰 예치 금액: {} ({} base units)",
            format_units(amount, self.decimals).unwrap_or_else(|_| amount.to_string()),
            amount
        );

        self.stages.advance(CommandStage::Approving);
        let owner = self.gateway.owner();
        let spender = self.gateway.spender();

        let mut subscription = self.gateway.watch_approval(owner, spender).await?;

        let approve_tx = match self.gateway.approve(amount).await {
            Ok(tx) => tx,
            Err(e) => {
                subscription.unsubscribe().await;
                return Err(e);
            }
        };
        info!("✅ Approve transaction sent, tx hash: {:?}", approve_tx.hash);
        self.report(DepositProgress::ApproveSent(approve_tx.clone()));

        self.stages.advance(CommandStage::AwaitingApproval);
        info!("⏳ Waiting for Approval event...");

        let waited = tokio::time::timeout(self.approval_timeout, subscription.next()).await;
        subscription.unsubscribe().await;

        let approval = match waited {
            Ok(Some(Ok(record))) => record,
            Ok(Some(Err(e))) => {
                warn!("❌ Approval 구독 에러: {}", e);
                return Err(e);
            }
            Ok(None) => {
                return Err(ClientError::Connection("approval subscription closed".to_string()));
            }
            Err(_) => {
                warn!("⏰ {}초 안에 Approval 이벤트가 오지 않음", self.approval_timeout.as_secs());
                return Err(ClientError::Timeout(format!(
                    "Approval event not received within {}s",
                    self.approval_timeout.as_secs()
                )));
            }
        };
        info!(
            "📬 Received Approval event: owner={:?}, spender={:?}, value={}",
            approval.event.owner, approval.event.spender, approval.event.value
        );
        self.report(DepositProgress::ApprovalReceived(approval.clone()));

        self.stages.advance(CommandStage::Depositing);
        let deposit_tx = self.gateway.deposit(amount).await?;
        info!("✅ Deposit transaction sent, tx hash: {:?}", deposit_tx.hash);
        self.report(DepositProgress::DepositSent(deposit_tx.clone()));

        self.stages.advance(CommandStage::Done);

        Ok(DepositOutcome {
            amount,
            approve_tx,
            approval,
            deposit_tx,
        })
    }

    fn report(&self, event: DepositProgress) {
        if let Some(sink) = &self.progress {
            sink(&event);
        }
    }
}
