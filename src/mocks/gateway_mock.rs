use async_trait::async_trait;
use ethers::types::{Address, Log, H256, U256};
use futures::channel::mpsc::{unbounded, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::logs::{approval_log, MOCK_LENDING_POOL, MOCK_TOKEN};
use crate::blockchain::events::ApprovalFilter;
use crate::blockchain::Subscription;
use crate::core::DepositGateway;
use crate::types::{ClientError, ClientResult, PendingTx};

/// approve 이후 Approval 스트림이 어떻게 반응할지
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalBehavior {
    /// approve 즉시 Approval 로그 발생
    Emit,
    /// 아무 로그도 오지 않음 (타임아웃 경로)
    Silent,
    /// 구독 스트림이 바로 닫힘
    CloseStream,
    /// 노드가 approve를 거부
    RejectApprove,
}

/// 게이트웨이 호출 기록
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    WatchApproval { owner: Address, spender: Address },
    Approve(U256),
    Deposit(U256),
}

/// 메모리 안에서 동작하는 예치 게이트웨이
pub struct MockDepositGateway {
    owner: Address,
    spender: Address,
    behavior: ApprovalBehavior,
    calls: Mutex<Vec<GatewayCall>>,
    approvals: Mutex<Option<UnboundedSender<Log>>>,
}

impl MockDepositGateway {
    pub fn new(behavior: ApprovalBehavior) -> Self {
        info!("🎭 MockDepositGateway 초기화: {:?}", behavior);
        Self {
            owner: Address::repeat_byte(0xf3),
            spender: MOCK_LENDING_POOL,
            behavior,
            calls: Mutex::new(Vec::new()),
            approvals: Mutex::new(None),
        }
    }

    pub async fn calls(&self) -> Vec<GatewayCall> {
        self.calls.lock().await.clone()
    }

    pub async fn approve_count(&self) -> usize {
        self.count(|call| matches!(call, GatewayCall::Approve(_))).await
    }

    pub async fn deposit_count(&self) -> usize {
        self.count(|call| matches!(call, GatewayCall::Deposit(_))).await
    }

    /// 마지막 구독의 소비자가 사라졌는지
    pub async fn subscription_released(&self) -> bool {
        self.approvals
            .lock()
            .await
            .as_ref()
            .map(|sender| sender.is_closed())
            .unwrap_or(true)
    }

    async fn count(&self, predicate: impl Fn(&GatewayCall) -> bool) -> usize {
        self.calls.lock().await.iter().filter(|call| predicate(call)).count()
    }

    async fn record(&self, call: GatewayCall) {
        debug!("🎭 [MOCK] {:?}", call);
        self.calls.lock().await.push(call);
    }

    fn pending(&self, contract: Address, method: &str, nonce: u64) -> PendingTx {
        PendingTx {
            hash: H256::from_low_u64_be(nonce),
            contract,
            method: method.to_string(),
        }
    }
}

#[async_trait]
impl DepositGateway for MockDepositGateway {
    fn owner(&self) -> Address {
        self.owner
    }

    fn spender(&self) -> Address {
        self.spender
    }

    async fn approve(&self, amount: U256) -> ClientResult<PendingTx> {
        self.record(GatewayCall::Approve(amount)).await;

        match self.behavior {
            ApprovalBehavior::RejectApprove => {
                return Err(ClientError::Broadcast("approve: insufficient funds for gas".to_string()));
            }
            ApprovalBehavior::Emit => {
                if let Some(sender) = self.approvals.lock().await.as_ref() {
                    let _ = sender.unbounded_send(approval_log(self.owner, self.spender, amount));
                }
            }
            ApprovalBehavior::Silent | ApprovalBehavior::CloseStream => {}
        }

        Ok(self.pending(MOCK_TOKEN, "approve", 1))
    }

    async fn watch_approval(&self, owner: Address, spender: Address) -> ClientResult<Subscription<ApprovalFilter>> {
        self.record(GatewayCall::WatchApproval { owner, spender }).await;

        let (sender, receiver) = unbounded();
        if self.behavior != ApprovalBehavior::CloseStream {
            *self.approvals.lock().await = Some(sender);
        }

        Ok(Subscription::from_stream(receiver))
    }

    async fn deposit(&self, amount: U256) -> ClientResult<PendingTx> {
        self.record(GatewayCall::Deposit(amount)).await;
        Ok(self.pending(MOCK_LENDING_POOL, "deposit", 2))
    }
}
