use async_trait::async_trait;
use ethers::providers::Middleware;
use ethers::types::{Address, U256};

use crate::blockchain::events::ApprovalFilter;
use crate::blockchain::{LendingPoolContract, Subscription, TokenContract, TxSigner};
use crate::types::{ClientResult, PendingTx, WatchOpts};

/// 예치 흐름에 필요한 원격 효과
///
/// 시퀀서는 이 트레이트만 보고 동작한다. 실제 구현은 두 파사드와 서명자를
/// 묶은 [`LendingGateway`], 테스트에서는 `mocks::MockDepositGateway`.
#[async_trait]
pub trait DepositGateway: Send + Sync {
    /// 서명자 주소 (Approval owner)
    fn owner(&self) -> Address;

    /// 토큰을 끌어갈 풀 주소 (Approval spender)
    fn spender(&self) -> Address;

    /// `approve(spender, amount)` 전송
    async fn approve(&self, amount: U256) -> ClientResult<PendingTx>;

    /// owner/spender로 필터링된 Approval 구독
    async fn watch_approval(&self, owner: Address, spender: Address) -> ClientResult<Subscription<ApprovalFilter>>;

    /// `deposit(amount)` 전송
    async fn deposit(&self, amount: U256) -> ClientResult<PendingTx>;
}

/// 실제 컨트랙트로 가는 게이트웨이
pub struct LendingGateway<M> {
    lending: LendingPoolContract<M>,
    token: TokenContract<M>,
    signer: TxSigner,
}

impl<M> LendingGateway<M>
where
    M: Middleware + Clone + 'static,
{
    pub fn new(lending: LendingPoolContract<M>, token: TokenContract<M>, signer: TxSigner) -> Self {
        Self { lending, token, signer }
    }
}

#[async_trait]
impl<M> DepositGateway for LendingGateway<M>
where
    M: Middleware + Clone + 'static,
{
    fn owner(&self) -> Address {
        self.signer.address()
    }

    fn spender(&self) -> Address {
        self.lending.address()
    }

    async fn approve(&self, amount: U256) -> ClientResult<PendingTx> {
        self.token.approve(&self.signer, self.lending.address(), amount).await
    }

    async fn watch_approval(&self, owner: Address, spender: Address) -> ClientResult<Subscription<ApprovalFilter>> {
        self.token.watch_approval(WatchOpts::default(), &[owner], &[spender]).await
    }

    async fn deposit(&self, amount: U256) -> ClientResult<PendingTx> {
        self.lending.deposit(&self.signer, amount).await
    }
}
