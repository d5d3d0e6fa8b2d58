use std::sync::Arc;
use std::time::Duration;

use ethers::providers::Middleware;
use ethers::types::{Address, Bytes, Log, H256, U256};

use super::abi::ContractAbi;
use super::bindings::{LendingPool, Usdc};
use super::contract::{ContractHandle, LogIter};
use super::events::{
    address_topics, ApprovalFilter, BorrowedFilter, DepositedFilter, InitializedFilter, LiquidatedFilter,
    OwnershipTransferredFilter, RepaidFilter, TransferFilter, UpgradedFilter,
};
use super::signer::TxSigner;
use super::subscription::Subscription;
use crate::types::{CallOpts, ClientResult, EventRecord, FilterOpts, PendingTx, TxOpts, WatchOpts};

/// DeFiLending 풀 컨트랙트 (UUPS 프록시)
///
/// 호출은 생성된 [`LendingPool`] 바인딩으로 만들고 실행은 핸들이 맡는다.
/// 검증이나 재시도는 하지 않는다.
pub struct LendingPoolContract<M> {
    handle: ContractHandle<M>,
    bindings: LendingPool<M>,
}

impl<M> Clone for LendingPoolContract<M> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            bindings: self.bindings.clone(),
        }
    }
}

impl<M> LendingPoolContract<M>
where
    M: Middleware + Clone + 'static,
{
    pub fn new(address: Address, client: Arc<M>) -> ClientResult<Self> {
        Ok(Self {
            handle: ContractHandle::new(address, ContractAbi::lending_pool()?, Arc::clone(&client)),
            bindings: LendingPool::new(address, client),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.handle = self.handle.with_poll_interval(poll_interval);
        self
    }

    /// 이후 조회의 기준 블록 / 발신자
    pub fn with_call_opts(mut self, call_opts: CallOpts) -> Self {
        self.handle = self.handle.with_call_opts(call_opts);
        self
    }

    /// 이후 트랜잭션의 gas / gas price / nonce
    pub fn with_tx_opts(mut self, tx_opts: TxOpts) -> Self {
        self.handle = self.handle.with_tx_opts(tx_opts);
        self
    }

    pub fn address(&self) -> Address {
        self.handle.address()
    }

    pub fn handle(&self) -> &ContractHandle<M> {
        &self.handle
    }

    pub fn bindings(&self) -> &LendingPool<M> {
        &self.bindings
    }

    // ----- 조회 -----

    pub async fn upgrade_interface_version(&self) -> ClientResult<String> {
        self.handle.query(self.bindings.upgrade_interface_version()).await
    }

    /// 사용자 대출 잔액
    pub async fn borrows(&self, user: Address) -> ClientResult<U256> {
        self.handle.query(self.bindings.borrows(user)).await
    }

    /// 사용자 예치 잔액
    pub async fn deposits(&self, user: Address) -> ClientResult<U256> {
        self.handle.query(self.bindings.deposits(user)).await
    }

    pub async fn interest_rate(&self) -> ClientResult<U256> {
        self.handle.query(self.bindings.interest_rate()).await
    }

    pub async fn liquidation_threshold(&self) -> ClientResult<U256> {
        self.handle.query(self.bindings.liquidation_threshold()).await
    }

    pub async fn owner(&self) -> ClientResult<Address> {
        self.handle.query(self.bindings.owner()).await
    }

    pub async fn proxiable_uuid(&self) -> ClientResult<H256> {
        let slot = self.handle.query(self.bindings.proxiable_uuid()).await?;
        Ok(H256::from(slot))
    }

    /// 풀이 받는 토큰 주소
    pub async fn token(&self) -> ClientResult<Address> {
        self.handle.query(self.bindings.token()).await
    }

    pub async fn total_borrows(&self) -> ClientResult<U256> {
        self.handle.query(self.bindings.total_borrows()).await
    }

    pub async fn total_deposits(&self) -> ClientResult<U256> {
        self.handle.query(self.bindings.total_deposits()).await
    }

    // ----- 트랜잭션 -----

    pub async fn borrow(&self, signer: &TxSigner, amount: U256) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.borrow(amount)).await
    }

    /// 예치 (사전에 토큰 approve 필요)
    pub async fn deposit(&self, signer: &TxSigner, amount: U256) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.deposit(amount)).await
    }

    pub async fn initialize(&self, signer: &TxSigner, token: Address) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.initialize(token)).await
    }

    pub async fn liquidate(&self, signer: &TxSigner, user: Address) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.liquidate(user)).await
    }

    pub async fn renounce_ownership(&self, signer: &TxSigner) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.renounce_ownership()).await
    }

    pub async fn repay(&self, signer: &TxSigner, amount: U256) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.repay(amount)).await
    }

    pub async fn transfer_ownership(&self, signer: &TxSigner, new_owner: Address) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.transfer_ownership(new_owner)).await
    }

    /// 구현 컨트랙트 교체 (payable)
    pub async fn upgrade_to_and_call(
        &self,
        signer: &TxSigner,
        new_implementation: Address,
        data: Bytes,
        value: U256,
    ) -> ClientResult<PendingTx> {
        let opts = TxOpts {
            value: Some(value),
            ..self.handle.tx_opts()
        };
        self.handle
            .submit_with(signer, self.bindings.upgrade_to_and_call(new_implementation, data), opts)
            .await
    }

    /// 프록시 주소로 ETH만 보내기
    pub async fn transfer_value(&self, signer: &TxSigner, value: U256) -> ClientResult<PendingTx> {
        self.handle.transfer_value(signer, value).await
    }

    // ----- 이벤트 -----

    pub async fn filter_borrowed(&self, opts: FilterOpts, users: &[Address]) -> ClientResult<LogIter<BorrowedFilter>> {
        self.handle.filter_logs(opts, &[address_topics(users)]).await
    }

    pub async fn watch_borrowed(&self, opts: WatchOpts, users: &[Address]) -> ClientResult<Subscription<BorrowedFilter>> {
        self.handle.watch_logs(opts, &[address_topics(users)]).await
    }

    pub fn parse_borrowed(&self, log: Log) -> ClientResult<EventRecord<BorrowedFilter>> {
        self.handle.parse_log(log)
    }

    pub async fn filter_deposited(&self, opts: FilterOpts, users: &[Address]) -> ClientResult<LogIter<DepositedFilter>> {
        self.handle.filter_logs(opts, &[address_topics(users)]).await
    }

    pub async fn watch_deposited(
        &self,
        opts: WatchOpts,
        users: &[Address],
    ) -> ClientResult<Subscription<DepositedFilter>> {
        self.handle.watch_logs(opts, &[address_topics(users)]).await
    }

    pub fn parse_deposited(&self, log: Log) -> ClientResult<EventRecord<DepositedFilter>> {
        self.handle.parse_log(log)
    }

    pub async fn filter_initialized(&self, opts: FilterOpts) -> ClientResult<LogIter<InitializedFilter>> {
        self.handle.filter_logs(opts, &[]).await
    }

    pub async fn watch_initialized(&self, opts: WatchOpts) -> ClientResult<Subscription<InitializedFilter>> {
        self.handle.watch_logs(opts, &[]).await
    }

    pub fn parse_initialized(&self, log: Log) -> ClientResult<EventRecord<InitializedFilter>> {
        self.handle.parse_log(log)
    }

    pub async fn filter_liquidated(&self, opts: FilterOpts, users: &[Address]) -> ClientResult<LogIter<LiquidatedFilter>> {
        self.handle.filter_logs(opts, &[address_topics(users)]).await
    }

    pub async fn watch_liquidated(
        &self,
        opts: WatchOpts,
        users: &[Address],
    ) -> ClientResult<Subscription<LiquidatedFilter>> {
        self.handle.watch_logs(opts, &[address_topics(users)]).await
    }

    pub fn parse_liquidated(&self, log: Log) -> ClientResult<EventRecord<LiquidatedFilter>> {
        self.handle.parse_log(log)
    }

    pub async fn filter_ownership_transferred(
        &self,
        opts: FilterOpts,
        previous_owners: &[Address],
        new_owners: &[Address],
    ) -> ClientResult<LogIter<OwnershipTransferredFilter>> {
        self.handle
            .filter_logs(opts, &[address_topics(previous_owners), address_topics(new_owners)])
            .await
    }

    pub async fn watch_ownership_transferred(
        &self,
        opts: WatchOpts,
        previous_owners: &[Address],
        new_owners: &[Address],
    ) -> ClientResult<Subscription<OwnershipTransferredFilter>> {
        self.handle
            .watch_logs(opts, &[address_topics(previous_owners), address_topics(new_owners)])
            .await
    }

    pub fn parse_ownership_transferred(&self, log: Log) -> ClientResult<EventRecord<OwnershipTransferredFilter>> {
        self.handle.parse_log(log)
    }

    pub async fn filter_repaid(&self, opts: FilterOpts, users: &[Address]) -> ClientResult<LogIter<RepaidFilter>> {
        self.handle.filter_logs(opts, &[address_topics(users)]).await
    }

    pub async fn watch_repaid(&self, opts: WatchOpts, users: &[Address]) -> ClientResult<Subscription<RepaidFilter>> {
        self.handle.watch_logs(opts, &[address_topics(users)]).await
    }

    pub fn parse_repaid(&self, log: Log) -> ClientResult<EventRecord<RepaidFilter>> {
        self.handle.parse_log(log)
    }

    pub async fn filter_upgraded(
        &self,
        opts: FilterOpts,
        implementations: &[Address],
    ) -> ClientResult<LogIter<UpgradedFilter>> {
        self.handle.filter_logs(opts, &[address_topics(implementations)]).await
    }

    pub async fn watch_upgraded(
        &self,
        opts: WatchOpts,
        implementations: &[Address],
    ) -> ClientResult<Subscription<UpgradedFilter>> {
        self.handle.watch_logs(opts, &[address_topics(implementations)]).await
    }

    pub fn parse_upgraded(&self, log: Log) -> ClientResult<EventRecord<UpgradedFilter>> {
        self.handle.parse_log(log)
    }
}

/// uSDC ERC-20 토큰 컨트랙트
pub struct TokenContract<M> {
    handle: ContractHandle<M>,
    bindings: Usdc<M>,
}

impl<M> Clone for TokenContract<M> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            bindings: self.bindings.clone(),
        }
    }
}

impl<M> TokenContract<M>
where
    M: Middleware + Clone + 'static,
{
    pub fn new(address: Address, client: Arc<M>) -> ClientResult<Self> {
        Ok(Self {
            handle: ContractHandle::new(address, ContractAbi::token()?, Arc::clone(&client)),
            bindings: Usdc::new(address, client),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.handle = self.handle.with_poll_interval(poll_interval);
        self
    }

    pub fn with_call_opts(mut self, call_opts: CallOpts) -> Self {
        self.handle = self.handle.with_call_opts(call_opts);
        self
    }

    pub fn with_tx_opts(mut self, tx_opts: TxOpts) -> Self {
        self.handle = self.handle.with_tx_opts(tx_opts);
        self
    }

    pub fn address(&self) -> Address {
        self.handle.address()
    }

    pub fn handle(&self) -> &ContractHandle<M> {
        &self.handle
    }

    pub fn bindings(&self) -> &Usdc<M> {
        &self.bindings
    }

    pub async fn allowance(&self, owner: Address, spender: Address) -> ClientResult<U256> {
        self.handle.query(self.bindings.allowance(owner, spender)).await
    }

    pub async fn balance_of(&self, account: Address) -> ClientResult<U256> {
        self.handle.query(self.bindings.balance_of(account)).await
    }

    /// 온체인 소수 자릿수 (CLI 금액 변환에는 쓰지 않음)
    pub async fn decimals(&self) -> ClientResult<u8> {
        self.handle.query(self.bindings.decimals()).await
    }

    pub async fn name(&self) -> ClientResult<String> {
        self.handle.query(self.bindings.name()).await
    }

    pub async fn symbol(&self) -> ClientResult<String> {
        self.handle.query(self.bindings.symbol()).await
    }

    pub async fn total_supply(&self) -> ClientResult<U256> {
        self.handle.query(self.bindings.total_supply()).await
    }

    pub async fn approve(&self, signer: &TxSigner, spender: Address, value: U256) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.approve(spender, value)).await
    }

    pub async fn transfer(&self, signer: &TxSigner, to: Address, value: U256) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.transfer(to, value)).await
    }

    pub async fn transfer_from(
        &self,
        signer: &TxSigner,
        from: Address,
        to: Address,
        value: U256,
    ) -> ClientResult<PendingTx> {
        self.handle.submit(signer, self.bindings.transfer_from(from, to, value)).await
    }

    pub async fn filter_approval(
        &self,
        opts: FilterOpts,
        owners: &[Address],
        spenders: &[Address],
    ) -> ClientResult<LogIter<ApprovalFilter>> {
        self.handle
            .filter_logs(opts, &[address_topics(owners), address_topics(spenders)])
            .await
    }

    /// Approval 구독 (owner, spender 로 필터)
    pub async fn watch_approval(
        &self,
        opts: WatchOpts,
        owners: &[Address],
        spenders: &[Address],
    ) -> ClientResult<Subscription<ApprovalFilter>> {
        self.handle
            .watch_logs(opts, &[address_topics(owners), address_topics(spenders)])
            .await
    }

    pub fn parse_approval(&self, log: Log) -> ClientResult<EventRecord<ApprovalFilter>> {
        self.handle.parse_log(log)
    }

    pub async fn filter_transfer(
        &self,
        opts: FilterOpts,
        from: &[Address],
        to: &[Address],
    ) -> ClientResult<LogIter<TransferFilter>> {
        self.handle.filter_logs(opts, &[address_topics(from), address_topics(to)]).await
    }

    pub async fn watch_transfer(
        &self,
        opts: WatchOpts,
        from: &[Address],
        to: &[Address],
    ) -> ClientResult<Subscription<TransferFilter>> {
        self.handle.watch_logs(opts, &[address_topics(from), address_topics(to)]).await
    }

    pub fn parse_transfer(&self, log: Log) -> ClientResult<EventRecord<TransferFilter>> {
        self.handle.parse_log(log)
    }
}
