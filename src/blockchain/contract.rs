//! ABI 기반 범용 컨트랙트 핸들
//!
//! 파사드들은 모두 이 핸들 위에 얇게 올라간다. 읽기는 `eth_call`,
//! 쓰기는 `SignerMiddleware`로 서명 후 브로드캐스트, 이벤트는
//! `eth_getLogs`(과거)와 노드 필터 폴링(실시간)으로 처리한다.
//! 호출은 함수 이름 + 인자로 만들거나, 생성된 바인딩의 `ContractCall`을
//! 그대로 넘긴다.

use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use ethers::abi::{self, Detokenize, Function, ParamType, Tokenize};
use ethers::contract::{ContractCall, EthEvent};
use ethers::middleware::signer::SignerMiddlewareError;
use ethers::middleware::SignerMiddleware;
use ethers::providers::{FilterKind, Middleware, MiddlewareError};
use ethers::signers::LocalWallet;
use ethers::types::{
    transaction::eip2718::TypedTransaction, Address, BlockId, BlockNumber, Bytes, Filter, Log,
    TransactionRequest, ValueOrArray, U256, U64,
};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::abi::ContractAbi;
use super::events::{decode_event, IndexedFilter};
use super::signer::TxSigner;
use super::subscription::{poll_filter, Subscription, SUBSCRIPTION_BUFFER};
use crate::types::{CallOpts, ClientError, ClientResult, EventRecord, FilterOpts, PendingTx, TxOpts, WatchOpts};

/// 기본 필터 폴링 주기
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// 인덱싱 가능한 토픽 최대 개수 (topic0 제외)
const MAX_INDEXED_TOPICS: usize = 3;

/// calldata 없는 송금의 `PendingTx::method`
pub const VALUE_TRANSFER: &str = "value-transfer";

/// 주소 + ABI + 트랜스포트로 묶인 컨트랙트 핸들
pub struct ContractHandle<M> {
    address: Address,
    abi: Arc<ContractAbi>,
    client: Arc<M>,
    poll_interval: Duration,
    call_opts: CallOpts,
    tx_opts: TxOpts,
}

impl<M> Clone for ContractHandle<M> {
    fn clone(&self) -> Self {
        Self {
            address: self.address,
            abi: Arc::clone(&self.abi),
            client: Arc::clone(&self.client),
            poll_interval: self.poll_interval,
            call_opts: self.call_opts,
            tx_opts: self.tx_opts,
        }
    }
}

impl<M> ContractHandle<M>
where
    M: Middleware + Clone + 'static,
{
    pub fn new(address: Address, abi: Arc<ContractAbi>, client: Arc<M>) -> Self {
        Self {
            address,
            abi,
            client,
            poll_interval: DEFAULT_POLL_INTERVAL,
            call_opts: CallOpts::default(),
            tx_opts: TxOpts::default(),
        }
    }

    /// 실시간 구독의 필터 폴링 주기 변경
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// 이후 읽기 호출에 쓸 기본 옵션
    pub fn with_call_opts(mut self, call_opts: CallOpts) -> Self {
        self.call_opts = call_opts;
        self
    }

    /// 이후 트랜잭션에 쓸 기본 옵션
    pub fn with_tx_opts(mut self, tx_opts: TxOpts) -> Self {
        self.tx_opts = tx_opts;
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn abi(&self) -> &ContractAbi {
        &self.abi
    }

    pub fn client(&self) -> Arc<M> {
        Arc::clone(&self.client)
    }

    pub fn call_opts(&self) -> CallOpts {
        self.call_opts
    }

    pub fn tx_opts(&self) -> TxOpts {
        self.tx_opts
    }

    // ----- 읽기 -----

    /// 읽기 전용 호출 (`eth_call`)
    pub async fn call<T, D>(&self, method: &str, args: T) -> ClientResult<D>
    where
        T: Tokenize,
        D: Detokenize,
    {
        let function = self.abi.function(method)?;
        let calldata = self.encode(function, args)?;
        self.eth_call(function, calldata, self.call_opts).await
    }

    /// 생성된 바인딩 호출을 기본 옵션으로 실행
    pub async fn query<D: Detokenize>(&self, call: ContractCall<M, D>) -> ClientResult<D> {
        self.query_with(call, self.call_opts).await
    }

    /// 생성된 바인딩 호출을 주어진 블록/발신자로 실행
    pub async fn query_with<D: Detokenize>(&self, call: ContractCall<M, D>, opts: CallOpts) -> ClientResult<D> {
        let function = self.declared(&call.function)?;
        let calldata = call.tx.data().cloned().unwrap_or_default();
        self.eth_call(function, calldata, opts).await
    }

    async fn eth_call<D: Detokenize>(&self, function: &Function, calldata: Bytes, opts: CallOpts) -> ClientResult<D> {
        let method = function.name.as_str();

        let mut request = TransactionRequest::new().to(self.address).data(calldata);
        if let Some(from) = opts.from {
            request = request.from(from);
        }
        let tx: TypedTransaction = request.into();

        let output = self
            .client
            .call(&tx, Some(BlockId::Number(opts.block_number())))
            .await
            .map_err(|e| ClientError::Remote(format!("{}.{}: {}", self.abi.name(), method, self.describe_error(&e))))?;

        let kinds: Vec<ParamType> = function.outputs.iter().map(|p| p.kind.clone()).collect();
        let tokens = decode_exact(&kinds, &output)
            .map_err(|e| ClientError::Decode(format!("{}.{} 반환값 디코딩 실패: {}", self.abi.name(), method, e)))?;

        D::from_tokens(tokens)
            .map_err(|e| ClientError::Decode(format!("{}.{} 반환 타입 불일치: {}", self.abi.name(), method, e)))
    }

    // ----- 쓰기 -----

    /// 서명된 트랜잭션 전송
    pub async fn transact<T>(&self, signer: &TxSigner, method: &str, args: T) -> ClientResult<PendingTx>
    where
        T: Tokenize,
    {
        let function = self.abi.function(method)?;
        let calldata = self.encode(function, args)?;
        self.send(signer, method, calldata, self.tx_opts).await
    }

    /// ETH를 함께 보내는 트랜잭션 (payable 함수)
    pub async fn transact_with_value<T>(
        &self,
        signer: &TxSigner,
        method: &str,
        args: T,
        value: U256,
    ) -> ClientResult<PendingTx>
    where
        T: Tokenize,
    {
        let function = self.abi.function(method)?;
        let calldata = self.encode(function, args)?;
        let opts = TxOpts {
            value: Some(value),
            ..self.tx_opts
        };
        self.send(signer, method, calldata, opts).await
    }

    /// 생성된 바인딩 호출을 서명해 전송
    pub async fn submit<D: Detokenize>(&self, signer: &TxSigner, call: ContractCall<M, D>) -> ClientResult<PendingTx> {
        self.submit_with(signer, call, self.tx_opts).await
    }

    /// 생성된 바인딩 호출을 주어진 gas/nonce/value로 전송
    pub async fn submit_with<D: Detokenize>(
        &self,
        signer: &TxSigner,
        call: ContractCall<M, D>,
        opts: TxOpts,
    ) -> ClientResult<PendingTx> {
        let method = self.declared(&call.function)?.name.clone();
        let calldata = call.tx.data().cloned().unwrap_or_default();
        self.send(signer, &method, calldata, opts).await
    }

    /// calldata 없이 ETH만 보내기
    pub async fn transfer_value(&self, signer: &TxSigner, value: U256) -> ClientResult<PendingTx> {
        let opts = TxOpts {
            value: Some(value),
            ..self.tx_opts
        };
        self.send(signer, VALUE_TRANSFER, Bytes::new(), opts).await
    }

    async fn send(&self, signer: &TxSigner, method: &str, calldata: Bytes, opts: TxOpts) -> ClientResult<PendingTx> {
        let mut tx = TransactionRequest::new()
            .from(signer.address())
            .to(self.address)
            .data(calldata);
        if let Some(value) = opts.value {
            tx = tx.value(value);
        }
        if let Some(gas) = opts.gas {
            tx = tx.gas(gas);
        }
        if let Some(gas_price) = opts.gas_price {
            tx = tx.gas_price(gas_price);
        }
        if let Some(nonce) = opts.nonce {
            tx = tx.nonce(nonce);
        }

        // 비어 있는 nonce, gas, gas price, chain id는 미들웨어가 채운다
        let client = SignerMiddleware::new((*self.client).clone(), signer.wallet().clone());
        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|e| self.send_error(method, e))?;

        let hash = *pending;
        info!("📤 {}.{} 전송: {:?}", self.abi.name(), method, hash);

        Ok(PendingTx {
            hash,
            contract: self.address,
            method: method.to_string(),
        })
    }

    /// 서명 단계 실패는 `Signing`, 나머지는 `Broadcast`
    fn send_error(&self, method: &str, error: SignerMiddlewareError<M, LocalWallet>) -> ClientError {
        match error {
            SignerMiddlewareError::SignerError(e) => {
                ClientError::Signing(format!("{}.{} 서명 실패: {}", self.abi.name(), method, e))
            }
            SignerMiddlewareError::WrongSigner | SignerMiddlewareError::DifferentChainID => {
                ClientError::Signing(format!("{}.{} 서명 실패: {}", self.abi.name(), method, error))
            }
            other => ClientError::Broadcast(format!("{}.{}: {}", self.abi.name(), method, self.describe_error(&other))),
        }
    }

    // ----- 이벤트 -----

    /// 과거 로그 조회 (`eth_getLogs`)
    ///
    /// `indexed`는 인덱싱된 인자 위치별 필터. 빈 목록은 와일드카드.
    pub async fn filter_logs<E: EthEvent>(&self, opts: FilterOpts, indexed: &[IndexedFilter]) -> ClientResult<LogIter<E>> {
        let filter = self
            .event_filter::<E>(indexed)?
            .from_block(opts.from_block_number())
            .to_block(opts.to_block_number());

        let logs = self
            .client
            .get_logs(&filter)
            .await
            .map_err(|e| ClientError::Remote(format!("{} 로그 조회 실패: {}", E::name(), e)))?;

        debug!("📜 {} 로그 {}개 조회 (from {})", E::name(), logs.len(), opts.from_block);
        Ok(LogIter::new(logs))
    }

    /// 실시간 로그 구독
    ///
    /// 노드에 로그 필터를 설치하고 백그라운드 태스크가 `poll_interval`마다
    /// 변경분을 가져온다. HTTP와 WebSocket 모두에서 동작한다.
    /// `opts.start`가 있으면 그 블록부터의 과거 로그를 먼저 전달한다.
    pub async fn watch_logs<E>(&self, opts: WatchOpts, indexed: &[IndexedFilter]) -> ClientResult<Subscription<E>>
    where
        E: EthEvent + Send + 'static,
    {
        let mut filter = self.event_filter::<E>(indexed)?;
        if let Some(start) = opts.start {
            filter = filter.from_block(BlockNumber::Number(U64::from(start)));
        }

        let client = Arc::clone(&self.client);
        let poll_interval = self.poll_interval;

        let (ready_tx, ready_rx) = oneshot::channel();
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let filter_id = match client.new_filter(FilterKind::Logs(&filter)).await {
                Ok(id) => id,
                Err(e) => {
                    let _ = ready_tx.send(Err(ClientError::Connection(format!(
                        "{} 로그 필터 설치 실패: {}",
                        E::name(),
                        e
                    ))));
                    return;
                }
            };

            let backfill = match opts.start {
                Some(_) => match client.get_logs(&filter).await {
                    Ok(logs) => logs,
                    Err(e) => {
                        let _ = ready_tx.send(Err(ClientError::Remote(format!(
                            "{} 과거 로그 조회 실패: {}",
                            E::name(),
                            e
                        ))));
                        uninstall_filter(client.as_ref(), filter_id, &E::name()).await;
                        return;
                    }
                },
                None => Vec::new(),
            };

            let _ = ready_tx.send(Ok(()));

            poll_filter(client.as_ref(), filter_id, poll_interval, backfill, &sender, &token).await;
            uninstall_filter(client.as_ref(), filter_id, &E::name()).await;
        });

        match ready_rx.await {
            Ok(Ok(())) => {
                debug!("👂 {} 구독 시작 ({:?})", E::name(), self.address);
                Ok(Subscription::new(receiver, cancel, task))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ClientError::Connection(format!("{} 구독 태스크가 필터 설치 전에 종료됨", E::name()))),
        }
    }

    /// 원본 로그 한 개 디코딩
    pub fn parse_log<E: EthEvent>(&self, log: Log) -> ClientResult<EventRecord<E>> {
        self.ensure_event::<E>()?;
        decode_event(log)
    }

    fn ensure_event<E: EthEvent>(&self) -> ClientResult<()> {
        if self.abi.has_event(&E::name()) {
            Ok(())
        } else {
            Err(ClientError::Decode(format!("{}에 {} 이벤트가 없습니다", self.abi.name(), E::name())))
        }
    }

    /// 바인딩 함수가 이 핸들의 ABI에 같은 셀렉터로 있는지 확인
    fn declared(&self, function: &Function) -> ClientResult<&Function> {
        let declared = self.abi.function(&function.name)?;
        if declared.short_signature() != function.short_signature() {
            return Err(ClientError::Decode(format!(
                "{}.{} 셀렉터가 ABI와 다릅니다",
                self.abi.name(),
                function.name
            )));
        }
        Ok(declared)
    }

    fn encode<T: Tokenize>(&self, function: &Function, args: T) -> ClientResult<Bytes> {
        function
            .encode_input(&args.into_tokens())
            .map(Bytes::from)
            .map_err(|e| ClientError::Decode(format!("{}.{} 인자 인코딩 실패: {}", self.abi.name(), function.name, e)))
    }

    /// 이벤트 시그니처 + 인덱싱 인자 필터
    fn event_filter<E: EthEvent>(&self, indexed: &[IndexedFilter]) -> ClientResult<Filter> {
        self.ensure_event::<E>()?;

        if indexed.len() > MAX_INDEXED_TOPICS {
            return Err(ClientError::Decode(format!(
                "{} 인덱싱 필터가 너무 많습니다: {}",
                E::name(),
                indexed.len()
            )));
        }

        let mut filter = Filter::new().address(self.address).topic0(E::signature());
        for (position, values) in indexed.iter().enumerate() {
            if values.is_empty() {
                continue;
            }

            let topic = ValueOrArray::Array(values.iter().copied().map(Some).collect());
            filter = match position {
                0 => filter.topic1(topic),
                1 => filter.topic2(topic),
                _ => filter.topic3(topic),
            };
        }

        Ok(filter)
    }

    /// RPC 에러 메시지에 revert 사유를 붙인다
    fn describe_error<E: MiddlewareError>(&self, error: &E) -> String {
        let reason = error
            .as_error_response()
            .and_then(|response| response.as_revert_data())
            .and_then(|data| self.abi.decode_revert(&data));

        match reason {
            Some(reason) => format!("{} (revert: {})", error, reason),
            None => error.to_string(),
        }
    }
}

async fn uninstall_filter<M: Middleware>(client: &M, filter_id: U256, event: &str) {
    match client.uninstall_filter(filter_id).await {
        Ok(_) => debug!("🧹 {} 로그 필터 제거: {:?}", event, filter_id),
        Err(e) => warn!("⚠️ {} 로그 필터 제거 실패: {}", event, e),
    }
}

/// 출력 타입대로 디코딩하고 남는 바이트가 있으면 거부
fn decode_exact(kinds: &[ParamType], data: &[u8]) -> Result<Vec<abi::Token>, String> {
    let tokens = abi::decode(kinds, data).map_err(|e| e.to_string())?;

    let consumed = abi::encode(&tokens).len();
    if consumed != data.len() {
        return Err(format!("{} 바이트 중 {} 바이트만 사용됨", data.len(), consumed));
    }

    Ok(tokens)
}

/// `filter_logs` 결과 이터레이터
///
/// 로그는 꺼낼 때 디코딩된다. reorg로 제거된 로그는 건너뛴다.
pub struct LogIter<E> {
    logs: std::vec::IntoIter<Log>,
    _event: PhantomData<E>,
}

impl<E> LogIter<E> {
    fn new(logs: Vec<Log>) -> Self {
        Self {
            logs: logs.into_iter(),
            _event: PhantomData,
        }
    }

    /// 아직 꺼내지 않은 로그 수
    pub fn remaining(&self) -> usize {
        self.logs.len()
    }
}

impl<E: EthEvent> Iterator for LogIter<E> {
    type Item = ClientResult<EventRecord<E>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let log = self.logs.next()?;
            if log.removed == Some(true) {
                continue;
            }
            return Some(decode_event(log));
        }
    }
}
