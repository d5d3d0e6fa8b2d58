//! 라이브 이벤트 구독
//!
//! 백그라운드 태스크가 노드 로그 필터(또는 임의의 로그 스트림)를 읽어
//! 디코딩한 뒤 bounded 채널로 넘긴다. `unsubscribe()`는 태스크를 취소하고
//! 끝날 때까지 기다리므로, 반환된 뒤에는 어떤 레코드도 전달되지 않는다.

use std::collections::HashSet;
use std::time::Duration;

use ethers::contract::EthEvent;
use ethers::providers::Middleware;
use ethers::types::{Log, H256, U256};
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::events::decode_event;
use crate::types::{ClientError, ClientResult, EventRecord};

/// 구독 채널 버퍼 크기
pub const SUBSCRIPTION_BUFFER: usize = 64;

/// 타입이 지정된 이벤트 구독
pub struct Subscription<E> {
    receiver: mpsc::Receiver<ClientResult<EventRecord<E>>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<E> Subscription<E>
where
    E: EthEvent + Send + 'static,
{
    pub(crate) fn new(
        receiver: mpsc::Receiver<ClientResult<EventRecord<E>>>,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            receiver,
            cancel,
            task: Some(task),
        }
    }

    /// 임의의 로그 스트림으로 구독 생성
    ///
    /// 노드 필터 없이 스트림을 그대로 소비한다. 스트림이 끝나면
    /// `Connection` 에러가 한 번 전달된다.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = Log> + Send + Unpin + 'static,
    {
        let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut stream = stream;
            forward_logs(&mut stream, &sender, &token).await;
        });

        Self::new(receiver, cancel, task)
    }

    /// 다음 레코드 대기
    ///
    /// 프로듀서가 끝났으면 `None`.
    pub async fn next(&mut self) -> Option<ClientResult<EventRecord<E>>> {
        self.receiver.recv().await
    }

    /// 구독 해제
    ///
    /// 프로듀서를 취소하고 채널을 닫은 뒤 태스크 종료까지 기다린다.
    pub async fn unsubscribe(mut self) {
        self.cancel.cancel();
        self.receiver.close();

        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("⚠️ {} 구독 태스크 종료 실패: {}", E::name(), e);
            }
        }

        debug!("🔕 {} 구독 해제", E::name());
    }
}

impl<E> Drop for Subscription<E> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

type RecordSender<E> = mpsc::Sender<ClientResult<EventRecord<E>>>;

/// 로그 스트림을 구독 채널로 전달
///
/// 취소되거나 수신측이 닫히면 조용히 끝난다. 스트림이 끝나면 `Connection`
/// 에러를 한 번 보낸다.
pub(crate) async fn forward_logs<E, S>(stream: &mut S, sender: &RecordSender<E>, cancel: &CancellationToken)
where
    E: EthEvent,
    S: Stream<Item = Log> + Unpin,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            next = stream.next() => next,
        };

        match next {
            Some(log) => {
                if !deliver(log, sender, cancel).await {
                    return;
                }
            }
            None => {
                send(Err(ClientError::Connection("log stream closed".to_string())), sender, cancel).await;
                return;
            }
        }
    }
}

/// 노드 로그 필터를 `poll_interval`마다 폴링해 구독 채널로 전달
///
/// `backfill`은 폴링 전에 먼저 보낸다. 같은 로그가 첫 변경분에 다시 오면
/// 한 번만 전달한다. 폴링이 실패하면 `Connection` 에러를 보내고 끝난다.
pub(crate) async fn poll_filter<M, E>(
    client: &M,
    filter_id: U256,
    poll_interval: Duration,
    backfill: Vec<Log>,
    sender: &RecordSender<E>,
    cancel: &CancellationToken,
) where
    M: Middleware,
    E: EthEvent,
{
    let mut delivered: HashSet<(Option<H256>, Option<U256>)> = backfill.iter().map(log_key).collect();
    for log in backfill {
        if !deliver(log, sender, cancel).await {
            return;
        }
    }

    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => {}
        }

        let changes = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            changes = client.get_filter_changes::<_, Log>(filter_id) => changes,
        };

        let logs = match changes {
            Ok(logs) => logs,
            Err(e) => {
                warn!("❌ {} 로그 필터 폴링 실패: {}", E::name(), e);
                let error = ClientError::Connection(format!("{} log filter poll failed: {}", E::name(), e));
                send(Err(error), sender, cancel).await;
                return;
            }
        };

        for log in logs {
            if !delivered.is_empty() && delivered.remove(&log_key(&log)) {
                continue;
            }
            if !deliver(log, sender, cancel).await {
                return;
            }
        }
    }
}

/// 로그 한 개를 디코딩해 전달. 계속 진행할 수 있으면 true
///
/// reorg로 제거된 로그는 건너뛴다.
async fn deliver<E: EthEvent>(log: Log, sender: &RecordSender<E>, cancel: &CancellationToken) -> bool {
    if log.removed == Some(true) {
        debug!("↩️ 제거된 {} 로그 무시: {:?}", E::name(), log.transaction_hash);
        return true;
    }
    send(decode_event::<E>(log), sender, cancel).await
}

async fn send<E>(item: ClientResult<EventRecord<E>>, sender: &RecordSender<E>, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        sent = sender.send(item) => sent.is_ok(),
    }
}

fn log_key(log: &Log) -> (Option<H256>, Option<U256>) {
    (log.transaction_hash, log.log_index)
}
