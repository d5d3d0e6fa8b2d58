//! 컨트랙트 이벤트 타입
//!
//! 이벤트 구조체는 ABI JSON에서 생성된 것을 그대로 쓴다. 여기에는 토픽
//! 필터와 로그 디코딩만 둔다.

use ethers::abi::RawLog;
use ethers::contract::EthEvent;
use ethers::types::{Address, Log, H256};

pub use super::bindings::{
    ApprovalFilter, BorrowedFilter, DepositedFilter, InitializedFilter, LiquidatedFilter,
    OwnershipTransferredFilter, RepaidFilter, TransferFilter, UpgradedFilter,
};
use crate::types::{ClientError, ClientResult, EventRecord};

/// 인덱싱된 인자 하나에 대한 필터
///
/// 비어 있으면 와일드카드, 여러 개면 OR 조건.
pub type IndexedFilter = Vec<H256>;

/// 주소 목록을 토픽 필터로 변환
pub fn address_topics(addresses: &[Address]) -> IndexedFilter {
    addresses.iter().map(|address| H256::from(*address)).collect()
}

/// 원본 로그 한 개를 타입이 지정된 이벤트로 디코딩
pub fn decode_event<E: EthEvent>(log: Log) -> ClientResult<EventRecord<E>> {
    let raw = RawLog {
        topics: log.topics.clone(),
        data: log.data.to_vec(),
    };

    let event = <E as EthEvent>::decode_log(&raw).map_err(|e| {
        ClientError::Decode(format!("{} 로그 디코딩 실패 (tx {:?}): {}", E::name(), log.transaction_hash, e))
    })?;

    Ok(EventRecord::new(event, log))
}
