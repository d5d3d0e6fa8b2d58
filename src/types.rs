use ethers::types::{Address, BlockNumber, Log, TxHash, H256, U256, U64};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 클라이언트 에러 타입
///
/// 모든 에러는 치명적이며 재시도하지 않는다. 바이너리는 이 값을 출력하고
/// 종료 코드 1로 끝난다.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    /// 환경 변수 / 플래그 / 설정 파일 문제
    #[error("Configuration error: {0}")]
    Config(String),

    /// 트랜스포트 연결 실패 또는 구독 스트림 종료
    #[error("Connection error: {0}")]
    Connection(String),

    /// 개인키 파싱 또는 서명 실패
    #[error("Signing error: {0}")]
    Signing(String),

    /// 노드가 읽기 호출을 거부함
    #[error("Remote error: {0}")]
    Remote(String),

    /// 노드가 서명된 트랜잭션을 거부함
    #[error("Broadcast error: {0}")]
    Broadcast(String),

    /// ABI 형태 불일치
    #[error("Decode error: {0}")]
    Decode(String),

    /// 이벤트 대기 시간 초과
    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Result type alias
pub type ClientResult<T> = Result<T, ClientError>;

/// 브로드캐스트된 트랜잭션 핸들
///
/// 영수증은 조회하지 않는다. 해시를 넘겨받은 호출자가 추적을 이어간다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingTx {
    /// 트랜잭션 해시
    pub hash: TxHash,
    /// 호출 대상 컨트랙트
    pub contract: Address,
    /// 호출한 ABI 함수 이름
    pub method: String,
}

impl fmt::Display for PendingTx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?}) tx={:?}", self.method, self.contract, self.hash)
    }
}

/// 디코딩된 이벤트 로그
///
/// `event`는 타입이 지정된 필드, 나머지는 로그 원본 메타데이터.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord<E> {
    pub event: E,
    /// 로그를 발생시킨 컨트랙트
    pub address: Address,
    pub block_number: Option<u64>,
    pub transaction_hash: Option<H256>,
    pub log_index: Option<U256>,
    /// 원본 로그
    pub raw: Log,
}

impl<E> EventRecord<E> {
    pub fn new(event: E, raw: Log) -> Self {
        Self {
            event,
            address: raw.address,
            block_number: raw.block_number.map(|n| n.as_u64()),
            transaction_hash: raw.transaction_hash,
            log_index: raw.log_index,
            raw,
        }
    }
}

/// 과거 로그 조회 범위
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FilterOpts {
    /// 시작 블록 (포함)
    pub from_block: u64,
    /// 종료 블록 (포함), None이면 latest
    pub to_block: Option<u64>,
}

impl FilterOpts {
    pub fn range(from_block: u64, to_block: u64) -> Self {
        Self { from_block, to_block: Some(to_block) }
    }

    pub(crate) fn from_block_number(&self) -> BlockNumber {
        BlockNumber::Number(U64::from(self.from_block))
    }

    pub(crate) fn to_block_number(&self) -> BlockNumber {
        match self.to_block {
            Some(n) => BlockNumber::Number(U64::from(n)),
            None => BlockNumber::Latest,
        }
    }
}

/// 읽기 호출 옵션
///
/// 기본값은 latest 블록, 발신자 없음.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CallOpts {
    /// 조회 기준 블록 (None이면 latest)
    pub block: Option<BlockNumber>,
    /// `eth_call`의 from 주소
    pub from: Option<Address>,
}

impl CallOpts {
    /// 특정 블록 기준 조회
    pub fn at_block(number: u64) -> Self {
        Self {
            block: Some(BlockNumber::Number(U64::from(number))),
            from: None,
        }
    }

    /// pending 상태 기준 조회
    pub fn pending() -> Self {
        Self {
            block: Some(BlockNumber::Pending),
            from: None,
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    pub(crate) fn block_number(&self) -> BlockNumber {
        self.block.unwrap_or(BlockNumber::Latest)
    }
}

/// 트랜잭션 옵션
///
/// 비어 있는 필드는 서명 미들웨어가 노드에서 채운다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxOpts {
    /// 함께 보낼 wei
    pub value: Option<U256>,
    pub gas: Option<U256>,
    pub gas_price: Option<U256>,
    pub nonce: Option<U256>,
}

/// 실시간 구독 옵션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WatchOpts {
    /// 이 블록부터의 과거 로그를 먼저 전달 (None이면 새 로그만)
    pub start: Option<u64>,
}

impl WatchOpts {
    pub fn from_block(start: u64) -> Self {
        Self { start: Some(start) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_record_copies_origin() {
        let raw = Log {
            address: Address::repeat_byte(0x11),
            block_number: Some(U64::from(42u64)),
            transaction_hash: Some(H256::repeat_byte(0xaa)),
            log_index: Some(U256::from(3u64)),
            ..Default::default()
        };

        let record = EventRecord::new((), raw.clone());

        assert_eq!(record.address, Address::repeat_byte(0x11));
        assert_eq!(record.block_number, Some(42));
        assert_eq!(record.transaction_hash, Some(H256::repeat_byte(0xaa)));
        assert_eq!(record.log_index, Some(U256::from(3u64)));
        assert_eq!(record.raw, raw);
    }

    #[test]
    fn test_filter_opts_bounds() {
        let open = FilterOpts::default();
        assert_eq!(open.from_block_number(), BlockNumber::Number(U64::zero()));
        assert_eq!(open.to_block_number(), BlockNumber::Latest);

        let bounded = FilterOpts::range(100, 200);
        assert_eq!(bounded.to_block_number(), BlockNumber::Number(U64::from(200u64)));
    }

    #[test]
    fn test_call_opts_block() {
        assert_eq!(CallOpts::default().block_number(), BlockNumber::Latest);
        assert_eq!(CallOpts::pending().block_number(), BlockNumber::Pending);

        let historical = CallOpts::at_block(17).with_from(Address::repeat_byte(0x01));
        assert_eq!(historical.block_number(), BlockNumber::Number(U64::from(17u64)));
        assert_eq!(historical.from, Some(Address::repeat_byte(0x01)));
    }

    #[test]
    fn test_error_messages() {
        let err = ClientError::Timeout("Approval event not received within 60s".to_string());
        assert_eq!(err.to_string(), "Timeout error: Approval event not received within 60s");
    }
}
