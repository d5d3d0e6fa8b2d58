//! ABI JSON에서 생성한 컨트랙트 바인딩
//!
//! 호출/이벤트 타입은 모두 여기서 나온다. 파사드는 생성된 호출을
//! [`ContractHandle`](super::ContractHandle)로 넘겨 디코딩 규칙을 통일한다.

use ethers::contract::abigen;

abigen!(
    LendingPool,
    "abi/lending_pool.json",
    event_derives(serde::Deserialize, serde::Serialize)
);

abigen!(
    Usdc,
    "abi/usdc.json",
    event_derives(serde::Deserialize, serde::Serialize)
);
