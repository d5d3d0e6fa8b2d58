use ethers::abi::{self, Token};
use ethers::contract::EthEvent;
use ethers::types::{Address, Bytes, Log, H256, U256, U64};

use crate::blockchain::events::{ApprovalFilter, DepositedFilter};

/// 테스트용 uSDC 주소
pub const MOCK_TOKEN: Address = Address::repeat_byte(0xae);
/// 테스트용 DeFiLending 주소
pub const MOCK_LENDING_POOL: Address = Address::repeat_byte(0x6b);

/// `Approval(owner, spender, value)` 로그
pub fn approval_log(owner: Address, spender: Address, value: U256) -> Log {
    Log {
        address: MOCK_TOKEN,
        topics: vec![ApprovalFilter::signature(), H256::from(owner), H256::from(spender)],
        data: Bytes::from(abi::encode(&[Token::Uint(value)])),
        block_number: Some(U64::from(1u64)),
        transaction_hash: Some(H256::repeat_byte(0xa1)),
        log_index: Some(U256::zero()),
        removed: Some(false),
        ..Default::default()
    }
}

/// `Deposited(user, amount)` 로그
pub fn deposited_log(user: Address, amount: U256) -> Log {
    Log {
        address: MOCK_LENDING_POOL,
        topics: vec![DepositedFilter::signature(), H256::from(user)],
        data: Bytes::from(abi::encode(&[Token::Uint(amount)])),
        block_number: Some(U64::from(2u64)),
        transaction_hash: Some(H256::repeat_byte(0xd1)),
        log_index: Some(U256::zero()),
        removed: Some(false),
        ..Default::default()
    }
}
