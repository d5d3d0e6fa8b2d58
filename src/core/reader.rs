//! 읽기 서브커맨드 (`total`, `user`)
//!
//! 호출 한 번으로 끝난다. 단계는 `Idle → ParsingArgs → Reading → Done`.

use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use tracing::info;

use super::stage::{CommandStage, StageTracker};
use crate::blockchain::LendingPoolContract;
use crate::types::ClientResult;

/// 조회 대상
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadQuery {
    TotalDeposits,
    UserDeposit(Address),
}

impl ReadQuery {
    pub fn name(&self) -> &'static str {
        match self {
            ReadQuery::TotalDeposits => "total",
            ReadQuery::UserDeposit(_) => "user",
        }
    }
}

/// 조회 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Total(U256),
    User { address: Address, deposit: U256 },
}

pub struct DepositReader<M> {
    lending: LendingPoolContract<M>,
    stages: StageTracker,
}

impl<M> DepositReader<M>
where
    M: Middleware + Clone + 'static,
{
    pub fn new(lending: LendingPoolContract<M>) -> Self {
        Self {
            lending,
            stages: StageTracker::new("read"),
        }
    }

    pub fn stage(&self) -> CommandStage {
        self.stages.current()
    }

    pub async fn run(&mut self, query: ReadQuery) -> ClientResult<ReadOutcome> {
        self.stages.advance(CommandStage::ParsingArgs);
        info!("🔍 {} 조회 ({:?})", query.name(), self.lending.address());

        self.stages.advance(CommandStage::Reading);
        let outcome = match query {
            ReadQuery::TotalDeposits => ReadOutcome::Total(self.lending.total_deposits().await?),
            ReadQuery::UserDeposit(address) => ReadOutcome::User {
                address,
                deposit: self.lending.deposits(address).await?,
            },
        };

        self.stages.advance(CommandStage::Done);
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MOCK_LENDING_POOL;
    use crate::types::ClientError;
    use ethers::abi::{self, Token};
    use ethers::providers::{MockProvider, Provider};
    use ethers::types::Bytes;
    use std::sync::Arc;

    fn reader() -> (DepositReader<Provider<MockProvider>>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        let lending = LendingPoolContract::new(MOCK_LENDING_POOL, Arc::new(provider)).unwrap();
        (DepositReader::new(lending), mock)
    }

    #[tokio::test]
    async fn test_total_read_ends_done() {
        let (mut reader, mock) = reader();
        mock.push::<Bytes, _>(Bytes::from(abi::encode(&[Token::Uint(U256::from(42u64))])))
            .unwrap();
        assert_eq!(reader.stage(), CommandStage::Idle);

        let outcome = reader.run(ReadQuery::TotalDeposits).await.unwrap();

        assert_eq!(outcome, ReadOutcome::Total(U256::from(42u64)));
        assert_eq!(reader.stage(), CommandStage::Done);
    }

    #[tokio::test]
    async fn test_user_read_carries_address() {
        let (mut reader, mock) = reader();
        let user = Address::repeat_byte(0x0a);
        mock.push::<Bytes, _>(Bytes::from(abi::encode(&[Token::Uint(U256::from(7u64))])))
            .unwrap();

        let outcome = reader.run(ReadQuery::UserDeposit(user)).await.unwrap();

        assert_eq!(
            outcome,
            ReadOutcome::User {
                address: user,
                deposit: U256::from(7u64)
            }
        );
    }

    #[tokio::test]
    async fn test_node_failure_stops_in_reading() {
        let (mut reader, _mock) = reader();

        let result = reader.run(ReadQuery::TotalDeposits).await;

        assert!(matches!(result, Err(ClientError::Remote(_))));
        assert_eq!(reader.stage(), CommandStage::Reading);
    }
}
