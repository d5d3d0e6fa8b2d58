use std::fmt;

use ethers::providers::Middleware;
use ethers::types::{Address, U256};
use ethers::utils::to_checksum;
use tracing::info;

use super::gateway::LendingGateway;
use super::reader::{DepositReader, ReadOutcome, ReadQuery};
use super::sequencer::{DepositOutcome, DepositSequencer, ProgressSink};
use crate::blockchain::BlockchainClient;
use crate::cli::CliCommand;
use crate::config::Config;
use crate::types::ClientResult;
use crate::utils::to_base_units;

/// 서브커맨드 실행 결과 (stdout 출력용)
#[derive(Debug, Clone)]
pub enum CommandOutput {
    Deposit(DepositOutcome),
    Total(U256),
    User { address: Address, deposit: U256 },
}

impl CommandOutput {
    /// 진행 싱크로 이미 출력된 결과인지
    pub fn streamed(&self) -> bool {
        matches!(self, CommandOutput::Deposit(_))
    }
}

impl From<ReadOutcome> for CommandOutput {
    fn from(outcome: ReadOutcome) -> Self {
        match outcome {
            ReadOutcome::Total(total) => CommandOutput::Total(total),
            ReadOutcome::User { address, deposit } => CommandOutput::User { address, deposit },
        }
    }
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::Deposit(outcome) => {
                let [approve, approval, deposit] = outcome.progress();
                writeln!(f, "{}", approve)?;
                writeln!(f, "{}", approval)?;
                write!(f, "{}", deposit)
            }
            CommandOutput::Total(total) => write!(f, "Total Deposits: {}", total),
            CommandOutput::User { address, deposit } => {
                write!(f, "Deposit for user {}: {}", to_checksum(address, None), deposit)
            }
        }
    }
}

/// 연결 전에 할 수 있는 검사
///
/// 잘못된 예치 금액은 네트워크에 닿기 전에 설정 에러로 끝난다.
pub fn preflight(command: &CliCommand, config: &Config) -> ClientResult<()> {
    if let CliCommand::Deposit { amount, .. } = command {
        to_base_units(amount, config.deposit.decimals)?;
    }
    Ok(())
}

/// 서브커맨드 실행
///
/// `progress`가 있으면 예치 단계 결과를 일어나는 즉시 넘긴다.
pub async fn execute<M>(
    client: &BlockchainClient<M>,
    config: &Config,
    command: CliCommand,
    progress: Option<ProgressSink>,
) -> ClientResult<CommandOutput>
where
    M: Middleware + Clone + 'static,
{
    info!("🚀 {} 실행", command.name());

    let query = match command {
        CliCommand::Total => ReadQuery::TotalDeposits,
        CliCommand::User { address } => ReadQuery::UserDeposit(address),
        CliCommand::Deposit { amount, private_key } => {
            let signer = client.signer(&private_key)?;
            let gateway = LendingGateway::new(
                client.lending_pool(config.contracts.lending_pool)?,
                client.token(config.contracts.token)?,
                signer,
            );

            let mut sequencer =
                DepositSequencer::new(gateway, config.deposit.decimals, config.deposit.approval_timeout());
            if let Some(sink) = progress {
                sequencer = sequencer.with_progress(sink);
            }
            return Ok(CommandOutput::Deposit(sequencer.run(&amount).await?));
        }
    };

    let mut reader = DepositReader::new(client.lending_pool(config.contracts.lending_pool)?);
    Ok(reader.run(query).await?.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::events::ApprovalFilter;
    use crate::mocks::approval_log;
    use crate::types::{ClientError, EventRecord, PendingTx};
    use ethers::abi::{self, Token};
    use ethers::providers::{MockProvider, Provider};
    use ethers::types::{Bytes, H256};

    async fn client_with(output: Option<U256>) -> BlockchainClient<Provider<MockProvider>> {
        let (provider, mock) = Provider::mocked();
        // LIFO: 호출 결과를 먼저, 체인 ID를 나중에 넣는다
        if let Some(value) = output {
            mock.push::<Bytes, _>(Bytes::from(abi::encode(&[Token::Uint(value)]))).unwrap();
        }
        mock.push::<U256, _>(U256::from(31337u64)).unwrap();

        let mut config = Config::default();
        config.network.rpc_url = "http://127.0.0.1:8545".to_string();
        BlockchainClient::with_provider(provider, &config.network).await.unwrap()
    }

    #[tokio::test]
    async fn test_total() {
        let client = client_with(Some(U256::from(42_000_000u64))).await;

        let output = execute(&client, &Config::default(), CliCommand::Total, None).await.unwrap();
        assert_eq!(output.to_string(), "Total Deposits: 42000000");
    }

    #[tokio::test]
    async fn test_user() {
        let client = client_with(Some(U256::from(10_000_000u64))).await;
        let address: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();

        let output = execute(&client, &Config::default(), CliCommand::User { address }, None).await.unwrap();
        assert_eq!(
            output.to_string(),
            "Deposit for user 0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266: 10000000"
        );
    }

    #[tokio::test]
    async fn test_deposit_with_bad_key_is_signing_error() {
        let client = client_with(None).await;
        let command = CliCommand::Deposit {
            amount: "10".to_string(),
            private_key: "zz".to_string(),
        };

        let result = execute(&client, &Config::default(), command, None).await;
        assert!(matches!(result, Err(ClientError::Signing(_))));
    }

    #[test]
    fn test_preflight_rejects_bad_amount() {
        let config = Config::default();
        let command = CliCommand::Deposit {
            amount: "1.5".to_string(),
            private_key: "0x01".to_string(),
        };

        assert!(matches!(preflight(&command, &config), Err(ClientError::Config(_))));
        assert!(preflight(&CliCommand::Total, &config).is_ok());
    }

    #[test]
    fn test_deposit_output_format() {
        let owner: Address = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266".parse().unwrap();
        let spender = Address::repeat_byte(0x6b);
        let outcome = DepositOutcome {
            amount: U256::from(10_000_000u64),
            approve_tx: PendingTx {
                hash: H256::repeat_byte(0x01),
                contract: Address::repeat_byte(0xae),
                method: "approve".to_string(),
            },
            approval: EventRecord::<ApprovalFilter>::new(
                ApprovalFilter {
                    owner,
                    spender,
                    value: U256::from(10_000_000u64),
                },
                approval_log(owner, spender, U256::from(10_000_000u64)),
            ),
            deposit_tx: PendingTx {
                hash: H256::repeat_byte(0x02),
                contract: spender,
                method: "deposit".to_string(),
            },
        };

        let output = CommandOutput::Deposit(outcome);
        assert!(output.streamed());
        assert!(!CommandOutput::Total(U256::one()).streamed());

        let text = output.to_string();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!("Approve transaction sent, tx hash: 0x{}", "01".repeat(32)));
        assert!(lines[1].starts_with("Received Approval event: owner=0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"));
        assert!(lines[1].ends_with("value=10000000"));
        assert_eq!(lines[2], format!("Deposit transaction sent, tx hash: 0x{}", "02".repeat(32)));
    }
}
