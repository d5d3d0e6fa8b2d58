use std::sync::Arc;
use std::time::Duration;

use ethers::providers::{Http, Middleware, Provider, Ws};
use ethers::types::Address;
use tracing::{debug, info};

use super::contracts::{LendingPoolContract, TokenContract};
use super::signer::TxSigner;
use crate::config::NetworkConfig;
use crate::types::{ClientError, ClientResult};

/// RPC URL 스킴으로 결정되는 트랜스포트
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Http,
    Ws,
}

impl TransportKind {
    pub fn from_url(url: &str) -> ClientResult<Self> {
        let lower = url.trim().to_ascii_lowercase();
        if lower.starts_with("ws://") || lower.starts_with("wss://") {
            Ok(Self::Ws)
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Self::Http)
        } else {
            Err(ClientError::Config(format!("지원하지 않는 RPC URL 스킴: {}", url)))
        }
    }
}

/// 블록체인 RPC 클라이언트
///
/// 연결된 프로바이더와 체인 ID를 들고 있고, 파사드와 서명자를 만들어 준다.
pub struct BlockchainClient<M> {
    provider: Arc<M>,
    chain_id: u64,
    poll_interval: Duration,
}

impl<M> BlockchainClient<M>
where
    M: Middleware + Clone + 'static,
{
    /// 이미 만들어진 프로바이더로 생성
    ///
    /// 체인 ID는 설정에 고정돼 있지 않으면 노드에서 가져온다.
    pub async fn with_provider(provider: M, network: &NetworkConfig) -> ClientResult<Self> {
        let chain_id = resolve_chain_id(&provider, network.chain_id).await?;
        info!("🔗 체인 ID: {}", chain_id);

        Ok(Self {
            provider: Arc::new(provider),
            chain_id,
            poll_interval: network.poll_interval(),
        })
    }

    pub fn provider(&self) -> Arc<M> {
        Arc::clone(&self.provider)
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// DeFiLending 파사드
    pub fn lending_pool(&self, address: Address) -> ClientResult<LendingPoolContract<M>> {
        Ok(LendingPoolContract::new(address, self.provider())?.with_poll_interval(self.poll_interval))
    }

    /// uSDC 파사드
    pub fn token(&self, address: Address) -> ClientResult<TokenContract<M>> {
        Ok(TokenContract::new(address, self.provider())?.with_poll_interval(self.poll_interval))
    }

    /// 현재 체인 ID로 서명자 생성
    pub fn signer(&self, private_key: &str) -> ClientResult<TxSigner> {
        let signer = TxSigner::from_hex(private_key, self.chain_id)?;
        info!("🔑 서명자: {:?}", signer.address());
        Ok(signer)
    }
}

/// 노드 체인 ID 확인 (`eth_chainId`)
///
/// 설정에 고정된 값이 노드와 다르면 설정 에러.
pub async fn resolve_chain_id<M: Middleware>(provider: &M, pinned: Option<u64>) -> ClientResult<u64> {
    let reported = provider
        .get_chainid()
        .await
        .map_err(|e| ClientError::Connection(format!("체인 ID 조회 실패: {}", e)))?
        .as_u64();

    match pinned {
        Some(expected) if expected != reported => Err(ClientError::Config(format!(
            "설정된 체인 ID {}와 노드 체인 ID {}가 다릅니다",
            expected, reported
        ))),
        _ => Ok(reported),
    }
}

/// 트랜스포트별 연결
pub enum RpcConnection {
    Http(BlockchainClient<Provider<Http>>),
    Ws(BlockchainClient<Provider<Ws>>),
}

/// RPC URL 스킴에 맞춰 연결
pub async fn connect(network: &NetworkConfig) -> ClientResult<RpcConnection> {
    let url = network.rpc_url.trim();
    if url.is_empty() {
        return Err(ClientError::Config("RPC_URL environment variable not set".to_string()));
    }

    info!("🔌 블록체인 RPC 연결: {}", url);

    match TransportKind::from_url(url)? {
        TransportKind::Http => {
            let provider = Provider::<Http>::try_from(url)
                .map_err(|e| ClientError::Config(format!("잘못된 RPC URL {}: {}", url, e)))?
                .interval(network.poll_interval());
            debug!("🌐 HTTP 트랜스포트");
            Ok(RpcConnection::Http(BlockchainClient::with_provider(provider, network).await?))
        }
        TransportKind::Ws => {
            let provider = Provider::<Ws>::connect(url)
                .await
                .map_err(|e| ClientError::Connection(format!("WebSocket 연결 실패 {}: {}", url, e)))?
                .interval(network.poll_interval());
            debug!("🔁 WebSocket 트랜스포트");
            Ok(RpcConnection::Ws(BlockchainClient::with_provider(provider, network).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::providers::MockProvider;
    use ethers::types::U256;

    fn network(chain_id: Option<u64>) -> NetworkConfig {
        NetworkConfig {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id,
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn test_transport_from_url() {
        assert_eq!(TransportKind::from_url("https://sepolia.example.org").unwrap(), TransportKind::Http);
        assert_eq!(TransportKind::from_url("http://127.0.0.1:8545").unwrap(), TransportKind::Http);
        assert_eq!(TransportKind::from_url("wss://sepolia.example.org/ws").unwrap(), TransportKind::Ws);
        assert_eq!(TransportKind::from_url("WS://localhost:8546").unwrap(), TransportKind::Ws);
        assert!(matches!(TransportKind::from_url("ipc:///tmp/geth.ipc"), Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_chain_id_discovered_from_node() {
        let (provider, mock) = Provider::mocked();
        mock.push::<U256, _>(U256::from(11_155_111u64)).unwrap();

        let client = BlockchainClient::with_provider(provider, &network(None)).await.unwrap();
        assert_eq!(client.chain_id(), 11_155_111);

        let signer = client.signer("0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80").unwrap();
        assert_eq!(signer.chain_id(), 11_155_111);
    }

    #[tokio::test]
    async fn test_pinned_chain_id_mismatch_is_config_error() {
        let (provider, mock) = Provider::mocked();
        mock.push::<U256, _>(U256::from(1u64)).unwrap();

        let result = resolve_chain_id(&provider, Some(31337)).await;
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_connection_error() {
        let provider: Provider<MockProvider> = Provider::mocked().0;

        let result = resolve_chain_id(&provider, None).await;
        assert!(matches!(result, Err(ClientError::Connection(_))));
    }

    #[tokio::test]
    async fn test_empty_rpc_url_is_config_error() {
        let mut config = network(None);
        config.rpc_url = "  ".to_string();

        assert!(matches!(connect(&config).await, Err(ClientError::Config(_))));
    }
}
