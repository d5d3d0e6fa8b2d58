use std::env;
use std::path::Path;
use std::time::Duration;

use ethers::types::Address;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::types::{ClientError, ClientResult};

/// DeFiLending 프록시 기본 배포 주소
pub const DEFAULT_LENDING_POOL: &str = "0x6b338b0ab70B08ABEf6F4344F8dB3Bd3e42591Cc";
/// uSDC 기본 배포 주소
pub const DEFAULT_TOKEN: &str = "0xae624D2005c193aA546e29Ecc3346307A3dDfdD2";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// `http(s)://` 또는 `ws(s)://`
    pub rpc_url: String,
    /// 고정 체인 ID. 없으면 노드에서 조회
    pub chain_id: Option<u64>,
    /// 로그 필터 폴링 주기
    pub poll_interval_ms: u64,
}

impl NetworkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: String::new(),
            chain_id: None,
            poll_interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContractConfig {
    pub lending_pool: Address,
    pub token: Address,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            lending_pool: parse_builtin(DEFAULT_LENDING_POOL),
            token: parse_builtin(DEFAULT_TOKEN),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DepositConfig {
    /// CLI 금액 배율 (10^decimals)
    pub decimals: u32,
    /// Approval 이벤트 대기 시간
    pub approval_timeout_secs: u64,
}

impl DepositConfig {
    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }
}

impl Default for DepositConfig {
    fn default() -> Self {
        Self {
            decimals: 6,
            approval_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub log_level: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub contracts: ContractConfig,
    pub deposit: DepositConfig,
    pub monitoring: MonitoringConfig,
}

impl Config {
    /// TOML 설정 파일 로드
    pub async fn load<P: AsRef<Path>>(path: P) -> ClientResult<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ClientError::Config(format!("설정 파일을 읽을 수 없습니다 {}: {}", path.display(), e)))?;

        toml::from_str(&content)
            .map_err(|e| ClientError::Config(format!("설정 파일 파싱 실패 {}: {}", path.display(), e)))
    }

    /// 설정 파일(선택) + 환경 변수 + 검증
    pub async fn resolve(path: Option<&str>) -> ClientResult<Self> {
        let mut config = match path {
            Some(path) => {
                info!("📋 설정 파일 로드 중: {}", path);
                Self::load(path).await?
            }
            None => Self::default(),
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// 프로세스 환경 변수 적용
    pub fn apply_env_overrides(&mut self) -> ClientResult<()> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// 조회 함수로 받은 값 적용
    pub fn apply_overrides<F>(&mut self, lookup: F) -> ClientResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rpc_url) = lookup("RPC_URL") {
            self.network.rpc_url = rpc_url;
            info!("🌐 RPC URL loaded from environment");
        }

        if let Some(address) = lookup("LENDING_POOL_ADDRESS") {
            self.contracts.lending_pool = parse_address("LENDING_POOL_ADDRESS", &address)?;
        }

        if let Some(address) = lookup("TOKEN_ADDRESS") {
            self.contracts.token = parse_address("TOKEN_ADDRESS", &address)?;
        }

        if let Some(decimals) = lookup("TOKEN_DECIMALS") {
            self.deposit.decimals = decimals
                .trim()
                .parse()
                .map_err(|e| ClientError::Config(format!("TOKEN_DECIMALS 값이 잘못됐습니다 {}: {}", decimals, e)))?;
        }

        if let Some(timeout) = lookup("APPROVAL_TIMEOUT_SECS") {
            self.deposit.approval_timeout_secs = timeout.trim().parse().map_err(|e| {
                ClientError::Config(format!("APPROVAL_TIMEOUT_SECS 값이 잘못됐습니다 {}: {}", timeout, e))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> ClientResult<()> {
        if self.network.rpc_url.trim().is_empty() {
            return Err(ClientError::Config("RPC_URL environment variable not set".to_string()));
        }

        if self.network.poll_interval_ms == 0 {
            return Err(ClientError::Config("network.poll_interval_ms must be greater than 0".to_string()));
        }

        if self.deposit.approval_timeout_secs == 0 {
            return Err(ClientError::Config("deposit.approval_timeout_secs must be greater than 0".to_string()));
        }

        if self.deposit.decimals > 77 {
            return Err(ClientError::Config(format!("unsupported token decimals: {}", self.deposit.decimals)));
        }

        Ok(())
    }
}

fn parse_address(name: &str, value: &str) -> ClientResult<Address> {
    value
        .trim()
        .parse()
        .map_err(|e| ClientError::Config(format!("{} 주소가 잘못됐습니다 {}: {}", name, value, e)))
}

fn parse_builtin(address: &str) -> Address {
    address.parse().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.contracts.lending_pool, DEFAULT_LENDING_POOL.parse::<Address>().unwrap());
        assert_eq!(config.contracts.token, DEFAULT_TOKEN.parse::<Address>().unwrap());
        assert_eq!(config.deposit.decimals, 6);
        assert_eq!(config.deposit.approval_timeout(), Duration::from_secs(60));
        assert_eq!(config.network.chain_id, None);
        assert!(config.network.rpc_url.is_empty());
    }

    #[test]
    fn test_missing_rpc_url_is_config_error() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(ClientError::Config(_))));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(lookup(&[
                ("RPC_URL", "wss://sepolia.example.org"),
                ("TOKEN_ADDRESS", "0x0000000000000000000000000000000000000001"),
                ("TOKEN_DECIMALS", "18"),
                ("APPROVAL_TIMEOUT_SECS", "5"),
            ]))
            .unwrap();

        assert_eq!(config.network.rpc_url, "wss://sepolia.example.org");
        assert_eq!(config.contracts.token, Address::from_low_u64_be(1));
        assert_eq!(config.deposit.decimals, 18);
        assert_eq!(config.deposit.approval_timeout_secs, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_bad_override_is_config_error() {
        let mut config = Config::default();
        let result = config.apply_overrides(lookup(&[("LENDING_POOL_ADDRESS", "not-an-address")]));
        assert!(matches!(result, Err(ClientError::Config(_))));

        let result = config.apply_overrides(lookup(&[("TOKEN_DECIMALS", "six")]));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[tokio::test]
    async fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[network]
rpc_url = "http://127.0.0.1:8545"
chain_id = 31337

[deposit]
approval_timeout_secs = 120
"#
        )
        .unwrap();

        let config = Config::load(file.path()).await.unwrap();

        assert_eq!(config.network.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(config.network.chain_id, Some(31337));
        assert_eq!(config.network.poll_interval_ms, 1000);
        assert_eq!(config.deposit.approval_timeout_secs, 120);
        assert_eq!(config.deposit.decimals, 6);
        assert_eq!(config.contracts, ContractConfig::default());
    }

    #[tokio::test]
    async fn test_load_errors() {
        assert!(matches!(
            Config::load("/nonexistent/defi-lending.toml").await,
            Err(ClientError::Config(_))
        ));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[network\nrpc_url = 1").unwrap();
        assert!(matches!(Config::load(file.path()).await, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }
}
