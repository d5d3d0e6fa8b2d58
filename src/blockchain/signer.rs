use ethers::signers::{LocalWallet, Signer};
use ethers::types::Address;

use crate::types::{ClientError, ClientResult};

/// 트랜잭션 서명자
///
/// 개인키와 체인 ID를 묶는다. 키 자체는 로그나 에러 메시지에 남기지 않는다.
#[derive(Clone, Debug)]
pub struct TxSigner {
    wallet: LocalWallet,
}

impl TxSigner {
    /// 16진수 개인키로 생성 (`0x` 접두사 선택)
    pub fn from_hex(private_key: &str, chain_id: u64) -> ClientResult<Self> {
        let trimmed = private_key.trim();
        let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);

        let bytes = hex::decode(stripped)
            .map_err(|e| ClientError::Signing(format!("개인키가 올바른 16진수가 아닙니다: {}", e)))?;
        let wallet = LocalWallet::from_bytes(&bytes)
            .map_err(|e| ClientError::Signing(format!("개인키가 유효하지 않습니다: {}", e)))?
            .with_chain_id(chain_id);

        Ok(Self { wallet })
    }

    pub fn address(&self) -> Address {
        self.wallet.address()
    }

    pub fn chain_id(&self) -> u64 {
        self.wallet.chain_id()
    }

    pub fn wallet(&self) -> &LocalWallet {
        &self.wallet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    const ANVIL_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn test_from_hex_derives_address() {
        let signer = assert_ok!(TxSigner::from_hex(ANVIL_KEY, 31337));

        let expected: Address = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap();
        assert_eq!(signer.address(), expected);
        assert_eq!(signer.chain_id(), 31337);

        // 접두사 없이도 동일
        let bare = assert_ok!(TxSigner::from_hex(&ANVIL_KEY[2..], 1));
        assert_eq!(bare.address(), expected);
    }

    #[test]
    fn test_invalid_keys_are_signing_errors() {
        assert!(matches!(TxSigner::from_hex("not-a-key", 1), Err(ClientError::Signing(_))));
        assert!(matches!(TxSigner::from_hex("0x1234", 1), Err(ClientError::Signing(_))));
        assert!(matches!(TxSigner::from_hex(&"00".repeat(32), 1), Err(ClientError::Signing(_))));
        assert_err!(TxSigner::from_hex("", 1));
    }
}
