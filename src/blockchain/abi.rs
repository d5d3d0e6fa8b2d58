use std::collections::HashMap;
use std::sync::Arc;
use ethers::abi::{self, Abi, Function, ParamType, Token};
use ethers::utils::id;
use once_cell::sync::OnceCell;
use tracing::debug;

use crate::types::{ClientError, ClientResult};

const LENDING_POOL_ABI_JSON: &str = include_str!("../../abi/lending_pool.json");
const TOKEN_ABI_JSON: &str = include_str!("../../abi/usdc.json");

/// `Error(string)` 셀렉터
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];
/// `Panic(uint256)` 셀렉터
const PANIC_SELECTOR: [u8; 4] = [0x4e, 0x48, 0x7b, 0x71];

static LENDING_POOL_ABI: OnceCell<Arc<ContractAbi>> = OnceCell::new();
static TOKEN_ABI: OnceCell<Arc<ContractAbi>> = OnceCell::new();

/// 파싱된 컨트랙트 ABI
///
/// 함수 셀렉터 테이블과 커스텀 에러 테이블을 함께 들고 있어서
/// calldata 식별과 revert 데이터 해석에 쓴다.
#[derive(Debug)]
pub struct ContractAbi {
    name: String,
    abi: Abi,
    function_signatures: HashMap<[u8; 4], String>,
    error_signatures: HashMap<[u8; 4], (String, Vec<ParamType>)>,
}

impl ContractAbi {
    /// JSON ABI 파싱
    pub fn parse(name: &str, json: &str) -> ClientResult<Self> {
        let abi: Abi = serde_json::from_str(json)
            .map_err(|e| ClientError::Decode(format!("{} ABI 파싱 실패: {}", name, e)))?;

        let function_signatures = abi
            .functions()
            .map(|function| (function.short_signature(), function.name.clone()))
            .collect();

        let error_signatures = abi
            .errors()
            .map(|error| {
                let kinds: Vec<ParamType> = error.inputs.iter().map(|p| p.kind.clone()).collect();
                let signature = format!(
                    "{}({})",
                    error.name,
                    kinds.iter().map(|k| k.to_string()).collect::<Vec<_>>().join(",")
                );
                (id(&signature), (error.name.clone(), kinds))
            })
            .collect();

        debug!("✅ ABI 로드: {} ({} functions, {} events)", name, abi.functions.len(), abi.events.len());

        Ok(Self {
            name: name.to_string(),
            abi,
            function_signatures,
            error_signatures,
        })
    }

    /// DeFiLending 풀 ABI
    pub fn lending_pool() -> ClientResult<Arc<Self>> {
        LENDING_POOL_ABI
            .get_or_try_init(|| Self::parse("DeFiLending", LENDING_POOL_ABI_JSON).map(Arc::new))
            .cloned()
    }

    /// uSDC 토큰 ABI
    pub fn token() -> ClientResult<Arc<Self>> {
        TOKEN_ABI
            .get_or_try_init(|| Self::parse("uSDC", TOKEN_ABI_JSON).map(Arc::new))
            .cloned()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn abi(&self) -> &Abi {
        &self.abi
    }

    /// 이름으로 함수 찾기
    pub fn function(&self, method: &str) -> ClientResult<&Function> {
        self.abi
            .function(method)
            .map_err(|_| ClientError::Decode(format!("{}에 {} 함수가 없습니다", self.name, method)))
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.abi.events.contains_key(event)
    }

    /// calldata 앞 4바이트로 함수 이름 식별
    pub fn identify_function(&self, data: &[u8]) -> Option<&str> {
        if data.len() < 4 {
            return None;
        }

        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[0..4]);
        self.function_signatures.get(&selector).map(String::as_str)
    }

    /// revert 데이터 해석
    ///
    /// ABI 커스텀 에러, `Error(string)`, `Panic(uint256)` 순서로 맞춰 본다.
    pub fn decode_revert(&self, data: &[u8]) -> Option<String> {
        if data.len() < 4 {
            return None;
        }

        let mut selector = [0u8; 4];
        selector.copy_from_slice(&data[0..4]);
        let payload = &data[4..];

        if let Some((name, kinds)) = self.error_signatures.get(&selector) {
            let tokens = abi::decode(kinds, payload).ok()?;
            return Some(format!("{}({})", name, join_tokens(&tokens)));
        }

        match selector {
            ERROR_STRING_SELECTOR => match abi::decode(&[ParamType::String], payload).ok()?.pop()? {
                Token::String(reason) => Some(reason),
                _ => None,
            },
            PANIC_SELECTOR => match abi::decode(&[ParamType::Uint(256)], payload).ok()?.pop()? {
                Token::Uint(code) => Some(format!("Panic(0x{:02x})", code.low_u64())),
                _ => None,
            },
            _ => None,
        }
    }
}

fn join_tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| match token {
            Token::Address(address) => format!("{:?}", address),
            Token::Uint(value) => value.to_string(),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}
