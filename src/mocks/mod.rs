//! 테스트용 목 구현

pub mod gateway_mock;
pub mod logs;

pub use gateway_mock::{ApprovalBehavior, GatewayCall, MockDepositGateway};
pub use logs::{approval_log, deposited_log, MOCK_LENDING_POOL, MOCK_TOKEN};
