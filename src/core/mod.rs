pub mod commands;
pub mod gateway;
pub mod reader;
pub mod sequencer;
pub mod stage;

pub use commands::{execute, preflight, CommandOutput};
pub use gateway::{DepositGateway, LendingGateway};
pub use reader::{DepositReader, ReadOutcome, ReadQuery};
pub use sequencer::{DepositOutcome, DepositProgress, DepositSequencer, ProgressSink};
pub use stage::CommandStage;
