use std::ffi::OsString;

use clap::builder::NonEmptyStringValueParser;
use clap::error::ErrorKind;
use clap::{Arg, ArgMatches, Command};
use ethers::types::Address;

/// 실행할 서브커맨드
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CliCommand {
    /// approve → Approval 대기 → deposit
    Deposit { amount: String, private_key: String },
    /// 풀 전체 예치액
    Total,
    /// 사용자 예치액
    User { address: Address },
}

impl CliCommand {
    pub fn name(&self) -> &'static str {
        match self {
            CliCommand::Deposit { .. } => "deposit",
            CliCommand::Total => "total",
            CliCommand::User { .. } => "user",
        }
    }
}

/// 모든 서브커맨드에 공통인 옵션
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalOptions {
    pub config: Option<String>,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub global: GlobalOptions,
    pub command: CliCommand,
}

pub fn build_cli() -> Command {
    Command::new("defi-lending")
        .version(env!("CARGO_PKG_VERSION"))
        .author("xCrack Team <team@xcrack.dev>")
        .about("🏦 DeFiLending 풀 / uSDC 토큰 클라이언트")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로 (TOML)")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .global(true),
        )
        .subcommand(
            Command::new("deposit")
                .about("uSDC를 approve 한 뒤 풀에 예치")
                .arg(
                    Arg::new("amount")
                        .long("amount")
                        .value_name("AMOUNT")
                        .help("예치할 정수 토큰 수량 (예: '10' = 10 토큰)")
                        .value_parser(NonEmptyStringValueParser::new())
                        .required(true),
                )
                .arg(
                    Arg::new("private-key")
                        .long("private-key")
                        .value_name("HEX")
                        .help("서명용 개인키")
                        .value_parser(NonEmptyStringValueParser::new())
                        .required(true),
                ),
        )
        .subcommand(Command::new("total").about("풀 전체 예치액 조회"))
        .subcommand(
            Command::new("user").about("사용자 예치액 조회").arg(
                Arg::new("address")
                    .long("address")
                    .value_name("ADDRESS")
                    .help("조회할 사용자 주소")
                    .value_parser(parse_address)
                    .required(true),
            ),
        )
}

/// 인자 목록 파싱
///
/// 네트워크에 접근하지 않는다. 도움말/버전 출력도 `Err`로 돌아오므로
/// 호출자가 [`exit_code`]로 종료 코드를 정한다.
pub fn parse_from<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;
    from_matches(&matches)
}

fn from_matches(matches: &ArgMatches) -> Result<Cli, clap::Error> {
    let global = GlobalOptions {
        config: matches.get_one::<String>("config").cloned(),
        log_level: matches.get_one::<String>("log-level").cloned(),
    };

    let command = match matches.subcommand() {
        Some(("deposit", sub)) => CliCommand::Deposit {
            amount: required::<String>(sub, "amount")?,
            private_key: required::<String>(sub, "private-key")?,
        },
        Some(("total", _)) => CliCommand::Total,
        Some(("user", sub)) => CliCommand::User {
            address: required::<Address>(sub, "address")?,
        },
        _ => {
            return Err(build_cli().error(
                ErrorKind::MissingSubcommand,
                "Expected 'deposit', 'total', or 'user' subcommand",
            ))
        }
    };

    Ok(Cli { global, command })
}

fn required<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, id: &str) -> Result<T, clap::Error> {
    matches
        .get_one::<T>(id)
        .cloned()
        .ok_or_else(|| build_cli().error(ErrorKind::MissingRequiredArgument, format!("--{} is required", id)))
}

fn parse_address(value: &str) -> Result<Address, String> {
    value
        .trim()
        .parse::<Address>()
        .map_err(|e| format!("invalid address '{}': {}", value, e))
}

/// clap 에러의 종료 코드 (도움말/버전은 0, 나머지는 1)
pub fn exit_code(error: &clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_deposit() {
        let cli = parse_from(["defi-lending", "deposit", "--amount", "10", "--private-key", "0xabc"]).unwrap();

        assert_eq!(
            cli.command,
            CliCommand::Deposit {
                amount: "10".to_string(),
                private_key: "0xabc".to_string(),
            }
        );
        assert_eq!(cli.global, GlobalOptions::default());
    }

    #[test]
    fn test_parse_reads_and_globals() {
        let cli = parse_from(["defi-lending", "--log-level", "debug", "total"]).unwrap();
        assert_eq!(cli.command, CliCommand::Total);
        assert_eq!(cli.global.log_level.as_deref(), Some("debug"));

        let cli = parse_from([
            "defi-lending",
            "user",
            "--address",
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266",
            "--config",
            "local.toml",
        ])
        .unwrap();
        assert_eq!(
            cli.command,
            CliCommand::User {
                address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse().unwrap(),
            }
        );
        assert_eq!(cli.global.config.as_deref(), Some("local.toml"));
    }

    #[test]
    fn test_user_without_address_is_usage_error() {
        let err = parse_from(["defi-lending", "user"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_deposit_requires_both_flags() {
        let err = parse_from(["defi-lending", "deposit", "--amount", "10"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);

        let err = parse_from(["defi-lending", "deposit", "--amount", "", "--private-key", "0xabc"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);
    }

    #[test]
    fn test_unknown_or_missing_subcommand_is_usage_error() {
        let err = parse_from(["defi-lending", "withdraw"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);

        let err = parse_from(["defi-lending"]).unwrap_err();
        assert_eq!(exit_code(&err), 1);

        let err = parse_from(["defi-lending", "user", "--address", "0x1234"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_help_exits_zero() {
        let err = parse_from(["defi-lending", "--help"]).unwrap_err();
        assert_eq!(exit_code(&err), 0);
    }
}
