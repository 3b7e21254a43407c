use std::net::Ipv4Addr;

use clap::Parser;
use colored::Colorize;

use sgsync_core::effect::Effect;
use sgsync_core::interpreter::InterpreterConfig;
use sgsync_core::provider::{PublicIpResolver, SecurityGroupProvider};
use sgsync_core::rule::{DesiredRule, RuleIdentity};
use sgsync_core::{GroupReport, SyncObserver, SyncRequest, Synchronizer};
use sgsync_provider_aws::{AwsOptions, AwsProvider, CheckIpResolver, DEFAULT_IP_SERVICE_URL};

#[derive(Parser, Debug)]
#[command(name = "sgsync")]
#[command(
    about = "Point a security group's inbound rule at your current public IP",
    long_about = None
)]
struct Cli {
    /// Security group names, comma-separated
    #[arg(long = "group-name", value_delimiter = ',', required = true)]
    group_names: Vec<String>,

    /// Port to allow
    #[arg(long)]
    port: u16,

    /// Location label; the rule description becomes <iam-user>-<location>
    #[arg(long)]
    location: String,

    /// IP protocol of the rule
    #[arg(long, default_value = "tcp")]
    protocol: String,

    /// AWS region (defaults to the AWS configuration chain)
    #[arg(long)]
    region: Option<String>,

    /// AWS profile name
    #[arg(long)]
    profile: Option<String>,

    /// Use this address instead of looking up the public IP
    #[arg(long)]
    ip: Option<Ipv4Addr>,

    /// IP-echo service used to look up the public IP
    #[arg(long, default_value = DEFAULT_IP_SERVICE_URL)]
    ip_service_url: String,

    /// Show what would change without modifying any security group
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

impl Cli {
    fn sync_request(&self) -> Result<SyncRequest, String> {
        let group_names: Vec<String> = self
            .group_names
            .iter()
            .map(|name| name.trim())
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect();

        if group_names.is_empty() {
            return Err("--group-name must name at least one security group".to_string());
        }
        RuleIdentity::check_location(&self.location).map_err(|e| e.to_string())?;

        Ok(SyncRequest::new(group_names, self.port, self.location.as_str())
            .with_protocol(self.protocol.as_str()))
    }

    fn aws_options(&self) -> AwsOptions {
        AwsOptions {
            region: self.region.clone(),
            profile: self.profile.clone(),
        }
    }

    fn ip_resolver(&self) -> Result<Box<dyn PublicIpResolver>, String> {
        match self.ip {
            Some(ip) => Ok(Box::new(ip)),
            None => {
                let resolver =
                    CheckIpResolver::new(self.ip_service_url.as_str()).map_err(|e| e.to_string())?;
                Ok(Box::new(resolver))
            }
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

/// Initialize logging; RUST_LOG is honored unless --debug is given
fn init_logging(debug: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.format_target(false).format_timestamp_secs().init();
}

async fn run(cli: Cli) -> Result<(), String> {
    let request = cli.sync_request()?;
    let ip_resolver = cli.ip_resolver()?;

    let aws = AwsProvider::new(&cli.aws_options()).await;
    println!(
        "{}",
        format!("Using {} provider (region: {})", aws.name(), aws.region()).cyan()
    );

    let config = InterpreterConfig {
        dry_run: cli.dry_run,
    };
    let sync = Synchronizer::new(aws.clone(), aws, ip_resolver).with_config(config);

    let report = sync
        .run(&request, &mut ConsoleOutput)
        .await
        .map_err(|e| e.to_string())?;
    let total = report.summary();

    println!();
    if cli.dry_run {
        println!("{}", total);
        println!("{}", "Dry run: no security group was modified.".yellow());
    } else {
        println!(
            "{}",
            format!(
                "✓ Sync complete! {} authorized, {} revoked.",
                total.authorize, total.revoke
            )
            .green()
            .bold()
        );
    }

    Ok(())
}

/// Prints progress as each step of a run completes
struct ConsoleOutput;

impl SyncObserver for ConsoleOutput {
    fn resolved(&mut self, desired: &DesiredRule) {
        println!(
            "Rule {} for {}",
            desired.identity.to_string().bold(),
            desired.cidr().bold()
        );
        println!();
    }

    fn group_applied(&mut self, report: &GroupReport) {
        print_group_report(report);
    }
}

fn print_group_report(report: &GroupReport) {
    println!(
        "  {} ({})",
        report.plan.group_name().cyan().bold(),
        report.plan.group_id()
    );
    for effect in report.plan.effects() {
        let line = effect.to_string();
        let colored_line = match effect {
            Effect::Revoke(_) => line.red(),
            Effect::Authorize(_) => line.green(),
        };
        println!("    {}", colored_line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_required_flags() {
        let cli = Cli::try_parse_from([
            "sgsync",
            "--group-name",
            "web,db",
            "--port",
            "22",
            "--location",
            "home",
        ])
        .unwrap();

        assert_eq!(cli.group_names, vec!["web", "db"]);
        assert_eq!(cli.port, 22);
        assert_eq!(cli.location, "home");
        assert_eq!(cli.protocol, "tcp");
        assert_eq!(cli.ip_service_url, DEFAULT_IP_SERVICE_URL);
        assert!(!cli.dry_run);
        assert!(cli.ip.is_none());
    }

    #[test]
    fn test_missing_required_flag_is_rejected() {
        let full = [
            ("--group-name", "web"),
            ("--port", "22"),
            ("--location", "home"),
        ];

        for skipped in 0..full.len() {
            let mut args = vec!["sgsync"];
            for (i, (flag, value)) in full.iter().enumerate() {
                if i != skipped {
                    args.push(*flag);
                    args.push(*value);
                }
            }

            let err = Cli::try_parse_from(args).unwrap_err();
            assert_eq!(
                err.kind(),
                ErrorKind::MissingRequiredArgument,
                "missing {}",
                full[skipped].0
            );
        }
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = Cli::try_parse_from([
            "sgsync",
            "--group-name",
            "web",
            "--port",
            "70000",
            "--location",
            "home",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_optional_flags() {
        let cli = Cli::try_parse_from([
            "sgsync",
            "--group-name",
            "web",
            "--port",
            "5432",
            "--location",
            "office",
            "--region",
            "us-west-2",
            "--profile",
            "work",
            "--ip",
            "203.0.113.5",
            "--protocol",
            "udp",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.ip, Some(Ipv4Addr::new(203, 0, 113, 5)));
        assert!(cli.dry_run);
        let options = cli.aws_options();
        assert_eq!(options.region.as_deref(), Some("us-west-2"));
        assert_eq!(options.profile.as_deref(), Some("work"));
        assert_eq!(cli.sync_request().unwrap().protocol, "udp");
    }

    #[test]
    fn test_sync_request_trims_group_names() {
        let cli = Cli::try_parse_from([
            "sgsync",
            "--group-name",
            " web , ,db",
            "--port",
            "22",
            "--location",
            "home",
        ])
        .unwrap();

        let request = cli.sync_request().unwrap();
        assert_eq!(request.group_names, vec!["web", "db"]);
        assert_eq!(request.port, 22);
        assert_eq!(request.location, "home");
    }

    #[test]
    fn test_sync_request_needs_a_group() {
        let cli = Cli::try_parse_from([
            "sgsync",
            "--group-name",
            ",",
            "--port",
            "22",
            "--location",
            "home",
        ])
        .unwrap();

        assert!(cli.sync_request().is_err());
    }

    #[test]
    fn test_sync_request_rejects_blank_location() {
        for location in ["", "   "] {
            let cli = Cli::try_parse_from([
                "sgsync",
                "--group-name",
                "web",
                "--port",
                "22",
                "--location",
                location,
            ])
            .unwrap();

            let err = cli.sync_request().unwrap_err();
            assert!(err.contains("location is empty"), "{}", err);
        }
    }

    #[tokio::test]
    async fn test_fixed_ip_skips_lookup() {
        let cli = Cli::try_parse_from([
            "sgsync",
            "--group-name",
            "web",
            "--port",
            "22",
            "--location",
            "home",
            "--ip",
            "203.0.113.5",
        ])
        .unwrap();

        let resolver = cli.ip_resolver().unwrap();
        assert_eq!(
            resolver.public_ip().await.unwrap(),
            Ipv4Addr::new(203, 0, 113, 5)
        );
    }
}
