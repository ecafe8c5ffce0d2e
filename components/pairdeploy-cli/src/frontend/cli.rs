use crate::deployments::types::DeploymentSynthesis;
use crate::deployments::{get_deployment_plan, get_ledger, get_plan_artifacts, locate_artifacts};
use crate::generate::{
    self,
    changes::{Changes, DirectoryCreation, FileCreation},
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use deploy_system_kit::log::{setup_file_logger, setup_logger, Context};
use deploy_system_kit::thread_named;
use evm_codec::Address;
use pairdeploy_deployments::types::{ArtifactKind, DeploymentPlan, RunState};
use pairdeploy_deployments::{
    apply_deployment_plan, DeploymentCommand, DeploymentEvent, PermissionConfigurator,
};
use pairdeploy_files::{
    get_manifest_location, get_project_root, write_content, Network, NetworkManifest,
    ProjectManifest, SETTINGS_DIR,
};
use std::fs::{self, File};
use std::io::prelude::*;
use std::path::Path;
use std::sync::mpsc::channel;
use std::{env, process};

/// pairdeploy brings up a pair based AMM protocol on EVM networks.
///
/// Pair templates, factory, router and bonding curves are deployed in order, wired
/// together, allow-listed, and the factory is finally handed over to its admin.
#[derive(Parser, PartialEq, Clone, Debug)]
#[clap(version = env!("CARGO_PKG_VERSION"), name = "pairdeploy", bin_name = "pairdeploy")]
struct Opts {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Create and scaffold a new project
    #[clap(name = "new", bin_name = "new")]
    New(GenerateProject),
    /// Display the deployment plan computed from Pairdeploy.toml
    #[clap(name = "plan", bin_name = "plan")]
    Plan(DisplayPlan),
    /// Check manifests, network settings and compiled artifacts
    #[clap(name = "check", bin_name = "check")]
    Check(CheckProject),
    /// Deploy and configure the protocol on Devnet/Testnet/Mainnet
    #[clap(name = "apply", bin_name = "apply")]
    Apply(ApplyProtocol),
    /// Allow-list router and curves, then transfer the factory ownership
    #[clap(name = "finalize", bin_name = "finalize")]
    Finalize(FinalizeProtocol),
    /// Generate shell completions scripts
    #[clap(name = "completions", bin_name = "completions", aliases = &["completion"])]
    Completions(Completions),
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct GenerateProject {
    /// Project's name
    pub name: String,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct DisplayPlan {
    /// Path to Pairdeploy.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
    /// Also write the plan to this file (YAML)
    #[clap(long = "output", short = 'o')]
    pub output: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct CheckProject {
    /// Path to Pairdeploy.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct ApplyProtocol {
    /// Path to Pairdeploy.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
    /// Apply on the network described in settings/Devnet.toml
    #[clap(long = "devnet", conflicts_with = "testnet", conflicts_with = "mainnet")]
    pub devnet: bool,
    /// Apply on the network described in settings/Testnet.toml
    #[clap(long = "testnet", conflicts_with = "devnet", conflicts_with = "mainnet")]
    pub testnet: bool,
    /// Apply on the network described in settings/Mainnet.toml
    #[clap(long = "mainnet", conflicts_with = "testnet", conflicts_with = "devnet")]
    pub mainnet: bool,
    /// Skip the confirmation prompt
    #[clap(long = "yes", short = 'y')]
    pub yes: bool,
    /// Display debug logs on stderr
    #[clap(long = "verbose", short = 'v')]
    pub verbose: bool,
    /// Write logs to this file
    #[clap(long = "log-file")]
    pub log_file: Option<String>,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct FinalizeProtocol {
    /// Path to Pairdeploy.toml
    #[clap(long = "manifest-path", short = 'm')]
    pub manifest_path: Option<String>,
    /// Address of the deployed pair factory
    #[clap(long = "factory")]
    pub factory: Address,
    /// Address of the deployed router
    #[clap(long = "router")]
    pub router: Address,
    /// Address of a deployed bonding curve (repeatable)
    #[clap(long = "curve")]
    pub curves: Vec<Address>,
    /// New owner of the factory (defaults to protocol.admin)
    #[clap(long = "admin")]
    pub admin: Option<Address>,
    /// Finalize on the network described in settings/Devnet.toml
    #[clap(long = "devnet", conflicts_with = "testnet", conflicts_with = "mainnet")]
    pub devnet: bool,
    /// Finalize on the network described in settings/Testnet.toml
    #[clap(long = "testnet", conflicts_with = "devnet", conflicts_with = "mainnet")]
    pub testnet: bool,
    /// Finalize on the network described in settings/Mainnet.toml
    #[clap(long = "mainnet", conflicts_with = "testnet", conflicts_with = "devnet")]
    pub mainnet: bool,
    /// Skip the confirmation prompt
    #[clap(long = "yes", short = 'y')]
    pub yes: bool,
    /// Display debug logs on stderr
    #[clap(long = "verbose", short = 'v')]
    pub verbose: bool,
}

#[derive(Parser, PartialEq, Clone, Debug)]
struct Completions {
    /// Specify which shell to generation completions script for
    #[clap(ignore_case = true)]
    pub shell: Shell,
}

pub fn main() {
    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => e.exit(),
    };

    let result = match opts.command {
        Command::New(cmd) => new_project(cmd),
        Command::Plan(cmd) => display_plan(cmd),
        Command::Check(cmd) => check_project(cmd),
        Command::Apply(cmd) => apply_protocol(cmd),
        Command::Finalize(cmd) => finalize_protocol(cmd),
        Command::Completions(cmd) => {
            let mut app = Opts::command();
            clap_complete::generate(cmd.shell, &mut app, "pairdeploy", &mut std::io::stdout());
            Ok(())
        }
    };

    if let Err(message) = result {
        eprintln!("{}", format_err!(message));
        process::exit(1);
    }
}

fn new_project(cmd: GenerateProject) -> Result<(), String> {
    let current_path = env::current_dir()
        .map_err(|e| format!("unable to get current directory\n{}", e))?;
    let current_path = current_path.to_str().ok_or("invalid current directory")?;

    let changes = generate::get_changes_for_new_project(current_path.to_string(), cmd.name)?;
    if !execute_changes(changes) {
        return Err("unable to scaffold project".into());
    }
    Ok(())
}

fn display_plan(cmd: DisplayPlan) -> Result<(), String> {
    let manifest = load_manifest(cmd.manifest_path)?;
    let plan = get_deployment_plan(&manifest)?;
    println!("{}", DeploymentSynthesis::from_plan(&plan)?);

    if let Some(output) = cmd.output {
        write_content(Path::new(&output), &plan.to_file_content()?)?;
        println!("{} {}", green!("Generated file"), output);
    }
    Ok(())
}

fn check_project(cmd: CheckProject) -> Result<(), String> {
    let manifest = load_manifest(cmd.manifest_path)?;
    let plan = get_deployment_plan(&manifest)?;
    println!(
        "{} Deployment plan valid: {}, {}",
        green!("✔"),
        pluralize!(plan.batches.len(), "step"),
        pluralize!(plan.transactions_count(), "transaction")
    );

    let artifacts = locate_artifacts(&manifest, &plan);
    let missing: Vec<&ArtifactKind> = artifacts
        .iter()
        .filter_map(|(artifact, location)| location.as_ref().err().map(|_| artifact))
        .collect();
    if missing.is_empty() {
        println!(
            "{} {} found in {}",
            green!("✔"),
            pluralize!(artifacts.len(), "artifact"),
            manifest.project.artifacts_location.display()
        );
    } else {
        for artifact in missing.iter() {
            println!(
                "{}",
                format_warn!(
                    "{}.json not found in {}, compile the contracts before applying",
                    artifact.contract_name(),
                    manifest.project.artifacts_location.display()
                )
            );
        }
    }

    let settings_dir = get_project_root(&manifest.location)?.join(SETTINGS_DIR);
    let mut errors = 0;
    for network in [Network::Devnet, Network::Testnet, Network::Mainnet] {
        let location = settings_dir.join(network.settings_file_name());
        if !location.exists() {
            continue;
        }
        match NetworkManifest::from_path(&location, network) {
            Ok(network_manifest) => println!(
                "{} {} settings: node {}, deployer {}",
                green!("✔"),
                network,
                network_manifest.network.node_rpc_address,
                network_manifest.network.deployer
            ),
            Err(message) if network == Network::Devnet => {
                errors += 1;
                eprintln!("{}", format_err!(message));
            }
            Err(message) => println!("{}", format_warn!(message)),
        }
    }

    if errors > 0 {
        return Err(format!("{} detected", pluralize!(errors, "error")));
    }
    Ok(())
}

fn apply_protocol(cmd: ApplyProtocol) -> Result<(), String> {
    let manifest = load_manifest(cmd.manifest_path)?;
    let network = get_network(cmd.devnet, cmd.testnet, cmd.mainnet)?;
    let network_manifest =
        NetworkManifest::from_project_manifest_location(&manifest.location, network)?;
    let plan = get_deployment_plan(&manifest)?;
    let ctx = get_context(cmd.verbose, cmd.log_file.as_deref())?;
    let ledger = get_ledger(&manifest, &network_manifest, &ctx)?;

    let chain_id = ledger
        .check_readiness(&get_plan_artifacts(&plan))
        .map_err(|e| e.to_string())?;
    println!(
        "{}",
        format_note!(
            "connected to {} (chain id {}), deploying from {}",
            network_manifest.network.node_rpc_address,
            chain_id,
            network_manifest.network.deployer
        )
    );

    println!(
        "The following deployment plan will be applied:\n{}\n\n",
        DeploymentSynthesis::from_plan(&plan)?
    );
    if !cmd.yes {
        confirm_or_abort()?;
    }

    let registry = plan.clone();
    let (command_tx, command_rx) = channel();
    let (event_tx, event_rx) = channel();
    let handle = thread_named("Deployment execution")
        .spawn(move || apply_deployment_plan(plan, &ledger, event_tx, command_rx, &ctx))
        .map_err(|e| format!("unable to start deployment: {}", e))?;

    let _ = command_tx.send(DeploymentCommand::Start);

    let mut result = Err("deployment interrupted".to_string());
    for event in event_rx.iter() {
        match event {
            DeploymentEvent::TransactionConfirmed(report) => {
                println!("{} {}", blue!("➡"), report);
            }
            DeploymentEvent::Interrupted(failure) => {
                eprintln!("{} Error applying deployment: {}", red!("x"), failure);
                if !failure.run_state.is_empty() {
                    println!("Confirmed before the interruption:");
                    print_addresses(&failure.run_state);
                }
                if let Some(note) = get_remaining_entries_note(&registry, failure.step_index) {
                    println!("{}", format_note!(note));
                }
                if let Some(hint) = get_finalize_hint(&failure.run_state, network) {
                    println!("{}", format_note!(hint));
                }
                result = Err(format!(
                    "deployment interrupted at step {}",
                    failure.step_index + 1
                ));
                break;
            }
            DeploymentEvent::DeploymentCompleted(run_state) => {
                println!(
                    "{} Protocol successfully deployed on {}",
                    green!("✔"),
                    network
                );
                print_addresses(&run_state);
                result = Ok(());
                break;
            }
        }
    }
    let _ = handle.join();
    result
}

fn finalize_protocol(cmd: FinalizeProtocol) -> Result<(), String> {
    let manifest = load_manifest(cmd.manifest_path)?;
    let network = get_network(cmd.devnet, cmd.testnet, cmd.mainnet)?;
    let network_manifest =
        NetworkManifest::from_project_manifest_location(&manifest.location, network)?;
    let ctx = get_context(cmd.verbose, None)?;
    let ledger = get_ledger(&manifest, &network_manifest, &ctx)?;
    let admin = cmd.admin.unwrap_or(manifest.protocol.admin);

    println!("The following calls will be sent to {}:", cmd.factory);
    println!("  setRouterAllowed({}, true)", cmd.router);
    for curve in cmd.curves.iter() {
        println!("  setBondingCurveAllowed({}, true)", curve);
    }
    println!("  transferOwnership({})\n", admin);
    if !cmd.yes {
        confirm_or_abort()?;
    }

    let configurator = PermissionConfigurator::new(&ledger, &ctx);
    let finalized = configurator
        .finalize(cmd.factory, cmd.router, &cmd.curves, admin)
        .map_err(|e| e.to_string())?;

    println!(
        "{} Router {} allow-listed: {}",
        blue!("➡"),
        cmd.router,
        finalized.router_allowed
    );
    for (curve, hash) in finalized.curves_allowed.iter() {
        println!("{} Curve {} allow-listed: {}", blue!("➡"), curve, hash);
    }
    println!(
        "{} Factory ownership transferred to {}: {}",
        green!("✔"),
        admin,
        finalized.ownership_transferred
    );
    Ok(())
}

fn load_manifest(manifest_path: Option<String>) -> Result<ProjectManifest, String> {
    let manifest_location = get_manifest_location(manifest_path)
        .ok_or("Pairdeploy.toml not found, run `pairdeploy new <name>` to create a project")?;
    ProjectManifest::from_path(&manifest_location)
}

fn get_network(devnet: bool, testnet: bool, mainnet: bool) -> Result<Network, String> {
    match (devnet, testnet, mainnet) {
        (true, _, _) => Ok(Network::Devnet),
        (_, true, _) => Ok(Network::Testnet),
        (_, _, true) => Ok(Network::Mainnet),
        _ => Err(format!(
            "{}: a flag `--devnet`, `--testnet` or `--mainnet` should be provided.",
            yellow!("Command usage")
        )),
    }
}

fn get_context(verbose: bool, log_file: Option<&str>) -> Result<Context, String> {
    match log_file {
        Some(path) => Ok(Context::with_logger(setup_file_logger(Path::new(path))?)),
        None if verbose => Ok(Context::with_logger(setup_logger(true))),
        None => Ok(Context::empty()),
    }
}

fn confirm_or_abort() -> Result<(), String> {
    println!("{}", yellow!("Continue [Y/n]?"));
    let mut buffer = String::new();
    std::io::stdin()
        .read_line(&mut buffer)
        .map_err(|e| format!("unable to read answer: {}", e))?;
    if !buffer.starts_with('Y') && !buffer.starts_with('y') && !buffer.starts_with('\n') {
        return Err("Deployment aborted".into());
    }
    Ok(())
}

fn print_addresses(run_state: &RunState) {
    for deployment in run_state.deployments() {
        println!("  {:<28} {}", deployment.unit, deployment.address);
    }
}

/// Once every contract is deployed, the permission setup can be completed by hand.
fn get_finalize_hint(run_state: &RunState, network: Network) -> Option<String> {
    let factory = run_state.address_of(&ArtifactKind::PairFactory.to_string())?;
    let router = run_state.address_of(&ArtifactKind::Router.to_string())?;
    let mut curves = vec![];
    for curve in [
        ArtifactKind::ExponentialCurve,
        ArtifactKind::LinearCurve,
        ArtifactKind::QuadraticCurve,
    ] {
        curves.push(run_state.address_of(&curve.to_string())?);
    }
    let curves = curves
        .iter()
        .map(|c| format!(" --curve {}", c))
        .collect::<String>();
    Some(format!(
        "resume with `pairdeploy finalize --{} --factory {} --router {}{}`",
        network, factory, router, curves
    ))
}

/// Registry entries left unapplied, starting with the one that failed.
fn get_remaining_entries_note(plan: &DeploymentPlan, failed_at: usize) -> Option<String> {
    let remaining = plan.batches.get(failed_at..).filter(|r| !r.is_empty())?;
    Some(format!(
        "{} left unapplied: {}",
        pluralize!(remaining.len(), "step"),
        remaining
            .iter()
            .map(|batch| format!("{}. {}", batch.id, batch.name))
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

fn execute_changes(changes: Vec<Changes>) -> bool {
    for change in changes.into_iter() {
        match change {
            Changes::AddFile(FileCreation {
                comment,
                path,
                content,
                ..
            }) => {
                if let Ok(entry) = fs::metadata(&path) {
                    if entry.is_file() {
                        println!(
                            "{} file already exists at path {}",
                            yellow!("warning:"),
                            path
                        );
                        continue;
                    }
                }
                let mut file = match File::create(&path) {
                    Ok(file) => file,
                    Err(e) => {
                        eprintln!("{} Unable to create file {}: {}", red!("error:"), path, e);
                        return false;
                    }
                };
                if let Err(e) = file.write_all(content.as_bytes()) {
                    eprintln!("{} Unable to write file {}: {}", red!("error:"), path, e);
                    return false;
                }
                println!("{}", comment);
            }
            Changes::AddDirectory(DirectoryCreation { comment, path, .. }) => {
                if let Err(e) = fs::create_dir_all(&path) {
                    eprintln!(
                        "{} Unable to create directory {}: {}",
                        red!("error:"),
                        path,
                        e
                    );
                    return false;
                }
                println!("{}", comment);
            }
        }
    }
    true
}
