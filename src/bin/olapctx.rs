use std::collections::HashMap;
use std::path::PathBuf;
use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use olapctx::config::QueryConfig;
use olapctx::query::access::AccessControl;
use olapctx::query::VariableSource;
use olapctx::scenario::Scenario;
use olapctx::CompilationPass;

#[derive(Parser)]
#[command(author, version, about = "olapctx - inspect query contexts and their digests")]
struct Cli {
    /// Query configuration (key=value properties)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Authenticated user info passed to the compilation pass
    #[arg(short, long)]
    user: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the digest of a scenario
    Digest {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Print the digest as JSON
        #[arg(long)]
        json: bool,
    },

    /// Bind runtime variables into a scenario's filters and print them
    Bind {
        /// Scenario JSON file
        scenario: PathBuf,

        /// Variable binding, NAME=VALUE (repeatable)
        #[arg(short, long = "var")]
        vars: Vec<String>,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<QueryConfig> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(QueryConfig::parse_properties(&text)?)
        }
        None => Ok(QueryConfig::instance().clone()),
    }
}

fn load_scenario(path: &PathBuf) -> Result<Scenario> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading scenario {}", path.display()))?;
    Ok(Scenario::from_json(&text)?)
}

fn parse_vars(vars: &[String]) -> Result<HashMap<String, String>> {
    vars.iter()
        .map(|v| {
            v.split_once('=')
                .map(|(k, v)| (k.trim().to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("variable binding '{}' must be NAME=VALUE", v))
        })
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    // no controllers are compiled into the CLI; naming one is an error
    let access = AccessControl::from_config(&config, Vec::new())?;

    let mut pass = CompilationPass::begin(config.pass_parameters(cli.user.as_deref()));

    match cli.command {
        Commands::Digest { scenario, json } => {
            let scenario = load_scenario(&scenario)?;
            let ctx = pass.new_context();
            scenario.populate(&mut ctx.write())?;
            access.check_current_pass(&config)?;

            let digest = ctx.write().digest()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&*digest)?);
            } else {
                println!("{}", digest);
                println!("simple query: {}", ctx.read().is_simple_query());
            }
        }
        Commands::Bind { scenario, vars } => {
            let scenario = load_scenario(&scenario)?;
            let vars = parse_vars(&vars)?;
            let ctx = pass.new_context();
            scenario.populate(&mut ctx.write())?;
            access.check_current_pass(&config)?;

            let mut guard = ctx.write();
            guard.bind_variable(Some(&vars as &dyn VariableSource))?;
            match guard.filter() {
                Some(filter) => println!("filter: {}", filter),
                None => println!("filter: <none>"),
            }
            if let Some(having) = guard.having_filter() {
                println!("having: {}", having);
            }
        }
    }

    Ok(())
}
