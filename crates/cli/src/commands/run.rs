//! Run Command

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use specrun_core::duration::parse_duration;
use specrun_core::{RunContext, Scenario, Suite};

use crate::output::{self, OutputFormat};
use crate::xunit;

#[derive(Args)]
pub struct RunArgs {
    /// Scenario files or suite directories to run
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Overall time budget; scenarios that cannot fit fail before starting
    #[arg(long)]
    pub budget: Option<String>,

    /// Copy the engine's debug stream to stderr
    #[arg(long)]
    pub debug: bool,
}

pub async fn execute(args: RunArgs, format: OutputFormat) -> Result<i32> {
    let mut ctx = RunContext::new();
    if let Some(budget) = &args.budget {
        let d = parse_duration(budget).map_err(|e| anyhow::anyhow!("--budget: {}", e))?;
        ctx = ctx.with_budget(d);
    }
    if args.debug {
        ctx = ctx.with_debug(std::io::stderr());
    }

    // CI consumers expect a single XML document, so XUnit output is
    // collected across paths and printed once at the end; the other
    // formats print per path.
    let mut suites: Vec<xunit::XUnitTestSuite> = Vec::new();
    let mut ok = true;
    for path in &args.paths {
        if path.is_dir() {
            let suite = Suite::from_dir(path)?;
            let result = suite.run(&ctx).await;
            ok &= result.passed();
            if format == OutputFormat::Xunit {
                suites.extend(xunit::from_suite(&result));
            } else {
                output::print_suite(&result, format);
            }
        } else {
            let scenario = Scenario::from_file(path)?;
            match scenario.run(&ctx).await {
                Ok(result) => {
                    ok &= result.skipped || result.passed();
                    if format == OutputFormat::Xunit {
                        suites.push(xunit::from_scenario(&result));
                    } else {
                        output::print_scenario(&result, format);
                    }
                }
                Err(e) => {
                    ok = false;
                    if format == OutputFormat::Xunit {
                        suites.push(xunit::error_suite(&scenario.title(), &e));
                    } else {
                        output::print_scenario_error(&scenario.title(), &e, format);
                    }
                }
            }
        }
    }
    if format == OutputFormat::Xunit {
        println!("{}", xunit::XUnitResults::new(suites).to_xml());
    }
    Ok(if ok { 0 } else { 1 })
}
