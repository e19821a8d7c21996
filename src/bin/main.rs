// SPDX-FileCopyrightText: © 2025 Claudio Cicconetti <c.cicconetti@iit.cnr.it>
// SPDX-License-Identifier: MIT

use clap::Parser;
use qring_sim::config::Config;
use qring_sim::scenario::Scenario;
use qring_sim::user_config::UserConfig;

#[derive(Debug, clap::Parser)]
#[command(long_about = None)]
struct Args {
    /// Scenario configuration.
    #[arg(long, short, default_value_t = String::from("conf.json"))]
    conf: String,
    /// Create a template for the scenario configuration.
    #[arg(long, short)]
    template: bool,
    /// Save the ring topology to a Graphviz file and quit.
    #[arg(long)]
    save_to_dot: bool,
    /// Initial seed to initialize the pseudo-random number generators
    #[arg(long, default_value_t = 0)]
    seed_init: u64,
    /// Final seed to initialize the pseudo-random number generators
    #[arg(long, default_value_t = 10)]
    seed_end: u64,
    /// Number of parallel workers
    #[arg(long, default_value_t = std::thread::available_parallelism().unwrap().get())]
    concurrency: usize,
    /// Name of the path where to save the metrics collected.
    #[arg(long, default_value_t = String::from("data/"))]
    output_path: String,
    /// Append to the output file.
    #[arg(long, default_value_t = false)]
    append: bool,
    /// Additional fields recorded in the CSV output file.
    #[arg(long, default_value_t = String::from(""))]
    additional_fields: String,
    /// Header of additional fields recorded in the CSV output file.
    #[arg(long, default_value_t = String::from(""))]
    additional_header: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    // If requested, save a template configuration file and quit.
    let conf_path = std::path::Path::new("conf.json");
    if args.template {
        if conf_path.exists() {
            log::warn!("File {:#?} exists and will not be overwritten", conf_path);
        } else {
            std::fs::write(
                conf_path,
                serde_json::to_string_pretty(&UserConfig::default())?,
            )?;
            return Ok(());
        }
    }

    // Check command-line arguments.
    anyhow::ensure!(
        args.additional_fields.matches(',').count() == args.additional_header.matches(',').count(),
        "--additional_fields and --additional_header have a different number of commas"
    );

    // Read the user's configuration file.
    anyhow::ensure!(
        conf_path.exists(),
        "Configuration file {:#?} does not exist",
        conf_path
    );
    let conf_file = std::fs::File::open(args.conf)?;
    let reader = std::io::BufReader::new(conf_file);
    let user_config: UserConfig = serde_json::from_reader(reader)?;

    // If requested, dump the topology and quit.
    if args.save_to_dot {
        let config = Config {
            seed: args.seed_init,
            user_config,
        };
        return match Scenario::new(config, true) {
            Err(err) => {
                log::info!("{}", err);
                Ok(())
            }
            Ok(_) => unreachable!("scenario created while dumping the topology"),
        };
    }

    // Create the configurations of all the experiments
    let configurations = std::sync::Arc::new(std::sync::Mutex::new(vec![]));
    for seed in args.seed_init..args.seed_end {
        configurations.lock().unwrap().push(Config {
            seed,
            user_config: user_config.clone(),
        });
    }

    if configurations.lock().unwrap().is_empty() {
        return Ok(());
    }

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    for i in 0..std::cmp::min(args.concurrency, (args.seed_end - args.seed_init) as usize) {
        let tx = tx.clone();
        let configurations = configurations.clone();
        tokio::spawn(async move {
            log::info!("spawned worker #{}", i);
            loop {
                let config;
                {
                    if let Some(val) = configurations.lock().unwrap().pop() {
                        config = Some(val);
                    } else {
                        break;
                    }
                }
                match Scenario::new(config.unwrap(), false) {
                    Ok(mut scenario) => match scenario.run() {
                        Ok(output) => tx.send(output).unwrap(),
                        Err(err) => log::error!("error when running scenario: {}", err),
                    },
                    Err(err) => log::error!("error when creating scenario: {}", err),
                };
            }
            log::info!("terminated worker #{}", i);
        });
    }
    drop(tx);

    // wait until all the scenarios have been done
    let mut outputs = vec![];
    while let Some(output) = rx.recv().await {
        outputs.push(output);
    }

    // save output to files
    assert!(!outputs.is_empty());
    qring_sim::output::save_outputs(
        outputs,
        &args.output_path,
        args.append,
        &Config::header(),
        &args.additional_header,
        &args.additional_fields,
        true,
    )
}
