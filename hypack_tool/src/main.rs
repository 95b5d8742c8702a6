use std::{env, fs, io, path::Path, process::Command};

use clap::Parser;
use color_eyre as ey;
use ey::eyre::{eyre, Context};
use hypack_bundle::{
    build_pipeline::build_bundle,
    bundle_file,
    config::{ProjectConfig, PROJECT_CONFIG_FILENAME},
};
use hypack_shared::{
    generate_identifier,
    log::{self, info},
    rand::rngs::OsRng,
    serde_json,
};

mod unpack;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
enum CommandLineArguments {
    /// Build the project in the working directory into a bundle
    Build(Build),
    /// Unpack a bundle back into its assets
    Unpack(Unpack),
    /// Initialize a project configuration
    Init(Init),
}

#[derive(Parser, Debug)]
struct Build {
    /// Skip the external script bundler and use the already compiled script artifact
    #[arg(long)]
    no_script_build: bool,

    /// Additionally write a pretty-printed JSON mirror of the bundle header
    #[arg(long)]
    debug_json: bool,

    /// Don't mark the app as unique when the configuration doesn't
    #[arg(long)]
    no_default_unique: bool,
}

#[derive(Parser, Debug)]
struct Unpack {
    /// Bundle file to unpack
    #[arg(short, long)]
    file: std::path::PathBuf,
}

#[derive(Parser, Debug)]
struct Init {
    /// Directory in which the configuration is created
    #[arg(short, long, default_value = ".")]
    directory: std::path::PathBuf,
}

fn main() -> ey::Result<()> {
    // Setup logging
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                hypack_shared::chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(io::stdout())
        .apply()
        .map_err(|err| io::Error::new(io::ErrorKind::Other, err))?;

    let command_line_arguments = CommandLineArguments::parse();
    match &command_line_arguments {
        CommandLineArguments::Build(build) => run_build(build),
        CommandLineArguments::Unpack(arguments) => unpack::run_unpack(&arguments.file),
        CommandLineArguments::Init(init) => run_init(&init.directory),
    }
}

fn run_build(build: &Build) -> ey::Result<()> {
    let working_directory = env::current_dir().wrap_err("Failed to determine the working directory")?;
    let config_path = working_directory.join(PROJECT_CONFIG_FILENAME);
    let config = ProjectConfig::load(&config_path).wrap_err("Failed to load the project configuration")?;

    if !build.no_script_build {
        info!("Bundling the scripts of {}", config.data.name);
        let status = Command::new("npx")
            .args(["rollup", "-c"])
            .status()
            .wrap_err("Failed to run the script bundler")?;
        if !status.success() {
            return Err(eyre!("Script bundler exited with {status}"));
        }
    }

    let (mut blueprint, assets) = build_bundle(&config, !build.no_default_unique, &mut OsRng).wrap_err("Failed to build the bundle")?;

    info!("We have {} assets for {}", assets.len(), blueprint.name);
    let (blob, filename) = bundle_file::export(&mut blueprint, &assets).wrap_err("Failed to export the bundle")?;
    fs::write(&filename, &blob).wrap_err_with(|| format!("Failed to write '{filename}'"))?;
    info!("Wrote '{filename}'");

    if build.debug_json {
        let header = bundle_file::header(&blueprint, &assets);
        let json = serde_json::to_vec_pretty(&header).wrap_err("Failed to encode the bundle header")?;
        let json_filename = format!("{filename}.json");
        fs::write(&json_filename, json).wrap_err_with(|| format!("Failed to write '{json_filename}'"))?;
        info!("Wrote '{json_filename}'");
    }

    Ok(())
}

fn run_init(directory: &Path) -> ey::Result<()> {
    let config_path = directory.join(PROJECT_CONFIG_FILENAME);
    if config_path.exists() {
        return Err(eyre!("'{}' already exists", config_path.display()));
    }

    fs::create_dir_all(directory).wrap_err("Failed to create the project directory")?;
    let config = ProjectConfig::template(generate_identifier(&mut OsRng));
    config.save(&config_path).wrap_err("Failed to save the project configuration")?;

    info!("Project initialized, configuration saved to '{}'", config_path.display());
    Ok(())
}
