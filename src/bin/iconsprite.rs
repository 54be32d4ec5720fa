//! Command-line front end for icon resolution and the compiled cache.
//!
//! Usage:
//!   iconsprite --path ./icon-sets render mdi:home si:github --class icon
//!   iconsprite render "mdi:home,mdi:account" --format json
//!   iconsprite list mdi
//!   iconsprite --compiled storage/cache cache
//!   iconsprite --compiled storage/cache clear
//!   iconsprite remove mdi

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand, ValueEnum};
use iconsprite::{
    CompiledCache, DEFAULT_STACK, Iconify, IconifyConfig, IconRepository, PackageLocator,
    RenderOptions, RenderPass, split_list,
};
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "ICONSPRITE_LOG";

#[derive(Parser, Debug)]
#[command(name = "iconsprite")]
#[command(about = "Resolve package:icon identifiers to SVG sprites")]
struct Cli {
    /// JSON config file; ICONIFY_* environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Icon-set directory to search (repeatable); replaces configured paths.
    #[arg(long = "path", global = true)]
    paths: Vec<PathBuf>,
    /// Compiled cache file or directory.
    #[arg(long, global = true)]
    compiled: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render icons to SVG.
    Render {
        /// Identifiers (package:icon); comma-separated lists are accepted.
        #[arg(required = true)]
        identifiers: Vec<String>,
        #[arg(long, default_value = "")]
        class: String,
        /// Extra attribute as name=value (repeatable).
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Svg)]
        format: OutputFormat,
        /// Skip the trailing sprite sheet with the <g> definitions.
        #[arg(long)]
        no_sprites: bool,
    },
    /// List the icons of a package.
    List {
        package: String,
        /// Print package metadata as JSON instead of icon names.
        #[arg(long)]
        meta: bool,
    },
    /// List every package found on the search paths.
    Packages,
    /// Load every package and write the compiled cache.
    Cache,
    /// Delete the compiled cache.
    Clear,
    /// Delete a package file from the search paths.
    Remove { package: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Svg,
    Json,
    Preview,
}

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    match cli.command {
        Command::Render {
            identifiers,
            class,
            attributes,
            title,
            format,
            no_sprites,
        } => {
            let iconify = Iconify::from_config(config)?;
            let mut options = RenderOptions::new().class(class);
            options.attributes.extend(attributes);
            if let Some(title) = title {
                options = options.title(title);
            }
            let names: Vec<String> = identifiers.iter().flat_map(|raw| split_list(raw)).collect();
            run_render(&iconify, &names, &options, format, !no_sprites)
        }
        Command::List { package, meta } => {
            let iconify = Iconify::from_config(config)?;
            if meta {
                let metadata = iconify.repository().load_meta(&package)?;
                println!("{}", serde_json::to_string_pretty(metadata.as_ref())?);
                return Ok(());
            }
            let icons = iconify.icons(&package)?;
            for name in icons.names() {
                println!("{name}");
            }
            Ok(())
        }
        Command::Packages => {
            let iconify = Iconify::from_config(config)?;
            for name in iconify.package_names()? {
                println!("{name}");
            }
            Ok(())
        }
        Command::Cache => run_cache(config),
        Command::Clear => run_clear(&config),
        Command::Remove { package } => run_remove(&config, &package),
    }
}

fn load_config(cli: &Cli) -> Result<IconifyConfig> {
    let mut config = match &cli.config {
        Some(path) => IconifyConfig::load(path)?,
        None => IconifyConfig::default(),
    };
    config.apply_env();
    if !cli.paths.is_empty() {
        config.paths = cli.paths.clone();
    }
    if let Some(compiled) = &cli.compiled {
        config.compiled = Some(compiled.clone());
    }
    Ok(config)
}

fn run_render(
    iconify: &Iconify,
    names: &[String],
    options: &RenderOptions,
    format: OutputFormat,
    sprites: bool,
) -> Result<()> {
    let pass = RenderPass::new();
    match format {
        OutputFormat::Svg => {
            if let [single] = names {
                println!("{}", iconify.render(single, options, &pass)?);
            } else {
                println!("{}", iconify.render_many(names, options, &pass));
            }
        }
        OutputFormat::Json => {
            let grouped = iconify.render_many_grouped_json(names, options, &pass);
            println!("{}", serde_json::to_string_pretty(&grouped)?);
        }
        OutputFormat::Preview => {
            println!("{}", iconify.render_many_grouped_preview(names, options, &pass));
        }
    }
    if sprites {
        let sheet = pass.render_stack(DEFAULT_STACK);
        if !sheet.is_empty() {
            println!("{sheet}");
        }
    }
    Ok(())
}

fn run_cache(config: IconifyConfig) -> Result<()> {
    let path = compiled_path(&config)?;
    CompiledCache::clear(&path)?;

    let iconify = Iconify::new(IconRepository::new(config.finder()), config);
    let mut failed = 0;
    for (name, loaded) in iconify.all()? {
        if let Err(err) = loaded {
            failed += 1;
            eprintln!("skipping package [{name}]: {err}");
        }
    }
    let snapshot = iconify.repository().snapshot();
    snapshot.write(&path)?;
    eprintln!(
        "cached {} icon packages ({} icons) to {}",
        snapshot.len(),
        snapshot.icon_count(),
        path.display()
    );
    if failed > 0 {
        bail!("{failed} icon packages could not be cached");
    }
    Ok(())
}

fn run_clear(config: &IconifyConfig) -> Result<()> {
    let path = compiled_path(config)?;
    if CompiledCache::clear(&path)? {
        eprintln!("cleared compiled icon cache {}", path.display());
    } else {
        eprintln!("no compiled icon cache at {}; nothing to clear", path.display());
    }
    Ok(())
}

fn run_remove(config: &IconifyConfig, package: &str) -> Result<()> {
    let finder = config.finder();
    let path = match finder.find(package) {
        Ok(path) => path,
        Err(err) if err.is_not_found() => {
            eprintln!("icon package [{package}] does not exist; nothing to remove");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
    eprintln!("removed icon package [{package}] ({})", path.display());
    Ok(())
}

fn compiled_path(config: &IconifyConfig) -> Result<PathBuf> {
    config.compiled_path().ok_or_else(|| {
        anyhow!("no compiled cache location configured; pass --compiled or set ICONIFY_COMPILED")
    })
}

fn parse_attribute(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got '{raw}'"))?;
    let name = name.trim();
    if name.is_empty() {
        bail!("attribute name must not be empty");
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_split_on_first_equals() {
        assert_eq!(
            parse_attribute("data-x=a=b").unwrap(),
            ("data-x".to_string(), "a=b".to_string())
        );
        assert!(parse_attribute("novalue").is_err());
        assert!(parse_attribute("=x").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
