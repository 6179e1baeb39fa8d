//! Ladder CLI Application

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use ladder_app::control::{describe, parse_command, ControlCommand};
use ladder_app::render::render_file;
use ladder_core::domain::audio::AudioEnumerator;
use ladder_core::domain::config::{ConfigManager, LadderConfig, Preset, PresetManager};
use ladder_core::domain::meter::AudioLevel;
use ladder_core::domain::params::{ParamId, ParameterSet};
use ladder_core::domain::processor::LadderProcessor;
use ladder_infra::audio::{AudioEngine, CpalEnumerator, EngineConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ladder")]
#[command(about = "Drive, resonant ladder filter and trim", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration directory (defaults to the platform config dir)
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List audio devices
    Devices,

    /// Process a live input device into an output device
    Live {
        #[arg(long)]
        input_device: Option<String>,

        #[arg(long)]
        output_device: Option<String>,

        #[arg(long)]
        sample_rate: Option<u32>,

        #[arg(long)]
        buffer_size: Option<u32>,

        #[arg(long)]
        channels: Option<u16>,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Process a WAV file
    Render {
        input: PathBuf,

        output: PathBuf,

        /// Frames per processing block
        #[arg(long, default_value_t = 512)]
        block_size: usize,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Manage parameter presets
    Preset {
        #[command(subcommand)]
        action: PresetAction,
    },

    /// Inspect or reset the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config file location and the configured parameter values
    Show,

    /// Replace the config file with the factory default
    Reset,
}

#[derive(Subcommand)]
enum PresetAction {
    /// List saved and factory presets
    List,

    /// Print a preset's values
    Show { name: String },

    /// Save the given values as a preset
    Save {
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Delete a saved preset
    Delete { name: String },
}

/// Parameter overrides shared by the processing commands
#[derive(Args, Default)]
struct ParamArgs {
    /// Start from a saved or factory preset
    #[arg(long)]
    preset: Option<String>,

    #[arg(long, allow_hyphen_values = true)]
    drive: Option<f32>,

    /// Cutoff frequency in Hz
    #[arg(long)]
    cutoff: Option<f32>,

    #[arg(long)]
    resonance: Option<f32>,

    /// Trim in dB
    #[arg(long, allow_hyphen_values = true)]
    trim: Option<f32>,
}

impl ParamArgs {
    /// Config values, then the preset, then explicit flags
    async fn apply(&self, parameters: &ParameterSet, config: &LadderConfig, presets: &PresetManager) -> Result<()> {
        parameters.apply(&config.parameters);

        if let Some(name) = &self.preset {
            let preset = presets.load_preset(name).await?;
            preset.apply_to(parameters);
            info!("Loaded preset {}", preset.name);
        }

        let overrides = [
            (ParamId::Drive, self.drive),
            (ParamId::Cutoff, self.cutoff),
            (ParamId::Resonance, self.resonance),
            (ParamId::Trim, self.trim),
        ];
        for (id, value) in overrides {
            if let Some(value) = value {
                parameters.set(id, value);
            }
        }
        Ok(())
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => ConfigManager::default_config_dir()?,
    };
    let config_manager = ConfigManager::new(config_dir);
    let config = config_manager.load().await;
    let presets = PresetManager::new(config_manager.preset_dir(&config.app));

    match cli.command {
        Command::Devices => list_devices(),
        Command::Live {
            input_device,
            output_device,
            sample_rate,
            buffer_size,
            channels,
            params,
        } => {
            let mut engine_config = EngineConfig::from(&config.app);
            engine_config.input_device = input_device.or(engine_config.input_device);
            engine_config.output_device = output_device.or(engine_config.output_device);
            engine_config.sample_rate = sample_rate.unwrap_or(engine_config.sample_rate);
            engine_config.buffer_size = buffer_size.unwrap_or(engine_config.buffer_size);
            engine_config.channels = channels.unwrap_or(engine_config.channels);

            let parameters = Arc::new(ParameterSet::new());
            params.apply(&parameters, &config, &presets).await?;
            run_live(engine_config, parameters, config.app.meter_decay_rate).await
        }
        Command::Render {
            input,
            output,
            block_size,
            params,
        } => {
            let mut processor = LadderProcessor::new();
            params.apply(processor.parameters(), &config, &presets).await?;
            let summary = render_file(&input, &output, &mut processor, block_size)?;
            println!(
                "{} frames, {} channel(s) at {} Hz, peak {:.3}",
                summary.frames, summary.channels, summary.sample_rate, summary.peak
            );
            Ok(())
        }
        Command::Preset { action } => run_preset(action, &config, &presets).await,
        Command::Config { action } => run_config(action, &config_manager, &config).await,
    }
}

fn list_devices() -> Result<()> {
    let enumerator = CpalEnumerator::new();

    println!("Input devices:");
    for device in enumerator.input_devices()? {
        println!("  {} ({:?} Hz, {:?})", device.name, device.sample_rates, device.channel_counts);
    }

    println!("Output devices:");
    for device in enumerator.output_devices()? {
        println!("  {} ({:?} Hz, {:?})", device.name, device.sample_rates, device.channel_counts);
    }

    Ok(())
}

async fn run_live(config: EngineConfig, parameters: Arc<ParameterSet>, meter_decay_rate: f32) -> Result<()> {
    let mut engine = AudioEngine::new(Arc::clone(&parameters));
    engine.start(&config).context("Failed to start audio")?;
    println!("{}", describe(&parameters));
    println!("Type `<param> <value>` to change a parameter, `quit` or Ctrl-C to stop");

    let mut levels = vec![AudioLevel::new(); config.channels as usize];
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let tick = Duration::from_millis(100);
    let mut meter_timer = tokio::time::interval(tick);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = meter_timer.tick() => {
                if let Some(meter) = engine.meter() {
                    meter.read_into(&mut levels);
                }
                for level in &mut levels {
                    level.decay_peak(meter_decay_rate * tick.as_secs_f32());
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_command(&line, &parameters) {
                    Ok(ControlCommand::Set(id, value)) => {
                        parameters.set(id, value);
                        println!("{}", parameters.parameter(id));
                    }
                    Ok(ControlCommand::Show) => println!("{}", describe(&parameters)),
                    Ok(ControlCommand::Levels) => {
                        for (ch, level) in levels.iter().enumerate() {
                            println!("ch{}: {:.1} dB (peak {:.1} dB)", ch, level.current_db, level.peak_db);
                        }
                    }
                    Ok(ControlCommand::Reset) => {
                        parameters.reset_to_defaults();
                        println!("{}", describe(&parameters));
                    }
                    Ok(ControlCommand::Quit) => break,
                    Err(e) => warn!("{}", e),
                }
            }
        }
    }

    engine.stop();
    Ok(())
}

async fn run_config(action: ConfigAction, manager: &ConfigManager, config: &LadderConfig) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", manager.config_path().display());
            let parameters = ParameterSet::new();
            parameters.apply(&config.parameters);
            println!("{}", describe(&parameters));
        }
        ConfigAction::Reset => {
            manager.clear().await?;
            manager.save(&LadderConfig::factory_default()).await?;
            println!("Reset {}", manager.config_path().display());
        }
    }
    Ok(())
}

async fn run_preset(action: PresetAction, config: &LadderConfig, presets: &PresetManager) -> Result<()> {
    match action {
        PresetAction::List => {
            for name in presets.list_presets().await? {
                println!("{}", name);
            }
            for preset in Preset::factory_presets() {
                println!("{} (factory)", preset.name);
            }
        }
        PresetAction::Show { name } => {
            let preset = presets.load_preset(&name).await?;
            let parameters = ParameterSet::new();
            preset.apply_to(&parameters);
            if !preset.description.is_empty() {
                println!("{}", preset.description);
            }
            println!("{}", describe(&parameters));
        }
        PresetAction::Save {
            name,
            description,
            params,
        } => {
            if Preset::factory(&name).is_some() {
                bail!("{} is a factory preset name", name);
            }
            let parameters = ParameterSet::new();
            params.apply(&parameters, config, presets).await?;
            let preset = Preset::capture(name, &parameters).with_description(description);
            presets.save_preset(&preset).await?;
            println!("Saved {}", preset.name);
        }
        PresetAction::Delete { name } => {
            presets.delete_preset(&name).await?;
            println!("Deleted {}", name);
        }
    }
    Ok(())
}
