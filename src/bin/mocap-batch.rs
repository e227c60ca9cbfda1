use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use mocap_batch::{
    BatchConfig, BatchOrchestrator, FailureScope, HeadlessHost, SlotMap, encode::ffmpeg,
};

#[derive(Parser, Debug)]
#[command(name = "mocap-batch", version)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Retarget every animation onto every character and render each camera.
    Run(BatchArgs),
    /// Print the videos a run would write, without touching any scene.
    Plan(BatchArgs),
    /// Print the slot map in use.
    Slots(SlotsArgs),
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Directory of character scenes.
    #[arg(long)]
    characters: Option<PathBuf>,

    /// Directory of animation clips.
    #[arg(long)]
    animations: Option<PathBuf>,

    /// Character scene extension (case-insensitive).
    #[arg(long = "char-ext")]
    char_ext: Option<String>,

    /// Animation clip extension (case-insensitive).
    #[arg(long = "anim-ext")]
    anim_ext: Option<String>,

    /// Output directory (defaults to the character directory).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Batch configuration JSON; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Slot map JSON replacing the built-in table.
    #[arg(long = "slot-map")]
    slot_map: Option<PathBuf>,

    /// What a retarget failure aborts.
    #[arg(long = "retarget-failure", value_enum)]
    retarget_failure: Option<RetargetFailure>,
}

#[derive(Parser, Debug)]
struct SlotsArgs {
    /// Slot map JSON replacing the built-in table.
    #[arg(long = "slot-map")]
    slot_map: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum RetargetFailure {
    /// Skip the (character, animation) pair.
    Iteration,
    /// Abort the batch.
    Run,
}

impl From<RetargetFailure> for FailureScope {
    fn from(v: RetargetFailure) -> Self {
        match v {
            RetargetFailure::Iteration => FailureScope::Iteration,
            RetargetFailure::Run => FailureScope::Run,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Plan(args) => cmd_plan(args),
        Command::Slots(args) => cmd_slots(args),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_config(args: &BatchArgs) -> anyhow::Result<BatchConfig> {
    if args.config.is_none() && (args.characters.is_none() || args.animations.is_none()) {
        anyhow::bail!("pass --characters and --animations, or a --config naming both directories");
    }
    let mut cfg = match &args.config {
        Some(path) => BatchConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => BatchConfig::default(),
    };
    if let Some(dir) = &args.characters {
        cfg.character_dir = dir.clone();
    }
    if let Some(dir) = &args.animations {
        cfg.animation_dir = dir.clone();
    }
    if let Some(ext) = &args.char_ext {
        cfg.character_ext = ext.trim_start_matches('.').to_string();
    }
    if let Some(ext) = &args.anim_ext {
        cfg.animation_ext = ext.trim_start_matches('.').to_string();
    }
    if let Some(dir) = &args.out {
        cfg.output_dir = Some(dir.clone());
    }
    if let Some(path) = &args.slot_map {
        cfg.slot_map = Some(path.clone());
    }
    if let Some(scope) = args.retarget_failure {
        cfg.retarget_failure = scope.into();
    }

    Ok(cfg)
}

fn load_slot_map(path: Option<&PathBuf>) -> anyhow::Result<SlotMap> {
    Ok(match path {
        Some(p) => SlotMap::from_path(p)
            .with_context(|| format!("load slot map '{}'", p.display()))?,
        None => SlotMap::builtin()?,
    })
}

fn cmd_plan(args: BatchArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let slots = load_slot_map(cfg.slot_map.as_ref())?;
    let plan = BatchOrchestrator::new(&cfg, &slots).plan()?;
    for out in &plan.outputs {
        println!("{}", out.display());
    }
    eprintln!(
        "{} character(s) x {} animation(s) x {} camera(s) = {} video(s)",
        plan.characters.len(),
        plan.animations.len(),
        cfg.rig.cameras.len(),
        plan.outputs.len()
    );
    Ok(())
}

fn cmd_run(args: BatchArgs) -> anyhow::Result<()> {
    let cfg = load_config(&args)?;
    let slots = load_slot_map(cfg.slot_map.as_ref())?;

    if !ffmpeg::is_ffmpeg_on_path() {
        tracing::warn!("ffmpeg was not found on PATH; every capture will fail");
    }

    let mut host = HeadlessHost::new(cfg.viewport.clone())?;
    let report = BatchOrchestrator::new(&cfg, &slots).run(&mut host)?;

    for path in &report.rendered {
        println!("{}", path.display());
    }
    for s in &report.skipped {
        eprintln!(
            "skipped {} x {} at {}: {}",
            s.character_file.display(),
            s.animation_file.display(),
            s.stage,
            s.error
        );
    }
    for f in &report.camera_failures {
        eprintln!("camera {} failed for {}: {}", f.camera_index, f.output.display(), f.error);
    }
    if let Some(abort) = &report.aborted {
        eprintln!(
            "aborted at {} x {} ({}): {}",
            abort.character_file.display(),
            abort.animation_file.display(),
            abort.stage,
            abort.error
        );
    }
    eprintln!(
        "rendered {} video(s), skipped {} pair(s), {} camera failure(s)",
        report.rendered.len(),
        report.skipped.len(),
        report.camera_failures.len()
    );

    report.into_result()?;
    Ok(())
}

fn cmd_slots(args: SlotsArgs) -> anyhow::Result<()> {
    let slots = load_slot_map(args.slot_map.as_ref())?;
    for entry in &slots {
        let label = if entry.is_root() {
            "(root)"
        } else {
            entry.label.as_str()
        };
        println!("{}\t{}", entry.slot, label);
    }
    Ok(())
}
