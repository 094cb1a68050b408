use std::path::PathBuf;

use anyhow::{Result, anyhow};
use repaint_views::angle::{self, CameraAngle};
use repaint_views::camera::OrbitPose;
use repaint_views::prompt::{ViewDescriptor, view_dep_prompt};
use repaint_views::{PipelineConfig, TransformsManifest, ViewStore, config, mesh};

#[derive(Debug, Default, Clone)]
struct Cli {
    config: Option<PathBuf>,
    plan: bool,
    write_train_transforms: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --config"));
                };
                cli.config = Some(PathBuf::from(v));
                i += 2;
            }
            "--plan" => {
                cli.plan = true;
                i += 1;
            }
            "--write-train-transforms" => {
                cli.write_train_transforms = true;
                i += 1;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} (supported: --config <file>, --plan, --write-train-transforms)"
                ));
            }
        }
    }
    Ok(cli)
}

struct Plan {
    forward: Vec<CameraAngle>,
    backward: Vec<CameraAngle>,
    view_synth: CameraAngle,
}

impl Plan {
    fn from_config(config: &PipelineConfig) -> Result<Self> {
        let inc = config.inpaint.angle_inc;
        let limit = config.inpaint.inc_limit;
        let forward = angle::sweep_angles(inc, limit);
        let backward = angle::sweep_angles(-inc, limit);
        let (Some(view_1), Some(view_2)) = (forward.last(), backward.last()) else {
            return Err(anyhow!("empty sweep for angle_inc={inc}, inc_limit={limit}"));
        };
        let view_synth = config
            .view_synth()
            .unwrap_or_else(|| angle::synthesis_angle(*view_1, *view_2));
        Ok(Self {
            forward,
            backward,
            view_synth,
        })
    }

    fn boundaries(&self) -> [CameraAngle; 2] {
        [
            self.forward.last().copied().unwrap_or_default(),
            self.backward.last().copied().unwrap_or_default(),
        ]
    }
}

fn print_plan(config: &PipelineConfig, plan: &Plan) {
    let color = config.color();
    let prompt = &config.mesh.prompt;
    let line = |label: &str, a: CameraAngle| {
        println!(
            "[plan] {label:>8} {:>3} deg. ({:>5}) {}",
            a.degrees(),
            ViewDescriptor::for_angle(a).as_str(),
            view_dep_prompt(prompt, a, color)
        );
    };
    line("first", CameraAngle::ZERO);
    for a in &plan.forward {
        line("forward", *a);
    }
    for a in &plan.backward {
        line("backward", *a);
    }
    line("synth", plan.view_synth);
}

fn write_train_transforms(config: &PipelineConfig, plan: &Plan) -> Result<PathBuf> {
    let store = ViewStore::open(&config.mesh.save_dir)?;
    let size = config.inpaint.image_size;
    let mut manifest = TransformsManifest::new(config.inpaint.camera_angle_x, size, size);
    let [view_1, view_2] = plan.boundaries();
    for a in [view_1, view_2, plan.view_synth] {
        manifest.record(a, &OrbitPose::at_angle(a, config.inpaint.camera_dist))?;
    }
    store.write_train_manifest(&manifest)
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&args)?;
    let config_path = cli
        .config
        .ok_or_else(|| anyhow!("--config <file> is required"))?;
    let config = config::load_config_from_path(&config_path)?;
    log::info!("[main] loaded config {}", config_path.display());

    let plan = Plan::from_config(&config)?;
    if cli.plan {
        mesh::load_mesh(&config)?;
        print_plan(&config, &plan);
    }
    if cli.write_train_transforms {
        let path = write_train_transforms(&config, &plan)?;
        println!("[main] saved: {}", path.display());
    }
    if !cli.plan && !cli.write_train_transforms {
        println!("[main] nothing to do (use --plan or --write-train-transforms)");
    }
    Ok(())
}
