//! refract CLI - build, inspect and ray cast acceleration structures
//!
//! Structures are built from STL meshes and written in their binary buffer
//! layouts. The layouts carry no type tag, so the file extension (`.bvh`,
//! `.grid`, `.svo`) or `--kind` says what a file holds.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use refract_kernel::refract_kernel_math::{Point3, Vec3};
use refract_kernel::refract_kernel_mesh::{stl, Triangle};
use refract_kernel::refract_kernel_raytrace::{GridTraceOptions, Ray};
use refract_kernel::refract_kernel_voxel::{ContouringMethod, SimplifySettings};
use refract_kernel::{AccelBuilder, AccelStructure, BuildSettings, RayCast, StructureKind};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "refract")]
#[command(about = "Spatial acceleration structures for refractive rendering", long_about = None)]
struct Cli {
    /// TOML file with [grid], [svo] and [bvh] build settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log build details (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a triangle BVH from an STL mesh
    Bvh {
        /// Input STL file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Largest leaf the SAH builder may keep without splitting
        #[arg(long)]
        leaf_size: Option<u32>,
    },
    /// Voxelize an STL mesh into a dense grid
    Grid {
        /// Input STL file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Voxels along the longest axis
        #[arg(short, long)]
        size: Option<u32>,
        /// Per-voxel payload
        #[arg(short, long)]
        method: Option<Method>,
    },
    /// Build a sparse voxel octree from an STL mesh
    Svo {
        /// Input STL file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Octree depth (1-16)
        #[arg(short, long)]
        depth: Option<u32>,
        /// Per-leaf payload
        #[arg(short, long)]
        method: Option<Method>,
        /// Merge leaves with similar normals
        #[arg(long)]
        simplify: bool,
    },
    /// Display a summary of a structure file
    Info {
        /// Structure file
        file: PathBuf,
        /// Structure kind (default: from the file extension)
        #[arg(short, long)]
        kind: Option<String>,
    },
    /// Cast one ray against a structure file and print the hit as JSON
    Cast {
        /// Structure file
        file: PathBuf,
        /// Ray origin
        #[arg(long, required = true, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
        origin: Vec<f32>,
        /// Ray direction
        #[arg(long, required = true, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
        dir: Vec<f32>,
        /// Smallest accepted hit parameter
        #[arg(long, default_value_t = 0.0)]
        t_min: f32,
        /// Largest accepted hit parameter
        #[arg(long, default_value_t = f32::INFINITY)]
        t_max: f32,
        /// Structure kind (default: from the file extension)
        #[arg(short, long)]
        kind: Option<String>,
        /// Treat a grid's surface as convex and stop at the first hit
        #[arg(long)]
        convex: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Method {
    /// Negated mean face normal per voxel
    AverageNormals,
    /// Dual contouring vertex per voxel
    DualContouring,
}

impl From<Method> for ContouringMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::AverageNormals => ContouringMethod::AverageNormals,
            Method::DualContouring => ContouringMethod::DualContouring,
        }
    }
}

/// The shape of a ray cast result handed to shading code.
#[derive(Serialize)]
struct CastReport {
    hit: bool,
    t: f32,
    point: [f32; 3],
    normal: [f32; 3],
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Bvh {
            input,
            output,
            leaf_size,
        } => {
            if let Some(leaf_size) = leaf_size {
                settings.bvh.max_prims_per_leaf = leaf_size;
            }
            build(settings, StructureKind::Bvh, &input, &output)?;
        }
        Commands::Grid {
            input,
            output,
            size,
            method,
        } => {
            if let Some(size) = size {
                settings.grid.grid_size = size;
            }
            if let Some(method) = method {
                settings.grid.method = method.into();
            }
            build(settings, StructureKind::Grid, &input, &output)?;
        }
        Commands::Svo {
            input,
            output,
            depth,
            method,
            simplify,
        } => {
            if let Some(depth) = depth {
                settings.svo.depth = depth;
            }
            if let Some(method) = method {
                settings.svo.method = method.into();
            }
            if simplify && settings.svo.simplify.is_none() {
                settings.svo.simplify = Some(SimplifySettings::default());
            }
            build(settings, StructureKind::Svo, &input, &output)?;
        }
        Commands::Info { file, kind } => {
            let structure = load_structure(&file, kind.as_deref())?;
            println!("{}: {}", file.display(), structure.summary());
            if let AccelStructure::Svo(svo) = &structure {
                let (w, h) = svo.tex_size(4096);
                println!("  texture: {w}x{h}");
            }
        }
        Commands::Cast {
            file,
            origin,
            dir,
            t_min,
            t_max,
            kind,
            convex,
        } => {
            let mut structure = load_structure(&file, kind.as_deref())?;
            if let AccelStructure::Grid(_, options) = &mut structure {
                *options = GridTraceOptions { convex };
            }
            let ray = Ray::new(
                Point3::new(origin[0], origin[1], origin[2]),
                Vec3::new(dir[0], dir[1], dir[2]),
            );
            if ray.direction.norm_squared() == 0.0 {
                bail!("ray direction must be non-zero");
            }
            let report = match structure.ray_cast(&ray, t_min, t_max) {
                Some(hit) => CastReport {
                    hit: true,
                    t: hit.t,
                    point: hit.point.coords.into(),
                    normal: hit.normal.into(),
                },
                None => CastReport {
                    hit: false,
                    t: 0.0,
                    point: [0.0; 3],
                    normal: [0.0; 3],
                },
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

fn load_settings(path: Option<&Path>) -> Result<BuildSettings> {
    let Some(path) = path else {
        return Ok(BuildSettings::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    BuildSettings::from_toml_str(&text)
        .with_context(|| format!("invalid config {}", path.display()))
}

fn read_mesh(path: &Path) -> Result<Vec<Triangle>> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let triangles =
        stl::read_stl(&data).with_context(|| format!("failed to parse {}", path.display()))?;
    log::info!("read {} triangles from {}", triangles.len(), path.display());
    Ok(triangles)
}

fn build(settings: BuildSettings, kind: StructureKind, input: &Path, output: &Path) -> Result<()> {
    let builder = AccelBuilder::new(settings)?;
    let triangles = read_mesh(input)?;
    let structure = builder
        .build(kind, &triangles)
        .with_context(|| format!("failed to build {kind} from {}", input.display()))?;
    fs::write(output, structure.to_bytes())
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("{}", structure.summary());
    println!("Wrote {}", output.display());
    Ok(())
}

fn load_structure(path: &Path, kind: Option<&str>) -> Result<AccelStructure> {
    let kind = match kind.or_else(|| path.extension().and_then(|e| e.to_str())) {
        Some(name) => name.parse::<StructureKind>()?,
        None => bail!(
            "cannot tell the structure kind of {}; pass --kind",
            path.display()
        ),
    };
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    AccelStructure::from_bytes(kind, &bytes)
        .with_context(|| format!("failed to load {} as {kind}", path.display()))
}
