use std::{fmt::Display, fs::File, io::BufWriter, path::PathBuf, process::ExitCode};

use extractor::{
    extractor_asset::{loader::gltf::GltfImporter, time::TimeMode},
    Extractor,
};
use log::{error, info, warn};

const USAGE: &str =
    "Usage: extractor-cli <input.gltf|glb> [--only-animation] [--z-up] [--fps N] [--json OUT]";

#[derive(Debug)]
struct Args {
    input: PathBuf,
    only_animation: bool,
    z_up: bool,
    time_mode: TimeMode,
    json: Option<PathBuf>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args, String> {
    let mut input = None;
    let mut only_animation = false;
    let mut z_up = false;
    let mut time_mode = TimeMode::default();
    let mut json = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--only-animation" => only_animation = true,
            "--z-up" => z_up = true,
            "--fps" => {
                let value = args.next().ok_or("--fps needs a value")?;
                let fps: f64 = value
                    .parse()
                    .map_err(|_| format!("Bad frame rate: {}", value))?;
                if fps.is_nan() || fps <= 0.0 {
                    return Err(format!("Bad frame rate: {}", value));
                }
                time_mode = TimeMode::from_frames_per_second(fps);
            }
            "--json" => json = Some(PathBuf::from(args.next().ok_or("--json needs a path")?)),
            _ if arg.starts_with("--") => return Err(format!("Unknown option {}", arg)),
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => return Err(format!("Unexpected argument {}", arg)),
        }
    }

    Ok(Args {
        input: input.ok_or("Missing input file")?,
        only_animation,
        z_up,
        time_mode,
        json,
    })
}

fn fail(message: impl Display) -> ExitCode {
    error!("{}", message);
    ExitCode::FAILURE
}

fn main() -> ExitCode {
    env_logger::init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}\n{}", message, USAGE);
            return ExitCode::FAILURE;
        }
    };

    let mut extractor = Extractor::new(GltfImporter::new(args.time_mode));
    if let Err(err) = extractor.import_and_extract(&args.input, args.only_animation, args.z_up) {
        return fail(format!("Failed to extract {}: {}", args.input.display(), err));
    }

    if !extractor.has_uv() && !extractor.vertices().is_empty() {
        warn!("{}: mesh has no UVs, default UV applied", args.input.display());
    }
    let result = extractor.take_result();
    info!(
        "{}: {} vertices, {} bones, {} animation clips",
        args.input.display(),
        result.vertices.len(),
        result.bone_count(),
        result.animation_clips.len()
    );
    for (name, clip) in &result.animation_clips {
        info!("Clip {:?}: {:.3}s", name, clip.duration());
    }
    if let Err(err) = result.validate() {
        warn!("Extraction result is inconsistent: {}", err);
    }

    if let Some(path) = &args.json {
        let file = match File::create(path) {
            Ok(file) => file,
            Err(err) => return fail(format!("Failed to create {}: {}", path.display(), err)),
        };
        if let Err(err) = serde_json::to_writer(BufWriter::new(file), &result) {
            return fail(format!("Failed to write {}: {}", path.display(), err));
        }
        info!("Wrote {}", path.display());
    }

    ExitCode::SUCCESS
}
