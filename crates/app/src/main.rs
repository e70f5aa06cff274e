//! Entry point for the anatomical model viewer.
//! Logging + command-line flags, then hand over to the platform layer.

use std::path::PathBuf;

use anyhow::Result;
use platform::PlatformConfig;

fn parse_backend_arg(args: &[String]) -> wgpu::Backends {
    // Accept: --gpu-backend=auto|vulkan|dx12|metal|gl
    let mut backends = wgpu::Backends::all(); // default = auto
    for arg in args {
        if let Some(val) = arg.strip_prefix("--gpu-backend=") {
            backends = match val.to_ascii_lowercase().as_str() {
                "auto" => wgpu::Backends::all(),
                "vulkan" | "vk" => wgpu::Backends::VULKAN,
                "dx12" | "d3d12" => wgpu::Backends::DX12,
                "metal" | "mtl" => wgpu::Backends::METAL,
                "gl" | "opengl" | "gles" => wgpu::Backends::GL,
                other => {
                    log::warn!("Unknown backend '{}', falling back to auto.", other);
                    wgpu::Backends::all()
                }
            };
        }
    }
    backends
}

fn parse_flag(args: &[String], name: &str) -> bool {
    // --name[=on|off], off by default
    let prefix = format!("{name}=");
    for arg in args {
        if arg == name {
            return true;
        }
        if let Some(val) = arg.strip_prefix(&prefix) {
            return matches!(
                val.to_ascii_lowercase().as_str(),
                "1" | "true" | "on" | "yes"
            );
        }
    }
    false
}

fn parse_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{name}=");
    args.iter()
        .rev()
        .find_map(|arg| arg.strip_prefix(&prefix))
        .filter(|v| !v.is_empty())
}

fn parse_size_args(args: &[String]) -> (u32, u32) {
    let mut w: Option<u32> = None;
    let mut h: Option<u32> = None;

    for arg in args {
        if let Some(v) = arg.strip_prefix("--size=") {
            if let Some((sw, sh)) = v.split_once('x').or_else(|| v.split_once('X')) {
                if let (Ok(pw), Ok(ph)) = (sw.parse::<u32>(), sh.parse::<u32>()) {
                    w = Some(pw);
                    h = Some(ph);
                }
            }
        } else if let Some(v) = arg.strip_prefix("--width=") {
            if let Ok(pw) = v.parse::<u32>() {
                w = Some(pw);
            }
        } else if let Some(v) = arg.strip_prefix("--height=") {
            if let Ok(ph) = v.parse::<u32>() {
                h = Some(ph);
            }
        }
    }

    let ww = w.unwrap_or(1280).max(1);
    let hh = h.unwrap_or(720).max(1);
    (ww, hh)
}

fn parse_config(args: &[String]) -> PlatformConfig {
    let (width, height) = parse_size_args(args);
    PlatformConfig {
        backends: parse_backend_arg(args),
        width,
        height,
        models_path: parse_value(args, "--models").map(PathBuf::from),
        initial_model: parse_value(args, "--model").map(str::to_owned),
        show_coords: parse_flag(args, "--show-coords"),
        ..PlatformConfig::default()
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = parse_config(&args);
    log::info!(
        "Starting anatview. Backend: {:?}, window_size={}x{}, models={:?}, model={:?}, show_coords={}",
        config.backends,
        config.width,
        config.height,
        config.models_path,
        config.initial_model,
        config.show_coords
    );

    platform::run(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn defaults_without_flags() {
        let cfg = parse_config(&[]);
        assert_eq!((cfg.width, cfg.height), (1280, 720));
        assert_eq!(cfg.backends, wgpu::Backends::all());
        assert!(cfg.models_path.is_none());
        assert!(cfg.initial_model.is_none());
        assert!(!cfg.show_coords);
    }

    #[test]
    fn size_flag_and_overrides() {
        assert_eq!(parse_size_args(&args(&["--size=800x600"])), (800, 600));
        assert_eq!(
            parse_size_args(&args(&["--size=800x600", "--height=500"])),
            (800, 500)
        );
        assert_eq!(parse_size_args(&args(&["--width=0"])), (1, 720));
    }

    #[test]
    fn backend_names() {
        assert_eq!(
            parse_backend_arg(&args(&["--gpu-backend=VK"])),
            wgpu::Backends::VULKAN
        );
        assert_eq!(
            parse_backend_arg(&args(&["--gpu-backend=bogus"])),
            wgpu::Backends::all()
        );
    }

    #[test]
    fn model_flags() {
        let cfg = parse_config(&args(&[
            "--models=assets/models.json",
            "--model=skull",
            "--show-coords",
        ]));
        assert_eq!(cfg.models_path, Some(PathBuf::from("assets/models.json")));
        assert_eq!(cfg.initial_model.as_deref(), Some("skull"));
        assert!(cfg.show_coords);
    }

    #[test]
    fn show_coords_can_be_switched_off() {
        assert!(!parse_flag(&args(&["--show-coords=off"]), "--show-coords"));
    }
}
