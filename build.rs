use std::env;
use std::path::PathBuf;

fn main() {
    for var in ["FFMPEG_DIR", "VCPKG_ROOT", "VCPKGRS_DYNAMIC", "VCPKGRS_TRIPLET"] {
        println!("cargo:rerun-if-env-changed={var}");
    }

    // ffmpeg-sys-next finds FFmpeg through pkg-config everywhere except
    // Windows, where an explicit FFMPEG_DIR (or a vcpkg install) is needed.
    if env::var("CARGO_CFG_TARGET_OS").unwrap_or_default() != "windows"
        || env::var_os("FFMPEG_DIR").is_some()
    {
        return;
    }

    let Ok(vcpkg_root) = env::var("VCPKG_ROOT") else {
        println!(
            "cargo:warning=framereader: FFMPEG_DIR is not set; point it at an FFmpeg install (e.g. from vcpkg) before building on Windows."
        );
        return;
    };

    let triplet = env::var("VCPKGRS_TRIPLET").unwrap_or_else(|_| "x64-windows".to_string());
    let candidate = PathBuf::from(vcpkg_root).join("installed").join(triplet);

    if !candidate.exists() {
        println!(
            "cargo:warning=framereader: VCPKG_ROOT is set but {} does not exist.",
            candidate.display(),
        );
        return;
    }

    println!(
        "cargo:warning=framereader: found vcpkg FFmpeg at {0}; set FFMPEG_DIR={0} to silence this message.",
        candidate.display(),
    );
    if env::var_os("VCPKGRS_DYNAMIC").is_none() {
        println!("cargo:warning=framereader: set VCPKGRS_DYNAMIC=1 for dynamically linked vcpkg FFmpeg.");
    }
}
