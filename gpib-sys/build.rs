#[cfg(feature = "libgpib")]
use std::env;
#[cfg(feature = "libgpib")]
use std::path::PathBuf;

/// Check for common linux-gpib library paths
#[cfg(feature = "libgpib")]
fn find_gpib_lib() -> Option<PathBuf> {
    let candidates = [
        "/usr/local/lib",
        "/usr/lib",
        "/usr/lib/x86_64-linux-gnu",
        "/usr/lib/aarch64-linux-gnu",
    ];

    for path in &candidates {
        let p = PathBuf::from(path);
        if p.join("libgpib.so").exists() {
            return Some(p);
        }
    }
    None
}

fn main() {
    // Link directives only with the `libgpib` feature, so the crate (and its
    // test target) builds on machines without linux-gpib installed.
    #[cfg(feature = "libgpib")]
    {
        println!("cargo:rerun-if-env-changed=GPIB_LIB_DIR");
        println!("cargo:rerun-if-env-changed=LIBRARY_PATH");

        // linux-gpib ships no pkg-config file, so the search path is set by hand.
        match env::var("GPIB_LIB_DIR") {
            Ok(lib_dir) => {
                let lib_dir = PathBuf::from(lib_dir);
                if !lib_dir.exists() {
                    println!(
                        "cargo:warning=GPIB_LIB_DIR does not exist: {}",
                        lib_dir.display()
                    );
                }
                println!("cargo:rustc-link-search=native={}", lib_dir.display());
            }
            Err(_) => {
                if let Some(found) = find_gpib_lib() {
                    println!("cargo:rustc-link-search=native={}", found.display());
                } else {
                    println!("cargo:warning=libgpib.so not found in standard paths");
                    println!("cargo:warning=Set GPIB_LIB_DIR or install linux-gpib user space");
                }
            }
        }

        println!("cargo:rustc-link-lib=gpib");
    }
}
