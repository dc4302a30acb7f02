//! Link the vendor driver libraries for the enabled backends.
//!
//! Library names default to the vendor's usual name for the target and can
//! be overridden with `GPIBPORT_NI488_LIB` / `GPIBPORT_VISA_LIB`. An extra
//! search directory can be supplied with the matching `*_LIB_DIR` variable.

use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=GPIBPORT_NI488_LIB");
    println!("cargo:rerun-if-env-changed=GPIBPORT_NI488_LIB_DIR");
    println!("cargo:rerun-if-env-changed=GPIBPORT_VISA_LIB");
    println!("cargo:rerun-if-env-changed=GPIBPORT_VISA_LIB_DIR");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let pointer_width = env::var("CARGO_CFG_TARGET_POINTER_WIDTH").unwrap_or_default();

    if env::var_os("CARGO_FEATURE_NI488").is_some() {
        let default = if target_os == "windows" {
            "ni4882"
        } else {
            "gpib"
        };
        link("GPIBPORT_NI488", default);
    }

    if env::var_os("CARGO_FEATURE_VISA").is_some() {
        let default = match (target_os.as_str(), pointer_width.as_str()) {
            ("windows", "64") => "visa64",
            ("windows", _) => "visa32",
            ("macos", _) => "framework=VISA",
            _ => "visa",
        };
        link("GPIBPORT_VISA", default);
    }
}

fn link(prefix: &str, default: &str) {
    if let Ok(dir) = env::var(format!("{prefix}_LIB_DIR")) {
        println!("cargo:rustc-link-search=native={dir}");
    }
    let name = env::var(format!("{prefix}_LIB")).unwrap_or_else(|_| default.to_string());
    println!("cargo:rustc-link-lib={name}");
}
