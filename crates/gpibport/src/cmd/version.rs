use gpibport_frame::{MAX_BODY_LEN, MAX_FRAME_LEN};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("gpibport {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: gpibport");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "build_target: {}",
        option_env!("GPIBPORT_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("GPIBPORT_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!(
        "backends: ni488={}, visa={}, loopback=true",
        cfg!(feature = "ni488"),
        cfg!(feature = "visa")
    );
    println!("max_frame_len: {MAX_FRAME_LEN}");
    println!("max_body_len: {MAX_BODY_LEN}");

    Ok(SUCCESS)
}
