use spine_frame::{HEADER_LEN, MAX_FRAME_LEN};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("spine {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: spine");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!(
        "target: {}",
        option_env!("SPINE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!("frame_header_bytes: {HEADER_LEN}");
    println!("max_frame_bytes: {MAX_FRAME_LEN}");
    println!(
        "default_device: {} @ {} baud",
        spine_transport::DEFAULT_DEVICE,
        spine_transport::DEFAULT_BAUD_RATE
    );
    println!("features: link={}, cli=true", cfg!(feature = "link"));

    Ok(SUCCESS)
}
