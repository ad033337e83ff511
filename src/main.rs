use clap::{arg, crate_version, ArgAction, Command};
use rawhuff::{decode, encode, image, Error, Mode, Options};
use std::path::Path;

const RCH: &str = "unreachable was reached";

fn validate_input_path(path: &Path) -> Result<(), Error> {
    let meta = std::fs::metadata(path)
        .map_err(|_| Error::InvalidArgument(format!("input file does not exist: {}", path.display())))?;
    if !meta.is_file() {
        return Err(Error::InvalidArgument(format!("input path is not a regular file: {}", path.display())));
    }
    Ok(())
}

fn validate_output_path(path: &Path) -> Result<(), Error> {
    let parent = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(parent) = parent {
        if !parent.is_dir() {
            return Err(Error::InvalidArgument(format!(
                "output directory does not exist: {}",
                parent.display()
            )));
        }
    }
    Ok(())
}

fn run() -> Result<(), Error> {
    env_logger::init();

    let long_help = "Examples:
---------
Compress, adaptive, no model:     `rawhuff -c -i image.raw -o image.rh -w 256`
Compress, adaptive-blocks+model:  `rawhuff -c -a -m -i image.raw -o image.rh -w 256`
Decompress (same flags as -c):    `rawhuff -d -a -m -i image.rh -o image.raw -w 256`";

    let main_cmd = Command::new("rawhuff")
        .about("Lossless codec for raw 8-bit grayscale images")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!(-c --compress "compress the input").action(ArgAction::SetTrue))
        .arg(arg!(-d --decompress "decompress the input").action(ArgAction::SetTrue))
        .arg(arg!(-m --model "enable the neighbour-difference preprocessing model").action(ArgAction::SetTrue))
        .arg(
            arg!(-a --adaptive "adaptive-blocks scanning mode")
                .action(ArgAction::SetTrue)
                .conflicts_with("static-mode"),
        )
        .arg(arg!(-s --"static-mode" "static (two-pass) Huffman mode").action(ArgAction::SetTrue))
        .arg(arg!(-i --input <PATH> "input file path").required(true))
        .arg(arg!(-o --output <PATH> "output file path").required(true))
        .arg(arg!(-w --width <N> "image row width in pixels").required(true).value_parser(clap::value_parser!(usize)));

    let matches = main_cmd.get_matches();

    let compress = matches.get_flag("compress");
    let decompress = matches.get_flag("decompress");
    if compress == decompress {
        return Err(Error::InvalidArgument("exactly one of -c or -d is required".into()));
    }

    let mode = if matches.get_flag("adaptive") {
        Mode::AdaptiveBlocks
    } else if matches.get_flag("static-mode") {
        Mode::Static
    } else {
        Mode::Adaptive
    };
    let opts = Options { mode, model: matches.get_flag("model"), ..Options::default() };

    let path_in = Path::new(matches.get_one::<String>("input").expect(RCH));
    let path_out = Path::new(matches.get_one::<String>("output").expect(RCH));
    let width = *matches.get_one::<usize>("width").expect(RCH);
    if width == 0 {
        return Err(Error::InvalidArgument("width must be at least 1".into()));
    }
    validate_input_path(path_in)?;
    validate_output_path(path_out)?;

    if compress {
        let img = image::read_raw(path_in, width)?;
        log::info!("compressing {} ({}x{}) -> {}", path_in.display(), img.width, img.height, path_out.display());
        let compressed = encode(&img.pixels, img.width, &opts)?;
        std::fs::write(path_out, compressed)?;
    } else {
        let data = std::fs::read(path_in)?;
        log::info!("decompressing {} ({} bytes) -> {}", path_in.display(), data.len(), path_out.display());
        let decoded = decode(&data, &opts)?;
        let out_width = decoded.width.unwrap_or(width);
        let out_height = decoded.height.unwrap_or(decoded.pixels.len() / out_width.max(1));
        image::write_raw(path_out, &rawhuff::Image::new(out_width, out_height, decoded.pixels))?;
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
