use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

type STDRESULT = Result<(), Box<dyn std::error::Error>>;

/// The left half of `original_source/test.cpp`'s fixture image: each row is
/// `1 2 3 4 5 6 7 8` repeated; the right half holds a constant value per
/// row, chosen so row-major and column-major scans disagree on which is
/// more redundant (T3 of spec §8).
fn test_image(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = vec![0u8; width * height];
    for y in 0..height {
        for x in 0..width {
            pixels[y * width + x] = if x < width / 2 {
                ((x % 8) + 1) as u8
            } else {
                (y % 256) as u8
            };
        }
    }
    pixels
}

fn roundtrip(pixels: &[u8], width: usize, extra_flags: &[&str]) -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let raw_path = temp_dir.path().join("in.raw");
    let compressed_path = temp_dir.path().join("out.rh");
    let restored_path = temp_dir.path().join("restored.raw");
    std::fs::write(&raw_path, pixels)?;

    let mut compress = Command::cargo_bin("rawhuff")?;
    compress.arg("-c").args(extra_flags).arg("-i").arg(&raw_path).arg("-o").arg(&compressed_path).arg("-w").arg(width.to_string());
    compress.assert().success();

    let mut expand = Command::cargo_bin("rawhuff")?;
    expand.arg("-d").args(extra_flags).arg("-i").arg(&compressed_path).arg("-o").arg(&restored_path).arg("-w").arg(width.to_string());
    expand.assert().success();

    let restored = std::fs::read(&restored_path)?;
    assert_eq!(restored, pixels, "round trip mismatch with flags {:?}", extra_flags);
    Ok(())
}

#[test]
fn static_roundtrip_no_model() -> STDRESULT {
    roundtrip(&test_image(16, 16), 16, &["-s"])
}

#[test]
fn static_roundtrip_with_model() -> STDRESULT {
    roundtrip(&test_image(16, 16), 16, &["-s", "-m"])
}

#[test]
fn adaptive_roundtrip_no_model() -> STDRESULT {
    roundtrip(&test_image(16, 16), 16, &[])
}

#[test]
fn adaptive_roundtrip_with_model() -> STDRESULT {
    let pixels: Vec<u8> = (0..=255u8).collect();
    roundtrip(&pixels, 16, &["-m"])
}

#[test]
fn adaptive_blocks_roundtrip_no_model() -> STDRESULT {
    roundtrip(&test_image(16, 8), 16, &["-a"])
}

#[test]
fn adaptive_blocks_roundtrip_with_model() -> STDRESULT {
    roundtrip(&test_image(24, 17), 24, &["-a", "-m"])
}

#[test]
fn adaptive_blocks_roundtrip_uniform_image() -> STDRESULT {
    roundtrip(&vec![0x42u8; 65536], 256, &["-a"])
}

#[test]
fn static_roundtrip_single_repeated_byte() -> STDRESULT {
    roundtrip(&[0u8; 4], 2, &["-s"])
}

/// T6 of spec §8: empty input must behave deterministically. This codec's
/// documented choice is a valid (empty) encoding rather than an argument
/// error, for every mode.
#[test]
fn empty_input_roundtrips_for_every_mode() -> STDRESULT {
    for flags in [&[][..], &["-s"][..], &["-a"][..]] {
        roundtrip(&[], 1, flags)?;
    }
    Ok(())
}

#[test]
fn requires_exactly_one_of_compress_or_decompress() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let raw_path = temp_dir.path().join("in.raw");
    std::fs::write(&raw_path, [0u8; 4])?;
    let out_path = temp_dir.path().join("out.rh");

    let mut cmd = Command::cargo_bin("rawhuff")?;
    cmd.arg("-i").arg(&raw_path).arg("-o").arg(&out_path).arg("-w").arg("2");
    cmd.assert().failure().stderr(predicate::str::contains("exactly one of -c or -d"));
    Ok(())
}

#[test]
fn rejects_missing_input_file() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let missing = temp_dir.path().join("does-not-exist.raw");
    let out_path = temp_dir.path().join("out.rh");

    let mut cmd = Command::cargo_bin("rawhuff")?;
    cmd.arg("-c").arg("-i").arg(&missing).arg("-o").arg(&out_path).arg("-w").arg("2");
    cmd.assert().failure().stderr(predicate::str::contains("does not exist"));
    Ok(())
}

#[test]
fn rejects_file_size_not_a_multiple_of_width() -> STDRESULT {
    let temp_dir = tempfile::tempdir()?;
    let raw_path = temp_dir.path().join("in.raw");
    std::fs::write(&raw_path, [0u8; 5])?;
    let out_path = temp_dir.path().join("out.rh");

    let mut cmd = Command::cargo_bin("rawhuff")?;
    cmd.arg("-c").arg("-i").arg(&raw_path).arg("-o").arg(&out_path).arg("-w").arg("2");
    cmd.assert().failure();
    Ok(())
}
