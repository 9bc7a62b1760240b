use image::GenericImageView;
use std::env;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Side of the square acknowledgment icon, in pixels. Mirrored by `render::ACK_ICON_SIZE`.
const ACK_ICON_SIZE: u32 = 160;

/// Convert PNG image to 2-color format at build time
fn convert_image_to_binary(
    input_path: &str,
    output_path: &str,
    target_width: u32,
    target_height: u32,
    threshold: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("cargo:rerun-if-changed={}", input_path);

    if !Path::new(input_path).exists() {
        // An empty buffer makes the firmware fall back to a text-only acknowledgment
        let mut file = File::create(output_path)?;
        file.write_all(&[])?;
        return Ok(());
    }

    let img = image::open(input_path)?;
    let (orig_width, orig_height) = img.dimensions();

    let orig_ratio = orig_width as f32 / orig_height as f32;
    let target_ratio = target_width as f32 / target_height as f32;

    let (new_width, new_height) = if orig_ratio > target_ratio {
        (target_width, (target_width as f32 / orig_ratio) as u32)
    } else {
        ((target_height as f32 * orig_ratio) as u32, target_height)
    };

    let gray = img
        .resize(new_width, new_height, image::imageops::FilterType::Lanczos3)
        .to_luma8();

    // One bit per pixel, MSB first, 1 = ink
    let bytes_per_row = target_width.div_ceil(8);
    let mut buffer = vec![0u8; (bytes_per_row * target_height) as usize];

    let offset_x = (target_width - new_width) / 2;
    let offset_y = (target_height - new_height) / 2;

    for y in 0..target_height {
        for x in 0..target_width {
            let brightness = match (x.checked_sub(offset_x), y.checked_sub(offset_y)) {
                (Some(ix), Some(iy)) if ix < new_width && iy < new_height => {
                    gray.get_pixel(ix, iy)[0]
                }
                _ => 255,
            };

            if brightness < threshold {
                let byte_index = (y * bytes_per_row + x / 8) as usize;
                buffer[byte_index] |= 1 << (7 - (x % 8));
            }
        }
    }

    let mut file = File::create(output_path)?;
    file.write_all(&buffer)?;

    println!(
        "cargo:warning=Acknowledgment icon converted: {}x{} -> {} bytes",
        orig_width,
        orig_height,
        buffer.len()
    );
    Ok(())
}

fn main() {
    if env::var("CARGO_CFG_TARGET_OS").as_deref() == Ok("espidf") {
        embuild::espidf::sysenv::output();
    }

    let out_dir = env::var("OUT_DIR").expect("cargo sets OUT_DIR for build scripts");
    let icon_output = format!("{}/liked.bin", out_dir);

    if let Err(e) = convert_image_to_binary(
        "assets/liked.png",
        &icon_output,
        ACK_ICON_SIZE,
        ACK_ICON_SIZE,
        128, // threshold (0-255, 128 = middle gray)
    ) {
        println!("cargo:warning=Failed to convert assets/liked.png: {}", e);
        // Keep include_bytes! satisfied
        let _ = File::create(&icon_output);
    }

    println!("cargo:rerun-if-changed=assets/liked.png");
}
