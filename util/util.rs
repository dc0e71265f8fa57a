#![allow(dead_code)]

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use image::RgbaImage;
use pegmosaic::{uniform, QuantizeOutput};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoroshiro128PlusPlus;

pub fn load_images(images: &[PathBuf]) -> Vec<(String, RgbaImage)> {
    images
        .iter()
        .map(|path| {
            image::open(path).map(|image| {
                (
                    path.file_name().unwrap().to_owned().into_string().unwrap(),
                    image.into_rgba8(),
                )
            })
        })
        .collect::<Result<_, _>>()
        .expect("loaded each image")
}

pub fn load_image_dir(dir: impl AsRef<Path>) -> Vec<(String, RgbaImage)> {
    let mut paths = std::fs::read_dir(dir)
        .expect("read img directory")
        .collect::<Result<Vec<_>, _>>()
        .expect("read each file")
        .iter()
        .map(std::fs::DirEntry::path)
        .collect::<Vec<_>>();

    paths.sort();

    load_images(&paths)
}

pub const BOARDS_DIR: &str = "img/boards";

pub fn root_dir() -> PathBuf {
    // assume current exe path is something like: target/build/deps/current_exe
    let exe = std::env::current_exe().unwrap();
    exe.parent()
        .and_then(Path::parent)
        .and_then(Path::parent)
        .and_then(Path::parent)
        .unwrap()
        .to_owned()
}

/// A smooth gradient with a few hard edged blocks, similar to a downscaled photo.
pub fn gradient_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let r = (x * 255 / width.max(1)) as u8;
        let g = (y * 255 / height.max(1)) as u8;
        let b = if (x / 37 + y / 23) % 3 == 0 { 220 } else { 40 };
        image::Rgba([r, g, b, u8::MAX])
    })
}

/// Uniform noise, the worst case for consolidation.
pub fn noise_image(width: u32, height: u32, seed: u64) -> RgbaImage {
    let mut rng = Xoroshiro128PlusPlus::seed_from_u64(seed);
    RgbaImage::from_fn(width, height, |_, _| {
        let [r, g, b]: [u8; 3] = rng.gen();
        image::Rgba([r, g, b, u8::MAX])
    })
}

pub fn synthetic_images() -> Vec<(String, RgbaImage)> {
    vec![
        ("gradient_640x480".to_owned(), gradient_image(640, 480)),
        ("gradient_1600x1200".to_owned(), gradient_image(1600, 1200)),
        ("noise_320x240".to_owned(), noise_image(320, 240, 0)),
    ]
}

static BOARD_IMAGES: OnceLock<Vec<(String, RgbaImage)>> = OnceLock::new();

/// Images in `img/boards` if that directory exists, otherwise synthetic images.
pub fn board_images() -> &'static [(String, RgbaImage)] {
    BOARD_IMAGES.get_or_init(|| {
        let dir = root_dir().join(BOARDS_DIR);
        if dir.is_dir() {
            load_image_dir(dir)
        } else {
            synthetic_images()
        }
    })
}

/// The quantized label maps of [`board_images`] for a color count.
pub fn quantized_boards(k: u16) -> Vec<(String, u32, u32, QuantizeOutput)> {
    board_images()
        .iter()
        .map(|(name, image)| {
            let output = uniform::quantize(image.as_raw(), image.width(), image.height(), k).unwrap();
            (name.clone(), image.width(), image.height(), output)
        })
        .collect()
}
