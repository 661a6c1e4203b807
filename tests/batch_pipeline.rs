//! End-to-end tests through the real `image`-crate backend.
//!
//! Synthetic images are generated in memory; nothing is read from disk
//! except where a test explicitly exercises `SourceFile::read`.

use image::codecs::png::PngEncoder;
use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use rasterpress::batch::{ItemStatus, RunState, run_batch};
use rasterpress::imaging::RustBackend;
use rasterpress::packaging::{Package, ZipArchive, package_results};
use rasterpress::pipeline::{self, CancelToken, ExecutionStrategy, PipelineError};
use rasterpress::settings::{BatchSettings, OutputFormat, Quality, ResizeSpec, Rotation, Settings};
use rasterpress::types::SourceFile;
use rasterpress::worker::OffloadWorker;
use std::io::{Cursor, Read};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 256) as u8, (y % 256) as u8, ((x * y) % 256) as u8])
    });
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_with_encoder(PngEncoder::new(&mut buf))
        .unwrap();
    buf
}

fn decoded_dimensions(bytes: &[u8]) -> (u32, u32) {
    image::load_from_memory(bytes).unwrap().dimensions()
}

#[test]
fn single_image_rotate_resize_encode() {
    let backend = RustBackend::new();
    let source = SourceFile::new("photo.PNG", png(80, 60));
    let settings = Settings::default()
        .with_rotation(Rotation::Quarter)
        .with_resize(ResizeSpec {
            enabled: true,
            width: Some(30),
            ..ResizeSpec::default()
        })
        .with_format(OutputFormat::Jpeg);

    let out = pipeline::run(
        &backend,
        &source,
        &settings,
        &ExecutionStrategy::Inline,
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(out.result.mime_type, "image/jpeg");
    assert_eq!((out.result.width, out.result.height), (30, 40));
    assert_eq!(decoded_dimensions(&out.result.bytes), (30, 40));
    assert_eq!(out.original_byte_size, source.byte_size());
}

#[test]
fn worker_output_matches_inline_bytes() {
    let source = SourceFile::new("a.png", png(64, 48));
    let settings = Settings::default()
        .with_rotation(Rotation::Half)
        .with_format(OutputFormat::Webp);

    let inline = pipeline::run(
        &RustBackend::new(),
        &source,
        &settings,
        &ExecutionStrategy::Inline,
        &CancelToken::new(),
    )
    .unwrap();

    let worker = OffloadWorker::spawn(RustBackend::new()).unwrap();
    let offloaded = pipeline::run(
        &RustBackend::new(),
        &source,
        &settings,
        &ExecutionStrategy::Offload(&worker),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(inline.result.bytes, offloaded.result.bytes);
    assert_eq!(inline, offloaded);
}

#[test]
fn corrupt_input_is_decode_failure() {
    let result = pipeline::run(
        &RustBackend::new(),
        &SourceFile::new("broken.jpg", b"\xFF\xD8 not really a jpeg".to_vec()),
        &Settings::default(),
        &ExecutionStrategy::Inline,
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(PipelineError::Decode(_))));
}

#[test]
fn batch_isolates_failures_and_archives_successes() {
    let files = vec![
        SourceFile::new("a.png", png(120, 90)),
        SourceFile::new("b.jpg", b"garbage".to_vec()),
        SourceFile::new("c.png", png(40, 40)),
    ];
    let settings = BatchSettings {
        format: OutputFormat::Webp,
        quality: Quality::new(60),
        max_width: Some(60),
    };
    let run = run_batch(
        &RustBackend::new(),
        files,
        &settings,
        &ExecutionStrategy::Inline,
        None,
        &CancelToken::new(),
    );

    assert_eq!(run.state, RunState::Done);
    let statuses: Vec<_> = run.items.iter().map(|i| i.status).collect();
    assert_eq!(
        statuses,
        vec![
            ItemStatus::Completed,
            ItemStatus::Failed,
            ItemStatus::Completed
        ]
    );

    let a = run.items[0].result.as_ref().unwrap();
    assert_eq!((a.width, a.height), (60, 45));
    // max_width also applies to smaller images: 40x40 is scaled up to 60x60.
    let c = run.items[2].result.as_ref().unwrap();
    assert_eq!((c.width, c.height), (60, 60));

    let expected_original = run.items[0].source.byte_size() + run.items[2].source.byte_size();
    assert_eq!(run.total_original_bytes, expected_original);
    assert_eq!(run.total_compressed_bytes, a.byte_size + c.byte_size);

    let Package::Archive { name, bytes } =
        package_results(&run, Some(ZipArchive::new()), 42).unwrap()
    else {
        panic!("expected an archive");
    };
    assert_eq!(name, "compressed-images-42.zip");

    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(zip.len(), 2);
    let mut entry = zip.by_name("a.webp").unwrap();
    let mut data = Vec::new();
    entry.read_to_end(&mut data).unwrap();
    assert_eq!(decoded_dimensions(&data), (60, 45));
}

#[test]
fn avif_outputs_feed_back_into_a_batch() {
    let first = run_batch(
        &RustBackend::new(),
        vec![SourceFile::new("pic.png", png(48, 32))],
        &BatchSettings {
            format: OutputFormat::Avif,
            quality: Quality::new(70),
            max_width: None,
        },
        &ExecutionStrategy::Inline,
        None,
        &CancelToken::new(),
    );
    let Package::Individual(downloads) = package_results(&first, None::<ZipArchive>, 0).unwrap()
    else {
        panic!("expected individual downloads");
    };
    assert_eq!(downloads[0].name, "pic.avif");

    let again = rasterpress::batch::accept_files(vec![SourceFile::new(
        downloads[0].name.clone(),
        downloads[0].bytes.clone(),
    )]);
    assert_eq!(again.len(), 1);

    let second = run_batch(
        &RustBackend::new(),
        again,
        &BatchSettings {
            format: OutputFormat::Jpeg,
            quality: Quality::new(80),
            max_width: Some(24),
        },
        &ExecutionStrategy::Inline,
        None,
        &CancelToken::new(),
    );
    assert_eq!(second.items[0].status, ItemStatus::Completed);
    let result = second.items[0].result.as_ref().unwrap();
    assert_eq!(decoded_dimensions(&result.bytes), (24, 16));
}

#[test]
fn source_file_read_from_disk() {
    let tmp = tempfile::TempDir::new().unwrap();
    let path = tmp.path().join("disk.png");
    std::fs::write(&path, png(10, 20)).unwrap();

    let source = SourceFile::read(&path).unwrap();
    let out = pipeline::run(
        &RustBackend::new(),
        &source,
        &Settings::default().with_format(OutputFormat::Png),
        &ExecutionStrategy::Inline,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(decoded_dimensions(&out.result.bytes), (10, 20));
}
